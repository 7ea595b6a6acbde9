//! SQLite connection to the external configuration store.
//!
//! The store belongs to another application, so it is opened read-only and
//! never created: a missing file must surface as an error rather than
//! leaving an empty database behind.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::{BridgeError, Result};

/// Open a single-connection, read-only pool on the database at `db_path`.
///
/// # Errors
///
/// [`BridgeError::FileNotFound`] if the path does not exist,
/// [`BridgeError::StoreOpen`] if SQLite refuses to open it.
pub async fn connect_read_only(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(BridgeError::FileNotFound(db_path.to_path_buf()));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(BridgeError::store_open)?;

    Ok(pool)
}
