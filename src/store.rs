//! Configuration record store.
//!
//! The [`RecordStore`] trait is the only thing the normalizer pipeline
//! needs from a database: run the provider query for one application
//! namespace and hand back raw rows. [`SqliteRecordStore`] talks to the
//! real store file; [`InMemoryRecordStore`] backs tests.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::path::Path;

use crate::db;
use crate::error::{BridgeError, Result};
use crate::models::{ProviderRecord, RecordSet};

/// Column the provider query filters on.
pub const NAMESPACE_COLUMN: &str = "app_type";

const PROVIDERS_QUERY: &str = "SELECT * FROM providers WHERE app_type = ?";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every provider row belonging to `namespace`, in store order.
    ///
    /// No matching rows is an empty [`RecordSet`], not an error.
    async fn fetch_records(&self, namespace: &str) -> Result<RecordSet>;

    /// Release any handles held by the store.
    async fn close(&self) {}
}

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_read_only(path).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch_records(&self, namespace: &str) -> Result<RecordSet> {
        let rows = sqlx::query(PROVIDERS_QUERY)
            .bind(namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(BridgeError::store_open)?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(BridgeError::store_open)?;

        Ok(RecordSet { columns, rows })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Decode a row by the runtime SQLite type of each value.
fn decode_row(row: &SqliteRow) -> std::result::Result<ProviderRecord, sqlx::Error> {
    let mut record = ProviderRecord::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(i)?),
                "REAL" => Value::from(row.try_get_unchecked::<f64, _>(i)?),
                "BLOB" => Value::String(BASE64.encode(row.try_get_unchecked::<Vec<u8>, _>(i)?)),
                // Invalid UTF-8 stays in the row so the normalizer can skip just that row.
                _ => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(i)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Open the store at `path`, fetch the rows for `namespace`, and close it.
///
/// The pool is closed whether or not the query succeeds.
pub async fn fetch_provider_records(path: &Path, namespace: &str) -> Result<RecordSet> {
    let store = SqliteRecordStore::open(path).await?;
    let result = store.fetch_records(namespace).await;
    store.close().await;
    result
}

/// Fixed set of rows, filtered on [`NAMESPACE_COLUMN`] like the SQL query.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Vec<ProviderRecord>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<ProviderRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_records(&self, namespace: &str) -> Result<RecordSet> {
        let rows: Vec<ProviderRecord> = self
            .records
            .iter()
            .filter(|r| r.get(NAMESPACE_COLUMN).and_then(Value::as_str) == Some(namespace))
            .cloned()
            .collect();
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Ok(RecordSet { columns, rows })
    }
}
