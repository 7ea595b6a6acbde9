//! Error taxonomy for the bridge.
//!
//! Configuration, argument, file, and store errors are fatal to an
//! invocation and are reported through the failure envelope. Row and
//! channel errors are absorbed where they occur and only surface as log
//! lines.

use std::error::Error as _;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Missing database file path argument")]
    ArgumentMissing,

    #[error("Database file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read database: {message}")]
    StoreOpen {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to parse provider config (row {row}): {reason}")]
    RowParse { row: usize, reason: String },

    #[error("channel read timed out")]
    ChannelTimeout,

    #[error("Failed to parse channel JSON: {0}")]
    ChannelParse(String),

    #[error("Error reading channel: {0}")]
    ChannelIo(String),
}

impl BridgeError {
    pub fn store_open(source: sqlx::Error) -> Self {
        BridgeError::StoreOpen {
            message: source.to_string(),
            source,
        }
    }

    /// Renders the chain of underlying causes, if any, one per line.
    pub fn stack(&self) -> Option<String> {
        let mut cause = self.source();
        if cause.is_none() {
            return None;
        }
        let mut lines = vec![format!("{}", self)];
        while let Some(err) = cause {
            lines.push(format!("    caused by: {:?}", err));
            cause = err.source();
        }
        Some(lines.join("\n"))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
