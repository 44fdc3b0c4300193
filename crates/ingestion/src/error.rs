//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// SQLite call failed
    #[error("sqlite error while {context}: {source}")]
    Sqlite {
        /// What the store was doing
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Required table is absent from the session database
    #[error("table '{table}' not found in session database")]
    TableNotFound {
        /// Table name
        table: String,
    },

    /// Value does not fit the SQLite INTEGER range
    #[error("value {value} exceeds SQLite INTEGER range")]
    OutOfRange {
        /// Offending value
        value: u64,
    },

    /// Worker thread could not be started
    #[error("failed to spawn store worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// Worker thread exited; the store is unusable
    #[error("store worker thread terminated unexpectedly")]
    WorkerGone,

    /// Fetch task panicked or was cancelled
    #[error("fetch task for channel '{channel}' failed: {message}")]
    FetchTask {
        /// Channel ID
        channel: String,
        /// Error message
        message: String,
    },
}

impl IngestionError {
    /// Wrap a rusqlite error with what was being attempted
    pub fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            context: context.into(),
            source,
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::TableNotFound { table } => ContractError::MissingTable { table },
            other => ContractError::store_with_source(other.to_string(), other),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
