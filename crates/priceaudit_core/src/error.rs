use std::path::PathBuf;

use thiserror::Error;

/// Failures of a catalog load or completeness audit.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("catalog file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog {}: {reason}", path.display())]
    MalformedData { path: PathBuf, reason: String },

    #[error("item {item_index} of store {store_index} is missing field `{field}`")]
    MissingField {
        field: &'static str,
        store_index: usize,
        item_index: usize,
    },
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
