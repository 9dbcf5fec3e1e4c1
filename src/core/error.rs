//! Error types for Canopy

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using Canopy's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Canopy error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("No project root found (looked for .git walking up from the start path)")]
    NoProjectRoot,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database schema error: {message}")]
    DbSchema { message: String },

    #[error("Database is locked by another process")]
    DbBusy,

    #[error("Parser refused {path}: {message}")]
    ParseFailure { path: PathBuf, message: String },

    #[error("Script error in {script}: {message}")]
    Script { script: String, message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error should abort an entire indexing run.
    ///
    /// Per-file errors (IO, parse, script) are recorded and skipped;
    /// cancellation and database-level failures propagate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Cancelled | Error::DbSchema { .. } | Error::DbBusy
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::DbBusy
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound {
                what: "row".to_string(),
            },
            _ => Error::DbSchema {
                message: err.to_string(),
            },
        }
    }
}

impl From<mlua::Error> for Error {
    fn from(err: mlua::Error) -> Self {
        Error::Script {
            script: "<lua>".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Cancelled.is_fatal());
        assert!(Error::DbBusy.is_fatal());
        assert!(!Error::Script {
            script: "extract/go.lua".into(),
            message: "boom".into()
        }
        .is_fatal());
        assert!(!Error::ParseFailure {
            path: "a.go".into(),
            message: "refused".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
