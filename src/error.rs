use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the persisted store and history files.
///
/// These are the only errors that stop a search (or the whole run); fetch
/// and parse problems degrade to empty data instead.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub fn path(&self) -> &PathBuf {
        match self {
            PersistenceError::Read { path, .. }
            | PersistenceError::Parse { path, .. }
            | PersistenceError::Encode { path, .. }
            | PersistenceError::Write { path, .. } => path,
        }
    }
}
