use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreErrorKind {
    #[error("empty key")]
    EmptyKey,
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(pub StoreErrorKind);

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrorKind {
        &self.0
    }

    pub fn into_kind(self) -> StoreErrorKind {
        self.0
    }

    pub fn invalid_key(key: &str, reason: &'static str) -> Self {
        Self(StoreErrorKind::InvalidKey {
            key: key.to_string(),
            reason,
        })
    }

    pub fn not_found(key: &str) -> Self {
        Self(StoreErrorKind::NotFound(key.to_string()))
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self(StoreErrorKind::Io {
            op,
            path: path.into(),
            source,
        })
    }

    /// Empty keys count as invalid keys.
    pub fn is_invalid_key(&self) -> bool {
        matches!(
            self.0,
            StoreErrorKind::EmptyKey | StoreErrorKind::InvalidKey { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.0, StoreErrorKind::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.0,
            StoreErrorKind::Cancelled | StoreErrorKind::DeadlineExceeded
        )
    }
}

impl From<StoreErrorKind> for StoreError {
    fn from(kind: StoreErrorKind) -> Self {
        StoreError(kind)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
