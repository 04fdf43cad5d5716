//! Repository traits describing content adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::Collection;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("malformed record `{record}`: {message}")]
    Malformed { record: String, message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn malformed(record: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Malformed {
            record: record.into(),
            message: message.to_string(),
        }
    }
}

/// Source of named content collections.
///
/// Returns `Ok(None)` when the collection does not exist; errors are reserved
/// for an unavailable or corrupt source.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load_collection(&self, key: &str) -> Result<Option<Collection>, RepoError>;
}
