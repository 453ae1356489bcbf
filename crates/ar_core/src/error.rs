use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::ArticleId;

/// Which backing store produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOrigin {
    Relational,
    Index,
    Lock,
}

impl StoreOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Index => "index",
            Self::Lock => "lock",
        }
    }
}

impl fmt::Display for StoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a store backend.
///
/// Messages carry the operation that failed, never the connection string.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Missing {0}")]
    Missing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Write aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Article {0} update in progress, please try again later")]
    Contention(ArticleId),

    #[error("Article {0} not found")]
    NotFound(ArticleId),

    #[error("{origin} store error: {source}")]
    Store {
        origin: StoreOrigin,
        #[source]
        source: StoreError,
    },

    /// The record store accepted the article but the index write failed.
    /// The relational row stays authoritative; the index needs a reindex of `id`.
    #[error("Article {id} was saved but not indexed: {source}")]
    ConsistencyGap {
        id: ArticleId,
        #[source]
        source: StoreError,
    },
}

impl Error {
    pub fn store(origin: StoreOrigin, source: StoreError) -> Self {
        Self::Store { origin, source }
    }

    pub fn relational(source: StoreError) -> Self {
        Self::store(StoreOrigin::Relational, source)
    }

    pub fn index(source: StoreError) -> Self {
        Self::store(StoreOrigin::Index, source)
    }

    pub fn lock(source: StoreError) -> Self {
        Self::store(StoreOrigin::Lock, source)
    }

    /// Store that produced the error, if any.
    pub fn origin(&self) -> Option<StoreOrigin> {
        match self {
            Self::Store { origin, .. } => Some(*origin),
            Self::ConsistencyGap { .. } => Some(StoreOrigin::Index),
            _ => None,
        }
    }

    /// Stable machine-readable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Contention(_) => "contention",
            Self::NotFound(_) => "not_found",
            Self::Store { .. } => "store",
            Self::ConsistencyGap { .. } => "consistency_gap",
        }
    }
}
