/// Error types for suggestion-service
use crate::models::SignalKind;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator (relationship, interaction,
/// interest or profile store, or the result cache).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A single signal collector failed after the request context loaded.
/// The signal contributes nothing and ranking continues without it.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("{} signal failed: {source}", .signal.as_str())]
    Store {
        signal: SignalKind,
        #[source]
        source: StoreError,
    },

    #[error("{} signal timed out after {after:?}", .signal.as_str())]
    Timeout { signal: SignalKind, after: Duration },
}

impl SignalError {
    pub fn signal(&self) -> SignalKind {
        match self {
            SignalError::Store { signal, .. } | SignalError::Timeout { signal, .. } => *signal,
        }
    }
}

/// Pipeline stage that may fail a whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Context,
    Hydration,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Context => "context",
            Stage::Hydration => "hydration",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal request errors. An empty suggestion list is not an error.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("Data store error during {stage}: {source}")]
    DataStore {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("Timed out during {stage} after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SuggestionError {
    pub fn data_store(stage: Stage, source: StoreError) -> Self {
        SuggestionError::DataStore { stage, source }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type Result<T> = std::result::Result<T, SuggestionError>;
