use thiserror::Error;

use std::path::PathBuf;

/// Failures reported by a policy store collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("revision conflict: submitted revision {submitted}, current revision {current}")]
    Conflict { submitted: u64, current: u64 },

    #[error("patch rejected: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("expected default rule {rule} to have a single scope, found {count}")]
    InvalidDefaultScope { rule: String, count: usize },

    #[error("rule id {id} is declared more than once")]
    DuplicateRuleId { id: String },

    #[error("default rule for scope {scope} is declared more than once")]
    DuplicateDefaultScope { scope: String },

    #[error("gateway policy {path} declares both rule and default_rule entries")]
    ConflictingRuleKinds { path: String },

    #[error("failed to retrieve scope object {gateway} for rule {rule}: {source}")]
    ScopeResolution {
        gateway: String,
        rule: String,
        #[source]
        source: StoreError,
    },

    #[error("stale revision while trying to {operation} gateway policy {id}: {source}")]
    Conflict {
        operation: &'static str,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to {operation} gateway policy {id}: {source}")]
    Remote {
        operation: &'static str,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid gateway policy path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    ConfigSerialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
}

impl PolicyError {
    /// Attach the policy id and operation to a store failure
    pub fn from_store(operation: &'static str, id: &str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { kind, id } => PolicyError::NotFound { kind, id },
            StoreError::Conflict { .. } => PolicyError::Conflict {
                operation,
                id: id.to_string(),
                source,
            },
            StoreError::Validation(_) | StoreError::Transport(_) => PolicyError::Remote {
                operation,
                id: id.to_string(),
                source,
            },
        }
    }

    /// Whether restarting the cycle from a fresh read may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, PolicyError::Conflict { .. })
    }
}
