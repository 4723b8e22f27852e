//! Structured error handling for the taskops core.
//!
//! Every model-layer failure surfaces as a typed variant so callers can
//! distinguish recovery paths ("already registered" vs "environment does
//! not exist") without string matching.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskopsError {
    /// An entity id could not be resolved.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A required field was missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A definition create/rename would violate per-scope name uniqueness.
    #[error("advanced task definition '{name}' already exists in scope {scope}")]
    DuplicateName { name: String, scope: String },

    /// An active registration already exists for the (definition, environment) pair.
    #[error("definition {definition} is already registered for environment {environment}")]
    AlreadyRegistered { definition: i32, environment: i32 },

    /// A lifecycle transition that the state machine does not permit.
    #[error("invalid task transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A status callback referenced a remote handle no task is tracking.
    #[error("no task tracked for remote id {0}")]
    UnknownRemoteTask(String),

    /// The store collaborator failed.
    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TaskopsError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskopsError>;
