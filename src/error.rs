use serde::{Deserialize, Serialize};

/// Engine-wide error taxonomy.
///
/// Every use case surfaces exactly one of these kinds. Validation, NotFound,
/// Authorization and StateConflict indicate caller error or a legitimate race
/// and are never retried by the engine; Dependency marks a failed call to a
/// required collaborator. All of them roll the unit of work back in full.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("authorization denied: {0}")]
    Authorization(String),

    #[error("dependency failure: {0}")]
    Dependency(String),
}

/// Stable, serializable error kind for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Authorization,
    Dependency,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Dependency(_) => ErrorKind::Dependency,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::Dependency(msg.into())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
