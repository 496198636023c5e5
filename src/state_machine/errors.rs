use super::states::RequestStatus;
use crate::error::EngineError;
use crate::models::actor::ActorRole;

/// Errors raised by the pure transition planner
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("no transition from {from} for event {event}")]
    InvalidTransition { from: RequestStatus, event: String },

    #[error("actor role {role} may not issue {event}")]
    UnauthorizedActor { role: ActorRole, event: String },
}

impl From<StateMachineError> for EngineError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::InvalidTransition { .. } => {
                EngineError::StateConflict(err.to_string())
            }
            StateMachineError::UnauthorizedActor { .. } => {
                EngineError::Authorization(err.to_string())
            }
        }
    }
}

pub type StateMachineResult<T> = std::result::Result<T, StateMachineError>;
