use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Cannot {action} while order is {from}")]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error("No pending work to review")]
    NoPendingWork,
    #[error("Order conflict: {0}")]
    Conflict(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::Conflict { field, value } => OrderError::Conflict(format!("{} {}", field, value)),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
