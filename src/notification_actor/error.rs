use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),
    #[error("Notification validation error: {0}")]
    ValidationError(String),
    #[error("Notifications are never deleted")]
    Undeletable,
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for NotificationError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => NotificationError::NotFound(id),
            other => NotificationError::ActorCommunicationError(other.to_string()),
        }
    }
}
