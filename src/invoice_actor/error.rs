use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::PaymentStatus;

/// Errors that can occur during invoice operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvoiceError {
    #[error("Invoice not found: {0}")]
    NotFound(String),
    #[error("Invoice validation error: {0}")]
    ValidationError(String),
    #[error("Invoice is already paid")]
    AlreadyPaid,
    #[error("Cannot {action} an invoice that is {status}")]
    InvalidPaymentState { status: PaymentStatus, action: &'static str },
    #[error("Invoice conflict: {0}")]
    Conflict(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for InvoiceError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => InvoiceError::NotFound(id),
            FrameworkError::Conflict { field, value } => InvoiceError::Conflict(format!("{} {}", field, value)),
            other => InvoiceError::ActorCommunicationError(other.to_string()),
        }
    }
}
