//! Error taxonomy surfaced to callers of the desk.
//!
//! Each store keeps its own error enum; everything that leaves a client is an
//! [`AppError`], which maps onto an HTTP status and the JSON error envelope.

use serde::Serialize;
use thiserror::Error;

use crate::gateways::GatewayError;
use crate::invoice_actor::InvoiceError;
use crate::notification_actor::NotificationError;
use crate::order_actor::OrderError;
use crate::user_actor::UserError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    ExternalService(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Authorization(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Authorization(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::ExternalService(_) => 502,
            AppError::Internal(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Authorization(_) => "AuthorizationError",
            AppError::ExternalService(_) => "ExternalServiceError",
            AppError::Internal(_) => "InternalError",
        }
    }
}

/// `{ "success": false, "message": ..., "error": ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AppError> for ErrorEnvelope {
    fn from(e: &AppError) -> Self {
        Self {
            success: false,
            message: e.to_string(),
            error: Some(e.kind().to_string()),
        }
    }
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => AppError::NotFound(e.to_string()),
            UserError::AlreadyExists(_) | UserError::ValidationError(_) => AppError::Validation(e.to_string()),
            UserError::ActorCommunicationError(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NotFound(_) => AppError::NotFound(e.to_string()),
            OrderError::ValidationError(_)
            | OrderError::InvalidTransition { .. }
            | OrderError::NoPendingWork
            | OrderError::Conflict(_) => AppError::Validation(e.to_string()),
            OrderError::ActorCommunicationError(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<InvoiceError> for AppError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(_) => AppError::NotFound(e.to_string()),
            InvoiceError::ValidationError(_)
            | InvoiceError::AlreadyPaid
            | InvoiceError::InvalidPaymentState { .. }
            | InvoiceError::Conflict(_) => AppError::Validation(e.to_string()),
            InvoiceError::ActorCommunicationError(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<NotificationError> for AppError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::NotFound(_) => AppError::NotFound(e.to_string()),
            NotificationError::ValidationError(_) | NotificationError::Undeletable => {
                AppError::Validation(e.to_string())
            }
            NotificationError::ActorCommunicationError(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        AppError::ExternalService(e.to_string())
    }
}
