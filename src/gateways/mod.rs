//! External collaborators the desk talks to: email, file storage, payments and
//! real-time push. Each is a trait so the system can be wired with production
//! clients or test doubles.

pub mod emails;
pub mod mailer;
pub mod payments;
pub mod push;
pub mod storage;

#[cfg(test)]
pub mod testing;

use thiserror::Error;

pub use mailer::*;
pub use payments::*;
pub use push::*;
pub use storage::*;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rejected by provider: {0}")]
    Rejected(String),
    #[error("Unexpected provider response: {0}")]
    Protocol(String),
    #[error("Storage error: {0}")]
    Io(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(e.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
