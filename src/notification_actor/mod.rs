//! Notification inbox records. Created once, then only the read flag moves.

pub mod entity;
pub mod error;

pub use entity::NotificationAction;
pub use error::*;
