//! Invoice document rules: totals and the payment state machine.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
