//! Order document rules: the per-order half of the lifecycle state machine.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
