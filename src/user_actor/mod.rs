//! User directory rules: account validation, activation and assignment back-references.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
