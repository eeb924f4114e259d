//! Business domain entities. Pure data structures with no actor-specific concerns.

pub mod files;
pub mod invoice;
pub mod notification;
pub mod order;
pub mod user;

pub use files::*;
pub use invoice::*;
pub use notification::*;
pub use order::*;
pub use user::*;
