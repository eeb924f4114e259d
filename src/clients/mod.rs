//! Typed clients: the public operations of the desk.
//!
//! Each wraps a `ResourceClient` for its own store and talks to the other
//! stores only through their clients.

#[macro_use]
mod macros;
pub(crate) mod access;
pub mod invoice_client;
pub mod notification_client;
pub mod order_client;
pub mod user_client;

pub use invoice_client::{InvoiceClient, InvoiceRequest, PaymentSession};
pub use notification_client::NotificationClient;
pub use order_client::{
    BulkAssignment, BulkFailure, LifecycleSettings, NewOrder, OrderClient, OrderQuery, SampleUpload, WorkReport,
};
pub use user_client::{AdminSeed, Signup, StaffAccount, UserClient};
