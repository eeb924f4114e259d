//! Order desk: the order-management backend of a custom embroidery and patch
//! shop. Orders, users, invoices and notifications each live in their own
//! actor; the typed clients in [`clients`] are the public operations.

pub mod actor_framework;
pub mod app_system;
pub mod clients;
pub mod domain;
pub mod error;
pub mod gateways;
pub mod invoice_actor;
pub mod notification_actor;
pub mod order_actor;
pub mod user_actor;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod mock_framework;
