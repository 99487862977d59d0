//! Common types for the dine ordering system.
//!
//! Everything that crosses a crate boundary lives here: the menu, order and
//! session records persisted by the store, the HTTP error envelope, the
//! storage namespaces and the configuration schema helpers used by the
//! pluggable storage and gateway implementations.

/// API error types shared by the HTTP handlers.
pub mod api;
/// Menu item records and their create/update payloads.
pub mod menu;
/// Orders, order lines and the order status lifecycle.
pub mod order;
/// Phone number normalization.
pub mod phone;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Per-customer conversation sessions.
pub mod session;
/// Storage namespaces.
pub mod storage;
/// Configuration validation types.
pub mod validation;

pub use api::*;
pub use menu::*;
pub use order::*;
pub use phone::{normalize_phone, strip_channel_prefix};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use session::*;
pub use storage::*;
pub use validation::*;

/// Decimal type used for all prices and totals.
pub use rust_decimal::Decimal;
