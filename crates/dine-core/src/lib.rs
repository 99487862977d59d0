//! Core of the dine ordering system.
//!
//! Holds the typed store over the storage backend, the chat message catalogue,
//! the per-customer conversation state machine and the engine that the HTTP
//! layer talks to. Use [`DineBuilder`] to assemble an engine from
//! configuration.

pub mod builder;
pub mod conversation;
pub mod engine;
pub mod messages;
pub mod store;

pub use builder::{BuilderError, DineBuilder, DineFactories};
pub use conversation::{ConversationError, ConversationHandler};
pub use engine::{DineEngine, EngineError, OrderRequest};
pub use messages::{ErrorKind, Messages};
pub use store::{StatusChange, Store, StoreError};
