//! # convoy-core
//!
//! Core crate for the Convoy shipment tracking system, providing:
//!
//! - **Types** (`types`): coordinates, position samples, movements, orders, status enums
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): tracking error taxonomy via thiserror
//! - **Collaborators** (`store`, `geocode`): record store and geocoding contracts
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod store;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
