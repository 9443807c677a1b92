//! # notarium-core
//!
//! Core types, traits, and abstractions for the Notarium note capture and
//! synchronization engine.
//!
//! This crate provides the data model, error taxonomy, and trait seams that
//! the gateway, capture, and engine crates depend on. It performs no I/O.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EngineEvent, EventBus};
pub use models::*;
pub use traits::*;
