//! # notarium-gateway
//!
//! Persistence gateway for the Notarium engine: an HTTP implementation of
//! the [`NoteAuthority`] seam against the remote note authority, plus an
//! in-memory test double behind the `mock` feature.
//!
//! [`NoteAuthority`]: notarium_core::NoteAuthority

pub mod config;
pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod memory;

pub use config::GatewayConfig;
pub use http::HttpNoteAuthority;

#[cfg(any(test, feature = "mock"))]
pub use memory::{AuthorityCall, InMemoryAuthority};
