//! # notarium-engine
//!
//! The Notarium engine: an explicit service object owning all note and
//! session state. It binds the in-memory note store, the debounced autosave
//! scheduler, the editor session, and the capture sessions to the
//! persistence gateway, and emits engine events for the presentation layer.
//!
//! The presentation layer holds an `Arc<Engine>` handle; there are no
//! ambient singletons.

pub mod autosave;
pub mod config;
pub mod editor;
pub mod engine;
pub mod store;

pub use autosave::DebounceState;
pub use config::EngineConfig;
pub use editor::EditorSession;
pub use engine::{AutosaveHandle, Engine};
pub use store::NoteStore;
