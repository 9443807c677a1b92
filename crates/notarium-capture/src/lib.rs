//! # notarium-capture
//!
//! Recording and dictation session state machines over the abstract device
//! and speech-recognition seams defined in `notarium-core`. The sessions
//! own no I/O themselves; platform glue feeds them chunks and recognition
//! events, and the engine crate drives their lifecycle.

pub mod dictation;
pub mod recorder;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use dictation::{DictationSession, DictationState};
pub use recorder::{format_elapsed, RecorderState, RecordingSession};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockDeviceBroker, MockRecognizer};
