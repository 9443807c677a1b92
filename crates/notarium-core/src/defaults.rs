//! Centralized default constants for the Notarium engine.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// AUTOSAVE
// =============================================================================

/// Quiescence delay before a dirty draft is flushed, in milliseconds.
/// Two seconds of no further edits is long enough to coalesce a typing
/// burst and short enough that focus loss rarely races the timer.
pub const AUTOSAVE_DELAY_MS: u64 = 2_000;

/// Title persisted when a draft is saved with an empty title.
pub const UNTITLED_TITLE: &str = "Untitled Note";

// =============================================================================
// CAPTURE
// =============================================================================

/// Recorder elapsed-time tick interval in milliseconds (display resolution).
pub const RECORDER_TICK_MS: u64 = 250;

/// Default BCP-47 language tag for dictation sessions.
pub const DICTATION_LANGUAGE: &str = "en-US";

// =============================================================================
// GATEWAY
// =============================================================================

/// Default remote note authority base URL.
pub const API_BASE_URL: &str = "http://127.0.0.1:4000";

/// Timeout for note CRUD requests in seconds.
pub const API_TIMEOUT_SECS: u64 = 30;

/// Timeout for media uploads in seconds (clips can be large).
pub const MEDIA_UPLOAD_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Override for [`AUTOSAVE_DELAY_MS`].
pub const ENV_AUTOSAVE_DELAY_MS: &str = "NOTARIUM_AUTOSAVE_DELAY_MS";

/// Override for [`RECORDER_TICK_MS`].
pub const ENV_RECORDER_TICK_MS: &str = "NOTARIUM_RECORDER_TICK_MS";

/// Override for [`API_BASE_URL`].
pub const ENV_API_BASE_URL: &str = "NOTARIUM_API_URL";

/// Bearer credential for the remote note authority.
pub const ENV_API_TOKEN: &str = "NOTARIUM_API_TOKEN";
