//! Structured logging field name constants for Notarium.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Lost work is possible, requires user attention |
//! | WARN  | Recoverable issue (failed autosave kept dirty, device released late) |
//! | INFO  | Lifecycle events (engine start/shutdown, session open/close) |
//! | DEBUG | Decision points (flush triggers, state transitions) |
//! | TRACE | Per-chunk / per-recognition-event volume |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Capture modality ("audio" | "video").
pub const MEDIA_KIND: &str = "media_kind";

/// Logical operation name.
/// Examples: "flush", "create", "toggle_favorite", "attach_media"
pub const OPERATION: &str = "op";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Recorder elapsed capture time in milliseconds.
pub const ELAPSED_MS: &str = "elapsed_ms";

/// Number of buffered chunks in a recording session.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Derived word count at flush time.
pub const WORD_COUNT: &str = "word_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
