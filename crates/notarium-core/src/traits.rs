//! Core traits for Notarium abstractions.
//!
//! These traits define the seams between the engine and its collaborators:
//! the remote note authority, the authentication credential source, the
//! capture device layer, and the speech recognition engine. Concrete
//! implementations live in the gateway and capture crates; deterministic
//! test doubles implement the same traits.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PERSISTENCE GATEWAY
// =============================================================================

/// Remote note authority: the persistence gateway's outward face.
///
/// Every operation is idempotent at note granularity. Implementations must
/// distinguish authentication failures from transport failures and surface
/// `NotFound` when an id no longer exists remotely.
#[async_trait]
pub trait NoteAuthority: Send + Sync {
    /// Fetch all notes, most recently modified first.
    async fn fetch_all(&self) -> Result<Vec<Note>>;

    /// Create a note from a draft; the authority assigns the identity.
    async fn create(&self, draft: NoteDraft) -> Result<Note>;

    /// Apply a partial update to an existing note.
    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note>;

    /// Delete a note. No soft-delete.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Toggle the favorite flag. The server is authoritative for the new
    /// value; callers never guess it.
    async fn toggle_favorite(&self, id: Uuid) -> Result<Note>;

    /// Upload a finished clip as a media attachment. Precondition: `id`
    /// must already exist remotely.
    async fn attach_media(
        &self,
        id: Uuid,
        kind: MediaKind,
        payload: Vec<u8>,
    ) -> Result<MediaAttachment>;
}

/// Supplies the bearer credential for authority calls.
///
/// Absence of a credential is a fatal precondition (`Error::Auth`), not an
/// empty or retryable state.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token provider backed by a fixed string (tests, CLI tooling).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

/// Token provider reading `NOTARIUM_API_TOKEN` on every call, so a rotated
/// credential takes effect without restarting.
#[derive(Default)]
pub struct EnvTokenProvider;

impl TokenProvider for EnvTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(crate::defaults::ENV_API_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

// =============================================================================
// CAPTURE DEVICES
// =============================================================================

/// Acquires capture devices for recording sessions.
///
/// Audio acquires the microphone; video acquires camera + microphone with
/// the requested facing. Denial is a first-class outcome (`Error::Device`),
/// not an exception to swallow.
#[async_trait]
pub trait DeviceBroker: Send + Sync {
    async fn acquire(
        &self,
        kind: MediaKind,
        facing: Option<CameraFacing>,
    ) -> Result<Box<dyn CaptureHandle>>;
}

/// A granted capture device.
///
/// `release` must be idempotent; sessions call it unconditionally on stop
/// and discard, and again defensively on drop paths.
pub trait CaptureHandle: Send {
    fn kind(&self) -> MediaKind;
    fn release(&mut self);
    fn is_released(&self) -> bool;
}

// =============================================================================
// SPEECH RECOGNITION
// =============================================================================

/// One event from a recognition stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Provisional text; replaces any previous interim transcript.
    Interim(String),
    /// Finalized span; appended to the accumulated transcript, never revised.
    Final(String),
    /// The underlying engine ended the stream (explicit stop, or silence
    /// timeout when not continuous).
    Ended,
}

/// Speech-to-text engine seam for dictation sessions.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start listening and return the recognition event stream.
    async fn listen(
        &self,
        language: &str,
        continuous: bool,
    ) -> Result<mpsc::Receiver<RecognitionEvent>>;

    /// Request the current stream to end. The stream yields `Ended` after
    /// any already-finalized spans.
    fn stop(&self);
}
