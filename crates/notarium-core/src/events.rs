//! Engine event types and event bus for presentation-layer notifications.
//!
//! The engine aggregates events from the autosave scheduler, persistence
//! path, and capture sessions into a single broadcast channel. Downstream
//! consumers (dashboard, recorder UI, counters) subscribe independently;
//! slow or absent subscribers never block the engine.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::defaults;
use crate::models::MediaKind;

/// Domain event emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A flush resolved and the store now holds the authoritative record.
    NoteSaved { note_id: Uuid, created: bool },
    /// A note was deleted locally and remotely.
    NoteDeleted { note_id: Uuid },
    /// The server confirmed a new favorite value.
    FavoriteToggled { note_id: Uuid, favorite: bool },
    /// An autosave flush failed; the draft stays dirty.
    AutosaveFailed {
        note_id: Option<Uuid>,
        error: String,
    },
    /// A clip upload resolved and `has_media` is now set.
    MediaAttached { note_id: Uuid, kind: MediaKind },
    /// Recorder elapsed-time display tick.
    RecorderTick { kind: MediaKind, elapsed_ms: u64 },
    /// Dictation interim transcript replaced.
    DictationInterim { text: String },
    /// Dictation final transcript grew.
    DictationFinal { text: String },
}

impl EngineEvent {
    /// Dot-namespaced event type name for subscribers that route by kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NoteSaved { .. } => "note.saved",
            Self::NoteDeleted { .. } => "note.deleted",
            Self::FavoriteToggled { .. } => "note.favorite_toggled",
            Self::AutosaveFailed { .. } => "autosave.failed",
            Self::MediaAttached { .. } => "media.attached",
            Self::RecorderTick { .. } => "recorder.tick",
            Self::DictationInterim { .. } => "dictation.interim",
            Self::DictationFinal { .. } => "dictation.final",
        }
    }
}

/// Broadcast-based event bus.
///
/// Cloning the bus shares the underlying channel. Emission is best-effort:
/// with no subscribers the event is dropped, and a lagged subscriber skips
/// ahead rather than stalling the sender.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(defaults::EVENT_BUS_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
