//! Core data models for the Notarium engine.
//!
//! These types are shared across all Notarium crates and represent the
//! persisted note shape plus the draft/patch shapes used by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// Capture modality for recordings and attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Microphone capture
    Audio,
    /// Camera + microphone capture
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Camera selection for video capture. Exactly one facing is active at a
/// time; switching is a device re-acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    #[default]
    Front,
    Back,
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

/// A media clip attached to a persisted note.
///
/// Attachments exist only for notes that already have an identity; the
/// gateway rejects uploads against drafts before any request is issued.
/// Append-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAttachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub kind: MediaKind,
    /// Opaque reference to the uploaded binary (remote URL or storage key).
    pub payload_ref: String,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A persisted note as confirmed by the remote authority.
///
/// `word_count` and `has_media` are derived fields, recomputed from
/// `content` and `media` at save time; callers never set them directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    /// User-editable "occurred at" date, distinct from `created_at_utc`.
    pub occurred_at: DateTime<Utc>,
    pub course: String,
    pub tutor: String,
    /// Comma-separated free text.
    pub tags: String,
    /// Opaque serialized rich-text blob. The engine never parses it beyond
    /// the plain-text projection used for word/character counts.
    pub content: String,
    /// Background identifier or opaque URL.
    pub background: String,
    pub favorite: bool,
    pub word_count: u32,
    pub has_media: bool,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl Note {
    /// Recompute the derived fields from content and attachment list.
    pub fn recompute_derived(&mut self) {
        self.word_count = word_count(&self.content);
        self.has_media = !self.media.is_empty();
    }
}

/// An unsaved note shape: everything the user can edit, no identity and no
/// derived or server-managed fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub course: String,
    pub tutor: String,
    pub tags: String,
    pub content: String,
    pub background: String,
    pub favorite: bool,
}

impl Default for NoteDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            occurred_at: Utc::now(),
            course: String::new(),
            tutor: String::new(),
            tags: String::new(),
            content: String::new(),
            background: String::new(),
            favorite: false,
        }
    }
}

impl NoteDraft {
    /// Title to persist: the draft title, or the default when empty.
    pub fn effective_title(&self) -> String {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            defaults::UNTITLED_TITLE.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            occurred_at: note.occurred_at,
            course: note.course.clone(),
            tutor: note.tutor.clone(),
            tags: note.tags.clone(),
            content: note.content.clone(),
            background: note.background.clone(),
            favorite: note.favorite,
        }
    }
}

/// Partial update shape for an existing note. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl NotePatch {
    /// Full-field patch carrying a draft's current state.
    pub fn from_draft(draft: &NoteDraft) -> Self {
        Self {
            title: Some(draft.effective_title()),
            occurred_at: Some(draft.occurred_at),
            course: Some(draft.course.clone()),
            tutor: Some(draft.tutor.clone()),
            tags: Some(draft.tags.clone()),
            content: Some(draft.content.clone()),
            background: Some(draft.background.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.occurred_at.is_none()
            && self.course.is_none()
            && self.tutor.is_none()
            && self.tags.is_none()
            && self.content.is_none()
            && self.background.is_none()
    }
}

// =============================================================================
// PLAIN-TEXT PROJECTION
// =============================================================================

/// Project a rich-text content blob onto plain text.
///
/// Markup tags are replaced by single spaces and the handful of entities a
/// rich editor emits are decoded. The result is whitespace-collapsed. This
/// is the only inspection the engine ever performs on note content.
pub fn plain_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            '&' => {
                // Decode the common named entities, pass anything else through.
                let mut entity = String::new();
                let mut matched = false;
                while entity.len() < 6 {
                    match chars.peek() {
                        Some(&e) if e == ';' => {
                            chars.next();
                            matched = true;
                            break;
                        }
                        Some(&e) if e.is_ascii_alphanumeric() || e == '#' => {
                            entity.push(e);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if matched {
                    match entity.as_str() {
                        "nbsp" => out.push(' '),
                        "amp" => out.push('&'),
                        "lt" => out.push('<'),
                        "gt" => out.push('>'),
                        "quot" => out.push('"'),
                        "apos" | "#39" => out.push('\''),
                        _ => {
                            out.push('&');
                            out.push_str(&entity);
                            out.push(';');
                        }
                    }
                } else {
                    out.push('&');
                    out.push_str(&entity);
                }
            }
            _ => out.push(c),
        }
    }

    // Collapse runs of whitespace introduced by tag replacement.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word count of a content blob's plain-text projection.
pub fn word_count(content: &str) -> u32 {
    plain_text(content).split_whitespace().count() as u32
}

/// Character count of a content blob's plain-text projection.
pub fn char_count(content: &str) -> u32 {
    plain_text(content).chars().count() as u32
}
