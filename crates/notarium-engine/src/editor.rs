//! Editor session: the ephemeral binding between one note and the active
//! editing surface.
//!
//! Holds the draft buffer and the edit generation counter the flush path
//! uses to decide whether edits arrived during an in-flight save. Word and
//! character counts are pure recomputations from the draft's plain-text
//! projection, independent of autosave timing.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use notarium_core::models::{char_count, word_count};
use notarium_core::{Note, NoteDraft};

/// Immutable view of the draft taken at flush time.
#[derive(Debug, Clone)]
pub struct FlushSnapshot {
    pub note_id: Option<Uuid>,
    pub draft: NoteDraft,
    pub generation: u64,
}

/// Binding of at most one note (None = new draft) to a live draft buffer.
#[derive(Debug, Clone)]
pub struct EditorSession {
    note_id: Option<Uuid>,
    draft: NoteDraft,
    generation: u64,
    flushed_generation: u64,
    last_saved_at: Option<DateTime<Utc>>,
}

impl EditorSession {
    /// Open a fresh unsaved draft.
    pub fn new_draft() -> Self {
        Self {
            note_id: None,
            draft: NoteDraft::default(),
            generation: 0,
            flushed_generation: 0,
            last_saved_at: None,
        }
    }

    /// Open an existing note for editing.
    pub fn for_note(note: &Note) -> Self {
        Self {
            note_id: Some(note.id),
            draft: NoteDraft::from(note),
            generation: 0,
            flushed_generation: 0,
            last_saved_at: Some(note.updated_at_utc),
        }
    }

    pub fn note_id(&self) -> Option<Uuid> {
        self.note_id
    }

    pub fn draft(&self) -> &NoteDraft {
        &self.draft
    }

    /// Whether edits exist that no successful flush has carried yet.
    pub fn is_dirty(&self) -> bool {
        self.generation > self.flushed_generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Reactive word count of the draft content.
    pub fn word_count(&self) -> u32 {
        word_count(&self.draft.content)
    }

    /// Reactive character count of the draft content.
    pub fn char_count(&self) -> u32 {
        char_count(&self.draft.content)
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if self.draft.title != title {
            self.draft.title = title;
            self.touch();
        }
    }

    pub fn set_occurred_at(&mut self, occurred_at: DateTime<Utc>) {
        if self.draft.occurred_at != occurred_at {
            self.draft.occurred_at = occurred_at;
            self.touch();
        }
    }

    pub fn set_course(&mut self, course: impl Into<String>) {
        let course = course.into();
        if self.draft.course != course {
            self.draft.course = course;
            self.touch();
        }
    }

    pub fn set_tutor(&mut self, tutor: impl Into<String>) {
        let tutor = tutor.into();
        if self.draft.tutor != tutor {
            self.draft.tutor = tutor;
            self.touch();
        }
    }

    pub fn set_tags(&mut self, tags: impl Into<String>) {
        let tags = tags.into();
        if self.draft.tags != tags {
            self.draft.tags = tags;
            self.touch();
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if self.draft.content != content {
            self.draft.content = content;
            self.touch();
        }
    }

    pub fn set_background(&mut self, background: impl Into<String>) {
        let background = background.into();
        if self.draft.background != background {
            self.draft.background = background;
            self.touch();
        }
    }

    /// Append plain text (dictation transcript) to the draft content.
    pub fn insert_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.draft.content.is_empty() {
            self.draft.content.push(' ');
        }
        self.draft.content.push_str(text);
        self.touch();
    }

    /// Snapshot the draft for a flush.
    pub fn snapshot(&self) -> FlushSnapshot {
        FlushSnapshot {
            note_id: self.note_id,
            draft: self.draft.clone(),
            generation: self.generation,
        }
    }

    /// Record a successful flush of `snapshot_generation` and re-bind to
    /// the authoritative identity. The session stays dirty when edits
    /// arrived after the snapshot was taken.
    pub fn mark_flushed(&mut self, snapshot_generation: u64, note: &Note) {
        self.note_id = Some(note.id);
        if snapshot_generation > self.flushed_generation {
            self.flushed_generation = snapshot_generation;
        }
        self.last_saved_at = Some(note.updated_at_utc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn saved_note(title: &str) -> Note {
        let ts = Utc.timestamp_opt(1_000, 0).unwrap();
        Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            occurred_at: ts,
            course: "Physics".to_string(),
            tutor: String::new(),
            tags: String::new(),
            content: "<p>one two three</p>".to_string(),
            background: String::new(),
            favorite: false,
            word_count: 3,
            has_media: false,
            media: vec![],
            created_at_utc: ts,
            updated_at_utc: ts,
        }
    }

    #[test]
    fn test_new_draft_is_clean_and_unbound() {
        let session = EditorSession::new_draft();
        assert_eq!(session.note_id(), None);
        assert!(!session.is_dirty());
        assert_eq!(session.last_saved_at(), None);
    }

    #[test]
    fn test_for_note_copies_fields() {
        let note = saved_note("Waves");
        let session = EditorSession::for_note(&note);
        assert_eq!(session.note_id(), Some(note.id));
        assert_eq!(session.draft().title, "Waves");
        assert_eq!(session.draft().course, "Physics");
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut session = EditorSession::new_draft();
        session.set_title("Biology Lab");
        assert!(session.is_dirty());
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_noop_setter_does_not_touch() {
        let mut session = EditorSession::new_draft();
        session.set_title("A");
        let generation = session.generation();
        session.set_title("A");
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn test_counts_are_reactive_projections() {
        let mut session = EditorSession::new_draft();
        session.set_content("<p>alpha beta</p>");
        assert_eq!(session.word_count(), 2);
        assert_eq!(session.char_count(), 10);
        session.insert_text("gamma");
        assert_eq!(session.word_count(), 3);
    }

    #[test]
    fn test_insert_text_appends_with_separator() {
        let mut session = EditorSession::new_draft();
        session.insert_text("first");
        session.insert_text("  second  ");
        session.insert_text("   ");
        assert_eq!(session.draft().content, "first second");
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_mark_flushed_rebinds_and_cleans() {
        let mut session = EditorSession::new_draft();
        session.set_title("T");
        let snapshot = session.snapshot();

        let note = saved_note("T");
        session.mark_flushed(snapshot.generation, &note);
        assert_eq!(session.note_id(), Some(note.id));
        assert!(!session.is_dirty());
        assert_eq!(session.last_saved_at(), Some(note.updated_at_utc));
    }

    #[test]
    fn test_edit_after_snapshot_keeps_session_dirty() {
        let mut session = EditorSession::new_draft();
        session.set_title("T");
        let snapshot = session.snapshot();

        // An edit lands while the flush is in flight.
        session.set_content("typed during save");
        let note = saved_note("T");
        session.mark_flushed(snapshot.generation, &note);
        assert!(session.is_dirty(), "in-flight edit must survive the flush");
    }
}
