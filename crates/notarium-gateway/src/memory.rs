//! In-memory note authority for deterministic testing.
//!
//! Serves the [`NoteAuthority`] contract from a map, records every call,
//! and can be primed to fail the next operation with a chosen error kind.
//! Engine tests use it to assert call counts and ordering without a
//! network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use notarium_core::{
    Error, MediaAttachment, MediaKind, Note, NoteAuthority, NoteDraft, NotePatch, Result,
};

/// One recorded authority call.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorityCall {
    FetchAll,
    Create,
    Update(Uuid),
    Delete(Uuid),
    ToggleFavorite(Uuid),
    AttachMedia(Uuid, MediaKind),
}

/// Error kind injected for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectedFailure {
    Transport,
    Auth,
}

/// In-memory [`NoteAuthority`] implementation.
#[derive(Default)]
pub struct InMemoryAuthority {
    notes: Mutex<HashMap<Uuid, Note>>,
    calls: Mutex<Vec<AuthorityCall>>,
    fail_next: Mutex<Option<InjectedFailure>>,
}

impl InMemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the authority with pre-existing notes.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let authority = Self::new();
        {
            let mut map = authority.notes.lock().unwrap();
            for note in notes {
                map.insert(note.id, note);
            }
        }
        authority
    }

    /// Fail the next call with a transport error.
    pub fn fail_next_with_transport(&self) {
        *self.fail_next.lock().unwrap() = Some(InjectedFailure::Transport);
    }

    /// Fail the next call with an auth error.
    pub fn fail_next_with_auth(&self) {
        *self.fail_next.lock().unwrap() = Some(InjectedFailure::Auth);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<AuthorityCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls matching a predicate.
    pub fn call_count(&self, predicate: impl Fn(&AuthorityCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    /// Current remote state of one note.
    pub fn note(&self, id: Uuid) -> Option<Note> {
        self.notes.lock().unwrap().get(&id).cloned()
    }

    /// Number of notes held remotely.
    pub fn note_count(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    fn record(&self, call: AuthorityCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.fail_next.lock().unwrap().take() {
            Some(InjectedFailure::Transport) => {
                Err(Error::Transport("injected transport failure".to_string()))
            }
            Some(InjectedFailure::Auth) => {
                Err(Error::Auth("injected credential failure".to_string()))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NoteAuthority for InMemoryAuthority {
    async fn fetch_all(&self) -> Result<Vec<Note>> {
        self.record(AuthorityCall::FetchAll)?;
        let mut notes: Vec<Note> = self.notes.lock().unwrap().values().cloned().collect();
        notes.sort_by(|a, b| b.updated_at_utc.cmp(&a.updated_at_utc));
        Ok(notes)
    }

    async fn create(&self, draft: NoteDraft) -> Result<Note> {
        self.record(AuthorityCall::Create)?;
        let now = Utc::now();
        let mut note = Note {
            id: Uuid::new_v4(),
            title: draft.effective_title(),
            occurred_at: draft.occurred_at,
            course: draft.course,
            tutor: draft.tutor,
            tags: draft.tags,
            content: draft.content,
            background: draft.background,
            favorite: draft.favorite,
            word_count: 0,
            has_media: false,
            media: vec![],
            created_at_utc: now,
            updated_at_utc: now,
        };
        note.recompute_derived();
        self.notes.lock().unwrap().insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        self.record(AuthorityCall::Update(id))?;
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(occurred_at) = patch.occurred_at {
            note.occurred_at = occurred_at;
        }
        if let Some(course) = patch.course {
            note.course = course;
        }
        if let Some(tutor) = patch.tutor {
            note.tutor = tutor;
        }
        if let Some(tags) = patch.tags {
            note.tags = tags;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(background) = patch.background {
            note.background = background;
        }
        note.updated_at_utc = Utc::now();
        note.recompute_derived();
        Ok(note.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.record(AuthorityCall::Delete(id))?;
        self.notes
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NoteNotFound(id))
    }

    async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        self.record(AuthorityCall::ToggleFavorite(id))?;
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.favorite = !note.favorite;
        note.updated_at_utc = Utc::now();
        Ok(note.clone())
    }

    async fn attach_media(
        &self,
        id: Uuid,
        kind: MediaKind,
        payload: Vec<u8>,
    ) -> Result<MediaAttachment> {
        self.record(AuthorityCall::AttachMedia(id, kind))?;
        if payload.is_empty() {
            return Err(Error::Precondition("empty media payload".to_string()));
        }
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;

        let attachment = MediaAttachment {
            id: Uuid::new_v4(),
            note_id: id,
            kind,
            payload_ref: format!("mem://{}/{}", id, note.media.len()),
            created_at_utc: Utc::now(),
        };
        note.media.push(attachment.clone());
        note.recompute_derived();
        note.updated_at_utc = Utc::now();
        Ok(attachment)
    }
}
