//! The engine facade: one explicit service object owning all note and
//! session state, constructed once per process and shared by handle.
//!
//! All operations that act on "the open note" go through the engine's
//! editor slot; nothing reads ambient globals. Scheduled work (autosave
//! driver, recorder tickers, dictation pump) runs as tasks owned by the
//! engine and cancelable on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notarium_capture::{DictationSession, DictationState, RecorderState, RecordingSession};
use notarium_core::{
    CameraFacing, CaptureHandle, DeviceBroker, EngineEvent, Error, EventBus, MediaAttachment,
    MediaKind, Note, NoteAuthority, NotePatch, RecognitionEvent, Result, SpeechRecognizer,
};

use crate::autosave::DebounceState;
use crate::config::EngineConfig;
use crate::editor::EditorSession;
use crate::store::NoteStore;

/// Lock a task-handle mutex, recovering from poisoning. The guarded maps
/// only hold `JoinHandle`s, so a panicked writer leaves nothing invalid.
fn lock_poison_free<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Handle for the running autosave driver task.
pub struct AutosaveHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stop the driver. A dirty draft is flushed before the driver exits,
    /// ordered ahead of the shutdown completing.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(()).await;
        self.handle
            .await
            .map_err(|e| Error::Internal(format!("autosave driver panicked: {}", e)))
    }
}

/// Note capture and synchronization engine.
pub struct Engine {
    authority: Arc<dyn NoteAuthority>,
    devices: Arc<dyn DeviceBroker>,
    recognizer: Arc<dyn SpeechRecognizer>,
    config: EngineConfig,
    events: EventBus,
    store: RwLock<NoteStore>,
    editor: Mutex<Option<EditorSession>>,
    autosave: Mutex<DebounceState>,
    edit_notify: Notify,
    recorders: Mutex<HashMap<MediaKind, RecordingSession>>,
    tickers: std::sync::Mutex<HashMap<MediaKind, JoinHandle<()>>>,
    dictation: Mutex<Option<DictationSession>>,
    dictation_pump: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        authority: Arc<dyn NoteAuthority>,
        devices: Arc<dyn DeviceBroker>,
        recognizer: Arc<dyn SpeechRecognizer>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let events = EventBus::with_capacity(config.event_capacity);
        let autosave = DebounceState::new(config.autosave_delay());
        Arc::new(Self {
            authority,
            devices,
            recognizer,
            config,
            events,
            store: RwLock::new(NoteStore::new()),
            editor: Mutex::new(None),
            autosave: Mutex::new(autosave),
            edit_notify: Notify::new(),
            recorders: Mutex::new(HashMap::new()),
            tickers: std::sync::Mutex::new(HashMap::new()),
            dictation: Mutex::new(None),
            dictation_pump: std::sync::Mutex::new(None),
        })
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // NOTE STORE
    // =========================================================================

    /// Refresh the store wholesale from the remote authority.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize> {
        let notes = self.authority.fetch_all().await?;
        let count = notes.len();
        self.store.write().await.replace_all(notes);
        info!(count, "note store refreshed");
        Ok(count)
    }

    /// Snapshot of all cached notes, most recently modified first.
    pub async fn list_notes(&self) -> Vec<Note> {
        self.store.read().await.list()
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Note> {
        self.store
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    /// Delete a note remotely and locally together.
    #[instrument(skip(self))]
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.authority.delete(id).await?;
        let _ = self.store.write().await.remove(id);

        // Closing the editor for a note that no longer exists drops its
        // pending edits; there is nothing left to save them against.
        let mut editor = self.editor.lock().await;
        if editor.as_ref().and_then(|e| e.note_id()) == Some(id) {
            *editor = None;
            self.autosave.lock().await.reset();
        }
        drop(editor);

        self.events.emit(EngineEvent::NoteDeleted { note_id: id });
        Ok(())
    }

    /// Toggle the favorite flag on a persisted note. The confirmed record
    /// carries the server's value, never a local guess.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        let note = self.authority.toggle_favorite(id).await?;
        self.store.write().await.upsert(note.clone());
        self.events.emit(EngineEvent::FavoriteToggled {
            note_id: note.id,
            favorite: note.favorite,
        });
        Ok(note)
    }

    /// Toggle favorite on the open note. A draft has no server record for
    /// the server to be authoritative about.
    pub async fn toggle_favorite_open(&self) -> Result<Note> {
        let id = {
            let editor = self.editor.lock().await;
            editor.as_ref().and_then(|e| e.note_id()).ok_or_else(|| {
                Error::Precondition("save the note before marking it favorite".to_string())
            })?
        };
        self.toggle_favorite(id).await
    }

    /// Drop an attachment from the cached record only. Local curation:
    /// no remote delete is issued.
    pub async fn remove_attachment_local(
        &self,
        note_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Note> {
        let mut store = self.store.write().await;
        let mut note = store
            .get(note_id)
            .cloned()
            .ok_or(Error::NoteNotFound(note_id))?;
        let before = note.media.len();
        note.media.retain(|m| m.id != attachment_id);
        if note.media.len() == before {
            return Err(Error::NotFound(format!("attachment {}", attachment_id)));
        }
        note.recompute_derived();
        debug!(%note_id, %attachment_id, "attachment removed locally");
        Ok(store.upsert(note))
    }

    // =========================================================================
    // EDITOR SESSION
    // =========================================================================

    /// Open a fresh unsaved draft, flushing the previous binding first.
    pub async fn open_draft(&self) -> Result<()> {
        self.flush_before_switch().await?;
        *self.editor.lock().await = Some(EditorSession::new_draft());
        self.autosave.lock().await.reset();
        debug!("editor bound to new draft");
        Ok(())
    }

    /// Open an existing note for editing, flushing the previous binding
    /// first so no content bleeds between notes.
    pub async fn open_note(&self, id: Uuid) -> Result<()> {
        let note = self.get_note(id).await?;
        self.flush_before_switch().await?;
        *self.editor.lock().await = Some(EditorSession::for_note(&note));
        self.autosave.lock().await.reset();
        debug!(note_id = %id, "editor bound to note");
        Ok(())
    }

    /// Save-and-close: flush pending edits, then drop the binding.
    pub async fn close_editor(&self) -> Result<()> {
        self.flush_before_switch().await?;
        *self.editor.lock().await = None;
        self.autosave.lock().await.reset();
        debug!("editor closed");
        Ok(())
    }

    /// The editing surface lost focus: flush immediately, ahead of the
    /// quiescence timer, draining any edits coalesced behind an in-flight
    /// save before returning.
    pub async fn blur(&self) -> Result<()> {
        self.flush_before_switch().await
    }

    /// Explicit save action. The first save of a never-persisted draft
    /// issues the create even when no edit has been recorded yet.
    pub async fn save_now(&self) -> Result<Option<Note>> {
        let unsaved = {
            let editor = self.editor.lock().await;
            matches!(editor.as_ref(), Some(session) if session.note_id().is_none())
        };
        if unsaved {
            let mut autosave = self.autosave.lock().await;
            if !autosave.is_dirty() && !autosave.is_in_flight() {
                autosave.record_edit(Instant::now());
            }
        }
        self.flush_editor().await
    }

    /// Identity of the open note, if the binding has one yet.
    pub async fn open_note_id(&self) -> Option<Uuid> {
        self.editor.lock().await.as_ref().and_then(|e| e.note_id())
    }

    /// Whether unsaved edits exist.
    pub async fn is_dirty(&self) -> bool {
        self.autosave.lock().await.is_dirty()
    }

    /// Reactive word count of the open draft.
    pub async fn word_count(&self) -> Result<u32> {
        let editor = self.editor.lock().await;
        editor
            .as_ref()
            .map(|e| e.word_count())
            .ok_or_else(|| Error::Precondition("no editor session is open".to_string()))
    }

    /// Reactive character count of the open draft.
    pub async fn char_count(&self) -> Result<u32> {
        let editor = self.editor.lock().await;
        editor
            .as_ref()
            .map(|e| e.char_count())
            .ok_or_else(|| Error::Precondition("no editor session is open".to_string()))
    }

    pub async fn set_title(&self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.mutate_editor(move |e| e.set_title(title)).await
    }

    pub async fn set_occurred_at(&self, occurred_at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        self.mutate_editor(move |e| e.set_occurred_at(occurred_at))
            .await
    }

    pub async fn set_course(&self, course: impl Into<String>) -> Result<()> {
        let course = course.into();
        self.mutate_editor(move |e| e.set_course(course)).await
    }

    pub async fn set_tutor(&self, tutor: impl Into<String>) -> Result<()> {
        let tutor = tutor.into();
        self.mutate_editor(move |e| e.set_tutor(tutor)).await
    }

    pub async fn set_tags(&self, tags: impl Into<String>) -> Result<()> {
        let tags = tags.into();
        self.mutate_editor(move |e| e.set_tags(tags)).await
    }

    pub async fn set_content(&self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        self.mutate_editor(move |e| e.set_content(content)).await
    }

    pub async fn set_background(&self, background: impl Into<String>) -> Result<()> {
        let background = background.into();
        self.mutate_editor(move |e| e.set_background(background))
            .await
    }

    /// Apply one draft mutation and, if it changed anything, mark dirty and
    /// (re)arm the quiescence timer.
    async fn mutate_editor<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut EditorSession),
    {
        {
            let mut editor = self.editor.lock().await;
            let session = editor
                .as_mut()
                .ok_or_else(|| Error::Precondition("no editor session is open".to_string()))?;
            let before = session.generation();
            f(session);
            if session.generation() == before {
                return Ok(());
            }
        }
        self.autosave.lock().await.record_edit(Instant::now());
        self.edit_notify.notify_one();
        Ok(())
    }

    // =========================================================================
    // FLUSH PATH
    // =========================================================================

    /// Flush the current draft if it is dirty and no flush is in flight.
    ///
    /// Returns the confirmed note when a flush ran. `Ok(None)` means there
    /// was nothing to do: clean, no editor, or a flush already running
    /// (edits made meanwhile are coalesced into the follow-up flush).
    pub async fn flush_editor(&self) -> Result<Option<Note>> {
        if !self.autosave.lock().await.begin_flush() {
            return Ok(None);
        }

        let snapshot = {
            let editor = self.editor.lock().await;
            match editor.as_ref() {
                Some(session) => session.snapshot(),
                None => {
                    self.autosave.lock().await.reset();
                    return Ok(None);
                }
            }
        };

        let started = Instant::now();
        let created = snapshot.note_id.is_none();
        let result = match snapshot.note_id {
            None => self.authority.create(snapshot.draft.clone()).await,
            Some(id) => {
                self.authority
                    .update(id, NotePatch::from_draft(&snapshot.draft))
                    .await
            }
        };

        match result {
            Ok(note) => {
                self.store.write().await.upsert(note.clone());
                {
                    let mut editor = self.editor.lock().await;
                    if let Some(session) = editor.as_mut() {
                        // Guard against the editor having been re-bound
                        // while this flush was in flight.
                        if session.note_id() == snapshot.note_id
                            || (created && session.note_id().is_none())
                        {
                            session.mark_flushed(snapshot.generation, &note);
                        }
                    }
                }
                self.autosave
                    .lock()
                    .await
                    .complete_flush(true, Instant::now());
                // Wake the driver in case a coalesced follow-up is due.
                self.edit_notify.notify_one();

                debug!(
                    note_id = %note.id,
                    created,
                    word_count = note.word_count,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "draft flushed"
                );
                self.events.emit(EngineEvent::NoteSaved {
                    note_id: note.id,
                    created,
                });
                Ok(Some(note))
            }
            Err(e) => {
                self.autosave
                    .lock()
                    .await
                    .complete_flush(false, Instant::now());
                warn!(error = %e, "flush failed; draft stays dirty");
                self.events.emit(EngineEvent::AutosaveFailed {
                    note_id: snapshot.note_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Drain all pending edits before the editor re-binds or closes,
    /// including follow-ups coalesced behind an in-flight flush.
    async fn flush_before_switch(&self) -> Result<()> {
        loop {
            let (dirty, in_flight) = {
                let autosave = self.autosave.lock().await;
                (autosave.is_dirty(), autosave.is_in_flight())
            };
            if !dirty && !in_flight {
                return Ok(());
            }
            if self.flush_editor().await?.is_none() {
                // A flush is running elsewhere; let it finish.
                tokio::task::yield_now().await;
            }
        }
    }

    // =========================================================================
    // AUTOSAVE DRIVER
    // =========================================================================

    /// Start the autosave driver task. The driver sleeps until the current
    /// quiescence deadline, flushes, and re-arms; edits wake it to pick up
    /// the pushed-back deadline.
    pub fn start_autosave(self: &Arc<Self>) -> AutosaveHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let engine = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!(
                delay_ms = engine.config.autosave_delay_ms,
                "autosave driver started"
            );
            loop {
                let deadline = engine.autosave.lock().await.deadline();
                tokio::select! {
                    _ = engine.edit_notify.notified() => {}
                    _ = shutdown_rx.recv() => {
                        // Final flush ordered before termination completes.
                        if let Err(e) = engine.flush_before_switch().await {
                            warn!(error = %e, "final flush on shutdown failed");
                        }
                        break;
                    }
                    _ = async {
                        match deadline {
                            Some(d) => sleep_until(d).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        // Failure already surfaced through the event bus;
                        // the draft stays dirty for the next trigger.
                        let _ = engine.flush_editor().await;
                    }
                }
            }
            info!("autosave driver stopped");
        });

        AutosaveHandle {
            shutdown_tx,
            handle,
        }
    }

    // =========================================================================
    // RECORDING SESSIONS
    // =========================================================================

    /// Open a recorder for one modality. Rejected while a session for the
    /// same modality is anywhere between acquiring and stopped.
    ///
    /// The broker call runs outside the recorder lock so other recorder
    /// operations stay responsive while the request pends; in particular,
    /// discarding the session cancels a pending acquisition, and a grant
    /// that lands after the cancel is released, never retained.
    #[instrument(skip(self))]
    pub async fn open_recorder(
        &self,
        kind: MediaKind,
        facing: Option<CameraFacing>,
    ) -> Result<()> {
        let (req_kind, req_facing) = {
            let mut recorders = self.recorders.lock().await;
            if let Some(existing) = recorders.get(&kind) {
                match existing.state() {
                    RecorderState::Denied
                    | RecorderState::Committed
                    | RecorderState::Discarded => {}
                    state => {
                        return Err(Error::Precondition(format!(
                            "a {} recording session is already active (state {})",
                            kind, state
                        )))
                    }
                }
            }
            let mut session = RecordingSession::new(kind);
            if let Some(facing) = facing {
                session = session.with_facing(facing)?;
            }
            let request = session.begin_acquire()?;
            recorders.insert(kind, session);
            request
        };

        let grant = self.devices.acquire(req_kind, req_facing).await;

        let mut recorders = self.recorders.lock().await;
        match recorders.get_mut(&kind) {
            // A denied session is kept so the UI can read the reason.
            Some(session) => session.complete_acquire(grant),
            None => {
                if let Ok(mut device) = grant {
                    device.release();
                }
                Err(Error::Precondition(format!(
                    "{} recording session closed while acquiring",
                    kind
                )))
            }
        }
    }

    pub async fn recorder_state(&self, kind: MediaKind) -> Option<RecorderState> {
        self.recorders.lock().await.get(&kind).map(|s| s.state())
    }

    pub async fn recorder_elapsed_display(&self, kind: MediaKind) -> Option<String> {
        self.recorders
            .lock()
            .await
            .get(&kind)
            .map(|s| s.elapsed_display())
    }

    async fn with_recorder<T>(
        &self,
        kind: MediaKind,
        f: impl FnOnce(&mut RecordingSession) -> Result<T>,
    ) -> Result<T> {
        let mut recorders = self.recorders.lock().await;
        let session = recorders
            .get_mut(&kind)
            .ok_or_else(|| Error::Precondition(format!("no open {} recorder", kind)))?;
        f(session)
    }

    /// Begin capture and start the display ticker.
    pub async fn start_recording(self: &Arc<Self>, kind: MediaKind) -> Result<()> {
        self.with_recorder(kind, |s| s.start()).await?;
        self.spawn_ticker(kind);
        Ok(())
    }

    pub async fn pause_recording(&self, kind: MediaKind) -> Result<()> {
        self.with_recorder(kind, |s| s.pause()).await
    }

    pub async fn resume_recording(&self, kind: MediaKind) -> Result<()> {
        self.with_recorder(kind, |s| s.resume()).await
    }

    /// Feed one captured fragment from the platform glue.
    pub async fn push_recording_chunk(&self, kind: MediaKind, chunk: Vec<u8>) -> Result<()> {
        self.with_recorder(kind, |s| s.push_chunk(chunk)).await
    }

    /// Stop capture; the device is released and the clip becomes available
    /// for preview.
    pub async fn stop_recording(&self, kind: MediaKind) -> Result<()> {
        let result = self.with_recorder(kind, |s| s.stop()).await;
        self.abort_ticker(kind);
        result
    }

    /// Preview bytes of a stopped recording.
    pub async fn recording_clip(&self, kind: MediaKind) -> Option<Vec<u8>> {
        self.recorders
            .lock()
            .await
            .get(&kind)
            .and_then(|s| s.clip().map(<[u8]>::to_vec))
    }

    /// Upload the stopped clip as a media attachment of the open note.
    ///
    /// Precondition: the open note already has an identity; a draft is
    /// rejected before the clip is touched and before any network call.
    #[instrument(skip(self))]
    pub async fn commit_recording(&self, kind: MediaKind) -> Result<MediaAttachment> {
        let note_id = {
            let editor = self.editor.lock().await;
            editor.as_ref().and_then(|e| e.note_id()).ok_or_else(|| {
                Error::Precondition(
                    "save the note before attaching a recording to it".to_string(),
                )
            })?
        };

        let clip = self.with_recorder(kind, |s| s.take_clip()).await?;
        match self.authority.attach_media(note_id, kind, clip.clone()).await {
            Ok(attachment) => {
                {
                    let mut recorders = self.recorders.lock().await;
                    if let Some(session) = recorders.get_mut(&kind) {
                        let _ = session.mark_committed();
                    }
                    recorders.remove(&kind);
                }
                self.abort_ticker(kind);

                let mut store = self.store.write().await;
                if let Some(note) = store.get(note_id).cloned() {
                    let mut note = note;
                    note.media.push(attachment.clone());
                    note.recompute_derived();
                    store.upsert(note);
                }
                drop(store);

                self.events.emit(EngineEvent::MediaAttached { note_id, kind });
                Ok(attachment)
            }
            Err(e) => {
                // Keep the clip so the user can retry or save it elsewhere.
                let _ = self
                    .with_recorder(kind, |s| {
                        s.restore_clip(clip);
                        Ok(())
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Switch camera facing on the open video recorder via an independent
    /// device re-acquisition. Rejected while recording.
    pub async fn switch_camera_facing(&self, facing: CameraFacing) -> Result<()> {
        let mut recorders = self.recorders.lock().await;
        let session = recorders
            .get_mut(&MediaKind::Video)
            .ok_or_else(|| Error::Precondition("no open video recorder".to_string()))?;
        session.switch_facing(facing, self.devices.as_ref()).await
    }

    /// Close the recorder without saving. Device release is unconditional.
    pub async fn discard_recording(&self, kind: MediaKind) {
        if let Some(mut session) = self.recorders.lock().await.remove(&kind) {
            session.discard();
        }
        self.abort_ticker(kind);
    }

    fn spawn_ticker(self: &Arc<Self>, kind: MediaKind) {
        let engine = Arc::clone(self);
        let tick = self.config.recorder_tick();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let recorders = engine.recorders.lock().await;
                match recorders.get(&kind).map(|s| (s.state(), s.elapsed())) {
                    Some((RecorderState::Recording, elapsed)) => {
                        engine.events.emit(EngineEvent::RecorderTick {
                            kind,
                            elapsed_ms: elapsed.as_millis() as u64,
                        });
                    }
                    Some((RecorderState::Paused, _)) => {}
                    _ => break,
                }
            }
        });
        if let Some(previous) = lock_poison_free(&self.tickers).insert(kind, handle) {
            previous.abort();
        }
    }

    fn abort_ticker(&self, kind: MediaKind) {
        if let Some(handle) = lock_poison_free(&self.tickers).remove(&kind) {
            handle.abort();
        }
    }

    // =========================================================================
    // DICTATION
    // =========================================================================

    /// Start a dictation session. `language = None` uses the default tag.
    pub async fn start_dictation(
        self: &Arc<Self>,
        language: Option<String>,
        continuous: bool,
    ) -> Result<()> {
        let mut dictation = self.dictation.lock().await;
        if let Some(session) = dictation.as_ref() {
            if session.state() == DictationState::Listening {
                return Err(Error::Precondition(
                    "a dictation session is already listening".to_string(),
                ));
            }
        }

        let mut session = match language {
            Some(language) => DictationSession::new(language, continuous),
            None if continuous => DictationSession::continuous(),
            None => DictationSession::single_shot(),
        };
        let rx = session.start(self.recognizer.as_ref()).await?;
        *dictation = Some(session);
        drop(dictation);

        self.spawn_dictation_pump(rx);
        Ok(())
    }

    fn spawn_dictation_pump(self: &Arc<Self>, mut rx: mpsc::Receiver<RecognitionEvent>) {
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                // A closed stream counts as the engine ending the session.
                let event = rx.recv().await.unwrap_or(RecognitionEvent::Ended);
                let ended = event == RecognitionEvent::Ended;
                {
                    let mut dictation = engine.dictation.lock().await;
                    let Some(session) = dictation.as_mut() else { break };
                    session.apply(&event);
                    match &event {
                        RecognitionEvent::Interim(_) => {
                            engine.events.emit(EngineEvent::DictationInterim {
                                text: session.interim_transcript().to_string(),
                            });
                        }
                        RecognitionEvent::Final(_) => {
                            engine.events.emit(EngineEvent::DictationFinal {
                                text: session.final_transcript().to_string(),
                            });
                        }
                        RecognitionEvent::Ended => {}
                    }
                }
                if ended {
                    break;
                }
            }
        });
        if let Some(previous) = lock_poison_free(&self.dictation_pump).replace(handle) {
            previous.abort();
        }
    }

    /// Ask the recognition engine to end the stream. The session leaves
    /// `Listening` when the stream delivers `Ended`.
    pub fn stop_dictation(&self) {
        self.recognizer.stop();
    }

    pub async fn dictation_state(&self) -> Option<DictationState> {
        self.dictation.lock().await.as_ref().map(|s| s.state())
    }

    pub async fn dictation_transcript(&self) -> Option<String> {
        self.dictation
            .lock()
            .await
            .as_ref()
            .map(|s| s.final_transcript().to_string())
    }

    /// Empty the transcripts without leaving `Listening`.
    pub async fn clear_dictation(&self) -> Result<()> {
        let mut dictation = self.dictation.lock().await;
        let session = dictation
            .as_mut()
            .ok_or_else(|| Error::Precondition("no dictation session".to_string()))?;
        session.clear();
        Ok(())
    }

    /// Copy the accumulated final transcript into the open draft and
    /// discard the session.
    pub async fn insert_dictation(&self) -> Result<()> {
        {
            let editor = self.editor.lock().await;
            if editor.is_none() {
                return Err(Error::Precondition(
                    "no editor session is open".to_string(),
                ));
            }
        }
        let transcript = {
            let mut dictation = self.dictation.lock().await;
            let mut session = dictation
                .take()
                .ok_or_else(|| Error::Precondition("no dictation session".to_string()))?;
            session.take_transcript()
        };
        if let Some(handle) = lock_poison_free(&self.dictation_pump).take() {
            handle.abort();
        }
        if transcript.is_empty() {
            return Ok(());
        }
        self.mutate_editor(move |e| e.insert_text(&transcript)).await
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Flush pending edits and tear down every session and scheduled task.
    pub async fn shutdown(&self) -> Result<()> {
        let flush_result = self.flush_before_switch().await;

        {
            let mut recorders = self.recorders.lock().await;
            for session in recorders.values_mut() {
                session.discard();
            }
            recorders.clear();
        }
        for (_, handle) in lock_poison_free(&self.tickers).drain() {
            handle.abort();
        }
        if let Some(handle) = lock_poison_free(&self.dictation_pump).take() {
            handle.abort();
        }
        *self.dictation.lock().await = None;
        self.recognizer.stop();

        info!("engine shut down");
        flush_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notarium_capture::{MockDeviceBroker, MockRecognizer};
    use notarium_gateway::InMemoryAuthority;

    fn engine_with(authority: Arc<InMemoryAuthority>) -> Arc<Engine> {
        Engine::new(
            authority,
            Arc::new(MockDeviceBroker::new()),
            Arc::new(MockRecognizer::default()),
            EngineConfig::default().with_autosave_delay_ms(100),
        )
    }

    #[tokio::test]
    async fn test_mutation_without_editor_is_precondition() {
        let engine = engine_with(Arc::new(InMemoryAuthority::new()));
        let err = engine.set_title("x").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_toggle_favorite_open_on_draft_is_precondition() {
        let authority = Arc::new(InMemoryAuthority::new());
        let engine = engine_with(authority.clone());
        engine.open_draft().await.unwrap();

        let err = engine.toggle_favorite_open().await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(authority.calls().is_empty(), "no network call for a draft");
    }

    #[tokio::test]
    async fn test_duplicate_recorder_is_rejected() {
        let engine = engine_with(Arc::new(InMemoryAuthority::new()));
        engine.open_recorder(MediaKind::Audio, None).await.unwrap();
        let err = engine
            .open_recorder(MediaKind::Audio, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));

        // A different modality is independent.
        engine.open_recorder(MediaKind::Video, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_recorder_reopens_after_discard() {
        let engine = engine_with(Arc::new(InMemoryAuthority::new()));
        engine.open_recorder(MediaKind::Audio, None).await.unwrap();
        engine.discard_recording(MediaKind::Audio).await;
        engine.open_recorder(MediaKind::Audio, None).await.unwrap();
        assert_eq!(
            engine.recorder_state(MediaKind::Audio).await,
            Some(RecorderState::Ready)
        );
    }

    #[tokio::test]
    async fn test_commit_on_draft_makes_no_network_call_and_keeps_clip() {
        let authority = Arc::new(InMemoryAuthority::new());
        let engine = engine_with(authority.clone());
        engine.open_draft().await.unwrap();

        engine.open_recorder(MediaKind::Audio, None).await.unwrap();
        engine.start_recording(MediaKind::Audio).await.unwrap();
        engine
            .push_recording_chunk(MediaKind::Audio, vec![1, 2, 3])
            .await
            .unwrap();
        engine.stop_recording(MediaKind::Audio).await.unwrap();

        let err = engine.commit_recording(MediaKind::Audio).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(authority.calls().is_empty());
        // The clip survives for a later commit after the note is saved.
        assert_eq!(
            engine.recording_clip(MediaKind::Audio).await,
            Some(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_remove_attachment_local_issues_no_authority_call() {
        let authority = Arc::new(InMemoryAuthority::new());
        let engine = engine_with(authority.clone());

        let note = authority
            .create(notarium_core::NoteDraft::default())
            .await
            .unwrap();
        let attachment = authority
            .attach_media(note.id, MediaKind::Audio, vec![1])
            .await
            .unwrap();
        engine.refresh().await.unwrap();
        let calls_before = authority.calls().len();

        let updated = engine
            .remove_attachment_local(note.id, attachment.id)
            .await
            .unwrap();
        assert!(!updated.has_media);
        assert_eq!(authority.calls().len(), calls_before);
        // The remote record still holds the attachment.
        assert!(authority.note(note.id).unwrap().has_media);
    }
}
