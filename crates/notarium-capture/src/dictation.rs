//! Dictation (speech-to-text) session with interim/final transcript merging.
//!
//! Independent of the recording session: a dictation session is not linked
//! to any note until its accumulated transcript is explicitly inserted into
//! the editor draft by the engine.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use notarium_core::{defaults, Error, RecognitionEvent, Result, SpeechRecognizer};

/// Dictation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationState {
    /// Created, recognition stream not started.
    Idle,
    /// Recognition events are being merged.
    Listening,
    /// The stream ended (explicit stop, or single-shot silence timeout).
    Stopped,
}

/// A continuous or single-shot speech capture session.
///
/// While listening, every recognition event replaces the interim transcript;
/// finalized spans append to the accumulated transcript and are never
/// revised afterwards.
pub struct DictationSession {
    state: DictationState,
    language: String,
    continuous: bool,
    final_transcript: String,
    interim: String,
}

impl DictationSession {
    pub fn new(language: impl Into<String>, continuous: bool) -> Self {
        Self {
            state: DictationState::Idle,
            language: language.into(),
            continuous,
            final_transcript: String::new(),
            interim: String::new(),
        }
    }

    /// Session with the default language tag, continuous capture.
    pub fn continuous() -> Self {
        Self::new(defaults::DICTATION_LANGUAGE, true)
    }

    /// Session with the default language tag, ending on the engine's own
    /// silence timeout.
    pub fn single_shot() -> Self {
        Self::new(defaults::DICTATION_LANGUAGE, false)
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Accumulated finalized text.
    pub fn final_transcript(&self) -> &str {
        &self.final_transcript
    }

    /// Current provisional text (replaced by every interim event).
    pub fn interim_transcript(&self) -> &str {
        &self.interim
    }

    /// Start the recognition stream. `Idle -> Listening`.
    ///
    /// Returns the event receiver so the caller can pump it without holding
    /// any lock on the session itself; each received event is routed back
    /// through [`apply`](Self::apply). A closed stream counts as `Ended`.
    pub async fn start(
        &mut self,
        recognizer: &dyn SpeechRecognizer,
    ) -> Result<mpsc::Receiver<RecognitionEvent>> {
        if self.state != DictationState::Idle {
            return Err(Error::Precondition(format!(
                "cannot start dictation in state {:?}",
                self.state
            )));
        }
        let rx = recognizer.listen(&self.language, self.continuous).await?;
        self.state = DictationState::Listening;
        debug!(language = %self.language, continuous = self.continuous, "dictation listening");
        Ok(rx)
    }

    /// Merge one recognition event into the transcripts.
    pub fn apply(&mut self, event: &RecognitionEvent) {
        if self.state != DictationState::Listening {
            return;
        }
        match event {
            RecognitionEvent::Interim(text) => {
                trace!(len = text.len(), "interim transcript replaced");
                self.interim = text.clone();
            }
            RecognitionEvent::Final(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !self.final_transcript.is_empty() {
                        self.final_transcript.push(' ');
                    }
                    self.final_transcript.push_str(trimmed);
                }
                self.interim.clear();
            }
            RecognitionEvent::Ended => {
                self.interim.clear();
                self.state = DictationState::Stopped;
                debug!(final_len = self.final_transcript.len(), "dictation ended");
            }
        }
    }

    /// Empty both transcripts without leaving `Listening`.
    pub fn clear(&mut self) {
        self.final_transcript.clear();
        self.interim.clear();
    }

    /// Take the accumulated final transcript for insertion into a draft,
    /// leaving the session empty. The engine drops the session afterwards.
    pub fn take_transcript(&mut self) -> String {
        self.interim.clear();
        std::mem::take(&mut self.final_transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRecognizer;

    fn listening() -> DictationSession {
        let mut session = DictationSession::continuous();
        // Transition without a stream; `apply` is pure.
        session.state = DictationState::Listening;
        session
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = DictationSession::new("de-DE", false);
        assert_eq!(session.state(), DictationState::Idle);
        assert_eq!(session.language(), "de-DE");
        assert!(!session.is_continuous());
        assert!(session.final_transcript().is_empty());
    }

    #[test]
    fn test_interim_replaces_never_appends() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Interim("hel".into()));
        session.apply(&RecognitionEvent::Interim("hello wor".into()));
        assert_eq!(session.interim_transcript(), "hello wor");
        assert!(session.final_transcript().is_empty());
    }

    #[test]
    fn test_final_appends_and_clears_interim() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Interim("hello wor".into()));
        session.apply(&RecognitionEvent::Final("hello world".into()));
        session.apply(&RecognitionEvent::Final("second span".into()));
        assert_eq!(session.final_transcript(), "hello world second span");
        assert!(session.interim_transcript().is_empty());
    }

    #[test]
    fn test_final_whitespace_spans_are_skipped() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Final("  ".into()));
        assert!(session.final_transcript().is_empty());
    }

    #[test]
    fn test_ended_stops_session() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Final("kept".into()));
        session.apply(&RecognitionEvent::Ended);
        assert_eq!(session.state(), DictationState::Stopped);
        // Finalized text survives the stop; late events are ignored.
        session.apply(&RecognitionEvent::Final("late".into()));
        assert_eq!(session.final_transcript(), "kept");
    }

    #[test]
    fn test_clear_keeps_listening() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Final("text".into()));
        session.apply(&RecognitionEvent::Interim("more".into()));
        session.clear();
        assert_eq!(session.state(), DictationState::Listening);
        assert!(session.final_transcript().is_empty());
        assert!(session.interim_transcript().is_empty());
    }

    #[test]
    fn test_take_transcript_empties_session() {
        let mut session = listening();
        session.apply(&RecognitionEvent::Final("insert me".into()));
        assert_eq!(session.take_transcript(), "insert me");
        assert!(session.final_transcript().is_empty());
    }

    #[tokio::test]
    async fn test_start_requires_idle() {
        let recognizer = MockRecognizer::with_script(vec![RecognitionEvent::Ended]);
        let mut session = DictationSession::single_shot();
        session.start(&recognizer).await.unwrap();
        let err = session.start(&recognizer).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_scripted_stream_merges_to_final_transcript() {
        let recognizer = MockRecognizer::with_script(vec![
            RecognitionEvent::Interim("bio".into()),
            RecognitionEvent::Final("biology notes".into()),
            RecognitionEvent::Interim("for th".into()),
            RecognitionEvent::Final("for the lab".into()),
            RecognitionEvent::Ended,
        ]);

        let mut session = DictationSession::single_shot();
        let mut rx = session.start(&recognizer).await.unwrap();
        while let Some(event) = rx.recv().await {
            session.apply(&event);
        }

        assert_eq!(session.state(), DictationState::Stopped);
        assert_eq!(session.final_transcript(), "biology notes for the lab");
    }

    #[tokio::test]
    async fn test_closed_stream_counts_as_ended() {
        let recognizer =
            MockRecognizer::with_script(vec![RecognitionEvent::Final("only".into())]);
        let mut session = DictationSession::continuous();
        let mut rx = session.start(&recognizer).await.unwrap();

        // Pump convention: a closed channel is treated as Ended.
        loop {
            let event = rx.recv().await.unwrap_or(RecognitionEvent::Ended);
            let ended = event == RecognitionEvent::Ended;
            session.apply(&event);
            if ended {
                break;
            }
        }
        assert_eq!(session.state(), DictationState::Stopped);
        assert_eq!(session.final_transcript(), "only");
    }
}
