//! Recording session state machine (audio and video share it).
//!
//! Lifecycle: `Idle -> Acquiring -> Ready -> Recording <-> Paused ->
//! Stopped -> (Committed | Discarded)`, with a terminal `Denied` out of
//! `Acquiring`. The session owns the device handle and the chunk buffer;
//! the actual upload of a finished clip goes through the engine so that
//! the note-identity precondition is checked there.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use notarium_core::{CameraFacing, CaptureHandle, DeviceBroker, Error, MediaKind, Result};

/// Recorder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Created, device not yet requested.
    Idle,
    /// Device request in flight.
    Acquiring,
    /// Device granted, not yet recording.
    Ready,
    /// Buffering fragments, elapsed counter running.
    Recording,
    /// Counter frozen, buffering suspended, device retained.
    Paused,
    /// Device released, clip assembled and previewable.
    Stopped,
    /// Device acquisition failed. Terminal; reopen to retry.
    Denied,
    /// Clip handed off for upload, session torn down. Terminal.
    Committed,
    /// Closed without saving, buffer dropped. Terminal.
    Discarded,
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Ready => "ready",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Denied => "denied",
            Self::Committed => "committed",
            Self::Discarded => "discarded",
        };
        write!(f, "{}", s)
    }
}

/// Format an elapsed capture duration as `mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// An ephemeral capture session bound to one modality.
pub struct RecordingSession {
    kind: MediaKind,
    facing: Option<CameraFacing>,
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
    accumulated: Duration,
    recording_since: Option<Instant>,
    device: Option<Box<dyn CaptureHandle>>,
    denied_reason: Option<String>,
    clip: Option<Vec<u8>>,
}

impl RecordingSession {
    /// Create an idle session. Video sessions start with the front camera.
    pub fn new(kind: MediaKind) -> Self {
        let facing = match kind {
            MediaKind::Audio => None,
            MediaKind::Video => Some(CameraFacing::Front),
        };
        Self {
            kind,
            facing,
            state: RecorderState::Idle,
            chunks: Vec::new(),
            accumulated: Duration::ZERO,
            recording_since: None,
            device: None,
            denied_reason: None,
            clip: None,
        }
    }

    /// Select the camera facing before acquisition (video only).
    pub fn with_facing(mut self, facing: CameraFacing) -> Result<Self> {
        if self.kind != MediaKind::Video {
            return Err(Error::Precondition(
                "camera facing applies to video sessions only".to_string(),
            ));
        }
        self.facing = Some(facing);
        Ok(self)
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn facing(&self) -> Option<CameraFacing> {
        self.facing
    }

    /// Reason the device was denied, once in `Denied`.
    pub fn denied_reason(&self) -> Option<&str> {
        self.denied_reason.as_deref()
    }

    /// The assembled clip, available from `Stopped` for preview playback.
    pub fn clip(&self) -> Option<&[u8]> {
        self.clip.as_deref()
    }

    /// Accumulated capture time, continuing across pause/resume.
    pub fn elapsed(&self) -> Duration {
        match self.recording_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    /// Elapsed time formatted `mm:ss` for display.
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed())
    }

    fn expect_state(&self, expected: RecorderState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::Precondition(format!(
                "cannot {} a {} session in state {}",
                action, self.kind, self.state
            )));
        }
        Ok(())
    }

    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
            debug!(kind = %self.kind, "capture device released");
        }
    }

    /// Request the capture device. `Idle -> Acquiring -> Ready`, or the
    /// terminal `Denied` when the platform refuses.
    pub async fn acquire(&mut self, broker: &dyn DeviceBroker) -> Result<()> {
        let (kind, facing) = self.begin_acquire()?;
        let grant = broker.acquire(kind, facing).await;
        self.complete_acquire(grant)
    }

    /// Transition `Idle -> Acquiring` and hand back the request parameters,
    /// so a caller can run the broker call without borrowing the session
    /// (and without holding whatever lock guards it). Resolve with
    /// [`complete_acquire`](Self::complete_acquire).
    pub fn begin_acquire(&mut self) -> Result<(MediaKind, Option<CameraFacing>)> {
        self.expect_state(RecorderState::Idle, "acquire")?;
        self.state = RecorderState::Acquiring;
        Ok((self.kind, self.facing))
    }

    /// Resolve a pending acquisition. A grant that lands after the session
    /// already left `Acquiring` (discarded while the request was in flight)
    /// is released immediately, never retained.
    pub fn complete_acquire(&mut self, grant: Result<Box<dyn CaptureHandle>>) -> Result<()> {
        if self.state != RecorderState::Acquiring {
            if let Ok(mut device) = grant {
                device.release();
            }
            return Err(Error::Precondition(format!(
                "acquisition resolved for a {} session in state {}",
                self.kind, self.state
            )));
        }
        match grant {
            Ok(device) => {
                self.device = Some(device);
                self.state = RecorderState::Ready;
                debug!(kind = %self.kind, facing = ?self.facing, "capture device ready");
                Ok(())
            }
            Err(e) => {
                self.state = RecorderState::Denied;
                self.denied_reason = Some(e.to_string());
                warn!(kind = %self.kind, error = %e, "capture device denied");
                Err(e)
            }
        }
    }

    /// Begin buffering fragments. `Ready -> Recording`.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(RecorderState::Ready, "start")?;
        self.state = RecorderState::Recording;
        self.recording_since = Some(Instant::now());
        debug!(kind = %self.kind, "recording started");
        Ok(())
    }

    /// Freeze the counter and suspend buffering; the device is retained so
    /// resuming needs no re-acquisition. `Recording -> Paused`.
    pub fn pause(&mut self) -> Result<()> {
        self.expect_state(RecorderState::Recording, "pause")?;
        if let Some(since) = self.recording_since.take() {
            self.accumulated += since.elapsed();
        }
        self.state = RecorderState::Paused;
        debug!(kind = %self.kind, elapsed_ms = self.accumulated.as_millis() as u64, "recording paused");
        Ok(())
    }

    /// Continue from the frozen counter value. `Paused -> Recording`.
    pub fn resume(&mut self) -> Result<()> {
        self.expect_state(RecorderState::Paused, "resume")?;
        self.state = RecorderState::Recording;
        self.recording_since = Some(Instant::now());
        debug!(kind = %self.kind, "recording resumed");
        Ok(())
    }

    /// Accept one captured fragment. Buffered while `Recording`; fragments
    /// that race a pause are dropped, anything else is a caller bug.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        match self.state {
            RecorderState::Recording => {
                trace!(kind = %self.kind, len = chunk.len(), "chunk buffered");
                self.chunks.push(chunk);
                Ok(())
            }
            RecorderState::Paused => {
                trace!(kind = %self.kind, len = chunk.len(), "chunk dropped while paused");
                Ok(())
            }
            _ => Err(Error::Precondition(format!(
                "cannot buffer a chunk in state {}",
                self.state
            ))),
        }
    }

    /// Stop capture: release the device unconditionally and concatenate the
    /// buffer into one clip. `Recording | Paused -> Stopped`.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            RecorderState::Recording | RecorderState::Paused => {}
            _ => {
                return Err(Error::Precondition(format!(
                    "cannot stop a {} session in state {}",
                    self.kind, self.state
                )))
            }
        }
        if let Some(since) = self.recording_since.take() {
            self.accumulated += since.elapsed();
        }
        self.release_device();

        let total: usize = self.chunks.iter().map(Vec::len).sum();
        let mut clip = Vec::with_capacity(total);
        for chunk in self.chunks.drain(..) {
            clip.extend_from_slice(&chunk);
        }
        self.clip = Some(clip);
        self.state = RecorderState::Stopped;
        debug!(
            kind = %self.kind,
            elapsed_ms = self.accumulated.as_millis() as u64,
            clip_len = total,
            "recording stopped"
        );
        Ok(())
    }

    /// Take the clip for upload. Requires `Stopped`; the engine checks the
    /// note-identity precondition before calling this.
    pub fn take_clip(&mut self) -> Result<Vec<u8>> {
        self.expect_state(RecorderState::Stopped, "commit")?;
        self.clip
            .take()
            .ok_or_else(|| Error::Internal("stopped session has no clip".to_string()))
    }

    /// Restore a clip whose upload failed so the session stays previewable.
    pub fn restore_clip(&mut self, clip: Vec<u8>) {
        if self.state == RecorderState::Stopped {
            self.clip = Some(clip);
        }
    }

    /// Mark the clip handed off. `Stopped -> Committed`.
    pub fn mark_committed(&mut self) -> Result<()> {
        self.expect_state(RecorderState::Stopped, "mark committed")?;
        self.release_device();
        self.state = RecorderState::Committed;
        Ok(())
    }

    /// Close without saving from any non-terminal state: release the device
    /// (or an in-flight grant once it lands), drop the buffer.
    pub fn discard(&mut self) {
        match self.state {
            RecorderState::Committed | RecorderState::Discarded | RecorderState::Denied => return,
            _ => {}
        }
        if let Some(since) = self.recording_since.take() {
            self.accumulated += since.elapsed();
        }
        self.release_device();
        self.chunks.clear();
        self.clip = None;
        self.state = RecorderState::Discarded;
        debug!(kind = %self.kind, "recording discarded");
    }

    /// Switch camera facing via an independent device re-acquisition.
    /// Permitted in `Ready` or `Paused`; rejected while `Recording`.
    pub async fn switch_facing(
        &mut self,
        facing: CameraFacing,
        broker: &dyn DeviceBroker,
    ) -> Result<()> {
        if self.kind != MediaKind::Video {
            return Err(Error::Precondition(
                "camera facing applies to video sessions only".to_string(),
            ));
        }
        match self.state {
            RecorderState::Ready | RecorderState::Paused => {}
            RecorderState::Recording => {
                return Err(Error::Precondition(
                    "pause or stop before switching camera facing".to_string(),
                ))
            }
            _ => {
                return Err(Error::Precondition(format!(
                    "cannot switch facing in state {}",
                    self.state
                )))
            }
        }
        if self.facing == Some(facing) {
            return Ok(());
        }

        self.release_device();
        match broker.acquire(self.kind, Some(facing)).await {
            Ok(device) => {
                self.device = Some(device);
                self.facing = Some(facing);
                debug!(%facing, "camera facing switched");
                Ok(())
            }
            Err(e) => {
                // The previous device is already gone; the session cannot
                // continue without a grant.
                self.state = RecorderState::Denied;
                self.denied_reason = Some(e.to_string());
                warn!(%facing, error = %e, "re-acquisition for facing switch denied");
                Err(e)
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Best-effort teardown so an abandoned session never leaks a device.
        self.release_device();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDeviceBroker;
    use tokio::time::{advance, Duration};

    async fn ready_session(kind: MediaKind, broker: &MockDeviceBroker) -> RecordingSession {
        let mut session = RecordingSession::new(kind);
        session.acquire(broker).await.unwrap();
        session
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(7)), "00:07");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(600)), "10:00");
        assert_eq!(format_elapsed(Duration::from_millis(1_400)), "00:01");
    }

    #[test]
    fn test_new_session_defaults() {
        let audio = RecordingSession::new(MediaKind::Audio);
        assert_eq!(audio.state(), RecorderState::Idle);
        assert_eq!(audio.facing(), None);

        let video = RecordingSession::new(MediaKind::Video);
        assert_eq!(video.facing(), Some(CameraFacing::Front));
    }

    #[test]
    fn test_with_facing_rejected_for_audio() {
        let result = RecordingSession::new(MediaKind::Audio).with_facing(CameraFacing::Back);
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn test_acquire_grants_device() {
        let broker = MockDeviceBroker::new();
        let session = ready_session(MediaKind::Audio, &broker).await;
        assert_eq!(session.state(), RecorderState::Ready);
        assert_eq!(broker.acquisition_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_denied_is_terminal() {
        let broker = MockDeviceBroker::new().deny_with("permission dismissed");
        let mut session = RecordingSession::new(MediaKind::Video);
        let err = session.acquire(&broker).await.unwrap_err();
        assert!(matches!(err, Error::Device(_)));
        assert_eq!(session.state(), RecorderState::Denied);
        assert!(session
            .denied_reason()
            .unwrap()
            .contains("permission dismissed"));
        // No transition leaves Denied.
        assert!(session.start().is_err());
        assert!(session.stop().is_err());
    }

    #[tokio::test]
    async fn test_grant_landing_after_discard_is_released() {
        let broker = MockDeviceBroker::new();
        let mut session = RecordingSession::new(MediaKind::Audio);
        session.begin_acquire().unwrap();
        assert_eq!(session.state(), RecorderState::Acquiring);
        session.discard();

        let grant = broker.acquire(MediaKind::Audio, None).await;
        assert!(matches!(
            session.complete_acquire(grant),
            Err(Error::Precondition(_))
        ));
        assert_eq!(session.state(), RecorderState::Discarded);
        assert!(broker.all_released());
    }

    #[tokio::test]
    async fn test_start_requires_ready() {
        let mut session = RecordingSession::new(MediaKind::Audio);
        assert!(matches!(session.start(), Err(Error::Precondition(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_continuity_across_pause_resume() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Audio, &broker).await;

        session.start().unwrap();
        advance(Duration::from_secs(5)).await;
        session.pause().unwrap();
        let at_pause = session.elapsed();
        assert_eq!(at_pause, Duration::from_secs(5));

        // Counter stays frozen while paused.
        advance(Duration::from_secs(30)).await;
        assert_eq!(session.elapsed(), at_pause);

        session.resume().unwrap();
        advance(Duration::from_secs(3)).await;
        assert_eq!(session.elapsed(), at_pause + Duration::from_secs(3));
        assert_eq!(session.elapsed_display(), "00:08");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_concatenates_chunks_and_releases_device() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Audio, &broker).await;

        session.start().unwrap();
        session.push_chunk(vec![1, 2]).unwrap();
        session.push_chunk(vec![3]).unwrap();
        advance(Duration::from_secs(2)).await;
        session.stop().unwrap();

        assert_eq!(session.state(), RecorderState::Stopped);
        assert_eq!(session.clip(), Some(&[1u8, 2, 3][..]));
        assert_eq!(session.elapsed(), Duration::from_secs(2));
        assert!(broker.all_released());
    }

    #[tokio::test]
    async fn test_chunks_dropped_while_paused() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Audio, &broker).await;
        session.start().unwrap();
        session.push_chunk(vec![1]).unwrap();
        session.pause().unwrap();
        session.push_chunk(vec![2]).unwrap();
        session.resume().unwrap();
        session.push_chunk(vec![3]).unwrap();
        session.stop().unwrap();
        assert_eq!(session.clip(), Some(&[1u8, 3][..]));
    }

    #[tokio::test]
    async fn test_push_chunk_rejected_before_start() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Audio, &broker).await;
        assert!(matches!(
            session.push_chunk(vec![1]),
            Err(Error::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn test_take_clip_requires_stopped() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Audio, &broker).await;
        session.start().unwrap();
        assert!(matches!(session.take_clip(), Err(Error::Precondition(_))));

        session.stop().unwrap();
        let clip = session.take_clip().unwrap();
        assert!(clip.is_empty());
        // A failed upload puts the clip back for preview/retry.
        session.restore_clip(clip);
        assert!(session.clip().is_some());
        session.mark_committed().unwrap();
        assert_eq!(session.state(), RecorderState::Committed);
    }

    #[tokio::test]
    async fn test_discard_releases_device_and_drops_buffer() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Video, &broker).await;
        session.start().unwrap();
        session.push_chunk(vec![9; 16]).unwrap();
        session.discard();

        assert_eq!(session.state(), RecorderState::Discarded);
        assert!(session.clip().is_none());
        assert!(broker.all_released());
        // Discard is idempotent.
        session.discard();
        assert_eq!(session.state(), RecorderState::Discarded);
    }

    #[tokio::test]
    async fn test_switch_facing_rejected_while_recording() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Video, &broker).await;
        session.start().unwrap();
        let err = session
            .switch_facing(CameraFacing::Back, &broker)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(session.facing(), Some(CameraFacing::Front));
        assert_eq!(session.state(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn test_switch_facing_reacquires_in_paused() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Video, &broker).await;
        session.start().unwrap();
        session.pause().unwrap();
        session
            .switch_facing(CameraFacing::Back, &broker)
            .await
            .unwrap();
        assert_eq!(session.facing(), Some(CameraFacing::Back));
        assert_eq!(session.state(), RecorderState::Paused);
        assert_eq!(broker.acquisition_count(), 2);
    }

    #[tokio::test]
    async fn test_switch_facing_noop_for_same_facing() {
        let broker = MockDeviceBroker::new();
        let mut session = ready_session(MediaKind::Video, &broker).await;
        session
            .switch_facing(CameraFacing::Front, &broker)
            .await
            .unwrap();
        assert_eq!(broker.acquisition_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_device() {
        let broker = MockDeviceBroker::new();
        {
            let mut session = ready_session(MediaKind::Audio, &broker).await;
            session.start().unwrap();
        }
        assert!(broker.all_released());
    }
}
