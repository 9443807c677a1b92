//! Deterministic capture mocks for testing.
//!
//! Provides a device broker that grants inspectable handles (or denies on
//! demand) and a speech recognizer that replays a scripted event stream.
//! Both record their usage so tests can assert on acquisition counts and
//! released devices.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use notarium_core::{
    CameraFacing, CaptureHandle, DeviceBroker, Error, MediaKind, RecognitionEvent, Result,
    SpeechRecognizer,
};

// =============================================================================
// DEVICE BROKER
// =============================================================================

/// Mock capture device handle; release state is observable from the broker.
pub struct MockCaptureHandle {
    kind: MediaKind,
    released: Arc<AtomicBool>,
}

impl CaptureHandle for MockCaptureHandle {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Mock device broker for recording session tests.
#[derive(Default)]
pub struct MockDeviceBroker {
    deny_reason: Option<String>,
    acquisitions: Mutex<Vec<(MediaKind, Option<CameraFacing>)>>,
    handles: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockDeviceBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny every acquisition with the given reason.
    pub fn deny_with(mut self, reason: impl Into<String>) -> Self {
        self.deny_reason = Some(reason.into());
        self
    }

    /// Number of acquisition attempts (granted or denied).
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.lock().unwrap().len()
    }

    /// Recorded acquisition requests, in order.
    pub fn acquisitions(&self) -> Vec<(MediaKind, Option<CameraFacing>)> {
        self.acquisitions.lock().unwrap().clone()
    }

    /// Whether every granted handle has been released.
    pub fn all_released(&self) -> bool {
        self.handles
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl DeviceBroker for MockDeviceBroker {
    async fn acquire(
        &self,
        kind: MediaKind,
        facing: Option<CameraFacing>,
    ) -> Result<Box<dyn CaptureHandle>> {
        self.acquisitions.lock().unwrap().push((kind, facing));
        if let Some(reason) = &self.deny_reason {
            return Err(Error::Device(reason.clone()));
        }
        let released = Arc::new(AtomicBool::new(false));
        self.handles.lock().unwrap().push(released.clone());
        Ok(Box::new(MockCaptureHandle { kind, released }))
    }
}

// =============================================================================
// SPEECH RECOGNIZER
// =============================================================================

/// Mock recognizer replaying a fixed event script.
///
/// The script is delivered immediately and the stream then closes, which
/// sessions treat as `Ended`. `stop` only records that it was requested.
#[derive(Default)]
pub struct MockRecognizer {
    script: Mutex<Vec<RecognitionEvent>>,
    listen_count: AtomicUsize,
    stop_requested: AtomicBool,
}

impl MockRecognizer {
    pub fn with_script(script: Vec<RecognitionEvent>) -> Self {
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    pub fn listen_count(&self) -> usize {
        self.listen_count.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn listen(
        &self,
        _language: &str,
        _continuous: bool,
    ) -> Result<mpsc::Receiver<RecognitionEvent>> {
        self.listen_count.fetch_add(1, Ordering::SeqCst);
        let script = std::mem::take(&mut *self.script.lock().unwrap());
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            tx.try_send(event)
                .map_err(|e| Error::Internal(format!("mock script overflow: {}", e)))?;
        }
        // Sender dropped here; the stream closes once the script drains.
        Ok(rx)
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}
