//! Engine configuration.

use std::time::Duration;

use notarium_core::defaults;

/// Configuration for the engine and its scheduled tasks.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiescence delay before a dirty draft is flushed, in milliseconds.
    pub autosave_delay_ms: u64,
    /// Recorder elapsed-time tick interval in milliseconds.
    pub recorder_tick_ms: u64,
    /// Event bus broadcast channel capacity.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: defaults::AUTOSAVE_DELAY_MS,
            recorder_tick_ms: defaults::RECORDER_TICK_MS,
            event_capacity: defaults::EVENT_BUS_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTARIUM_AUTOSAVE_DELAY_MS` | `2000` | Quiescence delay before flushing |
    /// | `NOTARIUM_RECORDER_TICK_MS` | `250` | Recorder display tick interval |
    pub fn from_env() -> Self {
        let autosave_delay_ms = std::env::var(defaults::ENV_AUTOSAVE_DELAY_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::AUTOSAVE_DELAY_MS);

        let recorder_tick_ms = std::env::var(defaults::ENV_RECORDER_TICK_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::RECORDER_TICK_MS)
            .max(1);

        Self {
            autosave_delay_ms,
            recorder_tick_ms,
            ..Self::default()
        }
    }

    /// Set the autosave quiescence delay.
    pub fn with_autosave_delay_ms(mut self, ms: u64) -> Self {
        self.autosave_delay_ms = ms;
        self
    }

    /// Set the recorder tick interval.
    pub fn with_recorder_tick_ms(mut self, ms: u64) -> Self {
        self.recorder_tick_ms = ms;
        self
    }

    /// Set the event bus capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub(crate) fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub(crate) fn recorder_tick(&self) -> Duration {
        Duration::from_millis(self.recorder_tick_ms)
    }
}
