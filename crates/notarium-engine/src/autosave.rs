//! Debounce state machine for the autosave scheduler.
//!
//! Pure transition logic over `tokio::time::Instant`; the engine's driver
//! task owns the actual timer and the flush call. Invariants enforced
//! here: at most one flush in flight, edits arriving mid-flight coalesce
//! into exactly one follow-up flush, and a failed flush leaves the state
//! dirty without scheduling an automatic retry.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing to save.
    Clean,
    /// Unsaved edits. `deadline` is None after a failed flush: the retry
    /// waits for the next edit or an explicit save, never a timer.
    Dirty { deadline: Option<Instant> },
    /// A flush is running. `reflush` records edits made meanwhile.
    InFlight { reflush: bool },
}

/// Autosave debounce state for one editor session.
#[derive(Debug, Clone, Copy)]
pub struct DebounceState {
    delay: Duration,
    phase: Phase,
}

impl DebounceState {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            phase: Phase::Clean,
        }
    }

    /// Whether unsaved edits exist (including edits made during a flush).
    pub fn is_dirty(&self) -> bool {
        match self.phase {
            Phase::Clean => false,
            Phase::Dirty { .. } => true,
            Phase::InFlight { reflush } => reflush,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, Phase::InFlight { .. })
    }

    /// Next quiescence deadline, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Dirty { deadline } => deadline,
            _ => None,
        }
    }

    /// Record a draft mutation at `now`: marks dirty and (re)starts the
    /// quiescence timer, or flags a follow-up flush when one is in flight.
    pub fn record_edit(&mut self, now: Instant) {
        self.phase = match self.phase {
            Phase::Clean | Phase::Dirty { .. } => Phase::Dirty {
                deadline: Some(now + self.delay),
            },
            Phase::InFlight { .. } => Phase::InFlight { reflush: true },
        };
    }

    /// Try to claim the single flush slot. Returns false when there is
    /// nothing to save or a flush is already running.
    pub fn begin_flush(&mut self) -> bool {
        match self.phase {
            Phase::Dirty { .. } => {
                self.phase = Phase::InFlight { reflush: false };
                true
            }
            Phase::Clean | Phase::InFlight { .. } => false,
        }
    }

    /// Resolve the in-flight flush.
    ///
    /// On success, edits made during the flight arm an immediate follow-up
    /// deadline; on failure the state stays dirty with no deadline.
    pub fn complete_flush(&mut self, success: bool, now: Instant) {
        let reflush = match self.phase {
            Phase::InFlight { reflush } => reflush,
            // complete without begin is a driver bug; stay safe and dirty
            _ => true,
        };
        self.phase = if success {
            if reflush {
                Phase::Dirty {
                    deadline: Some(now),
                }
            } else {
                Phase::Clean
            }
        } else {
            Phase::Dirty { deadline: None }
        };
    }

    /// Forget all pending state (editor closed after a final flush).
    pub fn reset(&mut self) {
        self.phase = Phase::Clean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(2);

    #[tokio::test(start_paused = true)]
    async fn test_clean_state_has_no_deadline() {
        let state = DebounceState::new(DELAY);
        assert!(!state.is_dirty());
        assert!(!state.is_in_flight());
        assert_eq!(state.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_arms_quiescence_deadline() {
        let mut state = DebounceState::new(DELAY);
        let now = Instant::now();
        state.record_edit(now);
        assert!(state.is_dirty());
        assert_eq!(state.deadline(), Some(now + DELAY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_edits_push_deadline() {
        let mut state = DebounceState::new(DELAY);
        let t0 = Instant::now();
        state.record_edit(t0);
        let t1 = t0 + Duration::from_millis(1500);
        state.record_edit(t1);
        assert_eq!(state.deadline(), Some(t1 + DELAY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_flush_claims_single_slot() {
        let mut state = DebounceState::new(DELAY);
        assert!(!state.begin_flush(), "nothing to flush when clean");

        state.record_edit(Instant::now());
        assert!(state.begin_flush());
        assert!(state.is_in_flight());
        assert!(!state.begin_flush(), "no second flush while in flight");
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_flush_without_edits_goes_clean() {
        let mut state = DebounceState::new(DELAY);
        state.record_edit(Instant::now());
        assert!(state.begin_flush());
        state.complete_flush(true, Instant::now());
        assert!(!state.is_dirty());
        assert_eq!(state.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_flight_arms_immediate_reflush() {
        let mut state = DebounceState::new(DELAY);
        state.record_edit(Instant::now());
        assert!(state.begin_flush());

        state.record_edit(Instant::now());
        assert!(state.is_dirty());
        assert!(state.is_in_flight());

        let now = Instant::now();
        state.complete_flush(true, now);
        // Exactly one follow-up flush, due immediately.
        assert_eq!(state.deadline(), Some(now));
        assert!(state.begin_flush());
        state.complete_flush(true, Instant::now());
        assert!(!state.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_stays_dirty_without_timer() {
        let mut state = DebounceState::new(DELAY);
        state.record_edit(Instant::now());
        assert!(state.begin_flush());
        state.complete_flush(false, Instant::now());

        assert!(state.is_dirty());
        assert_eq!(state.deadline(), None, "no automatic retry timer");

        // The next edit re-arms the timer and the flush retries the
        // accumulated state.
        let now = Instant::now();
        state.record_edit(now);
        assert_eq!(state.deadline(), Some(now + DELAY));
        assert!(state.begin_flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_everything() {
        let mut state = DebounceState::new(DELAY);
        state.record_edit(Instant::now());
        state.reset();
        assert!(!state.is_dirty());
        assert_eq!(state.deadline(), None);
    }
}
