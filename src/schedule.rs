//! Debounced, single-flight scheduling of fill cycles
//!
//! Turns a stream of discrete value-change events into a throttled stream of
//! fill cycles. The state machine is explicit, with no captured timers, so
//! the single-flight and superseding-request invariants are testable on
//! their own, with callers supplying `Instant`s instead of sleeping.

use std::time::{Duration, Instant};

/// Debounce delays for coalescing bursts of edits.
///
/// The very first cycle pays a one-time document re-parse cost, so the first
/// change waits longer than subsequent ones.
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    /// Delay after the first change of a session
    pub initial: Duration,
    /// Delay after any later change
    pub subsequent: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            subsequent: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing to do
    Idle,
    /// A change is waiting for its debounce deadline
    Pending { deadline: Instant },
    /// A cycle is executing; `rerun` records whether a change arrived
    /// mid-cycle and must produce one more cycle afterwards
    Running { rerun: bool },
}

/// Per-session scheduler guaranteeing at most one in-flight fill cycle.
///
/// Changes arriving while a cycle runs are not queued: a single rerun flag
/// represents "latest wins", so the final published state always reflects
/// the last edit without ever processing a backlog of stale ones.
#[derive(Debug)]
pub struct UpdateScheduler {
    state: State,
    config: DebounceConfig,
    completed_cycles: u64,
}

impl UpdateScheduler {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            state: State::Idle,
            config,
            completed_cycles: 0,
        }
    }

    /// Record a value change at `now`.
    pub fn note_change(&mut self, now: Instant) {
        match self.state {
            State::Idle => {
                self.state = State::Pending {
                    deadline: now + self.delay(),
                };
            }
            State::Pending { .. } => {
                // a burst of edits keeps pushing the deadline out
                self.state = State::Pending {
                    deadline: now + self.delay(),
                };
            }
            State::Running { .. } => {
                self.state = State::Running { rerun: true };
            }
        }
    }

    /// Whether a cycle is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.state, State::Pending { deadline } if now >= deadline)
    }

    /// Try to start a cycle. Succeeds only from `Pending` with an expired
    /// deadline; in particular it can never succeed while a cycle runs.
    pub fn begin_cycle(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.state = State::Running { rerun: false };
            true
        } else {
            false
        }
    }

    /// Mark the in-flight cycle finished (successfully or not).
    ///
    /// A change that arrived mid-cycle schedules exactly one follow-up
    /// cycle; otherwise the scheduler returns to idle.
    pub fn finish_cycle(&mut self, now: Instant) {
        self.completed_cycles += 1;
        self.state = match self.state {
            State::Running { rerun: true } => State::Pending {
                deadline: now + self.config.subsequent,
            },
            _ => State::Idle,
        };
    }

    /// Deadline of the pending cycle, if one is waiting. Callers use this
    /// to decide how long to sleep before the next [`Self::begin_cycle`].
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    fn delay(&self) -> Duration {
        if self.completed_cycles == 0 {
            self.config.initial
        } else {
            self.config.subsequent
        }
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial_ms: u64, subsequent_ms: u64) -> DebounceConfig {
        DebounceConfig {
            initial: Duration::from_millis(initial_ms),
            subsequent: Duration::from_millis(subsequent_ms),
        }
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn burst_of_changes_coalesces_into_one_cycle() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::new(config(500, 200));

        scheduler.note_change(at(base, 0));
        scheduler.note_change(at(base, 50));
        scheduler.note_change(at(base, 80));

        // not due until the last change's full window has elapsed
        assert!(!scheduler.begin_cycle(at(base, 500)));
        assert!(scheduler.begin_cycle(at(base, 580)));
        scheduler.finish_cycle(at(base, 600));

        // exactly one cycle ran
        assert_eq!(scheduler.completed_cycles(), 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn first_change_waits_longer_than_later_ones() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::new(config(500, 200));

        scheduler.note_change(at(base, 0));
        assert_eq!(scheduler.next_deadline(), Some(at(base, 500)));
        assert!(scheduler.begin_cycle(at(base, 500)));
        scheduler.finish_cycle(at(base, 510));

        scheduler.note_change(at(base, 600));
        assert_eq!(scheduler.next_deadline(), Some(at(base, 800)));
    }

    #[test]
    fn no_cycle_starts_while_one_runs() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::new(config(100, 100));

        scheduler.note_change(at(base, 0));
        assert!(scheduler.begin_cycle(at(base, 100)));

        // a change mid-cycle must not start a concurrent cycle
        scheduler.note_change(at(base, 120));
        assert!(!scheduler.begin_cycle(at(base, 300)));
        assert!(scheduler.is_running());
    }

    #[test]
    fn mid_cycle_change_schedules_exactly_one_rerun() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::new(config(100, 100));

        scheduler.note_change(at(base, 0));
        assert!(scheduler.begin_cycle(at(base, 100)));
        // several changes while running collapse into a single rerun
        scheduler.note_change(at(base, 110));
        scheduler.note_change(at(base, 130));
        scheduler.finish_cycle(at(base, 150));

        assert_eq!(scheduler.next_deadline(), Some(at(base, 250)));
        assert!(scheduler.begin_cycle(at(base, 250)));
        scheduler.finish_cycle(at(base, 260));
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.completed_cycles(), 2);
    }

    #[test]
    fn quiet_finish_returns_to_idle() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::new(config(100, 100));

        scheduler.note_change(at(base, 0));
        assert!(scheduler.begin_cycle(at(base, 100)));
        scheduler.finish_cycle(at(base, 110));

        assert!(scheduler.is_idle());
        assert_eq!(scheduler.next_deadline(), None);
        assert!(!scheduler.begin_cycle(at(base, 500)));
    }

    #[test]
    fn idle_scheduler_never_fires() {
        let base = Instant::now();
        let mut scheduler = UpdateScheduler::default();
        assert!(!scheduler.is_due(at(base, 10_000)));
        assert!(!scheduler.begin_cycle(at(base, 10_000)));
    }
}
