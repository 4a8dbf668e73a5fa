use crate::model::{SmartTimerConfig, TimerSnapshot};
use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Idle,
    Resumed,
    /// The persisted countdown ran out while the process was gone; the
    /// completion action should run immediately.
    Expired,
}

/// Countdown state machine: Idle -> Running <-> Paused -> (complete) -> Idle.
#[derive(Debug, Default)]
pub struct SleepTimer {
    state: TimerSnapshot,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a zero total outright; durations are never clamped upward.
    pub fn set_duration(&mut self, hours: u32, minutes: u32, seconds: u32) -> Result<()> {
        let total = SmartTimerConfig::manual_total_seconds(hours, minutes, seconds);
        if total == 0 {
            bail!("timer duration must be greater than zero");
        }

        self.state = TimerSnapshot {
            is_running: false,
            is_paused: false,
            total_seconds: total,
            remaining_seconds: total,
            start_epoch_ms: None,
            paused_at_epoch_ms: None,
        };
        Ok(())
    }

    /// Starts or resumes. Resuming shifts the logical start forward by the
    /// paused span so elapsed-time math stays correct.
    pub fn start(&mut self, now: i64) -> bool {
        if self.state.remaining_seconds == 0 {
            return false;
        }
        if self.state.is_running {
            return true;
        }

        let mut start = now;
        if self.state.is_paused
            && let Some(paused_at) = self.state.paused_at_epoch_ms
        {
            let paused_for = now.saturating_sub(paused_at);
            start = self.state.start_epoch_ms.unwrap_or(now).saturating_add(paused_for);
        }

        self.state.is_running = true;
        self.state.is_paused = false;
        self.state.start_epoch_ms = Some(start);
        self.state.paused_at_epoch_ms = None;
        true
    }

    pub fn pause(&mut self, now: i64) -> bool {
        if !self.state.is_running {
            return false;
        }

        self.state.is_running = false;
        self.state.is_paused = true;
        self.state.paused_at_epoch_ms = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.remaining_seconds = self.state.total_seconds;
        self.state.start_epoch_ms = None;
        self.state.paused_at_epoch_ms = None;
    }

    /// Remaining time is recomputed from the wall clock on every tick, never
    /// decremented, so missed ticks cannot drift it.
    pub fn tick(&mut self, now: i64) -> Option<TimerEvent> {
        if !self.state.is_running {
            return None;
        }

        let start = self.state.start_epoch_ms.unwrap_or(now);
        let elapsed_seconds = (now.saturating_sub(start).max(0) / 1_000) as u64;
        self.state.remaining_seconds = self.state.total_seconds.saturating_sub(elapsed_seconds);

        if self.state.remaining_seconds == 0 {
            self.clear();
            return Some(TimerEvent::Completed);
        }
        None
    }

    /// Back to Idle with everything zeroed, without emitting a completion.
    pub fn clear(&mut self) {
        self.state = TimerSnapshot::default();
    }

    pub fn restore(&mut self, snapshot: TimerSnapshot, now: i64) -> RestoreOutcome {
        if snapshot.is_running && snapshot.remaining_seconds > 0 {
            let start = snapshot.start_epoch_ms.unwrap_or(now);
            let elapsed_seconds = (now.saturating_sub(start).max(0) / 1_000) as u64;
            let remaining = snapshot.total_seconds.saturating_sub(elapsed_seconds);

            if remaining > 0 {
                self.state = TimerSnapshot {
                    remaining_seconds: remaining,
                    ..snapshot
                };
                return RestoreOutcome::Resumed;
            }

            self.state = TimerSnapshot::default();
            return RestoreOutcome::Expired;
        }

        self.state = snapshot;
        RestoreOutcome::Idle
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.state.total_seconds
    }

    pub fn display_hms(&self) -> (u64, u64, u64) {
        let seconds = self.state.remaining_seconds;
        (seconds / 3_600, (seconds % 3_600) / 60, seconds % 60)
    }

    pub fn progress_percent(&self) -> f64 {
        if self.state.total_seconds == 0 {
            return 0.0;
        }
        let done = self.state.total_seconds - self.state.remaining_seconds;
        done as f64 / self.state.total_seconds as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_duration() {
        let mut timer = SleepTimer::new();
        assert!(timer.set_duration(0, 0, 0).is_err());
        assert!(timer.set_duration(0, 0, 1).is_ok());
    }

    #[test]
    fn remaining_is_wall_clock_derived() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 1, 40).expect("set");
        assert!(timer.start(0));

        // A single 40 s jump must read 60, not 99.
        assert_eq!(timer.tick(40_000), None);
        assert_eq!(timer.remaining_seconds(), 60);
    }

    #[test]
    fn pause_resume_without_elapsed_time_changes_nothing() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 1, 40).expect("set");
        timer.start(0);
        timer.tick(10_000);
        assert_eq!(timer.remaining_seconds(), 90);

        timer.pause(10_000);
        timer.start(10_000);
        timer.pause(10_000);
        timer.start(10_000);

        assert_eq!(timer.tick(10_000), None);
        assert_eq!(timer.remaining_seconds(), 90);
    }

    #[test]
    fn paused_span_shifts_the_logical_start() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 1, 40).expect("set");
        timer.start(0);
        timer.tick(30_000);
        assert_eq!(timer.remaining_seconds(), 70);

        timer.pause(30_000);
        // 20 s spent paused must not count as elapsed.
        timer.start(50_000);
        timer.tick(60_000);
        assert_eq!(timer.remaining_seconds(), 60);
    }

    #[test]
    fn completes_exactly_once_and_returns_to_idle() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 0, 5).expect("set");
        timer.start(0);

        assert_eq!(timer.tick(2_000), None);
        assert_eq!(timer.tick(5_000), Some(TimerEvent::Completed));
        assert!(!timer.is_running());
        assert!(!timer.is_paused());
        assert_eq!(timer.total_seconds(), 0);

        assert_eq!(timer.tick(6_000), None);
    }

    #[test]
    fn start_is_a_no_op_without_remaining_time() {
        let mut timer = SleepTimer::new();
        assert!(!timer.start(0));
        assert!(!timer.is_running());
    }

    #[test]
    fn pause_is_only_valid_while_running() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 10, 0).expect("set");
        assert!(!timer.pause(0));

        timer.start(0);
        assert!(timer.pause(1_000));
        assert!(!timer.pause(2_000));
    }

    #[test]
    fn reset_restores_the_full_duration() {
        let mut timer = SleepTimer::new();
        timer.set_duration(0, 2, 0).expect("set");
        timer.start(0);
        timer.tick(45_000);
        assert_eq!(timer.remaining_seconds(), 75);

        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 120);
        assert_eq!(timer.snapshot().start_epoch_ms, None);
        assert_eq!(timer.display_hms(), (0, 2, 0));
        assert_eq!(timer.progress_percent(), 0.0);
    }

    #[test]
    fn restore_recomputes_against_the_wall_clock() {
        let snapshot = TimerSnapshot {
            is_running: true,
            is_paused: false,
            total_seconds: 100,
            remaining_seconds: 100,
            start_epoch_ms: Some(0),
            paused_at_epoch_ms: None,
        };

        let mut timer = SleepTimer::new();
        assert_eq!(timer.restore(snapshot, 40_000), RestoreOutcome::Resumed);
        assert_eq!(timer.remaining_seconds(), 60);
        assert!(timer.is_running());
    }

    #[test]
    fn restore_of_an_expired_countdown_reports_expiry() {
        let snapshot = TimerSnapshot {
            is_running: true,
            is_paused: false,
            total_seconds: 100,
            remaining_seconds: 40,
            start_epoch_ms: Some(0),
            paused_at_epoch_ms: None,
        };

        let mut timer = SleepTimer::new();
        assert_eq!(timer.restore(snapshot, 200_000), RestoreOutcome::Expired);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[test]
    fn restore_of_a_paused_snapshot_keeps_it_paused() {
        let snapshot = TimerSnapshot {
            is_running: false,
            is_paused: true,
            total_seconds: 600,
            remaining_seconds: 300,
            start_epoch_ms: Some(0),
            paused_at_epoch_ms: Some(300_000),
        };

        let mut timer = SleepTimer::new();
        assert_eq!(timer.restore(snapshot, 900_000), RestoreOutcome::Idle);
        assert!(timer.is_paused());
        assert_eq!(timer.remaining_seconds(), 300);
    }
}
