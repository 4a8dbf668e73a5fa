use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenSignal {
    ScreenOn,
    ScreenOff,
    UserPresent,
}

/// Device screen-state feed. Listening is a scoped resource: every
/// `start_listening` is balanced by `stop_listening` on teardown.
pub trait ScreenStateSource {
    fn start_listening(&mut self) -> Result<()>;
    fn stop_listening(&mut self);
    fn poll(&mut self) -> Vec<ScreenSignal>;
}

/// Fallback for runtimes without a screen-state bridge: never reports.
#[derive(Debug, Default)]
pub struct NullScreenSource;

impl NullScreenSource {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenStateSource for NullScreenSource {
    fn start_listening(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_listening(&mut self) {}

    fn poll(&mut self) -> Vec<ScreenSignal> {
        Vec::new()
    }
}

/// Watches for the device going dark and stops playback after the configured
/// quiet period. Screen-off is the trigger of record: backgrounding the app
/// alone does not arm the deadline.
pub struct InactivityMonitor {
    source: Box<dyn ScreenStateSource>,
    armed: bool,
    listening: bool,
    timeout_minutes: f64,
    timeout_ms: i64,
    deadline_epoch_ms: Option<i64>,
    last_activity_epoch_ms: i64,
}

impl InactivityMonitor {
    pub fn new(source: Box<dyn ScreenStateSource>) -> Self {
        Self {
            source,
            armed: false,
            listening: false,
            timeout_minutes: 0.0,
            timeout_ms: 0,
            deadline_epoch_ms: None,
            last_activity_epoch_ms: 0,
        }
    }

    pub fn arm(&mut self, minutes: f64, now: i64) {
        self.timeout_minutes = minutes;
        self.timeout_ms = (minutes * 60_000.0) as i64;
        self.armed = true;
        self.deadline_epoch_ms = None;
        self.last_activity_epoch_ms = now;

        if !self.listening {
            match self.source.start_listening() {
                Ok(()) => self.listening = true,
                Err(err) => {
                    log::warn!("screen-state source unavailable: {err:#}");
                }
            }
        }
    }

    /// Cancels any pending deadline and releases the screen-state
    /// subscription; nothing may keep firing after teardown.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.deadline_epoch_ms = None;
        if self.listening {
            self.source.stop_listening();
            self.listening = false;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn last_activity_epoch_ms(&self) -> i64 {
        self.last_activity_epoch_ms
    }

    /// In-app interaction (pointer, key, scroll) reported by the host.
    pub fn note_activity(&mut self, now: i64) {
        if !self.armed {
            return;
        }
        self.last_activity_epoch_ms = now;
        if self.deadline_epoch_ms.take().is_some() {
            log::debug!("inactivity deadline canceled by user activity");
        }
    }

    /// Returns the stop reason once an uncancelled deadline passes, after
    /// tearing the monitor down.
    pub fn tick(&mut self, now: i64) -> Option<String> {
        if !self.armed {
            return None;
        }

        for signal in self.source.poll() {
            match signal {
                ScreenSignal::ScreenOff => {
                    self.deadline_epoch_ms = Some(now.saturating_add(self.timeout_ms));
                    log::debug!("screen off, inactivity deadline in {} ms", self.timeout_ms);
                }
                ScreenSignal::ScreenOn | ScreenSignal::UserPresent => self.note_activity(now),
            }
        }

        if let Some(deadline) = self.deadline_epoch_ms
            && now >= deadline
        {
            let reason = stop_reason(self.timeout_minutes);
            self.disarm();
            return Some(reason);
        }
        None
    }
}

fn stop_reason(minutes: f64) -> String {
    let display = if minutes >= 1.0 {
        let rounded = minutes.round() as i64;
        if rounded > 1 {
            format!("{rounded} minutes")
        } else {
            "1 minute".to_string()
        }
    } else {
        format!("{} seconds", (minutes * 60.0).round() as i64)
    };
    format!("Playback stopped due to {display} of inactivity 🌙")
}
