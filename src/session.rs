use crate::audio::AudioBackend;
use crate::board::{BoardEvent, SoundBoard, ToggleOutcome};
use crate::mixes::{Favorites, MixLibrary, SaveOutcome};
use crate::model::{Mix, SmartTimerConfig, TimerSnapshot};
use crate::monitor::{InactivityMonitor, ScreenStateSource};
use crate::premium::{BillingGateway, PremiumAccess};
use crate::stats::ListeningTracker;
use crate::storage::{KeyValueStore, SMART_TIMER_KEY, TIMER_STATE_KEY};
use crate::timer::{RestoreOutcome, SleepTimer, TimerEvent};
use anyhow::{Result, bail};

const TIMER_DONE_NOTICE: &str = "Timer completed! Sweet dreams 🌙";

// In inactivity mode the countdown only feeds the display; the monitor is
// the real stop trigger, so the countdown gets this nominal ceiling.
const INACTIVITY_CEILING: (u32, u32, u32) = (23, 59, 59);

/// Owns the whole playback session: the board, the sleep timer, the
/// inactivity monitor and the persistence stores. The host constructs one
/// explicitly at startup and drives it with `tick(now)` from its event loop.
pub struct Session {
    board: SoundBoard,
    timer: SleepTimer,
    monitor: InactivityMonitor,
    smart_config: SmartTimerConfig,
    stats: ListeningTracker,
    premium: PremiumAccess,
    mixes: MixLibrary,
    favorites: Favorites,
    store: Box<dyn KeyValueStore>,
    notices: Vec<String>,
}

impl Session {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        screen_source: Box<dyn ScreenStateSource>,
        gateway: Box<dyn BillingGateway>,
        mut store: Box<dyn KeyValueStore>,
        now: i64,
    ) -> Self {
        let smart_config = load_smart_config(store.as_ref());
        let mixes = MixLibrary::load(store.as_ref());
        let favorites = Favorites::load(store.as_ref());
        let stats = ListeningTracker::load(store.as_ref());
        let premium = PremiumAccess::new(gateway, store.as_mut());

        let mut board = SoundBoard::new(backend);
        board.set_premium_unlocked(premium.is_unlocked());

        let mut timer = SleepTimer::new();
        let mut notices = Vec::new();
        if let Some(snapshot) = load_timer_snapshot(store.as_ref())
            && timer.restore(snapshot, now) == RestoreOutcome::Expired
        {
            // The countdown ran out while the process was gone; nothing is
            // playing yet, so completing is just the notice and the reset.
            notices.push(TIMER_DONE_NOTICE.to_string());
        }

        let mut session = Self {
            board,
            timer,
            monitor: InactivityMonitor::new(screen_source),
            smart_config,
            stats,
            premium,
            mixes,
            favorites,
            store,
            notices,
        };
        session.persist_timer();
        session
    }

    /// Fans a tick out to every time-driven part. The host calls this on a
    /// fixed interval (1 s is plenty; fades just get coarser steps).
    pub fn tick(&mut self, now: i64) {
        if self.premium.tick(self.store.as_mut()) {
            self.board.set_premium_unlocked(self.premium.is_unlocked());
        }

        self.board.tick(now);
        for event in self.board.take_events() {
            match event {
                BoardEvent::AllStopped => log::debug!("all channels settled"),
            }
        }

        if let Some(TimerEvent::Completed) = self.timer.tick(now) {
            self.board.stop_all(now);
            self.monitor.disarm();
            self.persist_timer();
            self.notices.push(TIMER_DONE_NOTICE.to_string());
        }

        if let Some(reason) = self.monitor.tick(now) {
            self.board.stop_all(now);
            self.timer.clear();
            self.persist_timer();
            self.notices.push(reason);
        }

        if self.board.is_playing() {
            self.stats.start(now);
        } else {
            self.stats.stop(self.store.as_mut(), now);
        }
        self.stats.tick(self.store.as_mut(), now);
    }

    /// Queued fire-and-forget messages for the host's toast surface.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    // ---- sounds ----

    pub fn toggle_sound(&mut self, id: &str, now: i64) -> Result<ToggleOutcome> {
        self.board.toggle(id, now)
    }

    pub fn set_sound_volume(&mut self, id: &str, value: f32) -> Result<()> {
        self.board.set_volume(id, value)
    }

    pub fn toggle_sound_mute(&mut self, id: &str) -> Result<()> {
        self.board.toggle_mute(id)
    }

    pub fn pause_all(&mut self, now: i64) {
        self.board.pause_all(now);
    }

    pub fn resume_all(&mut self, now: i64) {
        self.board.resume_all(now);
    }

    pub fn stop_all(&mut self, now: i64) {
        self.board.stop_all(now);
    }

    pub fn board(&self) -> &SoundBoard {
        &self.board
    }

    // ---- mixes & favorites ----

    pub fn save_current_mix(&mut self, name: &str, now: i64) -> Result<SaveOutcome> {
        let sounds = self.board.playing_levels();
        self.mixes.save_mix(self.store.as_mut(), name, sounds, now)
    }

    pub fn apply_mix(&mut self, name: &str, now: i64) -> Result<()> {
        let Some(mix) = self.mixes.get(name) else {
            bail!("no mix named {name}");
        };
        let mix = mix.clone();
        self.board.apply_mix(&mix, now)
    }

    pub fn delete_mix(&mut self, name: &str) -> bool {
        self.mixes.delete_mix(self.store.as_mut(), name)
    }

    pub fn mix_exists(&self, name: &str) -> bool {
        self.mixes.mix_exists(name)
    }

    pub fn mixes(&self) -> &[Mix] {
        self.mixes.all()
    }

    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        self.favorites.toggle(self.store.as_mut(), id)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.is_favorite(id)
    }

    pub fn favorite_ids(&self) -> &[String] {
        self.favorites.ids()
    }

    // ---- smart timer ----

    pub fn smart_config(&self) -> SmartTimerConfig {
        self.smart_config
    }

    pub fn set_smart_config(&mut self, config: SmartTimerConfig) -> Result<()> {
        match config {
            SmartTimerConfig::Manual {
                hours,
                minutes,
                seconds,
            } if SmartTimerConfig::manual_total_seconds(hours, minutes, seconds) == 0 => {
                bail!("timer duration must be greater than zero");
            }
            SmartTimerConfig::Inactivity { minutes } if minutes <= 0.0 => {
                bail!("inactivity duration must be greater than zero");
            }
            _ => {}
        }

        self.smart_config = config;
        match serde_json::to_string(&config) {
            Ok(json) => {
                if let Err(err) = self.store.set(SMART_TIMER_KEY, &json) {
                    log::warn!("failed to save smart timer config: {err:#}");
                }
            }
            Err(err) => log::warn!("failed to serialize smart timer config: {err}"),
        }
        Ok(())
    }

    pub fn start_timer(&mut self, now: i64) -> Result<()> {
        match self.smart_config {
            SmartTimerConfig::Manual {
                hours,
                minutes,
                seconds,
            } => {
                self.timer.set_duration(hours, minutes, seconds)?;
                self.timer.start(now);
                self.monitor.disarm();
            }
            SmartTimerConfig::Inactivity { minutes } => {
                let (hours, mins, seconds) = INACTIVITY_CEILING;
                self.timer.set_duration(hours, mins, seconds)?;
                self.timer.start(now);
                self.monitor.arm(minutes, now);
            }
        }
        self.persist_timer();
        Ok(())
    }

    pub fn pause_timer(&mut self, now: i64) {
        if self.timer.pause(now) {
            self.persist_timer();
        }
        self.monitor.disarm();
    }

    pub fn resume_timer(&mut self, now: i64) {
        if self.timer.start(now) {
            if let SmartTimerConfig::Inactivity { minutes } = self.smart_config {
                self.monitor.arm(minutes, now);
            }
            self.persist_timer();
        }
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
        self.monitor.disarm();
        self.persist_timer();
    }

    pub fn timer_snapshot(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }

    pub fn timer(&self) -> &SleepTimer {
        &self.timer
    }

    /// In-app interaction forwarded to the inactivity monitor.
    pub fn note_activity(&mut self, now: i64) {
        self.monitor.note_activity(now);
    }

    pub fn is_monitor_armed(&self) -> bool {
        self.monitor.is_armed()
    }

    // ---- premium ----

    pub fn is_premium_unlocked(&self) -> bool {
        self.premium.is_unlocked()
    }

    pub fn request_purchase(&mut self) {
        self.premium.request_purchase();
    }

    // ---- stats ----

    pub fn stats(&self) -> &ListeningTracker {
        &self.stats
    }

    fn persist_timer(&mut self) {
        match serde_json::to_string(&self.timer.snapshot()) {
            Ok(json) => {
                if let Err(err) = self.store.set(TIMER_STATE_KEY, &json) {
                    log::warn!("failed to save timer state: {err:#}");
                }
            }
            Err(err) => log::warn!("failed to serialize timer state: {err}"),
        }
    }
}

fn load_smart_config(store: &dyn KeyValueStore) -> SmartTimerConfig {
    match store.get(SMART_TIMER_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!("failed to parse smart timer config: {err}");
            SmartTimerConfig::default()
        }),
        Ok(None) => SmartTimerConfig::default(),
        Err(err) => {
            log::warn!("failed to read smart timer config: {err:#}");
            SmartTimerConfig::default()
        }
    }
}

fn load_timer_snapshot(store: &dyn KeyValueStore) -> Option<TimerSnapshot> {
    match store.get(TIMER_STATE_KEY) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("failed to parse timer state: {err}");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            log::warn!("failed to read timer state: {err:#}");
            None
        }
    }
}
