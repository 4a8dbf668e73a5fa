use crate::audio::{AudioBackend, AudioChannel};
use crate::catalog;
use crate::fade::{Fade, FadeAction};
use crate::model::{Mix, MixLevel, SoundDef};
use anyhow::{Result, bail};
use std::path::Path;

pub const TOGGLE_FADE_MS: i64 = 500;
pub const PAUSE_FADE_MS: i64 = 300;
pub const RESUME_FADE_MS: i64 = 300;
pub const STOP_FADE_MS: i64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Premium sound without an unlock: no state change happened.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// Every channel has settled (gain 0, paused) and selection is cleared.
    AllStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Pause,
    Stop,
}

struct SoundState {
    def: &'static SoundDef,
    selected: bool,
    volume: f32,
    muted: bool,
    loading: bool,
    channel: Option<Box<dyn AudioChannel>>,
    fade: Option<Fade>,
}

impl SoundState {
    fn live_target(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }
}

/// Single owner of all audio-channel state. Other components never mutate a
/// sound's selection or volume directly; they go through these operations.
pub struct SoundBoard {
    sounds: Vec<SoundState>,
    backend: Box<dyn AudioBackend>,
    premium_unlocked: bool,
    playing: bool,
    pending: Option<PendingOp>,
    events: Vec<BoardEvent>,
}

impl SoundBoard {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        let sounds = catalog::builtin_sounds()
            .iter()
            .map(|def| SoundState {
                def,
                selected: false,
                volume: 1.0,
                muted: false,
                loading: false,
                channel: None,
                fade: None,
            })
            .collect();

        Self {
            sounds,
            backend,
            premium_unlocked: false,
            playing: false,
            pending: None,
            events: Vec::new(),
        }
    }

    pub fn set_premium_unlocked(&mut self, unlocked: bool) {
        self.premium_unlocked = unlocked;
    }

    pub fn toggle(&mut self, id: &str, now: i64) -> Result<ToggleOutcome> {
        let Some(index) = self.index_of(id) else {
            bail!("unknown sound id {id}");
        };

        if self.sounds[index].selected {
            self.sounds[index].selected = false;
            self.begin_fade(index, 0.0, TOGGLE_FADE_MS, FadeAction::PauseAndRewind, now);
            return Ok(ToggleOutcome::Deselected);
        }

        if self.sounds[index].def.premium && !self.premium_unlocked {
            return Ok(ToggleOutcome::Locked);
        }

        self.sounds[index].selected = true;
        self.begin_playback(index, now);
        self.resume_selected_paused();
        self.playing = true;
        Ok(ToggleOutcome::Selected)
    }

    /// Live volume changes apply directly instead of fading so dragging a
    /// slider never pops; only the select/deselect path fades.
    pub fn set_volume(&mut self, id: &str, value: f32) -> Result<()> {
        let Some(index) = self.index_of(id) else {
            bail!("unknown sound id {id}");
        };

        let state = &mut self.sounds[index];
        state.volume = value.clamp(0.0, 1.0);
        let target = state.live_target();

        if let Some(fade) = state.fade.as_mut() {
            // Keep an in-flight fade-in landing on the fresh setting; teardown
            // fades still have to reach zero.
            if fade.action() == FadeAction::None {
                fade.retarget(target);
            }
        } else if !state.muted
            && let Some(channel) = state.channel.as_mut()
        {
            channel.set_gain(state.volume);
        }
        Ok(())
    }

    pub fn toggle_mute(&mut self, id: &str) -> Result<()> {
        let Some(index) = self.index_of(id) else {
            bail!("unknown sound id {id}");
        };

        let state = &mut self.sounds[index];
        state.muted = !state.muted;
        let target = state.live_target();

        if let Some(fade) = state.fade.as_mut() {
            if fade.action() == FadeAction::None {
                fade.retarget(target);
            }
        } else if let Some(channel) = state.channel.as_mut() {
            channel.set_gain(target);
        }
        Ok(())
    }

    pub fn pause_all(&mut self, now: i64) {
        let mut fading = false;
        for index in 0..self.sounds.len() {
            let state = &self.sounds[index];
            if state.selected && state.channel.as_ref().is_some_and(|c| !c.is_paused()) {
                self.begin_fade(index, 0.0, PAUSE_FADE_MS, FadeAction::Pause, now);
                fading = true;
            }
        }

        if fading {
            self.pending = Some(PendingOp::Pause);
        } else {
            self.playing = false;
        }
    }

    pub fn resume_all(&mut self, now: i64) {
        if !self.sounds.iter().any(|state| state.selected) {
            return;
        }

        for index in 0..self.sounds.len() {
            let state = &mut self.sounds[index];
            if !state.selected {
                continue;
            }
            let Some(channel) = state.channel.as_mut() else {
                continue;
            };

            if channel.is_paused() {
                if let Err(err) = channel.play() {
                    log::warn!("failed to resume sound {}: {err:#}", state.def.id);
                    continue;
                }
            } else if !state
                .fade
                .as_ref()
                .is_some_and(|fade| fade.action() != FadeAction::None)
            {
                // Already audible and not mid-teardown: leave it alone.
                continue;
            }

            let target = state.live_target();
            self.begin_fade(index, target, RESUME_FADE_MS, FadeAction::None, now);
        }

        self.pending = None;
        self.playing = true;
    }

    /// Fades every audible channel out and, once the last fade has settled,
    /// clears all selection and emits `BoardEvent::AllStopped`.
    pub fn stop_all(&mut self, now: i64) {
        let mut fading = false;
        for index in 0..self.sounds.len() {
            let state = &self.sounds[index];
            if state.channel.as_ref().is_some_and(|c| !c.is_paused()) {
                self.begin_fade(index, 0.0, STOP_FADE_MS, FadeAction::PauseAndRewind, now);
                fading = true;
            }
        }

        if fading {
            self.pending = Some(PendingOp::Stop);
        } else {
            self.finish_stop();
        }
    }

    /// Replaces whatever is playing with the mix's sounds at their saved
    /// volumes. Channels are settled immediately rather than faded out so the
    /// incoming selection never races the outgoing one.
    pub fn apply_mix(&mut self, mix: &Mix, now: i64) -> Result<()> {
        self.settle_all_now();

        for level in &mix.sounds {
            if self.index_of(&level.sound_id).is_none() {
                log::debug!("mix {} references unknown sound {}", mix.name, level.sound_id);
                continue;
            }
            self.set_volume(&level.sound_id, level.volume)?;
            if self.toggle(&level.sound_id, now)? == ToggleOutcome::Locked {
                log::debug!("mix {} skips locked sound {}", mix.name, level.sound_id);
            }
        }
        Ok(())
    }

    pub fn tick(&mut self, now: i64) {
        for state in &mut self.sounds {
            let Some(fade) = state.fade.as_mut() else {
                continue;
            };
            let Some(channel) = state.channel.as_mut() else {
                state.fade = None;
                continue;
            };

            let sample = fade.sample(now);
            channel.set_gain(sample.gain);
            if sample.just_finished {
                let action = fade.action();
                state.fade = None;
                Self::apply_action(channel.as_mut(), action);
            }
        }

        let settling = self.sounds.iter().any(|state| state.fade.is_some());
        if let Some(op) = self.pending
            && !settling
        {
            match op {
                PendingOp::Pause => {
                    self.playing = false;
                    self.pending = None;
                }
                PendingOp::Stop => self.finish_stop(),
            }
        }

        if self.playing
            && self.pending.is_none()
            && !settling
            && !self.sounds.iter().any(|state| state.selected)
        {
            self.playing = false;
        }
    }

    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn playing_levels(&self) -> Vec<MixLevel> {
        self.sounds
            .iter()
            .filter(|state| state.selected)
            .map(|state| MixLevel {
                sound_id: state.def.id.to_string(),
                volume: state.volume,
            })
            .collect()
    }

    pub fn selected_ids(&self) -> Vec<&'static str> {
        self.sounds
            .iter()
            .filter(|state| state.selected)
            .map(|state| state.def.id)
            .collect()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state_of(id).is_some_and(|state| state.selected)
    }

    pub fn is_muted(&self, id: &str) -> bool {
        self.state_of(id).is_some_and(|state| state.muted)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.state_of(id).is_some_and(|state| state.loading)
    }

    pub fn volume(&self, id: &str) -> Option<f32> {
        self.state_of(id).map(|state| state.volume)
    }

    /// Gain currently applied to the channel, if one has been opened. Drives
    /// level meters in the host UI.
    pub fn live_gain(&self, id: &str) -> Option<f32> {
        self.state_of(id)?.channel.as_ref().map(|c| c.gain())
    }

    pub fn channel_paused(&self, id: &str) -> Option<bool> {
        self.state_of(id)?.channel.as_ref().map(|c| c.is_paused())
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.sounds.iter().position(|state| state.def.id == id)
    }

    fn state_of(&self, id: &str) -> Option<&SoundState> {
        self.sounds.iter().find(|state| state.def.id == id)
    }

    fn begin_playback(&mut self, index: usize, now: i64) {
        if self.sounds[index].channel.is_none() {
            self.sounds[index].loading = true;
            let file = Path::new(self.sounds[index].def.file);
            match self.backend.open_loop(file) {
                Ok(channel) => {
                    self.sounds[index].channel = Some(channel);
                    self.sounds[index].loading = false;
                }
                Err(err) => {
                    // No retry; the sound stays silent until toggled again.
                    log::warn!("failed to load sound {}: {err:#}", self.sounds[index].def.id);
                    self.sounds[index].loading = false;
                    return;
                }
            }
        }

        let state = &mut self.sounds[index];
        let target = state.live_target();
        if let Some(channel) = state.channel.as_mut() {
            if let Err(err) = channel.play() {
                log::warn!("failed to play sound {}: {err:#}", state.def.id);
                return;
            }
            self.begin_fade(index, target, TOGGLE_FADE_MS, FadeAction::None, now);
        }
    }

    /// Starting a new fade on a channel replaces any in-flight one; the
    /// replaced fade's completion never fires.
    fn begin_fade(&mut self, index: usize, to: f32, duration_ms: i64, action: FadeAction, now: i64) {
        let state = &mut self.sounds[index];
        let Some(channel) = state.channel.as_mut() else {
            state.fade = None;
            return;
        };

        let mut fade = Fade::new(channel.gain(), to, duration_ms, action, now);
        if fade.is_instant() {
            let sample = fade.sample(now);
            channel.set_gain(sample.gain);
            Self::apply_action(channel.as_mut(), fade.action());
            state.fade = None;
        } else {
            state.fade = Some(fade);
        }
    }

    fn apply_action(channel: &mut dyn AudioChannel, action: FadeAction) {
        match action {
            FadeAction::None => {}
            FadeAction::Pause => channel.pause(),
            FadeAction::PauseAndRewind => {
                channel.pause();
                channel.rewind();
            }
        }
    }

    fn resume_selected_paused(&mut self) {
        for state in &mut self.sounds {
            if !state.selected || state.fade.is_some() {
                continue;
            }
            if let Some(channel) = state.channel.as_mut()
                && channel.is_paused()
                && let Err(err) = channel.play()
            {
                log::warn!("failed to resume sound {}: {err:#}", state.def.id);
            }
        }
    }

    fn finish_stop(&mut self) {
        for state in &mut self.sounds {
            state.selected = false;
            state.fade = None;
        }
        self.playing = false;
        self.pending = None;
        self.events.push(BoardEvent::AllStopped);
    }

    fn settle_all_now(&mut self) {
        for state in &mut self.sounds {
            state.fade = None;
            state.selected = false;
            if let Some(channel) = state.channel.as_mut() {
                channel.set_gain(0.0);
                channel.pause();
                channel.rewind();
            }
        }
        self.playing = false;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullBackend;
    use anyhow::anyhow;

    struct FailingBackend;

    impl AudioBackend for FailingBackend {
        fn open_loop(&mut self, _file: &Path) -> Result<Box<dyn AudioChannel>> {
            Err(anyhow!("decoder unavailable"))
        }
    }

    fn board() -> SoundBoard {
        SoundBoard::new(Box::new(NullBackend::new()))
    }

    fn settle(board: &mut SoundBoard, from: i64, until: i64) {
        let mut now = from;
        while now <= until {
            board.tick(now);
            now += 50;
        }
    }

    #[test]
    fn toggle_selects_and_fades_in_to_stored_volume() {
        let mut board = board();
        board.set_volume("rain", 0.8).expect("volume");
        assert_eq!(board.toggle("rain", 0).expect("toggle"), ToggleOutcome::Selected);

        assert!(board.is_selected("rain"));
        assert!(board.is_playing());
        assert_eq!(board.channel_paused("rain"), Some(false));

        settle(&mut board, 0, TOGGLE_FADE_MS + 100);
        assert_eq!(board.live_gain("rain"), Some(0.8));
    }

    #[test]
    fn deselect_fades_out_then_pauses() {
        let mut board = board();
        board.toggle("rain", 0).expect("toggle on");
        settle(&mut board, 0, 600);

        assert_eq!(board.toggle("rain", 1_000).expect("toggle off"), ToggleOutcome::Deselected);
        assert!(!board.is_selected("rain"));
        // Mid-fade the channel is still audible.
        board.tick(1_250);
        assert_eq!(board.channel_paused("rain"), Some(false));

        settle(&mut board, 1_300, 1_000 + TOGGLE_FADE_MS + 100);
        assert_eq!(board.live_gain("rain"), Some(0.0));
        assert_eq!(board.channel_paused("rain"), Some(true));
    }

    #[test]
    fn locked_sound_rejects_toggle_until_unlocked() {
        let mut board = board();
        assert_eq!(board.toggle("campfire", 0).expect("toggle"), ToggleOutcome::Locked);
        assert!(!board.is_selected("campfire"));
        assert_eq!(board.live_gain("campfire"), None, "no playback side effect");

        board.set_premium_unlocked(true);
        assert_eq!(board.toggle("campfire", 0).expect("toggle"), ToggleOutcome::Selected);
        assert!(board.is_selected("campfire"));
    }

    #[test]
    fn set_volume_applies_directly_without_fade_while_playing() {
        let mut board = board();
        board.toggle("wind", 0).expect("toggle");
        settle(&mut board, 0, 600);
        assert_eq!(board.live_gain("wind"), Some(1.0));

        board.set_volume("wind", 0.3).expect("volume");
        // No tick needed: the gain change is immediate.
        assert_eq!(board.live_gain("wind"), Some(0.3));
    }

    #[test]
    fn set_volume_retargets_in_flight_fade_in() {
        let mut board = board();
        board.toggle("wind", 0).expect("toggle");
        board.tick(100);
        board.set_volume("wind", 0.4).expect("volume");

        settle(&mut board, 200, TOGGLE_FADE_MS + 200);
        assert_eq!(board.live_gain("wind"), Some(0.4));
    }

    #[test]
    fn mute_snaps_live_gain_and_unmute_restores_it() {
        let mut board = board();
        board.set_volume("ocean", 0.6).expect("volume");
        board.toggle("ocean", 0).expect("toggle");
        settle(&mut board, 0, 600);

        board.toggle_mute("ocean").expect("mute");
        assert!(board.is_muted("ocean"));
        assert_eq!(board.live_gain("ocean"), Some(0.0));

        board.toggle_mute("ocean").expect("unmute");
        assert_eq!(board.live_gain("ocean"), Some(0.6));
    }

    #[test]
    fn pause_and_resume_preserve_selection() {
        let mut board = board();
        board.toggle("rain", 0).expect("toggle");
        board.toggle("wind", 0).expect("toggle");
        settle(&mut board, 0, 600);

        board.pause_all(1_000);
        settle(&mut board, 1_000, 1_000 + PAUSE_FADE_MS + 100);
        assert!(!board.is_playing());
        assert!(board.is_selected("rain") && board.is_selected("wind"));
        assert_eq!(board.channel_paused("rain"), Some(true));

        board.resume_all(2_000);
        assert!(board.is_playing());
        assert_eq!(board.channel_paused("rain"), Some(false));
        settle(&mut board, 2_000, 2_000 + RESUME_FADE_MS + 100);
        assert_eq!(board.live_gain("rain"), Some(1.0));
    }

    #[test]
    fn resume_during_a_pause_fade_recovers_the_channel() {
        let mut board = board();
        board.toggle("rain", 0).expect("toggle");
        settle(&mut board, 0, 600);

        board.pause_all(1_000);
        board.tick(1_100);
        // Resume before the pause fade lands: the channel must come back up.
        board.resume_all(1_150);

        settle(&mut board, 1_150, 1_150 + RESUME_FADE_MS + 100);
        assert!(board.is_playing());
        assert_eq!(board.channel_paused("rain"), Some(false));
        assert_eq!(board.live_gain("rain"), Some(1.0));
    }

    #[test]
    fn stop_all_settles_every_channel_then_clears_selection() {
        let mut board = board();
        for id in ["rain", "wind", "ocean"] {
            board.toggle(id, 0).expect("toggle");
        }
        settle(&mut board, 0, 600);

        board.stop_all(1_000);
        // Selection survives until every fade has finished.
        assert!(board.take_events().is_empty());

        settle(&mut board, 1_000, 1_000 + STOP_FADE_MS + 100);
        assert_eq!(board.take_events(), vec![BoardEvent::AllStopped]);
        assert!(!board.is_playing());
        for id in ["rain", "wind", "ocean"] {
            assert!(!board.is_selected(id));
            assert_eq!(board.live_gain(id), Some(0.0));
            assert_eq!(board.channel_paused(id), Some(true));
        }
    }

    #[test]
    fn stop_all_with_nothing_audible_settles_immediately() {
        let mut board = board();
        board.stop_all(0);
        assert_eq!(board.take_events(), vec![BoardEvent::AllStopped]);
        assert!(!board.is_playing());
    }

    #[test]
    fn replacing_a_fade_lands_on_the_second_target() {
        let mut board = board();
        board.toggle("rain", 0).expect("toggle on");
        board.tick(100);
        // Deselect mid-fade-in: the fade-out replaces the fade-in.
        board.toggle("rain", 150).expect("toggle off");

        settle(&mut board, 150, 150 + TOGGLE_FADE_MS + 100);
        assert_eq!(board.live_gain("rain"), Some(0.0));
        assert_eq!(board.channel_paused("rain"), Some(true));
    }

    #[test]
    fn load_failure_clears_loading_and_stays_silent() {
        let mut board = SoundBoard::new(Box::new(FailingBackend));
        assert_eq!(board.toggle("rain", 0).expect("toggle"), ToggleOutcome::Selected);
        assert!(!board.is_loading("rain"));
        assert_eq!(board.live_gain("rain"), None);

        // Other sounds are unaffected by the failure.
        assert_eq!(board.toggle("wind", 0).expect("toggle"), ToggleOutcome::Selected);
    }

    #[test]
    fn apply_mix_replaces_current_selection() {
        let mut board = board();
        board.toggle("rain", 0).expect("toggle");
        settle(&mut board, 0, 600);

        let mix = Mix {
            name: "Night".to_string(),
            sounds: vec![
                MixLevel { sound_id: "wind".into(), volume: 0.5 },
                MixLevel { sound_id: "crickets".into(), volume: 0.9 },
            ],
            created_at_epoch_ms: 0,
        };
        board.apply_mix(&mix, 1_000).expect("apply");

        assert!(!board.is_selected("rain"));
        assert_eq!(board.channel_paused("rain"), Some(true));
        assert!(board.is_selected("wind") && board.is_selected("crickets"));

        settle(&mut board, 1_000, 1_000 + TOGGLE_FADE_MS + 100);
        assert_eq!(board.live_gain("wind"), Some(0.5));
        assert_eq!(board.live_gain("crickets"), Some(0.9));
    }

    #[test]
    fn unknown_sound_id_is_an_error() {
        let mut board = board();
        assert!(board.toggle("nope", 0).is_err());
        assert!(board.set_volume("nope", 0.5).is_err());
        assert!(board.toggle_mute("nope").is_err());
    }
}
