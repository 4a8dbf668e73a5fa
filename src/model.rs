use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    Nature,
    City,
    Meditation,
    Instruments,
    Asmr,
}

impl SoundCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Nature => "Nature",
            Self::City => "City",
            Self::Meditation => "Meditation",
            Self::Instruments => "Instruments",
            Self::Asmr => "ASMR",
        }
    }
}

/// One entry of the built-in sound catalog. Runtime playback state lives in
/// the board, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundDef {
    pub id: &'static str,
    pub name: &'static str,
    pub file: &'static str,
    pub category: SoundCategory,
    pub subcategory: Option<&'static str>,
    pub premium: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixLevel {
    pub sound_id: String,
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mix {
    pub name: String,
    pub sounds: Vec<MixLevel>,
    #[serde(default)]
    pub created_at_epoch_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SmartTimerConfig {
    Manual { hours: u32, minutes: u32, seconds: u32 },
    Inactivity { minutes: f64 },
}

impl SmartTimerConfig {
    pub fn manual_total_seconds(hours: u32, minutes: u32, seconds: u32) -> u64 {
        u64::from(hours) * 3_600 + u64::from(minutes) * 60 + u64::from(seconds)
    }
}

impl Default for SmartTimerConfig {
    fn default() -> Self {
        Self::Manual {
            hours: 0,
            minutes: 30,
            seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    #[serde(default)]
    pub start_epoch_ms: Option<i64>,
    #[serde(default)]
    pub paused_at_epoch_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListeningData {
    pub daily: HashMap<String, u64>,
    pub all_time_seconds: u64,
}
