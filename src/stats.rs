use crate::model::ListeningData;
use crate::storage::{KeyValueStore, LISTENING_KEY};
use std::collections::HashMap;
use time::{Duration as TimeDuration, OffsetDateTime};

const SAVE_EVERY_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTotal {
    pub date: String,
    pub seconds: u64,
}

/// Accumulates listening time into per-day buckets and a monotonic all-time
/// counter. Elapsed time is derived from the wall clock between samples, so
/// missed ticks still count.
pub struct ListeningTracker {
    data: ListeningData,
    tracking: bool,
    session_seconds: u64,
    last_sample_epoch_ms: Option<i64>,
    unsaved_seconds: u64,
}

impl ListeningTracker {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let data = match store.get(LISTENING_KEY) {
            Ok(Some(raw)) => parse_listening_data(&raw),
            Ok(None) => ListeningData::default(),
            Err(err) => {
                log::warn!("failed to read listening data: {err:#}");
                ListeningData::default()
            }
        };

        Self {
            data,
            tracking: false,
            session_seconds: 0,
            last_sample_epoch_ms: None,
            unsaved_seconds: 0,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn start(&mut self, now: i64) {
        if self.tracking {
            return;
        }
        self.tracking = true;
        self.last_sample_epoch_ms = Some(now);
    }

    pub fn stop(&mut self, store: &mut dyn KeyValueStore, now: i64) {
        if !self.tracking {
            return;
        }
        self.accumulate(store, now);
        self.tracking = false;
        self.last_sample_epoch_ms = None;
        self.persist(store);
        self.unsaved_seconds = 0;
    }

    pub fn tick(&mut self, store: &mut dyn KeyValueStore, now: i64) {
        if self.tracking {
            self.accumulate(store, now);
        }
    }

    pub fn session_seconds(&self) -> u64 {
        self.session_seconds
    }

    pub fn all_time_seconds(&self) -> u64 {
        self.data.all_time_seconds
    }

    pub fn seconds_for_date(&self, date: &str) -> u64 {
        self.data.daily.get(date).copied().unwrap_or(0)
    }

    /// Oldest first, missing days filled with zero, ending today.
    pub fn last_n_days(&self, days: usize, now: i64) -> Vec<DayTotal> {
        let today = date_of(now);
        let mut result = Vec::with_capacity(days);
        for back in (0..days).rev() {
            let date = today
                .checked_sub(TimeDuration::days(back as i64))
                .unwrap_or(today);
            let key = format_date(date);
            let seconds = self.seconds_for_date(&key);
            result.push(DayTotal { date: key, seconds });
        }
        result
    }

    pub fn week_total_seconds(&self, now: i64) -> u64 {
        self.last_n_days(7, now)
            .iter()
            .map(|day| day.seconds)
            .sum()
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.data = ListeningData::default();
        self.session_seconds = 0;
        self.unsaved_seconds = 0;
        self.persist(store);
    }

    fn accumulate(&mut self, store: &mut dyn KeyValueStore, now: i64) {
        let Some(last) = self.last_sample_epoch_ms else {
            return;
        };

        let whole_seconds = (now.saturating_sub(last).max(0) / 1_000) as u64;
        if whole_seconds == 0 {
            return;
        }

        let key = format_date(date_of(now));
        let bucket = self.data.daily.entry(key).or_insert(0);
        *bucket = bucket.saturating_add(whole_seconds);
        self.data.all_time_seconds = self.data.all_time_seconds.saturating_add(whole_seconds);
        self.session_seconds = self.session_seconds.saturating_add(whole_seconds);

        // Carry the sub-second remainder instead of dropping it.
        self.last_sample_epoch_ms = Some(last + (whole_seconds as i64) * 1_000);

        self.unsaved_seconds += whole_seconds;
        if self.unsaved_seconds >= SAVE_EVERY_SECONDS {
            self.persist(store);
            self.unsaved_seconds = 0;
        }
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(&self.data) {
            Ok(json) => {
                if let Err(err) = store.set(LISTENING_KEY, &json) {
                    log::warn!("failed to save listening data: {err:#}");
                }
            }
            Err(err) => log::warn!("failed to serialize listening data: {err}"),
        }
    }
}

pub fn format_time(total_seconds: u64) -> (u64, u64, u64) {
    (
        total_seconds / 3_600,
        (total_seconds % 3_600) / 60,
        total_seconds % 60,
    )
}

fn parse_listening_data(raw: &str) -> ListeningData {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("failed to parse listening data: {err}");
            return ListeningData::default();
        }
    };

    if value.get("daily").is_some() {
        return serde_json::from_value(value).unwrap_or_else(|err| {
            log::warn!("failed to parse listening data: {err}");
            ListeningData::default()
        });
    }

    // Legacy layout: a bare map of date -> seconds, without the all-time
    // counter. Rebuild the counter from the days we have.
    match serde_json::from_value::<HashMap<String, u64>>(value) {
        Ok(daily) => {
            let all_time_seconds = daily.values().copied().sum();
            ListeningData {
                daily,
                all_time_seconds,
            }
        }
        Err(err) => {
            log::warn!("failed to migrate legacy listening data: {err}");
            ListeningData::default()
        }
    }
}

fn date_of(now_epoch_ms: i64) -> time::Date {
    OffsetDateTime::from_unix_timestamp(now_epoch_ms.div_euclid(1_000))
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .date()
}

fn format_date(date: time::Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
