use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "lull";
const STORE_FILE: &str = "store.json";

pub const FAVORITES_KEY: &str = "favorites";
pub const MIXES_KEY: &str = "mixes";
pub const PREMIUM_KEY: &str = "premium_unlocked";
pub const TIMER_STATE_KEY: &str = "timer_state";
pub const SMART_TIMER_KEY: &str = "smart_timer_config";
pub const LISTENING_KEY: &str = "listening_data";

/// Named-slot string storage. Hosts adapt their preferences plugin to this;
/// callers treat every read and write as fallible and degrade on failure.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("LULL_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

/// Single-file JSON store: one object, one entry per named slot. Writes go
/// through to disk on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open_default() -> Result<Self> {
        let root = ensure_config_dir()?;
        Self::open_at(root.join(STORE_FILE))
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Ephemeral store for tests and hosts that opt out of durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(STORE_FILE);

        let mut store = JsonFileStore::open_at(path.clone()).expect("open");
        store.set(MIXES_KEY, "[]").expect("set");
        store.set(PREMIUM_KEY, "true").expect("set");

        let reopened = JsonFileStore::open_at(path).expect("reopen");
        assert_eq!(reopened.get(MIXES_KEY).expect("get"), Some("[]".into()));
        assert_eq!(reopened.get(PREMIUM_KEY).expect("get"), Some("true".into()));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileStore::open_at(dir.path().join("absent.json")).expect("open");
        assert_eq!(store.get(TIMER_STATE_KEY).expect("get"), None);
    }

    #[test]
    fn set_overwrites_existing_slot() {
        let mut store = MemoryStore::new();
        store.set(FAVORITES_KEY, "[\"rain\"]").expect("set");
        store.set(FAVORITES_KEY, "[\"wind\"]").expect("set");
        assert_eq!(
            store.get(FAVORITES_KEY).expect("get"),
            Some("[\"wind\"]".into())
        );
    }
}
