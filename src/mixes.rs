use crate::model::{Mix, MixLevel};
use crate::storage::{FAVORITES_KEY, KeyValueStore, MIXES_KEY};
use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Named snapshots of sound+volume selections. Names are unique
/// case-insensitively; saving over an existing name updates it in place.
#[derive(Debug, Default)]
pub struct MixLibrary {
    mixes: Vec<Mix>,
}

impl MixLibrary {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mixes = match store.get(MIXES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("failed to parse saved mixes: {err}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("failed to read saved mixes: {err:#}");
                Vec::new()
            }
        };
        Self { mixes }
    }

    pub fn save_mix(
        &mut self,
        store: &mut dyn KeyValueStore,
        name: &str,
        sounds: Vec<MixLevel>,
        now: i64,
    ) -> Result<SaveOutcome> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("mix name must not be empty");
        }
        if sounds.is_empty() {
            bail!("a mix needs at least one sound");
        }

        let mix = Mix {
            name: trimmed.to_string(),
            sounds,
            created_at_epoch_ms: now,
        };

        let outcome = match self.position(trimmed) {
            Some(index) => {
                self.mixes[index] = mix;
                SaveOutcome::Updated
            }
            None => {
                self.mixes.push(mix);
                SaveOutcome::Created
            }
        };

        self.persist(store);
        Ok(outcome)
    }

    pub fn delete_mix(&mut self, store: &mut dyn KeyValueStore, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.mixes.remove(index);
        self.persist(store);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Mix> {
        self.position(name).map(|index| &self.mixes[index])
    }

    pub fn mix_exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn all(&self) -> &[Mix] {
        &self.mixes
    }

    fn position(&self, name: &str) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        self.mixes
            .iter()
            .position(|mix| mix.name.to_lowercase() == needle)
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(&self.mixes) {
            Ok(json) => {
                if let Err(err) = store.set(MIXES_KEY, &json) {
                    log::warn!("failed to save mixes: {err:#}");
                }
            }
            Err(err) => log::warn!("failed to serialize mixes: {err}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Favorites {
    ids: Vec<String>,
}

impl Favorites {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let ids = match store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("failed to parse favorites: {err}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("failed to read favorites: {err:#}");
                Vec::new()
            }
        };
        Self { ids }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.ids.iter().any(|entry| entry == id)
    }

    /// Returns whether the sound is a favorite after the flip.
    pub fn toggle(&mut self, store: &mut dyn KeyValueStore, id: &str) -> bool {
        let now_favorite = if let Some(index) = self.ids.iter().position(|entry| entry == id) {
            self.ids.remove(index);
            false
        } else {
            self.ids.push(id.to_string());
            true
        };
        self.persist(store);
        now_favorite
    }

    pub fn add(&mut self, store: &mut dyn KeyValueStore, id: &str) {
        if !self.is_favorite(id) {
            self.ids.push(id.to_string());
            self.persist(store);
        }
    }

    pub fn remove(&mut self, store: &mut dyn KeyValueStore, id: &str) {
        if let Some(index) = self.ids.iter().position(|entry| entry == id) {
            self.ids.remove(index);
            self.persist(store);
        }
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.ids.clear();
        self.persist(store);
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(&self.ids) {
            Ok(json) => {
                if let Err(err) = store.set(FAVORITES_KEY, &json) {
                    log::warn!("failed to save favorites: {err:#}");
                }
            }
            Err(err) => log::warn!("failed to serialize favorites: {err}"),
        }
    }
}
