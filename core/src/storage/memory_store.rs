//! In-process profile store for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ProfileConfig, ProfileStore};
use crate::error::{ProfileError, Result};
use crate::paths::validate_profile_id;

/// In-process store. Counts saves so callers can observe no-op writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProfileConfig>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn with_record(profile_id: &str, record: ProfileConfig) -> Self {
        let store = Self::default();
        store.insert(profile_id, record);
        store
    }

    pub fn insert(&self, profile_id: &str, record: ProfileConfig) {
        self.lock().insert(profile_id.to_string(), record);
    }

    #[must_use]
    pub fn get(&self, profile_id: &str) -> Option<ProfileConfig> {
        self.lock().get(profile_id).cloned()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProfileConfig>> {
        self.records.lock().unwrap_or_else(|e| {
            log::error!("Memory store mutex was poisoned, recovering");
            e.into_inner()
        })
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, profile_id: &str) -> Result<ProfileConfig> {
        validate_profile_id(profile_id)?;
        self.lock()
            .get(profile_id)
            .cloned()
            .ok_or_else(|| ProfileError::unavailable(profile_id, "no such profile"))
    }

    fn save(&self, profile_id: &str, record: &ProfileConfig) -> Result<()> {
        validate_profile_id(profile_id)?;
        self.lock().insert(profile_id.to_string(), record.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
