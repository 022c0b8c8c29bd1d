//! Memory override manager: decides whether a profile uses a custom heap and persists it.
//!
//! Reads are served from a per-session cache that is only dropped on
//! [`MemoryOverrideManager::invalidate`]. Writes always start from a fresh load
//! so another writer's fields are never clobbered. Every operation on a profile
//! holds that profile's lock for its whole read-then-write, so commands running
//! on different worker threads cannot lose each other's updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::error::{ProfileError, Result};
use crate::memory::{MemoryBounds, compute_memory_bounds};
use crate::paths::validate_profile_id;
use crate::storage::{ProfileConfig, ProfileStore};
use crate::system::SystemFacts;

/// Receives `argumentsChanged` whenever a profile's persisted override changes.
pub trait ArgumentsNotifier: Send + Sync {
    fn arguments_changed(&self, profile_id: &str, override_memory: Option<u32>);
}

/// Discards notifications.
impl ArgumentsNotifier for () {
    fn arguments_changed(&self, _profile_id: &str, _override_memory: Option<u32>) {}
}

/// Where the effective heap came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MemorySource {
    Override,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveMemory {
    pub memory: u32,
    pub source: MemorySource,
}

pub struct MemoryOverrideManager<S, F> {
    store: S,
    facts: F,
    notifier: Arc<dyn ArgumentsNotifier>,
    cache: Mutex<HashMap<String, Option<u32>>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

fn recover<'a, T>(m: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    m.lock().unwrap_or_else(|e| {
        log::error!("{} mutex was poisoned, recovering", what);
        e.into_inner()
    })
}

impl<S: ProfileStore, F: SystemFacts> MemoryOverrideManager<S, F> {
    pub fn new(store: S, facts: F, notifier: Arc<dyn ArgumentsNotifier>) -> Self {
        Self {
            store,
            facts,
            notifier,
            cache: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn facts(&self) -> &F {
        &self.facts
    }

    /// Current bounds from fresh host facts.
    pub fn memory_bounds(&self) -> MemoryBounds {
        compute_memory_bounds(
            self.facts.is_64bit_runtime(),
            self.facts.total_system_memory_mb(),
        )
    }

    /// True iff the profile has an override set.
    pub fn is_override_enabled(&self, profile_id: &str) -> Result<bool> {
        Ok(self.override_memory(profile_id)?.is_some())
    }

    /// The override in MB, served from cache when present.
    pub fn override_memory(&self, profile_id: &str) -> Result<Option<u32>> {
        self.with_profile_lock(profile_id, || {
            if let Some(cached) = recover(&self.cache, "Override cache").get(profile_id) {
                return Ok(*cached);
            }
            Ok(self.load_fresh(profile_id)?.override_memory)
        })
    }

    /// Switches the override on (to `default_value`) or off. No-op when already in that state.
    pub fn set_override_enabled(
        &self,
        profile_id: &str,
        enabled: bool,
        default_value: u32,
    ) -> Result<()> {
        self.with_profile_lock(profile_id, || {
            self.toggle_locked(profile_id, enabled, default_value)
        })
    }

    fn toggle_locked(&self, profile_id: &str, enabled: bool, default_value: u32) -> Result<()> {
        if enabled {
            self.memory_bounds().check(default_value)?;
        }

        let mut record = self.load_fresh(profile_id)?;
        let next = match (enabled, record.override_memory) {
            (true, None) => Some(default_value),
            (false, Some(_)) => None,
            _ => {
                log::debug!("Override for '{}' already {}", profile_id, enabled);
                return Ok(());
            }
        };
        record.override_memory = next;
        self.persist(profile_id, &record)?;
        log::info!("Override for '{}' set to {:?}", profile_id, next);
        self.notifier.arguments_changed(profile_id, next);
        Ok(())
    }

    /// Commits a new heap value. The override must already be enabled; values are never clamped.
    pub fn set_memory_value(&self, profile_id: &str, value: u32) -> Result<()> {
        self.with_profile_lock(profile_id, || self.commit_locked(profile_id, value))
    }

    fn commit_locked(&self, profile_id: &str, value: u32) -> Result<()> {
        self.memory_bounds().check(value)?;

        let mut record = self.load_fresh(profile_id)?;
        match record.override_memory {
            None => {
                return Err(ProfileError::PreconditionViolation {
                    profile_id: profile_id.to_string(),
                });
            }
            Some(current) if current == value => return Ok(()),
            Some(_) => {}
        }
        record.override_memory = Some(value);
        self.persist(profile_id, &record)?;
        log::info!("Override for '{}' committed at {} MB", profile_id, value);
        self.notifier.arguments_changed(profile_id, Some(value));
        Ok(())
    }

    /// The override when set, otherwise `global_default`.
    pub fn effective_memory(&self, profile_id: &str, global_default: u32) -> Result<EffectiveMemory> {
        Ok(match self.override_memory(profile_id)? {
            Some(memory) => EffectiveMemory {
                memory,
                source: MemorySource::Override,
            },
            None => EffectiveMemory {
                memory: global_default,
                source: MemorySource::Global,
            },
        })
    }

    /// Drops cached state so the next read goes to the store.
    pub fn invalidate(&self, profile_id: &str) {
        recover(&self.cache, "Override cache").remove(profile_id);
    }

    pub fn invalidate_all(&self) {
        recover(&self.cache, "Override cache").clear();
    }

    /// Runs `op` under the profile's lock. The table entry lives only while someone holds it.
    fn with_profile_lock<T>(&self, profile_id: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        validate_profile_id(profile_id)?;
        let lock = Arc::clone(
            recover(&self.locks, "Profile lock table")
                .entry(profile_id.to_string())
                .or_default(),
        );
        let result = {
            let _guard = recover(&lock, "Profile");
            op()
        };
        let mut table = recover(&self.locks, "Profile lock table");
        // Clones are only taken under the table lock, so the count is stable here.
        if Arc::strong_count(&lock) == 2 {
            table.remove(profile_id);
        }
        result
    }

    fn load_fresh(&self, profile_id: &str) -> Result<ProfileConfig> {
        match self.store.load(profile_id) {
            Ok(record) => {
                self.remember(profile_id, record.override_memory);
                Ok(record)
            }
            Err(e) => {
                self.invalidate(profile_id);
                Err(e)
            }
        }
    }

    fn persist(&self, profile_id: &str, record: &ProfileConfig) -> Result<()> {
        if let Err(e) = self.store.save(profile_id, record) {
            self.invalidate(profile_id);
            return Err(e);
        }
        self.remember(profile_id, record.override_memory);
        Ok(())
    }

    fn remember(&self, profile_id: &str, value: Option<u32>) {
        recover(&self.cache, "Override cache").insert(profile_id.to_string(), value);
    }
}
