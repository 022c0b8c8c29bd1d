//! Persistent profile records and launcher settings (JSON on disk).
//!
//! Profile records live at `<instances>/<profile>/config.json` and are only
//! ever rewritten whole, through a temp file that is atomically renamed over
//! the target. Fields this host does not know about are carried through
//! untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_JAVA_MEMORY_MB, SETTINGS_FILENAME};
use crate::error::{ProfileError, Result};
use crate::paths::profile_config_path;

/// One profile's configuration record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    /// Heap override in MB. `None` is written as `""` (use the global default).
    #[serde(default, with = "override_sentinel")]
    pub override_memory: Option<u32>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// `overrideMemory` on disk: an integer, or `""` / `null` / absent for none.
mod override_sentinel {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(mb) => s.serialize_u32(*mb),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("overrideMemory out of range: {n}"))),
            other => Err(D::Error::custom(format!(
                "overrideMemory must be an integer or \"\", got {other}"
            ))),
        }
    }
}

/// Keyed record store. Implementations must make `save` all-or-nothing.
pub trait ProfileStore: Send + Sync {
    fn load(&self, profile_id: &str) -> Result<ProfileConfig>;
    fn save(&self, profile_id: &str, record: &ProfileConfig) -> Result<()>;
}

/// Store backed by one `config.json` per profile directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    instances: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(instances: PathBuf) -> Self {
        Self { instances }
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self, profile_id: &str) -> Result<ProfileConfig> {
        let path = profile_config_path(&self.instances, profile_id)?;
        let content = fs::read_to_string(&path)
            .map_err(|e| ProfileError::unavailable(profile_id, format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ProfileError::unavailable(profile_id, format!("{}: {e}", path.display())))
    }

    fn save(&self, profile_id: &str, record: &ProfileConfig) -> Result<()> {
        let path = profile_config_path(&self.instances, profile_id)?;
        let json = serde_json::to_vec(record).map_err(|e| ProfileError::unavailable(profile_id, e))?;
        write_atomic(&path, &json)
            .map_err(|e| ProfileError::unavailable(profile_id, format!("{}: {e}", path.display())))?;
        log::debug!("Saved profile config {}", path.display());
        Ok(())
    }
}

/// Writes `contents` to a sibling temp file, syncs it, then renames it over `path`.
///
/// An existing target keeps its permissions; the temp file would otherwise be 0600.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    let mut temp = tempfile::Builder::new()
        .prefix(".config")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file_mut().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod memory_store;
#[cfg(test)]
pub use memory_store::MemoryStore;

// ---------------------------------------------------------------------------
// Launcher settings
// ---------------------------------------------------------------------------

/// Java section of the launcher-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaSettings {
    /// Global heap (MB), also the initial value when an override is switched on.
    #[serde(default = "default_java_memory")]
    pub memory: u32,
    /// Extra JVM arguments, whitespace separated.
    #[serde(default)]
    pub args: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_java_memory() -> u32 {
    DEFAULT_JAVA_MEMORY_MB
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            memory: DEFAULT_JAVA_MEMORY_MB,
            args: String::new(),
            path: None,
        }
    }
}

/// Root settings structure. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LauncherSettings {
    #[serde(default)]
    pub java: JavaSettings,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILENAME)
}

/// Loads settings from the data root. Returns defaults on a missing or unparsable file.
#[must_use]
pub fn load_settings(root: &Path) -> LauncherSettings {
    let path = settings_path(root);
    let Ok(content) = fs::read_to_string(&path) else {
        return LauncherSettings::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("Ignoring unparsable settings {}: {}", path.display(), e);
        LauncherSettings::default()
    })
}

/// Saves settings to the data root atomically.
pub fn save_settings(root: &Path, settings: &LauncherSettings) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let json = serde_json::to_vec_pretty(settings)?;
    write_atomic(&settings_path(root), &json)
}

/// Records the java executable to probe and persists it.
pub fn set_java_path(root: &Path, path: PathBuf) -> std::io::Result<()> {
    let mut settings = load_settings(root);
    settings.java.path = Some(path);
    save_settings(root, &settings)
}
