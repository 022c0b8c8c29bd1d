//! Platform-specific paths and directory resolution.
//!
//! Keeps filesystem and environment concerns in one place so the rest of the
//! host does not depend on platform-specific env vars or paths.
//! The data root is computed once at first use.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::{ENV_DATA_DIR, INSTANCES_DIRNAME, PROFILE_CONFIG_FILENAME};
use crate::error::{ProfileError, Result};

static USER_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

fn compute_user_data_dir() -> PathBuf {
    let explicit = std::env::var(ENV_DATA_DIR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    #[cfg(target_os = "windows")]
    let platform = std::env::var("LOCALAPPDATA")
        .ok()
        .map(|local| PathBuf::from(local).join("Instance Host"));

    #[cfg(target_os = "macos")]
    let platform = std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join("Instance Host")
    });

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let platform = std::env::var("XDG_DATA_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".local").join("share"))
        })
        .map(|p| p.join("instance-host"));

    explicit
        .or(platform)
        .and_then(|path| std::fs::create_dir_all(&path).ok().map(|()| path))
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir().join("instance-host");
            if std::fs::create_dir_all(&fallback).is_err() {
                log::warn!("Could not create user data dir; using temp_dir as-is");
            }
            fallback
        })
}

/// Returns the data root (cached after first use).
#[must_use]
pub fn user_data_dir() -> PathBuf {
    USER_DATA_DIR.get_or_init(compute_user_data_dir).clone()
}

/// Directory holding one folder per profile.
#[must_use]
pub fn instances_dir(root: &Path) -> PathBuf {
    root.join(INSTANCES_DIRNAME)
}

/// Rejects ids that are empty, hidden, or could leave the instances directory.
///
/// Separators are refused, so the id is a single component; a leading `.` covers `.` and `..`.
pub fn validate_profile_id(profile_id: &str) -> Result<()> {
    let bad = profile_id.is_empty()
        || profile_id.starts_with('.')
        || profile_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(ProfileError::InvalidProfileId(profile_id.to_string()));
    }
    Ok(())
}

/// Path of `<instances>/<profile_id>/config.json`.
pub fn profile_config_path(instances: &Path, profile_id: &str) -> Result<PathBuf> {
    validate_profile_id(profile_id)?;
    Ok(instances.join(profile_id).join(PROFILE_CONFIG_FILENAME))
}
