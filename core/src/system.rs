//! Host facts that bound the heap: physical memory and the Java runtime's width.
//!
//! Nothing here is cached; the selected java can change within a session.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::RwLock;

/// Queried once per bounds computation.
pub trait SystemFacts: Send + Sync {
    fn total_system_memory_mb(&self) -> u32;
    fn is_64bit_runtime(&self) -> bool;

    /// Called when the user picks another java executable. Fixed providers ignore it.
    fn select_java(&self, _java: PathBuf) {}
}

/// Real host: sysinfo for memory, the selected java executable for width.
#[derive(Debug)]
pub struct HostFacts {
    java: RwLock<PathBuf>,
}

impl HostFacts {
    #[must_use]
    pub fn new(java: PathBuf) -> Self {
        Self {
            java: RwLock::new(java),
        }
    }

    #[must_use]
    pub fn java(&self) -> PathBuf {
        self.java.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SystemFacts for HostFacts {
    fn total_system_memory_mb(&self) -> u32 {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let mb = sys.total_memory() / 1024 / 1024;
        u32::try_from(mb).unwrap_or(u32::MAX)
    }

    fn select_java(&self, java: PathBuf) {
        log::info!("Selected java runtime {}", java.display());
        *self.java.write().unwrap_or_else(|e| e.into_inner()) = java;
    }

    fn is_64bit_runtime(&self) -> bool {
        let java = self.java();
        probe_java_data_model(&java).map_or_else(
            || {
                log::warn!(
                    "Could not read data model from {}; assuming host pointer width",
                    java.display()
                );
                cfg!(target_pointer_width = "64")
            },
            |bits| bits == 64,
        )
    }
}

/// Runs `java -XshowSettings:properties -version` and returns `sun.arch.data.model`.
#[must_use]
pub fn probe_java_data_model(java: &Path) -> Option<u32> {
    let output = Command::new(java)
        .args(["-XshowSettings:properties", "-version"])
        .output()
        .map_err(|e| log::debug!("Failed to run {}: {}", java.display(), e))
        .ok()?;
    // Properties go to stderr on every JDK seen so far; check both.
    parse_data_model(&String::from_utf8_lossy(&output.stderr))
        .or_else(|| parse_data_model(&String::from_utf8_lossy(&output.stdout)))
}

/// Finds `sun.arch.data.model = N` in java's property dump.
#[must_use]
pub fn parse_data_model(dump: &str) -> Option<u32> {
    dump.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() != "sun.arch.data.model" {
            return None;
        }
        value.trim().parse().ok()
    })
}

/// Deterministic facts for tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedFacts {
    pub total_mb: u32,
    pub is_64bit: bool,
}

#[cfg(test)]
impl SystemFacts for FixedFacts {
    fn total_system_memory_mb(&self) -> u32 {
        self.total_mb
    }

    fn is_64bit_runtime(&self) -> bool {
        self.is_64bit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_model_from_property_dump() {
        let dump = "Property settings:\n    file.encoding = UTF-8\n    sun.arch.data.model = 64\n    user.name = steve\nopenjdk version \"17.0.9\"";
        assert_eq!(parse_data_model(dump), Some(64));
        assert_eq!(parse_data_model("    sun.arch.data.model = 32"), Some(32));
    }

    #[test]
    fn parse_data_model_missing_or_garbled() {
        assert_eq!(parse_data_model(""), None);
        assert_eq!(parse_data_model("java version \"1.8.0\""), None);
        assert_eq!(parse_data_model("sun.arch.data.model = unknown"), None);
    }

    #[test]
    fn missing_java_falls_back_to_pointer_width() {
        let facts = HostFacts::new(PathBuf::from("/definitely/not/a/java"));
        assert_eq!(facts.is_64bit_runtime(), cfg!(target_pointer_width = "64"));
    }

    #[test]
    fn select_java_replaces_path() {
        let facts = HostFacts::new(PathBuf::from("java"));
        facts.select_java(PathBuf::from("/opt/jdk8-x86/bin/java"));
        assert_eq!(facts.java(), PathBuf::from("/opt/jdk8-x86/bin/java"));
    }

    #[test]
    fn host_reports_some_memory() {
        let facts = HostFacts::new(PathBuf::from("java"));
        assert!(facts.total_system_memory_mb() > 0);
    }
}
