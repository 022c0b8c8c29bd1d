//! Typed IPC between the launcher front end and the host: JSON envelope, single entry point.
//!
//! The front end sends `{ id, name, ...args }`; the host returns `{ id, ok? | err? }`.
//! Invalid messages are ignored (no panic).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::MEMORY_STEP_MB;
use crate::error::ProfileError;
use crate::java_args::JavaArguments;
use crate::manager::MemoryOverrideManager;
use crate::memory::{compute_memory_bounds, snap_to_step};
use crate::storage::{self, ProfileStore};
use crate::system::SystemFacts;

// ---------------------------------------------------------------------------
// Envelope and command
// ---------------------------------------------------------------------------

/// Incoming message: `id` (correlation) + flattened command (`name` + args).
#[derive(Debug, Clone, Deserialize)]
pub struct IpcEnvelope {
    pub id: String,
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the front end can send. Tagged with `name` for deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all_fields = "camelCase")]
pub enum Command {
    Ping,
    GetVersion,
    GetMemoryBounds,
    IsOverrideEnabled {
        profile_id: String,
    },
    SetOverrideEnabled {
        profile_id: String,
        enabled: bool,
        /// Falls back to the launcher's global heap when omitted.
        #[serde(default)]
        default_value: Option<u32>,
    },
    SetMemoryValue {
        profile_id: String,
        value: u32,
    },
    GetEffectiveMemory {
        profile_id: String,
    },
    GetJavaArguments {
        profile_id: String,
    },
    /// Drops cached state for one profile, or for all when `profileId` is omitted.
    InvalidateProfile {
        #[serde(default)]
        profile_id: Option<String>,
    },
    SelectJava {
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Error payload: a stable `kind` tag plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpcError {
    pub kind: String,
    pub message: String,
}

impl From<ProfileError> for IpcError {
    fn from(e: ProfileError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        Self {
            kind: "io".to_string(),
            message: e.to_string(),
        }
    }
}

/// Outgoing response correlated by `id`. Exactly one of `ok` or `err` is set.
#[derive(Debug, Clone, Serialize)]
pub struct IpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<IpcError>,
}

impl IpcResponse {
    #[must_use]
    pub fn ok(id: String, data: serde_json::Value) -> Self {
        Self {
            id,
            ok: Some(data),
            err: None,
        }
    }

    #[must_use]
    pub fn err(id: String, error: IpcError) -> Self {
        Self {
            id,
            ok: None,
            err: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse and handle
// ---------------------------------------------------------------------------

/// What command handlers need: the data root and the override manager.
pub struct IpcContext<S, F> {
    pub root: PathBuf,
    pub manager: MemoryOverrideManager<S, F>,
}

impl<S: ProfileStore, F: SystemFacts> IpcContext<S, F> {
    #[must_use]
    pub fn new(root: PathBuf, manager: MemoryOverrideManager<S, F>) -> Self {
        Self { root, manager }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// True for commands that touch disk or spawn java. Run these on a worker thread.
#[must_use]
pub fn is_blocking_command(command: &Command) -> bool {
    !matches!(
        command,
        Command::Ping | Command::GetVersion | Command::InvalidateProfile { .. }
    )
}

/// Parses a raw IPC message. Invalid JSON or missing required fields return `None` (ignored safely).
#[must_use]
pub fn parse_message(raw: &str) -> Option<IpcEnvelope> {
    serde_json::from_str(raw).ok()
}

/// Handles one command synchronously. Returns a JSON-serializable value or a typed error.
pub fn handle_command<S: ProfileStore, F: SystemFacts>(
    ctx: &IpcContext<S, F>,
    command: &Command,
) -> Result<serde_json::Value, IpcError> {
    let manager = &ctx.manager;
    match command {
        Command::Ping => Ok(serde_json::json!({ "pong": true })),
        Command::GetVersion => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
        Command::GetMemoryBounds => Ok(bounds_json(manager.facts())),
        Command::IsOverrideEnabled { profile_id } => Ok(serde_json::json!({
            "enabled": manager.is_override_enabled(profile_id)?
        })),
        Command::SetOverrideEnabled {
            profile_id,
            enabled,
            default_value,
        } => {
            let default_value = match default_value {
                Some(v) => *v,
                None => settings_default(ctx),
            };
            manager.set_override_enabled(profile_id, *enabled, default_value)?;
            let current = manager.override_memory(profile_id)?;
            Ok(serde_json::json!({
                "enabled": current.is_some(),
                "overrideMemory": current,
            }))
        }
        Command::SetMemoryValue { profile_id, value } => {
            manager.set_memory_value(profile_id, *value)?;
            Ok(serde_json::json!({ "value": value }))
        }
        Command::GetEffectiveMemory { profile_id } => {
            let global = storage::load_settings(ctx.root()).java.memory;
            let effective = manager.effective_memory(profile_id, global)?;
            Ok(serde_json::json!({
                "memory": effective.memory,
                "source": effective.source,
                "sliderValue": snap_to_step(effective.memory),
            }))
        }
        Command::GetJavaArguments { profile_id } => {
            let settings = storage::load_settings(ctx.root());
            let effective = manager.effective_memory(profile_id, settings.java.memory)?;
            let within_bounds = manager.memory_bounds().contains(effective.memory);
            if !within_bounds {
                log::warn!(
                    "Heap {} MB for '{}' is outside the current runtime's bounds",
                    effective.memory,
                    profile_id
                );
            }
            let args = JavaArguments::build(effective.memory, &settings.java.args);
            Ok(serde_json::json!({
                "args": args.as_slice(),
                "rendered": args.render(),
                "memory": effective.memory,
                "source": effective.source,
                "withinBounds": within_bounds,
            }))
        }
        Command::InvalidateProfile { profile_id } => {
            match profile_id {
                Some(id) => manager.invalidate(id),
                None => manager.invalidate_all(),
            }
            Ok(serde_json::json!({ "invalidated": true }))
        }
        Command::SelectJava { path } => {
            let path = PathBuf::from(path);
            storage::set_java_path(ctx.root(), path.clone())?;
            manager.facts().select_java(path);
            Ok(bounds_json(manager.facts()))
        }
    }
}

/// Bounds plus slider hints for the current runtime.
fn bounds_json<F: SystemFacts>(facts: &F) -> serde_json::Value {
    let is_64bit = facts.is_64bit_runtime();
    let bounds = compute_memory_bounds(is_64bit, facts.total_system_memory_mb());
    serde_json::json!({
        "min": bounds.min,
        "max": bounds.max,
        "step": MEMORY_STEP_MB,
        "marks": bounds.marks(),
        "positions": bounds.slider_positions(),
        "is64Bit": is_64bit,
    })
}

/// Global heap from settings, pulled into the current bounds. Only used when the front end
/// did not pick a value itself.
fn settings_default<S: ProfileStore, F: SystemFacts>(ctx: &IpcContext<S, F>) -> u32 {
    let bounds = ctx.manager.memory_bounds();
    storage::load_settings(ctx.root())
        .java
        .memory
        .clamp(bounds.min, bounds.max)
}

#[cfg(test)]
mod tests;
