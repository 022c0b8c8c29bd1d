//! Error taxonomy for profile configuration operations.
//!
//! Every failure is local to one profile's operation and is returned to the
//! caller; nothing here is fatal to the host process.

use thiserror::Error;

/// Errors surfaced by the store and the memory override manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// The profile record could not be read, parsed, or written.
    #[error("config for profile '{profile_id}' is unavailable: {reason}")]
    ConfigUnavailable { profile_id: String, reason: String },

    /// Requested memory value lies outside the current runtime's bounds.
    #[error("memory value {value} MB is outside [{min}, {max}] MB")]
    OutOfRange { value: u32, min: u32, max: u32 },

    /// Memory value committed while the override is disabled.
    #[error("memory override is not enabled for profile '{profile_id}'")]
    PreconditionViolation { profile_id: String },

    /// Profile id would escape the instances directory or is empty.
    #[error("invalid profile id '{0}'")]
    InvalidProfileId(String),
}

impl ProfileError {
    pub(crate) fn unavailable(profile_id: &str, reason: impl ToString) -> Self {
        Self::ConfigUnavailable {
            profile_id: profile_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable camelCase tag used in IPC error payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable { .. } => "configUnavailable",
            Self::OutOfRange { .. } => "outOfRange",
            Self::PreconditionViolation { .. } => "preconditionViolation",
            Self::InvalidProfileId(_) => "invalidProfileId",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProfileError>;
