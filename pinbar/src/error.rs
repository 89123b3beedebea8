use thiserror::Error;

use crate::core::ProfileId;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{0} is not an application bundle")]
    Unresolvable(String),
    #[error("{display_name} ({bundle_id}) is already pinned")]
    Duplicate {
        bundle_id: String,
        display_name: String,
    },
    #[error("unknown profile {0}")]
    UnknownProfile(ProfileId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("{shortcut} is already used by {other}")]
    Conflict { shortcut: String, other: String },
    #[error("{shortcut} could not be registered; it may be in use by another application")]
    Rejected { shortcut: String },
    #[error("unknown profile {0}")]
    UnknownProfile(ProfileId),
    #[error("invalid shortcut: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejection of a single registration by the OS shortcut layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hotkey registration failed with status {status}")]
pub struct RegistrationError {
    pub status: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not open {path}: {reason}")]
pub struct LaunchError {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("preferences I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("preferences are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
