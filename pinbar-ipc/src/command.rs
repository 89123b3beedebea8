use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Profile operations
    ListProfiles,
    AddProfile {
        app_path: String,
    },
    RemoveProfile {
        id: String,
    },
    SetIcon {
        id: String,
        use_app_icon: bool,
        use_template_icon: bool,
    },

    // Window operations
    Toggle {
        id: String,
    },
    ResetWindowSize {
        id: String,
    },

    // Keybinding operations
    Bind {
        id: String,
        key: String,
    },
    Unbind {
        id: String,
    },

    // Control
    Quit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Error { message: String },
    Profiles { profiles: Vec<ProfileInfo> },
    ProfileId { id: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub id: String,
    pub display_name: String,
    pub bundle_id: String,
    pub app_path: String,
    pub use_app_icon: bool,
    pub use_template_icon: bool,
    pub hotkey: Option<HotKeyInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotKeyInfo {
    /// Textual form accepted by `bind`, e.g. `cmd-shift-t`.
    pub key: String,
    /// Symbolic form, e.g. `⇧⌘T`.
    pub display: String,
}
