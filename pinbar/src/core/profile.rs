use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque, stable profile identifier. Generated once and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external application resolved through the OS application registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetApp {
    pub path: PathBuf,
    pub bundle_id: String,
    pub display_name: String,
}

/// A global shortcut: macOS virtual key code plus Carbon modifier mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotKeySetting {
    pub key_code: u32,
    pub modifiers: u32,
}

impl HotKeySetting {
    pub fn new(key_code: u32, modifiers: u32) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinProfile {
    pub id: ProfileId,
    pub app_path: String,
    pub bundle_id: String,
    pub display_name: String,
    #[serde(default = "default_true")]
    pub use_app_icon: bool,
    #[serde(default)]
    pub use_template_icon: bool,
    #[serde(default)]
    pub hot_key: Option<HotKeySetting>,
}

fn default_true() -> bool {
    true
}

impl PinProfile {
    pub fn new(app: &TargetApp) -> Self {
        Self {
            id: ProfileId::generate(),
            app_path: app.path.to_string_lossy().into_owned(),
            bundle_id: app.bundle_id.clone(),
            display_name: app.display_name.clone(),
            use_app_icon: true,
            use_template_icon: false,
            hot_key: None,
        }
    }

    /// Refresh the app-derived fields from a fresh resolution, keeping id and user settings.
    pub fn apply_target(&mut self, app: &TargetApp) {
        self.app_path = app.path.to_string_lossy().into_owned();
        self.bundle_id = app.bundle_id.clone();
        self.display_name = app.display_name.clone();
    }
}

/// Drop later profiles that repeat an earlier `bundle_id`, keeping first-seen order.
pub fn ensure_unique(profiles: Vec<PinProfile>) -> Vec<PinProfile> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|p| {
            let first = seen.insert(p.bundle_id.clone());
            if !first {
                tracing::debug!("Dropping duplicate profile for {}", p.bundle_id);
            }
            first
        })
        .collect()
}
