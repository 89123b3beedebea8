//! Persisted profiles and window sizes.
//!
//! Storage is a flat key/value space of JSON values. Key names are shared with earlier
//! releases and must not change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ensure_unique, HotKeySetting, PinProfile, Size};
use crate::error::StoreError;
use crate::platform::AppResolver;

pub const PROFILES_KEY: &str = "pinProfiles";
const WINDOW_SIZE_PREFIX: &str = "windowSize.";
const WINDOW_FRAME_PREFIX: &str = "windowFrame.";

/// Single-target keys from before profiles existed. Read once for migration, never written.
mod legacy {
    pub const TARGET_APP_PATH: &str = "targetAppPath";
    pub const TARGET_BUNDLE_ID: &str = "targetBundleId";
    pub const TARGET_DISPLAY_NAME: &str = "targetDisplayName";
    pub const USE_APP_ICON: &str = "useAppIcon";
    pub const USE_TEMPLATE_ICON: &str = "useTemplateIcon";
    pub const HOT_KEY_KEY_CODE: &str = "hotKeyKeyCode";
    pub const HOT_KEY_MODIFIERS: &str = "hotKeyModifiers";
}

pub trait Preferences {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Preferences kept in one JSON object on disk, rewritten after every mutation.
pub struct JsonPreferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonPreferences {
    /// `$PINBAR_PREFERENCES`, else `<config dir>/pinbar/preferences.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("PINBAR_PREFERENCES") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("pinbar").join("preferences.json"))
    }

    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Loaded {} preference keys from {:?}", values.len(), path);
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `values` to disk and adopt them only once the write has landed.
    fn commit(&mut self, values: Map<String, Value>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        self.values = values;
        Ok(())
    }
}

impl Preferences for JsonPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value);
        self.commit(values)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut values = self.values.clone();
        values.remove(key);
        self.commit(values)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSize {
    w: f64,
    h: f64,
}

/// Raw stored profile list, used to put storage back exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilesSnapshot(Option<Value>);

pub struct ProfileStore {
    prefs: Box<dyn Preferences>,
    /// Stored entries whose app is not installed right now. Written back on every save so a
    /// reinstalled app gets its profile again.
    unresolved: Vec<Value>,
}

impl ProfileStore {
    pub fn new(prefs: Box<dyn Preferences>) -> Self {
        Self {
            prefs,
            unresolved: Vec::new(),
        }
    }

    /// Load, resolve and de-duplicate the stored profiles. Entries whose app cannot be resolved
    /// are dropped from the result but kept for later saves; storage itself is left untouched.
    /// Falls back to migrating the legacy single-target keys when no profile list exists.
    pub fn load_profiles(&mut self, resolver: &dyn AppResolver) -> Vec<PinProfile> {
        self.unresolved.clear();
        let Some(stored) = self.prefs.get(PROFILES_KEY) else {
            return self.migrate_legacy(resolver);
        };
        let Value::Array(entries) = stored else {
            tracing::warn!("{} is not a list, ignoring it", PROFILES_KEY);
            return Vec::new();
        };

        let mut profiles = Vec::new();
        for entry in entries {
            let mut profile = match serde_json::from_value::<PinProfile>(entry.clone()) {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!("Skipping malformed profile: {}", e);
                    continue;
                }
            };
            let app = resolver
                .resolve_path(Path::new(&profile.app_path))
                .or_else(|| resolver.resolve_bundle_id(&profile.bundle_id));
            match app {
                Some(app) => {
                    profile.apply_target(&app);
                    profiles.push(profile);
                }
                None => {
                    tracing::debug!(
                        "Dropping profile {} ({}): app not found",
                        profile.id,
                        profile.bundle_id
                    );
                    self.unresolved.push(entry);
                }
            }
        }

        ensure_unique(profiles)
    }

    fn migrate_legacy(&mut self, resolver: &dyn AppResolver) -> Vec<PinProfile> {
        let path = self.get_string(legacy::TARGET_APP_PATH);
        let bundle_id = self.get_string(legacy::TARGET_BUNDLE_ID);
        if path.is_none() && bundle_id.is_none() {
            return Vec::new();
        }

        let app = path
            .as_deref()
            .and_then(|p| resolver.resolve_path(Path::new(p)))
            .or_else(|| bundle_id.as_deref().and_then(|b| resolver.resolve_bundle_id(b)));
        let Some(app) = app else {
            tracing::info!(
                "Legacy target {:?} could not be resolved, nothing to migrate",
                self.get_string(legacy::TARGET_DISPLAY_NAME).or(path)
            );
            return Vec::new();
        };

        let mut profile = PinProfile::new(&app);
        if let Some(Value::Bool(v)) = self.prefs.get(legacy::USE_APP_ICON) {
            profile.use_app_icon = v;
        }
        if let Some(Value::Bool(v)) = self.prefs.get(legacy::USE_TEMPLATE_ICON) {
            profile.use_template_icon = v;
        }
        let key_code = self.get_u32(legacy::HOT_KEY_KEY_CODE);
        let modifiers = self.get_u32(legacy::HOT_KEY_MODIFIERS);
        if let (Some(key_code), Some(modifiers)) = (key_code, modifiers) {
            profile.hot_key = Some(HotKeySetting::new(key_code, modifiers));
        }

        tracing::info!("Migrated legacy target {} into a profile", app.bundle_id);
        let profiles = vec![profile];
        if let Err(e) = self.save_profiles(&profiles) {
            tracing::warn!("Failed to persist migrated profile: {}", e);
        }
        profiles
    }

    pub fn save_profiles(&mut self, profiles: &[PinProfile]) -> Result<(), StoreError> {
        let mut entries = Vec::with_capacity(profiles.len() + self.unresolved.len());
        for profile in profiles {
            entries.push(serde_json::to_value(profile)?);
        }
        // A profile added for the same app again replaces the stale entry.
        entries.extend(
            self.unresolved
                .iter()
                .filter(|entry| {
                    let bundle_id = entry.get("bundleId").and_then(Value::as_str);
                    !profiles.iter().any(|p| Some(p.bundle_id.as_str()) == bundle_id)
                })
                .cloned(),
        );
        self.prefs.set(PROFILES_KEY, Value::Array(entries))
    }

    pub fn snapshot(&self) -> ProfilesSnapshot {
        ProfilesSnapshot(self.prefs.get(PROFILES_KEY))
    }

    pub fn restore(&mut self, snapshot: ProfilesSnapshot) -> Result<(), StoreError> {
        match snapshot.0 {
            Some(value) => self.prefs.set(PROFILES_KEY, value),
            None => self.prefs.remove(PROFILES_KEY),
        }
    }

    /// Remembered size, falling back to the legacy frame key.
    pub fn window_size(&self, bundle_id: &str) -> Option<Size> {
        self.prefs
            .get(&format!("{}{}", WINDOW_SIZE_PREFIX, bundle_id))
            .and_then(parse_size)
            .or_else(|| {
                self.prefs
                    .get(&format!("{}{}", WINDOW_FRAME_PREFIX, bundle_id))
                    .and_then(parse_size)
            })
    }

    pub fn set_window_size(&mut self, bundle_id: &str, size: Size) -> Result<(), StoreError> {
        let value = serde_json::to_value(StoredSize {
            w: size.width,
            h: size.height,
        })?;
        self.prefs
            .set(&format!("{}{}", WINDOW_SIZE_PREFIX, bundle_id), value)
    }

    pub fn reset_window_size(&mut self, bundle_id: &str) -> Result<(), StoreError> {
        self.prefs
            .remove(&format!("{}{}", WINDOW_SIZE_PREFIX, bundle_id))?;
        self.prefs
            .remove(&format!("{}{}", WINDOW_FRAME_PREFIX, bundle_id))
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.prefs.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.prefs
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// Accepts `{ "w": n, "h": n }` (extra fields ignored) or a `"{{x, y}, {w, h}}"` string.
fn parse_size(value: Value) -> Option<Size> {
    let size = match value {
        Value::String(text) => {
            let numbers: Vec<f64> = text
                .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse().ok())
                .collect();
            match numbers[..] {
                [_, _, w, h] => Size::new(w, h),
                _ => return None,
            }
        }
        other => {
            let stored: StoredSize = serde_json::from_value(other).ok()?;
            Size::new(stored.w, stored.h)
        }
    };
    (size.width > 0.0 && size.height > 0.0).then_some(size)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::ProfileId;
    use crate::platform::mock::{target, MockPlatform, MockPreferences};

    fn stored_ids(profiles: &[PinProfile]) -> Vec<ProfileId> {
        profiles.iter().map(|p| p.id.clone()).collect()
    }

    fn resolver() -> MockPlatform {
        MockPlatform::new()
            .with_installed(target("Notes", "com.apple.Notes"))
            .with_installed(target("Mail", "com.apple.mail"))
    }

    fn stored_profile(id: &str, name: &str, bundle_id: &str) -> Value {
        json!({
            "id": id,
            "appPath": format!("/Applications/{}.app", name),
            "bundleId": bundle_id,
            "displayName": name,
            "useAppIcon": true,
            "useTemplateIcon": false
        })
    }

    #[test]
    fn test_unresolvable_profile_dropped_others_survive() {
        let prefs = MockPreferences::new();
        prefs.insert(
            PROFILES_KEY,
            json!([
                stored_profile("A", "Notes", "com.apple.Notes"),
                stored_profile("B", "Gone", "com.example.gone"),
                stored_profile("C", "Mail", "com.apple.mail"),
            ]),
        );
        let before = prefs.dump();
        let mut store = ProfileStore::new(Box::new(prefs.clone()));

        let profiles = store.load_profiles(&resolver());
        assert_eq!(stored_ids(&profiles), vec![ProfileId::from("A"), ProfileId::from("C")]);
        // Storage is not rewritten on load.
        assert_eq!(prefs.dump(), before);
    }

    #[test]
    fn test_unresolvable_profile_kept_on_save() {
        let prefs = MockPreferences::new();
        prefs.insert(
            PROFILES_KEY,
            json!([
                stored_profile("A", "Notes", "com.apple.Notes"),
                stored_profile("B", "Gone", "com.example.gone"),
            ]),
        );
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        let mut profiles = store.load_profiles(&resolver());
        profiles[0].use_app_icon = false;
        store.save_profiles(&profiles).unwrap();

        let saved = prefs.get(PROFILES_KEY).unwrap();
        assert_eq!(saved[0]["useAppIcon"], json!(false));
        assert_eq!(saved[1], stored_profile("B", "Gone", "com.example.gone"));

        // Once installed again the profile comes back.
        let reinstalled = resolver().with_installed(target("Gone", "com.example.gone"));
        let profiles = store.load_profiles(&reinstalled);
        assert_eq!(stored_ids(&profiles), vec![ProfileId::from("A"), ProfileId::from("B")]);
    }

    #[test]
    fn test_readded_app_replaces_unresolved_entry() {
        let prefs = MockPreferences::new();
        prefs.insert(
            PROFILES_KEY,
            json!([stored_profile("B", "Gone", "com.example.gone")]),
        );
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        assert!(store.load_profiles(&resolver()).is_empty());

        let fresh = PinProfile::new(&target("Gone", "com.example.gone"));
        store.save_profiles(std::slice::from_ref(&fresh)).unwrap();
        let saved = prefs.get(PROFILES_KEY).unwrap();
        assert_eq!(saved.as_array().map(Vec::len), Some(1));
        assert_eq!(saved[0]["id"], json!(fresh.id.as_str()));
    }

    #[test]
    fn test_load_resolves_by_bundle_id_when_path_moved() {
        let prefs = MockPreferences::new();
        let mut entry = stored_profile("A", "Notes", "com.apple.Notes");
        entry["appPath"] = json!("/Old/Notes.app");
        entry["displayName"] = json!("Old Notes");
        prefs.insert(PROFILES_KEY, json!([entry]));
        let mut store = ProfileStore::new(Box::new(prefs));

        let profiles = store.load_profiles(&resolver());
        assert_eq!(profiles[0].app_path, "/Applications/Notes.app");
        assert_eq!(profiles[0].display_name, "Notes");
    }

    #[test]
    fn test_load_deduplicates_by_bundle_id() {
        let prefs = MockPreferences::new();
        prefs.insert(
            PROFILES_KEY,
            json!([
                stored_profile("A", "Notes", "com.apple.Notes"),
                stored_profile("B", "Notes", "com.apple.Notes"),
            ]),
        );
        let mut store = ProfileStore::new(Box::new(prefs));
        let profiles = store.load_profiles(&resolver());
        assert_eq!(stored_ids(&profiles), vec![ProfileId::from("A")]);
    }

    #[test]
    fn test_malformed_entry_skipped() {
        let prefs = MockPreferences::new();
        prefs.insert(
            PROFILES_KEY,
            json!([{ "id": 5 }, stored_profile("C", "Mail", "com.apple.mail")]),
        );
        let mut store = ProfileStore::new(Box::new(prefs));
        let profiles = store.load_profiles(&resolver());
        assert_eq!(stored_ids(&profiles), vec![ProfileId::from("C")]);
    }

    #[test]
    fn test_legacy_migration() {
        let prefs = MockPreferences::new();
        prefs.insert(legacy::TARGET_APP_PATH, json!("/Applications/Notes.app"));
        prefs.insert(legacy::TARGET_BUNDLE_ID, json!("com.apple.Notes"));
        prefs.insert(legacy::TARGET_DISPLAY_NAME, json!("Notes"));
        prefs.insert(legacy::USE_APP_ICON, json!(false));
        prefs.insert(legacy::HOT_KEY_KEY_CODE, json!(45));
        prefs.insert(legacy::HOT_KEY_MODIFIERS, json!(256));
        let mut store = ProfileStore::new(Box::new(prefs.clone()));

        let profiles = store.load_profiles(&resolver());
        assert_eq!(profiles.len(), 1);
        let profile = &profiles[0];
        assert_eq!(profile.bundle_id, "com.apple.Notes");
        assert!(!profile.use_app_icon);
        assert!(!profile.use_template_icon);
        assert_eq!(profile.hot_key, Some(HotKeySetting::new(45, 256)));

        // Written under the new key; legacy keys untouched.
        assert!(prefs.get(PROFILES_KEY).is_some());
        assert_eq!(
            prefs.get(legacy::TARGET_APP_PATH),
            Some(json!("/Applications/Notes.app"))
        );

        // A second load reads the migrated list and keeps the same id.
        let again = store.load_profiles(&resolver());
        assert_eq!(again[0].id, profile.id);
    }

    #[test]
    fn test_legacy_migration_unresolvable() {
        let prefs = MockPreferences::new();
        prefs.insert(legacy::TARGET_BUNDLE_ID, json!("com.example.gone"));
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        assert!(store.load_profiles(&resolver()).is_empty());
        assert!(prefs.get(PROFILES_KEY).is_none());
    }

    #[test]
    fn test_empty_storage() {
        let mut store = ProfileStore::new(Box::new(MockPreferences::new()));
        assert!(store.load_profiles(&resolver()).is_empty());
    }

    #[test]
    fn test_snapshot_restore_is_exact() {
        let prefs = MockPreferences::new();
        // Includes a field this version does not know about.
        let mut entry = stored_profile("A", "Notes", "com.apple.Notes");
        entry["extra"] = json!(1);
        prefs.insert(PROFILES_KEY, json!([entry]));
        let before = prefs.dump();
        let mut store = ProfileStore::new(Box::new(prefs.clone()));

        let snapshot = store.snapshot();
        let profiles = store.load_profiles(&resolver());
        store.save_profiles(&profiles).unwrap();
        assert_ne!(prefs.dump(), before);
        store.restore(snapshot).unwrap();
        assert_eq!(prefs.dump(), before);
    }

    #[test]
    fn test_restore_absent_snapshot_removes_key() {
        let prefs = MockPreferences::new();
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        let snapshot = store.snapshot();
        store.save_profiles(&[]).unwrap();
        store.restore(snapshot).unwrap();
        assert!(prefs.get(PROFILES_KEY).is_none());
    }

    #[test]
    fn test_window_size_roundtrip_and_format() {
        let prefs = MockPreferences::new();
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        assert_eq!(store.window_size("com.apple.Notes"), None);

        store
            .set_window_size("com.apple.Notes", Size::new(800.0, 500.0))
            .unwrap();
        assert_eq!(
            prefs.get("windowSize.com.apple.Notes"),
            Some(json!({ "w": 800.0, "h": 500.0 }))
        );
        assert_eq!(
            store.window_size("com.apple.Notes"),
            Some(Size::new(800.0, 500.0))
        );
    }

    #[test]
    fn test_legacy_frame_fallback() {
        let prefs = MockPreferences::new();
        prefs.insert(
            "windowFrame.com.apple.Notes",
            json!({ "x": 10, "y": 20, "w": 640, "h": 480 }),
        );
        prefs.insert("windowFrame.com.apple.mail", json!("{{10, 20}, {700, 300}}"));
        let store = ProfileStore::new(Box::new(prefs));
        assert_eq!(
            store.window_size("com.apple.Notes"),
            Some(Size::new(640.0, 480.0))
        );
        assert_eq!(
            store.window_size("com.apple.mail"),
            Some(Size::new(700.0, 300.0))
        );
    }

    #[test]
    fn test_new_key_wins_over_legacy_frame() {
        let prefs = MockPreferences::new();
        prefs.insert("windowFrame.com.apple.Notes", json!({ "w": 640, "h": 480 }));
        prefs.insert("windowSize.com.apple.Notes", json!({ "w": 900, "h": 700 }));
        let store = ProfileStore::new(Box::new(prefs));
        assert_eq!(
            store.window_size("com.apple.Notes"),
            Some(Size::new(900.0, 700.0))
        );
    }

    #[test]
    fn test_reset_window_size_removes_both_keys() {
        let prefs = MockPreferences::new();
        prefs.insert("windowFrame.com.apple.Notes", json!({ "w": 640, "h": 480 }));
        prefs.insert("windowSize.com.apple.Notes", json!({ "w": 900, "h": 700 }));
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        store.reset_window_size("com.apple.Notes").unwrap();
        assert_eq!(store.window_size("com.apple.Notes"), None);
        assert!(prefs.get("windowFrame.com.apple.Notes").is_none());
    }

    #[test]
    fn test_invalid_sizes_ignored() {
        let prefs = MockPreferences::new();
        prefs.insert("windowSize.a", json!({ "w": 0, "h": 480 }));
        prefs.insert("windowSize.b", json!("garbage"));
        let store = ProfileStore::new(Box::new(prefs));
        assert_eq!(store.window_size("a"), None);
        assert_eq!(store.window_size("b"), None);
    }

    #[test]
    fn test_json_preferences_persist_atomically() {
        let dir = std::env::temp_dir().join(format!("pinbar-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("preferences.json");

        let mut prefs = JsonPreferences::open(&path).unwrap();
        prefs.set("windowSize.x", json!({ "w": 1, "h": 2 })).unwrap();
        prefs.set("other", json!("value")).unwrap();
        prefs.remove("other").unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonPreferences::open(&path).unwrap();
        assert_eq!(reopened.get("windowSize.x"), Some(json!({ "w": 1, "h": 2 })));
        assert_eq!(reopened.get("other"), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_json_preferences_failed_write_leaves_values_unchanged() {
        let dir = std::env::temp_dir().join(format!("pinbar-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("prefs").join("preferences.json");

        let mut prefs = JsonPreferences::open(&path).unwrap();
        prefs.set("windowSize.x", json!({ "w": 1, "h": 2 })).unwrap();

        // A plain file where the directory should be makes every write fail.
        fs::remove_dir_all(dir.join("prefs")).unwrap();
        fs::write(dir.join("prefs"), "").unwrap();
        assert!(prefs.set(PROFILES_KEY, json!(["phantom"])).is_err());
        assert!(prefs.remove("windowSize.x").is_err());
        assert_eq!(prefs.get(PROFILES_KEY), None);
        assert_eq!(prefs.get("windowSize.x"), Some(json!({ "w": 1, "h": 2 })));

        fs::remove_file(dir.join("prefs")).unwrap();
        prefs.set("windowSize.y", json!({ "w": 3, "h": 4 })).unwrap();
        let reopened = JsonPreferences::open(&path).unwrap();
        assert_eq!(reopened.get(PROFILES_KEY), None);
        assert_eq!(reopened.get("windowSize.x"), Some(json!({ "w": 1, "h": 2 })));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_json_preferences_reject_corrupt_file() {
        let dir = std::env::temp_dir().join(format!("pinbar-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("preferences.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonPreferences::open(&path),
            Err(StoreError::Json(_))
        ));
        let _ = fs::remove_dir_all(dir);
    }
}
