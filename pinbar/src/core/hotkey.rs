use std::collections::{HashMap, HashSet};

use super::{hotkey_display_string, HotKeySetting, PinProfile, ProfileId, ProfileStore};
use crate::error::HotkeyError;
use crate::platform::ShortcutRegistrar;

/// Maps live OS shortcut registrations back to profiles.
///
/// The table is rebuilt from scratch on every pass. Event ids are never reused, so a trigger
/// that was queued before a rebuild cannot reach the wrong profile.
pub struct HotkeyRegistry {
    registrar: Box<dyn ShortcutRegistrar>,
    next_id: u32,
    bindings: HashMap<u32, ProfileId>,
}

impl HotkeyRegistry {
    pub fn new(registrar: Box<dyn ShortcutRegistrar>) -> Self {
        Self {
            registrar,
            next_id: 1,
            bindings: HashMap::new(),
        }
    }

    /// Unregister everything, then register every profile's shortcut in list order.
    /// Returns the profiles whose registration the OS rejected.
    pub fn register_all(&mut self, profiles: &[PinProfile]) -> HashSet<ProfileId> {
        self.unregister_all();

        let mut failed = HashSet::new();
        for profile in profiles {
            let Some(setting) = profile.hot_key else {
                continue;
            };
            let id = self.next_id;
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);

            match self.registrar.register(setting, id) {
                Ok(()) => {
                    tracing::debug!(
                        "Registered {} for {} (id {})",
                        hotkey_display_string(&setting),
                        profile.display_name,
                        id
                    );
                    self.bindings.insert(id, profile.id.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to register {} for {}: {}",
                        hotkey_display_string(&setting),
                        profile.display_name,
                        e
                    );
                    failed.insert(profile.id.clone());
                }
            }
        }
        failed
    }

    pub fn unregister_all(&mut self) {
        for (id, _) in self.bindings.drain() {
            self.registrar.unregister(id);
        }
    }

    /// Profile bound to a fired id. Stale or unknown ids yield `None`.
    pub fn dispatch(&self, id: u32) -> Option<&ProfileId> {
        let profile_id = self.bindings.get(&id);
        if profile_id.is_none() {
            tracing::debug!("Ignoring hotkey event for unmapped id {}", id);
        }
        profile_id
    }

    /// Set or clear `profile_id`'s shortcut atomically.
    ///
    /// The edit is persisted and registered; if the OS rejects the new shortcut, the in-memory
    /// list and the stored list are put back exactly as they were and the previous shortcuts are
    /// registered again.
    pub fn apply_edit(
        &mut self,
        store: &mut ProfileStore,
        profiles: &mut Vec<PinProfile>,
        profile_id: &ProfileId,
        setting: Option<HotKeySetting>,
    ) -> Result<(), HotkeyError> {
        let index = profiles
            .iter()
            .position(|p| p.id == *profile_id)
            .ok_or_else(|| HotkeyError::UnknownProfile(profile_id.clone()))?;

        if let Some(setting) = setting {
            if let Some(other) = find_conflict(profiles, profile_id, &setting) {
                return Err(HotkeyError::Conflict {
                    shortcut: hotkey_display_string(&setting),
                    other: other.display_name.clone(),
                });
            }
        }

        let snapshot = store.snapshot();
        let previous = profiles.clone();
        profiles[index].hot_key = setting;

        if let Err(e) = store.save_profiles(profiles) {
            *profiles = previous;
            return Err(e.into());
        }

        let failed = self.register_all(profiles);
        if !failed.contains(profile_id) {
            return Ok(());
        }

        tracing::info!("Rolling back shortcut edit for {}", profile_id);
        *profiles = previous;
        if let Err(e) = store.restore(snapshot) {
            tracing::error!("Failed to restore stored profiles: {}", e);
        }
        let still_failing = self.register_all(profiles);
        if !still_failing.is_empty() {
            tracing::warn!(
                "{} shortcuts still unavailable after rollback",
                still_failing.len()
            );
        }
        Err(HotkeyError::Rejected {
            shortcut: setting
                .map(|s| hotkey_display_string(&s))
                .unwrap_or_default(),
        })
    }
}

/// Another profile already holding `setting`.
pub fn find_conflict<'a>(
    profiles: &'a [PinProfile],
    profile_id: &ProfileId,
    setting: &HotKeySetting,
) -> Option<&'a PinProfile> {
    profiles
        .iter()
        .find(|p| p.id != *profile_id && p.hot_key.as_ref() == Some(setting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_hotkey;
    use crate::platform::mock::{target, Call, MockPlatform, MockPreferences};

    fn profiles() -> Vec<PinProfile> {
        let mut notes = PinProfile::new(&target("Notes", "com.apple.Notes"));
        notes.hot_key = Some(parse_hotkey("cmd-shift-n").unwrap());
        let mail = PinProfile::new(&target("Mail", "com.apple.mail"));
        let mut music = PinProfile::new(&target("Music", "com.apple.Music"));
        music.hot_key = Some(parse_hotkey("cmd-shift-m").unwrap());
        vec![notes, mail, music]
    }

    fn setup() -> (MockPlatform, HotkeyRegistry, MockPreferences, ProfileStore, Vec<PinProfile>) {
        let platform = MockPlatform::new();
        let registry = HotkeyRegistry::new(Box::new(platform.clone()));
        let prefs = MockPreferences::new();
        let mut store = ProfileStore::new(Box::new(prefs.clone()));
        let profiles = profiles();
        store.save_profiles(&profiles).unwrap();
        (platform, registry, prefs, store, profiles)
    }

    #[test]
    fn test_register_all_maps_successes_and_reports_failures() {
        let (platform, mut registry, _, _, profiles) = setup();
        platform
            .world
            .borrow_mut()
            .rejected_hotkeys
            .insert(parse_hotkey("cmd-shift-m").unwrap());

        let failed = registry.register_all(&profiles);
        assert_eq!(failed, HashSet::from([profiles[2].id.clone()]));
        assert_eq!(registry.dispatch(1), Some(&profiles[0].id));
        assert_eq!(registry.dispatch(2), None);
    }

    #[test]
    fn test_ids_are_fresh_on_every_pass() {
        let (platform, mut registry, _, _, profiles) = setup();
        registry.register_all(&profiles);
        registry.register_all(&profiles);

        // First pass used ids 1 and 2; both were unregistered and are now stale.
        assert_eq!(registry.dispatch(1), None);
        assert_eq!(registry.dispatch(2), None);
        assert_eq!(registry.dispatch(3), Some(&profiles[0].id));
        assert_eq!(registry.dispatch(4), Some(&profiles[2].id));
        assert_eq!(platform.world.borrow().registered.len(), 2);
        assert!(platform.calls().contains(&Call::Unregister(1)));
    }

    #[test]
    fn test_conflict_only_with_other_profiles() {
        let profiles = profiles();
        let setting = parse_hotkey("cmd-shift-n").unwrap();
        assert_eq!(
            find_conflict(&profiles, &profiles[1].id, &setting).map(|p| &p.id),
            Some(&profiles[0].id)
        );
        assert!(find_conflict(&profiles, &profiles[0].id, &setting).is_none());
        let free = parse_hotkey("cmd-shift-x").unwrap();
        assert!(find_conflict(&profiles, &profiles[1].id, &free).is_none());
    }

    #[test]
    fn test_conflicting_edit_rejected_before_os_call() {
        let (platform, mut registry, prefs, mut store, mut profiles) = setup();
        let before = prefs.dump();
        let mail = profiles[1].id.clone();

        let result = registry.apply_edit(
            &mut store,
            &mut profiles,
            &mail,
            Some(parse_hotkey("cmd-shift-n").unwrap()),
        );
        assert!(matches!(result, Err(HotkeyError::Conflict { ref other, .. }) if other == "Notes"));
        assert!(platform.calls().is_empty());
        assert_eq!(prefs.dump(), before);
    }

    #[test]
    fn test_successful_edit_persists_and_registers() {
        let (platform, mut registry, _, mut store, mut profiles) = setup();
        let mail = profiles[1].id.clone();
        let setting = parse_hotkey("cmd-alt-m").unwrap();

        registry
            .apply_edit(&mut store, &mut profiles, &mail, Some(setting))
            .unwrap();
        assert_eq!(profiles[1].hot_key, Some(setting));
        let fired = platform
            .world
            .borrow()
            .registered
            .iter()
            .find(|(_, s)| **s == setting)
            .map(|(id, _)| *id)
            .unwrap();
        assert_eq!(registry.dispatch(fired), Some(&mail));
    }

    #[test]
    fn test_rejected_edit_rolls_back_exactly() {
        let (platform, mut registry, prefs, mut store, mut profiles) = setup();
        registry.register_all(&profiles);
        let before_prefs = prefs.dump();
        let before_profiles = profiles.clone();
        let notes = profiles[0].id.clone();
        let taken = parse_hotkey("cmd-space").unwrap();
        platform.world.borrow_mut().rejected_hotkeys.insert(taken);

        let result = registry.apply_edit(&mut store, &mut profiles, &notes, Some(taken));
        assert!(matches!(result, Err(HotkeyError::Rejected { .. })));
        assert_eq!(prefs.dump(), before_prefs);
        assert_eq!(profiles, before_profiles);

        // The previous shortcut is live again.
        let registered: HashSet<HotKeySetting> =
            platform.world.borrow().registered.values().copied().collect();
        assert!(registered.contains(&parse_hotkey("cmd-shift-n").unwrap()));
        assert!(!registered.contains(&taken));
    }

    #[test]
    fn test_clearing_a_shortcut() {
        let (platform, mut registry, _, mut store, mut profiles) = setup();
        let notes = profiles[0].id.clone();
        registry
            .apply_edit(&mut store, &mut profiles, &notes, None)
            .unwrap();
        assert_eq!(profiles[0].hot_key, None);
        assert_eq!(platform.world.borrow().registered.len(), 1);
    }

    #[test]
    fn test_edit_unknown_profile() {
        let (_, mut registry, _, mut store, mut profiles) = setup();
        let result = registry.apply_edit(&mut store, &mut profiles, &ProfileId::from("nope"), None);
        assert!(matches!(result, Err(HotkeyError::UnknownProfile(_))));
    }
}
