use std::path::Path;
use std::time::Instant;

use crate::core::{
    reconcile, Config, HotKeySetting, HotkeyRegistry, PinProfile, PlacementInput, ProfileId,
    ProfileStore, Runtimes, Size,
};
use crate::effect::{Alert, Effect};
use crate::error::{HotkeyError, ProfileError};
use crate::event::Event;
use crate::platform::{
    AnchorFactory, AppResolver, JobQueue, Notifier, ResizeObserver, WindowManipulator,
    WindowSystem,
};

use super::effects::{execute_effects, EffectTarget};
use super::scheduler::Scheduler;

/// Platform collaborators used from the main loop.
pub struct Services<W> {
    pub window_system: Box<dyn WindowSystem<Window = W>>,
    pub manipulator: Box<dyn WindowManipulator<Window = W>>,
    pub observer: Box<dyn ResizeObserver<Window = W>>,
    pub resolver: Box<dyn AppResolver>,
    pub anchors: Box<dyn AnchorFactory>,
    pub notifier: Box<dyn Notifier>,
    pub jobs: Box<dyn JobQueue>,
}

/// Owns the profile list, the per-profile runtimes and the hotkey registry. All mutation
/// happens on the main loop.
pub struct AppContext<W> {
    config: Config,
    services: Services<W>,
    store: ProfileStore,
    profiles: Vec<PinProfile>,
    runtimes: Runtimes<W>,
    hotkeys: HotkeyRegistry,
    scheduler: Scheduler,
    trust_prompted: bool,
}

impl<W: Clone + PartialEq + std::fmt::Debug> AppContext<W> {
    pub fn new(
        config: Config,
        services: Services<W>,
        store: ProfileStore,
        hotkeys: HotkeyRegistry,
    ) -> Self {
        Self {
            config,
            services,
            store,
            profiles: Vec::new(),
            runtimes: Runtimes::new(),
            hotkeys,
            scheduler: Scheduler::new(),
            trust_prompted: false,
        }
    }

    /// Load stored profiles, build their runtimes and register their shortcuts.
    pub fn load(&mut self) {
        if !self.services.window_system.is_trusted() {
            tracing::warn!("Accessibility permission not granted, requesting...");
            self.prompt_for_trust();
        }

        self.profiles = self.store.load_profiles(self.services.resolver.as_ref());
        tracing::info!("Loaded {} profiles", self.profiles.len());
        self.reconcile_runtimes();

        let failed = self.hotkeys.register_all(&self.profiles);
        if !failed.is_empty() {
            let apps = self
                .profiles
                .iter()
                .filter(|p| failed.contains(&p.id))
                .map(|p| p.display_name.clone())
                .collect();
            self.services
                .notifier
                .alert(&Alert::RegistrationFailed { apps });
        }
    }

    pub fn profiles(&self) -> &[PinProfile] {
        &self.profiles
    }

    /// Match a user-supplied reference against profile ids (any case) and bundle ids.
    pub fn find_profile(&self, key: &str) -> Option<ProfileId> {
        self.profiles
            .iter()
            .find(|p| p.id.as_str().eq_ignore_ascii_case(key) || p.bundle_id == key)
            .map(|p| p.id.clone())
    }

    pub fn add(&mut self, app_path: &Path) -> Result<ProfileId, ProfileError> {
        let app = self
            .services
            .resolver
            .resolve_path(app_path)
            .ok_or_else(|| ProfileError::Unresolvable(app_path.display().to_string()))?;

        if let Some(existing) = self.profiles.iter().find(|p| p.bundle_id == app.bundle_id) {
            return Err(ProfileError::Duplicate {
                bundle_id: existing.bundle_id.clone(),
                display_name: existing.display_name.clone(),
            });
        }

        let profile = PinProfile::new(&app);
        let id = profile.id.clone();
        self.profiles.push(profile);
        if let Err(e) = self.store.save_profiles(&self.profiles) {
            self.profiles.pop();
            return Err(e.into());
        }

        tracing::info!("Added profile {} for {}", id, app.bundle_id);
        self.reconcile_runtimes();
        self.register_hotkeys();
        Ok(id)
    }

    pub fn remove(&mut self, profile_id: &ProfileId) -> Result<(), ProfileError> {
        let index = self.index_of(profile_id)?;
        let removed = self.profiles.remove(index);
        if let Err(e) = self.store.save_profiles(&self.profiles) {
            self.profiles.insert(index, removed);
            return Err(e.into());
        }

        tracing::info!("Removed profile {} ({})", profile_id, removed.bundle_id);
        self.reconcile_runtimes();
        self.register_hotkeys();
        Ok(())
    }

    pub fn set_icon(
        &mut self,
        profile_id: &ProfileId,
        use_app_icon: bool,
        use_template_icon: bool,
    ) -> Result<(), ProfileError> {
        let index = self.index_of(profile_id)?;
        let previous = self.profiles[index].clone();
        self.profiles[index].use_app_icon = use_app_icon;
        self.profiles[index].use_template_icon = use_template_icon;
        if let Err(e) = self.store.save_profiles(&self.profiles) {
            self.profiles[index] = previous;
            return Err(e.into());
        }
        self.reconcile_runtimes();
        Ok(())
    }

    /// Set or clear a shortcut. A shortcut the OS refuses is rolled back and reported.
    pub fn set_hotkey(
        &mut self,
        profile_id: &ProfileId,
        setting: Option<HotKeySetting>,
    ) -> Result<(), HotkeyError> {
        let result =
            self.hotkeys
                .apply_edit(&mut self.store, &mut self.profiles, profile_id, setting);

        match &result {
            Ok(()) => self.reconcile_runtimes(),
            Err(HotkeyError::Rejected { shortcut }) => {
                let app = self
                    .profiles
                    .iter()
                    .find(|p| p.id == *profile_id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_default();
                self.services.notifier.alert(&Alert::HotkeyRejected {
                    shortcut: shortcut.clone(),
                    app,
                });
            }
            Err(e) => tracing::info!("Shortcut edit for {} refused: {}", profile_id, e),
        }
        result
    }

    /// Forget the remembered window size so the next placement uses the default.
    pub fn reset_window_size(&mut self, profile_id: &ProfileId) -> Result<(), ProfileError> {
        let index = self.index_of(profile_id)?;
        let bundle_id = self.profiles[index].bundle_id.clone();
        self.store.reset_window_size(&bundle_id)?;
        tracing::info!("Reset window size for {}", bundle_id);
        Ok(())
    }

    pub fn toggle(&mut self, profile_id: &ProfileId) -> Result<(), ProfileError> {
        let input = self
            .input_for(profile_id)
            .ok_or_else(|| ProfileError::UnknownProfile(profile_id.clone()))?;
        let effects = match self.runtimes.get_mut(profile_id) {
            Some(runtime) => runtime
                .controller_mut()
                .toggle(self.services.window_system.as_ref(), &input),
            None => return Err(ProfileError::UnknownProfile(profile_id.clone())),
        };
        self.execute(profile_id, effects);
        Ok(())
    }

    pub fn dispatch_hotkey(&mut self, id: u32) {
        let Some(profile_id) = self.hotkeys.dispatch(id).cloned() else {
            return;
        };
        tracing::debug!("Hotkey {} -> {}", id, profile_id);
        if let Err(e) = self.toggle(&profile_id) {
            tracing::warn!("Hotkey toggle failed: {}", e);
        }
    }

    pub fn handle_event(&mut self, event: Event<W>) {
        match event {
            Event::JobFinished {
                profile_id,
                ticket,
                outcome,
            } => {
                let Some(input) = self.input_for(&profile_id) else {
                    tracing::debug!("Dropping job result for removed profile {}", profile_id);
                    return;
                };
                let effects = match self.runtimes.get_mut(&profile_id) {
                    Some(runtime) => runtime.controller_mut().on_job_finished(
                        self.services.window_system.as_ref(),
                        ticket,
                        outcome,
                        &input,
                    ),
                    None => return,
                };
                self.execute(&profile_id, effects);
            }
            Event::WindowResized { profile_id } => self.remember_size(&profile_id),
            Event::HotkeyPressed { id } => self.dispatch_hotkey(id),
            Event::AnchorClicked { profile_id } => {
                if let Err(e) = self.toggle(&profile_id) {
                    tracing::warn!("Anchor toggle failed: {}", e);
                }
            }
        }
    }

    /// Run every timer due at `now`.
    pub fn fire_timers(&mut self, now: Instant) {
        for (profile_id, timer) in self.scheduler.take_due(now) {
            let Some(input) = self.input_for(&profile_id) else {
                continue;
            };
            let effects = match self.runtimes.get_mut(&profile_id) {
                Some(runtime) => runtime.controller_mut().on_timer(
                    self.services.window_system.as_ref(),
                    timer,
                    &input,
                ),
                None => continue,
            };
            self.execute(&profile_id, effects);
        }
    }

    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down {} runtimes", self.runtimes.len());
        self.hotkeys.unregister_all();
        for runtime in self.runtimes.values_mut() {
            runtime.teardown();
        }
        self.runtimes.clear();
        self.scheduler.clear();
    }

    fn remember_size(&mut self, profile_id: &ProfileId) {
        let Some(runtime) = self.runtimes.get(profile_id) else {
            return;
        };
        let Some(window) = runtime.observed_window() else {
            return;
        };
        let Some(frame) = self.services.window_system.frame(window) else {
            tracing::debug!("Resized window of {} has no readable frame", profile_id);
            return;
        };
        if frame.width <= 0.0 || frame.height <= 0.0 {
            return;
        }

        let bundle_id = runtime.profile().bundle_id.clone();
        let size = Size::new(frame.width, frame.height);
        tracing::debug!("Remembering {}x{} for {}", size.width, size.height, bundle_id);
        if let Err(e) = self.store.set_window_size(&bundle_id, size) {
            tracing::warn!("Failed to store window size for {}: {}", bundle_id, e);
        }
    }

    fn input_for(&self, profile_id: &ProfileId) -> Option<PlacementInput> {
        let runtime = self.runtimes.get(profile_id)?;
        let size = self
            .store
            .window_size(&runtime.profile().bundle_id)
            .unwrap_or(self.config.default_size);
        Some(runtime.input(size))
    }

    fn execute(&mut self, profile_id: &ProfileId, effects: Vec<Effect<W>>) {
        if effects.is_empty() {
            return;
        }
        let Some(runtime) = self.runtimes.get_mut(profile_id) else {
            return;
        };
        execute_effects(
            profile_id,
            effects,
            runtime,
            EffectTarget {
                services: &self.services,
                scheduler: &mut self.scheduler,
                trust_prompted: &mut self.trust_prompted,
            },
        );
    }

    fn prompt_for_trust(&mut self) {
        if !self.trust_prompted {
            self.trust_prompted = true;
            self.services.manipulator.request_trust();
        }
    }

    fn reconcile_runtimes(&mut self) {
        let removed = reconcile(
            &mut self.runtimes,
            &self.profiles,
            self.services.anchors.as_ref(),
            &self.config,
        );
        for profile_id in &removed {
            self.scheduler.cancel(profile_id);
        }
    }

    fn register_hotkeys(&mut self) {
        let failed = self.hotkeys.register_all(&self.profiles);
        if !failed.is_empty() {
            tracing::warn!("{} shortcuts could not be registered", failed.len());
        }
    }

    fn index_of(&self, profile_id: &ProfileId) -> Result<usize, ProfileError> {
        self.profiles
            .iter()
            .position(|p| p.id == *profile_id)
            .ok_or_else(|| ProfileError::UnknownProfile(profile_id.clone()))
    }
}
