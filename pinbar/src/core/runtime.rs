use std::collections::{HashMap, HashSet};

use super::{
    AnchorVisual, Config, PinProfile, PlacementController, PlacementInput, ProfileId, Rect, Size,
};
use crate::platform::{Anchor, AnchorFactory, ResizeObserver, ResizeSubscription};

/// Live resize observation. The subscription is released when this is dropped.
#[derive(Debug)]
struct Observation<W> {
    window: W,
    pid: i32,
    _subscription: ResizeSubscription,
}

/// Everything that exists for one profile while it is configured.
pub struct Runtime<W> {
    anchor: Box<dyn Anchor>,
    controller: PlacementController<W>,
    observation: Option<Observation<W>>,
}

pub type Runtimes<W> = HashMap<ProfileId, Runtime<W>>;

impl<W: Clone + PartialEq + std::fmt::Debug> Runtime<W> {
    pub fn new(profile: PinProfile, anchor: Box<dyn Anchor>, config: Config) -> Self {
        let mut runtime = Self {
            anchor,
            controller: PlacementController::new(profile, config),
            observation: None,
        };
        runtime.refresh_visual();
        runtime
    }

    pub fn profile(&self) -> &PinProfile {
        self.controller.profile()
    }

    pub fn controller(&self) -> &PlacementController<W> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlacementController<W> {
        &mut self.controller
    }

    pub fn anchor_frame(&self) -> Option<Rect> {
        self.anchor.frame()
    }

    pub fn set_anchor_visual(&mut self, visual: &AnchorVisual) {
        self.anchor.set_visual(visual);
    }

    /// Snapshot of what the controller needs for one call.
    pub fn input(&self, window_size: Size) -> PlacementInput {
        PlacementInput {
            anchor_frame: self.anchor.frame(),
            anchor_visual: self.anchor.visual(),
            window_size,
        }
    }

    /// Show the profile's icon or title. While launching, the new visual is applied once the
    /// indicator finishes instead.
    pub fn refresh_visual(&mut self) {
        let visual = AnchorVisual::for_profile(self.controller.profile());
        if self.controller.is_launching() {
            self.controller.update_saved_visual(visual);
        } else {
            self.anchor.set_visual(&visual);
        }
    }

    pub fn update_profile(&mut self, profile: PinProfile) {
        self.controller.set_profile(profile);
        self.refresh_visual();
    }

    /// Start observing `window` for resizes. A repeated call for the same window and process
    /// keeps the existing subscription; anything else releases it first.
    pub fn observe<O>(&mut self, observer: &O, window: W, pid: i32)
    where
        O: ResizeObserver<Window = W> + ?Sized,
    {
        if let Some(current) = &self.observation {
            if current.window == window && current.pid == pid {
                return;
            }
        }
        self.observation = None;

        let profile_id = self.controller.profile().id.clone();
        self.observation = observer
            .subscribe(&profile_id, pid, &window)
            .map(|subscription| Observation {
                window,
                pid,
                _subscription: subscription,
            });
    }

    pub fn observed_window(&self) -> Option<&W> {
        self.observation.as_ref().map(|o| &o.window)
    }

    pub fn teardown(&mut self) {
        self.controller.teardown();
        self.observation = None;
    }
}

/// Bring `runtimes` in line with `desired`. Runtimes that are no longer wanted are torn down
/// before anything is updated or created. Returns the ids that were removed.
pub fn reconcile<W>(
    runtimes: &mut Runtimes<W>,
    desired: &[PinProfile],
    factory: &dyn AnchorFactory,
    config: &Config,
) -> Vec<ProfileId>
where
    W: Clone + PartialEq + std::fmt::Debug,
{
    let wanted: HashSet<&ProfileId> = desired.iter().map(|p| &p.id).collect();
    let stale: Vec<ProfileId> = runtimes
        .keys()
        .filter(|id| !wanted.contains(id))
        .cloned()
        .collect();

    for id in &stale {
        if let Some(mut runtime) = runtimes.remove(id) {
            tracing::info!("Removing runtime for {}", runtime.profile().display_name);
            runtime.teardown();
        }
    }

    for profile in desired {
        match runtimes.get_mut(&profile.id) {
            Some(runtime) => runtime.update_profile(profile.clone()),
            None => {
                tracing::info!("Creating runtime for {}", profile.display_name);
                let anchor = factory.create(profile);
                runtimes.insert(
                    profile.id.clone(),
                    Runtime::new(profile.clone(), anchor, *config),
                );
            }
        }
    }

    stale
}
