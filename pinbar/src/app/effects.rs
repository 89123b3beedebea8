use std::time::Instant;

use crate::core::{ProfileId, Runtime};
use crate::effect::{Effect, Job};

use super::context::Services;
use super::scheduler::Scheduler;

/// Main-loop state an effect list may touch besides the runtime itself.
pub struct EffectTarget<'a, W> {
    pub services: &'a Services<W>,
    pub scheduler: &'a mut Scheduler,
    /// Set once the accessibility prompt has been shown this session.
    pub trust_prompted: &'a mut bool,
}

/// Execute side effects produced by `profile_id`'s controller, in order.
pub fn execute_effects<W>(
    profile_id: &ProfileId,
    effects: Vec<Effect<W>>,
    runtime: &mut Runtime<W>,
    target: EffectTarget<'_, W>,
) where
    W: Clone + PartialEq + std::fmt::Debug,
{
    let services = target.services;
    for effect in effects {
        match effect {
            Effect::Hide { pid } => services.manipulator.hide(pid),
            Effect::Unhide { pid } => services.manipulator.unhide(pid),
            Effect::Activate { pid } => services.manipulator.activate(pid),
            Effect::SetFrame { window, frame } => {
                services.manipulator.set_position(&window, frame.origin());
                services.manipulator.set_size(&window, frame.size());
            }
            Effect::SetPosition { window, origin } => {
                services.manipulator.set_position(&window, origin);
            }
            Effect::Submit { ticket, job } => services.jobs.submit(Job {
                profile_id: profile_id.clone(),
                ticket,
                kind: job,
            }),
            Effect::Schedule { delay, timer } => {
                target
                    .scheduler
                    .schedule(Instant::now(), delay, profile_id.clone(), timer);
            }
            Effect::Observe { window, pid } => {
                runtime.observe(services.observer.as_ref(), window, pid);
            }
            Effect::SetAnchorVisual(visual) => runtime.set_anchor_visual(&visual),
            Effect::RequestTrust => {
                if !*target.trust_prompted {
                    *target.trust_prompted = true;
                    services.manipulator.request_trust();
                }
            }
            Effect::Alert(alert) => services.notifier.alert(&alert),
        }
    }
}
