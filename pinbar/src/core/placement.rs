//! Per-profile toggle state machine.
//!
//! The controller never touches the system directly. It reads through [`WindowSystem`] and
//! answers every input with a list of [`Effect`]s that the main loop executes in order. Blocking
//! work (opening the app, polling for a window) is requested as a job and comes back tagged with
//! the ticket that was current when it was submitted; results for any other ticket are ignored.

use super::acquire::{acquire_window, has_any_window};
use super::geometry::compute_placement;
use super::{AnchorVisual, Config, LaunchingIndicator, PinProfile, Rect, Size};
use crate::effect::{Alert, Effect, JobKind, JobOutcome, Timer};
use crate::platform::{RunningApp, WindowSystem};

/// Inputs gathered by the owner at the time of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementInput {
    /// Anchor frame in Cocoa coordinates.
    pub anchor_frame: Option<Rect>,
    pub anchor_visual: AnchorVisual,
    /// Remembered size for the profile's bundle, or the default.
    pub window_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Launching { reopened: bool },
    Acquiring { pid: i32, reopened: bool },
}

#[derive(Debug, Clone)]
struct Placed<W> {
    window: W,
    frame: Rect,
}

pub struct PlacementController<W> {
    profile: PinProfile,
    config: Config,
    phase: Phase,
    ticket: u64,
    placed: Option<Placed<W>>,
    indicator: LaunchingIndicator,
    /// Bumped whenever the indicator starts or stops so ticks from an earlier run die out.
    indicator_run: u64,
}

impl<W: Clone + PartialEq + std::fmt::Debug> PlacementController<W> {
    pub fn new(profile: PinProfile, config: Config) -> Self {
        Self {
            profile,
            config,
            phase: Phase::Idle,
            ticket: 0,
            placed: None,
            indicator: LaunchingIndicator::new(),
            indicator_run: 0,
        }
    }

    pub fn profile(&self) -> &PinProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: PinProfile) {
        self.profile = profile;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_launching(&self) -> bool {
        self.indicator.is_active()
    }

    /// Visual to show once the launching indicator finishes.
    pub fn update_saved_visual(&mut self, visual: AnchorVisual) {
        self.indicator.update_saved(visual);
    }

    /// Hide the app when it is frontmost and visible with a window, otherwise bring its window
    /// under the anchor. Dropped while a launch or acquisition is in flight.
    pub fn toggle<S>(&mut self, ws: &S, input: &PlacementInput) -> Vec<Effect<W>>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        if self.phase != Phase::Idle {
            tracing::debug!(
                "Toggle for {} dropped while {:?}",
                self.profile.display_name,
                self.phase
            );
            return vec![];
        }

        if !ws.is_trusted() {
            tracing::warn!(
                "Accessibility permission missing, not placing {}",
                self.profile.display_name
            );
            return vec![Effect::RequestTrust];
        }

        match ws.find_running(&self.profile.bundle_id) {
            Some(app) if !app.hidden && app.frontmost && has_any_window(ws, app.pid) => {
                tracing::info!("Hiding {} (pid {})", self.profile.display_name, app.pid);
                self.placed = None;
                vec![Effect::Hide { pid: app.pid }]
            }
            Some(app) => self.bring_forward(ws, app, input),
            None => {
                tracing::info!("Launching {}", self.profile.display_name);
                let job = self.launch_job();
                self.start(job, Phase::Launching { reopened: false }, input)
            }
        }
    }

    fn bring_forward<S>(&mut self, ws: &S, app: RunningApp, input: &PlacementInput) -> Vec<Effect<W>>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        tracing::info!(
            "Bringing {} forward (pid {}, hidden={})",
            self.profile.display_name,
            app.pid,
            app.hidden
        );
        let mut effects = Vec::new();

        // Move an existing window before it becomes visible so it does not jump.
        if let Some(window) = acquire_window(ws, app.pid) {
            if let Some(frame) = self.target_frame(ws, input) {
                effects.push(Effect::SetFrame { window, frame });
            }
        }
        effects.push(Effect::Unhide { pid: app.pid });
        effects.push(Effect::Activate { pid: app.pid });
        effects.extend(self.start(
            JobKind::Acquire { pid: app.pid },
            Phase::Acquiring {
                pid: app.pid,
                reopened: false,
            },
            input,
        ));
        effects
    }

    fn start(&mut self, job: JobKind, phase: Phase, input: &PlacementInput) -> Vec<Effect<W>> {
        self.ticket += 1;
        self.phase = phase;
        self.placed = None;

        let mut effects = Vec::new();
        if let Some(frame) = self.indicator.begin(input.anchor_visual.clone()) {
            self.indicator_run += 1;
            effects.push(Effect::SetAnchorVisual(frame));
            effects.push(Effect::Schedule {
                delay: self.config.indicator_interval,
                timer: Timer::IndicatorTick {
                    run: self.indicator_run,
                },
            });
        }
        effects.push(Effect::Submit {
            ticket: self.ticket,
            job,
        });
        effects
    }

    fn launch_job(&self) -> JobKind {
        JobKind::Launch {
            path: self.profile.app_path.clone(),
            bundle_id: self.profile.bundle_id.clone(),
        }
    }

    pub fn on_job_finished<S>(
        &mut self,
        ws: &S,
        ticket: u64,
        outcome: JobOutcome<W>,
        input: &PlacementInput,
    ) -> Vec<Effect<W>>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        if ticket != self.ticket {
            tracing::debug!(
                "Ignoring stale result for {} (ticket {} != {})",
                self.profile.display_name,
                ticket,
                self.ticket
            );
            return vec![];
        }
        let reopened = match self.phase {
            Phase::Idle => return vec![],
            Phase::Launching { reopened } | Phase::Acquiring { reopened, .. } => reopened,
        };

        match outcome {
            JobOutcome::LaunchFailed(e) => {
                tracing::warn!("Launch of {} failed: {}", self.profile.display_name, e);
                self.finish_with(Alert::LaunchFailed {
                    app: self.profile.display_name.clone(),
                    reason: e.to_string(),
                })
            }
            JobOutcome::Acquired {
                pid: Some(pid),
                window: Some(window),
            } => self.place(ws, pid, window, input),
            JobOutcome::Acquired { .. } if !reopened => {
                tracing::info!(
                    "No window for {}, asking the app to reopen",
                    self.profile.display_name
                );
                let job = self.launch_job();
                self.start(job, Phase::Launching { reopened: true }, input)
            }
            JobOutcome::Acquired { .. } => {
                tracing::warn!("No window found for {}", self.profile.display_name);
                self.finish_with(Alert::NoWindow {
                    app: self.profile.display_name.clone(),
                })
            }
        }
    }

    fn place<S>(&mut self, ws: &S, pid: i32, window: W, input: &PlacementInput) -> Vec<Effect<W>>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        self.phase = Phase::Idle;
        let mut effects = self.end_indicator();

        match self.target_frame(ws, input) {
            Some(frame) => {
                tracing::info!(
                    "Placing {} at ({}, {}) {}x{}",
                    self.profile.display_name,
                    frame.x,
                    frame.y,
                    frame.width,
                    frame.height
                );
                effects.push(Effect::SetFrame {
                    window: window.clone(),
                    frame,
                });
                self.placed = Some(Placed {
                    window: window.clone(),
                    frame,
                });
            }
            None => tracing::warn!("No screens, leaving {} where it is", self.profile.display_name),
        }

        effects.push(Effect::Activate { pid });
        if self.placed.is_some() {
            effects.push(Effect::Schedule {
                delay: self.config.verify_delay,
                timer: Timer::Verify {
                    ticket: self.ticket,
                },
            });
            effects.push(Effect::Schedule {
                delay: self.config.replace_delay,
                timer: Timer::Replace {
                    ticket: self.ticket,
                },
            });
        }
        effects.push(Effect::Observe { window, pid });
        effects
    }

    pub fn on_timer<S>(&mut self, ws: &S, timer: Timer, input: &PlacementInput) -> Vec<Effect<W>>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        match timer {
            Timer::IndicatorTick { run } if run == self.indicator_run => {
                match self.indicator.tick() {
                    Some(frame) => vec![
                        Effect::SetAnchorVisual(frame),
                        Effect::Schedule {
                            delay: self.config.indicator_interval,
                            timer: Timer::IndicatorTick { run },
                        },
                    ],
                    None => vec![],
                }
            }
            Timer::Verify { ticket } if ticket == self.ticket => {
                let Some(placed) = &self.placed else {
                    return vec![];
                };
                let Some(current) = ws.frame(&placed.window) else {
                    return vec![];
                };
                let target = placed.frame.origin();
                if current
                    .origin()
                    .is_near(&target, self.config.drift_tolerance)
                {
                    return vec![];
                }
                tracing::debug!(
                    "{} drifted to ({}, {}), re-applying position",
                    self.profile.display_name,
                    current.x,
                    current.y
                );
                vec![Effect::SetPosition {
                    window: placed.window.clone(),
                    origin: target,
                }]
            }
            Timer::Replace { ticket } if ticket == self.ticket => {
                let frame = self.target_frame(ws, input);
                let Some(placed) = &mut self.placed else {
                    return vec![];
                };
                if let Some(frame) = frame {
                    placed.frame = frame;
                }
                vec![Effect::SetFrame {
                    window: placed.window.clone(),
                    frame: placed.frame,
                }]
            }
            Timer::IndicatorTick { .. } | Timer::Verify { .. } | Timer::Replace { .. } => vec![],
        }
    }

    /// Forget everything in flight. Later results and timers become no-ops.
    pub fn teardown(&mut self) {
        self.ticket += 1;
        self.phase = Phase::Idle;
        self.placed = None;
        self.indicator = LaunchingIndicator::new();
        self.indicator_run += 1;
    }

    fn finish_with(&mut self, alert: Alert) -> Vec<Effect<W>> {
        self.phase = Phase::Idle;
        let mut effects = self.end_indicator();
        effects.push(Effect::Alert(alert));
        effects
    }

    fn end_indicator(&mut self) -> Vec<Effect<W>> {
        self.indicator_run += 1;
        self.indicator
            .end(&self.profile.display_name)
            .map(Effect::SetAnchorVisual)
            .into_iter()
            .collect()
    }

    fn target_frame<S>(&self, ws: &S, input: &PlacementInput) -> Option<Rect>
    where
        S: WindowSystem<Window = W> + ?Sized,
    {
        compute_placement(
            input.anchor_frame,
            input.window_size,
            ws.pointer_location(),
            &ws.screens(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::{AnchorIcon, Point};
    use crate::error::LaunchError;
    use crate::platform::mock::{create_test_window, target, MockApp, MockPlatform, MockWindow};

    fn controller() -> PlacementController<MockWindow> {
        PlacementController::new(
            PinProfile::new(&target("Notes", "com.apple.Notes")),
            Config::default(),
        )
    }

    fn input() -> PlacementInput {
        PlacementInput {
            anchor_frame: Some(Rect::new(700.0, 875.0, 40.0, 25.0)),
            anchor_visual: AnchorVisual {
                title: None,
                icon: Some(AnchorIcon {
                    app_path: "/Applications/Notes.app".to_string(),
                    template: false,
                }),
            },
            window_size: Size::new(600.0, 400.0),
        }
    }

    /// Frame for `input()` on the mock laptop screen, in window-system coordinates.
    fn expected_frame() -> Rect {
        Rect::new(420.0, 33.0, 600.0, 400.0)
    }

    fn submitted(effects: &[Effect<MockWindow>]) -> Option<(u64, JobKind)> {
        effects.iter().find_map(|e| match e {
            Effect::Submit { ticket, job } => Some((*ticket, job.clone())),
            _ => None,
        })
    }

    #[test]
    fn test_toggle_not_running_launches() {
        let ws = MockPlatform::new();
        let mut c = controller();
        let effects = c.toggle(&ws, &input());

        assert_eq!(
            effects,
            vec![
                Effect::SetAnchorVisual(AnchorVisual::text("•")),
                Effect::Schedule {
                    delay: Duration::from_millis(400),
                    timer: Timer::IndicatorTick { run: 1 },
                },
                Effect::Submit {
                    ticket: 1,
                    job: JobKind::Launch {
                        path: "/Applications/Notes.app".to_string(),
                        bundle_id: "com.apple.Notes".to_string(),
                    },
                },
            ]
        );
        assert_eq!(c.phase(), Phase::Launching { reopened: false });
    }

    #[test]
    fn test_toggle_frontmost_with_window_hides() {
        let ws = MockPlatform::new().with_app(
            MockApp::new(7, "com.apple.Notes")
                .with_window(create_test_window(1, 0.0, 0.0, 600.0, 400.0))
                .frontmost(),
        );
        let mut c = controller();
        assert_eq!(c.toggle(&ws, &input()), vec![Effect::Hide { pid: 7 }]);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_toggle_visible_but_not_frontmost_brings_forward() {
        let ws = MockPlatform::new().with_app(
            MockApp::new(7, "com.apple.Notes")
                .with_window(create_test_window(1, 0.0, 0.0, 600.0, 400.0))
                .with_focused(1),
        );
        let mut c = controller();
        let effects = c.toggle(&ws, &input());

        assert_eq!(
            effects[..3],
            [
                Effect::SetFrame {
                    window: MockWindow(1),
                    frame: expected_frame(),
                },
                Effect::Unhide { pid: 7 },
                Effect::Activate { pid: 7 },
            ]
        );
        assert_eq!(submitted(&effects), Some((1, JobKind::Acquire { pid: 7 })));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Hide { .. })));
    }

    #[test]
    fn test_toggle_frontmost_without_windows_brings_forward() {
        let ws = MockPlatform::new().with_app(MockApp::new(7, "com.apple.Notes").frontmost());
        let mut c = controller();
        let effects = c.toggle(&ws, &input());
        assert_eq!(effects[0], Effect::Unhide { pid: 7 });
        assert_eq!(submitted(&effects), Some((1, JobKind::Acquire { pid: 7 })));
    }

    #[test]
    fn test_toggle_hidden_frontmost_unhides() {
        let ws = MockPlatform::new().with_app(
            MockApp::new(7, "com.apple.Notes")
                .with_window(create_test_window(1, 0.0, 0.0, 600.0, 400.0))
                .frontmost()
                .hidden(),
        );
        let mut c = controller();
        let effects = c.toggle(&ws, &input());
        assert!(effects.contains(&Effect::Unhide { pid: 7 }));
        assert!(!effects.contains(&Effect::Hide { pid: 7 }));
    }

    #[test]
    fn test_toggle_while_in_flight_is_dropped() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        assert!(c.toggle(&ws, &input()).is_empty());
        assert_eq!(c.ticket(), 1);
    }

    #[test]
    fn test_toggle_without_trust_requests_it() {
        let ws = MockPlatform::new();
        ws.world.borrow_mut().untrusted = true;
        let mut c = controller();
        assert_eq!(c.toggle(&ws, &input()), vec![Effect::RequestTrust]);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_acquired_window_is_placed_and_observed() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());

        let effects = c.on_job_finished(
            &ws,
            1,
            JobOutcome::Acquired {
                pid: Some(7),
                window: Some(MockWindow(3)),
            },
            &input(),
        );
        assert_eq!(
            effects,
            vec![
                Effect::SetAnchorVisual(input().anchor_visual),
                Effect::SetFrame {
                    window: MockWindow(3),
                    frame: expected_frame(),
                },
                Effect::Activate { pid: 7 },
                Effect::Schedule {
                    delay: Duration::from_millis(200),
                    timer: Timer::Verify { ticket: 1 },
                },
                Effect::Schedule {
                    delay: Duration::from_millis(350),
                    timer: Timer::Replace { ticket: 1 },
                },
                Effect::Observe {
                    window: MockWindow(3),
                    pid: 7,
                },
            ]
        );
        assert_eq!(c.phase(), Phase::Idle);
        assert!(!c.is_launching());
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        let outcome = JobOutcome::Acquired {
            pid: Some(7),
            window: Some(MockWindow(3)),
        };
        assert!(c.on_job_finished(&ws, 0, outcome.clone(), &input()).is_empty());
        c.teardown();
        assert!(c.on_job_finished(&ws, 1, outcome, &input()).is_empty());
    }

    #[test]
    fn test_no_window_reopens_once_then_alerts() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        let none = JobOutcome::Acquired {
            pid: Some(7),
            window: None,
        };

        let effects = c.on_job_finished(&ws, 1, none.clone(), &input());
        // The indicator keeps running, so only the new job is submitted.
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            submitted(&effects),
            Some((2, JobKind::Launch { .. }))
        ));
        assert_eq!(c.phase(), Phase::Launching { reopened: true });

        let effects = c.on_job_finished(&ws, 2, none, &input());
        assert_eq!(
            effects,
            vec![
                Effect::SetAnchorVisual(input().anchor_visual),
                Effect::Alert(Alert::NoWindow {
                    app: "Notes".to_string()
                }),
            ]
        );
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_launch_failure_alerts_and_returns_to_idle() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        let effects = c.on_job_finished(
            &ws,
            1,
            JobOutcome::LaunchFailed(LaunchError {
                path: "/Applications/Notes.app".to_string(),
                reason: "gone".to_string(),
            }),
            &input(),
        );
        assert!(matches!(
            effects.last(),
            Some(Effect::Alert(Alert::LaunchFailed { .. }))
        ));
        assert_eq!(c.phase(), Phase::Idle);
        // A new toggle is accepted again.
        assert!(submitted(&c.toggle(&ws, &input())).is_some());
    }

    #[test]
    fn test_verify_reapplies_position_only_on_drift() {
        let ws = MockPlatform::new().with_app(
            MockApp::new(7, "com.apple.Notes").with_window(create_test_window(3, 0.0, 0.0, 1.0, 1.0)),
        );
        let mut c = controller();
        c.toggle(&ws, &input());
        c.on_job_finished(
            &ws,
            1,
            JobOutcome::Acquired {
                pid: Some(7),
                window: Some(MockWindow(3)),
            },
            &input(),
        );
        let ticket = c.ticket();

        // Within tolerance.
        ws.set_window_frame(3, Rect::new(422.0, 31.0, 600.0, 400.0));
        assert!(c
            .on_timer(&ws, Timer::Verify { ticket }, &input())
            .is_empty());

        // Drifted.
        ws.set_window_frame(3, Rect::new(420.0, 40.0, 600.0, 400.0));
        assert_eq!(
            c.on_timer(&ws, Timer::Verify { ticket }, &input()),
            vec![Effect::SetPosition {
                window: MockWindow(3),
                origin: Point::new(420.0, 33.0),
            }]
        );

        // Outdated ticket.
        assert!(c
            .on_timer(&ws, Timer::Verify { ticket: ticket + 1 }, &input())
            .is_empty());
    }

    #[test]
    fn test_replace_reapplies_frame() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        c.on_job_finished(
            &ws,
            1,
            JobOutcome::Acquired {
                pid: Some(7),
                window: Some(MockWindow(3)),
            },
            &input(),
        );
        assert_eq!(
            c.on_timer(&ws, Timer::Replace { ticket: 1 }, &input()),
            vec![Effect::SetFrame {
                window: MockWindow(3),
                frame: expected_frame(),
            }]
        );
    }

    #[test]
    fn test_indicator_ticks_until_finished() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        let tick = Timer::IndicatorTick { run: 1 };
        let effects = c.on_timer(&ws, tick, &input());
        assert_eq!(effects[0], Effect::SetAnchorVisual(AnchorVisual::text("••")));
        c.teardown();
        assert!(c.on_timer(&ws, tick, &input()).is_empty());
    }

    #[test]
    fn test_indicator_tick_from_previous_launch_is_ignored() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        c.on_job_finished(
            &ws,
            1,
            JobOutcome::LaunchFailed(LaunchError {
                path: "/Applications/Notes.app".to_string(),
                reason: "gone".to_string(),
            }),
            &input(),
        );

        let effects = c.toggle(&ws, &input());
        assert!(effects.contains(&Effect::Schedule {
            delay: Duration::from_millis(400),
            timer: Timer::IndicatorTick { run: 3 },
        }));
        assert!(c
            .on_timer(&ws, Timer::IndicatorTick { run: 1 }, &input())
            .is_empty());
        assert_eq!(
            c.on_timer(&ws, Timer::IndicatorTick { run: 3 }, &input())[0],
            Effect::SetAnchorVisual(AnchorVisual::text("••"))
        );
    }

    #[test]
    fn test_reopen_keeps_the_indicator_chain() {
        let ws = MockPlatform::new();
        let mut c = controller();
        c.toggle(&ws, &input());
        c.on_job_finished(
            &ws,
            1,
            JobOutcome::Acquired {
                pid: Some(7),
                window: None,
            },
            &input(),
        );
        let effects = c.on_timer(&ws, Timer::IndicatorTick { run: 1 }, &input());
        assert_eq!(effects[0], Effect::SetAnchorVisual(AnchorVisual::text("••")));
    }

    #[test]
    fn test_no_screens_still_activates_and_observes() {
        let ws = MockPlatform::new();
        ws.world.borrow_mut().screens.clear();
        let mut c = controller();
        c.toggle(&ws, &input());
        let effects = c.on_job_finished(
            &ws,
            1,
            JobOutcome::Acquired {
                pid: Some(7),
                window: Some(MockWindow(3)),
            },
            &input(),
        );
        assert!(!effects.iter().any(|e| matches!(e, Effect::SetFrame { .. })));
        assert!(effects.contains(&Effect::Activate { pid: 7 }));
        assert!(effects.contains(&Effect::Observe {
            window: MockWindow(3),
            pid: 7
        }));
    }
}
