use std::time::Duration;

use crate::core::{AnchorVisual, Point, ProfileId, Rect};
use crate::error::LaunchError;

/// Side effect requested by a placement controller. Executed on the main loop against the
/// platform traits, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<W> {
    Hide {
        pid: i32,
    },
    Unhide {
        pid: i32,
    },
    Activate {
        pid: i32,
    },
    /// Position and size, in window-system coordinates.
    SetFrame {
        window: W,
        frame: Rect,
    },
    SetPosition {
        window: W,
        origin: Point,
    },
    Submit {
        ticket: u64,
        job: JobKind,
    },
    Schedule {
        delay: Duration,
        timer: Timer,
    },
    Observe {
        window: W,
        pid: i32,
    },
    SetAnchorVisual(AnchorVisual),
    RequestTrust,
    Alert(Alert),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Verify { ticket: u64 },
    Replace { ticket: u64 },
    IndicatorTick { run: u64 },
}

/// Blocking work handed to the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Open the application, wait for its process, then wait for a window.
    Launch { path: String, bundle_id: String },
    /// Wait for a window of an already running process.
    Acquire { pid: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub profile_id: ProfileId,
    pub ticket: u64,
    pub kind: JobKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<W> {
    /// Polling finished. `window` is `None` when the attempts ran out.
    Acquired { pid: Option<i32>, window: Option<W> },
    LaunchFailed(LaunchError),
}

/// User-visible, non-fatal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    LaunchFailed { app: String, reason: String },
    NoWindow { app: String },
    HotkeyRejected { shortcut: String, app: String },
    RegistrationFailed { apps: Vec<String> },
}

impl Alert {
    pub fn title(&self) -> String {
        match self {
            Alert::LaunchFailed { app, .. } => format!("Could not launch {}", app),
            Alert::NoWindow { app } => format!("No window found for {}", app),
            Alert::HotkeyRejected { shortcut, .. } => format!("Could not register {}", shortcut),
            Alert::RegistrationFailed { .. } => "Some shortcuts could not be registered".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Alert::LaunchFailed { reason, .. } => reason.clone(),
            Alert::NoWindow { app } => format!(
                "{} is running but has no window that can be placed. Open a window and try again.",
                app
            ),
            Alert::HotkeyRejected { app, .. } => format!(
                "The shortcut for {} is probably in use by another application. The previous shortcut was kept.",
                app
            ),
            Alert::RegistrationFailed { apps } => {
                format!("Shortcuts for {} are unavailable.", apps.join(", "))
            }
        }
    }
}
