use std::fmt;
use std::path::Path;

use crate::core::{
    AnchorVisual, HotKeySetting, PinProfile, Point, ProfileId, Rect, Screen, Size, TargetApp,
};
use crate::effect::{Alert, Job};
use crate::error::{LaunchError, RegistrationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAttribute {
    Position,
    Size,
}

/// Snapshot of a running target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningApp {
    pub pid: i32,
    pub hidden: bool,
    pub frontmost: bool,
}

/// Trait for querying windows, processes and displays from the system.
/// This abstraction allows mocking in tests.
///
/// Every read may fail; a missing answer is `None` (or `false` for settability).
pub trait WindowSystem {
    type Window: Clone + PartialEq + fmt::Debug;

    /// `None` when the process' window list cannot be read at all.
    fn list_windows(&self, pid: i32) -> Option<Vec<Self::Window>>;
    fn focused_window(&self, pid: i32) -> Option<Self::Window>;
    fn main_window(&self, pid: i32) -> Option<Self::Window>;
    fn is_minimized(&self, window: &Self::Window) -> Option<bool>;
    fn subrole(&self, window: &Self::Window) -> Option<String>;
    fn title(&self, window: &Self::Window) -> Option<String>;
    fn role(&self, window: &Self::Window) -> Option<String>;
    /// Current frame in window-system (top-left origin) coordinates.
    fn frame(&self, window: &Self::Window) -> Option<Rect>;
    fn is_settable(&self, window: &Self::Window, attribute: WindowAttribute) -> bool;

    fn find_running(&self, bundle_id: &str) -> Option<RunningApp>;
    /// Displays in the Cocoa frame, primary first.
    fn screens(&self) -> Vec<Screen>;
    fn pointer_location(&self) -> Point;
    fn is_trusted(&self) -> bool;
}

/// Trait for manipulating windows and processes (side effects).
/// This abstraction allows mocking in tests.
pub trait WindowManipulator {
    type Window;

    fn set_position(&self, window: &Self::Window, origin: Point);
    fn set_size(&self, window: &Self::Window, size: Size);
    fn hide(&self, pid: i32);
    fn unhide(&self, pid: i32);
    fn activate(&self, pid: i32);
    /// Ask the user to grant accessibility access.
    fn request_trust(&self);
}

/// Owned registration of a resize callback. Dropping it stops the notifications and frees the
/// callback context.
pub struct ResizeSubscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl ResizeSubscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ResizeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeSubscription").finish_non_exhaustive()
    }
}

/// Delivers `Event::WindowResized { profile_id }` to the main loop while the subscription lives.
pub trait ResizeObserver {
    type Window;

    fn subscribe(
        &self,
        profile_id: &ProfileId,
        pid: i32,
        window: &Self::Window,
    ) -> Option<ResizeSubscription>;
}

/// Opens applications. Called from the background worker.
pub trait AppLauncher {
    fn open(&self, path: &str) -> Result<(), LaunchError>;
}

/// Looks applications up in the OS application registry.
pub trait AppResolver {
    fn resolve_path(&self, path: &Path) -> Option<TargetApp>;
    fn resolve_bundle_id(&self, bundle_id: &str) -> Option<TargetApp>;
}

/// OS global shortcut layer. Trigger events carry the id passed to `register`.
pub trait ShortcutRegistrar {
    fn register(&mut self, setting: HotKeySetting, id: u32) -> Result<(), RegistrationError>;
    fn unregister(&mut self, id: u32);
}

/// The persistent UI control a window is placed under.
pub trait Anchor {
    /// On-screen frame in Cocoa coordinates, if the control is currently laid out.
    fn frame(&self) -> Option<Rect>;
    fn visual(&self) -> AnchorVisual;
    fn set_visual(&mut self, visual: &AnchorVisual);
}

pub trait AnchorFactory {
    fn create(&self, profile: &PinProfile) -> Box<dyn Anchor>;
}

pub trait Notifier {
    fn alert(&self, alert: &Alert);
}

pub trait JobQueue {
    fn submit(&self, job: Job);
}

#[cfg(target_os = "macos")]
pub use native::*;

#[cfg(target_os = "macos")]
mod native {
    use std::path::Path;
    use std::sync::mpsc as std_mpsc;

    use core_graphics::geometry::{CGPoint, CGSize};
    use objc2_foundation::MainThreadMarker;

    use super::*;
    use crate::event::Event;
    use crate::macos::{self, attr, AXUIElement};

    /// macOS implementation of WindowSystem
    #[derive(Default)]
    pub struct MacOSWindowSystem;

    impl WindowSystem for MacOSWindowSystem {
        type Window = AXUIElement;

        fn list_windows(&self, pid: i32) -> Option<Vec<AXUIElement>> {
            match AXUIElement::application(pid).windows() {
                Ok(windows) => Some(windows),
                Err(e) => {
                    tracing::debug!("Failed to get windows for pid {}: {}", pid, e);
                    None
                }
            }
        }

        fn focused_window(&self, pid: i32) -> Option<AXUIElement> {
            AXUIElement::application(pid).focused_window().ok()
        }

        fn main_window(&self, pid: i32) -> Option<AXUIElement> {
            AXUIElement::application(pid).main_window().ok()
        }

        fn is_minimized(&self, window: &AXUIElement) -> Option<bool> {
            window.is_minimized().ok()
        }

        fn subrole(&self, window: &AXUIElement) -> Option<String> {
            window.subrole().ok()
        }

        fn title(&self, window: &AXUIElement) -> Option<String> {
            window.title().ok()
        }

        fn role(&self, window: &AXUIElement) -> Option<String> {
            window.role().ok()
        }

        fn frame(&self, window: &AXUIElement) -> Option<Rect> {
            let origin = window.position().ok()?;
            let size = window.size().ok()?;
            Some(Rect::new(origin.x, origin.y, size.width, size.height))
        }

        fn is_settable(&self, window: &AXUIElement, attribute: WindowAttribute) -> bool {
            let name = match attribute {
                WindowAttribute::Position => attr::POSITION,
                WindowAttribute::Size => attr::SIZE,
            };
            window.is_attribute_settable(name).unwrap_or(false)
        }

        fn find_running(&self, bundle_id: &str) -> Option<RunningApp> {
            macos::find_running_app(bundle_id)
        }

        fn screens(&self) -> Vec<Screen> {
            match MainThreadMarker::new() {
                Some(mtm) => macos::screens(mtm),
                None => Vec::new(),
            }
        }

        fn pointer_location(&self) -> Point {
            macos::pointer_location()
        }

        fn is_trusted(&self) -> bool {
            macos::is_trusted()
        }
    }

    /// macOS implementation of WindowManipulator
    #[derive(Default)]
    pub struct MacOSWindowManipulator;

    impl WindowManipulator for MacOSWindowManipulator {
        type Window = AXUIElement;

        fn set_position(&self, window: &AXUIElement, origin: Point) {
            if let Err(e) = window.set_position(CGPoint::new(origin.x, origin.y)) {
                tracing::warn!("Failed to move window to ({}, {}): {}", origin.x, origin.y, e);
            } else {
                tracing::debug!("Moved window to ({}, {})", origin.x, origin.y);
            }
        }

        fn set_size(&self, window: &AXUIElement, size: Size) {
            if let Err(e) = window.set_size(CGSize::new(size.width, size.height)) {
                tracing::warn!(
                    "Failed to resize window to {}x{}: {}",
                    size.width,
                    size.height,
                    e
                );
            } else {
                tracing::debug!("Resized window to {}x{}", size.width, size.height);
            }
        }

        fn hide(&self, pid: i32) {
            macos::hide_app(pid);
        }

        fn unhide(&self, pid: i32) {
            macos::unhide_app(pid);
        }

        fn activate(&self, pid: i32) {
            macos::activate_app(pid);
        }

        fn request_trust(&self) {
            macos::is_trusted_with_prompt();
        }
    }

    pub struct MacOSResizeObserver {
        event_tx: std_mpsc::Sender<Event<AXUIElement>>,
    }

    impl MacOSResizeObserver {
        pub fn new(event_tx: std_mpsc::Sender<Event<AXUIElement>>) -> Self {
            Self { event_tx }
        }
    }

    impl ResizeObserver for MacOSResizeObserver {
        type Window = AXUIElement;

        fn subscribe(
            &self,
            profile_id: &ProfileId,
            pid: i32,
            window: &AXUIElement,
        ) -> Option<ResizeSubscription> {
            match macos::observe_resize(pid, window, profile_id.clone(), self.event_tx.clone()) {
                Ok(observation) => Some(ResizeSubscription::new(move || drop(observation))),
                Err(e) => {
                    tracing::warn!("Failed to observe resizes for pid {}: {}", pid, e);
                    None
                }
            }
        }
    }

    #[derive(Default)]
    pub struct MacOSAppLauncher;

    impl AppLauncher for MacOSAppLauncher {
        fn open(&self, path: &str) -> Result<(), LaunchError> {
            macos::open_app(path)
        }
    }

    #[derive(Default)]
    pub struct MacOSAppResolver;

    impl AppResolver for MacOSAppResolver {
        fn resolve_path(&self, path: &Path) -> Option<TargetApp> {
            macos::resolve_app_path(path)
        }

        fn resolve_bundle_id(&self, bundle_id: &str) -> Option<TargetApp> {
            macos::resolve_bundle_id(bundle_id)
        }
    }

    pub struct MacOSNotifier {
        mtm: MainThreadMarker,
    }

    impl MacOSNotifier {
        pub fn new(mtm: MainThreadMarker) -> Self {
            Self { mtm }
        }
    }

    impl Notifier for MacOSNotifier {
        fn alert(&self, alert: &Alert) {
            tracing::info!("Alert: {}: {}", alert.title(), alert.message());
            macos::show_alert(self.mtm, &alert.title(), &alert.message());
        }
    }
}
