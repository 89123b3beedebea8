use objc2::MainThreadMarker;
use objc2_app_kit::{NSEvent, NSScreen};
use objc2_foundation::NSRect;

use crate::core::{Point, Rect, Screen};

fn to_rect(r: NSRect) -> Rect {
    Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height)
}

/// All displays in the Cocoa frame (bottom-left origin). AppKit lists the menu bar screen first.
pub fn screens(mtm: MainThreadMarker) -> Vec<Screen> {
    NSScreen::screens(mtm)
        .iter()
        .map(|screen| Screen {
            frame: to_rect(screen.frame()),
            visible: to_rect(screen.visibleFrame()),
        })
        .collect()
}

pub fn pointer_location() -> Point {
    let mouse = NSEvent::mouseLocation();
    Point::new(mouse.x, mouse.y)
}
