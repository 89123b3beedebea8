//! Placement geometry.
//!
//! Anchor and screen rectangles use the Cocoa frame (origin bottom-left, y grows up). The
//! accessibility API expects the CoreGraphics frame (origin top-left of the primary screen,
//! y grows down); [`to_external`] converts between the two and is applied exactly once, right
//! before a rectangle is handed to the window system.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both axes are within `tolerance` of `other`.
    pub fn is_near(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Area with negative dimensions counted as zero.
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Half-open containment, matching `NSPointInRect`.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x < self.max_x() && p.y >= self.min_y() && p.y < self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }
}

/// A display as seen by the placement engine, in the Cocoa frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub frame: Rect,
    /// Working area: frame minus menu bar and Dock.
    pub visible: Rect,
}

pub const ANCHOR_PADDING: f64 = 8.0;
pub const FALLBACK_PADDING: f64 = 12.0;
const FALLBACK_TOP_PADDING: f64 = 8.0;

/// Center a `size` rectangle under the anchor, `padding` below the top of `visible`, then keep
/// it inside `visible`. Too wide pins to the left edge, too tall pins to the bottom edge.
pub fn frame_below_anchor(anchor: Rect, size: Size, visible: Rect, padding: f64) -> Rect {
    let x = anchor.mid_x() - size.width / 2.0;
    let y = visible.max_y() - size.height - padding;

    let x = x.min(visible.max_x() - size.width).max(visible.min_x());
    let y = y.min(visible.max_y() - size.height).max(visible.min_y());

    Rect::new(x, y, size.width, size.height)
}

/// Placement used when no anchor geometry is available: near the top-right corner of the
/// screen under the pointer. Only the left and bottom edges are clamped.
pub fn fallback_frame(size: Size, pointer: Point, screens: &[Screen], padding: f64) -> Option<Rect> {
    let screen = screens
        .iter()
        .find(|s| s.frame.contains(pointer))
        .or_else(|| screens.first())?;
    let area = screen.visible;

    let x = (area.max_x() - size.width - padding).max(area.min_x());
    let y = (area.max_y() - size.height - FALLBACK_TOP_PADDING).max(area.min_y());

    Some(Rect::new(x, y, size.width, size.height))
}

/// Convert a Cocoa-frame rectangle into the accessibility frame of `screen_frame` (the primary
/// screen's full frame).
pub fn to_external(rect: Rect, screen_frame: Rect) -> Rect {
    Rect::new(
        rect.x,
        screen_frame.max_y() - rect.max_y(),
        rect.width,
        rect.height,
    )
}

/// Compute the target frame, already converted for the window system.
///
/// The visible area is taken from the screen holding the anchor's midpoint (first screen
/// otherwise). Without an anchor the pointer-based fallback is used.
pub fn compute_placement(
    anchor: Option<Rect>,
    size: Size,
    pointer: Point,
    screens: &[Screen],
) -> Option<Rect> {
    let primary = screens.first()?;

    let frame = match anchor {
        Some(anchor) => {
            let mid = Point::new(anchor.mid_x(), anchor.mid_y());
            let screen = screens
                .iter()
                .find(|s| s.frame.contains(mid))
                .unwrap_or(primary);
            frame_below_anchor(anchor, size, screen.visible, ANCHOR_PADDING)
        }
        None => fallback_frame(size, pointer, screens, FALLBACK_PADDING)?,
    };

    Some(to_external(frame, primary.frame))
}
