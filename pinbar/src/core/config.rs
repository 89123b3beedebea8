use std::time::Duration;

use super::geometry::Size;

/// Placement and polling tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub verify_delay: Duration,
    pub replace_delay: Duration,
    pub indicator_interval: Duration,
    /// Largest per-axis difference tolerated before position is re-applied.
    pub drift_tolerance: f64,
    pub default_size: Size,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_attempts: 60,
            poll_interval: Duration::from_millis(50),
            verify_delay: Duration::from_millis(200),
            replace_delay: Duration::from_millis(350),
            indicator_interval: Duration::from_millis(400),
            drift_tolerance: 2.0,
            default_size: Size::new(600.0, 400.0),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}
