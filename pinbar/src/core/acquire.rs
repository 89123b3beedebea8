//! Picking "the window that matters" out of an eventually-consistent window list.

use std::time::Duration;

use super::Config;
use crate::platform::{WindowAttribute, WindowSystem};

const USABLE_SUBROLES: &[&str] = &[
    "AXStandardWindow",
    "AXDialog",
    "AXFloatingWindow",
    "standard",
    "dialog",
    "floating",
];

/// Not minimized, an acceptable (or missing) subrole, and both position and size settable.
pub fn is_usable<W: WindowSystem + ?Sized>(ws: &W, window: &W::Window) -> bool {
    if ws.is_minimized(window).unwrap_or(false) {
        return false;
    }
    if let Some(subrole) = ws.subrole(window) {
        if !USABLE_SUBROLES.contains(&subrole.as_str()) {
            return false;
        }
    }
    ws.is_settable(window, WindowAttribute::Position)
        && ws.is_settable(window, WindowAttribute::Size)
}

/// Focused window, then main window, then the largest usable window, then whatever comes first.
pub fn acquire_window<W: WindowSystem + ?Sized>(ws: &W, pid: i32) -> Option<W::Window> {
    if let Some(window) = ws.focused_window(pid).filter(|w| is_usable(ws, w)) {
        return Some(window);
    }
    if let Some(window) = ws.main_window(pid).filter(|w| is_usable(ws, w)) {
        return Some(window);
    }

    let windows = ws.list_windows(pid)?;

    let mut best: Option<(&W::Window, f64)> = None;
    for window in windows.iter().filter(|w| is_usable(ws, w)) {
        let area = ws.frame(window).map_or(0.0, |f| f.size().area());
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((window, area));
        }
    }

    match best {
        Some((window, _)) => Some(window.clone()),
        None => windows.into_iter().next(),
    }
}

pub fn has_any_window<W: WindowSystem + ?Sized>(ws: &W, pid: i32) -> bool {
    ws.list_windows(pid).is_some_and(|w| !w.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.poll_attempts,
            interval: config.poll_interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Poll `probe` until it yields a value or the policy is exhausted. Sleeps only between attempts.
pub fn poll<T>(
    policy: RetryPolicy,
    mut sleep: impl FnMut(Duration),
    mut probe: impl FnMut(u32) -> Option<T>,
) -> Option<T> {
    for attempt in 1..=policy.attempts {
        if let Some(found) = probe(attempt) {
            return Some(found);
        }
        if attempt < policy.attempts {
            sleep(policy.interval);
        }
    }
    None
}

/// Blocking acquisition for the background worker. `None` means no window appeared in time.
pub fn wait_for_window<W: WindowSystem + ?Sized>(
    ws: &W,
    pid: i32,
    policy: RetryPolicy,
    sleep: impl FnMut(Duration),
) -> Option<W::Window> {
    let window = poll(policy, sleep, |attempt| {
        let found = acquire_window(ws, pid);
        if found.is_none() {
            tracing::debug!("No window for pid {} (attempt {})", pid, attempt);
        }
        found
    });

    match &window {
        Some(w) => tracing::debug!(
            "Acquired window for pid {}: {:?} role={:?} title={:?}",
            pid,
            w,
            ws.role(w),
            ws.title(w)
        ),
        None => tracing::info!(
            "Gave up waiting for a window of pid {} after {} attempts",
            pid,
            policy.attempts
        ),
    }
    window
}
