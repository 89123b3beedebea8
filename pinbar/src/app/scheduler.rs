use std::time::{Duration, Instant};

use crate::core::ProfileId;
use crate::effect::Timer;

#[derive(Debug)]
struct Entry {
    deadline: Instant,
    seq: u64,
    profile_id: ProfileId,
    timer: Timer,
}

/// Deadline queue drained by the main loop tick.
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, profile_id: ProfileId, timer: Timer) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            deadline: now + delay,
            seq,
            profile_id,
            timer,
        });
    }

    /// Drop every pending timer of `profile_id`.
    pub fn cancel(&mut self, profile_id: &ProfileId) {
        self.entries.retain(|e| e.profile_id != *profile_id);
    }

    /// Remove and return the timers due at `now`, earliest first. Equal deadlines keep
    /// scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<(ProfileId, Timer)> {
        let (mut due, pending): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.deadline <= now);
        self.entries = pending;
        due.sort_by_key(|e| (e.deadline, e.seq));
        due.into_iter().map(|e| (e.profile_id, e.timer)).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
