use crate::core::ProfileId;
use crate::effect::JobOutcome;

/// Input delivered to the main loop from the worker, OS callbacks and the anchors.
#[derive(Debug)]
pub enum Event<W> {
    JobFinished {
        profile_id: ProfileId,
        ticket: u64,
        outcome: JobOutcome<W>,
    },
    WindowResized {
        profile_id: ProfileId,
    },
    HotkeyPressed {
        id: u32,
    },
    AnchorClicked {
        profile_id: ProfileId,
    },
}
