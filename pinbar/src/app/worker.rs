//! Background thread for blocking work: opening applications and polling for their windows.
//!
//! The worker owns its own window-system handle and never touches main-loop state. Every job
//! comes back as exactly one `Event::JobFinished` carrying the job's ticket.

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use crate::core::{poll, wait_for_window, RetryPolicy};
use crate::effect::{Job, JobKind, JobOutcome};
use crate::event::Event;
use crate::platform::{AppLauncher, JobQueue, WindowSystem};

/// Run one job to completion.
pub fn perform<S, L>(
    ws: &S,
    launcher: &L,
    kind: &JobKind,
    policy: RetryPolicy,
    mut sleep: impl FnMut(Duration),
) -> JobOutcome<S::Window>
where
    S: WindowSystem + ?Sized,
    L: AppLauncher + ?Sized,
{
    match kind {
        JobKind::Launch { path, bundle_id } => {
            if let Err(e) = launcher.open(path) {
                return JobOutcome::LaunchFailed(e);
            }
            let pid = poll(policy, &mut sleep, |_| {
                ws.find_running(bundle_id).map(|app| app.pid)
            });
            let Some(pid) = pid else {
                tracing::info!("{} did not show up as a running process", bundle_id);
                return JobOutcome::Acquired {
                    pid: None,
                    window: None,
                };
            };
            JobOutcome::Acquired {
                pid: Some(pid),
                window: wait_for_window(ws, pid, policy, sleep),
            }
        }
        JobKind::Acquire { pid } => JobOutcome::Acquired {
            pid: Some(*pid),
            window: wait_for_window(ws, *pid, policy, sleep),
        },
    }
}

/// Sending half of the worker's job channel.
pub struct WorkerQueue {
    job_tx: std_mpsc::Sender<Job>,
}

impl JobQueue for WorkerQueue {
    fn submit(&self, job: Job) {
        tracing::debug!("Submitting {:?} for {} (ticket {})", job.kind, job.profile_id, job.ticket);
        if self.job_tx.send(job).is_err() {
            tracing::error!("Worker thread is gone, job dropped");
        }
    }
}

/// Start the worker thread. It exits when the queue is dropped or the event receiver goes away.
pub fn spawn<S, L>(
    ws: S,
    launcher: L,
    policy: RetryPolicy,
    event_tx: std_mpsc::Sender<Event<S::Window>>,
) -> std::io::Result<WorkerQueue>
where
    S: WindowSystem + Send + 'static,
    S::Window: Send + 'static,
    L: AppLauncher + Send + 'static,
{
    let (job_tx, job_rx) = std_mpsc::channel::<Job>();

    thread::Builder::new()
        .name("pinbar-worker".to_string())
        .spawn(move || {
            tracing::info!("Worker thread started");
            while let Ok(job) = job_rx.recv() {
                let outcome = perform(&ws, &launcher, &job.kind, policy, thread::sleep);
                let event = Event::JobFinished {
                    profile_id: job.profile_id,
                    ticket: job.ticket,
                    outcome,
                };
                if event_tx.send(event).is_err() {
                    tracing::error!("Main loop is gone, stopping worker");
                    break;
                }
            }
            tracing::info!("Worker thread exiting");
        })?;

    Ok(WorkerQueue { job_tx })
}
