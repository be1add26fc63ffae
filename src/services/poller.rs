//! Background polling of a video job until it reaches a terminal status.
//!
//! [`JobPoller::spawn`] runs the loop as a tokio task and hands back a
//! [`PollHandle`]: a channel of [`PollEvent`]s for the interface layer and the
//! task's final [`PollOutcome`]. The loop stops on a terminal status, when
//! the [`CancellationToken`] is cancelled, or when the configured timeout
//! elapses.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::job::{JobOutcome, JobSnapshot, JobStatus};
use crate::services::client::ApiError;

const EVENT_BUFFER: usize = 32;

/// Anything that can report the current state of a job.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, ApiError>;
}

/// What a failed status request does to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollFailurePolicy {
    /// End polling with [`PollOutcome::Aborted`].
    Abort,
    /// Report a [`PollEvent::Warning`] and keep polling.
    #[default]
    Warn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until a terminal status or cancellation.
    pub timeout: Option<Duration>,
    pub on_failure: PollFailurePolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Some(Duration::from_secs(1800)),
            on_failure: PollFailurePolicy::default(),
        }
    }
}

/// Update pushed to the interface layer while polling.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Status(JobSnapshot),
    Warning { attempt: u32, message: String },
}

/// How a polling run ended.
#[derive(Debug)]
pub enum PollOutcome {
    Completed { output_url: Option<String> },
    Failed { status: JobStatus, message: String },
    Cancelled,
    TimedOut { last: Option<JobSnapshot> },
    Aborted(ApiError),
}

impl From<JobOutcome> for PollOutcome {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed { output_url } => Self::Completed { output_url },
            JobOutcome::Failed { status, message } => Self::Failed { status, message },
        }
    }
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Running poll task.
pub struct PollHandle {
    pub events: mpsc::Receiver<PollEvent>,
    pub task: JoinHandle<PollOutcome>,
}

pub struct JobPoller<S: ?Sized> {
    source: Arc<S>,
    settings: PollSettings,
}

impl<S: JobSource + ?Sized + 'static> JobPoller<S> {
    pub fn new(source: Arc<S>, settings: PollSettings) -> Self {
        Self { source, settings }
    }

    /// Start polling `job_id` in the background.
    pub fn spawn(self, job_id: String, cancel: CancellationToken) -> PollHandle {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(async move { self.run(&job_id, tx, cancel).await });
        PollHandle { events: rx, task }
    }

    /// Poll in the current task. Sleeps one interval before every request.
    ///
    /// Every wait (the interval, the request, handing an event to a slow
    /// consumer) is raced against cancellation and the deadline.
    pub async fn run(
        &self,
        job_id: &str,
        events: mpsc::Sender<PollEvent>,
        cancel: CancellationToken,
    ) -> PollOutcome {
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        let mut last: Option<JobSnapshot> = None;
        let mut attempt = 0u32;

        loop {
            let wake = match deadline {
                Some(d) => d.min(Instant::now() + self.settings.interval),
                None => Instant::now() + self.settings.interval,
            };
            if let Err(stop) = guarded(tokio::time::sleep_until(wake), deadline, &cancel).await {
                return stopped(stop, job_id, attempt, last);
            }

            attempt += 1;
            let result = match guarded(self.source.fetch_job(job_id), deadline, &cancel).await {
                Ok(result) => result,
                Err(stop) => return stopped(stop, job_id, attempt, last),
            };

            match result {
                Ok(snapshot) => {
                    tracing::debug!(
                        job_id,
                        attempt,
                        status = %snapshot.status,
                        progress = snapshot.progress.fraction(),
                        "Job status"
                    );
                    let outcome = snapshot.outcome();
                    // A dropped receiver only means nobody is watching.
                    let delivered =
                        guarded(events.send(PollEvent::Status(snapshot.clone())), deadline, &cancel).await;

                    if let Some(outcome) = outcome {
                        tracing::info!(job_id, attempt, status = %snapshot.status, "Job reached terminal status");
                        return outcome.into();
                    }
                    last = Some(snapshot);
                    if let Err(stop) = delivered {
                        return stopped(stop, job_id, attempt, last);
                    }
                }
                Err(e) => match self.settings.on_failure {
                    PollFailurePolicy::Abort => {
                        tracing::error!(job_id, attempt, error = %e, "Status poll failed, aborting");
                        return PollOutcome::Aborted(e);
                    }
                    PollFailurePolicy::Warn => {
                        tracing::warn!(job_id, attempt, error = %e, "Status poll failed, will retry");
                        let warning = PollEvent::Warning {
                            attempt,
                            message: e.to_string(),
                        };
                        if let Err(stop) = guarded(events.send(warning), deadline, &cancel).await {
                            return stopped(stop, job_id, attempt, last);
                        }
                    }
                },
            }
        }
    }
}

/// Why a guarded wait ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Deadline,
}

/// Await `fut` unless the token is cancelled or the deadline passes first.
/// Cancellation wins ties.
async fn guarded<F: Future>(
    fut: F,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> Result<F::Output, Interrupt> {
    let expired = async {
        match deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        _ = expired => Err(Interrupt::Deadline),
        output = fut => Ok(output),
    }
}

fn stopped(stop: Interrupt, job_id: &str, attempt: u32, last: Option<JobSnapshot>) -> PollOutcome {
    match stop {
        Interrupt::Cancelled => {
            tracing::info!(job_id, "Polling cancelled");
            PollOutcome::Cancelled
        }
        Interrupt::Deadline => {
            tracing::warn!(job_id, attempt, "Polling timed out");
            PollOutcome::TimedOut { last }
        }
    }
}
