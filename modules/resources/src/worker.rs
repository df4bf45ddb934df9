//! Managed background jobs: handlers enqueue onto a bounded channel, a
//! single worker owned by the module drains it and honors the shutdown
//! token mid-job. No detached threads.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Job {
    pub duration: Duration,
}

/// Handler-side handle: submit jobs, observe completions.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    completions: watch::Receiver<u64>,
}

impl JobQueue {
    /// Non-blocking submit; a full queue drops the job.
    pub fn submit(&self, job: Job) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "background job dropped");
                false
            }
        }
    }

    /// Watch channel carrying the count of finished jobs.
    pub fn completions(&self) -> watch::Receiver<u64> {
        self.completions.clone()
    }
}

/// Worker side; consumed by `run`.
pub struct JobRunner {
    rx: mpsc::Receiver<Job>,
    done: watch::Sender<u64>,
}

pub fn job_channel(capacity: usize) -> (JobQueue, JobRunner) {
    let (tx, rx) = mpsc::channel(capacity);
    let (done, completions) = watch::channel(0);
    (JobQueue { tx, completions }, JobRunner { rx, done })
}

impl JobRunner {
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            tracing::info!(duration = ?job.duration, "background job running");
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("background job interrupted by shutdown");
                    break;
                }
                _ = tokio::time::sleep(job.duration) => {}
            }
            self.done.send_modify(|count| *count += 1);
            tracing::info!("background job completed");
        }
        tracing::debug!("job worker exited");
    }
}
