//! The stop group: named background jobs sharing one cancellation token.
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A named background job.
#[derive(Debug)]
pub struct Job {
    name: String,
    handle: JoinHandle<()>,
}

impl Job {
    pub fn new<N: Into<String>>(name: N, handle: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

/// Tracks the application's background jobs and coordinates their shutdown.
///
/// Jobs observe the shared cancellation token (obtained through
/// [`new_cancellation_token`](JobManager::new_cancellation_token)); calling
/// [`cancel`](JobManager::cancel) asks them all to stop, and
/// [`wait_for_all`](JobManager::wait_for_all) waits for each with a grace
/// timeout.
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: Vec<Job>,
    cancellation_token: CancellationToken,
}

impl JobManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<N: Into<String>>(&mut self, name: N, handle: JoinHandle<()>) {
        self.jobs.push(Job::new(name, handle));
    }

    #[must_use]
    pub fn new_cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Signals every job to stop. Jobs finish on their own schedule; use
    /// [`wait_for_all`](JobManager::wait_for_all) to wait for them.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Waits sequentially for every job, bounding each wait by the grace
    /// period. A job that overstays is reported and left behind.
    pub async fn wait_for_all(mut self, grace_period: Duration) {
        for job in self.jobs.drain(..) {
            let name = job.name;

            match timeout(grace_period, job.handle).await {
                Ok(Ok(())) => tracing::info!(job = %name, "job completed gracefully"),
                Ok(Err(error)) => tracing::warn!(job = %name, %error, "job finished with an error"),
                Err(_) => tracing::warn!(
                    job = %name,
                    grace_period_secs = grace_period.as_secs(),
                    "job did not complete in time"
                ),
            }
        }
    }
}
