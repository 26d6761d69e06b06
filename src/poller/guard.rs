use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::polling_loop;
use super::{PollJob, PollerDeps};

/// Owns one running poll loop. Dropping the guard stops the loop before the
/// caller's next await; there is no way to leak a timer past its session.
pub struct PollerGuard {
    session_id: String,
    epoch: u64,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl PollerGuard {
    pub fn spawn(job: PollJob, deps: PollerDeps) -> Self {
        let cancel_token = CancellationToken::new();
        let session_id = job.session_id.clone();
        let epoch = job.epoch;

        info!("Starting activity poller for session {session_id} (epoch {epoch})");
        let handle = tokio::spawn(polling_loop(job, deps, cancel_token.clone()));

        Self {
            session_id,
            epoch,
            handle: Some(handle),
            cancel_token,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the loop and waits for its task to finish. Once this returns
    /// no further request can go out for this session, whichever worker
    /// thread the loop was running on.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("Activity poller for session {} failed: {err}", self.session_id);
                }
            }
            info!(
                "Stopped activity poller for session {} (epoch {})",
                self.session_id, self.epoch
            );
        }
    }

    /// Cancels the loop and aborts any in-flight request. Idempotent.
    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!(
                "Stopped activity poller for session {} (epoch {})",
                self.session_id, self.epoch
            );
        }
    }
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PollerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerGuard")
            .field("session_id", &self.session_id)
            .field("epoch", &self.epoch)
            .field("running", &self.is_running())
            .finish()
    }
}
