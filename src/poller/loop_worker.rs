use anyhow::{Context, Result};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::{ActivitySnapshot, ClassificationDecision};

use super::{PollJob, PollerDeps};

// Set to false to silence per-tick logging from this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub(super) async fn polling_loop(job: PollJob, deps: PollerDeps, cancel_token: CancellationToken) {
    let interval = deps.settings.interval;
    // First tick lands one interval after start, not immediately.
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("poller for session {} shutting down", job.session_id);
                break;
            }
            _ = wait_for_deadline(job.deadline) => {
                log_info!("session {} reached its planned duration", job.session_id);
                deps.sink.expired(job.epoch).await;
                break;
            }
            _ = ticker.tick() => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    outcome = time::timeout(deps.settings.request_timeout, poll_once(&job, &deps)) => outcome,
                };

                match outcome {
                    Ok(Ok(decision)) => {
                        log_debug!("session {} decision: {:?}", job.session_id, decision);
                        deps.sink.deliver(job.epoch, decision).await;
                    }
                    Ok(Err(err)) => log_warn!("poll tick failed for session {}: {err:#}", job.session_id),
                    Err(_) => log_error!(
                        "poll tick timed out (> {:?}) for session {}",
                        deps.settings.request_timeout,
                        job.session_id
                    ),
                }
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn poll_once(job: &PollJob, deps: &PollerDeps) -> Result<ClassificationDecision> {
    let context = deps
        .context
        .current()
        .await
        .context("could not read current context")?;
    let snapshot = ActivitySnapshot::new(&job.session_id, job.user_id.as_deref(), context);
    let decision = deps.backend.report_activity(&snapshot).await?;
    Ok(decision)
}
