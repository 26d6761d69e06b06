pub mod context;
mod guard;
mod loop_worker;

pub use context::{ContextSource, FileContext, StaticContext};
pub use guard::PollerGuard;

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use crate::api::FocusBackend;
use crate::config::MonitorConfig;
use crate::models::ClassificationDecision;

/// Receives the poller's output. Every call is tagged with the epoch the
/// poller was spawned for, so the receiver can drop anything stale.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn deliver(&self, epoch: u64, decision: ClassificationDecision);

    /// The session's planned duration ran out.
    async fn expired(&self, epoch: u64);
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl From<&MonitorConfig> for PollSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            interval: config.poll_interval,
            request_timeout: config.request_timeout,
        }
    }
}

/// Identity of the session a poller works for. Fixed for the poller's life.
#[derive(Debug, Clone)]
pub struct PollJob {
    pub session_id: String,
    pub user_id: Option<String>,
    pub epoch: u64,
    pub deadline: Option<Instant>,
}

#[derive(Clone)]
pub struct PollerDeps {
    pub backend: Arc<dyn FocusBackend>,
    pub context: Arc<dyn ContextSource>,
    pub sink: Arc<dyn DecisionSink>,
    pub settings: PollSettings,
}
