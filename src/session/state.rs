use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SessionHandle;
use crate::overlay::OverlayState;
use crate::poller::PollerGuard;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Active,
}

/// The live session together with the poller it licenses. Leaving the
/// `Active` state drops this value and with it the poller.
#[derive(Debug)]
pub(crate) struct ActiveSession {
    pub epoch: u64,
    pub handle: SessionHandle,
    pub poller: PollerGuard,
}

#[derive(Debug, Default)]
pub(crate) enum SessionState {
    #[default]
    Idle,
    /// Start request in flight; no session id yet.
    Starting { epoch: u64 },
    Active(ActiveSession),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Starting { .. } => SessionStatus::Starting,
            SessionState::Active(_) => SessionStatus::Active,
        }
    }

    pub fn epoch(&self) -> Option<u64> {
        match self {
            SessionState::Idle => None,
            SessionState::Starting { epoch } => Some(*epoch),
            SessionState::Active(active) => Some(active.epoch),
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            SessionState::Active(active) => Some(active),
            _ => None,
        }
    }

    /// The live session, but only if it belongs to `epoch`.
    pub fn active_for(&self, epoch: u64) -> Option<&ActiveSession> {
        self.active().filter(|active| active.epoch == epoch)
    }
}

/// Point-in-time view for the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub goal: Option<String>,
    pub remaining_secs: Option<u64>,
    pub overlay: OverlayState,
}

impl MonitorSnapshot {
    pub(crate) fn capture(state: &SessionState, overlay: &OverlayState, now: DateTime<Utc>) -> Self {
        let active = state.active();
        Self {
            status: state.status(),
            session_id: active.map(|a| a.handle.session_id.clone()),
            goal: active.map(|a| a.handle.spec.goal().to_string()),
            remaining_secs: active.map(|a| remaining_secs(&a.handle, now)),
            overlay: overlay.clone(),
        }
    }
}

fn remaining_secs(handle: &SessionHandle, now: DateTime<Utc>) -> u64 {
    let planned = i64::from(handle.spec.duration_minutes()) * 60;
    let elapsed = (now - handle.started_at).num_seconds();
    u64::try_from(planned - elapsed).unwrap_or(0)
}
