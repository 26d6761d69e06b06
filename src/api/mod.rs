//! Boundary to the classification/session backend.
//!
//! The controller only ever talks to a [`FocusBackend`]; [`HttpBackend`] is
//! the production implementation over the JSON API.

mod http;

pub use http::HttpBackend;

use async_trait::async_trait;

use crate::error::MonitorResult;
use crate::models::{
    ActivitySnapshot, ClassificationDecision, DeviceIdentity, SessionSpec, SessionSummary,
    UserRef, Voice,
};

#[async_trait]
pub trait FocusBackend: Send + Sync {
    /// Resolves a device to a backend user. Idempotent per device id.
    async fn register(&self, device: &DeviceIdentity, voice: Voice) -> MonitorResult<UserRef>;

    /// Opens a session and returns its backend id.
    async fn start_session(&self, user_id: &str, spec: &SessionSpec) -> MonitorResult<String>;

    /// Submits one activity snapshot for classification.
    async fn report_activity(
        &self,
        snapshot: &ActivitySnapshot,
    ) -> MonitorResult<ClassificationDecision>;

    async fn end_session(&self, session_id: &str) -> MonitorResult<()>;

    async fn summary(&self, user_id: &str) -> MonitorResult<SessionSummary>;
}
