use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::{
    api::FocusBackend,
    audio::AlertPlayer,
    error::{MonitorError, MonitorResult},
    models::{
        ClassificationDecision, DeviceIdentity, SessionHandle, SessionSpec, SessionSummary,
        UserRef, Voice,
    },
    overlay::{OverlayMapper, OverlayState},
    poller::{ContextSource, DecisionSink, PollJob, PollSettings, PollerDeps, PollerGuard},
};

use super::state::{ActiveSession, MonitorSnapshot, SessionState, SessionStatus};

struct Inner {
    state: SessionState,
    overlay: OverlayMapper,
    user: Option<UserRef>,
    last_epoch: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    backend: Arc<dyn FocusBackend>,
    context: Arc<dyn ContextSource>,
    alert: Arc<dyn AlertPlayer>,
    settings: PollSettings,
    overlay_tx: watch::Sender<OverlayState>,
    status_tx: watch::Sender<SessionStatus>,
}

/// Owns the single live session, the poller it licenses and the overlay
/// derived from it. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn FocusBackend>,
        context: Arc<dyn ContextSource>,
        alert: Arc<dyn AlertPlayer>,
        settings: PollSettings,
    ) -> Self {
        let (overlay_tx, _) = watch::channel(OverlayState::default());
        let (status_tx, _) = watch::channel(SessionStatus::Idle);

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    overlay: OverlayMapper::new(),
                    user: None,
                    last_epoch: 0,
                }),
                backend,
                context,
                alert,
                settings,
                overlay_tx,
                status_tx,
            }),
        }
    }

    /// Resolves the device to a backend user. Failure is logged and
    /// swallowed; the monitor then runs without a user id.
    pub async fn register(&self, device: &DeviceIdentity) -> Option<UserRef> {
        match self.shared.backend.register(device, Voice::default()).await {
            Ok(user) => {
                info!("Registered device {} as user {}", device.id, user.user_id);
                self.shared.inner.lock().await.user = Some(user.clone());
                Some(user)
            }
            Err(err) => {
                warn!("Registration failed, continuing without a user id: {err}");
                self.shared.inner.lock().await.user.clone()
            }
        }
    }

    pub async fn user(&self) -> Option<UserRef> {
        self.shared.inner.lock().await.user.clone()
    }

    pub async fn start(&self, spec: SessionSpec) -> MonitorResult<SessionHandle> {
        let (epoch, user_id) = {
            let mut inner = self.shared.inner.lock().await;
            if !matches!(inner.state, SessionState::Idle) {
                return Err(MonitorError::SessionAlreadyActive);
            }
            let user_id = inner
                .user
                .as_ref()
                .map(|user| user.user_id.clone())
                .ok_or(MonitorError::PreconditionMissing(
                    "user id (registration has not completed)",
                ))?;

            inner.last_epoch += 1;
            let epoch = inner.last_epoch;
            inner.state = SessionState::Starting { epoch };
            self.publish_status(&inner);
            (epoch, user_id)
        };

        info!(
            "Starting session: goal='{}', {} min, epoch {epoch}",
            spec.goal(),
            spec.duration_minutes()
        );
        let result = self.shared.backend.start_session(&user_id, &spec).await;

        let mut inner = self.shared.inner.lock().await;
        let still_ours = matches!(inner.state, SessionState::Starting { epoch: e } if e == epoch);

        let session_id = match result {
            Ok(session_id) => session_id,
            Err(err) => {
                if still_ours {
                    inner.state = SessionState::Idle;
                    self.publish_status(&inner);
                }
                warn!("Session start failed: {err}");
                return Err(err);
            }
        };

        if !still_ours {
            drop(inner);
            warn!("Session {session_id} was cancelled while starting; ending it");
            if let Err(err) = self.shared.backend.end_session(&session_id).await {
                warn!("Failed to end abandoned session {session_id}: {err}");
            }
            return Err(MonitorError::StartCancelled);
        }

        let handle = SessionHandle {
            session_id,
            spec,
            started_at: Utc::now(),
        };
        let poller = PollerGuard::spawn(
            PollJob {
                session_id: handle.session_id.clone(),
                user_id: Some(user_id),
                epoch,
                deadline: Some(Instant::now() + handle.spec.duration()),
            },
            self.poller_deps(),
        );

        let overlay = inner.overlay.reset();
        inner.state = SessionState::Active(ActiveSession {
            epoch,
            handle: handle.clone(),
            poller,
        });
        self.publish_overlay(overlay);
        self.publish_status(&inner);

        info!("Session {} active (epoch {epoch})", handle.session_id);
        Ok(handle)
    }

    /// Ends whatever session is live. Local state goes Idle (poller stopped,
    /// overlay hidden) before the backend is told; the returned error only
    /// describes that notification.
    pub async fn end(&self) -> MonitorResult<()> {
        self.end_matching(None).await
    }

    async fn end_matching(&self, expected_epoch: Option<u64>) -> MonitorResult<()> {
        let (ended, poller) = {
            let mut inner = self.shared.inner.lock().await;
            if let Some(expected) = expected_epoch {
                if inner.state.epoch() != Some(expected) {
                    return Ok(());
                }
            }

            match std::mem::take(&mut inner.state) {
                SessionState::Idle => return Ok(()),
                SessionState::Starting { epoch } => {
                    info!("Session start (epoch {epoch}) abandoned");
                    self.publish_status(&inner);
                    return Ok(());
                }
                SessionState::Active(ActiveSession { handle, poller, .. }) => {
                    let overlay = inner.overlay.reset();
                    self.publish_overlay(overlay);
                    self.publish_status(&inner);
                    (handle, poller)
                }
            }
        };
        // A tick already running elsewhere finishes before we report back.
        poller.shutdown().await;

        info!("Session {} ended locally; notifying backend", ended.session_id);
        self.shared
            .backend
            .end_session(&ended.session_id)
            .await
            .inspect_err(|err| warn!("Backend end for {} failed: {err}", ended.session_id))
    }

    /// Applies a poll result, unless it belongs to a session that is no
    /// longer live.
    pub(crate) async fn apply_decision(&self, epoch: u64, decision: ClassificationDecision) {
        let mut inner = self.shared.inner.lock().await;
        let Some(goal) = inner
            .state
            .active_for(epoch)
            .map(|active| active.handle.spec.goal().to_string())
        else {
            debug!("Discarding {decision:?} for superseded epoch {epoch}");
            return;
        };
        let transition = inner.overlay.apply(decision, &goal);
        self.publish_overlay(transition.state.clone());
        // Raised under the lock so an `end` cannot slip in before the tone.
        if transition.alert {
            info!("Overlay raised: return to '{}'", transition.state.display_target());
            self.shared.alert.play_alert();
        }
    }

    /// "Go Back": hide the overlay, keep the session.
    pub async fn dismiss_overlay(&self) -> OverlayState {
        let mut inner = self.shared.inner.lock().await;
        let overlay = inner.overlay.dismiss();
        self.publish_overlay(overlay.clone());
        overlay
    }

    pub async fn fetch_summary(&self) -> MonitorResult<SessionSummary> {
        let user_id = self
            .user()
            .await
            .map(|user| user.user_id)
            .ok_or(MonitorError::PreconditionMissing("user id"))?;
        self.shared.backend.summary(&user_id).await
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let inner = self.shared.inner.lock().await;
        MonitorSnapshot::capture(&inner.state, inner.overlay.state(), Utc::now())
    }

    pub async fn current_session(&self) -> Option<SessionHandle> {
        let inner = self.shared.inner.lock().await;
        inner.state.active().map(|active| active.handle.clone())
    }

    /// True while a poll loop is alive for the live session.
    pub async fn is_polling(&self) -> bool {
        let inner = self.shared.inner.lock().await;
        inner
            .state
            .active()
            .is_some_and(|active| active.poller.is_running())
    }

    pub fn overlay(&self) -> OverlayState {
        self.shared.overlay_tx.borrow().clone()
    }

    pub fn subscribe_overlay(&self) -> watch::Receiver<OverlayState> {
        self.shared.overlay_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub(super) fn poller_deps(&self) -> PollerDeps {
        PollerDeps {
            backend: self.shared.backend.clone(),
            context: self.shared.context.clone(),
            sink: Arc::new(ControllerSink {
                shared: Arc::downgrade(&self.shared),
            }),
            settings: self.shared.settings,
        }
    }

    fn publish_overlay(&self, overlay: OverlayState) {
        self.shared.overlay_tx.send_if_modified(|current| {
            if *current == overlay {
                return false;
            }
            *current = overlay;
            true
        });
    }

    fn publish_status(&self, inner: &Inner) {
        let status = inner.state.status();
        self.shared.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }
}

/// Routes poller output back into the controller without keeping it alive.
struct ControllerSink {
    shared: Weak<Shared>,
}

#[async_trait]
impl DecisionSink for ControllerSink {
    async fn deliver(&self, epoch: u64, decision: ClassificationDecision) {
        if let Some(shared) = self.shared.upgrade() {
            SessionController { shared }
                .apply_decision(epoch, decision)
                .await;
        }
    }

    async fn expired(&self, epoch: u64) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let controller = SessionController { shared };
        // Ending drops the poller that is calling us, so run it elsewhere.
        tokio::spawn(async move {
            info!("Planned duration over; ending session (epoch {epoch})");
            if let Err(err) = controller.end_matching(Some(epoch)).await {
                warn!("Ending expired session failed: {err}");
            }
        });
    }
}
