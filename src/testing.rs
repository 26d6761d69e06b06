//! In-memory fakes shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::api::FocusBackend;
use crate::audio::AlertPlayer;
use crate::error::{MonitorError, MonitorResult};
use crate::models::{
    ActivitySnapshot, ClassificationDecision, DeviceIdentity, SessionSpec, SessionSummary,
    UserRef, Voice,
};
use crate::poller::DecisionSink;

pub(crate) struct FakeBackend {
    pub register_ok: AtomicBool,
    pub start_ok: AtomicBool,
    pub end_ok: AtomicBool,
    pub summary: Mutex<Option<SessionSummary>>,
    pub default_decision: Mutex<ClassificationDecision>,
    pub scripted: Mutex<VecDeque<MonitorResult<ClassificationDecision>>>,
    pub activity_log: Mutex<Vec<ActivitySnapshot>>,
    pub started: Mutex<Vec<String>>,
    pub ended: Mutex<Vec<String>>,
    pub activity_delay: Mutex<Option<Duration>>,
    /// When set, each activity call waits for one permit before answering.
    pub activity_gate: Mutex<Option<Arc<Semaphore>>>,
    /// When set, each start call waits for one permit before answering.
    pub start_gate: Mutex<Option<Arc<Semaphore>>>,
    session_counter: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            register_ok: AtomicBool::new(true),
            start_ok: AtomicBool::new(true),
            end_ok: AtomicBool::new(true),
            summary: Mutex::new(Some(SessionSummary::default())),
            default_decision: Mutex::new(ClassificationDecision::Relevant),
            scripted: Mutex::new(VecDeque::new()),
            activity_log: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            activity_delay: Mutex::new(None),
            activity_gate: Mutex::new(None),
            start_gate: Mutex::new(None),
            session_counter: AtomicUsize::new(0),
        }
    }

    pub fn set_decision(&self, decision: ClassificationDecision) {
        *self.default_decision.lock().unwrap() = decision;
    }

    pub fn script(&self, results: impl IntoIterator<Item = MonitorResult<ClassificationDecision>>) {
        self.scripted.lock().unwrap().extend(results);
    }

    pub fn activity_count(&self) -> usize {
        self.activity_log.lock().unwrap().len()
    }

    pub fn activity_for(&self, session_id: &str) -> usize {
        self.activity_log
            .lock()
            .unwrap()
            .iter()
            .filter(|snapshot| snapshot.session_id == session_id)
            .count()
    }

    pub fn gate_activity(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.activity_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_start(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.start_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

fn offline(operation: &'static str) -> MonitorError {
    MonitorError::network(operation, "connection refused")
}

#[async_trait]
impl FocusBackend for FakeBackend {
    async fn register(&self, device: &DeviceIdentity, _voice: Voice) -> MonitorResult<UserRef> {
        if !self.register_ok.load(Ordering::SeqCst) {
            return Err(offline("register"));
        }
        Ok(UserRef {
            user_id: format!("user-{}", device.id.simple()),
        })
    }

    async fn start_session(&self, _user_id: &str, _spec: &SessionSpec) -> MonitorResult<String> {
        let gate = self.start_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.start_ok.load(Ordering::SeqCst) {
            return Err(offline("session start"));
        }
        let n = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("S{n}");
        self.started.lock().unwrap().push(session_id.clone());
        Ok(session_id)
    }

    async fn report_activity(
        &self,
        snapshot: &ActivitySnapshot,
    ) -> MonitorResult<ClassificationDecision> {
        self.activity_log.lock().unwrap().push(snapshot.clone());

        let delay = *self.activity_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let gate = self.activity_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(result) = self.scripted.lock().unwrap().pop_front() {
            return result;
        }
        Ok(*self.default_decision.lock().unwrap())
    }

    async fn end_session(&self, session_id: &str) -> MonitorResult<()> {
        self.ended.lock().unwrap().push(session_id.to_string());
        if !self.end_ok.load(Ordering::SeqCst) {
            return Err(offline("session end"));
        }
        Ok(())
    }

    async fn summary(&self, _user_id: &str) -> MonitorResult<SessionSummary> {
        self.summary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| offline("summary"))
    }
}

#[derive(Default)]
pub(crate) struct CountingAlert {
    count: AtomicUsize,
}

impl CountingAlert {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl AlertPlayer for CountingAlert {
    fn play_alert(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub decisions: Mutex<Vec<(u64, ClassificationDecision)>>,
    pub expired: Mutex<Vec<u64>>,
}

#[async_trait]
impl DecisionSink for RecordingSink {
    async fn deliver(&self, epoch: u64, decision: ClassificationDecision) {
        self.decisions.lock().unwrap().push((epoch, decision));
    }

    async fn expired(&self, epoch: u64) {
        self.expired.lock().unwrap().push(epoch);
    }
}

/// Polls `condition` every few milliseconds until it holds or `within` passes.
pub(crate) async fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
