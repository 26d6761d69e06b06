use anyhow::{bail, Context};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::FocusBackend;
use crate::error::{MonitorError, MonitorResult};
use crate::models::{
    ActivitySnapshot, Category, ClassificationDecision, DeviceIdentity, SessionSpec,
    SessionSummary, UserRef, Voice,
};

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    device_id: String,
    name: Option<&'a str>,
    email: Option<&'a str>,
    voice: Voice,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    user_id: &'a str,
    goal: &'a str,
    duration_minutes: u32,
    categories: Vec<Category>,
    voice: Voice,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    decision: String,
}

#[derive(Debug, Serialize)]
struct EndRequest<'a> {
    session_id: &'a str,
}

/// JSON-over-HTTP client for the focus backend.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Every request made through this client is bounded by `request_timeout`.
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid backend url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("backend url '{base_url}' cannot carry a path");
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base can always take path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        segments: &[&str],
        body: &B,
    ) -> MonitorResult<Response> {
        let url = self.endpoint(segments);
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| MonitorError::network(operation, err))?;
        ensure_success(operation, response).await
    }

    async fn get(&self, operation: &'static str, segments: &[&str]) -> MonitorResult<Response> {
        let url = self.endpoint(segments);
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| MonitorError::network(operation, err))?;
        ensure_success(operation, response).await
    }
}

async fn ensure_success(operation: &'static str, response: Response) -> MonitorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MonitorError::network(operation, format!("HTTP {status}: {body}")))
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> MonitorResult<T> {
    let body = response
        .text()
        .await
        .map_err(|err| MonitorError::network(operation, err))?;
    serde_json::from_str(&body).map_err(|err| MonitorError::invalid_response(operation, err))
}

fn non_empty(operation: &'static str, field: &str, value: String) -> MonitorResult<String> {
    if value.trim().is_empty() {
        return Err(MonitorError::invalid_response(
            operation,
            format!("empty {field}"),
        ));
    }
    Ok(value)
}

#[async_trait]
impl FocusBackend for HttpBackend {
    async fn register(&self, device: &DeviceIdentity, voice: Voice) -> MonitorResult<UserRef> {
        const OP: &str = "register";
        let body = RegisterRequest {
            device_id: device.id.to_string(),
            name: None,
            email: None,
            voice,
        };
        let response = self.post_json(OP, &["api", "user", "register"], &body).await?;
        let parsed: RegisterResponse = decode(OP, response).await?;
        Ok(UserRef {
            user_id: non_empty(OP, "user_id", parsed.user_id)?,
        })
    }

    async fn start_session(&self, user_id: &str, spec: &SessionSpec) -> MonitorResult<String> {
        const OP: &str = "session start";
        let body = StartRequest {
            user_id,
            goal: spec.goal(),
            duration_minutes: spec.duration_minutes(),
            categories: spec.categories().iter().copied().collect(),
            voice: spec.voice(),
        };
        let response = self.post_json(OP, &["api", "session", "start"], &body).await?;
        let parsed: StartResponse = decode(OP, response).await?;
        non_empty(OP, "session_id", parsed.session_id)
    }

    async fn report_activity(
        &self,
        snapshot: &ActivitySnapshot,
    ) -> MonitorResult<ClassificationDecision> {
        const OP: &str = "activity";
        let response = self
            .post_json(OP, &["api", "session", "activity"], snapshot)
            .await?;
        let parsed: ActivityResponse = decode(OP, response).await?;
        Ok(ClassificationDecision::from_tag(&parsed.decision))
    }

    async fn end_session(&self, session_id: &str) -> MonitorResult<()> {
        const OP: &str = "session end";
        self.post_json(OP, &["api", "session", "end"], &EndRequest { session_id })
            .await?;
        Ok(())
    }

    async fn summary(&self, user_id: &str) -> MonitorResult<SessionSummary> {
        const OP: &str = "summary";
        let response = self.get(OP, &["api", "session", user_id, "summary"]).await?;
        decode(OP, response).await
    }
}
