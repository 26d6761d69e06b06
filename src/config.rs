use anyhow::{anyhow, Result};
use log::warn;
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Runtime knobs for the monitor. Read from `FOCUSAI_*` environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub backend_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub debug: bool,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests can avoid
    /// touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend_url = lookup("FOCUSAI_BACKEND_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let poll_interval = Duration::from_secs(secs_or_default(
            &lookup,
            "FOCUSAI_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        ));
        let request_timeout = Duration::from_secs(secs_or_default(
            &lookup,
            "FOCUSAI_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));

        let data_dir = match lookup("FOCUSAI_DATA_DIR").filter(|value| !value.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("focusai"))
                .ok_or_else(|| anyhow!("no data directory available; set FOCUSAI_DATA_DIR"))?,
        };

        let debug = lookup("FOCUSAI_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            backend_url: normalize_base_url(&backend_url),
            poll_interval,
            request_timeout,
            data_dir,
            debug,
        })
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn secs_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warn!("{key} must be positive; using {default}");
            default
        }
        Ok(secs) => secs,
        Err(err) => {
            warn!("{key}='{raw}' is not a number ({err}); using {default}");
            default
        }
    }
}
