use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 180;
pub const DURATION_STEP_MINUTES: u32 = 15;
pub const DEFAULT_DURATION_MINUTES: u32 = 45;

/// Companion voice requested for the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    Cluely,
    Calm,
    Energetic,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Cluely => "Cluely",
            Voice::Calm => "Calm",
            Voice::Energetic => "Energetic",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "cluely" => Ok(Voice::Cluely),
            "calm" => Ok(Voice::Calm),
            "energetic" => Ok(Voice::Energetic),
            other => Err(MonitorError::InvalidSpec(format!("unknown voice '{other}'"))),
        }
    }
}

/// Distraction category the backend should watch for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    Nsfw,
    Games,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Social => "social",
            Category::Nsfw => "nsfw",
            Category::Games => "games",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "social" => Ok(Category::Social),
            "nsfw" => Ok(Category::Nsfw),
            "games" => Ok(Category::Games),
            other => Err(MonitorError::InvalidSpec(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

/// Parameters declared when a session starts. Validated once, immutable after.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    goal: String,
    duration_minutes: u32,
    categories: BTreeSet<Category>,
    voice: Voice,
}

impl SessionSpec {
    pub fn new(
        goal: impl Into<String>,
        duration_minutes: u32,
        categories: impl IntoIterator<Item = Category>,
        voice: Voice,
    ) -> MonitorResult<Self> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes)
            || duration_minutes % DURATION_STEP_MINUTES != 0
        {
            return Err(MonitorError::InvalidSpec(format!(
                "duration must be {MIN_DURATION_MINUTES}-{MAX_DURATION_MINUTES} minutes in steps of {DURATION_STEP_MINUTES}, got {duration_minutes}"
            )));
        }

        Ok(Self {
            goal: goal.into(),
            duration_minutes,
            categories: categories.into_iter().collect(),
            voice,
        })
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.duration_minutes) * 60)
    }

    pub fn categories(&self) -> &BTreeSet<Category> {
        &self.categories
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }
}

/// The one live session, as acknowledged by the backend.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: String,
    pub spec: SessionSpec,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_step_in_range() {
        for minutes in (15..=180).step_by(15) {
            assert!(SessionSpec::new("g", minutes, [], Voice::Calm).is_ok());
        }
    }

    #[test]
    fn rejects_out_of_range_and_off_step_durations() {
        for minutes in [0, 10, 20, 195, 181] {
            let err = SessionSpec::new("g", minutes, [], Voice::Calm).unwrap_err();
            assert!(matches!(err, MonitorError::InvalidSpec(_)), "{minutes}");
        }
    }

    #[test]
    fn duplicate_categories_collapse() {
        let spec = SessionSpec::new(
            "Write essay",
            45,
            [Category::Social, Category::Games, Category::Social],
            Voice::Cluely,
        )
        .unwrap();
        assert_eq!(spec.categories().len(), 2);
        assert_eq!(spec.duration().as_secs(), 45 * 60);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("energetic".parse::<Voice>().unwrap(), Voice::Energetic);
        assert_eq!("NSFW".parse::<Category>().unwrap(), Category::Nsfw);
        assert!("work".parse::<Category>().is_err());
    }

    #[test]
    fn wire_names_match_backend_contract() {
        assert_eq!(serde_json::to_string(&Voice::Cluely).unwrap(), "\"Cluely\"");
        assert_eq!(serde_json::to_string(&Category::Games).unwrap(), "\"games\"");
    }
}
