use log::warn;
use serde::{Deserialize, Serialize};

/// What the user is looking at right now, as reported by a context source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityContext {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub idle: bool,
}

/// One poll tick's payload. Built fresh per tick, never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub session_id: String,
    pub user_id: Option<String>,
    pub title: String,
    pub url: String,
    pub idle: bool,
}

impl ActivitySnapshot {
    pub fn new(session_id: &str, user_id: Option<&str>, context: ActivityContext) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            title: context.title,
            url: context.url,
            idle: context.idle,
        }
    }
}

/// The backend's verdict on a snapshot.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationDecision {
    Relevant,
    Irrelevant,
}

impl ClassificationDecision {
    /// Maps a wire tag onto the closed set. Advisory tags the overlay does not
    /// understand count as `Relevant`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "relevant" => ClassificationDecision::Relevant,
            "irrelevant" => ClassificationDecision::Irrelevant,
            other => {
                warn!("Unrecognized decision tag '{other}', treating as relevant");
                ClassificationDecision::Relevant
            }
        }
    }
}
