use serde::{Deserialize, Serialize};

use crate::models::ClassificationDecision;

const FALLBACK_TARGET: &str = "your main work";

/// What the blocking overlay should show. Always derived from the latest
/// decision and the live session's goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub visible: bool,
    pub target_title: String,
}

impl OverlayState {
    /// Text for the "Return to: ..." line.
    pub fn display_target(&self) -> &str {
        if self.target_title.trim().is_empty() {
            FALLBACK_TARGET
        } else {
            &self.target_title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayTransition {
    pub state: OverlayState,
    /// Set only when the overlay just went from hidden to visible.
    pub alert: bool,
}

#[derive(Debug, Default)]
pub struct OverlayMapper {
    state: OverlayState,
}

impl OverlayMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn apply(&mut self, decision: ClassificationDecision, goal: &str) -> OverlayTransition {
        let was_visible = self.state.visible;
        match decision {
            ClassificationDecision::Irrelevant => {
                self.state.visible = true;
                self.state.target_title = goal.to_string();
            }
            ClassificationDecision::Relevant => {
                self.state.visible = false;
            }
        }

        OverlayTransition {
            state: self.state.clone(),
            alert: self.state.visible && !was_visible,
        }
    }

    /// Session ended: hide no matter what the last decision was.
    pub fn reset(&mut self) -> OverlayState {
        self.state.visible = false;
        self.state.clone()
    }

    /// User pressed "Go Back". Hides the overlay without touching the session;
    /// the next irrelevant tick raises it (and the alert) again.
    pub fn dismiss(&mut self) -> OverlayState {
        self.state.visible = false;
        self.state.clone()
    }
}
