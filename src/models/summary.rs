use serde::{Deserialize, Serialize};

/// Aggregate statistics computed by the backend. Fetched on demand, never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    #[serde(default)]
    pub total_focus_seconds: u64,
    #[serde(default)]
    pub distractions_blocked: u64,
    #[serde(default)]
    pub streak_days: u64,
}

impl SessionSummary {
    pub fn total_focus_minutes(&self) -> u64 {
        (self.total_focus_seconds + 30) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_decode_as_zero() {
        let summary: SessionSummary = serde_json::from_str(r#"{"streak_days":3}"#).unwrap();
        assert_eq!(summary.total_focus_seconds, 0);
        assert_eq!(summary.distractions_blocked, 0);
        assert_eq!(summary.streak_days, 3);
    }

    #[test]
    fn focus_minutes_round_to_nearest() {
        let summary = SessionSummary {
            total_focus_seconds: 89,
            ..Default::default()
        };
        assert_eq!(summary.total_focus_minutes(), 1);
        let summary = SessionSummary {
            total_focus_seconds: 90,
            ..Default::default()
        };
        assert_eq!(summary.total_focus_minutes(), 2);
    }
}
