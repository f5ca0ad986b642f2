use serde::{Deserialize, Serialize};

/// localStorage key shared by every scene page.
pub const STORAGE_KEY: &str = "crossy-lanes.handoff";

pub const DEFAULT_TOTAL_REPORTS: u32 = 8;
pub const DEFAULT_TIME_MS: f64 = 120_000.0;

/// Flat record carried between scene pages. Every field defaults so a
/// record written by an older page, or no record at all, still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneHandoff {
    pub reports_collected: u32,
    pub total_reports: u32,
    pub time_ms_left: f64,
}

impl Default for SceneHandoff {
    fn default() -> Self {
        SceneHandoff {
            reports_collected: 0,
            total_reports: DEFAULT_TOTAL_REPORTS,
            time_ms_left: DEFAULT_TIME_MS,
        }
    }
}

impl SceneHandoff {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Tolerant decode: unknown garbage falls back to the defaults.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_the_fixed_defaults() {
        let record = SceneHandoff::from_json(r#"{"reportsCollected": 3}"#);
        assert_eq!(record.reports_collected, 3);
        assert_eq!(record.total_reports, DEFAULT_TOTAL_REPORTS);
        assert_eq!(record.time_ms_left, DEFAULT_TIME_MS);
    }

    #[test]
    fn garbage_decodes_to_defaults() {
        assert_eq!(SceneHandoff::from_json("not json"), SceneHandoff::default());
        assert_eq!(SceneHandoff::from_json(""), SceneHandoff::default());
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = SceneHandoff { reports_collected: 2, total_reports: 5, time_ms_left: 9_000.0 }.to_json();
        assert!(json.contains("reportsCollected"));
        assert!(json.contains("totalReports"));
        assert!(json.contains("timeMsLeft"));
        let back = SceneHandoff::from_json(&json);
        assert_eq!(back.reports_collected, 2);
        assert_eq!(back.time_ms_left, 9_000.0);
    }
}
