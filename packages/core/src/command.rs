use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Every action the menu can request from the monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ToggleMonitoring,
    SetInterval(CheckInterval),
    Calibrate,
    Snapshot,
    TestAlert,
    Quit,
}

/// Selectable spacing between scheduled checks
#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckInterval {
    #[serde(rename = "30s")]
    ThirtySeconds,
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl CheckInterval {
    pub const ALL: [CheckInterval; 4] = [
        CheckInterval::ThirtySeconds,
        CheckInterval::OneMinute,
        CheckInterval::TwoMinutes,
        CheckInterval::FiveMinutes,
    ];

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds())
    }

    pub fn seconds(&self) -> u64 {
        match self {
            CheckInterval::ThirtySeconds => 30,
            CheckInterval::OneMinute => 60,
            CheckInterval::TwoMinutes => 120,
            CheckInterval::FiveMinutes => 300,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckInterval::ThirtySeconds => "30s",
            CheckInterval::OneMinute => "1m",
            CheckInterval::TwoMinutes => "2m",
            CheckInterval::FiveMinutes => "5m",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|interval| interval.label() == label)
    }
}

impl fmt::Display for CheckInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinespy_types::json;

    #[test]
    fn default_is_one_minute() {
        assert_eq!(CheckInterval::default().as_duration(), Duration::from_secs(60));
    }

    #[test]
    fn labels_round_trip_through_lookup() {
        for interval in CheckInterval::ALL {
            assert_eq!(CheckInterval::from_label(interval.label()), Some(interval));
        }
        assert_eq!(CheckInterval::from_label("10m"), None);
    }

    #[test]
    fn serializes_as_label() {
        let value = json::to_string(&CheckInterval::FiveMinutes).unwrap();
        assert_eq!(value, "\"5m\"");
        let parsed: CheckInterval = json::from_str("\"30s\"").unwrap();
        assert_eq!(parsed, CheckInterval::ThirtySeconds);
    }
}
