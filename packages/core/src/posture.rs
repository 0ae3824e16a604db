use crate::calibration::Baseline;
use crate::landmarks::PostureMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Forward lean beyond the baseline that counts as slouching
pub const SLOUCH_THRESHOLD: f32 = 0.1;
/// Shoulder tilt beyond the baseline that counts as leaning sideways
pub const TILT_THRESHOLD: f32 = 0.05;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PostureThresholds {
    pub slouch: f32,
    pub tilt: f32,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            slouch: SLOUCH_THRESHOLD,
            tilt: TILT_THRESHOLD,
        }
    }
}

/// Why a cycle was classified as bad
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadReason {
    Slouching,
    Tilting,
    PhoneDetected,
}

impl BadReason {
    pub fn label(&self) -> &'static str {
        match self {
            BadReason::Slouching => "Slouching",
            BadReason::Tilting => "Tilting",
            BadReason::PhoneDetected => "Phone detected",
        }
    }
}

impl fmt::Display for BadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one check cycle
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Good,
    Bad(BadReason),
}

impl Outcome {
    pub fn is_bad(&self) -> bool {
        matches!(self, Outcome::Bad(_))
    }

    pub fn reason(&self) -> Option<BadReason> {
        match self {
            Outcome::Good => None,
            Outcome::Bad(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Good => f.write_str("Good posture"),
            Outcome::Bad(reason) => write!(f, "Bad: {reason}"),
        }
    }
}

/// Difference between the current metrics and the calibrated baseline
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PostureDeltas {
    pub lean: f32,
    pub tilt: f32,
}

impl PostureDeltas {
    pub fn between(metrics: &PostureMetrics, baseline: &Baseline) -> Self {
        Self {
            lean: metrics.forward_lean - baseline.lean,
            tilt: metrics.tilt - baseline.tilt,
        }
    }
}

/// Classify posture against the baseline. Slouching wins over tilting.
pub fn evaluate(
    metrics: &PostureMetrics,
    baseline: &Baseline,
    thresholds: &PostureThresholds,
) -> (Outcome, PostureDeltas) {
    let deltas = PostureDeltas::between(metrics, baseline);

    tracing::debug!(
        lean_delta = deltas.lean,
        lean_threshold = thresholds.slouch,
        tilt_delta = deltas.tilt,
        tilt_threshold = thresholds.tilt,
        "posture deltas"
    );

    let outcome = if deltas.lean >= thresholds.slouch {
        Outcome::Bad(BadReason::Slouching)
    } else if deltas.tilt >= thresholds.tilt {
        Outcome::Bad(BadReason::Tilting)
    } else {
        Outcome::Good
    };

    (outcome, deltas)
}
