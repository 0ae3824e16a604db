use crate::error::PipelineResult;
use crate::landmarks::PostureMetrics;
use crate::pipeline::Pipeline;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reference "good posture" metrics
#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    pub lean: f32,
    pub tilt: f32,
}

impl Baseline {
    pub fn new(lean: f32, tilt: f32) -> Self {
        Self { lean, tilt }
    }
}

impl From<PostureMetrics> for Baseline {
    fn from(metrics: PostureMetrics) -> Self {
        Self {
            lean: metrics.forward_lean,
            tilt: metrics.tilt,
        }
    }
}

/// Shared handle to the process baseline.
///
/// Calibration is the only writer and replaces the whole value. Readers get a copy,
/// so a check never sees a half-written baseline.
#[derive(Clone, Default, Debug)]
pub struct CalibrationStore {
    baseline: Arc<RwLock<Baseline>>,
}

impl CalibrationStore {
    pub fn new(baseline: Baseline) -> Self {
        Self {
            baseline: Arc::new(RwLock::new(baseline)),
        }
    }

    pub fn read(&self) -> Baseline {
        *self.baseline.read()
    }

    pub fn store(&self, baseline: Baseline) {
        *self.baseline.write() = baseline;
    }
}

/// Capture a fresh frame and save the first person's metrics as the new baseline.
///
/// The stored baseline is left untouched on any error.
pub fn calibrate(pipeline: &mut Pipeline, store: &CalibrationStore) -> PipelineResult<Baseline> {
    let metrics = pipeline.measure()?;
    let baseline = Baseline::from(metrics);
    store.store(baseline);

    tracing::info!(
        lean = baseline.lean,
        tilt = baseline.tilt,
        "calibration complete"
    );
    Ok(baseline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_starts_at_zero() {
        let store = CalibrationStore::default();
        assert_eq!(store.read(), Baseline::new(0.0, 0.0));
    }

    #[test]
    fn clones_share_the_baseline() {
        let store = CalibrationStore::default();
        let reader = store.clone();
        store.store(Baseline::new(0.3, 0.1));
        assert_eq!(reader.read(), Baseline::new(0.3, 0.1));
    }

    #[test]
    fn baseline_from_metrics() {
        let baseline = Baseline::from(PostureMetrics {
            forward_lean: 0.2,
            tilt: 0.04,
        });
        assert_eq!(baseline, Baseline::new(0.2, 0.04));
    }
}
