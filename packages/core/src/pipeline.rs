use crate::calibration::Baseline;
use crate::detection::{
    Frame, FrameSource, ObjectDetector, PHONE_CLASS_ID, PoseDetector, phone_present,
};
use crate::error::{PipelineError, PipelineResult};
use crate::landmarks::PostureMetrics;
use crate::posture::{BadReason, Outcome, PostureDeltas, PostureThresholds, evaluate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for turning detections into an outcome
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DetectionPolicy {
    pub thresholds: PostureThresholds,
    pub phone_class_id: i32,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            thresholds: PostureThresholds::default(),
            phone_class_id: PHONE_CLASS_ID,
        }
    }
}

/// Everything one analysis found out about a frame
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub outcome: Outcome,
    /// Number of people the pose model returned
    pub people: usize,
    pub metrics: Option<PostureMetrics>,
    pub deltas: Option<PostureDeltas>,
    /// `None` when bad posture short-circuited the object detector
    pub phone: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub path: PathBuf,
    /// Analysis of the saved frame, if it could be run
    pub report: Option<CycleReport>,
}

/// Camera plus both models. Only one caller may drive it at a time.
pub struct Pipeline {
    source: Box<dyn FrameSource>,
    pose: Box<dyn PoseDetector>,
    objects: Box<dyn ObjectDetector>,
    policy: DetectionPolicy,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        pose: Box<dyn PoseDetector>,
        objects: Box<dyn ObjectDetector>,
        policy: DetectionPolicy,
    ) -> Self {
        Self {
            source,
            pose,
            objects,
            policy,
        }
    }

    pub fn policy(&self) -> &DetectionPolicy {
        &self.policy
    }

    pub fn capture(&mut self) -> PipelineResult<Frame> {
        self.source.capture()
    }

    /// Run one full check: capture, then analyze against the baseline.
    pub fn check(&mut self, baseline: &Baseline) -> PipelineResult<CycleReport> {
        let frame = self.capture()?;
        self.analyze(&frame, baseline)
    }

    /// Classify a frame. Bad posture skips the object detector.
    pub fn analyze(&mut self, frame: &Frame, baseline: &Baseline) -> PipelineResult<CycleReport> {
        let people = self.pose.detect(frame)?;
        let mut report = CycleReport {
            outcome: Outcome::Good,
            people: people.len(),
            metrics: None,
            deltas: None,
            phone: None,
        };

        match people.first().and_then(|person| person.metrics()) {
            Some(metrics) => {
                tracing::debug!(
                    forward_lean = metrics.forward_lean,
                    tilt = metrics.tilt,
                    baseline_lean = baseline.lean,
                    baseline_tilt = baseline.tilt,
                    "posture metrics"
                );
                let (outcome, deltas) = evaluate(&metrics, baseline, &self.policy.thresholds);
                report.metrics = Some(metrics);
                report.deltas = Some(deltas);

                if outcome.is_bad() {
                    tracing::debug!(%outcome, "posture check failed, skipping object detection");
                    report.outcome = outcome;
                    return Ok(report);
                }
            }
            None => tracing::debug!(people = people.len(), "no usable pose in frame"),
        }

        let detections = self.objects.detect(frame)?;
        tracing::debug!(count = detections.len(), "object detections");

        let phone = phone_present(&detections, self.policy.phone_class_id);
        report.phone = Some(phone);
        if phone {
            report.outcome = Outcome::Bad(BadReason::PhoneDetected);
        }

        Ok(report)
    }

    /// Capture a frame and return the first person's metrics.
    pub fn measure(&mut self) -> PipelineResult<PostureMetrics> {
        let frame = self.capture()?;
        let people = self.pose.detect(&frame)?;
        people
            .first()
            .and_then(|person| person.metrics())
            .ok_or(PipelineError::NoPersonDetected)
    }

    /// Save the current frame as a timestamped JPEG and analyze it.
    pub fn snapshot(&mut self, dir: &Path, baseline: &Baseline) -> PipelineResult<Snapshot> {
        let frame = self.capture()?;

        let name = format!(
            "snapshot_{}.jpg",
            chrono::Local::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let path = dir.join(name);
        let snapshot_error = |message: String| PipelineError::Snapshot {
            path: path.clone(),
            message,
        };

        std::fs::create_dir_all(dir).map_err(|e| snapshot_error(e.to_string()))?;
        frame
            .save(&path)
            .map_err(|e| snapshot_error(e.to_string()))?;
        tracing::info!(path = %path.display(), "snapshot saved");

        let report = match self.analyze(&frame, baseline) {
            Ok(report) => {
                tracing::info!(
                    outcome = %report.outcome,
                    people = report.people,
                    phone = ?report.phone,
                    "snapshot analysis"
                );
                Some(report)
            }
            Err(error) => {
                tracing::warn!(%error, "snapshot analysis failed");
                None
            }
        };

        Ok(Snapshot { path, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use crate::landmarks::{LEFT_SHOULDER, Landmark, NOSE, PoseLandmarks, RIGHT_SHOULDER};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StillCamera;

    impl FrameSource for StillCamera {
        fn capture(&mut self) -> PipelineResult<Frame> {
            Ok(Frame::from_pixel(8, 8, spinespy_types::image::Rgb([120, 90, 60])))
        }
    }

    struct BrokenCamera;

    impl FrameSource for BrokenCamera {
        fn capture(&mut self) -> PipelineResult<Frame> {
            Err(PipelineError::CameraUnavailable("no device".into()))
        }
    }

    struct FixedPose(Vec<PoseLandmarks>);

    impl PoseDetector for FixedPose {
        fn detect(&mut self, _frame: &Frame) -> PipelineResult<Vec<PoseLandmarks>> {
            Ok(self.0.clone())
        }
    }

    struct CountingObjects {
        classes: Vec<i32>,
        calls: Arc<AtomicUsize>,
    }

    impl ObjectDetector for CountingObjects {
        fn detect(&mut self, _frame: &Frame) -> PipelineResult<Vec<BoundingBox>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .classes
                .iter()
                .map(|class_idx| BoundingBox {
                    class_idx: *class_idx,
                    score: 0.9,
                    ..Default::default()
                })
                .collect())
        }
    }

    fn person(lean: f32, tilt: f32) -> PoseLandmarks {
        let mut landmarks = vec![Landmark::default(); 33];
        landmarks[NOSE] = Landmark::new(0.5, 0.3, -lean);
        landmarks[LEFT_SHOULDER] = Landmark::new(0.6, 0.5 + tilt, 0.0);
        landmarks[RIGHT_SHOULDER] = Landmark::new(0.4, 0.5, 0.0);
        PoseLandmarks::new(landmarks, 0.99)
    }

    fn pipeline(
        source: impl FrameSource + 'static,
        people: Vec<PoseLandmarks>,
        classes: Vec<i32>,
    ) -> (Pipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let objects = CountingObjects {
            classes,
            calls: calls.clone(),
        };
        let pipeline = Pipeline::new(
            Box::new(source),
            Box::new(FixedPose(people)),
            Box::new(objects),
            DetectionPolicy::default(),
        );
        (pipeline, calls)
    }

    #[test]
    fn bad_posture_skips_object_detection() {
        let (mut pipeline, calls) = pipeline(StillCamera, vec![person(0.5, 0.0)], vec![67]);
        let report = pipeline.check(&Baseline::default()).unwrap();

        assert_eq!(report.outcome, Outcome::Bad(BadReason::Slouching));
        assert_eq!(report.phone, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn phone_checked_when_nobody_is_there() {
        let (mut pipeline, calls) = pipeline(StillCamera, vec![], vec![67]);
        let report = pipeline.check(&Baseline::default()).unwrap();

        assert_eq!(report.outcome, Outcome::Bad(BadReason::PhoneDetected));
        assert_eq!(report.people, 0);
        assert_eq!(report.metrics, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_landmark_set_counts_as_no_pose() {
        let partial = PoseLandmarks::new(vec![Landmark::default(); 5], 0.8);
        let (mut pipeline, _) = pipeline(StillCamera, vec![partial], vec![]);
        let report = pipeline.check(&Baseline::default()).unwrap();

        assert_eq!(report.outcome, Outcome::Good);
        assert_eq!(report.people, 1);
        assert_eq!(report.phone, Some(false));
    }

    #[test]
    fn camera_failure_is_returned() {
        let (mut pipeline, calls) = pipeline(BrokenCamera, vec![person(0.0, 0.0)], vec![]);
        let err = pipeline.check(&Baseline::default()).unwrap_err();

        assert!(err.is_camera_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn measure_needs_a_person() {
        let (mut pipeline, _) = pipeline(StillCamera, vec![], vec![]);
        assert!(matches!(
            pipeline.measure(),
            Err(PipelineError::NoPersonDetected)
        ));
    }

    #[test]
    fn snapshot_writes_jpeg_and_analyzes() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("snapshots");
        let (mut pipeline, _) = pipeline(StillCamera, vec![person(0.0, 0.0)], vec![0]);

        let snapshot = pipeline.snapshot(&target, &Baseline::default()).unwrap();

        assert!(snapshot.path.starts_with(&target));
        assert_eq!(
            snapshot.path.extension().and_then(|ext| ext.to_str()),
            Some("jpg")
        );
        assert!(snapshot.path.exists());
        assert_eq!(snapshot.report.map(|r| r.outcome), Some(Outcome::Good));
    }
}
