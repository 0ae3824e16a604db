//! Check cycles driven end to end with scripted camera and model fakes.

use spinespy::landmarks::{LEFT_SHOULDER, NOSE, RIGHT_SHOULDER};
use spinespy::{
    AlertController, AlertDecision, BadReason, Baseline, BoundingBox, CalibrationStore,
    DetectionPolicy, Frame, FrameSource, Landmark, ObjectDetector, Outcome, PHONE_CLASS_ID,
    Pipeline, PipelineError, PipelineResult, PoseDetector, PoseLandmarks, calibrate,
};
use std::sync::{Arc, Mutex};

struct FakeCamera;

impl FrameSource for FakeCamera {
    fn capture(&mut self) -> PipelineResult<Frame> {
        Ok(Frame::new(16, 16))
    }
}

/// Builds a 33-point set whose metrics are exactly (lean, tilt)
fn landmarks_for(lean: f32, tilt: f32) -> PoseLandmarks {
    let mut landmarks = vec![Landmark::default(); 33];
    landmarks[NOSE] = Landmark::new(0.5, 0.25, 0.0);
    landmarks[LEFT_SHOULDER] = Landmark::new(0.625, 0.5 + tilt, lean);
    landmarks[RIGHT_SHOULDER] = Landmark::new(0.375, 0.5, lean);
    PoseLandmarks::new(landmarks, 0.95)
}

#[derive(Clone, Default)]
struct Scene {
    person: Arc<Mutex<Option<(f32, f32)>>>,
    classes: Arc<Mutex<Vec<i32>>>,
}

impl Scene {
    fn person(&self, lean: f32, tilt: f32) {
        *self.person.lock().unwrap() = Some((lean, tilt));
    }

    fn nobody(&self) {
        *self.person.lock().unwrap() = None;
    }

    fn objects(&self, classes: &[i32]) {
        *self.classes.lock().unwrap() = classes.to_vec();
    }
}

struct ScenePose(Scene);

impl PoseDetector for ScenePose {
    fn detect(&mut self, _frame: &Frame) -> PipelineResult<Vec<PoseLandmarks>> {
        Ok(self
            .0
            .person
            .lock()
            .unwrap()
            .map(|(lean, tilt)| vec![landmarks_for(lean, tilt)])
            .unwrap_or_default())
    }
}

struct SceneObjects(Scene);

impl ObjectDetector for SceneObjects {
    fn detect(&mut self, _frame: &Frame) -> PipelineResult<Vec<BoundingBox>> {
        Ok(self
            .0
            .classes
            .lock()
            .unwrap()
            .iter()
            .map(|class_idx| BoundingBox {
                x1: 10.0,
                y1: 10.0,
                x2: 40.0,
                y2: 80.0,
                score: 0.6,
                class_idx: *class_idx,
                class_name: None,
            })
            .collect())
    }
}

fn pipeline(scene: &Scene) -> Pipeline {
    Pipeline::new(
        Box::new(FakeCamera),
        Box::new(ScenePose(scene.clone())),
        Box::new(SceneObjects(scene.clone())),
        DetectionPolicy::default(),
    )
}

mod scenarios {
    use super::*;

    #[test]
    fn a_forward_lean_is_slouching() {
        let scene = Scene::default();
        scene.person(0.12, 0.0);

        let report = pipeline(&scene).check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Bad(BadReason::Slouching));
    }

    #[test]
    fn b_uneven_shoulders_are_tilting() {
        let scene = Scene::default();
        scene.person(0.0, 0.06);

        let report = pipeline(&scene).check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Bad(BadReason::Tilting));
    }

    #[test]
    fn c_good_posture_then_phone() {
        let scene = Scene::default();
        scene.person(0.05, 0.02);
        let mut pipeline = pipeline(&scene);

        let report = pipeline.check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Good);
        assert_eq!(report.phone, Some(false));

        scene.objects(&[0, PHONE_CLASS_ID]);
        let report = pipeline.check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Bad(BadReason::PhoneDetected));
    }

    #[test]
    fn d_five_slouches_alert_once() {
        let scene = Scene::default();
        scene.person(0.3, 0.0);
        let mut pipeline = pipeline(&scene);
        let mut alerts = AlertController::default();

        let decisions: Vec<_> = (0..6)
            .map(|_| {
                let report = pipeline.check(&Baseline::default()).unwrap();
                alerts.record(&report.outcome)
            })
            .collect();

        assert_eq!(
            decisions,
            vec![
                AlertDecision::Counting(1),
                AlertDecision::Counting(2),
                AlertDecision::Counting(3),
                AlertDecision::Counting(4),
                AlertDecision::Fire,
                AlertDecision::Counting(1),
            ]
        );
    }
}

mod phone {
    use super::*;

    #[test]
    fn checked_when_nobody_is_in_frame() {
        let scene = Scene::default();
        scene.nobody();
        scene.objects(&[PHONE_CLASS_ID]);

        let report = pipeline(&scene).check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Bad(BadReason::PhoneDetected));
        assert_eq!(report.people, 0);
    }

    #[test]
    fn posture_wins_over_phone() {
        let scene = Scene::default();
        scene.person(0.0, 0.2);
        scene.objects(&[PHONE_CLASS_ID]);

        let report = pipeline(&scene).check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Bad(BadReason::Tilting));
        assert_eq!(report.phone, None);
    }

    #[test]
    fn other_class_ids_are_configurable() {
        let scene = Scene::default();
        scene.objects(&[PHONE_CLASS_ID]);
        let mut pipeline = Pipeline::new(
            Box::new(FakeCamera),
            Box::new(ScenePose(scene.clone())),
            Box::new(SceneObjects(scene.clone())),
            DetectionPolicy {
                phone_class_id: 73,
                ..Default::default()
            },
        );

        let report = pipeline.check(&Baseline::default()).unwrap();
        assert_eq!(report.outcome, Outcome::Good);
    }
}

mod calibration {
    use super::*;

    #[test]
    fn calibrating_twice_is_idempotent() {
        let scene = Scene::default();
        scene.person(0.4, 0.08);
        let mut pipeline = pipeline(&scene);
        let store = CalibrationStore::default();

        let first = calibrate(&mut pipeline, &store).unwrap();
        let second = calibrate(&mut pipeline, &store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.read(), second);

        let report = pipeline.check(&store.read()).unwrap();
        assert_eq!(report.outcome, Outcome::Good);
        let deltas = report.deltas.unwrap();
        assert_eq!(deltas.lean, 0.0);
        assert_eq!(deltas.tilt, 0.0);
    }

    #[test]
    fn baseline_moves_the_thresholds() {
        let scene = Scene::default();
        scene.person(0.4, 0.0);
        let mut pipeline = pipeline(&scene);
        let store = CalibrationStore::default();

        assert_eq!(
            pipeline.check(&store.read()).unwrap().outcome,
            Outcome::Bad(BadReason::Slouching)
        );

        calibrate(&mut pipeline, &store).unwrap();
        assert_eq!(pipeline.check(&store.read()).unwrap().outcome, Outcome::Good);
    }

    #[test]
    fn failure_leaves_baseline_untouched() {
        let scene = Scene::default();
        scene.nobody();
        let mut pipeline = pipeline(&scene);
        let store = CalibrationStore::new(Baseline::new(0.1, 0.02));

        let err = calibrate(&mut pipeline, &store).unwrap_err();
        assert!(matches!(err, PipelineError::NoPersonDetected));
        assert_eq!(store.read(), Baseline::new(0.1, 0.02));
    }
}
