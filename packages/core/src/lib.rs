//! SpineSpy core - posture and phone checks for a menu-bar watcher
//!
//! Each check captures one webcam frame, measures forward lean and shoulder tilt from
//! the first person's landmarks, compares them to a calibrated baseline and, when posture
//! is fine, looks for a phone in the frame. Five bad checks in a row sound an alert.
//!
//! | Piece | Module |
//! |-------|--------|
//! | Landmark metrics | [`landmarks`] |
//! | Baseline comparison | [`posture`] |
//! | Shared baseline | [`calibration`] |
//! | Streak and alert | [`alert`] |
//! | Camera and model seams | [`detection`] |
//! | One check | [`pipeline`] |
//! | Schedule and commands | [`monitor`] |

pub mod alert;
pub mod calibration;
pub mod command;
pub mod detection;
pub mod error;
pub mod landmarks;
pub mod monitor;
pub mod pipeline;
pub mod posture;

pub use alert::{AlertController, AlertDecision, Alerter, BAD_STREAK_LIMIT};
pub use calibration::{Baseline, CalibrationStore, calibrate};
pub use command::{CheckInterval, Command};
pub use detection::{
    BoundingBox, Frame, FrameSource, ObjectDetector, PHONE_CLASS_ID, PoseDetector, phone_present,
};
pub use error::{AlertError, PipelineError, PipelineResult};
pub use landmarks::{Landmark, PoseLandmarks, PostureMetrics, posture_metrics};
pub use monitor::{Monitor, MonitorEvent, MonitorHandle, MonitorOptions};
pub use pipeline::{CycleReport, DetectionPolicy, Pipeline, Snapshot};
pub use posture::{BadReason, Outcome, PostureDeltas, PostureThresholds, evaluate};
