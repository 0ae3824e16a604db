//! SpineSpy vision - the camera and model side of the check cycle
//!
//! Everything here plugs into the seams defined in `spinespy::detection`.
//!
//! | Piece | Feature |
//! |-------|---------|
//! | Webcam capture (`nokhwa`) | `camera` |
//! | BlazePose landmarks, YOLO objects (`ort`) | `execute` |
//! | CoreML execution provider | `coreml` |
//! | Output decoding, model download | always |

pub mod assets;
pub mod camera;
pub mod detection;
pub mod execution_providers;
pub mod pose;
pub mod preprocess;

#[cfg(feature = "execute")]
pub mod load;

pub use assets::{
    AssetError, AssetResult, DownloadPolicy, ModelSource, POSE_MODEL_FILE, POSE_MODEL_URL,
    ensure_asset,
};
pub use camera::{CameraOptions, StillFrameSource};
pub use execution_providers::{ExecutionProviderInfo, initialize_ort, is_initialized};

#[cfg(feature = "camera")]
pub use camera::{WebcamFrameSource, request_camera_access};
#[cfg(feature = "execute")]
pub use detection::OnnxObjectDetector;
#[cfg(feature = "execute")]
pub use pose::OnnxPoseDetector;
