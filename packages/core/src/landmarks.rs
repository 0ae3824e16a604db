use serde::{Deserialize, Serialize};

/// Index of the nose in the BlazePose topology
pub const NOSE: usize = 0;
/// Index of the left shoulder in the BlazePose topology
pub const LEFT_SHOULDER: usize = 11;
/// Index of the right shoulder in the BlazePose topology
pub const RIGHT_SHOULDER: usize = 12;

/// Minimum number of landmarks a set needs before metrics can be extracted
pub const MIN_LANDMARKS: usize = RIGHT_SHOULDER + 1;

/// A single estimated body joint
#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    /// X coordinate, normalized to image width
    pub x: f32,
    /// Y coordinate, normalized to image height
    pub y: f32,
    /// Depth relative to the hips, smaller is closer to the camera
    pub z: f32,
    /// Visibility score reported by the model
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }
}

/// All landmarks found for one person in one frame
#[derive(Default, Serialize, Deserialize, Clone, Debug)]
pub struct PoseLandmarks {
    pub landmarks: Vec<Landmark>,
    /// Presence score of the person (0.0-1.0)
    pub score: f32,
}

impl PoseLandmarks {
    pub fn new(landmarks: Vec<Landmark>, score: f32) -> Self {
        Self { landmarks, score }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn metrics(&self) -> Option<PostureMetrics> {
        posture_metrics(&self.landmarks)
    }
}

/// Scalar posture measurements derived from one landmark set
#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PostureMetrics {
    /// Average shoulder depth minus nose depth
    pub forward_lean: f32,
    /// Absolute vertical distance between the shoulders
    pub tilt: f32,
}

/// Extract forward lean and shoulder tilt.
///
/// Returns `None` when the set is too short to contain the nose and both shoulders.
pub fn posture_metrics(landmarks: &[Landmark]) -> Option<PostureMetrics> {
    if landmarks.len() < MIN_LANDMARKS {
        return None;
    }

    let nose = landmarks[NOSE];
    let left_shoulder = landmarks[LEFT_SHOULDER];
    let right_shoulder = landmarks[RIGHT_SHOULDER];

    let shoulder_z = (left_shoulder.z + right_shoulder.z) / 2.0;
    Some(PostureMetrics {
        forward_lean: shoulder_z - nose.z,
        tilt: (left_shoulder.y - right_shoulder.y).abs(),
    })
}
