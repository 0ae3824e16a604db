//! # BlazePose landmark model
//!
//! The model takes a `[1, H, W, 3]` image in 0-1 and returns a flat landmark tensor of
//! `N x 5` values (x, y, z, visibility, presence) in input pixels plus a single pose
//! presence score. Output names differ between conversions, so outputs are told apart
//! by shape.
use spinespy::landmarks::{Landmark, PoseLandmarks};

/// BlazePose full body topology
pub const BLAZEPOSE_LANDMARKS: usize = 33;
const VALUES_PER_LANDMARK: usize = 5;

pub struct BlazePoseLike {
    pub input_width: u32,
    pub input_height: u32,
    /// Minimum presence score for a person to count
    pub min_presence: f32,
}

impl Default for BlazePoseLike {
    fn default() -> Self {
        Self {
            input_width: 256,
            input_height: 256,
            min_presence: 0.5,
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Scores outside 0-1 are raw logits
fn as_probability(score: f32) -> f32 {
    if (0.0..=1.0).contains(&score) {
        score
    } else {
        sigmoid(score)
    }
}

impl BlazePoseLike {
    /// Turn raw model outputs into at most one normalized landmark set.
    pub fn decode(&self, raw: &[f32], presence: f32) -> Option<PoseLandmarks> {
        let presence = as_probability(presence);
        if presence < self.min_presence {
            tracing::debug!(presence, "no person in frame");
            return None;
        }

        let count = raw.len() / VALUES_PER_LANDMARK;
        if count < BLAZEPOSE_LANDMARKS {
            tracing::warn!(count, "landmark tensor too small");
            return None;
        }

        let width = self.input_width as f32;
        let height = self.input_height as f32;
        let landmarks = raw
            .chunks_exact(VALUES_PER_LANDMARK)
            .take(BLAZEPOSE_LANDMARKS)
            .map(|values| Landmark {
                x: values[0] / width,
                y: values[1] / height,
                // depth shares the x scale
                z: values[2] / width,
                visibility: sigmoid(values[3]),
            })
            .collect();

        Some(PoseLandmarks::new(landmarks, presence))
    }
}

/// Whether a tensor shape looks like the flat landmark output
pub fn is_landmark_output(shape: &[usize]) -> bool {
    let len: usize = shape.iter().product();
    shape.len() <= 3
        && len.is_multiple_of(VALUES_PER_LANDMARK)
        && len >= BLAZEPOSE_LANDMARKS * VALUES_PER_LANDMARK
}

/// Whether a tensor shape holds a single score
pub fn is_presence_output(shape: &[usize]) -> bool {
    shape.iter().product::<usize>() == 1
}

#[cfg(feature = "execute")]
pub use onnx::OnnxPoseDetector;

#[cfg(feature = "execute")]
mod onnx {
    use super::{BlazePoseLike, is_landmark_output, is_presence_output};
    use crate::load::{TensorLayout, determine_input_shape, load_session};
    use crate::preprocess::img_to_nhwc;
    use ort::{inputs, session::Session, value::Value};
    use spinespy::detection::{Frame, PoseDetector};
    use spinespy::error::{PipelineError, PipelineResult};
    use spinespy::landmarks::PoseLandmarks;
    use spinespy_types::{Result, anyhow};
    use std::path::Path;

    pub struct OnnxPoseDetector {
        session: Session,
        input_name: String,
        output_names: Vec<String>,
        provider: BlazePoseLike,
    }

    impl OnnxPoseDetector {
        pub fn load(path: &Path) -> Result<Self> {
            let session = load_session(path)?;
            let input_name = session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or(anyhow!("Pose model has no inputs"))?;
            let (input_width, input_height) =
                determine_input_shape(&session, &input_name, TensorLayout::Nhwc)
                    .unwrap_or((256, 256));
            let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

            tracing::info!(
                model = %path.display(),
                input_width,
                input_height,
                "pose model loaded"
            );

            Ok(Self {
                session,
                input_name,
                output_names,
                provider: BlazePoseLike {
                    input_width,
                    input_height,
                    ..Default::default()
                },
            })
        }

        fn run(&mut self, frame: &Frame) -> Result<Vec<PoseLandmarks>> {
            let arr = img_to_nhwc(
                frame,
                self.provider.input_width,
                self.provider.input_height,
            )?;
            let outputs = self
                .session
                .run(inputs![self.input_name.as_str() => Value::from_array(arr)?])?;

            let mut landmarks: Option<Vec<f32>> = None;
            let mut presence: Option<f32> = None;
            for name in &self.output_names {
                let tensor = outputs[name.as_str()].try_extract_array::<f32>()?;
                let shape = tensor.shape().to_vec();
                if landmarks.is_none() && is_landmark_output(&shape) {
                    landmarks = Some(tensor.iter().copied().collect());
                } else if presence.is_none() && is_presence_output(&shape) {
                    presence = tensor.iter().next().copied();
                }
            }

            let landmarks = landmarks.ok_or(anyhow!("Pose model returned no landmark tensor"))?;
            let presence = presence.unwrap_or(1.0);
            Ok(self
                .provider
                .decode(&landmarks, presence)
                .into_iter()
                .collect())
        }
    }

    impl PoseDetector for OnnxPoseDetector {
        fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<PoseLandmarks>> {
            self.run(frame)
                .map_err(|e| PipelineError::Inference(e.to_string()))
        }
    }
}
