//! # YOLO object detection
//!
//! Two output layouts are understood:
//! - end-to-end exports: `[1, N, 6]` rows of (x1, y1, x2, y2, score, class)
//! - raw exports: `[1, 4 + classes, anchors]` of (cx, cy, w, h, class scores...),
//!   filtered with per-class non-maximum suppression

use ndarray::{ArrayView2, ArrayView3, Axis};
use spinespy::detection::BoundingBox;

pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

pub fn class_name(class_idx: i32) -> Option<String> {
    usize::try_from(class_idx)
        .ok()
        .and_then(|idx| COCO_CLASS_NAMES.get(idx))
        .map(|name| name.to_string())
}

/// YOLO model provider
pub struct YoloLike {
    pub input_width: u32,
    pub input_height: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for YoloLike {
    fn default() -> Self {
        Self {
            input_width: 640,
            input_height: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.7,
        }
    }
}

impl YoloLike {
    /// Decode a `[1, ..]` output into boxes in original image pixels.
    pub fn decode(
        &self,
        output: ArrayView3<'_, f32>,
        original_width: u32,
        original_height: u32,
    ) -> Vec<BoundingBox> {
        let output = output.index_axis_move(Axis(0), 0);
        let mut boxes = if output.ncols() == 6 {
            self.decode_end_to_end(output)
        } else {
            self.decode_raw(output)
        };

        let scale_x = original_width as f32 / self.input_width as f32;
        let scale_y = original_height as f32 / self.input_height as f32;
        for bbox in &mut boxes {
            bbox.scale(scale_x, scale_y);
        }
        boxes
    }

    fn decode_end_to_end(&self, rows: ArrayView2<'_, f32>) -> Vec<BoundingBox> {
        rows.outer_iter()
            .filter(|row| row[4] >= self.conf_threshold)
            .map(|row| {
                let class_idx = row[5].round() as i32;
                BoundingBox {
                    x1: row[0],
                    y1: row[1],
                    x2: row[2],
                    y2: row[3],
                    score: row[4],
                    class_idx,
                    class_name: class_name(class_idx),
                }
            })
            .collect()
    }

    fn decode_raw(&self, features: ArrayView2<'_, f32>) -> Vec<BoundingBox> {
        if features.nrows() <= 4 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for anchor in features.axis_iter(Axis(1)) {
            let Some((class_offset, score)) = anchor
                .iter()
                .skip(4)
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };
            if score < self.conf_threshold {
                continue;
            }

            let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
            let class_idx = class_offset as i32;
            candidates.push(BoundingBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                score,
                class_idx,
                class_name: class_name(class_idx),
            });
        }

        non_max_suppression(candidates, self.iou_threshold)
    }
}

/// Greedy per-class NMS, highest score first
pub fn non_max_suppression(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<BoundingBox> = Vec::new();
    for candidate in boxes {
        let suppressed = kept.iter().any(|k| {
            k.class_idx == candidate.class_idx && k.iou(&candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(feature = "execute")]
pub use onnx::OnnxObjectDetector;

#[cfg(feature = "execute")]
mod onnx {
    use super::YoloLike;
    use crate::load::{TensorLayout, determine_input_shape, load_session};
    use crate::preprocess::img_to_nchw;
    use ndarray::Ix3;
    use ort::{inputs, session::Session, value::Value};
    use spinespy::detection::{BoundingBox, Frame, ObjectDetector};
    use spinespy::error::{PipelineError, PipelineResult};
    use spinespy_types::{Result, anyhow};
    use std::path::Path;

    pub struct OnnxObjectDetector {
        session: Session,
        input_name: String,
        output_name: String,
        provider: YoloLike,
    }

    impl OnnxObjectDetector {
        pub fn load(path: &Path, conf_threshold: f32) -> Result<Self> {
            let session = load_session(path)?;
            let input_name = session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or(anyhow!("Detection model has no inputs"))?;
            let output_name = session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or(anyhow!("Detection model has no outputs"))?;
            let (input_width, input_height) =
                determine_input_shape(&session, &input_name, TensorLayout::Nchw)
                    .unwrap_or((640, 640));

            tracing::info!(
                model = %path.display(),
                input_width,
                input_height,
                "detection model loaded"
            );

            Ok(Self {
                session,
                input_name,
                output_name,
                provider: YoloLike {
                    input_width,
                    input_height,
                    conf_threshold,
                    ..Default::default()
                },
            })
        }

        fn run(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
            let (original_width, original_height) = frame.dimensions();
            let arr = img_to_nchw(
                frame,
                self.provider.input_width,
                self.provider.input_height,
            )?;
            let outputs = self
                .session
                .run(inputs![self.input_name.as_str() => Value::from_array(arr)?])?;
            let output = outputs[self.output_name.as_str()]
                .try_extract_array::<f32>()?
                .into_dimensionality::<Ix3>()?;

            Ok(self
                .provider
                .decode(output, original_width, original_height))
        }
    }

    impl ObjectDetector for OnnxObjectDetector {
        fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<BoundingBox>> {
            self.run(frame)
                .map_err(|e| PipelineError::Inference(e.to_string()))
        }
    }
}
