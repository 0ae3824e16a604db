//! Seams between the check cycle and the camera and model adapters.

use crate::error::PipelineResult;
use crate::landmarks::PoseLandmarks;
use serde::{Deserialize, Serialize};
use spinespy_types::image::RgbImage;

/// COCO class id of "cell phone"
pub const PHONE_CLASS_ID: i32 = 67;

pub type Frame = RgbImage;

/// Acquires one still frame, opening and releasing the device within the call
pub trait FrameSource: Send {
    fn capture(&mut self) -> PipelineResult<Frame>;
}

/// Finds body landmarks, one entry per detected person
pub trait PoseDetector: Send {
    fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<PoseLandmarks>>;
}

/// Finds labelled objects above the detector's own confidence threshold
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> PipelineResult<Vec<BoundingBox>>;
}

#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_idx: i32,
    pub class_name: Option<String>,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        let w = self.x2 - self.x1;
        let h = self.y2 - self.y1;
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let w_inter = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h_inter = self.y2.min(other.y2) - self.y1.max(other.y1);

        let intersection = if w_inter > 0.0 && h_inter > 0.0 {
            w_inter * h_inter
        } else {
            0.0
        };

        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    pub fn scale(&mut self, scale_w: f32, scale_h: f32) {
        self.x1 *= scale_w;
        self.y1 *= scale_h;
        self.x2 *= scale_w;
        self.y2 *= scale_h;
    }
}

/// Whether any detection carries the phone class. The first match wins.
pub fn phone_present(detections: &[BoundingBox], phone_class_id: i32) -> bool {
    for detection in detections {
        tracing::debug!(
            class_id = detection.class_idx,
            class_name = detection.class_name.as_deref().unwrap_or("unknown"),
            confidence = detection.score,
            "detection"
        );
        if detection.class_idx == phone_class_id {
            tracing::debug!(class_id = phone_class_id, "phone detected");
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(class_idx: i32, score: f32) -> BoundingBox {
        BoundingBox {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            score,
            class_idx,
            class_name: None,
        }
    }

    #[test]
    fn phone_class_is_found_among_others() {
        let detections = vec![boxed(0, 0.9), boxed(56, 0.8), boxed(PHONE_CLASS_ID, 0.3)];
        assert!(phone_present(&detections, PHONE_CLASS_ID));
    }

    #[test]
    fn low_scores_still_count() {
        assert!(phone_present(&[boxed(PHONE_CLASS_ID, 0.01)], PHONE_CLASS_ID));
    }

    #[test]
    fn no_phone_without_the_class() {
        assert!(!phone_present(&[boxed(0, 0.99), boxed(63, 0.7)], PHONE_CLASS_ID));
        assert!(!phone_present(&[], PHONE_CLASS_ID));
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = boxed(0, 1.0);
        let mut b = boxed(0, 1.0);
        assert!((a.iou(&b) - 1.0).abs() < 1e-6);

        b.x1 = 20.0;
        b.x2 = 30.0;
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = boxed(0, 1.0);
        let mut b = boxed(0, 1.0);
        b.x1 = 5.0;
        b.x2 = 15.0;
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }
}
