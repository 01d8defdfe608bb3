//! Synthetic model backends.
//!
//! Deterministic stand-ins for real networks, used by tests and the demo
//! daemon. The detector emits one box per frame that drifts across the
//! frame; the estimator lays a plausible 17-point figure inside the crop.

use anyhow::Result;

use crate::detect::backend::{ObjectDetector, PoseEstimator};
use crate::detect::types::{BoundingBox, RawDetection, RawKeypoint};
use crate::frame::Frame;
use crate::render::SKELETON_KEYPOINTS;

/// Detector emitting one drifting detection of a fixed class per frame.
pub struct SyntheticDetector {
    class_id: u32,
    frame_count: u64,
}

impl SyntheticDetector {
    pub fn new(class_id: u32) -> Self {
        Self {
            class_id,
            frame_count: 0,
        }
    }
}

impl ObjectDetector for SyntheticDetector {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn class_labels(&self) -> Vec<(u32, String)> {
        vec![(0, "Person".to_string()), (1, "Sled".to_string())]
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        self.frame_count += 1;
        let w = frame.width() as f32;
        let h = frame.height() as f32;

        // Drift horizontally, wrap at the right edge.
        let phase = (self.frame_count % 100) as f32 / 100.0;
        let bw = w * 0.15;
        let bh = h * 0.4;
        let x1 = phase * (w - bw);
        let y1 = h * 0.3;

        Ok(vec![RawDetection {
            class_id: self.class_id,
            confidence: 0.9,
            bbox: BoundingBox::new(x1, y1, x1 + bw, y1 + bh),
        }])
    }
}

/// Estimator placing one 17-keypoint instance inside every crop.
pub struct SyntheticPoseEstimator {
    calls: u64,
}

impl SyntheticPoseEstimator {
    pub fn new() -> Self {
        Self { calls: 0 }
    }
}

impl Default for SyntheticPoseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEstimator for SyntheticPoseEstimator {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn estimate(&mut self, crop: &Frame) -> Result<Vec<Vec<RawKeypoint>>> {
        self.calls += 1;
        let w = crop.width() as f32;
        let h = crop.height() as f32;

        // Spread keypoints down the crop: head at the top, feet at the
        // bottom, alternating left/right of the vertical center line.
        let mut instance = Vec::with_capacity(SKELETON_KEYPOINTS);
        for id in 0..SKELETON_KEYPOINTS {
            let t = (id as f32 + 1.0) / (SKELETON_KEYPOINTS as f32 + 1.0);
            let side = if id % 2 == 0 { -1.0 } else { 1.0 };
            instance.push(RawKeypoint {
                x: (w / 2.0 + side * w * 0.15).max(1.0),
                y: (t * h).max(1.0),
                confidence: 0.8,
            });
        }
        Ok(vec![instance])
    }
}
