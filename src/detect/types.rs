//! Detection and pose data model.
//!
//! Everything here is created fresh for one processed frame and discarded
//! once alerting and rendering are done. There is no cross-frame identity.

/// Axis-aligned box in full-frame pixel coordinates, `x1 <= x2`, `y1 <= y2`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Center of the box; the point used for zone containment tests.
    pub fn centroid(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Expand by `margin` pixels on all sides, clamped to frame bounds.
    ///
    /// Returns `None` when the clamped region has zero area (a box fully
    /// outside the frame, or a degenerate input).
    pub fn expanded_roi(&self, margin: u32, frame_w: u32, frame_h: u32) -> Option<Roi> {
        let margin = margin as f32;
        let x1 = ((self.x1 - margin).max(0.0)) as u32;
        let y1 = ((self.y1 - margin).max(0.0)) as u32;
        let x2 = ((self.x2 + margin).min(frame_w as f32)).max(0.0) as u32;
        let y2 = ((self.y2 + margin).min(frame_h as f32)).max(0.0) as u32;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Roi { x1, y1, x2, y2 })
    }
}

/// Clamped integer crop region used for focused pose estimation.
///
/// The top-left corner is the offset added back to estimator-local
/// keypoints when projecting them into full-frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Raw candidate emitted by an object detector, before class filtering.
#[derive(Clone, Debug)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// One recognized object in one frame.
#[derive(Clone, Debug)]
pub struct Detection {
    pub class_id: u32,
    /// Display label; not identity-bearing.
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Raw keypoint from a pose estimator, in crop-local coordinates.
/// Position in the instance vector is the keypoint id.
#[derive(Clone, Copy, Debug)]
pub struct RawKeypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// One anatomical landmark in full-frame coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    /// Index into the fixed 17-point skeleton layout.
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// One detected body instance, subordinate to a detection.
#[derive(Clone, Debug)]
pub struct Pose {
    /// Owning detection's class plus index within that ROI. Not stable
    /// across frames.
    pub instance_id: String,
    /// The detection box that spawned this pose search.
    pub source_box: BoundingBox,
    /// Sparse, at most 17 entries; missing ids mean "not observed".
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn keypoint(&self, id: usize) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.id == id)
    }
}
