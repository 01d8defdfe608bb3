use anyhow::Result;

use crate::detect::types::{RawDetection, RawKeypoint};
use crate::frame::Frame;

/// Object detector backend.
///
/// Implementations run on the full frame and return raw candidates; class
/// filtering and thresholding happen in the cascade, not here. Any error
/// returned from `detect` is absorbed at the cascade boundary and the
/// frame yields no results.
pub trait ObjectDetector: Send {
    /// Backend identifier, used in diagnostics.
    fn name(&self) -> &'static str;

    /// The detector's label set, `(class id, display name)` pairs.
    ///
    /// Read once when the detector is (re)loaded to refresh the class
    /// configuration map.
    fn class_labels(&self) -> Vec<(u32, String)>;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Pose estimator backend.
///
/// Operates on arbitrary-size crops. Returned coordinates are relative to
/// the crop's own top-left corner; the cascade projects them back into
/// full-frame coordinates. An estimator may find zero or more instances
/// per crop — never assume one person per box.
pub trait PoseEstimator: Send {
    fn name(&self) -> &'static str;

    /// Run pose estimation on a crop. Each inner vector is one instance;
    /// position within it is the keypoint id.
    fn estimate(&mut self, crop: &Frame) -> Result<Vec<Vec<RawKeypoint>>>;
}
