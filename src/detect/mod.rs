//! Detection/pose cascade.
//!
//! The two-stage pipeline: an object detector runs on the full frame, then
//! an optional pose estimator runs on expanded crops around detections of
//! configured classes. Model backends sit behind traits so concrete
//! networks stay out of the kernel.

mod backend;
mod cascade;
mod stubs;
mod types;

pub use backend::{ObjectDetector, PoseEstimator};
pub use cascade::{process, CascadeOutput};
pub use stubs::{SyntheticDetector, SyntheticPoseEstimator};
pub use types::{BoundingBox, Detection, Keypoint, Pose, RawDetection, RawKeypoint, Roi};
