//! Two-stage detector/estimator cascade.
//!
//! Stage one runs the object detector on the full frame and filters
//! candidates against per-class confidence thresholds. Stage two runs the
//! pose estimator on an expanded, frame-clamped crop around each surviving
//! detection of a pose-enabled class, then projects keypoints back into
//! full-frame coordinates by adding the clamped crop's top-left offset.

use anyhow::Result;

use crate::config::{ClassMap, PoseSettings};
use crate::detect::backend::{ObjectDetector, PoseEstimator};
use crate::detect::types::{Detection, Keypoint, Pose};
use crate::frame::Frame;

/// Everything one processed frame produced.
#[derive(Clone, Debug, Default)]
pub struct CascadeOutput {
    pub detections: Vec<Detection>,
    pub poses: Vec<Pose>,
}

/// Run the cascade on one frame.
///
/// Errors from either model propagate to the caller, which absorbs them
/// into an empty result; they never reach the dispatch loop.
pub fn process(
    frame: &Frame,
    detector: &mut dyn ObjectDetector,
    mut estimator: Option<&mut dyn PoseEstimator>,
    classes: &ClassMap,
    pose_cfg: &PoseSettings,
) -> Result<CascadeOutput> {
    let mut output = CascadeOutput::default();

    let candidates = detector.detect(frame)?;
    for candidate in candidates {
        let Some(class) = classes.get(&candidate.class_id) else {
            continue;
        };
        if candidate.confidence < class.min_confidence {
            continue;
        }
        let detection = Detection {
            class_id: candidate.class_id,
            class_name: class.name.clone(),
            confidence: candidate.confidence,
            bbox: candidate.bbox,
        };

        if pose_cfg.pose_detect_classes.contains(&detection.class_id) {
            if let Some(est) = estimator.as_deref_mut() {
                let mut found = poses_in_roi(frame, est, &detection, pose_cfg)?;
                output.poses.append(&mut found);
            }
        }

        output.detections.push(detection);
    }

    Ok(output)
}

/// Pose search inside one detection's expanded crop. May find several
/// instances, or none.
fn poses_in_roi(
    frame: &Frame,
    estimator: &mut dyn PoseEstimator,
    detection: &Detection,
    pose_cfg: &PoseSettings,
) -> Result<Vec<Pose>> {
    let Some(roi) =
        detection
            .bbox
            .expanded_roi(pose_cfg.roi_margin_px, frame.width(), frame.height())
    else {
        // Degenerate region after clamping; skip silently, not an error.
        log::debug!(
            "skipping pose search for class {} detection: zero-area ROI",
            detection.class_id
        );
        return Ok(Vec::new());
    };

    let crop = frame.crop(roi.x1, roi.y1, roi.x2, roi.y2)?;
    let instances = estimator.estimate(&crop)?;

    let mut poses = Vec::new();
    for (instance_idx, raw_keypoints) in instances.into_iter().enumerate() {
        let mut keypoints = Vec::new();
        for (id, kp) in raw_keypoints.into_iter().enumerate() {
            // Zero coordinates are the estimator's "not observed" sentinel.
            if kp.confidence < pose_cfg.min_confidence || kp.x <= 0.0 || kp.y <= 0.0 {
                continue;
            }
            keypoints.push(Keypoint {
                id,
                // Project into full-frame coordinates using the clamped
                // top-left, the inverse of the clamped expansion above.
                x: kp.x + roi.x1 as f32,
                y: kp.y + roi.y1 as f32,
                confidence: kp.confidence,
            });
        }
        if keypoints.is_empty() {
            continue;
        }
        poses.push(Pose {
            instance_id: format!("{}_{}", detection.class_id, instance_idx),
            source_box: detection.bbox,
            keypoints,
        });
    }
    Ok(poses)
}
