//! Overlay renderer.
//!
//! Pure: draws detections, poses, and the zone overlay onto a copy of the
//! frame. Inputs are never mutated; invalid or missing coordinates are
//! skipped, never fatal.

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;

use crate::config::{ClassMap, DisplaySettings, PoseSettings};
use crate::detect::{Detection, Pose};
use crate::foi::ZoneOverlay;
use crate::frame::Frame;

/// Number of keypoints in the estimator's fixed COCO layout.
pub const SKELETON_KEYPOINTS: usize = 17;

/// Fixed adjacency of the 17-point layout: head, arms, torso, legs.
pub const SKELETON: [(usize, usize); 16] = [
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 7),
    (7, 9),
    (6, 8),
    (8, 10),
    (5, 11),
    (6, 12),
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
];

const KEYPOINT_COLOR: [u8; 3] = [255, 0, 0];
const SKELETON_COLOR: [u8; 3] = [0, 255, 0];
const HANDLE_BORDER: [u8; 3] = [0, 0, 0];
const HANDLE_ACTIVE: [u8; 3] = [255, 0, 0];

/// Render one frame's results. Returns a new frame; inputs untouched.
pub fn render(
    frame: &Frame,
    detections: &[Detection],
    poses: &[Pose],
    classes: &ClassMap,
    pose_cfg: &PoseSettings,
    display: &DisplaySettings,
    zone: Option<&ZoneOverlay>,
) -> Frame {
    let mut canvas = frame.to_image();

    draw_detections(&mut canvas, detections, classes, display);
    if pose_cfg.show_skeleton || pose_cfg.show_keypoints {
        draw_poses(&mut canvas, poses, pose_cfg);
    }
    if let Some(zone) = zone {
        draw_zone(&mut canvas, zone);
    }

    Frame::from_image(canvas)
}

fn draw_detections(
    canvas: &mut RgbImage,
    detections: &[Detection],
    classes: &ClassMap,
    display: &DisplaySettings,
) {
    for detection in detections {
        let Some(class) = classes.get(&detection.class_id) else {
            continue;
        };
        let bbox = detection.bbox;
        // Thickness via nested rectangles, shrinking inward.
        for t in 0..display.box_thickness.max(1) {
            let x = bbox.x1 as i32 + t as i32;
            let y = bbox.y1 as i32 + t as i32;
            let w = bbox.width() as i32 - 2 * t as i32;
            let h = bbox.height() as i32 - 2 * t as i32;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(x, y).of_size(w as u32, h as u32),
                Rgb(class.color),
            );
        }
    }
}

fn draw_poses(canvas: &mut RgbImage, poses: &[Pose], pose_cfg: &PoseSettings) {
    let (w, h) = canvas.dimensions();
    let in_frame = |x: f32, y: f32| x > 0.0 && y > 0.0 && x < w as f32 && y < h as f32;

    for pose in poses {
        // Dense lookup per instance: index is the keypoint id.
        let mut points: [Option<(f32, f32)>; SKELETON_KEYPOINTS] = [None; SKELETON_KEYPOINTS];
        for kp in &pose.keypoints {
            if kp.id < SKELETON_KEYPOINTS && in_frame(kp.x, kp.y) {
                points[kp.id] = Some((kp.x, kp.y));
            }
        }

        if pose_cfg.show_skeleton {
            for &(a, b) in SKELETON.iter() {
                // Only edges with both endpoints observed and in frame.
                if let (Some(pa), Some(pb)) = (points[a], points[b]) {
                    draw_line_segment_mut(canvas, pa, pb, Rgb(SKELETON_COLOR));
                }
            }
        }

        if pose_cfg.show_keypoints {
            for point in points.iter().flatten() {
                draw_filled_circle_mut(
                    canvas,
                    (point.0 as i32, point.1 as i32),
                    pose_cfg.keypoint_radius as i32,
                    Rgb(KEYPOINT_COLOR),
                );
            }
        }
    }
}

fn draw_zone(canvas: &mut RgbImage, zone: &ZoneOverlay) {
    if zone.vertices.len() < 3 {
        return;
    }

    // Polygon outline. Thickness passes stack along the edge normal so
    // the band is uniform whatever the edge's orientation.
    let n = zone.vertices.len();
    for i in 0..n {
        let a = zone.vertices[i];
        let b = zone.vertices[(i + 1) % n];
        let (ex, ey) = (b.0 - a.0, b.1 - a.1);
        let len = (ex * ex + ey * ey).sqrt();
        if len <= f32::EPSILON {
            continue;
        }
        let (nx, ny) = (-ey / len, ex / len);
        let passes = zone.thickness.max(1);
        for t in 0..passes {
            // Centered on the true edge.
            let offset = t as f32 - (passes - 1) as f32 / 2.0;
            draw_line_segment_mut(
                canvas,
                (a.0 + nx * offset, a.1 + ny * offset),
                (b.0 + nx * offset, b.1 + ny * offset),
                Rgb(zone.color),
            );
        }
    }

    // Vertex handles for drag-to-reshape.
    for (i, &(x, y)) in zone.vertices.iter().enumerate() {
        let active = zone.active_vertex == Some(i);
        let radius = if active {
            zone.handle_radius + 2.0
        } else {
            zone.handle_radius
        };
        let radius = radius as i32;
        let color = if active { HANDLE_ACTIVE } else { zone.color };
        draw_filled_circle_mut(canvas, (x as i32, y as i32), radius, Rgb(color));
        draw_hollow_circle_mut(canvas, (x as i32, y as i32), radius, Rgb(HANDLE_BORDER));
    }
}
