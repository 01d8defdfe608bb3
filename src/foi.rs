//! Field-of-interest manager.
//!
//! Owns the zone polygon, per-frame occupancy counting, and the
//! alert/escalation/reset state machine. All mutation happens from the
//! serialized result-delivery context (or the pointer-interaction path,
//! which the embedding application must route through the same lock);
//! evaluation takes an explicit `Instant` so time is injectable in tests.
//!
//! The delayed return from `Recovering` to `Normal` is a deadline field
//! owned by this struct, checked on evaluation and cleared by any
//! transition out of `Recovering`. There is no detached timer that could
//! fire after a superseding transition.

use std::time::{Duration, Instant};

use crate::config::FoiSettings;
use crate::detect::Detection;
use crate::geometry;

/// Operational status of the monitored zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneStatus {
    Normal,
    Slowed,
    Stopped,
    Recovering,
}

impl ZoneStatus {
    /// Operator-facing status line.
    pub fn operator_message(&self) -> &'static str {
        match self {
            ZoneStatus::Normal => "lift running normally",
            ZoneStatus::Slowed => "lift slowed: object in zone",
            ZoneStatus::Stopped => "lift stopped, staff notified: manual reset required",
            ZoneStatus::Recovering => "lift returning to normal speed",
        }
    }
}

/// Point-in-time view of the zone monitor for the display surface.
#[derive(Clone, Debug)]
pub struct ZoneSnapshot {
    pub status: ZoneStatus,
    pub alert_active: bool,
    pub alert_duration_secs: f32,
    pub remaining_timeout_secs: Option<f32>,
    pub occupancy: u32,
    pub alert_object_present: bool,
}

/// Zone overlay data handed to the renderer.
#[derive(Clone, Debug)]
pub struct ZoneOverlay {
    pub vertices: Vec<(f32, f32)>,
    pub color: [u8; 3],
    pub thickness: u32,
    pub handle_radius: f32,
    pub active_vertex: Option<usize>,
}

pub struct FoiManager {
    settings: FoiSettings,
    frame_width: u32,
    frame_height: u32,
    status: ZoneStatus,
    alert_active: bool,
    alert_started: Option<Instant>,
    recover_deadline: Option<Instant>,
    occupancy: u32,
    alert_object_in_zone: bool,
    /// Vertex currently being dragged, for overlay highlighting.
    active_vertex: Option<usize>,
}

impl FoiManager {
    pub fn new(settings: FoiSettings) -> Self {
        Self {
            settings,
            frame_width: 1,
            frame_height: 1,
            status: ZoneStatus::Normal,
            alert_active: false,
            alert_started: None,
            recover_deadline: None,
            occupancy: 0,
            alert_object_in_zone: false,
            active_vertex: None,
        }
    }

    /// Swap in a new settings snapshot (configuration update).
    pub fn update_settings(&mut self, settings: FoiSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &FoiSettings {
        &self.settings
    }

    /// Record the dimensions of the frame under evaluation. The polygon is
    /// re-resolved against these on every geometric test.
    pub fn set_frame_dimensions(&mut self, width: u32, height: u32) {
        self.frame_width = width.max(1);
        self.frame_height = height.max(1);
    }

    /// The polygon in absolute pixel coordinates at the current frame
    /// resolution.
    pub fn absolute_vertices(&self) -> Vec<(f32, f32)> {
        geometry::to_absolute(&self.settings.vertices, self.frame_width, self.frame_height)
    }

    pub fn status(&self) -> ZoneStatus {
        self.status
    }

    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    pub fn alert_active(&self) -> bool {
        self.alert_active
    }

    /// Per-frame evaluation: counting first (always), then the alert state
    /// machine.
    pub fn observe(&mut self, detections: &[Detection], now: Instant) {
        if !self.settings.enabled {
            self.occupancy = 0;
            self.alert_object_in_zone = false;
            return;
        }
        let polygon = self.absolute_vertices();

        // Counting is independent of the alert machine and updates every
        // frame regardless of state.
        self.occupancy = match self.settings.count_class {
            Some(class_id) => self.hits_in_zone(detections, class_id, &polygon),
            None => 0,
        };

        let alert_found = match self.settings.alert_class {
            Some(class_id) => self.hits_in_zone(detections, class_id, &polygon) > 0,
            None => false,
        };
        self.step_state_machine(alert_found, now);
        self.alert_object_in_zone = alert_found;
    }

    fn hits_in_zone(&self, detections: &[Detection], class_id: u32, polygon: &[(f32, f32)]) -> u32 {
        detections
            .iter()
            .filter(|d| d.class_id == class_id)
            .filter(|d| geometry::point_in_polygon(d.bbox.centroid(), polygon))
            .count() as u32
    }

    fn step_state_machine(&mut self, alert_found: bool, now: Instant) {
        // A pending recovery completes only if the zone stayed clear.
        if self.status == ZoneStatus::Recovering && !alert_found {
            if let Some(deadline) = self.recover_deadline {
                if now >= deadline {
                    self.reset_to_normal();
                    return;
                }
            }
        }

        let timeout = Duration::from_secs_f32(self.settings.alert_timeout_secs);

        if alert_found {
            if !self.alert_active {
                self.alert_active = true;
                self.alert_started = Some(now);
                self.recover_deadline = None;
                self.set_status(ZoneStatus::Slowed);
            } else {
                // Recurrence cancels a pending recovery before it fires;
                // the original dwell clock keeps running.
                self.recover_deadline = None;
                if self.status == ZoneStatus::Recovering {
                    self.set_status(ZoneStatus::Slowed);
                }
                if self.alert_duration(now) > timeout {
                    self.set_status(ZoneStatus::Stopped);
                }
            }
        } else if self.alert_active && self.status == ZoneStatus::Slowed {
            if self.alert_duration(now) <= timeout {
                self.set_status(ZoneStatus::Recovering);
                self.recover_deadline =
                    Some(now + Duration::from_secs_f32(self.settings.recovery_display_secs));
            } else {
                // Dwell already exceeded the timeout; departure does not
                // forgive it. Escalate and hold for manual reset.
                self.set_status(ZoneStatus::Stopped);
            }
        }
    }

    /// Explicit operator acknowledgment. Accepted in every state,
    /// idempotent, cancels all pending deadlines.
    pub fn manual_reset(&mut self) {
        self.reset_to_normal();
    }

    fn reset_to_normal(&mut self) {
        self.set_status(ZoneStatus::Normal);
        self.alert_active = false;
        self.alert_started = None;
        self.recover_deadline = None;
        self.alert_object_in_zone = false;
    }

    fn set_status(&mut self, status: ZoneStatus) {
        if self.status != status {
            log::info!("zone status: {:?} -> {:?}", self.status, status);
            self.status = status;
        }
    }

    fn alert_duration(&self, now: Instant) -> Duration {
        match self.alert_started {
            Some(started) => now.saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    /// Seconds until escalation to `Stopped`. Valid only while alerting.
    pub fn remaining_timeout(&self, now: Instant) -> Option<f32> {
        if !self.alert_active {
            return None;
        }
        let elapsed = self.alert_duration(now).as_secs_f32();
        Some((self.settings.alert_timeout_secs - elapsed).max(0.0))
    }

    pub fn snapshot(&self, now: Instant) -> ZoneSnapshot {
        ZoneSnapshot {
            status: self.status,
            alert_active: self.alert_active,
            alert_duration_secs: self.alert_duration(now).as_secs_f32(),
            remaining_timeout_secs: self.remaining_timeout(now),
            occupancy: self.occupancy,
            alert_object_present: self.alert_object_in_zone,
        }
    }

    // ------------------------------------------------------------------
    // Geometry editing (pointer-interaction surface)
    // ------------------------------------------------------------------

    /// Hit-test: index of the vertex within the hit radius of (x, y), in
    /// absolute display coordinates.
    pub fn vertex_near(&self, x: f32, y: f32) -> Option<usize> {
        self.absolute_vertices()
            .iter()
            .position(|&v| geometry::distance((x, y), v) <= self.settings.corner_hit_radius)
    }

    /// Move one vertex to (x, y), clamped to the frame, stored back as
    /// relative coordinates.
    pub fn move_vertex(&mut self, index: usize, x: f32, y: f32) {
        if index >= self.settings.vertices.len() {
            return;
        }
        let (cx, cy) = geometry::clamp_to_frame(x, y, self.frame_width, self.frame_height);
        self.settings.vertices[index] =
            geometry::to_relative(cx, cy, self.frame_width, self.frame_height);
    }

    pub fn set_active_vertex(&mut self, index: Option<usize>) {
        self.active_vertex = index;
    }

    /// Overlay data for the renderer, or `None` when the zone is disabled.
    pub fn overlay(&self) -> Option<ZoneOverlay> {
        if !self.settings.enabled {
            return None;
        }
        Some(ZoneOverlay {
            vertices: self.absolute_vertices(),
            color: self.settings.color,
            thickness: self.settings.thickness,
            handle_radius: self.settings.corner_hit_radius,
            active_vertex: self.active_vertex,
        })
    }
}
