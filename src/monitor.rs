//! Result consumer: zone evaluation and overlay rendering.
//!
//! Sits on the driver side of the dispatch loop as the `ResultSink`.
//! Every delivered frame is evaluated against the zone first, then
//! rendered, so the overlay always reflects the state the frame itself
//! produced rather than the previous frame's.

use std::time::Instant;

use crate::config::{ClassMap, DisplaySettings, PoseSettings};
use crate::dispatch::{FrameResult, ResultSink};
use crate::foi::{FoiManager, ZoneSnapshot};
use crate::frame::Frame;
use crate::render;

pub struct Monitor {
    classes: ClassMap,
    pose: PoseSettings,
    display: DisplaySettings,
    foi: FoiManager,
    last_frame: Option<Frame>,
    last_zone: Option<ZoneSnapshot>,
    alarm_raised: bool,
    frames_seen: u64,
}

impl Monitor {
    pub fn new(
        classes: ClassMap,
        pose: PoseSettings,
        display: DisplaySettings,
        foi: FoiManager,
    ) -> Self {
        Self {
            classes,
            pose,
            display,
            foi,
            last_frame: None,
            last_zone: None,
            alarm_raised: false,
            frames_seen: 0,
        }
    }

    pub fn foi(&self) -> &FoiManager {
        &self.foi
    }

    /// Mutable zone access for the pointer-interaction and manual-reset
    /// paths. Callers run on the driver, serialized with delivery.
    pub fn foi_mut(&mut self) -> &mut FoiManager {
        &mut self.foi
    }

    /// Latest rendered frame, if any result has been delivered.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn last_zone(&self) -> Option<&ZoneSnapshot> {
        self.last_zone.as_ref()
    }

    /// Whether the most recent frame contained the alarm class.
    pub fn alarm_raised(&self) -> bool {
        self.alarm_raised
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Process one delivered result at an explicit instant.
    pub fn handle_at(&mut self, result: FrameResult, now: Instant) {
        self.frames_seen += 1;

        // Zone evaluation precedes rendering: the overlay for this frame
        // must show the state this frame's detections caused.
        self.foi
            .set_frame_dimensions(result.frame.width(), result.frame.height());
        self.foi.observe(&result.output.detections, now);
        self.last_zone = Some(self.foi.snapshot(now));

        self.alarm_raised = match self.display.alarm_class {
            Some(class_id) => result
                .output
                .detections
                .iter()
                .any(|d| d.class_id == class_id),
            None => false,
        };

        let rendered = render::render(
            &result.frame,
            &result.output.detections,
            &result.output.poses,
            &self.classes,
            &self.pose,
            &self.display,
            self.foi.overlay().as_ref(),
        );
        self.last_frame = Some(rendered);
    }
}

impl ResultSink for Monitor {
    fn deliver(&mut self, result: FrameResult) {
        self.handle_at(result, Instant::now());
    }
}
