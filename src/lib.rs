//! zonewatch - zone occupancy and hazard-dwell video monitor
//!
//! A fixed-cadence video analysis kernel: frames from a cycling playlist
//! run through a two-stage detection/pose cascade on a bounded worker
//! pool, and results feed a polygonal field-of-interest monitor that
//! counts occupants and escalates on hazard dwell time.
//!
//! # Core properties
//!
//! 1. **Drop-latest backpressure**: one frame in flight at a time; ticks
//!    that arrive while processing are dropped, so overload degrades
//!    frame rate instead of growing latency or memory.
//! 2. **Epoch-fenced delivery**: every submitted frame carries the
//!    playlist epoch; results from a superseded source are discarded at
//!    delivery, never rendered.
//! 3. **Serialized state mutation**: zone state, alert deadlines, and
//!    overlays mutate only on the driver's delivery path.
//! 4. **Evaluate, then render**: the zone machine observes a frame's
//!    detections before the overlay for that frame is drawn.
//! 5. **Injectable time**: the alert state machine takes explicit
//!    instants, so dwell and recovery timing is testable without sleeping.
//!
//! # Module structure
//!
//! - `config`: JSON configuration with legacy-key migration
//! - `source`: playlist and video source abstraction
//! - `detect`: detector/estimator traits and the cascade
//! - `dispatch`: cadence driver, worker pool, admission control
//! - `foi`: field-of-interest polygon and alert state machine
//! - `monitor`: serialized result consumer (zone + rendering)
//! - `render`: pure overlay renderer

pub mod config;
pub mod detect;
pub mod dispatch;
pub mod foi;
pub mod frame;
pub mod geometry;
pub mod monitor;
pub mod render;
pub mod source;

pub use config::{AppConfig, ClassConfig, ClassMap};
pub use detect::{CascadeOutput, Detection, ObjectDetector, Pose, PoseEstimator};
pub use dispatch::{Dispatcher, FrameResult, PipelineSnapshot, ResultSink, Tick};
pub use foi::{FoiManager, ZoneSnapshot, ZoneStatus};
pub use frame::Frame;
pub use monitor::Monitor;
pub use source::{Playlist, VideoSource};
