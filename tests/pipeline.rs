//! End-to-end pipeline tests: playlist -> dispatch -> cascade -> zone
//! monitor, using the built-in synthetic backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use zonewatch::config::{AppConfig, DispatchSettings, FoiSettings, PoseSettings};
use zonewatch::detect::{SyntheticDetector, SyntheticPoseEstimator};
use zonewatch::dispatch::{Dispatcher, FrameResult, PipelineSnapshot, Tick};
use zonewatch::foi::{FoiManager, ZoneStatus};
use zonewatch::monitor::Monitor;
use zonewatch::render::SKELETON_KEYPOINTS;
use zonewatch::source::{open_source, Playlist};
use zonewatch::ObjectDetector;

const PERSON: u32 = 0;

/// Config matching the synthetic detector's label set, with pose search
/// and zone alerting wired to the person class.
fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.refresh_classes(&SyntheticDetector::new(PERSON).class_labels());
    cfg.pose = PoseSettings {
        pose_detect_classes: vec![PERSON],
        ..PoseSettings::default()
    };
    // Zone covering nearly the whole frame: the drifting synthetic box's
    // centroid always lands inside.
    cfg.foi = FoiSettings {
        enabled: true,
        vertices: vec![[0.02, 0.02], [0.98, 0.02], [0.98, 0.98], [0.02, 0.98]],
        count_class: Some(PERSON),
        alert_class: Some(PERSON),
        ..FoiSettings::default()
    };
    cfg.dispatch = DispatchSettings {
        tick_hz: 120,
        workers: 2,
    };
    cfg.playlist = vec!["stub://clip?frames=500&size=320x240".to_string()];
    cfg
}

fn build_dispatcher(cfg: &AppConfig) -> Result<Dispatcher> {
    let sources = cfg
        .playlist
        .iter()
        .map(|entry| open_source(entry))
        .collect::<Result<Vec<_>>>()?;
    Dispatcher::new(
        Playlist::new(sources)?,
        cfg.dispatch.clone(),
        Box::new(SyntheticDetector::new(PERSON)),
        Some(Box::new(SyntheticPoseEstimator::new())),
        PipelineSnapshot {
            classes: cfg.classes.clone(),
            pose: cfg.pose.clone(),
        },
    )
}

#[test]
fn cascade_produces_detections_and_remapped_poses() -> Result<()> {
    let cfg = test_config();
    let mut dispatcher = build_dispatcher(&cfg)?;

    let mut results: Vec<FrameResult> = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while results.len() < 5 {
        assert!(Instant::now() < deadline, "pipeline made no progress");
        dispatcher.tick()?;
        let mut sink = |result: FrameResult| results.push(result);
        dispatcher.poll_deliver(&mut sink);
        std::thread::sleep(Duration::from_millis(2));
    }

    for result in &results {
        assert!(result.error.is_none());
        assert_eq!(result.output.detections.len(), 1);
        let detection = &result.output.detections[0];
        assert_eq!(detection.class_id, PERSON);
        assert_eq!(detection.class_name, "Person");

        // Pose search ran and keypoints landed in full-frame coordinates
        // near the detection box (within the crop margin).
        assert_eq!(result.output.poses.len(), 1);
        let pose = &result.output.poses[0];
        assert_eq!(pose.keypoints.len(), SKELETON_KEYPOINTS);
        let margin = cfg.pose.roi_margin_px as f32 + 1.0;
        for kp in &pose.keypoints {
            assert!(kp.x >= detection.bbox.x1 - margin && kp.x <= detection.bbox.x2 + margin);
            assert!(kp.y >= detection.bbox.y1 - margin && kp.y <= detection.bbox.y2 + margin);
        }
    }
    Ok(())
}

#[test]
fn monitor_tracks_zone_state_end_to_end() -> Result<()> {
    let cfg = test_config();
    let mut dispatcher = build_dispatcher(&cfg)?;
    let mut monitor = Monitor::new(
        cfg.classes.clone(),
        cfg.pose.clone(),
        cfg.display.clone(),
        FoiManager::new(cfg.foi.clone()),
    );

    let deadline = Instant::now() + Duration::from_secs(10);
    while monitor.frames_seen() < 10 {
        assert!(Instant::now() < deadline, "pipeline made no progress");
        dispatcher.tick()?;
        dispatcher.poll_deliver(&mut monitor);
        std::thread::sleep(Duration::from_millis(2));
    }

    let zone = monitor.last_zone().expect("zone snapshot");
    assert_eq!(zone.occupancy, 1);
    assert!(zone.alert_object_present);
    assert_eq!(zone.status, ZoneStatus::Slowed);
    assert!(zone.remaining_timeout_secs.is_some());
    assert!(monitor.last_frame().is_some());
    Ok(())
}

#[test]
fn run_loop_stops_on_signal_and_delivers_frames() -> Result<()> {
    let cfg = test_config();
    let mut dispatcher = build_dispatcher(&cfg)?;
    let mut monitor = Monitor::new(
        cfg.classes.clone(),
        cfg.pose.clone(),
        cfg.display.clone(),
        FoiManager::new(cfg.foi.clone()),
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            stop.store(true, Ordering::Relaxed);
        });
    }

    dispatcher.run(&mut monitor, &stop)?;

    let stats = dispatcher.stats();
    assert!(stats.submitted > 0);
    assert!(stats.delivered > 0);
    assert!(monitor.frames_seen() > 0);
    Ok(())
}

#[test]
fn playlist_cycles_through_clips_under_dispatch() -> Result<()> {
    let mut cfg = test_config();
    cfg.playlist = vec![
        "stub://first?frames=3&size=160x120".to_string(),
        "stub://second?frames=3&size=160x120".to_string(),
    ];
    let mut dispatcher = build_dispatcher(&cfg)?;

    let mut advances = 0;
    let mut delivered = 0u64;
    let deadline = Instant::now() + Duration::from_secs(10);
    while advances < 3 {
        assert!(Instant::now() < deadline, "playlist never advanced");
        if dispatcher.tick()? == Tick::Advanced {
            advances += 1;
        }
        let mut sink = |_result: FrameResult| delivered += 1;
        dispatcher.poll_deliver(&mut sink);
        std::thread::sleep(Duration::from_millis(2));
    }

    // Each advance bumps the epoch; frames submitted before a switch are
    // never delivered after it.
    assert_eq!(dispatcher.epoch(), 3);
    assert!(delivered > 0);
    Ok(())
}
