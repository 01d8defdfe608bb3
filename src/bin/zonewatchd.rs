//! zonewatchd - zone monitor daemon
//!
//! Runs the full pipeline against the configured playlist:
//! 1. Loads (or defaults) the JSON configuration
//! 2. Refreshes the class table from the detector's labels
//! 3. Builds the playlist, cascade backends, and zone monitor
//! 4. Drives the fixed-cadence dispatch loop until interrupted
//!
//! Ships with the synthetic backends; real model backends plug in through
//! the `ObjectDetector` / `PoseEstimator` traits.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zonewatch::config::AppConfig;
use zonewatch::detect::{ObjectDetector, SyntheticDetector, SyntheticPoseEstimator};
use zonewatch::dispatch::{Dispatcher, PipelineSnapshot};
use zonewatch::foi::FoiManager;
use zonewatch::monitor::Monitor;
use zonewatch::source::{open_source, Playlist};

#[derive(Parser, Debug)]
#[command(name = "zonewatchd", about = "zone occupancy and hazard-dwell monitor")]
struct Args {
    /// Configuration file (created with defaults when absent).
    #[arg(long, env = "ZONEWATCH_CONFIG", default_value = "zonewatch.json")]
    config: PathBuf,

    /// Write the normalized configuration back after class refresh.
    #[arg(long)]
    persist_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = AppConfig::load(&args.config)?;
    log::info!(
        "zonewatchd {} starting, config {}",
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let mut detector: Box<dyn ObjectDetector> = Box::new(SyntheticDetector::new(0));
    detector.warm_up()?;
    let estimator = SyntheticPoseEstimator::new();

    // The model's label table wins over stale config entries; tuned
    // thresholds and colors survive the refresh.
    let labels = detector.class_labels();
    cfg.refresh_classes(&labels);
    log::info!(
        "detector '{}' provides {} classes",
        detector.name(),
        labels.len()
    );
    if args.persist_config {
        cfg.save(&args.config)?;
        log::info!("configuration written to {}", args.config.display());
    }

    if cfg.playlist.is_empty() {
        log::warn!("empty playlist, falling back to the synthetic demo source");
        cfg.playlist = vec!["stub://demo?size=640x480".to_string()];
    }
    let sources = cfg
        .playlist
        .iter()
        .map(|entry| open_source(entry))
        .collect::<Result<Vec<_>>>()?;
    let playlist = Playlist::new(sources)?;
    log::info!(
        "playlist: {} entries, starting with '{}'",
        cfg.playlist.len(),
        playlist.current_name()
    );

    let mut monitor = Monitor::new(
        cfg.classes.clone(),
        cfg.pose.clone(),
        cfg.display.clone(),
        FoiManager::new(cfg.foi.clone()),
    );

    let mut dispatcher = Dispatcher::new(
        playlist,
        cfg.dispatch.clone(),
        detector,
        Some(Box::new(estimator)),
        PipelineSnapshot {
            classes: cfg.classes.clone(),
            pose: cfg.pose.clone(),
        },
    )?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            log::info!("interrupt received, stopping");
            stop.store(true, Ordering::Relaxed);
        })?;
    }

    log::info!(
        "running at {} Hz with {} workers, zone {}",
        cfg.dispatch.tick_hz,
        cfg.dispatch.workers,
        if cfg.foi.enabled { "enabled" } else { "disabled" }
    );
    dispatcher.run(&mut monitor, &stop)?;

    let stats = dispatcher.stats();
    if let Some(zone) = monitor.last_zone() {
        log::info!(
            "final zone state: {:?} ({}), occupancy {}",
            zone.status,
            zone.status.operator_message(),
            zone.occupancy
        );
    }
    log::info!(
        "shutdown: {} frames processed, {} ticks dropped, {} source switches, {} stale discarded",
        stats.delivered,
        stats.dropped_busy,
        stats.advanced,
        stats.stale_discarded
    );
    Ok(())
}
