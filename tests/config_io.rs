//! Configuration file loading: legacy migration, environment overrides,
//! and normalized persistence.

use std::sync::Mutex;

use tempfile::NamedTempFile;

use zonewatch::config::AppConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in ["ZONEWATCH_TICK_HZ", "ZONEWATCH_WORKERS", "ZONEWATCH_PLAYLIST"] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_legacy_document_from_disk() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = NamedTempFile::new().expect("temp config");
    let legacy = r#"{
        "class_config": {
            "0": {"name": "Person", "conf": 0.55, "iou": 0.45},
            "2": {"name": "Sled", "color": [255, 128, 0]}
        },
        "pose_config": {"pose_detect_classes": ["0"]},
        "display_config": {"alarm_class": "2"},
        "foi_config": {
            "enabled": true,
            "points": [[0.2, 0.2], [0.8, 0.2], [0.8, 0.8], [0.2, 0.8]],
            "count_class": "0",
            "alert_class": "2",
            "alert_timeout": 7.0
        },
        "video_files": ["stub://a?frames=10", "stub://b?frames=10"]
    }"#;
    std::fs::write(file.path(), legacy).expect("write config");

    let cfg = AppConfig::load(file.path()).expect("load");
    assert_eq!(cfg.classes[&0].name, "Person");
    assert!((cfg.classes[&0].min_confidence - 0.55).abs() < 1e-6);
    assert_eq!(cfg.classes[&2].color, [255, 128, 0]);
    assert_eq!(cfg.pose.pose_detect_classes, vec![0]);
    assert_eq!(cfg.display.alarm_class, Some(2));
    assert_eq!(cfg.foi.alert_class, Some(2));
    assert!((cfg.foi.alert_timeout_secs - 7.0).abs() < 1e-6);
    assert_eq!(cfg.playlist.len(), 2);
}

#[test]
fn saved_config_round_trips_in_normalized_form() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = NamedTempFile::new().expect("temp config");
    let mut cfg = AppConfig::default();
    cfg.refresh_classes(&[(0, "Person".to_string()), (2, "Sled".to_string())]);
    cfg.foi.alert_class = Some(2);
    cfg.foi.alert_timeout_secs = 12.5;
    cfg.playlist = vec!["stub://clip?frames=50".to_string()];
    cfg.save(file.path()).expect("save");

    // The normalized document uses modern keys only.
    let raw = std::fs::read_to_string(file.path()).expect("read back");
    assert!(raw.contains("\"classes\""));
    assert!(raw.contains("\"alert_timeout_secs\""));
    assert!(!raw.contains("class_config"));
    assert!(!raw.contains("video_files"));

    let loaded = AppConfig::load(file.path()).expect("reload");
    assert_eq!(loaded.classes[&0].name, "Person");
    assert_eq!(loaded.foi.alert_class, Some(2));
    assert!((loaded.foi.alert_timeout_secs - 12.5).abs() < 1e-6);
    assert_eq!(loaded.playlist, cfg.playlist);
}

#[test]
fn environment_overrides_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = NamedTempFile::new().expect("temp config");
    std::fs::write(
        file.path(),
        r#"{"dispatch": {"tick_hz": 15, "workers": 2}}"#,
    )
    .expect("write config");

    std::env::set_var("ZONEWATCH_TICK_HZ", "60");
    std::env::set_var("ZONEWATCH_PLAYLIST", "stub://x, stub://y");
    let cfg = AppConfig::load(file.path()).expect("load");
    clear_env();

    assert_eq!(cfg.dispatch.tick_hz, 60);
    assert_eq!(cfg.dispatch.workers, 2);
    assert_eq!(cfg.playlist, vec!["stub://x", "stub://y"]);
}

#[test]
fn invalid_documents_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = NamedTempFile::new().expect("temp config");

    // Degenerate polygon.
    std::fs::write(
        file.path(),
        r#"{"foi": {"vertices": [[0.1, 0.1], [0.9, 0.9]]}}"#,
    )
    .expect("write config");
    assert!(AppConfig::load(file.path()).is_err());

    // Vertex outside the relative range.
    std::fs::write(
        file.path(),
        r#"{"foi": {"vertices": [[0.0, 0.0], [1.5, 0.0], [0.5, 1.0]]}}"#,
    )
    .expect("write config");
    assert!(AppConfig::load(file.path()).is_err());

    // Zero tick rate.
    std::fs::write(file.path(), r#"{"dispatch": {"tick_hz": 0}}"#).expect("write config");
    assert!(AppConfig::load(file.path()).is_err());

    // Negative recovery interval: would blow up Duration construction on
    // the Slowed -> Recovering transition if it got past loading.
    std::fs::write(
        file.path(),
        r#"{"foi": {"alert_class": 2, "recovery_display_secs": -1.0}}"#,
    )
    .expect("write config");
    assert!(AppConfig::load(file.path()).is_err());

    // Non-finite timeout.
    std::fs::write(
        file.path(),
        r#"{"foi": {"alert_timeout_secs": 1e999}}"#,
    )
    .expect("write config");
    assert!(AppConfig::load(file.path()).is_err());

    // Malformed JSON.
    std::fs::write(file.path(), "{not json").expect("write config");
    assert!(AppConfig::load(file.path()).is_err());
}
