//! Typed configuration document.
//!
//! Configuration is persisted as JSON. The on-disk document is parsed into
//! an all-optional `*File` mirror, resolved into fully-defaulted typed
//! settings, overridden from the environment, and validated once at the
//! load boundary. Core code past this boundary assumes valid inputs.
//!
//! Legacy documents are accepted transparently: old per-class `conf`/`iou`
//! keys, FOI `points`/`alert_timeout`, stringified class ids, and the
//! top-level `video_files` list all map onto their current equivalents and
//! are written back in normalized form on save.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_TICK_HZ: u32 = 30;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MIN_IOU: f32 = 0.4;
pub const DEFAULT_POSE_MIN_CONFIDENCE: f32 = 0.3;
pub const DEFAULT_ROI_MARGIN_PX: u32 = 20;
pub const DEFAULT_ALERT_TIMEOUT_SECS: f32 = 10.0;
pub const DEFAULT_RECOVERY_DISPLAY_SECS: f32 = 3.0;
pub const DEFAULT_CORNER_HIT_RADIUS: f32 = 15.0;

/// Display color palette (RGB). New classes discovered on detector load
/// cycle through this list.
pub const PALETTE: [[u8; 3]; 20] = [
    [255, 0, 0],     // red
    [0, 255, 0],     // green
    [0, 0, 255],     // blue
    [255, 255, 0],   // yellow
    [0, 255, 255],   // cyan
    [255, 0, 255],   // magenta
    [255, 165, 0],   // orange
    [128, 0, 128],   // purple
    [165, 42, 42],   // brown
    [255, 192, 203], // pink
    [128, 255, 0],   // lime
    [0, 128, 128],   // teal
    [0, 0, 128],     // navy
    [128, 0, 0],     // maroon
    [128, 128, 0],   // olive
    [192, 192, 192], // silver
    [255, 215, 0],   // gold
    [255, 127, 80],  // coral
    [64, 224, 208],  // turquoise
    [238, 130, 238], // violet
];

/// Per-class detection policy, keyed by the detector's integer class id.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClassConfig {
    pub name: String,
    pub color: [u8; 3],
    pub min_confidence: f32,
    /// Passed through to the detector, not interpreted here.
    pub min_iou: f32,
}

pub type ClassMap = BTreeMap<u32, ClassConfig>;

#[derive(Clone, Debug, Serialize)]
pub struct PoseSettings {
    /// Class ids that trigger a pose search on their detections.
    pub pose_detect_classes: Vec<u32>,
    pub min_confidence: f32,
    /// Fixed pixel margin added around a detection box before cropping.
    pub roi_margin_px: u32,
    pub show_keypoints: bool,
    pub show_skeleton: bool,
    pub keypoint_radius: u32,
    pub line_thickness: u32,
}

impl Default for PoseSettings {
    fn default() -> Self {
        Self {
            pose_detect_classes: Vec::new(),
            min_confidence: DEFAULT_POSE_MIN_CONFIDENCE,
            roi_margin_px: DEFAULT_ROI_MARGIN_PX,
            show_keypoints: true,
            show_skeleton: true,
            keypoint_radius: 3,
            line_thickness: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DisplaySettings {
    pub box_thickness: u32,
    /// Any detection of this class raises the frame-level alarm flag
    /// consumed by the display surface.
    pub alarm_class: Option<u32>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            box_thickness: 2,
            alarm_class: None,
        }
    }
}

/// Field-of-interest polygon and alerting thresholds.
#[derive(Clone, Debug, Serialize)]
pub struct FoiSettings {
    pub enabled: bool,
    /// Ordered vertices in relative [0,1]x[0,1] coordinates.
    pub vertices: Vec<[f32; 2]>,
    pub count_class: Option<u32>,
    pub alert_class: Option<u32>,
    pub alert_timeout_secs: f32,
    pub recovery_display_secs: f32,
    pub corner_hit_radius: f32,
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for FoiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            vertices: vec![[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]],
            count_class: None,
            alert_class: None,
            alert_timeout_secs: DEFAULT_ALERT_TIMEOUT_SECS,
            recovery_display_secs: DEFAULT_RECOVERY_DISPLAY_SECS,
            corner_hit_radius: DEFAULT_CORNER_HIT_RADIUS,
            color: [255, 255, 0],
            thickness: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DispatchSettings {
    pub tick_hz: u32,
    pub workers: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Resolved application configuration.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AppConfig {
    pub classes: ClassMap,
    pub pose: PoseSettings,
    pub display: DisplaySettings,
    pub foi: FoiSettings,
    pub dispatch: DispatchSettings,
    /// Video sources played in order, cycling forever.
    pub playlist: Vec<String>,
}

// ----------------------------------------------------------------------------
// On-disk mirror (all optional, legacy aliases)
// ----------------------------------------------------------------------------

/// A class id that may appear as a number or (legacy) a stringified number.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ClassIdField {
    Num(u32),
    Text(String),
}

impl ClassIdField {
    fn resolve(self) -> Result<u32> {
        match self {
            ClassIdField::Num(id) => Ok(id),
            ClassIdField::Text(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("invalid class id '{}'", s)),
        }
    }
}

fn resolve_opt_class(field: Option<ClassIdField>) -> Result<Option<u32>> {
    field.map(ClassIdField::resolve).transpose()
}

#[derive(Debug, Default, Deserialize)]
struct AppConfigFile {
    #[serde(default, alias = "class_config")]
    classes: BTreeMap<String, ClassConfigFile>,
    #[serde(alias = "pose_config")]
    pose: Option<PoseFile>,
    #[serde(alias = "display_config")]
    display: Option<DisplayFile>,
    #[serde(alias = "foi_config")]
    foi: Option<FoiFile>,
    dispatch: Option<DispatchFile>,
    #[serde(alias = "video_files")]
    playlist: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassConfigFile {
    name: Option<String>,
    color: Option<[u8; 3]>,
    #[serde(alias = "conf")]
    min_confidence: Option<f32>,
    #[serde(alias = "iou")]
    min_iou: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct PoseFile {
    pose_detect_classes: Option<Vec<ClassIdField>>,
    min_confidence: Option<f32>,
    roi_margin_px: Option<u32>,
    show_keypoints: Option<bool>,
    show_skeleton: Option<bool>,
    keypoint_radius: Option<u32>,
    line_thickness: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayFile {
    box_thickness: Option<u32>,
    alarm_class: Option<ClassIdField>,
}

#[derive(Debug, Default, Deserialize)]
struct FoiFile {
    enabled: Option<bool>,
    #[serde(alias = "points")]
    vertices: Option<Vec<[f32; 2]>>,
    count_class: Option<ClassIdField>,
    alert_class: Option<ClassIdField>,
    #[serde(alias = "alert_timeout")]
    alert_timeout_secs: Option<f32>,
    recovery_display_secs: Option<f32>,
    corner_hit_radius: Option<f32>,
    #[serde(alias = "foi_color")]
    color: Option<[u8; 3]>,
    #[serde(alias = "foi_thickness")]
    thickness: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchFile {
    tick_hz: Option<u32>,
    workers: Option<usize>,
}

impl AppConfig {
    /// Load from a JSON file, falling back to defaults when the file does
    /// not exist. Environment overrides and validation are always applied.
    pub fn load(path: &Path) -> Result<Self> {
        let file_cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            AppConfigFile::default()
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist in normalized form (modern keys, integer class ids).
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let mut classes = ClassMap::new();
        for (key, entry) in file.classes {
            let id: u32 = key
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid class id key '{}'", key))?;
            classes.insert(
                id,
                ClassConfig {
                    name: entry.name.unwrap_or_else(|| format!("Class {}", id)),
                    color: entry
                        .color
                        .unwrap_or(PALETTE[classes.len() % PALETTE.len()]),
                    min_confidence: entry.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
                    min_iou: entry.min_iou.unwrap_or(DEFAULT_MIN_IOU),
                },
            );
        }

        let pose_file = file.pose.unwrap_or_default();
        let pose_classes = pose_file
            .pose_detect_classes
            .unwrap_or_default()
            .into_iter()
            .map(ClassIdField::resolve)
            .collect::<Result<Vec<u32>>>()?;
        let pose_defaults = PoseSettings::default();
        let pose = PoseSettings {
            pose_detect_classes: pose_classes,
            min_confidence: pose_file
                .min_confidence
                .unwrap_or(pose_defaults.min_confidence),
            roi_margin_px: pose_file
                .roi_margin_px
                .unwrap_or(pose_defaults.roi_margin_px),
            show_keypoints: pose_file
                .show_keypoints
                .unwrap_or(pose_defaults.show_keypoints),
            show_skeleton: pose_file
                .show_skeleton
                .unwrap_or(pose_defaults.show_skeleton),
            keypoint_radius: pose_file
                .keypoint_radius
                .unwrap_or(pose_defaults.keypoint_radius),
            line_thickness: pose_file
                .line_thickness
                .unwrap_or(pose_defaults.line_thickness),
        };

        let display_file = file.display.unwrap_or_default();
        let display_defaults = DisplaySettings::default();
        let display = DisplaySettings {
            box_thickness: display_file
                .box_thickness
                .unwrap_or(display_defaults.box_thickness),
            alarm_class: resolve_opt_class(display_file.alarm_class)?,
        };

        let foi_file = file.foi.unwrap_or_default();
        let foi_defaults = FoiSettings::default();
        let foi = FoiSettings {
            enabled: foi_file.enabled.unwrap_or(foi_defaults.enabled),
            vertices: foi_file.vertices.unwrap_or(foi_defaults.vertices),
            count_class: resolve_opt_class(foi_file.count_class)?,
            alert_class: resolve_opt_class(foi_file.alert_class)?,
            alert_timeout_secs: foi_file
                .alert_timeout_secs
                .unwrap_or(foi_defaults.alert_timeout_secs),
            recovery_display_secs: foi_file
                .recovery_display_secs
                .unwrap_or(foi_defaults.recovery_display_secs),
            corner_hit_radius: foi_file
                .corner_hit_radius
                .unwrap_or(foi_defaults.corner_hit_radius),
            color: foi_file.color.unwrap_or(foi_defaults.color),
            thickness: foi_file.thickness.unwrap_or(foi_defaults.thickness),
        };

        let dispatch_file = file.dispatch.unwrap_or_default();
        let dispatch_defaults = DispatchSettings::default();
        let dispatch = DispatchSettings {
            tick_hz: dispatch_file.tick_hz.unwrap_or(dispatch_defaults.tick_hz),
            workers: dispatch_file.workers.unwrap_or(dispatch_defaults.workers),
        };

        Ok(Self {
            classes,
            pose,
            display,
            foi,
            dispatch,
            playlist: file.playlist.unwrap_or_default(),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(hz) = std::env::var("ZONEWATCH_TICK_HZ") {
            self.dispatch.tick_hz = hz
                .parse()
                .map_err(|_| anyhow!("ZONEWATCH_TICK_HZ must be an integer"))?;
        }
        if let Ok(workers) = std::env::var("ZONEWATCH_WORKERS") {
            self.dispatch.workers = workers
                .parse()
                .map_err(|_| anyhow!("ZONEWATCH_WORKERS must be an integer"))?;
        }
        if let Ok(playlist) = std::env::var("ZONEWATCH_PLAYLIST") {
            let parsed: Vec<String> = playlist
                .split(',')
                .map(|entry| entry.trim())
                .filter(|entry| !entry.is_empty())
                .map(|entry| entry.to_string())
                .collect();
            if !parsed.is_empty() {
                self.playlist = parsed;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.foi.vertices.len() < 3 {
            return Err(anyhow!(
                "FOI polygon needs at least 3 vertices, got {}",
                self.foi.vertices.len()
            ));
        }
        for v in &self.foi.vertices {
            if !(0.0..=1.0).contains(&v[0]) || !(0.0..=1.0).contains(&v[1]) {
                return Err(anyhow!(
                    "FOI vertex ({}, {}) outside relative [0,1] range",
                    v[0],
                    v[1]
                ));
            }
        }
        if !self.foi.alert_timeout_secs.is_finite() || self.foi.alert_timeout_secs <= 0.0 {
            return Err(anyhow!("alert timeout must be greater than zero"));
        }
        // Duration construction rejects negative and non-finite inputs, so
        // these must never get past the load boundary.
        if !self.foi.recovery_display_secs.is_finite() || self.foi.recovery_display_secs < 0.0 {
            return Err(anyhow!("recovery display interval must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.pose.min_confidence) {
            return Err(anyhow!("pose min_confidence must be within [0,1]"));
        }
        for (id, class) in &self.classes {
            if !(0.0..=1.0).contains(&class.min_confidence) {
                return Err(anyhow!("class {} min_confidence outside [0,1]", id));
            }
            if !(0.0..=1.0).contains(&class.min_iou) {
                return Err(anyhow!("class {} min_iou outside [0,1]", id));
            }
        }
        if self.dispatch.tick_hz == 0 {
            return Err(anyhow!("tick rate must be greater than zero"));
        }
        if self.dispatch.workers == 0 {
            return Err(anyhow!("worker pool size must be greater than zero"));
        }
        Ok(())
    }

    /// Refresh the class map from a freshly loaded detector's label set.
    ///
    /// Existing entries keep their tuned thresholds and colors; only the
    /// display name is refreshed. Unknown classes get defaults and the next
    /// palette color.
    pub fn refresh_classes(&mut self, labels: &[(u32, String)]) {
        for (id, name) in labels {
            match self.classes.get_mut(id) {
                Some(existing) => existing.name = name.clone(),
                None => {
                    let color = PALETTE[self.classes.len() % PALETTE.len()];
                    self.classes.insert(
                        *id,
                        ClassConfig {
                            name: name.clone(),
                            color,
                            min_confidence: DEFAULT_MIN_CONFIDENCE,
                            min_iou: DEFAULT_MIN_IOU,
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() -> Result<()> {
        let cfg = AppConfig::load(Path::new("/nonexistent/zonewatch.json"))?;
        assert_eq!(cfg.dispatch.tick_hz, DEFAULT_TICK_HZ);
        assert_eq!(cfg.dispatch.workers, DEFAULT_WORKERS);
        assert_eq!(cfg.foi.vertices.len(), 4);
        assert!((cfg.foi.alert_timeout_secs - 10.0).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn legacy_document_is_migrated() -> Result<()> {
        let raw = r#"{
            "class_config": {
                "0": {"name": "Person", "conf": 0.6, "iou": 0.4},
                "2": {"name": "Sled", "conf": 0.3}
            },
            "pose_config": {"pose_detect_classes": ["0"], "min_confidence": 0.25},
            "foi_config": {
                "enabled": true,
                "points": [[0.1, 0.1], [0.9, 0.1], [0.9, 0.9]],
                "count_class": "0",
                "alert_class": "2",
                "alert_timeout": 8.5
            },
            "video_files": ["stub://a", "stub://b"]
        }"#;
        let file: AppConfigFile = serde_json::from_str(raw)?;
        let cfg = AppConfig::from_file(file)?;

        assert_eq!(cfg.classes[&0].name, "Person");
        assert!((cfg.classes[&0].min_confidence - 0.6).abs() < 1e-6);
        assert_eq!(cfg.pose.pose_detect_classes, vec![0]);
        assert_eq!(cfg.foi.count_class, Some(0));
        assert_eq!(cfg.foi.alert_class, Some(2));
        assert!((cfg.foi.alert_timeout_secs - 8.5).abs() < 1e-6);
        assert_eq!(cfg.playlist, vec!["stub://a", "stub://b"]);
        Ok(())
    }

    #[test]
    fn validate_rejects_thin_polygon() {
        let mut cfg = AppConfig::default();
        cfg.foi.vertices = vec![[0.1, 0.1], [0.9, 0.9]];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut cfg = AppConfig::default();
        cfg.classes.insert(
            0,
            ClassConfig {
                name: "Person".into(),
                color: PALETTE[0],
                min_confidence: 1.5,
                min_iou: 0.4,
            },
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut cfg = AppConfig::default();
        cfg.foi.alert_timeout_secs = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_recovery_interval() {
        let mut cfg = AppConfig::default();
        cfg.foi.recovery_display_secs = -1.0;
        assert!(cfg.validate().is_err());

        cfg.foi.recovery_display_secs = f32::NAN;
        assert!(cfg.validate().is_err());

        // Zero is a valid "no display interval" setting.
        cfg.foi.recovery_display_secs = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn refresh_preserves_tuned_thresholds() {
        let mut cfg = AppConfig::default();
        cfg.classes.insert(
            0,
            ClassConfig {
                name: "old name".into(),
                color: [1, 2, 3],
                min_confidence: 0.72,
                min_iou: 0.33,
            },
        );
        cfg.refresh_classes(&[(0, "Person".to_string()), (1, "Sled".to_string())]);

        assert_eq!(cfg.classes[&0].name, "Person");
        assert!((cfg.classes[&0].min_confidence - 0.72).abs() < 1e-6);
        assert_eq!(cfg.classes[&0].color, [1, 2, 3]);
        assert_eq!(cfg.classes[&1].name, "Sled");
        assert!((cfg.classes[&1].min_confidence - DEFAULT_MIN_CONFIDENCE).abs() < 1e-6);
    }
}
