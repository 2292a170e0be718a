use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// Device index, 0 = default camera.
    #[serde(default = "default_camera_index")]
    pub index: u32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Run the body-pose estimator at startup.
    #[serde(default = "default_true")]
    pub pose_enabled: bool,
    /// Run the hand estimator at startup.
    #[serde(default = "default_true")]
    pub hands_enabled: bool,
    /// Minimum hand confidence before an instance is surfaced.
    #[serde(default = "default_hand_confidence")]
    pub hand_confidence: f32,
    #[serde(default = "default_pose_model_path")]
    pub pose_model_path: String,
    #[serde(default = "default_palm_model_path")]
    pub palm_model_path: String,
    #[serde(default = "default_hand_model_path")]
    pub hand_model_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Horizontal flip for an intuitive self-view.
    #[serde(default = "default_true")]
    pub mirror: bool,
    /// On-screen control legend.
    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

fn default_camera_index() -> u32 {
    0
}
fn default_camera_width() -> u32 {
    1280
}
fn default_camera_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}
fn default_hand_confidence() -> f32 {
    0.5
}
fn default_pose_model_path() -> String {
    "models/pose_landmarks.onnx".to_string()
}
fn default_palm_model_path() -> String {
    "models/palm_detection.onnx".to_string()
}
fn default_hand_model_path() -> String {
    "models/hand_landmarks.onnx".to_string()
}
fn default_screenshot_dir() -> String {
    "screenshots".to_string()
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            pose_enabled: true,
            hands_enabled: true,
            hand_confidence: default_hand_confidence(),
            pose_model_path: default_pose_model_path(),
            palm_model_path: default_palm_model_path(),
            hand_model_path: default_hand_model_path(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            show_legend: true,
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it is missing or
    /// malformed. A broken file is worth a warning but not a refusal to run.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        if !path.as_ref().exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "ignoring config {}: {err:#}",
                    path.as_ref().display()
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.camera.height, 720);
        assert!(config.detection.pose_enabled);
        assert!(config.detection.hands_enabled);
        assert!(config.display.mirror);
        assert_eq!(config.detection.palm_model_path, "models/palm_detection.onnx");
        assert_eq!(config.display.screenshot_dir, "screenshots");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [camera]
            width = 640
            height = 480

            [display]
            mirror = false
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.width, 640);
        assert!(!config.display.mirror);
        assert!(config.display.show_legend);
        assert!(config.detection.hands_enabled);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.detection.hand_confidence, 0.5);
    }
}
