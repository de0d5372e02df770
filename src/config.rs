use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{DeskError, DeskResult};

pub const DEFAULT_DETECTOR_URL: &str = "http://127.0.0.1:8765";
pub const DETECTOR_URL_ENV: &str = "DESKPILOT_DETECTOR_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_url")]
    pub base_url: String,
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_parse_timeout")]
    pub parse_timeout_secs: u64,
    /// Return the detector's annotated image from `parse` instead of the raw capture.
    #[serde(default)]
    pub return_labeled_image: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_detector_url(),
            health_timeout_secs: default_health_timeout(),
            parse_timeout_secs: default_parse_timeout(),
            return_labeled_image: false,
        }
    }
}

/// Settle delays and magnitudes used when sequencing synthetic input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_double_click_gap")]
    pub double_click_gap_ms: u64,
    #[serde(default = "default_chord_hold")]
    pub chord_hold_ms: u64,
    #[serde(default = "default_scroll_notches")]
    pub scroll_notches: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
            double_click_gap_ms: default_double_click_gap(),
            chord_hold_ms: default_chord_hold(),
            scroll_notches: default_scroll_notches(),
        }
    }
}

/// Hard upper bounds for each blocking OS operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_capture_timeout")]
    pub capture_secs: u64,
    #[serde(default = "default_input_timeout")]
    pub click_secs: u64,
    #[serde(default = "default_input_timeout")]
    pub type_secs: u64,
    #[serde(default = "default_input_timeout")]
    pub key_secs: u64,
    #[serde(default = "default_scroll_timeout")]
    pub scroll_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            capture_secs: default_capture_timeout(),
            click_secs: default_input_timeout(),
            type_secs: default_input_timeout(),
            key_secs: default_input_timeout(),
            scroll_secs: default_scroll_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn capture(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Keep screenshot files on disk after the result is handed back.
    #[serde(default)]
    pub keep_files: bool,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            keep_files: false,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_detector_url() -> String {
    DEFAULT_DETECTOR_URL.to_string()
}

fn default_health_timeout() -> u64 {
    5
}

fn default_parse_timeout() -> u64 {
    60
}

fn default_settle_delay() -> u64 {
    50
}

fn default_double_click_gap() -> u64 {
    100
}

fn default_chord_hold() -> u64 {
    50
}

fn default_scroll_notches() -> i32 {
    3
}

fn default_capture_timeout() -> u64 {
    15
}

fn default_input_timeout() -> u64 {
    10
}

fn default_scroll_timeout() -> u64 {
    5
}

fn default_file_prefix() -> String {
    "deskpilot-screenshot".to_string()
}

fn resolve_config_path() -> DeskResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("deskpilot").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(DeskError::Config(
        "config.toml not found next to executable, in working directory or user config dir".into(),
    ))
}

pub fn parse_config(content: &str) -> DeskResult<AppConfig> {
    let mut config: AppConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn load_config() -> DeskResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), detector = %config.detector.base_url, "config loaded");
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(url) = std::env::var(DETECTOR_URL_ENV) {
        if !url.trim().is_empty() {
            config.detector.base_url = url.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.detector.base_url, DEFAULT_DETECTOR_URL);
        assert_eq!(cfg.detector.parse_timeout_secs, 60);
        assert_eq!(cfg.detector.health_timeout_secs, 5);
        assert_eq!(cfg.timeouts.capture_secs, 15);
        assert_eq!(cfg.timeouts.click_secs, 10);
        assert_eq!(cfg.timeouts.scroll_secs, 5);
        assert_eq!(cfg.input.scroll_notches, 3);
        assert!(!cfg.capture.keep_files);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [detector]
            parse_timeout_secs = 20

            [input]
            settle_delay_ms = 80
            "#,
        )
        .unwrap();
        assert_eq!(cfg.detector.parse_timeout_secs, 20);
        assert_eq!(cfg.detector.base_url, DEFAULT_DETECTOR_URL);
        assert_eq!(cfg.input.settle_delay_ms, 80);
        assert_eq!(cfg.input.double_click_gap_ms, 100);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = toml::from_str::<AppConfig>("[detector\nbase_url = 1").unwrap_err();
        let err: DeskError = err.into();
        assert_eq!(err.code(), "config");
    }

    #[test]
    fn example_config_matches_defaults() {
        let cfg: AppConfig = toml::from_str(include_str!("../config.example.toml")).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(cfg.detector.base_url, defaults.detector.base_url);
        assert_eq!(cfg.input.chord_hold_ms, defaults.input.chord_hold_ms);
        assert_eq!(cfg.timeouts.type_secs, defaults.timeouts.type_secs);
        assert_eq!(cfg.capture.file_prefix, defaults.capture.file_prefix);
    }
}
