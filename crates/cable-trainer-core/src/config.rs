//! Configuration types for the cable trainer controller.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, UserSettings};

/// Controller configuration loaded from YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrainerConfig {
    /// Session lifecycle settings
    pub session: SessionSettings,
    /// Auto-stop detection thresholds
    pub detection: DetectionSettings,
    /// Device link settings
    pub device: DeviceSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl TrainerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: TrainerConfig = serde_yaml::from_str(yaml)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.session.countdown_seconds == 0 {
            return Err(Error::Config(
                "session.countdown_seconds must be > 0".to_string(),
            ));
        }

        if self.session.auto_start_countdown_seconds == 0 {
            return Err(Error::Config(
                "session.auto_start_countdown_seconds must be > 0".to_string(),
            ));
        }

        if self.session.metrics_buffer_capacity == 0 {
            return Err(Error::Config(
                "session.metrics_buffer_capacity must be > 0".to_string(),
            ));
        }

        self.detection.validate()?;

        Ok(())
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Countdown before a set goes active
    pub countdown_seconds: u32,
    /// Rest between sets when the routine does not say otherwise
    pub default_rest_seconds: u32,
    /// Countdown before an auto-started set
    pub auto_start_countdown_seconds: u32,
    /// Leave the set summary automatically after this many seconds
    pub summary_autoplay_seconds: Option<u32>,
    /// How long to wait for a resting load sample when resolving the baseline
    pub baseline_timeout_ms: u64,
    /// Maximum metric samples kept for one set
    pub metrics_buffer_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: 5,
            default_rest_seconds: 60,
            auto_start_countdown_seconds: 3,
            summary_autoplay_seconds: None,
            baseline_timeout_ms: 1500,
            metrics_buffer_capacity: 36_000,
        }
    }
}

impl SessionSettings {
    /// Initial user settings snapshot seeded from the config file.
    pub fn user_settings(&self) -> UserSettings {
        UserSettings {
            countdown_seconds: self.countdown_seconds,
            rest_seconds: self.default_rest_seconds,
            auto_start_countdown_seconds: self.auto_start_countdown_seconds,
            summary_autoplay_seconds: self.summary_autoplay_seconds,
            ..UserSettings::default()
        }
    }
}

/// Auto-stop and stall detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Time motionless near the start position before auto-stop fires
    pub auto_stop_duration_ms: u64,
    /// Time below stall velocity before a stall is declared
    pub stall_duration_ms: u64,
    /// Enter stall below this speed
    pub stall_velocity_low: f32,
    /// Leave stall above this speed
    pub stall_velocity_high: f32,
    /// Below this position stall detection is suppressed
    pub stall_min_position: f32,
    /// Load below which handles count as at rest
    pub handle_rest_threshold: f32,
    /// Minimum movement range for a rep to count as meaningful
    pub min_range_threshold: f32,
    /// Window after AMRAP set start during which auto-stop is masked
    pub amrap_startup_grace_ms: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            auto_stop_duration_ms: 2_500,
            stall_duration_ms: 5_000,
            stall_velocity_low: 2.5,
            stall_velocity_high: 10.0,
            stall_min_position: 10.0,
            handle_rest_threshold: 2.5,
            min_range_threshold: 50.0,
            amrap_startup_grace_ms: 8_000,
        }
    }
}

impl DetectionSettings {
    /// Validate threshold consistency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.auto_stop_duration_ms == 0 || self.stall_duration_ms == 0 {
            return Err(Error::Config(
                "detection durations must be > 0".to_string(),
            ));
        }

        if self.stall_velocity_low >= self.stall_velocity_high {
            return Err(Error::Config(format!(
                "detection.stall_velocity_low ({}) must be below stall_velocity_high ({})",
                self.stall_velocity_low, self.stall_velocity_high
            )));
        }

        if self.min_range_threshold <= 0.0 {
            return Err(Error::Config(
                "detection.min_range_threshold must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Device link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Repeated handle-detection enables inside this window are collapsed
    pub handle_detection_debounce_ms: u64,
    /// Give up on a command after this long
    pub command_timeout_ms: u64,
    /// Advertised name used by the simulated device
    pub simulated_device_name: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            handle_detection_debounce_ms: 500,
            command_timeout_ms: 3_000,
            simulated_device_name: "Vee_Sim".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainerConfig::default();
        assert_eq!(config.session.countdown_seconds, 5);
        assert_eq!(config.detection.auto_stop_duration_ms, 2_500);
        assert_eq!(config.detection.stall_duration_ms, 5_000);
        assert_eq!(config.detection.amrap_startup_grace_ms, 8_000);
        assert_eq!(config.device.handle_detection_debounce_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = TrainerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_settings_seeded_from_session() {
        let mut config = TrainerConfig::default();
        config.session.default_rest_seconds = 90;
        config.session.summary_autoplay_seconds = Some(10);
        let settings = config.session.user_settings();
        assert_eq!(settings.rest_seconds, 90);
        assert_eq!(settings.summary_autoplay_seconds, Some(10));
        assert!(settings.stall_detection_enabled);
    }

    #[test]
    fn test_invalid_countdown() {
        let mut config = TrainerConfig::default();
        config.session.countdown_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_stall_band() {
        let mut config = TrainerConfig::default();
        config.detection.stall_velocity_low = 12.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
session:
  countdown_seconds: 3
  baseline_timeout_ms: 1000
  metrics_buffer_capacity: 5000

detection:
  auto_stop_duration_ms: 3000
  stall_duration_ms: 6000
  stall_velocity_low: 2.0
  stall_velocity_high: 8.0

device:
  handle_detection_debounce_ms: 250
  command_timeout_ms: 2000
  simulated_device_name: "Vee_Test"

logging:
  level: debug
"#;

        let config = TrainerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.session.countdown_seconds, 3);
        assert_eq!(config.session.metrics_buffer_capacity, 5000);
        assert_eq!(config.detection.auto_stop_duration_ms, 3000);
        assert_eq!(config.detection.stall_velocity_high, 8.0);
        // untouched fields keep their defaults
        assert_eq!(config.detection.min_range_threshold, 50.0);
        assert_eq!(config.device.handle_detection_debounce_ms, 250);
        assert_eq!(config.device.simulated_device_name, "Vee_Test");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_yaml() {
        let result = TrainerConfig::from_yaml("session: [not, a, map]");
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_failing_validation() {
        let yaml = r#"
detection:
  stall_velocity_low: 20.0
  stall_velocity_high: 10.0
"#;
        assert!(TrainerConfig::from_yaml(yaml).is_err());
    }
}
