//! User-facing settings snapshot published by the settings collaborator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Display unit for weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    /// Kilograms
    #[default]
    Kg,
    /// Pounds
    Lb,
}

impl WeightUnit {
    const LB_PER_KG: f32 = 2.204_622_6;

    /// Convert a kilogram value into this unit.
    pub fn from_kg(&self, kg: f32) -> f32 {
        match self {
            WeightUnit::Kg => kg,
            WeightUnit::Lb => kg * Self::LB_PER_KG,
        }
    }
}

/// Read-only snapshot of the user's preferences.
///
/// The coordinator reads the latest value whenever it schedules a timer, so a
/// change takes effect at the next countdown or rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UserSettings {
    /// Pre-set countdown length
    pub countdown_seconds: u32,
    /// Default rest between sets when the routine does not say otherwise
    pub rest_seconds: u32,
    /// Countdown before an auto-started set
    pub auto_start_countdown_seconds: u32,
    /// Leave the set summary automatically after this many seconds (None = wait for user)
    pub summary_autoplay_seconds: Option<u32>,
    /// Audio cues enabled
    pub audio_enabled: bool,
    /// Stall detection enabled for Just Lift and AMRAP sets
    pub stall_detection_enabled: bool,
    /// Display unit
    pub weight_unit: WeightUnit,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: 5,
            rest_seconds: 60,
            auto_start_countdown_seconds: 3,
            summary_autoplay_seconds: None,
            audio_enabled: true,
            stall_detection_enabled: true,
            weight_unit: WeightUnit::Kg,
        }
    }
}
