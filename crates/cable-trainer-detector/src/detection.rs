//! Core detection types, thresholds, and the signal detector trait.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cable_trainer_core::{DetectionSettings, RepRanges, WorkoutMetric};

/// Time motionless near the start position before auto-stop fires.
pub const AUTO_STOP_DURATION_MS: u64 = 2_500;
/// Time below stall velocity before a stall is declared.
pub const STALL_DURATION_MS: u64 = 5_000;
/// Enter stall below this speed.
pub const STALL_VELOCITY_LOW: f32 = 2.5;
/// Leave stall above this speed.
pub const STALL_VELOCITY_HIGH: f32 = 10.0;
/// Position floor below which stall detection is suppressed.
pub const STALL_MIN_POSITION: f32 = 10.0;
/// Load below which handles count as at rest.
pub const HANDLE_REST_THRESHOLD: f32 = 2.5;
/// Minimum movement range (display units) for meaningful reps.
pub const MIN_RANGE_THRESHOLD: f32 = 50.0;
/// Window after AMRAP set start during which auto-stop is masked.
pub const AMRAP_STARTUP_GRACE_MS: u64 = 8_000;

/// Why an auto-stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AutoStopReason {
    /// Sustained near-zero velocity mid-range
    Stall,
    /// Handles back at the start position, unloaded or motionless
    HandlesAtRest,
}

impl std::fmt::Display for AutoStopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoStopReason::Stall => write!(f, "stall"),
            AutoStopReason::HandlesAtRest => write!(f, "handles at rest"),
        }
    }
}

/// Outcome of feeding one sample to the auto-stop detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoStopDecision {
    /// Not armed, already fired, or no stop signal present
    Idle,
    /// Inside the AMRAP startup grace window
    Masked,
    /// A stop signal is being timed; renewed motion cancels it
    Pending {
        /// Signal being timed
        reason: AutoStopReason,
        /// Milliseconds the signal has held uninterrupted
        elapsed_ms: u64,
        /// Milliseconds left before it fires
        remaining_ms: u64,
    },
    /// A pending request was cancelled by renewed motion
    Cancelled,
    /// The signal held for its full duration; stop the set
    Fire(AutoStopReason),
}

/// Auto-stop indicator published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AutoStopUiState {
    /// Detector is watching this set
    pub armed: bool,
    /// Startup grace window still running
    pub in_grace: bool,
    /// Signal currently being timed
    pub pending_reason: Option<AutoStopReason>,
    /// Fraction of the required duration elapsed (0.0-1.0)
    pub progress: f32,
    /// Seconds until auto-stop fires
    pub seconds_remaining: f32,
}

impl AutoStopUiState {
    /// Indicator for an armed detector with nothing pending.
    pub fn armed() -> Self {
        Self {
            armed: true,
            ..Self::default()
        }
    }
}

/// Inputs shared by every signal detector for one sample.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    /// Active thresholds
    pub settings: &'a DetectionSettings,
    /// Rep-range calibration so far
    pub ranges: Option<RepRanges>,
}

impl<'a> DetectionContext<'a> {
    /// Create a context.
    pub fn new(settings: &'a DetectionSettings, ranges: Option<RepRanges>) -> Self {
        Self { settings, ranges }
    }

    /// Calibrated range, if the user has moved far enough for it to mean anything.
    pub fn meaningful_ranges(&self) -> Option<RepRanges> {
        self.ranges
            .filter(|r| r.is_meaningful(self.settings.min_range_threshold))
    }
}

/// A single stop signal watched over time.
///
/// Detectors only say whether their condition holds for a sample; the
/// auto-stop detector owns the timing.
pub trait SignalDetector: Send + Sync {
    /// Detector name for debugging/logging.
    fn name(&self) -> &'static str;

    /// Reason reported when this signal fires.
    fn reason(&self) -> AutoStopReason;

    /// How long the condition must hold uninterrupted.
    fn required_duration_ms(&self, settings: &DetectionSettings) -> u64;

    /// Whether the stop condition holds for this sample.
    fn condition_holds(&mut self, metric: &WorkoutMetric, context: &DetectionContext<'_>) -> bool;

    /// Forget any per-set state.
    fn reset(&mut self);
}
