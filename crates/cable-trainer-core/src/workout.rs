//! Workout state machine types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Resistance program run by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgramMode {
    /// Constant load on both phases
    #[default]
    OldSchool,
    /// Lighter, faster reps with load ramping on speed
    Pump,
    /// Load applied on the lowering phase only
    EccentricOnly,
    /// Load adapts to measured output rep by rep
    Echo,
    /// Time under tension, harsher variant
    TutBeast,
    /// Time under tension
    Tut,
}

impl ProgramMode {
    /// Echo sets ignore the configured weight.
    pub fn uses_fixed_weight(&self) -> bool {
        !matches!(self, ProgramMode::Echo)
    }
}

impl std::fmt::Display for ProgramMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProgramMode::OldSchool => "Old School",
            ProgramMode::Pump => "Pump",
            ProgramMode::EccentricOnly => "Eccentric Only",
            ProgramMode::Echo => "Echo",
            ProgramMode::TutBeast => "TUT Beast",
            ProgramMode::Tut => "TUT",
        };
        write!(f, "{name}")
    }
}

/// Echo mode difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EchoLevel {
    /// Base level
    #[default]
    Hard,
    /// Second level
    Harder,
    /// Third level
    Hardest,
    /// Maximum
    Epic,
}

/// Parameters for the set being prepared or performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkoutParameters {
    /// Selected exercise (None for a free-form Just Lift set)
    pub exercise_id: Option<String>,
    /// Display name of the selected exercise
    pub exercise_name: Option<String>,
    /// Resistance program
    pub program_mode: ProgramMode,
    /// Target working reps
    pub reps: u32,
    /// Load per cable in kilograms
    pub weight_per_cable_kg: f32,
    /// Warm-up reps counted before working reps
    pub warmup_reps: u32,
    /// Per-set weight change applied by progression (negative = regression)
    pub progression_regression_kg: f32,
    /// Free-form mode, no fixed rep target
    pub is_just_lift: bool,
    /// As many reps as possible, completion by auto-stop
    pub is_amrap: bool,
    /// End the set at the top of the final rep
    pub stop_at_top: bool,
    /// Echo difficulty
    pub echo_level: EchoLevel,
    /// Eccentric load as a percentage of concentric load (0-150)
    pub eccentric_load_percent: u8,
    /// Start the set automatically when handles are grabbed
    pub use_auto_start: bool,
    /// Duration for timed (bodyweight / non-cable) exercises
    pub duration_seconds: Option<u32>,
}

impl Default for WorkoutParameters {
    fn default() -> Self {
        Self {
            exercise_id: None,
            exercise_name: None,
            program_mode: ProgramMode::OldSchool,
            reps: 10,
            weight_per_cable_kg: 10.0,
            warmup_reps: 3,
            progression_regression_kg: 0.0,
            is_just_lift: false,
            is_amrap: false,
            stop_at_top: false,
            echo_level: EchoLevel::Hard,
            eccentric_load_percent: 100,
            use_auto_start: false,
            duration_seconds: None,
        }
    }
}

impl WorkoutParameters {
    /// Highest load a single cable accepts.
    pub const MAX_WEIGHT_PER_CABLE_KG: f32 = 100.0;

    /// Highest eccentric load percentage.
    pub const MAX_ECCENTRIC_LOAD_PERCENT: u8 = 150;

    /// Whether the set ends by reaching a rep count.
    pub fn has_rep_target(&self) -> bool {
        !self.is_just_lift && !self.is_amrap && self.duration_seconds.is_none()
    }

    /// Whether the set is driven by a duration countdown instead of reps.
    pub fn is_timed(&self) -> bool {
        self.duration_seconds.is_some()
    }

    /// Whether the set relies on the auto-stop detector to finish.
    pub fn uses_auto_stop(&self) -> bool {
        self.is_just_lift || self.is_amrap
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=Self::MAX_WEIGHT_PER_CABLE_KG).contains(&self.weight_per_cable_kg) {
            return Err(crate::Error::InvalidInput(format!(
                "weight_per_cable_kg must be within 0-{}, got {}",
                Self::MAX_WEIGHT_PER_CABLE_KG,
                self.weight_per_cable_kg
            )));
        }
        if self.eccentric_load_percent > Self::MAX_ECCENTRIC_LOAD_PERCENT {
            return Err(crate::Error::InvalidInput(format!(
                "eccentric_load_percent must be <= {}, got {}",
                Self::MAX_ECCENTRIC_LOAD_PERCENT,
                self.eccentric_load_percent
            )));
        }
        if self.has_rep_target() && self.reps == 0 {
            return Err(crate::Error::InvalidInput(
                "reps must be > 0 for a set with a rep target".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rep counters for the current set.
///
/// Every field is non-decreasing within one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RepCount {
    /// Warm-up reps
    pub warmup_reps: u32,
    /// Working reps
    pub working_reps: u32,
    /// Reps past the working target
    pub burnout_reps: u32,
}

impl RepCount {
    /// All reps of the set.
    pub fn total(&self) -> u32 {
        self.warmup_reps + self.working_reps + self.burnout_reps
    }

    /// Whether nothing has been counted yet.
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }

    /// Fold a newer count in without ever moving a counter backwards.
    pub fn merge_monotonic(&mut self, newer: &RepCount) {
        self.warmup_reps = self.warmup_reps.max(newer.warmup_reps);
        self.working_reps = self.working_reps.max(newer.working_reps);
        self.burnout_reps = self.burnout_reps.max(newer.burnout_reps);
    }
}

/// Rep-range calibration learned from the positions of counted reps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepRanges {
    /// Lowest position seen at the bottom of a rep
    pub bottom_position: f32,
    /// Highest position seen at the top of a rep
    pub top_position: f32,
}

impl RepRanges {
    /// Start a calibration from a single observed position.
    pub fn from_position(position: f32) -> Self {
        Self {
            bottom_position: position,
            top_position: position,
        }
    }

    /// Widen the calibration to include a position.
    pub fn include(&mut self, position: f32) {
        self.bottom_position = self.bottom_position.min(position);
        self.top_position = self.top_position.max(position);
    }

    /// Distance between bottom and top.
    pub fn range(&self) -> f32 {
        self.top_position - self.bottom_position
    }

    /// Whether the range is wide enough to count as real movement.
    pub fn is_meaningful(&self, min_range: f32) -> bool {
        self.range() >= min_range
    }

    /// Whether a position lies within `tolerance` of the bottom of the range.
    pub fn is_near_bottom(&self, position: f32, tolerance: f32) -> bool {
        position <= self.bottom_position + tolerance
    }
}

/// Force statistics for one cable over a set, in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CableForces {
    /// Peak load while lifting
    pub peak_concentric_kg: f32,
    /// Peak load while lowering
    pub peak_eccentric_kg: f32,
    /// Mean load while lifting
    pub avg_concentric_kg: f32,
    /// Mean load while lowering
    pub avg_eccentric_kg: f32,
}

/// Snapshot computed once per completed set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SetSummary {
    /// Active time of the set in milliseconds
    pub duration_ms: u64,
    /// Final rep count
    pub rep_count: RepCount,
    /// Left cable forces
    pub cable_a: CableForces,
    /// Right cable forces
    pub cable_b: CableForces,
    /// Working reps times total load, in kilograms
    pub total_volume_kg: f32,
    /// Estimated energy expenditure
    pub calories: f32,
    /// Logged rate of perceived exertion (1-10)
    pub rpe: Option<u8>,
}

impl SetSummary {
    /// Highest load seen on either cable in either phase.
    pub fn peak_force_kg(&self) -> f32 {
        [
            self.cable_a.peak_concentric_kg,
            self.cable_a.peak_eccentric_kg,
            self.cable_b.peak_concentric_kg,
            self.cable_b.peak_eccentric_kg,
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

/// What the rest period leads into.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RestInfo {
    /// Seconds left on the rest timer
    pub seconds_remaining: u32,
    /// Exercise that follows the rest
    pub next_exercise_name: Option<String>,
    /// 1-based set number that follows the rest
    pub next_set_number: u32,
    /// Rest between superset cycles rather than per exercise
    pub is_superset_rest: bool,
}

/// User-observable lifecycle of the current set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkoutState {
    /// Nothing running
    #[default]
    Idle,
    /// Start requested, resolving baseline
    Initializing,
    /// Counting down to the set
    Countdown {
        /// Seconds left before the set goes active
        seconds_remaining: u32,
    },
    /// Set in progress
    Active,
    /// Set paused by the user
    Paused,
    /// Set finished, summary pending acknowledgement
    SetSummary(SetSummary),
    /// Rest between sets
    Resting(RestInfo),
    /// Routine finished
    Completed,
}

impl WorkoutState {
    /// Short name for logs and status output.
    pub fn name(&self) -> &'static str {
        match self {
            WorkoutState::Idle => "idle",
            WorkoutState::Initializing => "initializing",
            WorkoutState::Countdown { .. } => "countdown",
            WorkoutState::Active => "active",
            WorkoutState::Paused => "paused",
            WorkoutState::SetSummary(_) => "set_summary",
            WorkoutState::Resting(_) => "resting",
            WorkoutState::Completed => "completed",
        }
    }

    /// Whether a set is starting or running.
    pub fn is_in_set(&self) -> bool {
        matches!(
            self,
            WorkoutState::Initializing
                | WorkoutState::Countdown { .. }
                | WorkoutState::Active
                | WorkoutState::Paused
        )
    }

    /// The pending summary, if the state holds one.
    pub fn summary(&self) -> Option<&SetSummary> {
        match self {
            WorkoutState::SetSummary(summary) => Some(summary),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkoutState::Countdown { seconds_remaining } => {
                write!(f, "countdown({seconds_remaining})")
            }
            WorkoutState::Resting(info) => write!(f, "resting({})", info.seconds_remaining),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = WorkoutParameters::default();
        assert_eq!(params.reps, 10);
        assert_eq!(params.warmup_reps, 3);
        assert_eq!(params.eccentric_load_percent, 100);
        assert!(params.has_rep_target());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_just_lift_has_no_rep_target() {
        let params = WorkoutParameters {
            is_just_lift: true,
            reps: 0,
            ..Default::default()
        };
        assert!(!params.has_rep_target());
        assert!(params.uses_auto_stop());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_weight() {
        let params = WorkoutParameters {
            weight_per_cable_kg: 120.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_eccentric_load() {
        let params = WorkoutParameters {
            eccentric_load_percent: 151,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_reps_with_target_rejected() {
        let params = WorkoutParameters {
            reps: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rep_count_merge_never_decreases() {
        let mut count = RepCount {
            warmup_reps: 3,
            working_reps: 5,
            burnout_reps: 0,
        };
        count.merge_monotonic(&RepCount {
            warmup_reps: 2,
            working_reps: 6,
            burnout_reps: 0,
        });
        assert_eq!(count.warmup_reps, 3);
        assert_eq!(count.working_reps, 6);
        assert_eq!(count.total(), 9);
    }

    #[test]
    fn test_rep_ranges() {
        let mut ranges = RepRanges::from_position(100.0);
        ranges.include(20.0);
        ranges.include(400.0);
        assert_eq!(ranges.range(), 380.0);
        assert!(ranges.is_meaningful(50.0));
        assert!(ranges.is_near_bottom(30.0, 15.0));
        assert!(!ranges.is_near_bottom(100.0, 15.0));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(WorkoutState::Idle.name(), "idle");
        assert_eq!(
            WorkoutState::Countdown {
                seconds_remaining: 3
            }
            .to_string(),
            "countdown(3)"
        );
        assert!(WorkoutState::Paused.is_in_set());
        assert!(!WorkoutState::Completed.is_in_set());
    }

    #[test]
    fn test_summary_peak_force() {
        let summary = SetSummary {
            cable_a: CableForces {
                peak_concentric_kg: 21.0,
                peak_eccentric_kg: 24.5,
                ..Default::default()
            },
            cable_b: CableForces {
                peak_concentric_kg: 22.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(summary.peak_force_kg(), 24.5);
    }

    #[test]
    fn test_state_serialization() {
        let state = WorkoutState::Countdown {
            seconds_remaining: 4,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"countdown","seconds_remaining":4}"#);

        let summary = WorkoutState::SetSummary(SetSummary::default());
        let json = serde_json::to_string(&summary).unwrap();
        let back: WorkoutState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
