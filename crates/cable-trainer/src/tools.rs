//! MCP tool parameter and response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cable_trainer_core::{
    EchoLevel, Exercise, ExerciseType, HandleState, Routine, RoutineFlowState, WorkoutState,
};
use cable_trainer_session::{RoutineStep, SessionSnapshot, SetReadyAdjustment};

// =============================================================================
// Workout Tools
// =============================================================================

/// Parameters for tools that take no input
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmptyParams {}

/// Parameters for workout_start
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StartParams {
    /// Go straight to the active set without the countdown
    #[serde(default)]
    pub skip_countdown: bool,

    /// Start a free-form Just Lift set instead of the staged one
    #[serde(default)]
    pub just_lift: bool,
}

/// Parameters for workout_stop
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StopParams {
    /// Leave the workout entirely instead of showing the set summary
    #[serde(default)]
    pub exit_workout: bool,
}

/// Parameters for workout_log_rpe
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RpeParams {
    /// Rating of perceived exertion, 1-10
    pub rpe: u8,
}

/// Parameters for workout_add_rest
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RestParams {
    /// Seconds to add to the running rest
    pub seconds: u32,
}

/// Parameters for workout_wait
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WaitParams {
    /// States to wait for: idle, initializing, countdown, active, paused,
    /// set_summary, resting, completed
    pub states: Vec<String>,

    /// Wait for the state to leave the listed states instead
    #[serde(default)]
    pub gone: bool,

    /// Timeout in milliseconds
    #[serde(default = "default_wait_timeout")]
    pub timeout_ms: u64,
}

fn default_wait_timeout() -> u64 {
    30_000
}

/// Response for tools that change the workout state
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutResponse {
    /// Whether the request changed anything
    pub changed: bool,

    /// Workout state afterwards
    pub workout_state: WorkoutState,

    /// Human-readable outcome
    pub message: String,
}

/// Response for workout_retry_save
#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    /// The set beat the previous best
    pub is_personal_record: bool,

    /// Badges earned by the save
    pub badges: Vec<String>,

    /// Sets stored so far
    pub sessions_saved: usize,

    /// Human-readable outcome
    pub message: String,
}

/// Response for workout_status
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Session snapshot
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,

    /// Whether the simulated trainer is connected
    pub connected: bool,

    /// Sets stored so far
    pub sessions_saved: usize,
}

/// Response for workout_wait
#[derive(Debug, Clone, Serialize)]
pub struct WaitResponse {
    /// Whether the condition was met before the timeout
    pub condition_met: bool,

    /// Time waited in milliseconds
    pub waited_ms: u64,

    /// State when the wait ended
    pub workout_state: WorkoutState,

    /// Human-readable outcome
    pub message: String,
}

// =============================================================================
// Routine Tools
// =============================================================================

/// Parameters for routine_load_sample
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoadSampleParams {
    /// Which template to load
    #[serde(default)]
    pub routine: SampleRoutine,

    /// Stage the first set right away
    #[serde(default = "default_true")]
    pub stage_first_set: bool,
}

fn default_true() -> bool {
    true
}

/// Built-in routine templates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SampleRoutine {
    /// Cable presses with a warm-up set and a push-up finisher
    #[default]
    UpperPush,
    /// Row and press superset followed by curls
    Superset,
}

impl SampleRoutine {
    /// Library id of the template.
    pub fn routine_id(&self) -> &'static str {
        match self {
            SampleRoutine::UpperPush => "upper-push-day-1",
            SampleRoutine::Superset => "pull-push-superset",
        }
    }
}

/// Parameters for routine_load
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadRoutineParams {
    /// Library id of the routine (see routine_list)
    pub routine_id: String,

    /// Stage the first set right away
    #[serde(default = "default_true")]
    pub stage_first_set: bool,
}

/// Parameters for routine_adjust_set
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AdjustSetParams {
    /// New weight per cable (kg)
    #[serde(default)]
    pub weight_per_cable_kg: Option<f32>,

    /// New rep target
    #[serde(default)]
    pub reps: Option<u32>,

    /// New echo level
    #[serde(default)]
    pub echo_level: Option<EchoLevel>,

    /// New eccentric load (percent of concentric)
    #[serde(default)]
    pub eccentric_load_percent: Option<u8>,
}

impl From<AdjustSetParams> for SetReadyAdjustment {
    fn from(params: AdjustSetParams) -> Self {
        SetReadyAdjustment {
            weight_per_cable_kg: params.weight_per_cable_kg,
            reps: params.reps,
            echo_level: params.echo_level,
            eccentric_load_percent: params.eccentric_load_percent,
        }
    }
}

/// Parameters for exercise_list
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExerciseListParams {
    /// Only exercises done away from the cable machine
    #[serde(default)]
    pub hybrid_only: bool,

    /// Only exercises of this kind
    #[serde(default)]
    pub exercise_type: Option<ExerciseType>,
}

/// Response for exercise_list
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseListResponse {
    /// Number of exercises returned
    pub count: usize,

    /// Matching exercises
    pub exercises: Vec<Exercise>,
}

/// One routine in routine_list
#[derive(Debug, Clone, Serialize)]
pub struct RoutineSummary {
    /// Library id
    pub id: String,

    /// Display name
    pub name: String,

    /// Exercises in the routine
    pub exercise_count: usize,

    /// Supersets in the routine
    pub superset_count: usize,
}

impl From<&Routine> for RoutineSummary {
    fn from(routine: &Routine) -> Self {
        Self {
            id: routine.id.clone(),
            name: routine.name.clone(),
            exercise_count: routine.exercises.len(),
            superset_count: routine.supersets.len(),
        }
    }
}

/// Response for routine_list
#[derive(Debug, Clone, Serialize)]
pub struct RoutineListResponse {
    /// Stored routines
    pub routines: Vec<RoutineSummary>,
}

/// Parameters for routine_jump_to_exercise
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JumpParams {
    /// Zero-based exercise index
    pub exercise_index: usize,
}

/// Response for routine tools
#[derive(Debug, Clone, Serialize)]
pub struct RoutineResponse {
    /// Whether the routine position changed
    pub moved: bool,

    /// Routine flow afterwards
    pub flow: RoutineFlowState,

    /// Current step, if a routine is loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<RoutineStep>,

    /// First open step, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_point: Option<RoutineStep>,

    /// Human-readable outcome
    pub message: String,
}

// =============================================================================
// Device Tools
// =============================================================================

/// Parameters for device_simulate_rep
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SimulateRepParams {
    /// Number of reps to play
    #[serde(default = "default_rep_count")]
    pub count: u32,

    /// Cable position at the bottom of the rep (mm)
    #[serde(default)]
    pub bottom_mm: f32,

    /// Cable position at the top of the rep (mm)
    #[serde(default = "default_top_mm")]
    pub top_mm: f32,

    /// Load per cable while lifting (kg)
    #[serde(default = "default_load_kg")]
    pub load_kg: f32,
}

impl Default for SimulateRepParams {
    fn default() -> Self {
        Self {
            count: default_rep_count(),
            bottom_mm: 0.0,
            top_mm: default_top_mm(),
            load_kg: default_load_kg(),
        }
    }
}

fn default_rep_count() -> u32 {
    1
}

fn default_top_mm() -> f32 {
    400.0
}

fn default_load_kg() -> f32 {
    20.0
}

/// Parameters for device_set_handles
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HandleParams {
    /// New handle state
    pub state: HandleState,
}

/// Response for device tools
#[derive(Debug, Clone, Serialize)]
pub struct DeviceResponse {
    /// Workout state after the simulated input was queued
    pub workout_state: WorkoutState,

    /// Human-readable outcome
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_rep_defaults() {
        let params: SimulateRepParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.count, 1);
        assert_eq!(params.top_mm, 400.0);
        assert_eq!(params.load_kg, 20.0);
    }

    #[test]
    fn test_load_sample_defaults() {
        let params: LoadSampleParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.routine, SampleRoutine::UpperPush);
        assert!(params.stage_first_set);

        let params: LoadSampleParams =
            serde_json::from_str(r#"{"routine": "superset", "stage_first_set": false}"#).unwrap();
        assert_eq!(params.routine, SampleRoutine::Superset);
        assert!(!params.stage_first_set);
    }

    #[test]
    fn test_adjust_set_params_partial() {
        let params: AdjustSetParams =
            serde_json::from_str(r#"{"weight_per_cable_kg": 25.0, "echo_level": "harder"}"#)
                .unwrap();
        let adjustment = SetReadyAdjustment::from(params);
        assert_eq!(adjustment.weight_per_cable_kg, Some(25.0));
        assert_eq!(adjustment.echo_level, Some(EchoLevel::Harder));
        assert_eq!(adjustment.reps, None);
        assert_eq!(adjustment.eccentric_load_percent, None);
    }

    #[test]
    fn test_exercise_list_params_type_filter() {
        let params: ExerciseListParams =
            serde_json::from_str(r#"{"exercise_type": "TRX"}"#).unwrap();
        assert_eq!(params.exercise_type, Some(ExerciseType::Trx));
        assert!(!params.hybrid_only);
    }

    #[test]
    fn test_sample_routine_ids() {
        assert_eq!(SampleRoutine::UpperPush.routine_id(), "upper-push-day-1");
        assert_eq!(SampleRoutine::Superset.routine_id(), "pull-push-superset");
    }

    #[test]
    fn test_wait_params_default_timeout() {
        let params: WaitParams = serde_json::from_str(r#"{"states": ["active"]}"#).unwrap();
        assert_eq!(params.timeout_ms, 30_000);
        assert!(!params.gone);
    }

    #[test]
    fn test_handle_params_snake_case() {
        let params: HandleParams = serde_json::from_str(r#"{"state": "grabbed"}"#).unwrap();
        assert_eq!(params.state, HandleState::Grabbed);
    }
}
