//! Point-in-time view of a session.

use serde::Serialize;

use cable_trainer_core::{
    RepCount, RepRanges, RoutineFlowState, SessionId, WorkoutParameters, WorkoutState,
};
use cable_trainer_detector::AutoStopUiState;

use crate::navigator::RoutineStep;
use crate::state::SessionInner;
use crate::timers::TimerKind;

/// Routine position as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineSnapshot {
    /// Routine identifier
    pub routine_id: String,
    /// Routine display name
    pub routine_name: String,
    /// Current step
    pub current_step: RoutineStep,
    /// Current exercise name
    pub current_exercise: Option<String>,
    /// Steps completed so far
    pub completed_sets: usize,
    /// Playable steps in the routine
    pub total_sets: usize,
    /// First step not yet completed or skipped
    pub resume_point: Option<RoutineStep>,
}

/// Everything a status query needs, copied out of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Identifier of the current or last set
    pub session_id: SessionId,
    /// Lifecycle state
    pub workout_state: WorkoutState,
    /// Routine flow
    pub flow: RoutineFlowState,
    /// Parameters of the current or next set
    pub parameters: WorkoutParameters,
    /// Reps of the current set
    pub rep_count: RepCount,
    /// Rep-range calibration
    pub rep_ranges: Option<RepRanges>,
    /// Auto-stop indicator
    pub auto_stop: AutoStopUiState,
    /// Running countdown value
    pub countdown: Option<u32>,
    /// Resting load per cable
    pub load_baseline_kg: Option<f32>,
    /// Samples collected in the current set
    pub metrics_collected: usize,
    /// A finished set is waiting to be saved
    pub save_pending: bool,
    /// Timers currently running
    pub running_timers: Vec<TimerKind>,
    /// Loaded routine, if any
    pub routine: Option<RoutineSnapshot>,
}

impl SessionSnapshot {
    /// Copy the observable parts of a session.
    pub fn capture(inner: &SessionInner, running_timers: Vec<TimerKind>) -> Self {
        let routine = inner.navigator.as_ref().map(|nav| RoutineSnapshot {
            routine_id: nav.routine().id.clone(),
            routine_name: nav.routine().name.clone(),
            current_step: nav.current(),
            current_exercise: nav.exercise_name(nav.current()).map(str::to_string),
            completed_sets: nav.completed_steps().len(),
            total_sets: nav.routine().total_sets(),
            resume_point: nav.resume_point(),
        });

        Self {
            session_id: inner.session_id,
            workout_state: inner.workout_state.clone(),
            flow: inner.flow.clone(),
            parameters: inner.parameters.clone(),
            rep_count: inner.rep_count,
            rep_ranges: inner.rep_ranges,
            auto_stop: inner.auto_stop,
            countdown: inner.countdown,
            load_baseline_kg: inner.load_baseline_kg,
            metrics_collected: inner.metrics.len(),
            save_pending: inner.pending.as_ref().is_some_and(|p| !p.saved),
            running_timers,
            routine,
        }
    }
}
