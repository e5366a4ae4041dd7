//! Routine navigation: exercise/set position, supersets, and resume.
//!
//! The navigator never fails: queries answer with `bool` or `Option`, and a
//! move that is not possible leaves the position untouched.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use cable_trainer_core::{
    EchoLevel, Routine, RoutineExercise, RoutineFlowState, WorkoutParameters,
};

/// One (exercise, set) pair of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RoutineStep {
    /// Exercise position in the routine
    pub exercise_index: usize,
    /// Set position within the exercise
    pub set_index: usize,
}

impl RoutineStep {
    /// Create a step.
    pub fn new(exercise_index: usize, set_index: usize) -> Self {
        Self {
            exercise_index,
            set_index,
        }
    }
}

/// A move to another step and the rest that precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepTransition {
    /// Where the routine continues
    pub step: RoutineStep,
    /// Rest before the step (0 = go straight on)
    pub rest_seconds: u32,
    /// The rest closes a full superset cycle
    pub is_superset_rest: bool,
}

/// User changes to a staged set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetReadyAdjustment {
    /// New weight per cable
    pub weight_per_cable_kg: Option<f32>,
    /// New rep target
    pub reps: Option<u32>,
    /// New echo level
    pub echo_level: Option<EchoLevel>,
    /// New eccentric load
    pub eccentric_load_percent: Option<u8>,
}

/// Position within a loaded routine.
#[derive(Debug, Clone)]
pub struct RoutineNavigator {
    routine: Routine,
    current: RoutineStep,
    completed: BTreeSet<RoutineStep>,
    skipped: BTreeSet<RoutineStep>,
    /// Accumulated progression per exercise index
    progression: HashMap<usize, f32>,
}

impl RoutineNavigator {
    /// Start at the first playable set of `routine`.
    pub fn new(routine: Routine) -> Self {
        let first = (0..routine.exercises.len())
            .find(|i| Self::is_lift(&routine.exercises[*i]))
            .unwrap_or(0);
        Self {
            routine,
            current: RoutineStep::new(first, 0),
            completed: BTreeSet::new(),
            skipped: BTreeSet::new(),
            progression: HashMap::new(),
        }
    }

    fn is_lift(exercise: &RoutineExercise) -> bool {
        !exercise.is_rest_entry() && exercise.set_count() > 0
    }

    /// The loaded routine.
    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    /// The current step.
    pub fn current(&self) -> RoutineStep {
        self.current
    }

    /// The exercise of the current step.
    pub fn current_exercise(&self) -> Option<&RoutineExercise> {
        self.routine.exercises.get(self.current.exercise_index)
    }

    /// Whether a step exists and can be performed.
    pub fn is_playable(&self, step: RoutineStep) -> bool {
        self.routine
            .exercises
            .get(step.exercise_index)
            .is_some_and(|e| Self::is_lift(e) && step.set_index < e.set_count())
    }

    /// Whether a step was completed.
    pub fn is_completed(&self, step: RoutineStep) -> bool {
        self.completed.contains(&step)
    }

    /// Whether a step was skipped.
    pub fn is_skipped(&self, step: RoutineStep) -> bool {
        self.skipped.contains(&step)
    }

    /// Completed steps, in routine order.
    pub fn completed_steps(&self) -> Vec<RoutineStep> {
        self.completed.iter().copied().collect()
    }

    /// Mark the current step completed and apply the exercise's progression.
    pub fn mark_current_completed(&mut self) {
        let step = self.current;
        if self.completed.insert(step) {
            self.skipped.remove(&step);
            if let Some(exercise) = self.routine.exercises.get(step.exercise_index) {
                if exercise.progression_kg != 0.0 {
                    *self.progression.entry(step.exercise_index).or_default() +=
                        exercise.progression_kg;
                }
            }
        }
    }

    fn is_done(&self, step: RoutineStep) -> bool {
        self.completed.contains(&step) || self.skipped.contains(&step)
    }

    /// The step after `from` in performance order, ignoring completion.
    fn following(&self, from: RoutineStep) -> Option<StepTransition> {
        let exercise = self.routine.exercises.get(from.exercise_index)?;

        if let Some(superset_id) = exercise.superset_id.as_deref() {
            let members = self.routine.superset_members(superset_id);
            let cycle_rest = self
                .routine
                .superset(superset_id)
                .map(|s| s.rest_between_seconds)
                .unwrap_or(exercise.rest_seconds);
            let position = members.iter().position(|m| *m == from.exercise_index)?;

            // rest of this cycle: straight on
            for member in &members[position + 1..] {
                let step = RoutineStep::new(*member, from.set_index);
                if self.is_playable(step) {
                    return Some(StepTransition {
                        step,
                        rest_seconds: 0,
                        is_superset_rest: false,
                    });
                }
            }

            // next cycle: superset rest
            for member in &members {
                let step = RoutineStep::new(*member, from.set_index + 1);
                if self.is_playable(step) {
                    return Some(StepTransition {
                        step,
                        rest_seconds: cycle_rest,
                        is_superset_rest: true,
                    });
                }
            }

            let last_member = members.last().copied().unwrap_or(from.exercise_index);
            return self.first_after(last_member, cycle_rest);
        }

        let next_set = RoutineStep::new(from.exercise_index, from.set_index + 1);
        if self.is_playable(next_set) {
            return Some(StepTransition {
                step: next_set,
                rest_seconds: exercise.rest_after_set(from.set_index),
                is_superset_rest: false,
            });
        }
        self.first_after(from.exercise_index, exercise.rest_after_set(from.set_index))
    }

    /// First set of the first playable exercise after `index`.
    ///
    /// Rest placeholders passed on the way replace the pending rest.
    fn first_after(&self, index: usize, rest_seconds: u32) -> Option<StepTransition> {
        let mut rest = rest_seconds;
        for (i, exercise) in self.routine.exercises.iter().enumerate().skip(index + 1) {
            if exercise.is_rest_entry() {
                rest = exercise.duration_seconds.unwrap_or(exercise.rest_seconds);
                continue;
            }
            if Self::is_lift(exercise) {
                return Some(StepTransition {
                    step: RoutineStep::new(i, 0),
                    rest_seconds: rest,
                    is_superset_rest: false,
                });
            }
        }
        None
    }

    /// The next step not yet completed or skipped, without moving.
    pub fn peek_next(&self) -> Option<StepTransition> {
        let mut transition = self.following(self.current)?;
        // bounded by the number of steps in the routine
        for _ in 0..=self.routine.total_sets() {
            if !self.is_done(transition.step) {
                return Some(transition);
            }
            let rest = transition.rest_seconds;
            let superset_rest = transition.is_superset_rest;
            transition = self.following(transition.step)?;
            // keep the larger rest when hopping over finished steps
            if rest > transition.rest_seconds {
                transition.rest_seconds = rest;
                transition.is_superset_rest = superset_rest;
            }
        }
        None
    }

    /// Move to the next open step.
    pub fn advance(&mut self) -> Option<StepTransition> {
        let transition = self.peek_next()?;
        debug!(
            "Routine advance: {:?} -> {:?} (rest {}s)",
            self.current, transition.step, transition.rest_seconds
        );
        self.current = transition.step;
        Some(transition)
    }

    /// Move forward one step without completing the current one.
    pub fn next_step(&mut self) -> bool {
        match self.following(self.current) {
            Some(transition) => {
                self.current = transition.step;
                true
            }
            None => false,
        }
    }

    /// Move back one step.
    pub fn previous_step(&mut self) -> bool {
        match self.preceding(self.current) {
            Some(step) => {
                self.current = step;
                true
            }
            None => false,
        }
    }

    fn preceding(&self, from: RoutineStep) -> Option<RoutineStep> {
        let exercise = self.routine.exercises.get(from.exercise_index)?;

        if let Some(superset_id) = exercise.superset_id.as_deref() {
            let members = self.routine.superset_members(superset_id);
            let position = members.iter().position(|m| *m == from.exercise_index)?;

            for member in members[..position].iter().rev() {
                let step = RoutineStep::new(*member, from.set_index);
                if self.is_playable(step) {
                    return Some(step);
                }
            }
            if from.set_index > 0 {
                for member in members.iter().rev() {
                    let step = RoutineStep::new(*member, from.set_index - 1);
                    if self.is_playable(step) {
                        return Some(step);
                    }
                }
            }
            let first_member = members.first().copied().unwrap_or(from.exercise_index);
            return self.last_before(first_member);
        }

        if from.set_index > 0 {
            return Some(RoutineStep::new(from.exercise_index, from.set_index - 1));
        }
        self.last_before(from.exercise_index)
    }

    fn last_before(&self, index: usize) -> Option<RoutineStep> {
        (0..index).rev().find_map(|i| {
            let exercise = &self.routine.exercises[i];
            Self::is_lift(exercise).then(|| RoutineStep::new(i, exercise.set_count() - 1))
        })
    }

    /// Skip the rest of the current exercise.
    ///
    /// Returns where the routine continues, or `None` when nothing is left.
    pub fn skip_exercise(&mut self) -> Option<StepTransition> {
        let index = self.current.exercise_index;
        let set_count = self
            .routine
            .exercises
            .get(index)
            .map(|e| e.set_count())
            .unwrap_or(0);
        for set_index in 0..set_count {
            let step = RoutineStep::new(index, set_index);
            if !self.completed.contains(&step) {
                self.skipped.insert(step);
            }
        }
        debug!("Exercise {} skipped", index);
        self.advance()
    }

    /// Jump to an exercise, landing on its first open set.
    pub fn jump_to_exercise(&mut self, exercise_index: usize) -> bool {
        let Some(exercise) = self.routine.exercises.get(exercise_index) else {
            return false;
        };
        if !Self::is_lift(exercise) {
            return false;
        }
        let set_count = exercise.set_count();
        // coming back to a skipped exercise reopens it
        self.skipped.retain(|s| s.exercise_index != exercise_index);
        let set_index = (0..set_count)
            .find(|s| !self.completed.contains(&RoutineStep::new(exercise_index, *s)))
            .unwrap_or(0);
        self.current = RoutineStep::new(exercise_index, set_index);
        true
    }

    /// First open step in routine order.
    pub fn resume_point(&self) -> Option<RoutineStep> {
        self.routine
            .exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| Self::is_lift(e))
            .flat_map(|(i, e)| (0..e.set_count()).map(move |s| RoutineStep::new(i, s)))
            .find(|step| !self.is_done(*step))
    }

    /// Whether a partially completed routine can be continued.
    pub fn can_resume(&self) -> bool {
        !self.completed.is_empty() && self.resume_point().is_some()
    }

    /// Move to the resume point.
    pub fn resume(&mut self) -> bool {
        match self.resume_point() {
            Some(step) => {
                self.current = step;
                true
            }
            None => false,
        }
    }

    /// Whether every set was completed or skipped.
    pub fn is_finished(&self) -> bool {
        self.resume_point().is_none()
    }

    /// Weight for a step, including accumulated progression.
    pub fn weight_for(&self, step: RoutineStep) -> f32 {
        let Some(exercise) = self.routine.exercises.get(step.exercise_index) else {
            return 0.0;
        };
        let progression = self
            .progression
            .get(&step.exercise_index)
            .copied()
            .unwrap_or(0.0);
        (exercise.weight_for_set(step.set_index) + progression)
            .clamp(0.0, WorkoutParameters::MAX_WEIGHT_PER_CABLE_KG)
    }

    /// Workout parameters for a step, layered over `base`.
    pub fn parameters_for(&self, step: RoutineStep, base: &WorkoutParameters) -> WorkoutParameters {
        let Some(exercise) = self.routine.exercises.get(step.exercise_index) else {
            return base.clone();
        };
        let planned = exercise.sets.get(step.set_index);
        let is_amrap = planned.is_some_and(|s| s.is_amrap());

        WorkoutParameters {
            exercise_id: Some(exercise.exercise.id.clone()),
            exercise_name: Some(exercise.exercise.name.clone()),
            program_mode: exercise.program_mode,
            reps: exercise.reps_for_set(step.set_index).unwrap_or(base.reps),
            weight_per_cable_kg: self.weight_for(step),
            progression_regression_kg: exercise.progression_kg,
            is_just_lift: false,
            is_amrap,
            stop_at_top: exercise.stop_at_top,
            echo_level: exercise.echo_level,
            eccentric_load_percent: exercise.eccentric_load_percent,
            duration_seconds: exercise.duration_seconds,
            ..base.clone()
        }
    }

    /// Staging state for a step with the routine's defaults.
    pub fn set_ready(&self, step: RoutineStep) -> RoutineFlowState {
        let exercise = self.routine.exercises.get(step.exercise_index);
        RoutineFlowState::SetReady {
            exercise_index: step.exercise_index,
            set_index: step.set_index,
            adjusted_weight_kg: self.weight_for(step),
            adjusted_reps: exercise.and_then(|e| e.reps_for_set(step.set_index)),
            echo_level: exercise.map(|e| e.echo_level).unwrap_or_default(),
            eccentric_load_percent: exercise.map(|e| e.eccentric_load_percent).unwrap_or(100),
        }
    }

    /// Apply user adjustments to a staging state; other states pass through.
    pub fn adjust(flow: &RoutineFlowState, adjustment: SetReadyAdjustment) -> RoutineFlowState {
        match flow.clone() {
            RoutineFlowState::SetReady {
                exercise_index,
                set_index,
                adjusted_weight_kg,
                adjusted_reps,
                echo_level,
                eccentric_load_percent,
            } => RoutineFlowState::SetReady {
                exercise_index,
                set_index,
                adjusted_weight_kg: adjustment
                    .weight_per_cable_kg
                    .map(|w| w.clamp(0.0, WorkoutParameters::MAX_WEIGHT_PER_CABLE_KG))
                    .unwrap_or(adjusted_weight_kg),
                adjusted_reps: adjustment.reps.or(adjusted_reps),
                echo_level: adjustment.echo_level.unwrap_or(echo_level),
                eccentric_load_percent: adjustment
                    .eccentric_load_percent
                    .map(|p| p.min(WorkoutParameters::MAX_ECCENTRIC_LOAD_PERCENT))
                    .unwrap_or(eccentric_load_percent),
            },
            other => other,
        }
    }

    /// Parameters for a staged set: the routine's values with the user's adjustments.
    pub fn parameters_for_set_ready(
        &self,
        flow: &RoutineFlowState,
        base: &WorkoutParameters,
    ) -> Option<WorkoutParameters> {
        let RoutineFlowState::SetReady {
            exercise_index,
            set_index,
            adjusted_weight_kg,
            adjusted_reps,
            echo_level,
            eccentric_load_percent,
        } = flow
        else {
            return None;
        };
        let step = RoutineStep::new(*exercise_index, *set_index);
        if !self.is_playable(step) {
            return None;
        }
        let mut parameters = self.parameters_for(step, base);
        parameters.weight_per_cable_kg = *adjusted_weight_kg;
        if let Some(reps) = adjusted_reps {
            parameters.reps = *reps;
            parameters.is_amrap = false;
        }
        parameters.echo_level = *echo_level;
        parameters.eccentric_load_percent = *eccentric_load_percent;
        Some(parameters)
    }

    /// Whether the current exercise is driven by the cables.
    pub fn current_uses_cables(&self) -> bool {
        self.current_exercise()
            .is_some_and(|e| e.exercise.exercise_type.uses_cables())
    }

    /// Display name of the exercise at a step.
    pub fn exercise_name(&self, step: RoutineStep) -> Option<&str> {
        self.routine
            .exercises
            .get(step.exercise_index)
            .map(|e| e.exercise.name.as_str())
    }

    /// Move the position directly (used when starting a staged set).
    pub fn set_current(&mut self, step: RoutineStep) -> bool {
        if self.is_playable(step) {
            self.current = step;
            true
        } else {
            false
        }
    }
}
