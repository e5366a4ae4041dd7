//! Routine types: exercises, planned sets, supersets, and routine flow state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{EchoLevel, ProgramMode};

/// Kind of equipment an exercise uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseType {
    /// Cable machine exercise
    #[default]
    Vitruvian,
    /// Dumbbell
    Dumbbell,
    /// Barbell
    Barbell,
    /// Bodyweight
    Bodyweight,
    /// Suspension trainer
    Trx,
    /// Other gym machine
    Machine,
    /// Rest placeholder inside a routine
    RestTimer,
}

impl ExerciseType {
    /// Whether the exercise runs on the cable machine.
    pub fn uses_cables(&self) -> bool {
        matches!(self, ExerciseType::Vitruvian)
    }
}

/// Kind of planned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetType {
    /// Regular working set
    #[default]
    Standard,
    /// Lighter preparation set
    Warmup,
    /// Reduced-weight continuation
    Dropset,
    /// As many reps as possible
    Amrap,
}

/// Exercise definition from the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Exercise {
    /// Library identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Equipment kind
    #[serde(default)]
    pub exercise_type: ExerciseType,
    /// Primary muscle group
    pub muscle_group: String,
    /// Equipment needed ("DUMBBELL", "TRX", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    /// Form cue
    #[serde(default)]
    pub coaching_note: Option<String>,
}

impl Exercise {
    /// Create an exercise definition.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        exercise_type: ExerciseType,
        muscle_group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            exercise_type,
            muscle_group: muscle_group.into(),
            equipment: None,
            coaching_note: None,
        }
    }

    /// Set the equipment label.
    pub fn with_equipment(mut self, equipment: impl Into<String>) -> Self {
        self.equipment = Some(equipment.into());
        self
    }

    /// Set the form cue.
    pub fn with_coaching_note(mut self, note: impl Into<String>) -> Self {
        self.coaching_note = Some(note.into());
        self
    }
}

/// One planned set of a routine exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedSet {
    /// Kind of set
    #[serde(default)]
    pub set_type: SetType,
    /// Target reps (None = AMRAP)
    pub target_reps: Option<u32>,
    /// Target weight per cable; falls back to the exercise weight
    #[serde(default)]
    pub target_weight_kg: Option<f32>,
    /// Target RPE
    #[serde(default)]
    pub target_rpe: Option<u8>,
    /// Rest after this set; falls back to the exercise rest
    #[serde(default)]
    pub rest_seconds: Option<u32>,
}

impl PlannedSet {
    /// A standard set with a rep target.
    pub fn reps(target_reps: u32) -> Self {
        Self {
            set_type: SetType::Standard,
            target_reps: Some(target_reps),
            target_weight_kg: None,
            target_rpe: None,
            rest_seconds: None,
        }
    }

    /// An AMRAP set.
    pub fn amrap() -> Self {
        Self {
            set_type: SetType::Amrap,
            target_reps: None,
            ..Self::reps(0)
        }
    }

    /// Override the set weight.
    pub fn with_weight(mut self, weight_kg: f32) -> Self {
        self.target_weight_kg = Some(weight_kg);
        self
    }

    /// Override the set type.
    pub fn with_type(mut self, set_type: SetType) -> Self {
        self.set_type = set_type;
        self
    }

    /// Whether the set runs until auto-stop.
    pub fn is_amrap(&self) -> bool {
        self.set_type == SetType::Amrap || self.target_reps.is_none()
    }
}

/// An exercise placed in a routine, with its sets and load settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutineExercise {
    /// Exercise definition
    pub exercise: Exercise,
    /// Planned sets, in order
    pub sets: Vec<PlannedSet>,
    /// Default weight per cable
    #[serde(default)]
    pub weight_per_cable_kg: f32,
    /// Program mode
    #[serde(default)]
    pub program_mode: ProgramMode,
    /// Echo difficulty
    #[serde(default)]
    pub echo_level: EchoLevel,
    /// Eccentric load percentage
    #[serde(default = "default_eccentric_load")]
    pub eccentric_load_percent: u8,
    /// Weight change applied after each completed set
    #[serde(default)]
    pub progression_kg: f32,
    /// Rest after each set unless the set overrides it
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
    /// Superset this exercise belongs to
    #[serde(default)]
    pub superset_id: Option<String>,
    /// Duration for timed exercises
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    /// End each set at the top of the last rep
    #[serde(default)]
    pub stop_at_top: bool,
}

fn default_eccentric_load() -> u8 {
    100
}

fn default_rest_seconds() -> u32 {
    60
}

impl RoutineExercise {
    /// Create a cable exercise with the given sets and weight.
    pub fn new(exercise: Exercise, sets: Vec<PlannedSet>, weight_per_cable_kg: f32) -> Self {
        Self {
            exercise,
            sets,
            weight_per_cable_kg,
            program_mode: ProgramMode::OldSchool,
            echo_level: EchoLevel::Hard,
            eccentric_load_percent: default_eccentric_load(),
            progression_kg: 0.0,
            rest_seconds: default_rest_seconds(),
            superset_id: None,
            duration_seconds: None,
            stop_at_top: false,
        }
    }

    /// Set the per-exercise rest.
    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = rest_seconds;
        self
    }

    /// Place the exercise in a superset.
    pub fn in_superset(mut self, superset_id: impl Into<String>) -> Self {
        self.superset_id = Some(superset_id.into());
        self
    }

    /// Number of planned sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Weight for a set, falling back to the exercise weight.
    pub fn weight_for_set(&self, set_index: usize) -> f32 {
        self.sets
            .get(set_index)
            .and_then(|s| s.target_weight_kg)
            .unwrap_or(self.weight_per_cable_kg)
    }

    /// Rep target for a set (None = AMRAP or out of range).
    pub fn reps_for_set(&self, set_index: usize) -> Option<u32> {
        self.sets.get(set_index).and_then(|s| s.target_reps)
    }

    /// Rest after a set, falling back to the exercise rest.
    pub fn rest_after_set(&self, set_index: usize) -> u32 {
        self.sets
            .get(set_index)
            .and_then(|s| s.rest_seconds)
            .unwrap_or(self.rest_seconds)
    }

    /// Whether this entry is a rest placeholder rather than a lift.
    pub fn is_rest_entry(&self) -> bool {
        self.exercise.exercise_type == ExerciseType::RestTimer
    }
}

/// A group of exercises performed back to back before a shared rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Superset {
    /// Identifier referenced by member exercises
    pub id: String,
    /// Display name
    pub name: String,
    /// Rest after a full cycle through the members
    pub rest_between_seconds: u32,
}

/// A loaded routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Routine {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Exercises in performance order
    pub exercises: Vec<RoutineExercise>,
    /// Supersets referenced by exercises
    #[serde(default)]
    pub supersets: Vec<Superset>,
    /// Coach notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Routine {
    /// Look up a superset by id.
    pub fn superset(&self, superset_id: &str) -> Option<&Superset> {
        self.supersets.iter().find(|s| s.id == superset_id)
    }

    /// Indices of the exercises in a superset, in routine order.
    pub fn superset_members(&self, superset_id: &str) -> Vec<usize> {
        self.exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| e.superset_id.as_deref() == Some(superset_id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Superset containing the exercise at `exercise_index`, if it is a member.
    pub fn superset_of(&self, exercise_index: usize) -> Option<&Superset> {
        self.exercises
            .get(exercise_index)
            .and_then(|e| e.superset_id.as_deref())
            .and_then(|id| self.superset(id))
    }

    /// Total planned sets, excluding rest placeholders.
    pub fn total_sets(&self) -> usize {
        self.exercises
            .iter()
            .filter(|e| !e.is_rest_entry())
            .map(|e| e.set_count())
            .sum()
    }

    /// Validate structural consistency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.exercises.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "routine '{}' has no exercises",
                self.id
            )));
        }
        for exercise in &self.exercises {
            if exercise.sets.is_empty() && !exercise.is_rest_entry() {
                return Err(crate::Error::InvalidInput(format!(
                    "exercise '{}' has no sets",
                    exercise.exercise.id
                )));
            }
            if let Some(id) = &exercise.superset_id {
                if self.superset(id).is_none() {
                    return Err(crate::Error::InvalidInput(format!(
                        "exercise '{}' references unknown superset '{}'",
                        exercise.exercise.id, id
                    )));
                }
            }
        }
        for superset in &self.supersets {
            let members = self.superset_members(&superset.id);
            if members.windows(2).any(|pair| pair[1] != pair[0] + 1) {
                return Err(crate::Error::InvalidInput(format!(
                    "superset '{}' members must be consecutive, found at {:?}",
                    superset.id, members
                )));
            }
        }
        Ok(())
    }

    /// Template upper push day: cable presses with a warm-up set, a rest
    /// placeholder, and a push-up AMRAP finisher.
    pub fn sample_upper_push() -> Self {
        let chest_press = RoutineExercise::new(
            Exercise::new(
                "cable-chest-press",
                "Cable Chest Press",
                ExerciseType::Vitruvian,
                "CHEST",
            ),
            vec![
                PlannedSet::reps(15)
                    .with_type(SetType::Warmup)
                    .with_weight(10.0),
                PlannedSet::reps(10),
                PlannedSet::reps(10),
                PlannedSet::reps(8).with_weight(22.5),
            ],
            20.0,
        );
        let mut rest = RoutineExercise::new(
            Exercise::new("rest-90", "Rest", ExerciseType::RestTimer, "RECOVERY"),
            vec![],
            0.0,
        )
        .with_rest(90);
        rest.duration_seconds = Some(90);
        let shoulder_press = RoutineExercise::new(
            Exercise::new(
                "cable-shoulder-press",
                "Cable Shoulder Press",
                ExerciseType::Vitruvian,
                "SHOULDERS",
            ),
            vec![
                PlannedSet::reps(10),
                PlannedSet::reps(10),
                PlannedSet::reps(8).with_weight(17.5),
            ],
            15.0,
        );
        let mut push_up = RoutineExercise::new(
            Exercise::new("bw-pushup", "Push-Up", ExerciseType::Bodyweight, "CHEST"),
            vec![PlannedSet::amrap(), PlannedSet::amrap()],
            0.0,
        );
        push_up.duration_seconds = Some(45);

        Self {
            id: "upper-push-day-1".to_string(),
            name: "Upper Push - Day 1".to_string(),
            exercises: vec![chest_press, rest, shoulder_press, push_up],
            supersets: vec![],
            notes: Some(
                "Progressive overload target: +2.5kg on Cable Chest Press if all sets completed at RPE <8."
                    .to_string(),
            ),
        }
    }

    /// Two cable exercises cycled as a superset, followed by a straight exercise.
    pub fn sample_superset() -> Self {
        let row = RoutineExercise::new(
            Exercise::new("cable-row", "Cable Row", ExerciseType::Vitruvian, "BACK"),
            vec![PlannedSet::reps(10), PlannedSet::reps(10), PlannedSet::reps(10)],
            18.0,
        )
        .in_superset("ss-pull-push");
        let press = RoutineExercise::new(
            Exercise::new(
                "cable-chest-press",
                "Cable Chest Press",
                ExerciseType::Vitruvian,
                "CHEST",
            ),
            vec![PlannedSet::reps(10), PlannedSet::reps(10)],
            20.0,
        )
        .in_superset("ss-pull-push");
        let curl = RoutineExercise::new(
            Exercise::new("cable-curl", "Cable Curl", ExerciseType::Vitruvian, "BICEPS"),
            vec![PlannedSet::reps(12), PlannedSet::reps(12)],
            8.0,
        )
        .with_rest(45);

        Self {
            id: "pull-push-superset".to_string(),
            name: "Pull/Push Superset".to_string(),
            exercises: vec![row, press, curl],
            supersets: vec![Superset {
                id: "ss-pull-push".to_string(),
                name: "Row + Press".to_string(),
                rest_between_seconds: 90,
            }],
            notes: None,
        }
    }
}

/// Where the user is within a loaded routine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum RoutineFlowState {
    /// No routine loaded
    #[default]
    NotInRoutine,
    /// Routine loaded, exercise list shown
    Overview,
    /// Staged to start a specific set, with user adjustments
    SetReady {
        /// Exercise position in the routine
        exercise_index: usize,
        /// Set position within the exercise
        set_index: usize,
        /// Weight per cable after adjustment
        adjusted_weight_kg: f32,
        /// Rep target after adjustment (None = AMRAP)
        adjusted_reps: Option<u32>,
        /// Echo level after adjustment
        echo_level: EchoLevel,
        /// Eccentric load after adjustment
        eccentric_load_percent: u8,
    },
    /// A routine set is running
    InProgress,
}

impl RoutineFlowState {
    /// Whether a routine is loaded.
    pub fn in_routine(&self) -> bool {
        !matches!(self, RoutineFlowState::NotInRoutine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_routine_is_valid() {
        let routine = Routine::sample_upper_push();
        assert!(routine.validate().is_ok());
        assert_eq!(routine.exercises.len(), 4);
        assert_eq!(routine.total_sets(), 9);
    }

    #[test]
    fn test_weight_and_rest_fallbacks() {
        let routine = Routine::sample_upper_push();
        let chest = &routine.exercises[0];
        assert_eq!(chest.weight_for_set(0), 10.0);
        assert_eq!(chest.weight_for_set(1), 20.0);
        assert_eq!(chest.weight_for_set(3), 22.5);
        assert_eq!(chest.rest_after_set(0), 60);
        assert_eq!(chest.reps_for_set(0), Some(15));
        assert_eq!(chest.reps_for_set(9), None);
    }

    #[test]
    fn test_superset_members() {
        let routine = Routine::sample_superset();
        assert!(routine.validate().is_ok());
        assert_eq!(routine.superset_members("ss-pull-push"), vec![0, 1]);
        assert_eq!(routine.superset_of(1).map(|s| s.rest_between_seconds), Some(90));
        assert!(routine.superset_of(2).is_none());
    }

    #[test]
    fn test_unknown_superset_rejected() {
        let mut routine = Routine::sample_superset();
        routine.supersets.clear();
        assert!(routine.validate().is_err());
    }

    #[test]
    fn test_split_superset_rejected() {
        let mut routine = Routine::sample_superset();
        // curl between row and press
        routine.exercises.swap(1, 2);
        let err = routine.validate().unwrap_err();
        assert!(err.to_string().contains("must be consecutive"));
    }

    #[test]
    fn test_amrap_set() {
        let set = PlannedSet::amrap();
        assert!(set.is_amrap());
        assert!(!PlannedSet::reps(8).is_amrap());
    }

    #[test]
    fn test_routine_flow_state_serialization() {
        let flow = RoutineFlowState::SetReady {
            exercise_index: 1,
            set_index: 0,
            adjusted_weight_kg: 20.0,
            adjusted_reps: Some(10),
            echo_level: EchoLevel::Harder,
            eccentric_load_percent: 120,
        };
        let json = serde_json::to_string(&flow).unwrap();
        assert!(json.contains("\"flow\":\"set_ready\""));
        let back: RoutineFlowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flow);
    }

    #[test]
    fn test_exercise_type_serialization() {
        let json = serde_json::to_string(&ExerciseType::RestTimer).unwrap();
        assert_eq!(json, "\"REST_TIMER\"");
    }
}
