//! Exercise and routine library.
//!
//! Storage of exercise definitions and routine templates lives outside this
//! crate behind [`ExerciseRepository`] and [`RoutineRepository`]. The seeded
//! [`InMemoryLibrary`] carries the cable exercises of the sample routines and
//! the dumbbell, bodyweight, suspension, and rest entries used when training
//! away from the machine.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use cable_trainer_core::{Error, Exercise, ExerciseType, Result, Routine};

/// Exercise definitions.
#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Every known exercise, cable and hybrid alike.
    async fn list_exercises(&self) -> Result<Vec<Exercise>>;

    /// Look one exercise up by id.
    async fn find_exercise(&self, id: &str) -> Result<Option<Exercise>>;

    /// Exercises that run off the cable machine, optionally of one kind.
    async fn hybrid_exercises(
        &self,
        exercise_type: Option<ExerciseType>,
    ) -> Result<Vec<Exercise>> {
        let exercises = self.list_exercises().await?;
        Ok(exercises
            .into_iter()
            .filter(|e| !e.exercise_type.uses_cables())
            .filter(|e| exercise_type.map_or(true, |kind| e.exercise_type == kind))
            .collect())
    }
}

/// Routine templates.
#[async_trait]
pub trait RoutineRepository: Send + Sync {
    /// Every stored routine.
    async fn list_routines(&self) -> Result<Vec<Routine>>;

    /// Look one routine up by id.
    async fn find_routine(&self, id: &str) -> Result<Option<Routine>>;

    /// Store a routine, replacing one with the same id.
    async fn save_routine(&self, routine: &Routine) -> Result<()>;
}

/// In-memory library, used by the MCP surface and by tests.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    exercises: Mutex<Vec<Exercise>>,
    routines: Mutex<Vec<Routine>>,
}

impl InMemoryLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding the built-in exercises and sample routines.
    pub fn seeded() -> Self {
        Self {
            exercises: Mutex::new(seed_exercises()),
            routines: Mutex::new(vec![Routine::sample_upper_push(), Routine::sample_superset()]),
        }
    }

    /// Add or replace an exercise definition.
    pub fn insert_exercise(&self, exercise: Exercise) {
        let mut exercises = self.exercises.lock();
        match exercises.iter_mut().find(|e| e.id == exercise.id) {
            Some(existing) => *existing = exercise,
            None => exercises.push(exercise),
        }
    }
}

#[async_trait]
impl ExerciseRepository for InMemoryLibrary {
    async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        Ok(self.exercises.lock().clone())
    }

    async fn find_exercise(&self, id: &str) -> Result<Option<Exercise>> {
        Ok(self.exercises.lock().iter().find(|e| e.id == id).cloned())
    }
}

#[async_trait]
impl RoutineRepository for InMemoryLibrary {
    async fn list_routines(&self) -> Result<Vec<Routine>> {
        Ok(self.routines.lock().clone())
    }

    async fn find_routine(&self, id: &str) -> Result<Option<Routine>> {
        Ok(self.routines.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn save_routine(&self, routine: &Routine) -> Result<()> {
        routine.validate()?;
        if routine.id.trim().is_empty() {
            return Err(Error::InvalidInput("routine id must not be empty".to_string()));
        }
        let mut routines = self.routines.lock();
        match routines.iter_mut().find(|r| r.id == routine.id) {
            Some(existing) => *existing = routine.clone(),
            None => routines.push(routine.clone()),
        }
        debug!("Routine stored: {}", routine.id);
        Ok(())
    }
}

fn entry(
    id: &str,
    name: &str,
    exercise_type: ExerciseType,
    muscle_group: &str,
    equipment: &str,
    note: &str,
) -> Exercise {
    Exercise::new(id, name, exercise_type, muscle_group)
        .with_equipment(equipment)
        .with_coaching_note(note)
}

#[rustfmt::skip]
fn seed_exercises() -> Vec<Exercise> {
    use ExerciseType::*;

    vec![
        // cable
        entry("cable-chest-press", "Cable Chest Press", Vitruvian, "CHEST", "CABLE",
            "Handles at chest height. Press forward and slightly together."),
        entry("cable-shoulder-press", "Cable Shoulder Press", Vitruvian, "SHOULDERS", "CABLE",
            "Ribs down. Press straight overhead without arching."),
        entry("cable-row", "Cable Row", Vitruvian, "BACK", "CABLE",
            "Tall chest. Pull elbows back past the torso."),
        entry("cable-curl", "Cable Curl", Vitruvian, "BICEPS", "CABLE",
            "Elbows pinned at the sides. Slow on the way down."),
        // dumbbell
        entry("db-chest-press", "Dumbbell Chest Press", Dumbbell, "CHEST", "DUMBBELL",
            "Neutral spine, scapulae retracted. Lower until elbows at 90°."),
        entry("db-row", "Dumbbell Row", Dumbbell, "BACK", "DUMBBELL",
            "Brace core. Drive elbow to hip, not shoulder."),
        entry("db-shoulder-press", "Dumbbell Shoulder Press", Dumbbell, "SHOULDERS", "DUMBBELL",
            "Do not hyperextend lumbar. Press vertical, not forward."),
        entry("db-rdl", "Romanian Deadlift (DB)", Dumbbell, "HAMSTRINGS", "DUMBBELL",
            "Hip hinge, not squat. Maintain neutral spine throughout."),
        entry("db-lateral-raise", "Lateral Raise", Dumbbell, "SHOULDERS", "DUMBBELL",
            "Lead with elbows, not wrists. Stop at shoulder height."),
        entry("db-bicep-curl", "Dumbbell Bicep Curl", Dumbbell, "BICEPS", "DUMBBELL",
            "Supinate at the top. Control the eccentric."),
        entry("db-tricep-kickback", "Tricep Kickback", Dumbbell, "TRICEPS", "DUMBBELL",
            "Upper arm parallel to floor. Full extension at top."),
        entry("db-goblet-squat", "Goblet Squat", Dumbbell, "QUADS", "DUMBBELL",
            "Elbows inside knees at bottom. Drive through heels."),
        // bodyweight
        entry("bw-pushup", "Push-Up", Bodyweight, "CHEST", "BODYWEIGHT",
            "Rigid plank from head to heel. Elbows 45° from torso."),
        entry("bw-pullup", "Pull-Up", Bodyweight, "BACK", "BODYWEIGHT",
            "Dead hang start. Drive elbows down to lats, not shoulders."),
        entry("bw-dip", "Dip", Bodyweight, "TRICEPS", "BODYWEIGHT",
            "Slight forward lean for chest emphasis. Don't flare elbows."),
        entry("bw-plank", "Plank", Bodyweight, "CORE", "BODYWEIGHT",
            "Neutral spine. Squeeze glutes and abs. Don't hold breath."),
        entry("bw-squat", "Bodyweight Squat", Bodyweight, "QUADS", "BODYWEIGHT",
            "Feet shoulder-width. Knees track toes. Full depth if mobility allows."),
        entry("bw-lunge", "Reverse Lunge", Bodyweight, "QUADS", "BODYWEIGHT",
            "Step back, not forward. Rear knee hovers 1\" above floor."),
        entry("bw-glute-bridge", "Glute Bridge", Bodyweight, "GLUTES", "BODYWEIGHT",
            "Drive through heels. Full hip extension at top. Pause 1 second."),
        // suspension
        entry("trx-row", "TRX Row", Trx, "BACK", "TRX",
            "Body angle controls difficulty. Retract scapulae before pulling."),
        entry("trx-chest-press", "TRX Chest Press", Trx, "CHEST", "TRX",
            "Lean forward for more load. Keep rigid plank throughout."),
        entry("trx-bicep-curl", "TRX Bicep Curl", Trx, "BICEPS", "TRX",
            "Elbows fixed, walk feet forward for more load."),
        entry("trx-squat", "TRX Squat", Trx, "QUADS", "TRX",
            "Hold handles for counterbalance. Allows deeper squat."),
        entry("trx-plank", "TRX Plank", Trx, "CORE", "TRX",
            "Feet in straps. Harder than a floor plank."),
        // rest templates
        entry("rest-60", "Rest (60 sec)", RestTimer, "RECOVERY", "NONE",
            "Active recovery. Breathe. Shake out the pump."),
        entry("rest-90", "Rest (90 sec)", RestTimer, "RECOVERY", "NONE",
            "Longer recovery for heavy compound sets."),
        entry("rest-120", "Rest (2 min)", RestTimer, "RECOVERY", "NONE",
            "Full recovery. Used after max-effort sets."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_library_lists_every_kind() {
        let library = InMemoryLibrary::seeded();
        let exercises = library.list_exercises().await.unwrap();
        assert_eq!(exercises.len(), 27);
        for kind in [
            ExerciseType::Vitruvian,
            ExerciseType::Dumbbell,
            ExerciseType::Bodyweight,
            ExerciseType::Trx,
            ExerciseType::RestTimer,
        ] {
            assert!(exercises.iter().any(|e| e.exercise_type == kind), "{kind:?}");
        }
        assert!(exercises.iter().all(|e| e.coaching_note.is_some()));
    }

    #[tokio::test]
    async fn test_hybrid_excludes_cable_exercises() {
        let library = InMemoryLibrary::seeded();
        let hybrid = library.hybrid_exercises(None).await.unwrap();
        assert_eq!(hybrid.len(), 23);
        assert!(hybrid.iter().all(|e| !e.exercise_type.uses_cables()));

        let trx = library.hybrid_exercises(Some(ExerciseType::Trx)).await.unwrap();
        assert_eq!(trx.len(), 5);
        assert!(trx.iter().all(|e| e.equipment.as_deref() == Some("TRX")));

        let cable = library
            .hybrid_exercises(Some(ExerciseType::Vitruvian))
            .await
            .unwrap();
        assert!(cable.is_empty());
        assert!(library
            .hybrid_exercises(Some(ExerciseType::Barbell))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_exercise_by_id() {
        let library = InMemoryLibrary::seeded();
        let pushup = library.find_exercise("bw-pushup").await.unwrap().unwrap();
        assert_eq!(pushup.name, "Push-Up");
        assert_eq!(pushup.muscle_group, "CHEST");
        assert!(library.find_exercise("nope").await.unwrap().is_none());

        library.insert_exercise(Exercise::new(
            "bw-pushup",
            "Wide Push-Up",
            ExerciseType::Bodyweight,
            "CHEST",
        ));
        let replaced = library.find_exercise("bw-pushup").await.unwrap().unwrap();
        assert_eq!(replaced.name, "Wide Push-Up");
        assert_eq!(library.list_exercises().await.unwrap().len(), 27);
    }

    #[tokio::test]
    async fn test_sample_routines_are_seeded() {
        let library = InMemoryLibrary::seeded();
        let ids: Vec<String> = library
            .list_routines()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["upper-push-day-1", "pull-push-superset"]);

        let routine = library.find_routine("pull-push-superset").await.unwrap().unwrap();
        assert_eq!(routine.supersets.len(), 1);
    }

    #[tokio::test]
    async fn test_save_routine_validates_and_replaces() {
        let library = InMemoryLibrary::new();
        let mut routine = Routine::sample_upper_push();
        library.save_routine(&routine).await.unwrap();

        routine.name = "Upper Push - Deload".to_string();
        library.save_routine(&routine).await.unwrap();
        let routines = library.list_routines().await.unwrap();
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].name, "Upper Push - Deload");

        let mut split = Routine::sample_superset();
        split.exercises.swap(1, 2);
        assert!(library.save_routine(&split).await.is_err());
        assert_eq!(library.list_routines().await.unwrap().len(), 1);
    }
}
