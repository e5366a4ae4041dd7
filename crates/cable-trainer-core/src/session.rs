//! Session identifiers and the records handed to persistence.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{SetSummary, WorkoutMetric, WorkoutParameters};

/// Unique identifier for a workout session (one set, from start to stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable record of one completed set, assembled at stop time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutSessionRecord {
    /// Session identifier
    pub id: SessionId,
    /// Routine this set belonged to, if any
    pub routine_id: Option<String>,
    /// When the set went active
    #[schemars(with = "String")]
    pub started_at: DateTime<Utc>,
    /// When the set was stopped
    #[schemars(with = "String")]
    pub completed_at: DateTime<Utc>,
    /// Parameters in effect for the set
    pub parameters: WorkoutParameters,
    /// Computed set summary, including the logged RPE
    pub summary: SetSummary,
    /// Raw metric samples collected during the set
    pub metrics: Vec<WorkoutMetric>,
}

impl WorkoutSessionRecord {
    /// Wall-clock duration of the set in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Weight actually lifted per cable.
    pub fn measured_weight_kg(&self) -> f32 {
        self.parameters.weight_per_cable_kg
    }

    /// Condensed log line for this set.
    pub fn to_set_log(&self, set_number: u32, is_pr: bool) -> CompletedSetRecord {
        CompletedSetRecord {
            exercise_id: self
                .parameters
                .exercise_id
                .clone()
                .unwrap_or_else(|| "just-lift".to_string()),
            set_number,
            actual_reps: self.summary.rep_count.working_reps,
            actual_weight_kg: self.measured_weight_kg(),
            logged_rpe: self.summary.rpe,
            is_pr,
        }
    }
}

/// One logged set inside a workout completion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompletedSetRecord {
    /// Exercise identifier
    pub exercise_id: String,
    /// 1-based set number within the exercise
    pub set_number: u32,
    /// Working reps performed
    pub actual_reps: u32,
    /// Weight per cable in kilograms
    pub actual_weight_kg: f32,
    /// RPE logged by the user
    pub logged_rpe: Option<u8>,
    /// Whether this set was a personal record
    pub is_pr: bool,
}

/// Summary of a whole workout (all sets of a routine or a run of Just Lift sets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutCompletionLog {
    /// Routine that was followed (None = free workout)
    pub routine_id: Option<String>,
    /// First set start
    #[schemars(with = "String")]
    pub started_at: DateTime<Utc>,
    /// Last set stop
    #[schemars(with = "String")]
    pub completed_at: DateTime<Utc>,
    /// Every completed set, in order
    pub sets: Vec<CompletedSetRecord>,
    /// Free-form notes
    pub notes: Option<String>,
}

impl WorkoutCompletionLog {
    /// Duration in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.completed_at - self.started_at).num_minutes()
    }

    /// Number of sets flagged as personal records.
    pub fn pr_count(&self) -> usize {
        self.sets.iter().filter(|s| s.is_pr).count()
    }
}
