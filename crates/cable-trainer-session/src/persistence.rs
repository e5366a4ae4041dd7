//! Session persistence pipeline and its collaborators.
//!
//! Storage, training-cycle bookkeeping, and gamification live outside this
//! crate. The pipeline saves the session record first; the follow-up calls
//! only run after a successful save and their failures are logged, never
//! returned.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use cable_trainer_core::{
    Error, ProgramMode, Result, SessionId, WorkoutCompletionLog, WorkoutSessionRecord,
};

use crate::events::{FeedbackEvent, FeedbackEvents};

/// Storage for finished sets and routines.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist one finished set.
    async fn save_session(&self, record: &WorkoutSessionRecord) -> Result<()>;

    /// Attach an RPE to an already persisted set.
    async fn update_rpe(&self, session_id: SessionId, rpe: u8) -> Result<()>;

    /// Persist the log of a finished routine.
    async fn save_completion_log(&self, log: &WorkoutCompletionLog) -> Result<()>;
}

/// Training-cycle bookkeeping.
#[async_trait]
pub trait CycleProgressService: Send + Sync {
    /// Record that a routine set was performed.
    async fn record_progress(&self, routine_id: &str, facts: &SessionFacts) -> Result<()>;
}

/// Badges and personal records.
#[async_trait]
pub trait GamificationService: Send + Sync {
    /// Score a saved set and return anything it earned.
    async fn process_session(&self, facts: &SessionFacts) -> Result<Vec<Award>>;
}

/// The facts about a saved set that follow-up collaborators need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionFacts {
    /// Saved session
    pub session_id: SessionId,
    /// Exercise performed ("just-lift" when none was selected)
    pub exercise_id: String,
    /// Working plus burnout reps
    pub reps: u32,
    /// Weight per cable actually lifted
    pub measured_weight_kg: f32,
    /// Program mode
    pub program_mode: ProgramMode,
    /// Just Lift set
    pub is_just_lift: bool,
    /// AMRAP set
    pub is_amrap: bool,
}

impl SessionFacts {
    /// Extract the facts from a record.
    pub fn from_record(record: &WorkoutSessionRecord) -> Self {
        let count = record.summary.rep_count;
        Self {
            session_id: record.id,
            exercise_id: record
                .parameters
                .exercise_id
                .clone()
                .unwrap_or_else(|| "just-lift".to_string()),
            reps: count.working_reps + count.burnout_reps,
            measured_weight_kg: record.measured_weight_kg(),
            program_mode: record.parameters.program_mode,
            is_just_lift: record.parameters.is_just_lift,
            is_amrap: record.parameters.is_amrap,
        }
    }
}

/// Something the gamification collaborator handed out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "award", rename_all = "snake_case")]
pub enum Award {
    /// A badge
    Badge {
        /// Badge name
        name: String,
    },
    /// A new best for an exercise
    PersonalRecord {
        /// Exercise the record is for
        exercise_id: String,
        /// Weight per cable
        weight_kg: f32,
    },
}

/// What a successful save produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOutcome {
    /// The set was a personal record
    pub is_personal_record: bool,
    /// Badges earned
    pub badges: Vec<String>,
}

/// Hands finished sets to storage and notifies the follow-up collaborators.
#[derive(Clone)]
pub struct SessionPersistencePipeline {
    repository: Arc<dyn SessionRepository>,
    cycle_progress: Option<Arc<dyn CycleProgressService>>,
    gamification: Option<Arc<dyn GamificationService>>,
    events: FeedbackEvents,
}

impl std::fmt::Debug for SessionPersistencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistencePipeline")
            .field("cycle_progress", &self.cycle_progress.is_some())
            .field("gamification", &self.gamification.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionPersistencePipeline {
    /// Create a pipeline that only stores sessions.
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            repository,
            cycle_progress: None,
            gamification: None,
            events: FeedbackEvents::new(),
        }
    }

    /// Notify a training-cycle collaborator after each save.
    pub fn with_cycle_progress(mut self, service: Arc<dyn CycleProgressService>) -> Self {
        self.cycle_progress = Some(service);
        self
    }

    /// Notify a gamification collaborator after each save.
    pub fn with_gamification(mut self, service: Arc<dyn GamificationService>) -> Self {
        self.gamification = Some(service);
        self
    }

    /// Publish awards on this event hub.
    pub fn with_events(mut self, events: FeedbackEvents) -> Self {
        self.events = events;
        self
    }

    /// Save one finished set.
    ///
    /// A storage failure is returned as a retryable `PersistenceFailed`.
    pub async fn persist(&self, record: &WorkoutSessionRecord) -> Result<SaveOutcome> {
        self.repository
            .save_session(record)
            .await
            .map_err(|e| Error::PersistenceFailed {
                session_id: record.id,
                reason: e.to_string(),
            })?;
        info!(
            "Session saved: id={}, reps={}",
            record.id,
            record.summary.rep_count.total()
        );

        let facts = SessionFacts::from_record(record);
        let mut outcome = SaveOutcome::default();

        if let (Some(service), Some(routine_id)) = (&self.cycle_progress, &record.routine_id) {
            if let Err(e) = service.record_progress(routine_id, &facts).await {
                warn!("Cycle progress update failed for {}: {}", record.id, e);
            }
        }

        if let Some(service) = &self.gamification {
            match service.process_session(&facts).await {
                Ok(awards) => {
                    for award in awards {
                        match award {
                            Award::Badge { name } => {
                                self.events
                                    .emit(FeedbackEvent::BadgeEarned { name: name.clone() });
                                outcome.badges.push(name);
                            }
                            Award::PersonalRecord {
                                exercise_id,
                                weight_kg,
                            } => {
                                outcome.is_personal_record = true;
                                self.events.emit(FeedbackEvent::PersonalRecord {
                                    exercise_id,
                                    weight_kg,
                                });
                            }
                        }
                    }
                }
                Err(e) => warn!("Gamification update failed for {}: {}", record.id, e),
            }
        }

        Ok(outcome)
    }

    /// Attach an RPE to a saved set.
    pub async fn update_rpe(&self, session_id: SessionId, rpe: u8) -> Result<()> {
        self.repository
            .update_rpe(session_id, rpe)
            .await
            .map_err(|e| Error::PersistenceFailed {
                session_id,
                reason: e.to_string(),
            })?;
        debug!("RPE {} stored for session {}", rpe, session_id);
        Ok(())
    }

    /// Save the log of a finished routine; failures are only logged.
    pub async fn persist_completion_log(&self, log: &WorkoutCompletionLog) {
        match self.repository.save_completion_log(log).await {
            Ok(()) => info!(
                "Workout log saved: {} sets, {} PRs",
                log.sets.len(),
                log.pr_count()
            ),
            Err(e) => warn!("Workout log save failed: {}", e),
        }
    }
}

/// In-memory repository, used by the MCP surface and by tests.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<Vec<WorkoutSessionRecord>>,
    logs: Mutex<Vec<WorkoutCompletionLog>>,
    save_attempts: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl InMemorySessionRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// Every stored session.
    pub fn sessions(&self) -> Vec<WorkoutSessionRecord> {
        self.sessions.lock().clone()
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Number of save calls, successful or not.
    pub fn save_attempts(&self) -> usize {
        *self.save_attempts.lock()
    }

    /// Every stored routine log.
    pub fn completion_logs(&self) -> Vec<WorkoutCompletionLog> {
        self.logs.lock().clone()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save_session(&self, record: &WorkoutSessionRecord) -> Result<()> {
        *self.save_attempts.lock() += 1;
        if *self.fail_saves.lock() {
            return Err(Error::Other("storage unavailable".to_string()));
        }
        self.sessions.lock().push(record.clone());
        Ok(())
    }

    async fn update_rpe(&self, session_id: SessionId, rpe: u8) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let record = sessions
            .iter_mut()
            .find(|r| r.id == session_id)
            .ok_or_else(|| Error::Other(format!("session {} not stored", session_id)))?;
        record.summary.rpe = Some(rpe);
        Ok(())
    }

    async fn save_completion_log(&self, log: &WorkoutCompletionLog) -> Result<()> {
        self.logs.lock().push(log.clone());
        Ok(())
    }
}
