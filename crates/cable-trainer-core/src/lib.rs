//! # cable-trainer-core
//!
//! Core types for the cable trainer controller.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other cable-trainer crates. It provides:
//!
//! - Workout state types (WorkoutState, WorkoutParameters, RepCount, SetSummary)
//! - Sensor and rep event types delivered by the device link
//! - Routine types (Routine, RoutineExercise, Superset, RoutineFlowState)
//! - Session record types handed to persistence
//! - Configuration and user settings
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other cable-trainer crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metric;
pub mod routine;
pub mod session;
pub mod settings;
pub mod workout;

// Re-export commonly used types
pub use config::{
    DetectionSettings, DeviceSettings, LoggingSettings, SessionSettings, TrainerConfig,
};
pub use error::{Error, Result};
pub use metric::{ConnectionState, HandleState, RepEvent, RepPhase, WorkoutMetric, GRAVITY};
pub use routine::{
    Exercise, ExerciseType, PlannedSet, Routine, RoutineExercise, RoutineFlowState, SetType,
    Superset,
};
pub use session::{CompletedSetRecord, SessionId, WorkoutCompletionLog, WorkoutSessionRecord};
pub use settings::{UserSettings, WeightUnit};
pub use workout::{
    CableForces, EchoLevel, ProgramMode, RepCount, RepRanges, RestInfo, SetSummary,
    WorkoutParameters, WorkoutState,
};
