//! # cable-trainer-session
//!
//! Workout session control for the cable trainer controller.
//!
//! This crate provides:
//! - The workout lifecycle state machine (`SessionCoordinator`)
//! - Shared session state with watch streams (`SessionState`)
//! - Rep counting and auto-stop routing (`RepStreamProcessor`)
//! - Routine navigation including supersets and resume (`RoutineNavigator`)
//! - Cancellable session timers (`TimerBank`)
//! - Session saving with follow-up collaborators (`SessionPersistencePipeline`)
//! - The exercise and routine library (`ExerciseRepository`, `RoutineRepository`)
//! - Feedback events for the presentation layer
//!
//! ## Architecture
//!
//! This is Layer 3 in the architecture - it depends on cable-trainer-core,
//! cable-trainer-device, and cable-trainer-detector to run workout sessions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod events;
pub mod library;
pub mod metrics;
pub mod navigator;
pub mod persistence;
pub mod rep_stream;
pub mod snapshot;
pub mod state;
pub mod timers;
pub mod wait;

// Re-export commonly used types
pub use coordinator::SessionCoordinator;
pub use events::{FeedbackEvent, FeedbackEvents};
pub use library::{ExerciseRepository, InMemoryLibrary, RoutineRepository};
pub use metrics::MetricsBuffer;
pub use navigator::{RoutineNavigator, RoutineStep, SetReadyAdjustment, StepTransition};
pub use persistence::{
    Award, CycleProgressService, GamificationService, InMemorySessionRepository, SaveOutcome,
    SessionFacts, SessionPersistencePipeline, SessionRepository,
};
pub use rep_stream::{RepOutcome, RepStreamProcessor};
pub use snapshot::{RoutineSnapshot, SessionSnapshot};
pub use state::{Guards, PendingRecord, SessionInner, SessionState};
pub use timers::{TimerBank, TimerKind};
pub use wait::{wait_for_state, WaitCondition, WaitResult};
