//! # cable-trainer-detector
//!
//! Detection engine for the cable trainer controller.
//!
//! This crate provides:
//! - Auto-stop detection (stall and handles-at-rest signal detectors)
//! - A phase-driven rep counter behind the `RepCounter` trait
//! - Set summary computation from collected metric samples
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on cable-trainer-core
//! and is purely synchronous: every call takes a sample and returns a
//! decision, with time taken from sample timestamps.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auto_stop;
pub mod detection;
pub mod detectors;
pub mod rep_counter;
pub mod summary;

// Re-export commonly used types
pub use auto_stop::AutoStopDetector;
pub use detection::{
    AutoStopDecision, AutoStopReason, AutoStopUiState, DetectionContext, SignalDetector,
    AMRAP_STARTUP_GRACE_MS, AUTO_STOP_DURATION_MS, HANDLE_REST_THRESHOLD, MIN_RANGE_THRESHOLD,
    STALL_DURATION_MS, STALL_MIN_POSITION, STALL_VELOCITY_HIGH, STALL_VELOCITY_LOW,
};
pub use detectors::{HandleRestDetector, StallDetector};
pub use rep_counter::{PhaseRepCounter, RepCounter, RepKind, RepTarget, RepUpdate};
pub use summary::SummaryCalculator;
