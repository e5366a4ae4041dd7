//! # cable-trainer-device
//!
//! Device link layer for the cable trainer controller.
//!
//! This crate provides:
//! - The `DeviceLink` trait consumed by the session layer (streams + commands)
//! - Outbound `DeviceCommand` values
//! - A `SimulatedDevice` that streams synthetic metrics and rep events
//! - A `ConnectionMonitor` that reports link loss without touching workout state
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on cable-trainer-core
//! only. Packet encoding for real hardware lives behind `DeviceLink`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod link;
pub mod monitor;
pub mod simulated;

// Re-export commonly used types
pub use link::{DeviceCommand, DeviceLink};
pub use monitor::{ConnectionAlert, ConnectionMonitor, WorkoutActivityProbe};
pub use simulated::SimulatedDevice;
