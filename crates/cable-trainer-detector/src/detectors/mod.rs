//! Stop signal detectors.

pub mod handle_rest;
pub mod stall;

pub use handle_rest::HandleRestDetector;
pub use stall::StallDetector;
