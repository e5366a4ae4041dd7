//! Handles-at-rest detector: the user has returned to the start position and let go or stopped.

use cable_trainer_core::{DetectionSettings, WorkoutMetric};

use crate::detection::{AutoStopReason, DetectionContext, SignalDetector};

/// Fraction of the calibrated range counted as "near the start position".
const START_POSITION_FRACTION: f32 = 0.05;

/// Detects handles resting at the start position.
#[derive(Debug, Default)]
pub struct HandleRestDetector;

impl HandleRestDetector {
    /// Create a new handle rest detector.
    pub fn new() -> Self {
        Self
    }
}

impl SignalDetector for HandleRestDetector {
    fn name(&self) -> &'static str {
        "handle_rest"
    }

    fn reason(&self) -> AutoStopReason {
        AutoStopReason::HandlesAtRest
    }

    fn required_duration_ms(&self, settings: &DetectionSettings) -> u64 {
        settings.auto_stop_duration_ms
    }

    fn condition_holds(&mut self, metric: &WorkoutMetric, context: &DetectionContext<'_>) -> bool {
        let Some(ranges) = context.meaningful_ranges() else {
            return false;
        };
        let settings = context.settings;

        let tolerance = (ranges.range() * START_POSITION_FRACTION).max(settings.stall_min_position);
        let near_start = ranges.is_near_bottom(metric.max_position(), tolerance);
        let unloaded = metric.load_a.max(metric.load_b) < settings.handle_rest_threshold;
        let motionless = metric.max_speed() < settings.stall_velocity_low;

        near_start && (unloaded || motionless)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_trainer_core::RepRanges;

    fn sample(position: f32, velocity: f32, load: f32) -> WorkoutMetric {
        WorkoutMetric {
            timestamp_ms: 0,
            load_a: load,
            load_b: load,
            position_a: position,
            position_b: position,
            velocity_a: velocity,
            velocity_b: velocity,
        }
    }

    fn calibrated() -> Option<RepRanges> {
        let mut ranges = RepRanges::from_position(20.0);
        ranges.include(420.0);
        Some(ranges)
    }

    #[test]
    fn test_motionless_at_start() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = HandleRestDetector::new();
        assert!(detector.condition_holds(&sample(25.0, 0.5, 20.0), &context));
    }

    #[test]
    fn test_released_at_start() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = HandleRestDetector::new();
        assert!(detector.condition_holds(&sample(22.0, 30.0, 1.0), &context));
    }

    #[test]
    fn test_moving_at_start_is_not_rest() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = HandleRestDetector::new();
        assert!(!detector.condition_holds(&sample(25.0, 150.0, 20.0), &context));
    }

    #[test]
    fn test_mid_range_is_not_rest() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = HandleRestDetector::new();
        assert!(!detector.condition_holds(&sample(250.0, 0.0, 1.0), &context));
    }

    #[test]
    fn test_requires_calibration() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, None);
        let mut detector = HandleRestDetector::new();
        assert!(!detector.condition_holds(&sample(0.0, 0.0, 0.0), &context));
    }
}
