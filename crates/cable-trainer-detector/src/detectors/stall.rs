//! Stall detector: sustained near-zero velocity away from the start position.

use cable_trainer_core::{DetectionSettings, WorkoutMetric};

use crate::detection::{AutoStopReason, DetectionContext, SignalDetector};

/// Stall detector with a velocity hysteresis band.
///
/// A stall begins when speed drops below `stall_velocity_low` and only ends
/// once speed rises above `stall_velocity_high`, so jitter inside the band
/// does not restart the timer.
#[derive(Debug, Default)]
pub struct StallDetector {
    stalling: bool,
}

impl StallDetector {
    /// Create a new stall detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last sample left the detector in the stalled band.
    pub fn is_stalling(&self) -> bool {
        self.stalling
    }
}

impl SignalDetector for StallDetector {
    fn name(&self) -> &'static str {
        "stall"
    }

    fn reason(&self) -> AutoStopReason {
        AutoStopReason::Stall
    }

    fn required_duration_ms(&self, settings: &DetectionSettings) -> u64 {
        settings.stall_duration_ms
    }

    fn condition_holds(&mut self, metric: &WorkoutMetric, context: &DetectionContext<'_>) -> bool {
        let settings = context.settings;

        // nothing to stall on before the user has actually moved
        if context.meaningful_ranges().is_none()
            || metric.max_position() < settings.stall_min_position
        {
            self.stalling = false;
            return false;
        }

        let speed = metric.max_speed();
        if self.stalling {
            if speed > settings.stall_velocity_high {
                self.stalling = false;
            }
        } else if speed < settings.stall_velocity_low {
            self.stalling = true;
        }

        self.stalling
    }

    fn reset(&mut self) {
        self.stalling = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_trainer_core::RepRanges;

    fn sample(position: f32, velocity: f32) -> WorkoutMetric {
        WorkoutMetric {
            timestamp_ms: 0,
            load_a: 20.0,
            load_b: 20.0,
            position_a: position,
            position_b: position,
            velocity_a: velocity,
            velocity_b: velocity,
        }
    }

    fn calibrated() -> Option<RepRanges> {
        let mut ranges = RepRanges::from_position(0.0);
        ranges.include(400.0);
        Some(ranges)
    }

    #[test]
    fn test_enters_below_low_velocity() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = StallDetector::new();

        assert!(!detector.condition_holds(&sample(200.0, 50.0), &context));
        assert!(detector.condition_holds(&sample(200.0, 1.0), &context));
    }

    #[test]
    fn test_hysteresis_band() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = StallDetector::new();

        // inside the band without a stall: does not enter
        assert!(!detector.condition_holds(&sample(200.0, 5.0), &context));
        // enter
        assert!(detector.condition_holds(&sample(200.0, 2.0), &context));
        // inside the band while stalled: stays stalled
        assert!(detector.condition_holds(&sample(200.0, 8.0), &context));
        // above the band: exits
        assert!(!detector.condition_holds(&sample(200.0, 12.0), &context));
    }

    #[test]
    fn test_suppressed_below_position_floor() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = StallDetector::new();

        assert!(!detector.condition_holds(&sample(5.0, 0.0), &context));
    }

    #[test]
    fn test_suppressed_before_meaningful_movement() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, None);
        let mut detector = StallDetector::new();

        assert!(!detector.condition_holds(&sample(200.0, 0.0), &context));
    }

    #[test]
    fn test_reset() {
        let settings = DetectionSettings::default();
        let context = DetectionContext::new(&settings, calibrated());
        let mut detector = StallDetector::new();
        detector.condition_holds(&sample(200.0, 0.0), &context);
        assert!(detector.is_stalling());
        detector.reset();
        assert!(!detector.is_stalling());
    }
}
