//! Property-based tests for auto-stop and rep counting.
//!
//! Uses proptest to generate random sample streams and verify detector invariants.

use proptest::prelude::*;

use cable_trainer_core::{DetectionSettings, RepEvent, RepPhase, RepRanges, WorkoutMetric};
use cable_trainer_detector::{
    AutoStopDecision, AutoStopDetector, PhaseRepCounter, RepCounter, RepTarget,
};

fn calibrated() -> Option<RepRanges> {
    let mut ranges = RepRanges::from_position(0.0);
    ranges.include(400.0);
    Some(ranges)
}

/// A random sample: position, velocity, load.
fn sample_values() -> impl Strategy<Value = (f32, f32, f32)> {
    (0.0f32..500.0, -300.0f32..300.0, 0.0f32..60.0)
}

/// A random stream of samples with positive time steps.
fn sample_stream() -> impl Strategy<Value = Vec<(u64, (f32, f32, f32))>> {
    prop::collection::vec((1u64..400, sample_values()), 1..300)
}

fn build_stream(steps: &[(u64, (f32, f32, f32))]) -> Vec<WorkoutMetric> {
    let mut now = 0;
    steps
        .iter()
        .map(|(step, (position, velocity, load))| {
            now += step;
            WorkoutMetric {
                timestamp_ms: now,
                load_a: *load,
                load_b: *load,
                position_a: *position,
                position_b: *position,
                velocity_a: *velocity,
                velocity_b: *velocity,
            }
        })
        .collect()
}

proptest! {
    /// Auto-stop never fires before the shortest signal duration has elapsed
    /// since arming.
    #[test]
    fn auto_stop_never_fires_early(steps in sample_stream()) {
        let settings = DetectionSettings::default();
        let shortest = settings.auto_stop_duration_ms.min(settings.stall_duration_ms);
        let mut detector = AutoStopDetector::new(settings);
        detector.arm(false);

        let metrics = build_stream(&steps);
        let first = metrics[0].timestamp_ms;
        for metric in &metrics {
            if let AutoStopDecision::Fire(_) = detector.update(metric, calibrated()) {
                prop_assert!(metric.timestamp_ms - first >= shortest);
            }
        }
    }

    /// Auto-stop fires at most once per arming.
    #[test]
    fn auto_stop_fires_at_most_once(steps in sample_stream()) {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);

        let fires = build_stream(&steps)
            .iter()
            .filter(|m| matches!(detector.update(m, calibrated()), AutoStopDecision::Fire(_)))
            .count();
        prop_assert!(fires <= 1);
    }

    /// Nothing fires inside the AMRAP grace window.
    #[test]
    fn amrap_grace_masks_everything(steps in sample_stream()) {
        let settings = DetectionSettings::default();
        let grace = settings.amrap_startup_grace_ms;
        let mut detector = AutoStopDetector::new(settings);
        detector.arm(true);

        let metrics = build_stream(&steps);
        let first = metrics[0].timestamp_ms;
        for metric in &metrics {
            let decision = detector.update(metric, calibrated());
            if metric.timestamp_ms - first < grace {
                prop_assert_eq!(decision, AutoStopDecision::Masked);
            }
        }
    }

    /// Rep counts never decrease within a set, whatever the event order.
    #[test]
    fn rep_counts_are_monotonic(
        events in prop::collection::vec((0usize..4, 0.0f32..500.0), 0..200),
        warmup in 0u32..5,
        working in prop::option::of(1u32..15),
        stop_at_top in any::<bool>(),
    ) {
        let mut counter = PhaseRepCounter::with_target(RepTarget {
            warmup_reps: warmup,
            working_reps: working,
            stop_at_top,
            ..RepTarget::default()
        });

        let phases = [RepPhase::Concentric, RepPhase::Top, RepPhase::Eccentric, RepPhase::Bottom];
        let mut previous = counter.count();
        let mut target_reports = 0;
        for (phase, position) in events {
            if let Some(update) = counter.process(&RepEvent::new(phases[phase], position, 0)) {
                if update.target_reached {
                    target_reports += 1;
                }
            }
            let current = counter.count();
            prop_assert!(current.warmup_reps >= previous.warmup_reps);
            prop_assert!(current.working_reps >= previous.working_reps);
            prop_assert!(current.burnout_reps >= previous.burnout_reps);
            prop_assert!(current.warmup_reps <= warmup);
            previous = current;
        }
        prop_assert!(target_reports <= 1);
    }
}
