//! Set summary computation from collected metric samples.

use cable_trainer_core::{
    CableForces, RepCount, SetSummary, WorkoutMetric, WorkoutParameters, GRAVITY,
};

const JOULES_PER_KCAL: f32 = 4184.0;
/// Fraction of metabolic energy turned into mechanical work.
const MUSCLE_EFFICIENCY: f32 = 0.25;
const MM_TO_M: f32 = 0.001;

/// Running peak/average accumulator for one cable direction.
#[derive(Debug, Default, Clone, Copy)]
struct ForceAccumulator {
    peak: f32,
    sum: f32,
    samples: u32,
}

impl ForceAccumulator {
    fn add(&mut self, load: f32) {
        self.peak = self.peak.max(load);
        self.sum += load;
        self.samples += 1;
    }

    fn average(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum / self.samples as f32
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CableAccumulator {
    concentric: ForceAccumulator,
    eccentric: ForceAccumulator,
}

impl CableAccumulator {
    fn add(&mut self, load: f32, velocity: f32) {
        if velocity > 0.0 {
            self.concentric.add(load);
        } else if velocity < 0.0 {
            self.eccentric.add(load);
        }
    }

    fn forces(&self) -> CableForces {
        CableForces {
            peak_concentric_kg: self.concentric.peak,
            peak_eccentric_kg: self.eccentric.peak,
            avg_concentric_kg: self.concentric.average(),
            avg_eccentric_kg: self.eccentric.average(),
        }
    }
}

/// Builds the immutable `SetSummary` for a finished set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Summarize a set.
    ///
    /// Volume counts working and burnout reps at the programmed weight on both
    /// cables; Echo sets have no programmed weight, so the average measured
    /// load is used instead.
    pub fn compute(
        metrics: &[WorkoutMetric],
        rep_count: RepCount,
        parameters: &WorkoutParameters,
        duration_ms: u64,
    ) -> SetSummary {
        let mut cable_a = CableAccumulator::default();
        let mut cable_b = CableAccumulator::default();
        for metric in metrics {
            cable_a.add(metric.load_a, metric.velocity_a);
            cable_b.add(metric.load_b, metric.velocity_b);
        }

        let weight_per_cable = if parameters.program_mode.uses_fixed_weight() {
            parameters.weight_per_cable_kg
        } else {
            Self::average_load_per_cable(metrics)
        };
        let counted_reps = rep_count.working_reps + rep_count.burnout_reps;
        let total_volume_kg = counted_reps as f32 * weight_per_cable * 2.0;

        SetSummary {
            duration_ms,
            rep_count,
            cable_a: cable_a.forces(),
            cable_b: cable_b.forces(),
            total_volume_kg,
            calories: Self::calories(metrics),
            rpe: None,
        }
    }

    /// Mean load per cable over every sample that carried load.
    pub fn average_load_per_cable(metrics: &[WorkoutMetric]) -> f32 {
        let loaded: Vec<f32> = metrics
            .iter()
            .map(|m| m.total_load() / 2.0)
            .filter(|load| *load > 0.0)
            .collect();
        if loaded.is_empty() {
            0.0
        } else {
            loaded.iter().sum::<f32>() / loaded.len() as f32
        }
    }

    /// Energy estimate from mechanical work done on both cables.
    pub fn calories(metrics: &[WorkoutMetric]) -> f32 {
        let joules: f32 = metrics
            .windows(2)
            .map(|pair| {
                let (prev, next) = (&pair[0], &pair[1]);
                let travel_a = (next.position_a - prev.position_a).abs() * MM_TO_M;
                let travel_b = (next.position_b - prev.position_b).abs() * MM_TO_M;
                (next.load_a * travel_a + next.load_b * travel_b) * GRAVITY
            })
            .sum();
        joules / JOULES_PER_KCAL / MUSCLE_EFFICIENCY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_trainer_core::ProgramMode;

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

    fn working(reps: u32) -> RepCount {
        RepCount {
            working_reps: reps,
            ..RepCount::default()
        }
    }

    #[test]
    fn test_volume_uses_programmed_weight() {
        let parameters = WorkoutParameters {
            weight_per_cable_kg: 20.0,
            ..WorkoutParameters::default()
        };
        let rep_count = RepCount {
            warmup_reps: 3,
            working_reps: 10,
            burnout_reps: 2,
        };
        let summary = SummaryCalculator::compute(&[], rep_count, &parameters, 30_000);
        // warm-up reps excluded
        assert_eq!(summary.total_volume_kg, 12.0 * 20.0 * 2.0);
        assert_eq!(summary.duration_ms, 30_000);
        assert_eq!(summary.rpe, None);
    }

    #[test]
    fn test_echo_volume_uses_measured_load() {
        let parameters = WorkoutParameters {
            program_mode: ProgramMode::Echo,
            weight_per_cable_kg: 50.0,
            ..WorkoutParameters::default()
        };
        let metrics = vec![sample(0.0, 100.0, 10.0), sample(100.0, 100.0, 30.0)];
        let summary = SummaryCalculator::compute(&metrics, working(5), &parameters, 1_000);
        assert_eq!(summary.total_volume_kg, 5.0 * 20.0 * 2.0);
    }

    #[test]
    fn test_forces_split_by_direction() {
        let metrics = vec![
            sample(0.0, 100.0, 20.0),
            sample(100.0, 100.0, 25.0),
            sample(200.0, 0.0, 40.0),
            sample(100.0, -100.0, 30.0),
            sample(0.0, -100.0, 22.0),
        ];
        let summary =
            SummaryCalculator::compute(&metrics, working(1), &WorkoutParameters::default(), 500);

        assert_eq!(summary.cable_a.peak_concentric_kg, 25.0);
        assert_eq!(summary.cable_a.avg_concentric_kg, 22.5);
        assert_eq!(summary.cable_a.peak_eccentric_kg, 30.0);
        assert_eq!(summary.cable_a.avg_eccentric_kg, 26.0);
        assert_eq!(summary.cable_b, summary.cable_a);
        assert_eq!(summary.peak_force_kg(), 30.0);
    }

    #[test]
    fn test_calories() {
        // 20kg per cable lifted 500mm each: 2 * 20 * 9.80665 * 0.5 J
        let metrics = vec![sample(0.0, 100.0, 20.0), sample(500.0, 100.0, 20.0)];
        let expected = 2.0 * 20.0 * GRAVITY * 0.5 / JOULES_PER_KCAL / MUSCLE_EFFICIENCY;
        assert!((SummaryCalculator::calories(&metrics) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_empty_metrics() {
        let summary =
            SummaryCalculator::compute(&[], RepCount::default(), &WorkoutParameters::default(), 0);
        assert_eq!(summary.calories, 0.0);
        assert_eq!(summary.cable_a, CableForces::default());
        assert_eq!(SummaryCalculator::average_load_per_cable(&[]), 0.0);
    }
}
