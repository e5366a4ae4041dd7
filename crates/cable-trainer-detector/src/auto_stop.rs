//! Auto-stop detector for Just Lift and AMRAP sets.
//!
//! Each signal detector gets its own timer. A signal must hold for its full
//! duration without interruption before the detector fires, and it fires at
//! most once per arming. All timing uses sample timestamps, never the wall
//! clock, so replays and tests are deterministic.

use tracing::{debug, info};

use cable_trainer_core::{DetectionSettings, RepRanges, WorkoutMetric};

use crate::detection::{
    AutoStopDecision, AutoStopReason, AutoStopUiState, DetectionContext, SignalDetector,
};
use crate::detectors::{HandleRestDetector, StallDetector};

/// A signal detector plus the timestamp its condition started holding.
struct TimedSignal {
    detector: Box<dyn SignalDetector>,
    since_ms: Option<u64>,
}

/// Watches the metric stream and decides when a set without a rep target
/// should end.
pub struct AutoStopDetector {
    settings: DetectionSettings,
    signals: Vec<TimedSignal>,
    armed: bool,
    apply_grace: bool,
    grace_start_ms: Option<u64>,
    pending: Option<AutoStopReason>,
    fired: bool,
    ui: AutoStopUiState,
}

impl std::fmt::Debug for AutoStopDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoStopDetector")
            .field("armed", &self.armed)
            .field("fired", &self.fired)
            .field("pending", &self.pending)
            .field(
                "signals",
                &self
                    .signals
                    .iter()
                    .map(|s| s.detector.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AutoStopDetector {
    /// Create a detector with the stall and handle-rest signals.
    pub fn new(settings: DetectionSettings) -> Self {
        let mut detector = Self::empty(settings);
        detector.add_signal(Box::new(StallDetector::new()));
        detector.add_signal(Box::new(HandleRestDetector::new()));
        detector
    }

    /// Create a detector without any signals.
    pub fn empty(settings: DetectionSettings) -> Self {
        Self {
            settings,
            signals: Vec::new(),
            armed: false,
            apply_grace: false,
            grace_start_ms: None,
            pending: None,
            fired: false,
            ui: AutoStopUiState::default(),
        }
    }

    /// Add a signal detector.
    pub fn add_signal(&mut self, detector: Box<dyn SignalDetector>) {
        self.signals.push(TimedSignal {
            detector,
            since_ms: None,
        });
    }

    /// Thresholds in use.
    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Start watching a new set.
    ///
    /// With `startup_grace`, all signals are masked until the grace window
    /// has passed, measured from the first sample after arming. Use
    /// [`arm_at`](Self::arm_at) when the set start is known in sample time.
    pub fn arm(&mut self, startup_grace: bool) {
        self.reset();
        self.armed = true;
        self.apply_grace = startup_grace;
        self.ui = AutoStopUiState {
            in_grace: startup_grace,
            ..AutoStopUiState::armed()
        };
        debug!("Auto-stop armed: startup_grace={}", startup_grace);
    }

    /// Start watching a set that began at `set_started_ms` (sample clock).
    ///
    /// The grace window runs from the set start, so samples that arrive late
    /// do not stretch it.
    pub fn arm_at(&mut self, startup_grace: bool, set_started_ms: u64) {
        self.arm(startup_grace);
        self.grace_start_ms = Some(set_started_ms);
    }

    /// Stop watching; pending requests are dropped.
    pub fn disarm(&mut self) {
        self.reset();
    }

    /// Clear all timers and the fired latch.
    pub fn reset(&mut self) {
        for signal in &mut self.signals {
            signal.detector.reset();
            signal.since_ms = None;
        }
        self.armed = false;
        self.apply_grace = false;
        self.grace_start_ms = None;
        self.pending = None;
        self.fired = false;
        self.ui = AutoStopUiState::default();
    }

    /// Whether the detector is watching.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether the detector has already fired since it was armed.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Current indicator for the presentation layer.
    pub fn ui_state(&self) -> AutoStopUiState {
        self.ui
    }

    /// Feed one sample.
    pub fn update(&mut self, metric: &WorkoutMetric, ranges: Option<RepRanges>) -> AutoStopDecision {
        if !self.armed || self.fired {
            return AutoStopDecision::Idle;
        }

        let now = metric.timestamp_ms;
        let started = *self.grace_start_ms.get_or_insert(now);

        if self.apply_grace {
            if now.saturating_sub(started) < self.settings.amrap_startup_grace_ms {
                self.ui.in_grace = true;
                return AutoStopDecision::Masked;
            }
            self.apply_grace = false;
            self.ui.in_grace = false;
            debug!("Auto-stop grace window ended at {}ms", now);
        }

        let context = DetectionContext::new(&self.settings, ranges);
        // signal closest to firing: (reason, elapsed, required)
        let mut leading: Option<(AutoStopReason, u64, u64)> = None;

        for signal in &mut self.signals {
            if !signal.detector.condition_holds(metric, &context) {
                signal.since_ms = None;
                continue;
            }

            let since = *signal.since_ms.get_or_insert(now);
            let elapsed = now.saturating_sub(since);
            let required = signal.detector.required_duration_ms(&self.settings);

            if elapsed >= required {
                let reason = signal.detector.reason();
                self.fired = true;
                self.pending = None;
                self.ui = AutoStopUiState {
                    pending_reason: Some(reason),
                    progress: 1.0,
                    ..AutoStopUiState::armed()
                };
                info!("Auto-stop fired: {} held for {}ms", reason, elapsed);
                return AutoStopDecision::Fire(reason);
            }

            let closer = match leading {
                Some((_, best_elapsed, best_required)) => {
                    elapsed as f64 / required as f64 > best_elapsed as f64 / best_required as f64
                }
                None => true,
            };
            if closer {
                leading = Some((signal.detector.reason(), elapsed, required));
            }
        }

        match leading {
            Some((reason, elapsed, required)) => {
                let remaining_ms = required - elapsed;
                if self.pending != Some(reason) {
                    debug!("Auto-stop pending: {} ({}ms to go)", reason, remaining_ms);
                }
                self.pending = Some(reason);
                self.ui = AutoStopUiState {
                    pending_reason: Some(reason),
                    progress: (elapsed as f32 / required as f32).clamp(0.0, 1.0),
                    seconds_remaining: remaining_ms as f32 / 1000.0,
                    ..AutoStopUiState::armed()
                };
                AutoStopDecision::Pending {
                    reason,
                    elapsed_ms: elapsed,
                    remaining_ms,
                }
            }
            None => {
                self.ui = AutoStopUiState::armed();
                if let Some(reason) = self.pending.take() {
                    debug!("Auto-stop request cancelled: {} interrupted by motion", reason);
                    AutoStopDecision::Cancelled
                } else {
                    AutoStopDecision::Idle
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp_ms: u64, position: f32, velocity: f32, load: f32) -> WorkoutMetric {
        WorkoutMetric {
            timestamp_ms,
            load_a: load,
            load_b: load,
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

    /// Feed `count` identical samples spaced `step_ms` apart, starting at `start_ms`.
    fn feed(
        detector: &mut AutoStopDetector,
        start_ms: u64,
        step_ms: u64,
        count: u64,
        position: f32,
        velocity: f32,
        load: f32,
    ) -> Vec<AutoStopDecision> {
        (0..count)
            .map(|i| {
                detector.update(
                    &sample(start_ms + i * step_ms, position, velocity, load),
                    calibrated(),
                )
            })
            .collect()
    }

    #[test]
    fn test_idle_when_disarmed() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        let decision = detector.update(&sample(0, 0.0, 0.0, 0.0), calibrated());
        assert_eq!(decision, AutoStopDecision::Idle);
    }

    #[test]
    fn test_handles_at_rest_fires_after_full_duration() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);

        // rest at the bottom from t=0 to t=2400: pending only
        let decisions = feed(&mut detector, 0, 100, 25, 2.0, 0.0, 0.5);
        assert!(decisions
            .iter()
            .all(|d| matches!(d, AutoStopDecision::Pending { .. })));

        let decision = detector.update(&sample(2_500, 2.0, 0.0, 0.5), calibrated());
        assert_eq!(decision, AutoStopDecision::Fire(AutoStopReason::HandlesAtRest));
        assert!(detector.has_fired());
    }

    #[test]
    fn test_fires_only_once() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);
        feed(&mut detector, 0, 100, 26, 2.0, 0.0, 0.5);
        assert!(detector.has_fired());

        let after = feed(&mut detector, 2_600, 100, 30, 2.0, 0.0, 0.5);
        assert!(after.iter().all(|d| *d == AutoStopDecision::Idle));
    }

    #[test]
    fn test_motion_cancels_pending_request() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);

        feed(&mut detector, 0, 100, 20, 2.0, 0.0, 0.5);
        assert!(detector.ui_state().pending_reason.is_some());

        let decision = detector.update(&sample(2_000, 200.0, 300.0, 20.0), calibrated());
        assert_eq!(decision, AutoStopDecision::Cancelled);
        assert!(detector.ui_state().pending_reason.is_none());

        // timer restarts from zero
        let decisions = feed(&mut detector, 2_100, 100, 25, 2.0, 0.0, 0.5);
        assert!(!decisions
            .iter()
            .any(|d| matches!(d, AutoStopDecision::Fire(_))));
    }

    #[test]
    fn test_stall_fires_after_stall_duration() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);

        // holding mid-range under load, not moving
        let decisions = feed(&mut detector, 0, 100, 50, 200.0, 1.0, 20.0);
        assert!(!decisions
            .iter()
            .any(|d| matches!(d, AutoStopDecision::Fire(_))));

        let decision = detector.update(&sample(5_000, 200.0, 1.0, 20.0), calibrated());
        assert_eq!(decision, AutoStopDecision::Fire(AutoStopReason::Stall));
    }

    #[test]
    fn test_amrap_grace_masks_signals() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(true);
        assert!(detector.ui_state().in_grace);

        // first sample at t=10_000 starts the grace window
        let decisions = feed(&mut detector, 10_000, 100, 80, 2.0, 0.0, 0.5);
        assert!(decisions.iter().all(|d| *d == AutoStopDecision::Masked));

        // grace over at t=18_000; now the full rest duration must still elapse
        let decisions = feed(&mut detector, 18_000, 100, 25, 2.0, 0.0, 0.5);
        assert!(!decisions
            .iter()
            .any(|d| matches!(d, AutoStopDecision::Fire(_))));
        assert!(!detector.ui_state().in_grace);

        let decision = detector.update(&sample(20_500, 2.0, 0.0, 0.5), calibrated());
        assert_eq!(decision, AutoStopDecision::Fire(AutoStopReason::HandlesAtRest));
    }

    #[test]
    fn test_grace_measured_from_set_start() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm_at(true, 10_000);

        // first sample arrives 5s into the set
        let decision = detector.update(&sample(15_000, 2.0, 0.0, 0.5), calibrated());
        assert_eq!(decision, AutoStopDecision::Masked);

        // 8s after the set start the window is over
        let decision = detector.update(&sample(18_000, 2.0, 0.0, 0.5), calibrated());
        assert!(matches!(decision, AutoStopDecision::Pending { .. }));
        assert!(!detector.ui_state().in_grace);
    }

    #[test]
    fn test_ui_state_progress() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);
        feed(&mut detector, 0, 1_000, 2, 2.0, 0.0, 0.5);

        let ui = detector.ui_state();
        assert!(ui.armed);
        assert_eq!(ui.pending_reason, Some(AutoStopReason::HandlesAtRest));
        assert!((ui.progress - 0.4).abs() < 1e-4);
        assert!((ui.seconds_remaining - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_reset_clears_fired_latch() {
        let mut detector = AutoStopDetector::new(DetectionSettings::default());
        detector.arm(false);
        feed(&mut detector, 0, 100, 26, 2.0, 0.0, 0.5);
        assert!(detector.has_fired());

        detector.reset();
        assert!(!detector.has_fired());
        assert!(!detector.is_armed());
        assert_eq!(detector.ui_state(), AutoStopUiState::default());
    }
}
