//! Routes device streams into rep counts and auto-stop decisions.
//!
//! The processor only touches the session while the set is `Active`. Events
//! that arrive in any other state are dropped without side effects.

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use cable_trainer_core::{
    DetectionSettings, RepEvent, WorkoutMetric, WorkoutParameters, WorkoutState,
};
use cable_trainer_detector::{
    AutoStopDecision, AutoStopDetector, AutoStopReason, AutoStopUiState, PhaseRepCounter, RepCounter, RepKind,
    RepTarget,
};

use crate::events::{FeedbackEvent, FeedbackEvents};
use crate::state::SessionState;

/// What a rep notification did to the set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepOutcome {
    /// Not counted (wrong state, partial rep, or mid-cycle phase)
    Ignored,
    /// A rep was counted
    Counted(RepKind),
    /// The working target was reached and set completion was claimed
    TargetReached,
}

/// Rep counter plus auto-stop detector for the running set.
pub struct RepStreamProcessor {
    counter: Mutex<Box<dyn RepCounter>>,
    auto_stop: Mutex<AutoStopDetector>,
    /// Latest sample timestamp and when it arrived
    sample_clock: Mutex<Option<(u64, Instant)>>,
    events: FeedbackEvents,
}

impl std::fmt::Debug for RepStreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepStreamProcessor")
            .field("auto_stop", &*self.auto_stop.lock())
            .finish_non_exhaustive()
    }
}

impl RepStreamProcessor {
    /// Create a processor with the phase counter and the standard signals.
    pub fn new(settings: DetectionSettings, events: FeedbackEvents) -> Self {
        Self::with_parts(
            Box::new(PhaseRepCounter::new()),
            AutoStopDetector::new(settings),
            events,
        )
    }

    /// Create a processor from explicit parts.
    pub fn with_parts(
        counter: Box<dyn RepCounter>,
        auto_stop: AutoStopDetector,
        events: FeedbackEvents,
    ) -> Self {
        Self {
            counter: Mutex::new(counter),
            auto_stop: Mutex::new(auto_stop),
            sample_clock: Mutex::new(None),
            events,
        }
    }

    /// Current time on the device's sample clock, if a sample has been seen.
    fn sample_time_now(&self) -> Option<u64> {
        self.sample_clock.lock().map(|(timestamp_ms, received)| {
            timestamp_ms + received.elapsed().as_millis() as u64
        })
    }

    /// Prepare for a new set.
    ///
    /// Auto-stop is armed for Just Lift and AMRAP sets when stall detection is
    /// enabled; AMRAP sets start with the grace window, counted from now.
    pub fn begin_set(&self, parameters: &WorkoutParameters, stall_detection_enabled: bool) {
        let min_range = self.auto_stop.lock().settings().min_range_threshold;
        let target = RepTarget {
            warmup_reps: if parameters.is_just_lift {
                0
            } else {
                parameters.warmup_reps
            },
            working_reps: parameters.has_rep_target().then_some(parameters.reps),
            stop_at_top: parameters.stop_at_top,
            min_range,
        };
        self.counter.lock().configure(target);

        let mut auto_stop = self.auto_stop.lock();
        auto_stop.reset();
        if parameters.uses_auto_stop() && stall_detection_enabled {
            match self.sample_time_now() {
                Some(now_ms) => auto_stop.arm_at(parameters.is_amrap, now_ms),
                None => auto_stop.arm(parameters.is_amrap),
            }
        }
        debug!(
            "Set begun: target={:?}, auto_stop_armed={}",
            target,
            auto_stop.is_armed()
        );
    }

    /// Re-arm after a pause; the AMRAP grace does not restart.
    pub fn resume_set(&self, parameters: &WorkoutParameters, stall_detection_enabled: bool) {
        let mut auto_stop = self.auto_stop.lock();
        auto_stop.reset();
        if parameters.uses_auto_stop() && stall_detection_enabled {
            auto_stop.arm(false);
        }
    }

    /// Stop reacting to samples.
    pub fn end_set(&self) {
        self.auto_stop.lock().disarm();
    }

    /// Clear counts, ranges, and detector state.
    pub fn reset(&self) {
        self.counter.lock().reset();
        self.auto_stop.lock().reset();
    }

    /// Whether auto-stop is armed.
    pub fn auto_stop_armed(&self) -> bool {
        self.auto_stop.lock().is_armed()
    }

    /// Current auto-stop indicator.
    pub fn auto_stop_ui(&self) -> AutoStopUiState {
        self.auto_stop.lock().ui_state()
    }

    /// Count a rep notification.
    ///
    /// On reaching the working target the set-completion guard is claimed;
    /// the caller owns the stop that follows.
    pub fn on_rep_event(&self, state: &SessionState, event: &RepEvent) -> RepOutcome {
        state.update(|s| {
            if s.workout_state != WorkoutState::Active {
                trace!("Rep event ignored in state {}", s.workout_state);
                return RepOutcome::Ignored;
            }

            let mut counter = self.counter.lock();
            let update = counter.process(event);
            s.rep_ranges = counter.ranges();
            let Some(update) = update else {
                return RepOutcome::Ignored;
            };

            s.rep_count.merge_monotonic(&update.count);
            self.events.emit(FeedbackEvent::RepCounted {
                kind: update.kind,
                count: s.rep_count,
            });
            if update.kind == RepKind::Working
                && s.rep_count.working_reps == 1
                && s.rep_count.warmup_reps > 0
            {
                self.events.emit(FeedbackEvent::WarmupComplete);
            }

            if update.target_reached && !s.guards.set_completion_in_progress {
                s.guards.set_completion_in_progress = true;
                info!(
                    "Rep target reached: {} working reps",
                    s.rep_count.working_reps
                );
                self.events.emit(FeedbackEvent::TargetReached);
                return RepOutcome::TargetReached;
            }
            RepOutcome::Counted(update.kind)
        })
    }

    /// Record a sample and run auto-stop.
    ///
    /// Returns the reason when auto-stop fires and this call claimed the
    /// auto-stop guard; the caller owns the stop that follows.
    pub fn on_metric(&self, state: &SessionState, metric: &WorkoutMetric) -> Option<AutoStopReason> {
        *self.sample_clock.lock() = Some((metric.timestamp_ms, Instant::now()));
        state.update(|s| {
            if s.workout_state != WorkoutState::Active {
                return None;
            }
            s.metrics.push(*metric);

            let mut auto_stop = self.auto_stop.lock();
            let decision = auto_stop.update(metric, s.rep_ranges);
            s.auto_stop = auto_stop.ui_state();

            match decision {
                AutoStopDecision::Pending {
                    reason,
                    elapsed_ms: 0,
                    ..
                } => {
                    self.events.emit(FeedbackEvent::AutoStopPending { reason });
                    None
                }
                AutoStopDecision::Cancelled => {
                    self.events.emit(FeedbackEvent::AutoStopCancelled);
                    None
                }
                AutoStopDecision::Fire(reason) => {
                    if s.guards.auto_stop_triggered || s.guards.set_completion_in_progress {
                        debug!("Auto-stop fired but completion already claimed");
                        return None;
                    }
                    s.guards.auto_stop_triggered = true;
                    self.events.emit(FeedbackEvent::AutoStopTriggered { reason });
                    Some(reason)
                }
                _ => None,
            }
        })
    }
}
