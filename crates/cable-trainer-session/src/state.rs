//! The shared session state container.
//!
//! All session fields live behind one lock and are written only through
//! named components. Observable fields are republished on watch channels
//! after every update, while the lock is still held, so subscribers see
//! changes in the order they were made.
//!
//! | Field | Written by |
//! |---|---|
//! | `workout_state`, `parameters`, `load_baseline_kg`, `session_id`, set timing | `SessionCoordinator` |
//! | `rep_count`, `rep_ranges`, `auto_stop`, `metrics` (append) | `RepStreamProcessor` while `Active`; cleared by the coordinator |
//! | `flow`, `navigator` | `RoutineNavigator`, through the coordinator |
//! | `countdown` | timer tasks, through the coordinator |
//! | `guards.stop_in_progress`, `guards.handle_detection_deadline` | `SessionCoordinator` |
//! | `guards.set_completion_in_progress`, `guards.auto_stop_triggered` | `RepStreamProcessor`; cleared by the coordinator |
//! | `pending`, `completion_log` | `SessionCoordinator` (persistence path) |

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use cable_trainer_core::{
    RepCount, RepRanges, RoutineFlowState, SessionId, WorkoutCompletionLog, WorkoutParameters,
    WorkoutSessionRecord, WorkoutState,
};
use cable_trainer_detector::AutoStopUiState;
use cable_trainer_device::WorkoutActivityProbe;

use crate::metrics::MetricsBuffer;
use crate::navigator::RoutineNavigator;

/// Idempotency guards for operations with several entry points.
#[derive(Debug, Clone, Default)]
pub struct Guards {
    /// A stop is being processed
    pub stop_in_progress: bool,
    /// The rep target path has claimed set completion
    pub set_completion_in_progress: bool,
    /// Auto-stop has claimed set completion
    pub auto_stop_triggered: bool,
    /// Handle-detection enables before this instant are collapsed
    pub handle_detection_deadline: Option<Instant>,
}

impl Guards {
    /// Clear the per-set guards; the debounce deadline expires on its own.
    pub fn clear_set_guards(&mut self) {
        self.stop_in_progress = false;
        self.set_completion_in_progress = false;
        self.auto_stop_triggered = false;
    }
}

/// A finished set awaiting (or past) its save.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    /// Record handed to storage
    pub record: WorkoutSessionRecord,
    /// Storage accepted it
    pub saved: bool,
    /// A save is running; claimed by whoever calls storage
    pub saving: bool,
    /// Gamification flagged it as a personal record
    pub is_personal_record: bool,
}

impl PendingRecord {
    /// Record that has just been handed to storage.
    pub fn saving(record: WorkoutSessionRecord) -> Self {
        Self {
            record,
            saved: false,
            saving: true,
            is_personal_record: false,
        }
    }

    /// Storage has not accepted the record yet.
    pub fn is_unsaved(&self) -> bool {
        !self.saved
    }
}

/// Every field of a session.
#[derive(Debug)]
pub struct SessionInner {
    /// Current lifecycle state
    pub workout_state: WorkoutState,
    /// Parameters for the current or next set
    pub parameters: WorkoutParameters,
    /// Reps of the current set
    pub rep_count: RepCount,
    /// Rep-range calibration of the current set
    pub rep_ranges: Option<RepRanges>,
    /// Position within a loaded routine
    pub flow: RoutineFlowState,
    /// Loaded routine, if any
    pub navigator: Option<RoutineNavigator>,
    /// Idempotency guards
    pub guards: Guards,
    /// Resting load per cable measured before the first set
    pub load_baseline_kg: Option<f32>,
    /// Samples of the current set
    pub metrics: MetricsBuffer,
    /// Identifier of the current set's record
    pub session_id: SessionId,
    /// Wall-clock start of the current set
    pub set_started_at: Option<DateTime<Utc>>,
    /// Monotonic start of the current set
    pub set_started: Option<Instant>,
    /// When the set was paused, if it is
    pub paused_at: Option<Instant>,
    /// Time spent paused during the current set
    pub paused_total: Duration,
    /// The current set runs on the cables
    pub uses_cables: bool,
    /// Seconds left in the running countdown (set, auto-start, or timed exercise)
    pub countdown: Option<u32>,
    /// Auto-stop indicator
    pub auto_stop: AutoStopUiState,
    /// Finished set awaiting the user
    pub pending: Option<PendingRecord>,
    /// Log of the routine in progress
    pub completion_log: Option<WorkoutCompletionLog>,
}

impl SessionInner {
    fn new(parameters: WorkoutParameters, metrics_capacity: usize) -> Self {
        Self {
            workout_state: WorkoutState::Idle,
            parameters,
            rep_count: RepCount::default(),
            rep_ranges: None,
            flow: RoutineFlowState::NotInRoutine,
            navigator: None,
            guards: Guards::default(),
            load_baseline_kg: None,
            metrics: MetricsBuffer::new(metrics_capacity),
            session_id: SessionId::new(),
            set_started_at: None,
            set_started: None,
            paused_at: None,
            paused_total: Duration::ZERO,
            uses_cables: true,
            countdown: None,
            auto_stop: AutoStopUiState::default(),
            pending: None,
            completion_log: None,
        }
    }

    /// Clear everything the current set accumulated.
    ///
    /// Parameters, baseline, and routine position are kept.
    pub fn clear_set_progress(&mut self) {
        self.rep_count = RepCount::default();
        self.rep_ranges = None;
        self.metrics.clear();
        self.set_started_at = None;
        self.set_started = None;
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
        self.countdown = None;
        self.auto_stop = AutoStopUiState::default();
    }

    /// Active time of the current set, excluding pauses.
    pub fn active_duration(&self, now: Instant) -> Duration {
        let Some(started) = self.set_started else {
            return Duration::ZERO;
        };
        let paused_now = self
            .paused_at
            .map(|p| now.saturating_duration_since(p))
            .unwrap_or_default();
        now.saturating_duration_since(started)
            .saturating_sub(self.paused_total)
            .saturating_sub(paused_now)
    }

    /// Routine id of the loaded routine.
    pub fn routine_id(&self) -> Option<String> {
        self.navigator.as_ref().map(|n| n.routine().id.clone())
    }
}

/// Shared session state with change streams.
pub struct SessionState {
    inner: Mutex<SessionInner>,
    workout_tx: watch::Sender<WorkoutState>,
    flow_tx: watch::Sender<RoutineFlowState>,
    rep_count_tx: watch::Sender<RepCount>,
    ranges_tx: watch::Sender<Option<RepRanges>>,
    auto_stop_tx: watch::Sender<AutoStopUiState>,
    countdown_tx: watch::Sender<Option<u32>>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("workout_state", &*self.workout_tx.borrow())
            .field("flow", &*self.flow_tx.borrow())
            .finish_non_exhaustive()
    }
}

fn publish<T: PartialEq + Clone>(tx: &watch::Sender<T>, value: &T) {
    tx.send_if_modified(|current| {
        if current == value {
            false
        } else {
            *current = value.clone();
            true
        }
    });
}

impl SessionState {
    /// Create an idle session.
    pub fn new(parameters: WorkoutParameters, metrics_capacity: usize) -> Self {
        let inner = SessionInner::new(parameters, metrics_capacity);
        Self {
            workout_tx: watch::channel(inner.workout_state.clone()).0,
            flow_tx: watch::channel(inner.flow.clone()).0,
            rep_count_tx: watch::channel(inner.rep_count).0,
            ranges_tx: watch::channel(inner.rep_ranges).0,
            auto_stop_tx: watch::channel(inner.auto_stop).0,
            countdown_tx: watch::channel(inner.countdown).0,
            inner: Mutex::new(inner),
        }
    }

    /// Read the state.
    pub fn read<R>(&self, f: impl FnOnce(&SessionInner) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Change the state and republish observable fields.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionInner) -> R) -> R {
        let mut inner = self.inner.lock();
        let result = f(&mut inner);
        publish(&self.workout_tx, &inner.workout_state);
        publish(&self.flow_tx, &inner.flow);
        publish(&self.rep_count_tx, &inner.rep_count);
        publish(&self.ranges_tx, &inner.rep_ranges);
        publish(&self.auto_stop_tx, &inner.auto_stop);
        publish(&self.countdown_tx, &inner.countdown);
        result
    }

    /// Current lifecycle state.
    pub fn workout_state(&self) -> WorkoutState {
        self.read(|s| s.workout_state.clone())
    }

    /// Current parameters.
    pub fn parameters(&self) -> WorkoutParameters {
        self.read(|s| s.parameters.clone())
    }

    /// Current routine flow.
    pub fn flow(&self) -> RoutineFlowState {
        self.read(|s| s.flow.clone())
    }

    /// Current rep counts.
    pub fn rep_count(&self) -> RepCount {
        self.read(|s| s.rep_count)
    }

    /// Current rep-range calibration.
    pub fn rep_ranges(&self) -> Option<RepRanges> {
        self.read(|s| s.rep_ranges)
    }

    /// Lifecycle state changes.
    pub fn subscribe_workout_state(&self) -> watch::Receiver<WorkoutState> {
        self.workout_tx.subscribe()
    }

    /// Routine flow changes.
    pub fn subscribe_flow(&self) -> watch::Receiver<RoutineFlowState> {
        self.flow_tx.subscribe()
    }

    /// Rep count changes.
    pub fn subscribe_rep_count(&self) -> watch::Receiver<RepCount> {
        self.rep_count_tx.subscribe()
    }

    /// Rep-range calibration changes.
    pub fn subscribe_rep_ranges(&self) -> watch::Receiver<Option<RepRanges>> {
        self.ranges_tx.subscribe()
    }

    /// Auto-stop indicator changes.
    pub fn subscribe_auto_stop(&self) -> watch::Receiver<AutoStopUiState> {
        self.auto_stop_tx.subscribe()
    }

    /// Countdown value changes.
    pub fn subscribe_countdown(&self) -> watch::Receiver<Option<u32>> {
        self.countdown_tx.subscribe()
    }
}

impl WorkoutActivityProbe for SessionState {
    fn is_workout_active(&self) -> bool {
        self.read(|s| s.workout_state.is_in_set())
    }
}
