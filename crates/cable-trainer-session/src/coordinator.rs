//! The workout session coordinator.
//!
//! `SessionCoordinator` owns one session: it drives the lifecycle state
//! machine, consumes the device streams, runs the session timers, and hands
//! finished sets to the persistence pipeline. Background tasks hold only a
//! weak reference and every one of them runs under the coordinator's
//! cancellation token, so dropping the last handle tears the whole tree down.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cable_trainer_core::{
    Error, HandleState, RepEvent, Result, RestInfo, Routine, RoutineFlowState, SessionId,
    TrainerConfig, UserSettings, WorkoutCompletionLog, WorkoutMetric, WorkoutParameters,
    WorkoutSessionRecord, WorkoutState,
};
use cable_trainer_detector::SummaryCalculator;
use cable_trainer_device::{
    ConnectionAlert, ConnectionMonitor, DeviceCommand, DeviceLink, WorkoutActivityProbe,
};

use crate::events::{FeedbackEvent, FeedbackEvents};
use crate::library::RoutineRepository;
use crate::navigator::{RoutineNavigator, RoutineStep, SetReadyAdjustment};
use crate::persistence::{SaveOutcome, SessionPersistencePipeline};
use crate::rep_stream::{RepOutcome, RepStreamProcessor};
use crate::snapshot::SessionSnapshot;
use crate::state::{PendingRecord, SessionInner, SessionState};
use crate::timers::{TimerBank, TimerKind};
use crate::wait::{wait_for_state, WaitCondition, WaitResult};

const ALL_TIMERS: [TimerKind; 5] = [
    TimerKind::Countdown,
    TimerKind::Rest,
    TimerKind::AutoStart,
    TimerKind::TimedExercise,
    TimerKind::SummaryAutoplay,
];

const TICK: Duration = Duration::from_secs(1);

struct CoordinatorInner {
    state: Arc<SessionState>,
    device: Arc<dyn DeviceLink>,
    processor: RepStreamProcessor,
    timers: TimerBank,
    pipeline: SessionPersistencePipeline,
    settings: watch::Receiver<UserSettings>,
    config: TrainerConfig,
    events: FeedbackEvents,
    monitor: ConnectionMonitor,
    cancel: CancellationToken,
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// What a stop has to do once the state lock is released.
struct StopPlan {
    record: Option<WorkoutSessionRecord>,
    send_stop: bool,
    completion_log: Option<WorkoutCompletionLog>,
}

/// Where proceeding from a set summary leads.
enum AfterSummary {
    Idle,
    Rest(u32),
    Completed(Option<WorkoutCompletionLog>),
}

/// Drives one workout session.
///
/// Cheap to clone; all clones control the same session.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("state", &self.inner.state)
            .field("timers", &self.inner.timers.running())
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Create a coordinator and start consuming the device streams.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: TrainerConfig,
        device: Arc<dyn DeviceLink>,
        pipeline: SessionPersistencePipeline,
        settings: watch::Receiver<UserSettings>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let events = FeedbackEvents::new();
        let state = Arc::new(SessionState::new(
            WorkoutParameters::default(),
            config.session.metrics_buffer_capacity,
        ));

        let inner = Arc::new(CoordinatorInner {
            processor: RepStreamProcessor::new(config.detection.clone(), events.clone()),
            timers: TimerBank::new(&cancel),
            pipeline: pipeline.with_events(events.clone()),
            monitor: ConnectionMonitor::new(),
            state,
            device,
            settings,
            config,
            events,
            cancel,
        });

        let coordinator = Self { inner };
        coordinator.spawn_stream_pump();
        let _monitor = coordinator.inner.monitor.spawn(
            Arc::clone(&coordinator.inner.device),
            Arc::clone(&coordinator.inner.state) as Arc<dyn WorkoutActivityProbe>,
            coordinator.inner.cancel.child_token(),
        );
        info!("Session coordinator started");
        coordinator
    }

    fn downgrade(&self) -> Weak<CoordinatorInner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<CoordinatorInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Shared session state and its change streams.
    pub fn state(&self) -> &Arc<SessionState> {
        &self.inner.state
    }

    /// Receive feedback events.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<FeedbackEvent> {
        self.inner.events.subscribe()
    }

    /// Latest user settings.
    pub fn settings(&self) -> UserSettings {
        self.inner.settings.borrow().clone()
    }

    /// Timers currently running.
    pub fn running_timers(&self) -> Vec<TimerKind> {
        self.inner.timers.running()
    }

    /// Copy of everything a status query needs.
    pub fn snapshot(&self) -> SessionSnapshot {
        let timers = self.inner.timers.running();
        self.inner
            .state
            .read(|s| SessionSnapshot::capture(s, timers))
    }

    /// Wait until the workout state satisfies `condition`.
    pub async fn wait_for(&self, condition: &WaitCondition) -> WaitResult {
        wait_for_state(self.inner.state.subscribe_workout_state(), condition).await
    }

    /// Cancel every background task.
    pub fn shutdown(&self) {
        info!("Session coordinator shutting down");
        self.inner.cancel.cancel();
    }

    async fn send(&self, command: DeviceCommand) -> Result<()> {
        let name = command.name();
        let timeout_ms = self.inner.config.device.command_timeout_ms;
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.inner.device.send_command(command),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::CommandFailed(format!(
                "{} timed out after {}ms",
                name, timeout_ms
            ))),
        }
    }

    /// Send a command whose failure must not change the session.
    async fn send_best_effort(&self, command: DeviceCommand) {
        let name = command.name();
        if let Err(e) = self.send(command).await {
            warn!("Device command {} failed: {}", name, e);
            self.inner.events.emit(FeedbackEvent::DeviceError {
                reason: e.to_string(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Device streams
    // ------------------------------------------------------------------

    fn spawn_stream_pump(&self) {
        let weak = self.downgrade();
        let cancel = self.inner.cancel.child_token();
        let mut reps = self.inner.device.subscribe_rep_events();
        let mut metrics = self.inner.device.subscribe_metrics();
        let mut handles = self.inner.device.subscribe_handle_state();
        let mut alerts = self.inner.monitor.subscribe();

        tokio::spawn(async move {
            debug!("Device stream pump started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = reps.recv() => match event {
                        Ok(event) => {
                            let Some(this) = Self::upgrade(&weak) else { break };
                            this.handle_rep_event(event).await;
                        }
                        Err(RecvError::Lagged(n)) => warn!("Rep stream lagged: {} events dropped", n),
                        Err(RecvError::Closed) => break,
                    },
                    metric = metrics.recv() => match metric {
                        Ok(metric) => {
                            let Some(this) = Self::upgrade(&weak) else { break };
                            this.handle_metric(metric).await;
                        }
                        Err(RecvError::Lagged(n)) => warn!("Metric stream lagged: {} samples dropped", n),
                        Err(RecvError::Closed) => break,
                    },
                    changed = handles.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let handle = *handles.borrow_and_update();
                        let Some(this) = Self::upgrade(&weak) else { break };
                        this.handle_handle_state(handle);
                    }
                    alert = alerts.recv() => match alert {
                        Ok(alert) => {
                            let Some(this) = Self::upgrade(&weak) else { break };
                            this.handle_connection_alert(alert);
                        }
                        Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Device stream pump stopped");
        });
    }

    async fn handle_rep_event(&self, event: RepEvent) {
        let outcome = self
            .inner
            .processor
            .on_rep_event(&self.inner.state, &event);
        if outcome == RepOutcome::TargetReached {
            if let Err(e) = self.stop_workout(false).await {
                error!("Completing set at rep target failed: {}", e);
            }
        }
    }

    async fn handle_metric(&self, metric: WorkoutMetric) {
        if let Some(reason) = self.inner.processor.on_metric(&self.inner.state, &metric) {
            info!("Auto-stop ending set: {}", reason);
            if let Err(e) = self.stop_workout(false).await {
                error!("Completing set on auto-stop failed: {}", e);
            }
        }
    }

    fn handle_handle_state(&self, handle: HandleState) {
        match handle {
            HandleState::Grabbed => {
                let ready = self.inner.state.read(|s| {
                    s.workout_state == WorkoutState::Idle && s.parameters.use_auto_start
                });
                if ready {
                    self.start_auto_start_countdown();
                }
            }
            HandleState::Released => {
                if self.inner.timers.cancel(TimerKind::AutoStart) {
                    self.inner.state.update(|s| s.countdown = None);
                    info!("Auto-start cancelled: handles released");
                }
            }
        }
    }

    fn handle_connection_alert(&self, alert: ConnectionAlert) {
        // informational only: the set, its summary, and its pending save survive
        let event = match alert {
            ConnectionAlert::ConnectionLost { during_workout } => {
                FeedbackEvent::ConnectionLost { during_workout }
            }
            ConnectionAlert::Reconnected { device_name } => {
                FeedbackEvent::Reconnected { device_name }
            }
        };
        self.inner.events.emit(event);
    }

    // ------------------------------------------------------------------
    // Set lifecycle
    // ------------------------------------------------------------------

    /// Start a set.
    ///
    /// The state is `Initializing` before this first awaits. A device
    /// failure reverts to `Idle` and is returned. Calling this while a set is
    /// already starting or running does nothing.
    pub async fn start_workout(&self, skip_countdown: bool, is_just_lift: bool) -> Result<()> {
        let prepared = self
            .inner
            .state
            .update(|s| -> Result<Option<(WorkoutParameters, bool)>> {
                if s.workout_state.is_in_set() {
                    debug!("Start ignored: set already in progress");
                    return Ok(None);
                }
                if let Some(pending) = s.pending.as_ref().filter(|p| p.is_unsaved()) {
                    return Err(Error::UnsavedSet(pending.record.id));
                }

                let mut parameters = s.parameters.clone();
                let mut uses_cables = true;
                if !is_just_lift {
                    if let Some(nav) = s.navigator.as_mut() {
                        if let RoutineFlowState::SetReady {
                            exercise_index,
                            set_index,
                            ..
                        } = s.flow
                        {
                            nav.set_current(RoutineStep::new(exercise_index, set_index));
                        }
                        parameters = nav
                            .parameters_for_set_ready(&s.flow, &parameters)
                            .unwrap_or_else(|| nav.parameters_for(nav.current(), &parameters));
                        uses_cables = nav.current_uses_cables();
                    }
                }
                parameters.is_just_lift = is_just_lift;
                parameters.validate()?;

                s.clear_set_progress();
                s.guards.clear_set_guards();
                s.pending = None;
                s.session_id = SessionId::new();
                s.parameters = parameters.clone();
                s.uses_cables = uses_cables;
                s.workout_state = WorkoutState::Initializing;
                if s.navigator.is_some() && !is_just_lift {
                    s.flow = RoutineFlowState::InProgress;
                    if s.completion_log.is_none() {
                        s.completion_log = Some(WorkoutCompletionLog {
                            routine_id: s.routine_id(),
                            started_at: Utc::now(),
                            completed_at: Utc::now(),
                            sets: Vec::new(),
                            notes: None,
                        });
                    }
                }
                Ok(Some((parameters, uses_cables)))
            })?;

        let Some((parameters, uses_cables)) = prepared else {
            return Ok(());
        };
        self.inner.timers.cancel_many(&[
            TimerKind::Rest,
            TimerKind::AutoStart,
            TimerKind::SummaryAutoplay,
        ]);
        self.inner.processor.reset();
        info!(
            "Starting set: exercise={:?}, weight={}kg, just_lift={}",
            parameters.exercise_name, parameters.weight_per_cable_kg, is_just_lift
        );

        if uses_cables {
            self.resolve_load_baseline().await;
            if !self.still_initializing() {
                debug!("Start abandoned while resolving baseline");
                return Ok(());
            }
            if let Err(e) = self.send(DeviceCommand::StartProgram { parameters }).await {
                error!("Failed to start program on device: {}", e);
                self.inner.state.update(|s| {
                    if s.workout_state == WorkoutState::Initializing {
                        s.workout_state = WorkoutState::Idle;
                        if let Some(nav) = &s.navigator {
                            s.flow = nav.set_ready(nav.current());
                        }
                    }
                });
                self.inner.events.emit(FeedbackEvent::DeviceError {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        }

        let countdown = self.settings().countdown_seconds;
        if skip_countdown || countdown == 0 {
            self.go_active(None);
        } else {
            self.start_countdown(countdown);
        }
        Ok(())
    }

    fn still_initializing(&self) -> bool {
        self.inner
            .state
            .read(|s| s.workout_state == WorkoutState::Initializing)
    }

    /// Record the resting load from the first sample, once per session.
    async fn resolve_load_baseline(&self) {
        if self.inner.state.read(|s| s.load_baseline_kg.is_some()) {
            return;
        }
        let mut metrics = self.inner.device.subscribe_metrics();
        let wait = Duration::from_millis(self.inner.config.session.baseline_timeout_ms);
        match tokio::time::timeout(wait, metrics.recv()).await {
            Ok(Ok(metric)) => {
                let baseline = metric.total_load() / 2.0;
                self.inner
                    .state
                    .update(|s| s.load_baseline_kg = Some(baseline));
                debug!("Load baseline: {:.2}kg per cable", baseline);
            }
            _ => debug!("No sample within {:?}; baseline left unset", wait),
        }
    }

    /// Count down to `Active`; the first value is shown before this returns.
    fn start_countdown(&self, seconds: u32) {
        if !self.countdown_tick(seconds, None) {
            return;
        }
        let weak = self.downgrade();
        self.inner
            .timers
            .start(TimerKind::Countdown, move |token| async move {
                for remaining in (1..seconds).rev() {
                    tokio::time::sleep(TICK).await;
                    let Some(this) = Self::upgrade(&weak) else { return };
                    if !this.countdown_tick(remaining, Some(&token)) {
                        return;
                    }
                }
                tokio::time::sleep(TICK).await;
                if let Some(this) = Self::upgrade(&weak) {
                    this.go_active(Some(&token));
                }
            });
    }

    fn countdown_tick(&self, remaining: u32, token: Option<&CancellationToken>) -> bool {
        let ticked = self.inner.state.update(|s| {
            if token.is_some_and(|t| t.is_cancelled())
                || !matches!(
                    s.workout_state,
                    WorkoutState::Initializing | WorkoutState::Countdown { .. }
                )
            {
                return false;
            }
            s.workout_state = WorkoutState::Countdown {
                seconds_remaining: remaining,
            };
            s.countdown = Some(remaining);
            true
        });
        if ticked {
            self.inner.events.emit(FeedbackEvent::CountdownTick {
                seconds_remaining: remaining,
            });
        }
        ticked
    }

    /// Move a starting set to `Active`.
    fn go_active(&self, token: Option<&CancellationToken>) -> bool {
        let stall_detection = self.settings().stall_detection_enabled;
        let parameters = self.inner.state.update(|s| {
            if token.is_some_and(|t| t.is_cancelled())
                || !matches!(
                    s.workout_state,
                    WorkoutState::Initializing | WorkoutState::Countdown { .. }
                )
            {
                return None;
            }
            s.workout_state = WorkoutState::Active;
            s.countdown = None;
            s.set_started = Some(Instant::now());
            s.set_started_at = Some(Utc::now());
            self.inner
                .processor
                .begin_set(&s.parameters, stall_detection);
            s.auto_stop = self.inner.processor.auto_stop_ui();
            Some(s.parameters.clone())
        });
        let Some(parameters) = parameters else {
            return false;
        };

        info!("Set active: session={}", self.inner.state.read(|s| s.session_id));
        self.inner.events.emit(FeedbackEvent::SetStarted);
        if let Some(seconds) = parameters.duration_seconds {
            self.start_timed_exercise(seconds);
        }
        true
    }

    fn start_timed_exercise(&self, seconds: u32) {
        self.inner.state.update(|s| s.countdown = Some(seconds));
        let weak = self.downgrade();
        self.inner
            .timers
            .start(TimerKind::TimedExercise, move |token| async move {
                loop {
                    tokio::time::sleep(TICK).await;
                    let Some(this) = Self::upgrade(&weak) else { return };
                    let remaining = this.inner.state.update(|s| {
                        if token.is_cancelled() || s.workout_state != WorkoutState::Active {
                            return None;
                        }
                        let remaining = s.countdown.unwrap_or(0).saturating_sub(1);
                        s.countdown = Some(remaining);
                        Some(remaining)
                    });
                    match remaining {
                        None => return,
                        Some(0) => {
                            info!("Timed set finished");
                            // the stop cancels this timer, so it runs on its own task
                            tokio::spawn(async move {
                                if let Err(e) = this.stop_workout(false).await {
                                    error!("Completing timed set failed: {}", e);
                                }
                            });
                            return;
                        }
                        Some(_) => {}
                    }
                }
            });
    }

    fn start_auto_start_countdown(&self) {
        let seconds = self.settings().auto_start_countdown_seconds.max(1);
        info!("Handles grabbed: auto-start in {}s", seconds);
        let weak = self.downgrade();
        self.inner
            .timers
            .start(TimerKind::AutoStart, move |token| async move {
                for remaining in (1..=seconds).rev() {
                    let Some(this) = Self::upgrade(&weak) else { return };
                    let ticked = this.inner.state.update(|s| {
                        if token.is_cancelled() || s.workout_state != WorkoutState::Idle {
                            return false;
                        }
                        s.countdown = Some(remaining);
                        true
                    });
                    if !ticked {
                        return;
                    }
                    this.inner.events.emit(FeedbackEvent::CountdownTick {
                        seconds_remaining: remaining,
                    });
                    drop(this);
                    tokio::time::sleep(TICK).await;
                }

                let Some(this) = Self::upgrade(&weak) else { return };
                let is_just_lift = this.inner.state.update(|s| {
                    if token.is_cancelled() || s.workout_state != WorkoutState::Idle {
                        return None;
                    }
                    s.countdown = None;
                    Some(s.parameters.is_just_lift)
                });
                if let Some(is_just_lift) = is_just_lift {
                    tokio::spawn(async move {
                        if let Err(e) = this.start_workout(true, is_just_lift).await {
                            warn!("Auto-start failed: {}", e);
                        }
                    });
                }
            });
    }

    /// Stop the current set.
    ///
    /// With `exiting_workout` the session returns to `Idle` and the routine
    /// is unloaded; otherwise the set lands in `SetSummary` and is saved. A
    /// second call while a stop is running does nothing, so a set is written
    /// at most once. A failed save is returned and the record is kept for
    /// `retry_save`. Exiting from a summary whose set is not stored fails
    /// with `UnsavedSet` until it is saved or discarded.
    pub async fn stop_workout(&self, exiting_workout: bool) -> Result<()> {
        let now = Instant::now();
        let plan = self.inner.state.update(|s| -> Result<Option<StopPlan>> {
            if s.guards.stop_in_progress {
                debug!("Stop ignored: a stop is already in progress");
                return Ok(None);
            }
            let in_set = s.workout_state.is_in_set();
            if !in_set && !exiting_workout {
                debug!("Stop ignored: no set in progress ({})", s.workout_state);
                return Ok(None);
            }
            if let Some(pending) = s.pending.as_ref().filter(|p| !in_set && p.is_unsaved()) {
                return Err(Error::UnsavedSet(pending.record.id));
            }
            s.guards.stop_in_progress = true;

            let went_active = matches!(
                s.workout_state,
                WorkoutState::Active | WorkoutState::Paused
            );
            let record = (went_active && (!exiting_workout || !s.rep_count.is_zero()))
                .then(|| Self::build_record(s, now));
            let send_stop = in_set && s.uses_cables;

            if exiting_workout {
                let completion_log = s
                    .completion_log
                    .take()
                    .filter(|log| !log.sets.is_empty())
                    .map(|mut log| {
                        log.completed_at = Utc::now();
                        log
                    });
                s.workout_state = WorkoutState::Idle;
                s.clear_set_progress();
                s.pending = record.clone().map(PendingRecord::saving);
                s.navigator = None;
                s.flow = RoutineFlowState::NotInRoutine;
                s.parameters.is_just_lift = false;
                s.parameters.use_auto_start = false;
                return Ok(Some(StopPlan {
                    record,
                    send_stop,
                    completion_log,
                }));
            }

            match &record {
                Some(record) => {
                    s.workout_state = WorkoutState::SetSummary(record.summary.clone());
                    s.pending = Some(PendingRecord::saving(record.clone()));
                }
                None => {
                    // stopped before going active: nothing to summarize
                    s.workout_state = WorkoutState::Idle;
                    s.clear_set_progress();
                    if let Some(nav) = &s.navigator {
                        s.flow = nav.set_ready(nav.current());
                    }
                }
            }
            s.countdown = None;
            s.auto_stop = Default::default();
            Ok(Some(StopPlan {
                record,
                send_stop,
                completion_log: None,
            }))
        });

        let plan = match plan {
            Ok(Some(plan)) => plan,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Stop refused: {}", e);
                return Err(e);
            }
        };
        self.inner.timers.cancel_many(&ALL_TIMERS);
        self.inner.processor.end_set();
        info!(
            "Set stopped: exiting={}, reps={}",
            exiting_workout,
            plan.record
                .as_ref()
                .map(|r| r.summary.rep_count.total())
                .unwrap_or(0)
        );

        if plan.send_stop {
            self.send_best_effort(DeviceCommand::Stop).await;
        }

        let result = match &plan.record {
            Some(record) => {
                if !exiting_workout {
                    self.inner.events.emit(FeedbackEvent::SetComplete {
                        summary: record.summary.clone(),
                    });
                }
                self.save_record(record).await.map(|_| ())
            }
            None => Ok(()),
        };
        if let Some(log) = plan.completion_log {
            self.inner.pipeline.persist_completion_log(&log).await;
        }
        self.inner
            .state
            .update(|s| s.guards.stop_in_progress = false);

        if result.is_ok() && !exiting_workout && plan.record.is_some() {
            if let Some(seconds) = self.settings().summary_autoplay_seconds {
                self.start_summary_autoplay(seconds);
            }
        }
        result
    }

    fn build_record(s: &SessionInner, now: Instant) -> WorkoutSessionRecord {
        let duration_ms = s.active_duration(now).as_millis() as u64;
        let summary =
            SummaryCalculator::compute(s.metrics.samples(), s.rep_count, &s.parameters, duration_ms);
        WorkoutSessionRecord {
            id: s.session_id,
            routine_id: s.routine_id(),
            started_at: s.set_started_at.unwrap_or_else(Utc::now),
            completed_at: Utc::now(),
            parameters: s.parameters.clone(),
            summary,
            metrics: s.metrics.snapshot(),
        }
    }

    /// Persist a record and mark the pending summary saved.
    async fn save_record(&self, record: &WorkoutSessionRecord) -> Result<SaveOutcome> {
        match self.inner.pipeline.persist(record).await {
            Ok(outcome) => {
                let late_rpe = self.inner.state.update(|s| {
                    let pending = s.pending.as_mut().filter(|p| p.record.id == record.id)?;
                    pending.saving = false;
                    pending.saved = true;
                    pending.is_personal_record = outcome.is_personal_record;
                    pending
                        .record
                        .summary
                        .rpe
                        .filter(|rpe| record.summary.rpe != Some(*rpe))
                });
                // RPE logged while the save was in flight
                if let Some(rpe) = late_rpe {
                    self.inner.pipeline.update_rpe(record.id, rpe).await?;
                }
                Ok(outcome)
            }
            Err(e) => {
                self.inner.state.update(|s| {
                    let pending = s.pending.as_mut().filter(|p| p.record.id == record.id);
                    if let Some(pending) = pending {
                        pending.saving = false;
                    }
                });
                error!("Session save failed: {}", e);
                self.inner.events.emit(FeedbackEvent::SaveFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Save the pending set again after a failure.
    ///
    /// Only one save of a record runs at a time: a call while the first save
    /// (or another retry) is still in flight returns `SaveInProgress`.
    pub async fn retry_save(&self) -> Result<SaveOutcome> {
        let record = self.inner.state.update(|s| -> Result<WorkoutSessionRecord> {
            let pending = s
                .pending
                .as_mut()
                .filter(|p| p.is_unsaved())
                .ok_or(Error::NothingToSave)?;
            if pending.saving {
                return Err(Error::SaveInProgress(pending.record.id));
            }
            pending.saving = true;
            Ok(pending.record.clone())
        })?;
        info!("Retrying save of session {}", record.id);
        self.save_record(&record).await
    }

    /// Drop a finished set that storage never accepted.
    ///
    /// Returns the discarded session. Fails with `NothingToSave` when every
    /// finished set is stored and with `SaveInProgress` while a save runs.
    pub fn discard_unsaved_set(&self) -> Result<SessionId> {
        let session_id = self.inner.state.update(|s| -> Result<SessionId> {
            let pending = s
                .pending
                .as_ref()
                .filter(|p| p.is_unsaved())
                .ok_or(Error::NothingToSave)?;
            if pending.saving {
                return Err(Error::SaveInProgress(pending.record.id));
            }
            let session_id = pending.record.id;
            s.pending = None;
            Ok(session_id)
        })?;
        warn!("Discarded unsaved session {}", session_id);
        Ok(session_id)
    }

    fn start_summary_autoplay(&self, seconds: u32) {
        let weak = self.downgrade();
        self.inner
            .timers
            .start(TimerKind::SummaryAutoplay, move |token| async move {
                tokio::time::sleep(Duration::from_secs(seconds as u64)).await;
                let Some(this) = Self::upgrade(&weak) else { return };
                if token.is_cancelled() {
                    return;
                }
                tokio::spawn(async move {
                    if let Err(e) = this.proceed_from_summary().await {
                        debug!("Summary autoplay skipped: {}", e);
                    }
                });
            });
    }

    /// Throw the current set away and go back to its staging state.
    ///
    /// Parameters and the load baseline are kept. An unsaved summary is
    /// discarded with it.
    pub async fn stop_and_return_to_set_ready(&self) -> Result<()> {
        let send_stop = self.inner.state.update(|s| {
            if s.guards.stop_in_progress {
                debug!("Return to set ready ignored: a stop is in progress");
                return None;
            }
            let send_stop = s.workout_state.is_in_set() && s.uses_cables;
            s.workout_state = WorkoutState::Idle;
            s.clear_set_progress();
            s.guards.clear_set_guards();
            s.pending = None;
            if let Some(nav) = &s.navigator {
                let staged = nav.set_ready(nav.current());
                s.flow = RoutineNavigator::adjust(
                    &staged,
                    SetReadyAdjustment {
                        weight_per_cable_kg: Some(s.parameters.weight_per_cable_kg),
                        reps: s.parameters.has_rep_target().then_some(s.parameters.reps),
                        echo_level: Some(s.parameters.echo_level),
                        eccentric_load_percent: Some(s.parameters.eccentric_load_percent),
                    },
                );
            }
            Some(send_stop)
        });
        let Some(send_stop) = send_stop else {
            return Ok(());
        };
        self.inner.timers.cancel_many(&ALL_TIMERS);
        self.inner.processor.reset();
        info!("Set discarded, back to set ready");
        if send_stop {
            self.send_best_effort(DeviceCommand::Stop).await;
        }
        Ok(())
    }

    /// Pause an active set. Returns whether the state changed.
    pub fn pause_workout(&self) -> bool {
        let paused = self.inner.state.update(|s| {
            if s.workout_state != WorkoutState::Active {
                return false;
            }
            s.workout_state = WorkoutState::Paused;
            s.paused_at = Some(Instant::now());
            self.inner.processor.end_set();
            s.auto_stop = Default::default();
            true
        });
        if paused {
            self.inner.timers.cancel(TimerKind::TimedExercise);
            info!("Set paused");
        } else {
            debug!("Pause ignored outside an active set");
        }
        paused
    }

    /// Resume a paused set. Returns whether the state changed.
    pub fn resume_workout(&self) -> bool {
        let stall_detection = self.settings().stall_detection_enabled;
        let now = Instant::now();
        let resumed = self.inner.state.update(|s| {
            if s.workout_state != WorkoutState::Paused {
                return None;
            }
            s.workout_state = WorkoutState::Active;
            if let Some(paused_at) = s.paused_at.take() {
                s.paused_total += now.saturating_duration_since(paused_at);
            }
            self.inner
                .processor
                .resume_set(&s.parameters, stall_detection);
            s.auto_stop = self.inner.processor.auto_stop_ui();
            Some(s.parameters.is_timed().then_some(s.countdown).flatten())
        });
        match resumed {
            Some(timed_remaining) => {
                if let Some(seconds) = timed_remaining {
                    self.start_timed_exercise(seconds);
                }
                info!("Set resumed");
                true
            }
            None => {
                debug!("Resume ignored outside a paused set");
                false
            }
        }
    }

    /// Return to `Idle` with a clean set, keeping parameters and baseline.
    ///
    /// An unsaved set is discarded.
    pub fn reset_for_new_workout(&self) {
        self.inner.timers.reset(&self.inner.cancel);
        self.inner.processor.reset();
        self.inner.state.update(|s| {
            s.workout_state = WorkoutState::Idle;
            s.clear_set_progress();
            s.guards.clear_set_guards();
            s.pending = None;
            s.session_id = SessionId::new();
            if s.flow == RoutineFlowState::InProgress {
                if let Some(nav) = &s.navigator {
                    s.flow = nav.set_ready(nav.current());
                }
            }
        });
        info!("Session reset for a new workout");
    }

    /// Log the perceived exertion (1-10) of the set in the summary.
    ///
    /// Returns `false` when no summary is showing. A set that was already
    /// saved is updated in storage.
    pub async fn log_rpe_for_current_set(&self, rpe: u8) -> Result<bool> {
        if !(1..=10).contains(&rpe) {
            return Err(Error::InvalidInput(format!(
                "RPE must be within 1-10, got {}",
                rpe
            )));
        }
        let saved_id = self.inner.state.update(|s| {
            let WorkoutState::SetSummary(summary) = &mut s.workout_state else {
                return None;
            };
            summary.rpe = Some(rpe);
            match s.pending.as_mut() {
                Some(pending) => {
                    pending.record.summary.rpe = Some(rpe);
                    Some(pending.saved.then_some(pending.record.id))
                }
                None => Some(None),
            }
        });

        match saved_id {
            None => {
                debug!("RPE ignored: no set summary");
                Ok(false)
            }
            Some(None) => Ok(true),
            Some(Some(session_id)) => {
                self.inner.pipeline.update_rpe(session_id, rpe).await?;
                Ok(true)
            }
        }
    }

    /// Leave the set summary.
    ///
    /// Refused with `UnsavedSet` while the set is not stored; only stored
    /// sets enter the completion log.
    /// Just Lift returns to `Idle`. In a routine the next set is staged,
    /// after a rest when one applies, or the routine completes. A set outside
    /// a routine completes the workout.
    pub async fn proceed_from_summary(&self) -> Result<()> {
        self.inner.timers.cancel(TimerKind::SummaryAutoplay);
        let next = self.inner.state.update(|s| -> Result<AfterSummary> {
            if !matches!(s.workout_state, WorkoutState::SetSummary(_)) {
                return Err(Error::InvalidTransition(format!(
                    "cannot proceed from {}",
                    s.workout_state
                )));
            }
            if let Some(pending) = s.pending.as_ref().filter(|p| p.is_unsaved()) {
                return Err(Error::UnsavedSet(pending.record.id));
            }
            let pending = s.pending.take();
            s.clear_set_progress();
            s.guards.clear_set_guards();

            if s.parameters.is_just_lift {
                s.workout_state = WorkoutState::Idle;
                return Ok(AfterSummary::Idle);
            }

            let Some(nav) = s.navigator.as_mut() else {
                s.workout_state = WorkoutState::Completed;
                return Ok(AfterSummary::Completed(None));
            };

            let saved = pending.filter(|p| p.saved);
            if let (Some(pending), Some(log)) = (saved, s.completion_log.as_mut()) {
                let set_number = nav.current().set_index as u32 + 1;
                log.sets
                    .push(pending.record.to_set_log(set_number, pending.is_personal_record));
            }
            nav.mark_current_completed();

            match nav.advance() {
                Some(transition) if transition.rest_seconds > 0 => {
                    s.workout_state = WorkoutState::Resting(RestInfo {
                        seconds_remaining: transition.rest_seconds,
                        next_exercise_name: nav.exercise_name(transition.step).map(str::to_string),
                        next_set_number: transition.step.set_index as u32 + 1,
                        is_superset_rest: transition.is_superset_rest,
                    });
                    s.flow = nav.set_ready(transition.step);
                    Ok(AfterSummary::Rest(transition.rest_seconds))
                }
                Some(transition) => {
                    s.workout_state = WorkoutState::Idle;
                    s.flow = nav.set_ready(transition.step);
                    Ok(AfterSummary::Idle)
                }
                None => {
                    s.workout_state = WorkoutState::Completed;
                    s.flow = RoutineFlowState::Overview;
                    let log = s
                        .completion_log
                        .take()
                        .filter(|log| !log.sets.is_empty())
                        .map(|mut log| {
                            log.completed_at = Utc::now();
                            log
                        });
                    Ok(AfterSummary::Completed(log))
                }
            }
        })?;

        match next {
            AfterSummary::Idle => info!("Summary closed, ready for the next set"),
            AfterSummary::Rest(seconds) => {
                info!("Resting {}s", seconds);
                self.inner.events.emit(FeedbackEvent::RestStarted { seconds });
                self.start_rest_timer();
            }
            AfterSummary::Completed(log) => {
                info!("Workout complete");
                self.inner.events.emit(FeedbackEvent::WorkoutComplete);
                if let Some(log) = log {
                    self.inner.pipeline.persist_completion_log(&log).await;
                }
            }
        }
        Ok(())
    }

    fn start_rest_timer(&self) {
        let weak = self.downgrade();
        self.inner
            .timers
            .start(TimerKind::Rest, move |token| async move {
                loop {
                    tokio::time::sleep(TICK).await;
                    let Some(this) = Self::upgrade(&weak) else { return };
                    let finished = this.inner.state.update(|s| {
                        if token.is_cancelled() {
                            return None;
                        }
                        let WorkoutState::Resting(info) = &mut s.workout_state else {
                            return None;
                        };
                        info.seconds_remaining = info.seconds_remaining.saturating_sub(1);
                        let finished = info.seconds_remaining == 0;
                        if finished {
                            s.workout_state = WorkoutState::Idle;
                        }
                        Some(finished)
                    });
                    match finished {
                        None => return,
                        Some(true) => {
                            info!("Rest complete");
                            this.inner.events.emit(FeedbackEvent::RestComplete);
                            return;
                        }
                        Some(false) => {}
                    }
                }
            });
    }

    /// End the rest early. Returns whether a rest was running.
    pub fn skip_rest(&self) -> bool {
        let skipped = self.inner.state.update(|s| {
            if !matches!(s.workout_state, WorkoutState::Resting(_)) {
                return false;
            }
            s.workout_state = WorkoutState::Idle;
            true
        });
        if skipped {
            self.inner.timers.cancel(TimerKind::Rest);
            info!("Rest skipped");
            self.inner.events.emit(FeedbackEvent::RestComplete);
        }
        skipped
    }

    /// Lengthen the running rest. Returns whether a rest was running.
    pub fn add_rest_time(&self, seconds: u32) -> bool {
        self.inner.state.update(|s| match &mut s.workout_state {
            WorkoutState::Resting(info) => {
                info.seconds_remaining = info.seconds_remaining.saturating_add(seconds);
                debug!("Rest extended by {}s", seconds);
                true
            }
            _ => false,
        })
    }

    /// Replace the parameters of the next set.
    pub fn update_parameters(&self, parameters: WorkoutParameters) -> Result<()> {
        parameters.validate()?;
        self.inner.state.update(|s| {
            if s.workout_state.is_in_set() {
                return Err(Error::InvalidTransition(format!(
                    "cannot change parameters while {}",
                    s.workout_state
                )));
            }
            s.parameters = parameters;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Just Lift and handle detection
    // ------------------------------------------------------------------

    /// Switch to free-form lifting from any state.
    ///
    /// Any running or unsaved set is dropped, the routine is unloaded, and
    /// the selected exercise is cleared; the weight is kept. Handles are then
    /// armed for auto-start.
    pub async fn prepare_for_just_lift(&self) -> Result<()> {
        self.inner.timers.reset(&self.inner.cancel);
        self.inner.processor.reset();
        let send_stop = self.inner.state.update(|s| {
            let send_stop = s.workout_state.is_in_set() && s.uses_cables;
            s.workout_state = WorkoutState::Idle;
            s.clear_set_progress();
            s.guards.clear_set_guards();
            s.pending = None;
            s.navigator = None;
            s.completion_log = None;
            s.flow = RoutineFlowState::NotInRoutine;
            s.uses_cables = true;
            s.parameters.is_just_lift = true;
            s.parameters.use_auto_start = true;
            s.parameters.is_amrap = false;
            s.parameters.duration_seconds = None;
            s.parameters.exercise_id = None;
            s.parameters.exercise_name = None;
            send_stop
        });
        info!("Prepared for Just Lift");
        if send_stop {
            self.send_best_effort(DeviceCommand::Stop).await;
        }
        if let Err(e) = self.enable_handle_detection().await {
            warn!("Handle detection unavailable: {}", e);
            self.inner.events.emit(FeedbackEvent::DeviceError {
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// Ask the device to report handle grabs.
    ///
    /// Repeated calls inside the debounce window collapse into one device
    /// command. Returns whether a command was sent.
    pub async fn enable_handle_detection(&self) -> Result<bool> {
        let debounce = Duration::from_millis(self.inner.config.device.handle_detection_debounce_ms);
        let now = Instant::now();
        let claimed = self.inner.state.update(|s| {
            if s.guards
                .handle_detection_deadline
                .is_some_and(|deadline| now < deadline)
            {
                return false;
            }
            s.guards.handle_detection_deadline = Some(now + debounce);
            true
        });
        if !claimed {
            debug!("Handle detection enable debounced");
            return Ok(false);
        }

        if let Err(e) = self.send(DeviceCommand::EnableHandleDetection).await {
            self.inner
                .state
                .update(|s| s.guards.handle_detection_deadline = None);
            return Err(e);
        }
        debug!("Handle detection enabled");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Routines
    // ------------------------------------------------------------------

    /// Load a routine and show its overview.
    pub fn load_routine(&self, routine: Routine) -> Result<()> {
        routine.validate()?;
        let name = routine.name.clone();
        self.inner.state.update(|s| {
            if s.workout_state.is_in_set() {
                return Err(Error::InvalidTransition(format!(
                    "cannot load a routine while {}",
                    s.workout_state
                )));
            }
            if let Some(pending) = s.pending.as_ref().filter(|p| p.is_unsaved()) {
                return Err(Error::UnsavedSet(pending.record.id));
            }
            s.completion_log = Some(WorkoutCompletionLog {
                routine_id: Some(routine.id.clone()),
                started_at: Utc::now(),
                completed_at: Utc::now(),
                sets: Vec::new(),
                notes: None,
            });
            s.navigator = Some(RoutineNavigator::new(routine));
            s.flow = RoutineFlowState::Overview;
            s.workout_state = WorkoutState::Idle;
            s.clear_set_progress();
            s.pending = None;
            s.parameters.is_just_lift = false;
            s.parameters.use_auto_start = false;
            Ok(())
        })?;
        self.inner.timers.cancel_many(&ALL_TIMERS);
        info!("Routine loaded: {}", name);
        Ok(())
    }

    /// Load a stored routine by id.
    ///
    /// Returns the loaded routine; an unknown id is `InvalidInput`.
    pub async fn load_routine_from(
        &self,
        routines: &dyn RoutineRepository,
        routine_id: &str,
    ) -> Result<Routine> {
        let routine = routines
            .find_routine(routine_id)
            .await?
            .ok_or_else(|| Error::InvalidInput(format!("unknown routine '{}'", routine_id)))?;
        self.load_routine(routine.clone())?;
        Ok(routine)
    }

    fn with_navigator<R>(
        &self,
        f: impl FnOnce(&mut RoutineNavigator, &mut RoutineFlowState) -> R,
    ) -> Option<R> {
        self.inner.state.update(|s| {
            let nav = s.navigator.as_mut()?;
            Some(f(nav, &mut s.flow))
        })
    }

    /// Stage the current step for its next set.
    pub fn enter_set_ready(&self) -> Result<RoutineFlowState> {
        self.inner.state.update(|s| {
            if s.workout_state.is_in_set() {
                return Err(Error::InvalidTransition(format!(
                    "cannot stage a set while {}",
                    s.workout_state
                )));
            }
            let nav = s.navigator.as_ref().ok_or(Error::NoRoutineLoaded)?;
            s.flow = nav.set_ready(nav.current());
            Ok(s.flow.clone())
        })
    }

    /// Adjust the staged set.
    pub fn update_set_ready(&self, adjustment: SetReadyAdjustment) -> Result<RoutineFlowState> {
        self.inner.state.update(|s| {
            if s.navigator.is_none() {
                return Err(Error::NoRoutineLoaded);
            }
            if !matches!(s.flow, RoutineFlowState::SetReady { .. }) {
                return Err(Error::InvalidTransition(
                    "no set is staged".to_string(),
                ));
            }
            s.flow = RoutineNavigator::adjust(&s.flow, adjustment);
            Ok(s.flow.clone())
        })
    }

    /// Leave the staging state for the overview. Returns whether it changed.
    pub fn exit_set_ready(&self) -> bool {
        self.with_navigator(|_, flow| {
            if matches!(flow, RoutineFlowState::SetReady { .. }) {
                *flow = RoutineFlowState::Overview;
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }

    /// Whether the navigator may move right now.
    fn can_navigate(&self) -> bool {
        self.inner
            .state
            .read(|s| !s.workout_state.is_in_set() && s.navigator.is_some())
    }

    /// Move to the next step (superset-aware).
    pub fn next_step(&self) -> bool {
        self.can_navigate()
            && self
                .with_navigator(|nav, flow| {
                    let moved = nav.next_step();
                    if moved && matches!(flow, RoutineFlowState::SetReady { .. }) {
                        *flow = nav.set_ready(nav.current());
                    }
                    moved
                })
                .unwrap_or(false)
    }

    /// Move to the previous step (superset-aware).
    pub fn previous_step(&self) -> bool {
        self.can_navigate()
            && self
                .with_navigator(|nav, flow| {
                    let moved = nav.previous_step();
                    if moved && matches!(flow, RoutineFlowState::SetReady { .. }) {
                        *flow = nav.set_ready(nav.current());
                    }
                    moved
                })
                .unwrap_or(false)
    }

    /// Skip the rest of the current exercise and stage the next one.
    pub fn skip_exercise(&self) -> bool {
        if !self.can_navigate() {
            return false;
        }
        let skipped = self.inner.state.update(|s| {
            let Some(nav) = s.navigator.as_mut() else {
                return false;
            };
            let Some(transition) = nav.skip_exercise() else {
                return false;
            };
            s.flow = nav.set_ready(transition.step);
            if matches!(s.workout_state, WorkoutState::Resting(_)) {
                s.workout_state = WorkoutState::Idle;
            }
            true
        });
        if skipped {
            self.inner.timers.cancel(TimerKind::Rest);
            info!("Exercise skipped");
        }
        skipped
    }

    /// Jump to an exercise and stage its first open set.
    pub fn jump_to_exercise(&self, exercise_index: usize) -> bool {
        if !self.can_navigate() {
            return false;
        }
        let jumped = self.inner.state.update(|s| {
            let Some(nav) = s.navigator.as_mut() else {
                return false;
            };
            if !nav.jump_to_exercise(exercise_index) {
                return false;
            }
            s.flow = nav.set_ready(nav.current());
            if matches!(s.workout_state, WorkoutState::Resting(_)) {
                s.workout_state = WorkoutState::Idle;
            }
            true
        });
        if jumped {
            self.inner.timers.cancel(TimerKind::Rest);
        }
        jumped
    }

    /// First open step of the loaded routine.
    pub fn resume_point(&self) -> Option<RoutineStep> {
        self.inner
            .state
            .read(|s| s.navigator.as_ref().and_then(|n| n.resume_point()))
    }

    /// Move to the first open step and stage it.
    pub fn resume_routine(&self) -> bool {
        self.can_navigate()
            && self
                .with_navigator(|nav, flow| {
                    let resumed = nav.resume();
                    if resumed {
                        *flow = nav.set_ready(nav.current());
                    }
                    resumed
                })
                .unwrap_or(false)
    }
}

impl WorkoutActivityProbe for SessionCoordinator {
    fn is_workout_active(&self) -> bool {
        self.inner.state.is_workout_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::InMemoryLibrary;
    use crate::persistence::InMemorySessionRepository;
    use cable_trainer_device::SimulatedDevice;

    async fn coordinator() -> (SessionCoordinator, Arc<SimulatedDevice>) {
        let device = Arc::new(SimulatedDevice::new("test-trainer"));
        device.connect().await.unwrap();
        let repository = Arc::new(InMemorySessionRepository::new());
        let (_tx, settings) = watch::channel(UserSettings::default());
        let coordinator = SessionCoordinator::new(
            TrainerConfig::default(),
            device.clone(),
            SessionPersistencePipeline::new(repository),
            settings,
        );
        (coordinator, device)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sets_initializing_before_awaiting() {
        let (coordinator, _device) = coordinator().await;
        let future = coordinator.start_workout(true, false);
        tokio::pin!(future);
        // poll once: the baseline wait parks the future
        assert!(poll_once(future.as_mut()).await.is_none());
        assert_eq!(coordinator.state().workout_state(), WorkoutState::Initializing);
        future.await.unwrap();
        assert_eq!(coordinator.state().workout_state(), WorkoutState::Active);
    }

    async fn poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            out = fut => Some(out),
            _ = std::future::ready(()) => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_failure_reverts_to_idle() {
        let (coordinator, device) = coordinator().await;
        device.set_fail_commands(true);
        let mut events = coordinator.subscribe_events();

        let result = coordinator.start_workout(true, false).await;
        assert!(matches!(result, Err(Error::CommandFailed(_))));
        assert_eq!(coordinator.state().workout_state(), WorkoutState::Idle);
        assert!(matches!(
            events.recv().await.unwrap(),
            FeedbackEvent::DeviceError { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_parameters_rejected_in_set() {
        let (coordinator, _device) = coordinator().await;
        coordinator.start_workout(true, false).await.unwrap();
        let result = coordinator.update_parameters(WorkoutParameters::default());
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpe_out_of_range_rejected() {
        let (coordinator, _device) = coordinator().await;
        assert!(matches!(
            coordinator.log_rpe_for_current_set(11).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(!coordinator.log_rpe_for_current_set(5).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_countdown_returns_to_idle() {
        let (coordinator, _device) = coordinator().await;
        coordinator.start_workout(false, false).await.unwrap();
        assert!(matches!(
            coordinator.state().workout_state(),
            WorkoutState::Countdown { .. }
        ));
        coordinator.stop_workout(false).await.unwrap();
        assert_eq!(coordinator.state().workout_state(), WorkoutState::Idle);
        assert!(coordinator.running_timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_blocked_during_set() {
        let (coordinator, _device) = coordinator().await;
        coordinator
            .load_routine(Routine::sample_upper_push())
            .unwrap();
        coordinator.enter_set_ready().unwrap();
        coordinator.start_workout(true, false).await.unwrap();
        assert!(!coordinator.next_step());
        assert!(!coordinator.skip_exercise());
        assert_eq!(coordinator.state().flow(), RoutineFlowState::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_routine_from_library() {
        let (coordinator, _device) = coordinator().await;
        let library = InMemoryLibrary::seeded();

        let routine = coordinator
            .load_routine_from(&library, "pull-push-superset")
            .await
            .unwrap();
        assert_eq!(routine.name, "Pull/Push Superset");
        assert_eq!(coordinator.state().flow(), RoutineFlowState::Overview);
        assert_eq!(
            coordinator.snapshot().routine.map(|r| r.routine_id),
            Some("pull-push-superset".to_string())
        );

        assert!(matches!(
            coordinator.load_routine_from(&library, "leg-day").await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(coordinator.state().flow(), RoutineFlowState::Overview);
    }
}
