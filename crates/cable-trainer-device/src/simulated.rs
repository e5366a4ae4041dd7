//! In-process trainer used by the MCP surface and by tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use cable_trainer_core::{
    ConnectionState, Error, HandleState, RepEvent, RepPhase, Result, WorkoutMetric,
};

use crate::link::{DeviceCommand, DeviceLink};

const STREAM_CAPACITY: usize = 1024;

/// A trainer that lives in memory.
///
/// Metrics and rep events are injected by the caller; commands are recorded
/// so tests can assert on exactly what reached the "hardware".
pub struct SimulatedDevice {
    name: String,
    connection: watch::Sender<ConnectionState>,
    metrics: broadcast::Sender<WorkoutMetric>,
    rep_events: broadcast::Sender<RepEvent>,
    handle_state: watch::Sender<HandleState>,
    sent: Mutex<Vec<DeviceCommand>>,
    fail_commands: AtomicBool,
    clock_ms: AtomicU64,
}

impl std::fmt::Debug for SimulatedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedDevice")
            .field("name", &self.name)
            .field("connection", &*self.connection.borrow())
            .finish_non_exhaustive()
    }
}

impl SimulatedDevice {
    /// Create a disconnected simulated device.
    pub fn new(name: impl Into<String>) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let (metrics, _) = broadcast::channel(STREAM_CAPACITY);
        let (rep_events, _) = broadcast::channel(STREAM_CAPACITY);
        let (handle_state, _) = watch::channel(HandleState::Released);
        Self {
            name: name.into(),
            connection,
            metrics,
            rep_events,
            handle_state,
            sent: Mutex::new(Vec::new()),
            fail_commands: AtomicBool::new(false),
            clock_ms: AtomicU64::new(0),
        }
    }

    /// Device name reported once connected.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Advance the device clock and return the new timestamp.
    pub fn advance_clock(&self, ms: u64) -> u64 {
        self.clock_ms.fetch_add(ms, Ordering::SeqCst) + ms
    }

    /// Current device timestamp.
    pub fn now_ms(&self) -> u64 {
        self.clock_ms.load(Ordering::SeqCst)
    }

    /// Push one metric sample to subscribers.
    pub fn emit_metric(&self, metric: WorkoutMetric) {
        // no subscribers is fine: nobody is listening yet
        let _ = self.metrics.send(metric);
    }

    /// Push one rep-phase notification to subscribers.
    pub fn emit_rep_event(&self, event: RepEvent) {
        let _ = self.rep_events.send(event);
    }

    /// Emit a sample with both cables at `position`, moving at `velocity`
    /// under `load`, `step_ms` after the previous one.
    pub fn emit_sample(&self, position: f32, velocity: f32, load: f32, step_ms: u64) {
        let timestamp_ms = self.advance_clock(step_ms);
        self.emit_metric(WorkoutMetric {
            timestamp_ms,
            load_a: load,
            load_b: load,
            position_a: position,
            position_b: position,
            velocity_a: velocity,
            velocity_b: velocity,
        });
    }

    /// Play one full rep from `bottom` to `top` and back under `load`.
    ///
    /// Emits concentric samples, a `Top` event, eccentric samples, then a
    /// `Bottom` event.
    pub fn simulate_rep(&self, bottom: f32, top: f32, load: f32) {
        const STEPS: u32 = 4;
        const STEP_MS: u64 = 100;
        let span = top - bottom;
        let speed = span / (STEPS as f32 * STEP_MS as f32 / 1000.0);

        self.emit_rep_event(RepEvent::new(RepPhase::Concentric, bottom, self.now_ms()));
        for step in 1..=STEPS {
            let position = bottom + span * step as f32 / STEPS as f32;
            self.emit_sample(position, speed, load, STEP_MS);
        }
        self.emit_rep_event(RepEvent::new(RepPhase::Top, top, self.now_ms()));
        for step in 1..=STEPS {
            let position = top - span * step as f32 / STEPS as f32;
            self.emit_sample(position, -speed, load * 1.1, STEP_MS);
        }
        self.emit_rep_event(RepEvent::new(RepPhase::Bottom, bottom, self.now_ms()));
    }

    /// Report a handle grab or release.
    pub fn set_handle_state(&self, state: HandleState) {
        self.handle_state.send_replace(state);
    }

    /// Simulate the link dropping without a disconnect request.
    pub fn drop_connection(&self) {
        warn!("Simulated link lost: {}", self.name);
        self.connection.send_replace(ConnectionState::Disconnected);
    }

    /// Make every subsequent command fail (or succeed again).
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Every command delivered so far.
    pub fn sent_commands(&self) -> Vec<DeviceCommand> {
        self.sent.lock().clone()
    }

    /// Number of delivered commands equal to `command`.
    pub fn count_sent(&self, command: &DeviceCommand) -> usize {
        self.sent.lock().iter().filter(|c| *c == command).count()
    }
}

#[async_trait]
impl DeviceLink for SimulatedDevice {
    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    fn subscribe_metrics(&self) -> broadcast::Receiver<WorkoutMetric> {
        self.metrics.subscribe()
    }

    fn subscribe_rep_events(&self) -> broadcast::Receiver<RepEvent> {
        self.rep_events.subscribe()
    }

    fn subscribe_handle_state(&self) -> watch::Receiver<HandleState> {
        self.handle_state.subscribe()
    }

    async fn connect(&self) -> Result<()> {
        info!("Connecting to simulated device: {}", self.name);
        self.connection.send_replace(ConnectionState::Connecting);
        self.connection.send_replace(ConnectionState::Connected {
            device_name: self.name.clone(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting simulated device: {}", self.name);
        self.connection.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    async fn send_command(&self, command: DeviceCommand) -> Result<()> {
        if !self.connection.borrow().is_connected() {
            return Err(Error::DeviceNotConnected);
        }
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(Error::CommandFailed(format!(
                "{} rejected by simulated device",
                command.name()
            )));
        }
        debug!("Simulated device received command: {}", command.name());
        self.sent.lock().push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_require_connection() {
        let device = SimulatedDevice::new("Vee_Test");
        let result = device.send_command(DeviceCommand::Stop).await;
        assert!(matches!(result, Err(Error::DeviceNotConnected)));

        device.connect().await.unwrap();
        assert!(device.is_connected());
        device.send_command(DeviceCommand::Stop).await.unwrap();
        assert_eq!(device.count_sent(&DeviceCommand::Stop), 1);
    }

    #[tokio::test]
    async fn test_failing_commands() {
        let device = SimulatedDevice::new("Vee_Test");
        device.connect().await.unwrap();
        device.set_fail_commands(true);
        let result = device
            .send_command(DeviceCommand::EnableHandleDetection)
            .await;
        assert!(matches!(result, Err(Error::CommandFailed(_))));
        assert!(device.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn test_simulated_rep_stream_order() {
        let device = SimulatedDevice::new("Vee_Test");
        let mut reps = device.subscribe_rep_events();
        let mut metrics = device.subscribe_metrics();

        device.simulate_rep(0.0, 400.0, 20.0);

        let phases: Vec<RepPhase> = (0..3).map(|_| reps.try_recv().unwrap().phase).collect();
        assert_eq!(
            phases,
            vec![RepPhase::Concentric, RepPhase::Top, RepPhase::Bottom]
        );

        let first = metrics.try_recv().unwrap();
        assert_eq!(first.timestamp_ms, 100);
        assert!(first.velocity_a > 0.0);
    }

    #[tokio::test]
    async fn test_drop_connection() {
        let device = SimulatedDevice::new("Vee_Test");
        device.connect().await.unwrap();
        let rx = device.connection_state();
        device.drop_connection();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
    }
}
