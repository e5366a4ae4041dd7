//! Connection monitoring.
//!
//! The monitor needs to know whether a workout is running when the link
//! drops, but must not depend on the session layer. The session layer hands
//! it a `WorkoutActivityProbe` instead.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cable_trainer_core::ConnectionState;

use crate::link::DeviceLink;

/// Answers "is a workout running right now".
pub trait WorkoutActivityProbe: Send + Sync {
    /// Whether a set is starting, running, or paused.
    fn is_workout_active(&self) -> bool;
}

/// Link change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAlert {
    /// The link went down
    ConnectionLost {
        /// A set was in progress at the time
        during_workout: bool,
    },
    /// The link came back
    Reconnected {
        /// Advertised device name
        device_name: String,
    },
}

/// Watches the link and publishes `ConnectionAlert`s.
///
/// Alerts are informational: workout state is never modified here, so an
/// in-progress set summary survives a disconnect and can still be saved.
#[derive(Debug)]
pub struct ConnectionMonitor {
    alerts: broadcast::Sender<ConnectionAlert>,
}

impl ConnectionMonitor {
    /// Create a monitor with no running watcher.
    pub fn new() -> Self {
        let (alerts, _) = broadcast::channel(16);
        Self { alerts }
    }

    /// Receive future alerts.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionAlert> {
        self.alerts.subscribe()
    }

    /// Start watching `link` until `cancel` fires or the link is dropped.
    pub fn spawn(
        &self,
        link: Arc<dyn DeviceLink>,
        probe: Arc<dyn WorkoutActivityProbe>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let alerts = self.alerts.clone();
        let mut state_rx = link.connection_state();

        tokio::spawn(async move {
            let mut was_connected = state_rx.borrow_and_update().is_connected();
            debug!("Connection monitor started: connected={}", was_connected);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = state_rx.borrow_and_update().clone();
                        let connected = state.is_connected();

                        if was_connected && !connected {
                            let during_workout = probe.is_workout_active();
                            warn!("Device connection lost: during_workout={}", during_workout);
                            let _ = alerts.send(ConnectionAlert::ConnectionLost { during_workout });
                        } else if !was_connected && connected {
                            if let ConnectionState::Connected { device_name } = state {
                                info!("Device connected: {}", device_name);
                                let _ = alerts.send(ConnectionAlert::Reconnected { device_name });
                            }
                        }
                        was_connected = connected;
                    }
                }
            }

            debug!("Connection monitor stopped");
        })
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}
