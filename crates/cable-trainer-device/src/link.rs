//! The device link contract consumed by the session layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use cable_trainer_core::{
    ConnectionState, HandleState, RepEvent, Result, WorkoutMetric, WorkoutParameters,
};

/// Outbound command to the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeviceCommand {
    /// Load a program and engage resistance
    StartProgram {
        /// Parameters for the set
        parameters: WorkoutParameters,
    },
    /// Change the load mid-set
    UpdateWeight {
        /// New load per cable
        weight_per_cable_kg: f32,
    },
    /// Release resistance
    Stop,
    /// LED color scheme index
    SetColorScheme {
        /// Scheme index
        scheme: u8,
    },
    /// Start reporting handle grab/release
    EnableHandleDetection,
    /// Stop reporting handle grab/release
    DisableHandleDetection,
}

impl DeviceCommand {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::StartProgram { .. } => "start_program",
            DeviceCommand::UpdateWeight { .. } => "update_weight",
            DeviceCommand::Stop => "stop",
            DeviceCommand::SetColorScheme { .. } => "set_color_scheme",
            DeviceCommand::EnableHandleDetection => "enable_handle_detection",
            DeviceCommand::DisableHandleDetection => "disable_handle_detection",
        }
    }
}

/// Asynchronous link to a cable trainer.
///
/// Streams are multi-consumer: every `subscribe_*` call returns an
/// independent receiver that sees events in arrival order.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Current and future connection states.
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;

    /// Per-sample metrics for both cables.
    fn subscribe_metrics(&self) -> broadcast::Receiver<WorkoutMetric>;

    /// Rep-phase notifications.
    fn subscribe_rep_events(&self) -> broadcast::Receiver<RepEvent>;

    /// Handle grab/release reports (only while handle detection is enabled).
    fn subscribe_handle_state(&self) -> watch::Receiver<HandleState>;

    /// Scan for and connect to the machine.
    async fn connect(&self) -> Result<()>;

    /// Drop the link.
    async fn disconnect(&self) -> Result<()>;

    /// Send a command; fails if the link is down.
    async fn send_command(&self, command: DeviceCommand) -> Result<()>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool {
        let state = self.connection_state();
        let connected = state.borrow().is_connected();
        connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(DeviceCommand::Stop.name(), "stop");
        assert_eq!(
            DeviceCommand::UpdateWeight {
                weight_per_cable_kg: 12.5
            }
            .name(),
            "update_weight"
        );
    }

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_string(&DeviceCommand::SetColorScheme { scheme: 2 }).unwrap();
        assert_eq!(json, r#"{"command":"set_color_scheme","scheme":2}"#);
    }
}
