//! Sensor samples and notifications delivered by the device link.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standard gravity, for converting kilogram loads into newtons.
pub const GRAVITY: f32 = 9.806_65;

/// One sample from the machine, covering both cables.
///
/// Positions are in device display units (roughly millimetres of cable
/// travel), velocities in units per second, loads in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutMetric {
    /// Milliseconds since the device link started streaming
    pub timestamp_ms: u64,
    /// Left cable load
    pub load_a: f32,
    /// Right cable load
    pub load_b: f32,
    /// Left cable position
    pub position_a: f32,
    /// Right cable position
    pub position_b: f32,
    /// Left cable velocity (positive = extending)
    pub velocity_a: f32,
    /// Right cable velocity (positive = extending)
    pub velocity_b: f32,
}

impl WorkoutMetric {
    /// Combined load of both cables.
    pub fn total_load(&self) -> f32 {
        self.load_a + self.load_b
    }

    /// The further-extended cable's position.
    pub fn max_position(&self) -> f32 {
        self.position_a.max(self.position_b)
    }

    /// Fastest cable speed, ignoring direction.
    pub fn max_speed(&self) -> f32 {
        self.velocity_a.abs().max(self.velocity_b.abs())
    }

    /// Instantaneous mechanical power in watts, summed over both cables.
    pub fn power_watts(&self) -> f32 {
        let mm_to_m = 0.001;
        (self.load_a * self.velocity_a.abs() + self.load_b * self.velocity_b.abs())
            * GRAVITY
            * mm_to_m
    }
}

/// Phase marker emitted by the device's rep notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepPhase {
    /// Lifting
    Concentric,
    /// Turnaround at full extension
    Top,
    /// Lowering
    Eccentric,
    /// Turnaround back at the start
    Bottom,
}

/// A rep-phase notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepEvent {
    /// Which phase boundary was crossed
    pub phase: RepPhase,
    /// Cable position at the boundary
    pub position: f32,
    /// Device timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl RepEvent {
    /// Create a rep event.
    pub fn new(phase: RepPhase, position: f32, timestamp_ms: u64) -> Self {
        Self {
            phase,
            position,
            timestamp_ms,
        }
    }
}

/// Whether the user is holding the handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Handles resting in the dock
    #[default]
    Released,
    /// Handles picked up
    Grabbed,
}

/// Link status of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No link
    #[default]
    Disconnected,
    /// Looking for a device
    Scanning,
    /// Link being established
    Connecting,
    /// Link up
    Connected {
        /// Advertised device name
        device_name: String,
    },
    /// Link attempt failed
    Failed {
        /// Failure description
        reason: String,
    },
}

impl ConnectionState {
    /// Whether commands can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_helpers() {
        let metric = WorkoutMetric {
            timestamp_ms: 0,
            load_a: 20.0,
            load_b: 22.0,
            position_a: 300.0,
            position_b: 310.0,
            velocity_a: -150.0,
            velocity_b: 120.0,
        };
        assert_eq!(metric.total_load(), 42.0);
        assert_eq!(metric.max_position(), 310.0);
        assert_eq!(metric.max_speed(), 150.0);
        assert!(metric.power_watts() > 0.0);
    }

    #[test]
    fn test_connection_state() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected {
            device_name: "Vee_1234".to_string()
        }
        .is_connected());
    }

    #[test]
    fn test_rep_event_serialization() {
        let event = RepEvent::new(RepPhase::Top, 420.0, 1_500);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"top\""));
    }
}
