//! Feedback events broadcast to the presentation layer.

use serde::Serialize;
use tokio::sync::broadcast;

use cable_trainer_core::{RepCount, SetSummary};
use cable_trainer_detector::{AutoStopReason, RepKind};

const EVENT_CAPACITY: usize = 64;

/// Something the user should hear, see, or feel.
///
/// Events are fire-and-forget: missing a subscriber or lagging behind never
/// affects the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedbackEvent {
    /// A countdown second elapsed
    CountdownTick {
        /// Seconds left
        seconds_remaining: u32,
    },
    /// The set went active
    SetStarted,
    /// A rep was counted
    RepCounted {
        /// Counter the rep landed in
        kind: RepKind,
        /// Counts after the rep
        count: RepCount,
    },
    /// Last warm-up rep done; working reps start
    WarmupComplete,
    /// Working rep target reached
    TargetReached,
    /// Auto-stop started timing a stop signal
    AutoStopPending {
        /// Signal being timed
        reason: AutoStopReason,
    },
    /// Renewed motion cancelled a pending auto-stop
    AutoStopCancelled,
    /// Auto-stop ended the set
    AutoStopTriggered {
        /// Signal that fired
        reason: AutoStopReason,
    },
    /// The set finished with this summary
    SetComplete {
        /// Summary shown to the user
        summary: SetSummary,
    },
    /// Rest between sets started
    RestStarted {
        /// Rest length
        seconds: u32,
    },
    /// Rest between sets finished
    RestComplete,
    /// Every set of the routine is done
    WorkoutComplete,
    /// The gamification collaborator awarded a badge
    BadgeEarned {
        /// Badge name
        name: String,
    },
    /// The set was a personal record
    PersonalRecord {
        /// Exercise the record is for
        exercise_id: String,
        /// Weight per cable lifted
        weight_kg: f32,
    },
    /// Saving the session failed; a retry is possible
    SaveFailed {
        /// Failure description
        reason: String,
    },
    /// A device command failed
    DeviceError {
        /// Failure description
        reason: String,
    },
    /// The device link dropped
    ConnectionLost {
        /// A set was in progress at the time
        during_workout: bool,
    },
    /// The device link came back
    Reconnected {
        /// Advertised device name
        device_name: String,
    },
}

/// Broadcast hub for `FeedbackEvent`s.
#[derive(Debug, Clone)]
pub struct FeedbackEvents {
    sender: broadcast::Sender<FeedbackEvent>,
}

impl FeedbackEvents {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Receive future events.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.sender.subscribe()
    }

    /// Publish an event.
    pub fn emit(&self, event: FeedbackEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for FeedbackEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let events = FeedbackEvents::new();
        events.emit(FeedbackEvent::SetStarted);
    }

    #[test]
    fn test_subscriber_receives_events() {
        let events = FeedbackEvents::new();
        let mut rx = events.subscribe();
        events.emit(FeedbackEvent::RestStarted { seconds: 60 });
        assert_eq!(
            rx.try_recv().unwrap(),
            FeedbackEvent::RestStarted { seconds: 60 }
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&FeedbackEvent::ConnectionLost {
            during_workout: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"connection_lost","during_workout":true}"#);
    }
}
