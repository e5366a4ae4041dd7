//! Waiting for workout state changes.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use cable_trainer_core::WorkoutState;

/// Workout states to wait for.
#[derive(Debug, Clone)]
pub struct WaitCondition {
    /// State names to wait for (see `WorkoutState::name`)
    pub states: Vec<String>,

    /// Wait for the state to leave the listed states instead of reaching one
    pub gone: bool,

    /// Maximum time to wait
    pub timeout: Duration,
}

impl Default for WaitCondition {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            gone: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl WaitCondition {
    /// Wait for one state.
    pub fn for_state(name: impl Into<String>) -> Self {
        Self {
            states: vec![name.into()],
            ..Self::default()
        }
    }

    /// Wait for any of several states.
    pub fn for_any<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Wait for a state to be left.
    pub fn for_state_gone(name: impl Into<String>) -> Self {
        Self {
            states: vec![name.into()],
            gone: true,
            ..Self::default()
        }
    }

    /// Set timeout duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `state` satisfies the condition.
    pub fn matches(&self, state: &WorkoutState) -> bool {
        let listed = self.states.iter().any(|name| name == state.name());
        listed != self.gone
    }
}

/// Result of a wait operation.
#[derive(Debug, Clone, Serialize)]
pub struct WaitResult {
    /// Whether the condition was met
    pub condition_met: bool,

    /// Time waited in milliseconds
    pub waited_ms: u64,

    /// State when the condition was met (or at timeout)
    pub state: WorkoutState,
}

/// Wait on a workout state stream until `condition` holds or times out.
///
/// A state that already matches returns immediately.
pub async fn wait_for_state(
    mut states: watch::Receiver<WorkoutState>,
    condition: &WaitCondition,
) -> WaitResult {
    let start = Instant::now();
    let matched = match tokio::time::timeout(
        condition.timeout,
        states.wait_for(|state| condition.matches(state)),
    )
    .await
    {
        Ok(Ok(state)) => Some(state.clone()),
        // sender dropped or timed out
        Ok(Err(_)) | Err(_) => None,
    };

    let condition_met = matched.is_some();
    let state = matched.unwrap_or_else(|| states.borrow().clone());
    WaitResult {
        condition_met,
        waited_ms: start.elapsed().as_millis() as u64,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_condition_default() {
        let condition = WaitCondition::default();
        assert_eq!(condition.timeout, Duration::from_secs(30));
        assert!(condition.states.is_empty());
        assert!(!condition.gone);
    }

    #[test]
    fn test_wait_condition_matches() {
        let condition = WaitCondition::for_any(["set_summary", "idle"]);
        assert!(condition.matches(&WorkoutState::Idle));
        assert!(!condition.matches(&WorkoutState::Active));

        let gone = WaitCondition::for_state_gone("active");
        assert!(gone.matches(&WorkoutState::Paused));
        assert!(!gone.matches(&WorkoutState::Active));
    }

    #[test]
    fn test_wait_condition_with_timeout() {
        let condition = WaitCondition::for_state("active").with_timeout(Duration::from_secs(5));
        assert_eq!(condition.timeout, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_already_matching() {
        let (_tx, rx) = watch::channel(WorkoutState::Idle);
        let result = wait_for_state(rx, &WaitCondition::for_state("idle")).await;
        assert!(result.condition_met);
        assert_eq!(result.waited_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sees_later_change() {
        let (tx, rx) = watch::channel(WorkoutState::Idle);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            tx.send_replace(WorkoutState::Active);
            // keep the sender alive past the wait
            tokio::time::sleep(Duration::from_secs(1)).await;
        });
        let result = wait_for_state(rx, &WaitCondition::for_state("active")).await;
        assert!(result.condition_met);
        assert_eq!(result.state, WorkoutState::Active);
        assert_eq!(result.waited_ms, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let (_tx, rx) = watch::channel(WorkoutState::Idle);
        let condition =
            WaitCondition::for_state("completed").with_timeout(Duration::from_millis(500));
        let result = wait_for_state(rx, &condition).await;
        assert!(!result.condition_met);
        assert_eq!(result.state, WorkoutState::Idle);
        assert_eq!(result.waited_ms, 500);
    }
}
