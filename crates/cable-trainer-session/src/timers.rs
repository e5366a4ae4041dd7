//! Cancellable session timers.
//!
//! Every timer runs under a child token of the bank's root token, which is
//! itself a child of the session token. Starting a timer cancels any running
//! timer of the same kind, and `reset` cancels the whole subtree, so no timer
//! outlives the state it was started for.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The timers a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Pre-set countdown to `Active`
    Countdown,
    /// Rest between sets
    Rest,
    /// Countdown after the handles are grabbed in auto-start mode
    AutoStart,
    /// Duration of a timed or bodyweight set
    TimedExercise,
    /// Automatic exit from the set summary
    SummaryAutoplay,
}

/// Named, cancel-and-restart timers.
#[derive(Debug)]
pub struct TimerBank {
    root: Mutex<CancellationToken>,
    active: Mutex<HashMap<TimerKind, CancellationToken>>,
}

impl TimerBank {
    /// Create a bank whose timers are children of `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            root: Mutex::new(parent.child_token()),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start a timer, cancelling any running timer of the same kind.
    ///
    /// `task` receives the timer's token. Anything the task changes should be
    /// applied only after checking the token is still live, under the same
    /// lock the cancelling side holds.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&self, kind: TimerKind, task: F) -> CancellationToken
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.lock().child_token();
        if let Some(previous) = self.active.lock().insert(kind, token.clone()) {
            previous.cancel();
        }
        debug!("Timer started: {:?}", kind);

        let future = task(token.clone());
        let guard = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {}
                _ = future => {}
            }
            // mark finished so is_running reflects reality
            guard.cancel();
        });
        token
    }

    /// Cancel one timer; returns whether it was running.
    pub fn cancel(&self, kind: TimerKind) -> bool {
        match self.active.lock().remove(&kind) {
            Some(token) => {
                let was_running = !token.is_cancelled();
                token.cancel();
                if was_running {
                    debug!("Timer cancelled: {:?}", kind);
                }
                was_running
            }
            None => false,
        }
    }

    /// Cancel several timers.
    pub fn cancel_many(&self, kinds: &[TimerKind]) {
        for kind in kinds {
            self.cancel(*kind);
        }
    }

    /// Whether a timer of this kind is running.
    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.active
            .lock()
            .get(&kind)
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Kinds of all running timers, sorted.
    pub fn running(&self) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = self
            .active
            .lock()
            .iter()
            .filter(|(_, token)| !token.is_cancelled())
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort();
        kinds
    }

    /// Cancel the whole timer subtree and start a fresh one under `parent`.
    pub fn reset(&self, parent: &CancellationToken) {
        let mut root = self.root.lock();
        root.cancel();
        *root = parent.child_token();
        self.active.lock().clear();
        debug!("Timer bank reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_to_completion() {
        let bank = TimerBank::new(&CancellationToken::new());
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();

        bank.start(TimerKind::Rest, |_| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bank.is_running(TimerKind::Rest));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!bank.is_running(TimerKind::Rest));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous() {
        let bank = TimerBank::new(&CancellationToken::new());
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let counter = fired.clone();
            bank.start(TimerKind::Countdown, |_| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let bank = TimerBank::new(&CancellationToken::new());
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();

        let token = bank.start(TimerKind::TimedExercise, |_| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bank.cancel(TimerKind::TimedExercise));
        assert!(token.is_cancelled());
        assert!(!bank.cancel(TimerKind::TimedExercise));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_subtree() {
        let session = CancellationToken::new();
        let bank = TimerBank::new(&session);

        let rest = bank.start(TimerKind::Rest, |_| std::future::pending());
        let autoplay = bank.start(TimerKind::SummaryAutoplay, |_| std::future::pending());
        assert_eq!(
            bank.running(),
            vec![TimerKind::Rest, TimerKind::SummaryAutoplay]
        );

        bank.reset(&session);
        assert!(rest.is_cancelled());
        assert!(autoplay.is_cancelled());
        assert!(bank.running().is_empty());

        // new timers work after a reset
        let fresh = bank.start(TimerKind::Rest, |_| std::future::pending());
        assert!(!fresh.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let session = CancellationToken::new();
        let bank = TimerBank::new(&session);
        let token = bank.start(TimerKind::AutoStart, |_| std::future::pending());
        session.cancel();
        assert!(token.is_cancelled());
        assert!(!bank.is_running(TimerKind::AutoStart));
    }
}
