//! Rep counting from device phase notifications.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use cable_trainer_core::{RepCount, RepEvent, RepPhase, RepRanges};

use crate::detection::MIN_RANGE_THRESHOLD;

/// Which counter a rep landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepKind {
    /// Warm-up rep
    Warmup,
    /// Working rep
    Working,
    /// Rep past the working target
    Burnout,
}

/// What the counter should aim for in one set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepTarget {
    /// Warm-up reps counted before working reps
    pub warmup_reps: u32,
    /// Working rep target (None = open ended, e.g. Just Lift or AMRAP)
    pub working_reps: Option<u32>,
    /// Count the final working rep at the top instead of the bottom
    pub stop_at_top: bool,
    /// Smallest top-to-bottom travel that counts as a rep
    pub min_range: f32,
}

impl Default for RepTarget {
    fn default() -> Self {
        Self {
            warmup_reps: 0,
            working_reps: None,
            stop_at_top: false,
            min_range: MIN_RANGE_THRESHOLD,
        }
    }
}

/// Result of counting one rep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepUpdate {
    /// Counter the rep was added to
    pub kind: RepKind,
    /// Counts after this rep
    pub count: RepCount,
    /// This rep reached the working target (reported once per set)
    pub target_reached: bool,
}

/// Turns rep-phase notifications into counts.
pub trait RepCounter: Send {
    /// Start a new set with the given target; clears counts and ranges.
    fn configure(&mut self, target: RepTarget);

    /// Process one notification; returns an update when a rep was counted.
    fn process(&mut self, event: &RepEvent) -> Option<RepUpdate>;

    /// Counts so far.
    fn count(&self) -> RepCount;

    /// Range calibration so far.
    fn ranges(&self) -> Option<RepRanges>;

    /// Clear counts and ranges, keeping the target.
    fn reset(&mut self);
}

/// Counts a rep on each top-then-bottom cycle with enough travel.
#[derive(Debug, Default)]
pub struct PhaseRepCounter {
    target: RepTarget,
    count: RepCount,
    ranges: Option<RepRanges>,
    last_top: Option<f32>,
    last_bottom: Option<f32>,
    counted_at_top: bool,
    target_reported: bool,
}

impl PhaseRepCounter {
    /// Create a counter with an open-ended target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter for a target.
    pub fn with_target(target: RepTarget) -> Self {
        let mut counter = Self::new();
        counter.configure(target);
        counter
    }

    fn widen_ranges(&mut self, position: f32) {
        match &mut self.ranges {
            Some(ranges) => ranges.include(position),
            None => self.ranges = Some(RepRanges::from_position(position)),
        }
    }

    fn next_kind(&self) -> RepKind {
        if self.count.warmup_reps < self.target.warmup_reps {
            return RepKind::Warmup;
        }
        match self.target.working_reps {
            Some(target) if self.count.working_reps >= target => RepKind::Burnout,
            _ => RepKind::Working,
        }
    }

    /// Whether the next rep is the last working rep of the target.
    fn next_is_final_working(&self) -> bool {
        match self.target.working_reps {
            Some(target) => {
                self.next_kind() == RepKind::Working && self.count.working_reps + 1 == target
            }
            None => false,
        }
    }

    fn count_rep(&mut self) -> RepUpdate {
        let kind = self.next_kind();
        match kind {
            RepKind::Warmup => self.count.warmup_reps += 1,
            RepKind::Working => self.count.working_reps += 1,
            RepKind::Burnout => self.count.burnout_reps += 1,
        }

        let target_reached = match self.target.working_reps {
            Some(target) if !self.target_reported && self.count.working_reps >= target => {
                self.target_reported = true;
                true
            }
            _ => false,
        };

        debug!(
            "Rep counted: {:?} (warmup={}, working={}, burnout={})",
            kind, self.count.warmup_reps, self.count.working_reps, self.count.burnout_reps
        );

        RepUpdate {
            kind,
            count: self.count,
            target_reached,
        }
    }

    fn has_travel(&self, from: Option<f32>, to: f32) -> bool {
        match from {
            Some(from) => (to - from).abs() >= self.target.min_range,
            // no reference point yet: trust the device
            None => true,
        }
    }
}

impl RepCounter for PhaseRepCounter {
    fn configure(&mut self, target: RepTarget) {
        self.target = target;
        self.reset();
    }

    fn process(&mut self, event: &RepEvent) -> Option<RepUpdate> {
        trace!("Rep event: {:?} at {}", event.phase, event.position);
        self.widen_ranges(event.position);

        match event.phase {
            RepPhase::Concentric => {
                self.last_bottom.get_or_insert(event.position);
                None
            }
            RepPhase::Top => {
                self.last_top = Some(event.position);
                if self.target.stop_at_top
                    && self.next_is_final_working()
                    && self.has_travel(self.last_bottom, event.position)
                {
                    self.counted_at_top = true;
                    return Some(self.count_rep());
                }
                None
            }
            RepPhase::Eccentric => None,
            RepPhase::Bottom => {
                let top = self.last_top.take();
                self.last_bottom = Some(event.position);
                if std::mem::take(&mut self.counted_at_top) {
                    return None;
                }
                let top = top?;
                if (top - event.position).abs() < self.target.min_range {
                    debug!(
                        "Partial rep ignored: travel {:.1} below {:.1}",
                        (top - event.position).abs(),
                        self.target.min_range
                    );
                    return None;
                }
                Some(self.count_rep())
            }
        }
    }

    fn count(&self) -> RepCount {
        self.count
    }

    fn ranges(&self) -> Option<RepRanges> {
        self.ranges
    }

    fn reset(&mut self) {
        self.count = RepCount::default();
        self.ranges = None;
        self.last_top = None;
        self.last_bottom = None;
        self.counted_at_top = false;
        self.target_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(counter: &mut PhaseRepCounter, bottom: f32, top: f32) -> Option<RepUpdate> {
        let mut last = None;
        for (phase, position) in [
            (RepPhase::Concentric, bottom),
            (RepPhase::Top, top),
            (RepPhase::Eccentric, top),
            (RepPhase::Bottom, bottom),
        ] {
            if let Some(update) = counter.process(&RepEvent::new(phase, position, 0)) {
                last = Some(update);
            }
        }
        last
    }

    #[test]
    fn test_warmup_then_working_then_burnout() {
        let mut counter = PhaseRepCounter::with_target(RepTarget {
            warmup_reps: 2,
            working_reps: Some(2),
            ..RepTarget::default()
        });

        let kinds: Vec<RepKind> = (0..5)
            .map(|_| rep(&mut counter, 0.0, 400.0).unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RepKind::Warmup,
                RepKind::Warmup,
                RepKind::Working,
                RepKind::Working,
                RepKind::Burnout
            ]
        );
        assert_eq!(
            counter.count(),
            RepCount {
                warmup_reps: 2,
                working_reps: 2,
                burnout_reps: 1
            }
        );
    }

    #[test]
    fn test_target_reached_reported_once() {
        let mut counter = PhaseRepCounter::with_target(RepTarget {
            working_reps: Some(2),
            ..RepTarget::default()
        });

        assert!(!rep(&mut counter, 0.0, 400.0).unwrap().target_reached);
        assert!(rep(&mut counter, 0.0, 400.0).unwrap().target_reached);
        assert!(!rep(&mut counter, 0.0, 400.0).unwrap().target_reached);
    }

    #[test]
    fn test_partial_rep_ignored() {
        let mut counter = PhaseRepCounter::new();
        assert!(rep(&mut counter, 0.0, 400.0).is_some());
        assert!(rep(&mut counter, 0.0, 30.0).is_none());
        assert_eq!(counter.count().working_reps, 1);
    }

    #[test]
    fn test_stop_at_top_counts_final_rep_at_top() {
        let mut counter = PhaseRepCounter::with_target(RepTarget {
            working_reps: Some(2),
            stop_at_top: true,
            ..RepTarget::default()
        });

        rep(&mut counter, 0.0, 400.0);
        counter.process(&RepEvent::new(RepPhase::Concentric, 0.0, 0));
        let update = counter
            .process(&RepEvent::new(RepPhase::Top, 400.0, 0))
            .unwrap();
        assert!(update.target_reached);
        assert_eq!(update.count.working_reps, 2);

        // the following bottom does not double count
        assert!(counter
            .process(&RepEvent::new(RepPhase::Bottom, 0.0, 0))
            .is_none());
        assert_eq!(counter.count().working_reps, 2);
    }

    #[test]
    fn test_ranges_learned_from_events() {
        let mut counter = PhaseRepCounter::new();
        rep(&mut counter, 20.0, 420.0);
        let ranges = counter.ranges().unwrap();
        assert_eq!(ranges.bottom_position, 20.0);
        assert_eq!(ranges.top_position, 420.0);
        assert!(ranges.is_meaningful(MIN_RANGE_THRESHOLD));
    }

    #[test]
    fn test_configure_resets_counts() {
        let mut counter = PhaseRepCounter::new();
        rep(&mut counter, 0.0, 400.0);
        counter.configure(RepTarget::default());
        assert!(counter.count().is_zero());
        assert!(counter.ranges().is_none());
    }

    #[test]
    fn test_bottom_without_top_is_ignored() {
        let mut counter = PhaseRepCounter::new();
        assert!(counter
            .process(&RepEvent::new(RepPhase::Bottom, 0.0, 0))
            .is_none());
        assert!(counter.count().is_zero());
    }
}
