//! Per-set metric sample buffer.

use cable_trainer_core::WorkoutMetric;

/// Bounded buffer of the samples collected during one set.
///
/// Once full, further samples are counted but not stored, so a forgotten set
/// cannot grow without limit.
#[derive(Debug)]
pub struct MetricsBuffer {
    samples: Vec<WorkoutMetric>,
    capacity: usize,
    dropped: usize,
}

impl MetricsBuffer {
    /// Create a buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Append a sample.
    pub fn push(&mut self, metric: WorkoutMetric) {
        if self.samples.len() >= self.capacity {
            self.dropped += 1;
            return;
        }
        self.samples.push(metric);
    }

    /// Samples collected so far.
    pub fn samples(&self) -> &[WorkoutMetric] {
        &self.samples
    }

    /// Copy of the samples for handing to persistence.
    pub fn snapshot(&self) -> Vec<WorkoutMetric> {
        self.samples.clone()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples discarded because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Device timestamp span covered by the stored samples.
    pub fn span_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        }
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}
