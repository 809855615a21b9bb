//! Bounded, insertion-ordered sample store.
//!
//! All reads and writes go through a single mutex. Snapshots copy the
//! matching `Arc<Sample>` handles out while the lock is held and release it
//! before the caller sorts or renders anything.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::sample::Sample;

/// Default number of samples kept in memory.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Capacity-bounded FIFO of samples, safe for concurrent append and read.
#[derive(Debug)]
pub struct RetentionBuffer {
    samples: Mutex<VecDeque<Arc<Sample>>>,
    capacity: usize,
}

impl RetentionBuffer {
    /// Creates an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_MAX_RECORDS))),
            capacity,
        }
    }

    /// Maximum number of samples the buffer retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Appends one sample, evicting the oldest one when full.
    /// Returns true when a sample was evicted.
    pub fn append(&self, sample: Sample) -> bool {
        let mut samples = self.lock();
        Self::push_bounded(&mut samples, self.capacity, Arc::new(sample))
    }

    /// Appends a batch in order under one lock acquisition.
    /// Returns the number of evicted samples.
    pub fn extend<I>(&self, batch: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        // Allocate the Arcs before taking the lock.
        let batch: Vec<Arc<Sample>> = batch.into_iter().map(Arc::new).collect();
        let mut samples = self.lock();
        let mut evicted = 0;
        for sample in batch {
            if Self::push_bounded(&mut samples, self.capacity, sample) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Copies every sample recorded strictly after `since`, oldest first.
    pub fn snapshot(&self, since: DateTime<Utc>) -> Vec<Arc<Sample>> {
        let samples = self.lock();
        samples
            .iter()
            .filter(|sample| sample.timestamp > since)
            .cloned()
            .collect()
    }

    fn push_bounded(
        samples: &mut VecDeque<Arc<Sample>>,
        capacity: usize,
        sample: Arc<Sample>,
    ) -> bool {
        let evicted = if samples.len() >= capacity {
            samples.pop_front().is_some()
        } else {
            false
        };
        samples.push_back(sample);
        evicted
    }

    // Every mutation is a single push or pop, so the deque behind a
    // poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Sample>>> {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RetentionBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(name: &str, cpu: f64, secs: i64) -> Sample {
        Sample::new(name, cpu, 0.0, at(secs))
    }

    fn names(samples: &[Arc<Sample>]) -> Vec<String> {
        samples.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_capacity_never_exceeded_and_keeps_newest() {
        let buffer = RetentionBuffer::new(5);
        for i in 0..23 {
            buffer.append(sample(&format!("p{i}"), i as f64, i));
            assert!(buffer.len() <= 5);
        }
        let all = buffer.snapshot(at(-1));
        assert_eq!(names(&all), vec!["p18", "p19", "p20", "p21", "p22"]);
    }

    #[test]
    fn test_full_buffer_evicts_exactly_the_oldest() {
        let buffer = RetentionBuffer::new(3);
        assert!(!buffer.append(sample("A", 10.0, 1)));
        assert!(!buffer.append(sample("B", 90.0, 2)));
        assert!(!buffer.append(sample("C", 50.0, 3)));
        assert!(buffer.append(sample("D", 20.0, 4)));

        let all = buffer.snapshot(at(0));
        assert_eq!(names(&all), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_zero_capacity_holds_one_sample() {
        let buffer = RetentionBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(sample("first", 1.0, 1));
        buffer.append(sample("second", 2.0, 2));
        assert_eq!(names(&buffer.snapshot(at(0))), vec!["second"]);
    }

    #[test]
    fn test_extend_preserves_order_and_counts_evictions() {
        let buffer = RetentionBuffer::new(4);
        buffer.append(sample("old", 1.0, 0));
        let evicted = buffer.extend((1..=5).map(|i| sample(&format!("n{i}"), 0.0, i)));
        assert_eq!(evicted, 2);
        assert_eq!(names(&buffer.snapshot(at(-1))), vec!["n2", "n3", "n4", "n5"]);
    }

    #[test]
    fn test_snapshot_is_strictly_after_since() {
        let buffer = RetentionBuffer::new(10);
        for i in 1..=5 {
            buffer.append(sample(&format!("t{i}"), 0.0, i));
        }
        assert_eq!(names(&buffer.snapshot(at(3))), vec!["t4", "t5"]);
        assert!(buffer.snapshot(at(5)).is_empty());
        assert_eq!(buffer.snapshot(at(0)).len(), 5);
        assert_eq!(buffer.snapshot(at(3) - Duration::milliseconds(1)).len(), 3);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_appends() {
        let buffer = RetentionBuffer::new(2);
        buffer.append(sample("a", 1.0, 1));
        buffer.append(sample("b", 2.0, 2));
        let snap = buffer.snapshot(at(0));

        buffer.append(sample("c", 3.0, 3));
        buffer.append(sample("d", 4.0, 4));

        assert_eq!(names(&snap), vec!["a", "b"]);
        assert_eq!(names(&buffer.snapshot(at(0))), vec!["c", "d"]);
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let buffer = Arc::new(RetentionBuffer::new(100));
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..2_000 {
                    buffer.append(sample(&format!("w{i}"), i as f64, i));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = buffer.snapshot(at(-1));
                        assert!(snap.len() <= 100);
                        // Snapshots are contiguous runs of the append sequence.
                        for pair in snap.windows(2) {
                            assert_eq!(pair[1].cpu_usage - pair[0].cpu_usage, 1.0);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(buffer.len(), 100);
    }
}
