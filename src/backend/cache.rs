//! Bounded sample cache
//!
//! Four parallel channel buffers, pre-sized to the configured capacity so
//! that appends never reallocate. All four buffers always have the same
//! length.
//!
//! Insertion reports one of three outcomes so the ingestion path can tell
//! "keep going but warn" apart from "stop now":
//!
//! - [`InsertOutcome::Accepted`] - appended
//! - [`InsertOutcome::NearLimit`] - appended, and the cache just reached 80%
//!   of its capacity (fires once until the cache is cleared)
//! - [`InsertOutcome::Full`] - not appended, ingestion must stop

use crate::types::{ChannelWindow, SampleRecord, CHANNEL_COUNT};

/// Fill ratio (numerator / denominator) at which `NearLimit` fires
const NEAR_LIMIT_NUM: usize = 4;
const NEAR_LIMIT_DEN: usize = 5;

/// Result of a single insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Accepted,
    NearLimit,
    Full,
}

/// Append-only, fixed-capacity store for four-channel samples
#[derive(Debug)]
pub struct SampleCache {
    channels: [Vec<f64>; CHANNEL_COUNT],
    capacity: usize,
    warning_armed: bool,
}

impl SampleCache {
    /// Create an empty cache; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: std::array::from_fn(|_| Vec::with_capacity(capacity)),
            capacity,
            warning_armed: true,
        }
    }

    /// Append one record, honouring the capacity limit
    pub fn push(&mut self, record: SampleRecord) -> InsertOutcome {
        if self.len() >= self.capacity {
            self.warning_armed = true;
            return InsertOutcome::Full;
        }

        for (channel, value) in self.channels.iter_mut().zip(record.channels) {
            channel.push(value);
        }

        if self.warning_armed && self.len() * NEAR_LIMIT_DEN >= self.capacity * NEAR_LIMIT_NUM {
            self.warning_armed = false;
            return InsertOutcome::NearLimit;
        }
        InsertOutcome::Accepted
    }

    /// The last `n` samples of every channel, left-padded with zeros to exactly `n`
    pub fn windowed(&self, n: usize) -> ChannelWindow {
        let len = self.len();
        let take = len.min(n);
        let pad = n - take;

        ChannelWindow {
            channels: std::array::from_fn(|i| {
                let mut out = Vec::with_capacity(n);
                out.resize(pad, 0.0);
                out.extend_from_slice(&self.channels[i][len - take..]);
                out
            }),
        }
    }

    /// Read-only view of the full backing store
    pub fn channels(&self) -> [&[f64]; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.channels[i].as_slice())
    }

    /// Iterate stored records in insertion order
    pub fn records(&self) -> impl Iterator<Item = SampleRecord> + '_ {
        (0..self.len()).map(move |i| {
            SampleRecord::from(std::array::from_fn(|c| self.channels[c][i]))
        })
    }

    /// Discard all records and re-arm the near-limit warning
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        self.warning_armed = true;
    }

    /// Drop all records and change the capacity
    pub fn reset_with_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity != self.capacity {
            *self = Self::new(capacity);
        } else {
            self.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(i: usize) -> SampleRecord {
        let v = i as f64;
        SampleRecord::new(v, v + 0.25, -v, v * 2.0)
    }

    fn fill(cache: &mut SampleCache, count: usize) -> Vec<InsertOutcome> {
        (0..count).map(|i| cache.push(record(i))).collect()
    }

    #[test]
    fn test_accepts_below_threshold() {
        let mut cache = SampleCache::new(100);
        let outcomes = fill(&mut cache, 79);
        assert!(outcomes.iter().all(|o| *o == InsertOutcome::Accepted));
        assert_eq!(cache.len(), 79);
    }

    #[test]
    fn test_near_limit_fires_once() {
        let mut cache = SampleCache::new(100);
        let outcomes = fill(&mut cache, 100);
        assert_eq!(outcomes[79], InsertOutcome::NearLimit);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == InsertOutcome::NearLimit)
                .count(),
            1
        );
        assert!(outcomes[80..].iter().all(|o| *o == InsertOutcome::Accepted));
    }

    #[test]
    fn test_full_drops_record() {
        let mut cache = SampleCache::new(10);
        fill(&mut cache, 10);
        assert!(cache.is_full());
        assert_eq!(cache.push(record(99)), InsertOutcome::Full);
        assert_eq!(cache.len(), 10);
        assert_eq!(cache.channels()[0][9], 9.0);
    }

    #[test]
    fn test_clear_rearms_warning() {
        let mut cache = SampleCache::new(10);
        fill(&mut cache, 8);
        cache.clear();
        assert!(cache.is_empty());
        let outcomes = fill(&mut cache, 8);
        assert_eq!(outcomes[7], InsertOutcome::NearLimit);
    }

    #[test]
    fn test_window_is_left_padded() {
        let mut cache = SampleCache::new(1_000);
        fill(&mut cache, 300);
        let window = cache.windowed(500);
        for c in 0..CHANNEL_COUNT {
            let ch = window.channel(c);
            assert_eq!(ch.len(), 500);
            assert!(ch[..200].iter().all(|&v| v == 0.0));
            assert_eq!(&ch[200..], cache.channels()[c]);
        }
    }

    #[test]
    fn test_window_takes_most_recent() {
        let mut cache = SampleCache::new(1_000);
        fill(&mut cache, 800);
        let window = cache.windowed(500);
        assert_eq!(window.len(), 500);
        assert_eq!(window.channel(0)[0], 300.0);
        assert_eq!(window.channel(0)[499], 799.0);
        assert_eq!(window.channel(2)[499], -799.0);
    }

    #[test]
    fn test_window_of_empty_cache_is_zeroed() {
        let cache = SampleCache::new(10);
        assert_eq!(cache.windowed(20), ChannelWindow::zeroed(20));
    }

    #[test]
    fn test_records_iterate_in_order() {
        let mut cache = SampleCache::new(10);
        fill(&mut cache, 3);
        let records: Vec<_> = cache.records().collect();
        assert_eq!(records, vec![record(0), record(1), record(2)]);
    }

    #[test]
    fn test_reset_with_capacity() {
        let mut cache = SampleCache::new(10);
        fill(&mut cache, 5);
        cache.reset_with_capacity(20);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 20);

        cache.reset_with_capacity(0);
        assert_eq!(cache.capacity(), 1);
    }

    proptest! {
        #[test]
        fn prop_channels_stay_aligned(capacity in 1usize..200, count in 0usize..400) {
            let mut cache = SampleCache::new(capacity);
            fill(&mut cache, count);
            let channels = cache.channels();
            prop_assert!(channels.iter().all(|c| c.len() == cache.len()));
            prop_assert_eq!(cache.len(), count.min(capacity));
        }

        #[test]
        fn prop_near_limit_at_most_once(capacity in 1usize..200, count in 0usize..400) {
            let mut cache = SampleCache::new(capacity);
            let outcomes = fill(&mut cache, count);
            let near = outcomes.iter().filter(|o| **o == InsertOutcome::NearLimit).count();
            prop_assert!(near <= 1);
            let full = outcomes.iter().filter(|o| **o == InsertOutcome::Full).count();
            prop_assert_eq!(full, count.saturating_sub(capacity));
        }

        #[test]
        fn prop_window_has_requested_length(count in 0usize..300, n in 1usize..600) {
            let mut cache = SampleCache::new(300);
            fill(&mut cache, count);
            let window = cache.windowed(n);
            prop_assert_eq!(window.len(), n);
            let stored = count.min(n);
            if stored > 0 {
                prop_assert_eq!(window.channel(0)[n - 1], (count - 1) as f64);
            }
        }
    }
}
