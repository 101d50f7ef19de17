//! `CacheSegment`: one continuous run of bars for a single `(symbol,
//! timeframe)` key. A value type, not a pointer graph — `bars` is a mapping
//! keyed by timestamp plus a lazily rebuilt sorted-key vector used for
//! O(log n) range lookup. The index is discarded on serialization and
//! invalidated on any mutation.

use analysis_core::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSegment {
    pub start: i64,
    pub end: i64,
    pub bars: HashMap<i64, Bar>,
    pub count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    sorted_keys: RefCell<Option<Vec<i64>>>,
}

impl CacheSegment {
    pub fn new(bars: Vec<Bar>) -> Self {
        let mut segment = CacheSegment {
            start: 0,
            end: 0,
            bars: HashMap::new(),
            count: 0,
            created_at: Utc::now(),
            sorted_keys: RefCell::new(None),
        };
        segment.merge(bars);
        segment
    }

    /// Inserts previously-unknown timestamps, updates `start`/`end`, and
    /// invalidates the sorted index. Returns the number of genuinely new bars.
    pub fn merge(&mut self, mut incoming: Vec<Bar>) -> usize {
        incoming.sort_by_key(|b| b.timestamp.timestamp_millis());
        let mut inserted = 0;
        for bar in incoming {
            let ts = bar.timestamp.timestamp_millis();
            if self.bars.insert(ts, bar).is_none() {
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.invalidate_index();
            self.recompute_bounds();
        }
        inserted
    }

    fn recompute_bounds(&mut self) {
        self.count = self.bars.len();
        if let (Some(min), Some(max)) = (self.bars.keys().min(), self.bars.keys().max()) {
            self.start = *min;
            self.end = *max;
        }
    }

    fn invalidate_index(&mut self) {
        *self.sorted_keys.borrow_mut() = None;
    }

    fn sorted_keys(&self) -> Vec<i64> {
        if self.sorted_keys.borrow().is_none() {
            let mut keys: Vec<i64> = self.bars.keys().copied().collect();
            keys.sort_unstable();
            *self.sorted_keys.borrow_mut() = Some(keys);
        }
        self.sorted_keys.borrow().clone().unwrap()
    }

    /// Returns bars with `start <= ts <= end_ts`, ascending by timestamp.
    /// Binary-searched against the (lazily rebuilt) sorted-keys vector.
    pub fn range(&self, end_ts: i64) -> Vec<Bar> {
        let keys = self.sorted_keys();
        let upper = keys.partition_point(|&k| k <= end_ts);
        keys[..upper]
            .iter()
            .filter_map(|k| self.bars.get(k).cloned())
            .collect()
    }

    /// Oldest-bars-first eviction once the segment exceeds `max_entries`.
    /// Advances `start` accordingly. Returns the number of evicted bars.
    pub fn evict_to(&mut self, max_entries: usize) -> usize {
        if self.bars.len() <= max_entries {
            return 0;
        }
        let keys = self.sorted_keys();
        let evict_count = self.bars.len() - max_entries;
        for k in &keys[..evict_count] {
            self.bars.remove(k);
        }
        self.invalidate_index();
        self.recompute_bounds();
        evict_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bar_at(ts: DateTime<Utc>, close: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1.0,
            vwap: None,
        }
    }

    fn bars(base: DateTime<Utc>, n: i64) -> Vec<Bar> {
        (0..n)
            .map(|i| bar_at(base + Duration::hours(i), 100.0 + i as f64))
            .collect()
    }

    #[test]
    fn merge_sets_start_end_count() {
        let base = Utc::now();
        let segment = CacheSegment::new(bars(base, 10));
        assert_eq!(segment.count, 10);
        assert_eq!(segment.start, base.timestamp_millis());
        assert_eq!(
            segment.end,
            (base + Duration::hours(9)).timestamp_millis()
        );
    }

    #[test]
    fn merge_is_idempotent_on_duplicate_timestamps() {
        let base = Utc::now();
        let mut segment = CacheSegment::new(bars(base, 5));
        let inserted = segment.merge(bars(base, 5));
        assert_eq!(inserted, 0);
        assert_eq!(segment.count, 5);
    }

    #[test]
    fn merge_is_commutative_for_disjoint_sets() {
        let base = Utc::now();
        let a = bars(base, 5);
        let b = bars(base + Duration::hours(5), 5);

        let mut ab = CacheSegment::new(a.clone());
        ab.merge(b.clone());

        let mut ba = CacheSegment::new(b);
        ba.merge(a);

        assert_eq!(ab.start, ba.start);
        assert_eq!(ab.end, ba.end);
        assert_eq!(ab.count, ba.count);
    }

    #[test]
    fn range_is_ascending_and_bounded() {
        let base = Utc::now();
        let segment = CacheSegment::new(bars(base, 10));
        let end_ts = (base + Duration::hours(4)).timestamp_millis();
        let got = segment.range(end_ts);
        assert_eq!(got.len(), 5);
        for w in got.windows(2) {
            assert!(w[0].timestamp < w[1].timestamp);
        }
    }

    #[test]
    fn eviction_keeps_newest_and_advances_start() {
        let base = Utc::now();
        let mut segment = CacheSegment::new(bars(base, 10));
        let evicted = segment.evict_to(6);
        assert_eq!(evicted, 4);
        assert_eq!(segment.count, 6);
        assert_eq!(
            segment.start,
            (base + Duration::hours(4)).timestamp_millis()
        );
    }
}
