//! Per-`sid` sequence continuity tracking.

use dashmap::DashMap;

/// Outcome of observing one `(sid, seq)` pair against the tracker's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqObservation {
    pub seq_gap: bool,
    pub gap_size: i64,
}

/// Tracks `last_seq` per subscription id. A fresh `sid` (e.g. reissued after
/// reconnect) starts a new sequence from whatever it first reports.
#[derive(Default)]
pub struct SequenceTracker {
    last_seq: DashMap<i64, i64>,
}

impl SequenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observed `seq` for `sid`, returning whether it represents
    /// a gap and by how much. Always advances `last_seq` to the observed
    /// value, even when a gap (or a backward/duplicate seq) is detected.
    pub fn observe(&self, sid: i64, seq: i64) -> SeqObservation {
        match self.last_seq.get(&sid).map(|v| *v) {
            None => {
                self.last_seq.insert(sid, seq);
                SeqObservation {
                    seq_gap: false,
                    gap_size: 0,
                }
            }
            Some(last) if seq == last + 1 => {
                self.last_seq.insert(sid, seq);
                SeqObservation {
                    seq_gap: false,
                    gap_size: 0,
                }
            }
            Some(last) => {
                self.last_seq.insert(sid, seq);
                SeqObservation {
                    seq_gap: true,
                    gap_size: seq - last - 1,
                }
            }
        }
    }

    /// Clears tracking state for `sid`, as happens when a connection
    /// reconnects and the server reissues a fresh `sid`.
    pub fn reset(&self, sid: i64) {
        self.last_seq.remove(&sid);
    }

    #[must_use]
    pub fn last_seq(&self, sid: i64) -> Option<i64> {
        self.last_seq.get(&sid).map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_never_a_gap() {
        let tracker = SequenceTracker::new();
        let obs = tracker.observe(1, 50);
        assert!(!obs.seq_gap);
        assert_eq!(tracker.last_seq(1), Some(50));
    }

    #[test]
    fn consecutive_seq_is_not_a_gap() {
        let tracker = SequenceTracker::new();
        tracker.observe(1, 50);
        let obs = tracker.observe(1, 51);
        assert!(!obs.seq_gap);
    }

    #[test]
    fn skipped_seq_is_a_gap_with_correct_size() {
        let tracker = SequenceTracker::new();
        tracker.observe(1, 50);
        let obs = tracker.observe(1, 55);
        assert!(obs.seq_gap);
        assert_eq!(obs.gap_size, 4);
        assert_eq!(tracker.last_seq(1), Some(55));
    }

    #[test]
    fn counted_gaps_equal_sum_of_positive_deltas() {
        let tracker = SequenceTracker::new();
        let seqs = [1, 2, 5, 6, 10];
        let mut total_gap = 0i64;
        for seq in seqs {
            total_gap += tracker.observe(42, seq).gap_size;
        }
        // gaps: (5-2-1)=2, (10-6-1)=3
        assert_eq!(total_gap, 5);
    }

    #[test]
    fn reset_allows_a_fresh_sequence_for_reissued_sid() {
        let tracker = SequenceTracker::new();
        tracker.observe(1, 100);
        tracker.reset(1);
        let obs = tracker.observe(1, 1);
        assert!(!obs.seq_gap);
    }
}
