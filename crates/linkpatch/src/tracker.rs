/// Client-side sequence tracker: compares each arriving sequence against
/// the expected frontier and feeds detected gaps into the missing set.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::missing::MissingSet;
use crate::stats::RelayStats;

/// Wrapping distances below this mean "ahead of the frontier"; at or
/// above it the sequence is treated as late (retransmitted or reordered).
const SEQ_AHEAD_MAX: u32 = 1 << 31;

/// Owned by the receive loop; not shared. The missing set it feeds is the
/// shared structure.
pub struct SequenceTracker {
    last_seq: Option<u32>,
    missing: Arc<MissingSet>,
    stats: Arc<RelayStats>,
}

impl SequenceTracker {
    pub fn new(missing: Arc<MissingSet>, stats: Arc<RelayStats>) -> Self {
        Self {
            last_seq: None,
            missing,
            stats,
        }
    }

    /// Process one arriving sequence number.
    ///
    /// The first observation only seeds the frontier. A sequence ahead of
    /// the frontier enters every skipped sequence into the missing set
    /// (stopping silently when the set is full) and becomes the new
    /// frontier. A sequence at or behind the frontier is a late arrival:
    /// it clears its own missing entry and leaves the frontier alone.
    pub fn observe(&mut self, seq: u32) {
        self.stats.packets_received.fetch_add(1, Ordering::Relaxed);

        let last = match self.last_seq {
            None => {
                self.last_seq = Some(seq);
                return;
            }
            Some(last) => last,
        };

        let ahead = seq.wrapping_sub(last);
        if ahead == 0 {
            return; // duplicate of the frontier
        }
        if ahead >= SEQ_AHEAD_MAX {
            self.missing.resolve(seq);
            return;
        }

        if ahead > 1 {
            let now = Instant::now();
            let mut gap = last.wrapping_add(1);
            while gap != seq {
                // A failed insert means the set is full; it stays full for
                // the remainder of this call, so stop scanning.
                if !self.missing.insert(gap, now) {
                    break;
                }
                gap = gap.wrapping_add(1);
            }
        }
        self.last_seq = Some(seq);
    }

    pub fn last_seq(&self) -> Option<u32> {
        self.last_seq
    }
}
