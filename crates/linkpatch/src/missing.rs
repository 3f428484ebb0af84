/// Client-side missing set: bounded tracking of detected gaps, each entry
/// carrying an expiry deadline.
///
/// Capacity is a hard cap — gaps detected while the set is full are never
/// tracked (accepted degradation under sustained loss, not a fault). An
/// entry leaves the set when its sequence arrives, or when its deadline
/// passes, whichever is first.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::protocol::MAX_BATCH;

/// Default capacity of the missing set.
pub const DEFAULT_MAX_MISSING: usize = 100;

struct MissingEntry {
    sequence: u32,
    expires_at: Instant,
}

/// Bounded set of sequences awaiting retransmission.
///
/// All operations take the internal lock once for the duration of the
/// scan; nothing here touches the network.
pub struct MissingSet {
    entries: Mutex<Vec<MissingEntry>>,
    capacity: usize,
    hold: Duration,
}

impl MissingSet {
    pub fn new(capacity: usize, hold: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            hold,
        }
    }

    /// Track `sequence` with a deadline of `now + hold`. Returns false —
    /// silently, this is not an error — when the set is full.
    pub fn insert(&self, sequence: u32, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity {
            return false;
        }
        entries.push(MissingEntry {
            sequence,
            expires_at: now + self.hold,
        });
        true
    }

    /// Drop `sequence` from the set (its packet arrived). Returns true if
    /// it was being tracked.
    pub fn resolve(&self, sequence: u32) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if let Some(idx) = entries.iter().position(|e| e.sequence == sequence) {
            entries.swap_remove(idx);
            true
        } else {
            false
        }
    }

    /// Purge every entry whose deadline has passed, then collect up to
    /// [`MAX_BATCH`] surviving sequences in storage order (slot order, not
    /// age order). One lock acquisition covers both steps, so an expired
    /// entry can never appear in this or any later batch.
    pub fn collect_batch(&self, now: Instant) -> Vec<u32> {
        let mut entries = self.entries.lock().unwrap();
        let mut i = 0;
        while i < entries.len() {
            if entries[i].expires_at <= now {
                entries.swap_remove(i);
            } else {
                i += 1;
            }
        }
        entries
            .iter()
            .take(MAX_BATCH)
            .map(|e| e.sequence)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_millis(200);

    #[test]
    fn insert_until_full() {
        let set = MissingSet::new(3, HOLD);
        let now = Instant::now();
        assert!(set.insert(1, now));
        assert!(set.insert(2, now));
        assert!(set.insert(3, now));
        assert!(!set.insert(4, now));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn resolve_removes_entry() {
        let set = MissingSet::new(10, HOLD);
        let now = Instant::now();
        set.insert(5, now);
        set.insert(6, now);
        assert!(set.resolve(5));
        assert!(!set.resolve(5));
        assert_eq!(set.collect_batch(now), vec![6]);
    }

    #[test]
    fn batch_capped_at_limit() {
        let set = MissingSet::new(50, HOLD);
        let now = Instant::now();
        for seq in 0..50 {
            set.insert(seq, now);
        }
        let batch = set.collect_batch(now);
        assert_eq!(batch.len(), MAX_BATCH);
        // Entries stay tracked after being batched.
        assert_eq!(set.len(), 50);
    }

    #[test]
    fn expired_entries_purged_and_never_batched() {
        let set = MissingSet::new(10, HOLD);
        let now = Instant::now();
        set.insert(1, now);
        set.insert(2, now);
        let later = now + HOLD;
        assert!(set.collect_batch(later).is_empty());
        assert!(set.is_empty());
        // Once purged, a sequence never reappears in a later batch.
        assert!(set.collect_batch(later + HOLD).is_empty());
    }

    #[test]
    fn unexpired_survive_a_purge_of_others() {
        let set = MissingSet::new(10, HOLD);
        let now = Instant::now();
        set.insert(1, now);
        set.insert(2, now + HOLD); // fresher entry, later deadline
        let batch = set.collect_batch(now + HOLD);
        assert_eq!(batch, vec![2]);
        assert_eq!(set.len(), 1);
    }
}
