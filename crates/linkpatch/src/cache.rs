/// Server-side packet cache: a fixed ring of the most recent datagrams,
/// keyed by `sequence % capacity`.
///
/// Each slot is tagged with the sequence it currently holds, so a lookup
/// can tell in O(1) whether the slot still contains the requested packet
/// or has been overwritten by a newer one that mapped to the same index.
/// A sequence more than `capacity` arrivals old is unrecoverable.

use std::sync::Mutex;

use bytes::Bytes;

struct Slot {
    sequence: u32,
    payload: Bytes,
}

/// Bounded ring buffer answering retransmit lookups.
///
/// Insert and lookup each take the internal lock for the duration of the
/// slot access only; `lookup` hands back a cheap `Bytes` clone so callers
/// send on the network without holding the lock.
pub struct PacketCache {
    slots: Mutex<Vec<Option<Slot>>>,
    capacity: usize,
}

impl PacketCache {
    /// Create a cache with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: Mutex::new(slots),
            capacity,
        }
    }

    /// Store a datagram, unconditionally evicting whatever previously
    /// occupied the slot `sequence % capacity` maps to.
    pub fn insert(&self, sequence: u32, payload: Bytes) {
        let idx = sequence as usize % self.capacity;
        let mut slots = self.slots.lock().unwrap();
        slots[idx] = Some(Slot { sequence, payload });
    }

    /// Fetch the datagram stored for `sequence`, if its slot has not been
    /// overwritten by a newer arrival.
    pub fn lookup(&self, sequence: u32) -> Option<Bytes> {
        let idx = sequence as usize % self.capacity;
        let slots = self.slots.lock().unwrap();
        slots[idx]
            .as_ref()
            .filter(|slot| slot.sequence == sequence)
            .map(|slot| slot.payload.clone())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(seq: u32) -> Bytes {
        let mut data = seq.to_be_bytes().to_vec();
        data.extend_from_slice(&[seq as u8; 16]);
        Bytes::from(data)
    }

    #[test]
    fn lookup_hits_within_window() {
        let cache = PacketCache::new(4);
        for seq in 0..4 {
            cache.insert(seq, payload(seq));
        }
        for seq in 0..4 {
            assert_eq!(cache.lookup(seq), Some(payload(seq)));
        }
    }

    #[test]
    fn empty_slot_misses() {
        let cache = PacketCache::new(8);
        cache.insert(1, payload(1));
        assert!(cache.lookup(0).is_none());
        assert!(cache.lookup(9).is_none());
    }

    #[test]
    fn overwrite_evicts_older_sequence() {
        // Capacity 10, sequences 0..=15: anything older than the last 10
        // arrivals must miss, anything inside the window must hit.
        let cache = PacketCache::new(10);
        for seq in 0..16 {
            cache.insert(seq, payload(seq));
        }
        assert!(cache.lookup(2).is_none()); // evicted by 12
        assert_eq!(cache.lookup(13), Some(payload(13)));
        assert_eq!(cache.lookup(15), Some(payload(15)));
        assert!(cache.lookup(5).is_none()); // evicted by 15
    }

    #[test]
    fn stale_slot_does_not_answer_for_new_sequence() {
        let cache = PacketCache::new(10);
        cache.insert(3, payload(3));
        // Slot 3 holds sequence 3; a request for 13 maps to the same
        // slot but must not be satisfied by the older packet.
        assert!(cache.lookup(13).is_none());
    }
}
