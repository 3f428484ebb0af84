/// Linkpatch wire formats.
///
/// Data datagram (big-endian):
///   [0..4]  sequence (u32 BE)
///   [4..]   opaque payload
///
/// Retransmit-request datagram (client → server):
///   [0]     count (u8, 1..=20)
///   [1..]   count × u32 BE sequence numbers
///
/// A retransmitted data datagram is byte-identical to the original
/// forwarded datagram; nothing on the wire marks it as a retransmission.

/// Size of the sequence field leading every data datagram.
pub const SEQ_FIELD: usize = 4;

/// Maximum sequence numbers in one retransmit request.
pub const MAX_BATCH: usize = 20;

/// Maximum retransmit-request datagram size.
pub const REQUEST_MAX: usize = 1 + MAX_BATCH * 4;

/// Read the sequence number from the leading bytes of a data datagram.
/// Returns None if the datagram is too short to carry one.
pub fn data_sequence(datagram: &[u8]) -> Option<u32> {
    if datagram.len() < SEQ_FIELD {
        return None;
    }
    Some(u32::from_be_bytes([
        datagram[0],
        datagram[1],
        datagram[2],
        datagram[3],
    ]))
}

/// Encode a retransmit request for the given sequences.
///
/// # Panics
/// Panics if `seqs` is empty or holds more than [`MAX_BATCH`] entries.
pub fn encode_request(seqs: &[u32]) -> Vec<u8> {
    assert!(!seqs.is_empty() && seqs.len() <= MAX_BATCH);
    let mut buf = Vec::with_capacity(1 + seqs.len() * 4);
    buf.push(seqs.len() as u8);
    for seq in seqs {
        buf.extend_from_slice(&seq.to_be_bytes());
    }
    buf
}

/// Decode a retransmit request. Returns None for an empty buffer, a zero
/// or over-limit count, or a datagram too short for its declared count.
pub fn decode_request(data: &[u8]) -> Option<Vec<u32>> {
    let (&count, rest) = data.split_first()?;
    let count = count as usize;
    if count == 0 || count > MAX_BATCH || rest.len() < count * 4 {
        return None;
    }
    let mut seqs = Vec::with_capacity(count);
    for chunk in rest[..count * 4].chunks_exact(4) {
        seqs.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Some(seqs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_request() {
        for k in 1..=MAX_BATCH {
            let seqs: Vec<u32> = (0..k as u32).map(|i| i * 7 + 3).collect();
            let wire = encode_request(&seqs);
            assert_eq!(wire.len(), 1 + k * 4);
            assert_eq!(decode_request(&wire), Some(seqs));
        }
    }

    #[test]
    fn roundtrip_extreme_sequences() {
        let seqs = vec![0, 1, u32::MAX - 1, u32::MAX];
        assert_eq!(decode_request(&encode_request(&seqs)), Some(seqs));
    }

    #[test]
    fn reject_empty() {
        assert!(decode_request(&[]).is_none());
    }

    #[test]
    fn reject_zero_count() {
        assert!(decode_request(&[0]).is_none());
    }

    #[test]
    fn reject_over_limit_count() {
        let mut wire = vec![21u8];
        wire.extend_from_slice(&[0u8; 21 * 4]);
        assert!(decode_request(&wire).is_none());
    }

    #[test]
    fn reject_truncated_body() {
        let mut wire = encode_request(&[1, 2, 3]);
        wire.truncate(wire.len() - 1);
        assert!(decode_request(&wire).is_none());
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut wire = encode_request(&[42]);
        wire.extend_from_slice(&[0xAA; 3]);
        assert_eq!(decode_request(&wire), Some(vec![42]));
    }

    #[test]
    fn data_sequence_field() {
        assert_eq!(data_sequence(&[0, 0, 0, 5, 1, 2, 3]), Some(5));
        assert_eq!(data_sequence(&[0xDE, 0xAD, 0xBE, 0xEF]), Some(0xDEADBEEF));
        assert_eq!(data_sequence(&[1, 2, 3]), None);
        assert_eq!(data_sequence(&[]), None);
    }
}
