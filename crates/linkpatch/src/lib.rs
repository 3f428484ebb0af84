/// Linkpatch: selective-retransmission overlay for one-way lossy UDP
/// streams (wireless video/telemetry links with no transport-level
/// acknowledgment).
///
/// A server near the packet producer forwards every inbound datagram to
/// a local consumer immediately and keeps a bounded ring of recent
/// datagrams; a client near the consumer watches the sequence numbers
/// for gaps, tracks missing packets with a per-entry expiry, and sends
/// batched retransmit requests back over a side channel until each gap
/// is filled or abandoned.
///
/// Not a reliable transport: no delivery guarantee, no reordering, no
/// congestion control. A packet not recovered within its hold window is
/// permanently lost to the protocol.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod missing;
pub mod net;
pub mod protocol;
pub mod server;
pub mod stats;
pub mod tracker;

// Re-export key types for convenience.
pub use cache::PacketCache;
pub use client::{run_client, ClientConfig, ReceivedPacket};
pub use config::{Config, ConfigError};
pub use error::RelayError;
pub use missing::{MissingSet, DEFAULT_MAX_MISSING};
pub use protocol::{data_sequence, decode_request, encode_request, MAX_BATCH, SEQ_FIELD};
pub use server::{run_server, ServerConfig};
pub use stats::{run_reporter, RelayStats};
pub use tracker::SequenceTracker;
