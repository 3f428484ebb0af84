/// Relay counters — shared between the pipeline threads and the stats
/// reporter. All fields are relaxed atomics for lock-free updates on the
/// datagram path; totals are monotone and never reset.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often sleeping loops wake to check the shutdown flag.
pub(crate) const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

pub struct RelayStats {
    /// Data datagrams received (server: ingress; client: stream + retransmissions).
    pub packets_received: AtomicU64,
    /// Datagrams forwarded to the local consumer (server only).
    pub packets_forwarded: AtomicU64,
    /// Sequences included in request batches sent to the server (client
    /// only). Counts issued NACKs, not confirmed recoveries.
    pub requests_issued: AtomicU64,
    /// Cached payloads re-sent in answer to requests (server only).
    pub retransmits_sent: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            packets_forwarded: AtomicU64::new(0),
            requests_issued: AtomicU64::new(0),
            retransmits_sent: AtomicU64::new(0),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically report the counters until shutdown. Counters are read,
/// never reset.
pub fn run_reporter(
    role: &'static str,
    stats: Arc<RelayStats>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut last_report = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(SHUTDOWN_POLL);
        if last_report.elapsed() < interval {
            continue;
        }
        last_report = Instant::now();
        tracing::info!(
            role,
            received = stats.packets_received.load(Ordering::Relaxed),
            forwarded = stats.packets_forwarded.load(Ordering::Relaxed),
            requested = stats.requests_issued.load(Ordering::Relaxed),
            retransmitted = stats.retransmits_sent.load(Ordering::Relaxed),
            "stats",
        );
    }
}
