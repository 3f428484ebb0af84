/// Client pipelines: gap tracking plus batched retransmit requesting.
///
/// ```text
/// [Receive loop]          [Request loop]          [Stats loop]
/// recv data datagram      1 ms tick               periodic report
/// track sequence gaps     purge expired entries
/// deliver to consumer     send one batch (≤ 20)
/// ```
///
/// Requests are sent from the same socket the data stream arrives on, so
/// the server's replies land in the normal receive path and clear their
/// missing entries like any other datagram.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::missing::MissingSet;
use crate::net;
use crate::protocol::{data_sequence, encode_request};
use crate::stats::{run_reporter, RelayStats};
use crate::tracker::SequenceTracker;

/// Cadence of the request loop. Short relative to any sane hold duration
/// so request latency never dominates the recovery window.
const REQUEST_TICK: Duration = Duration::from_millis(1);

/// Consecutive receive failures (timeouts excluded) tolerated before the
/// receive loop gives up on its socket.
const MAX_RECV_ERRORS: u32 = 16;

/// A datagram handed to the in-process consumer: the full wire bytes plus
/// the sequence already parsed from them.
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub sequence: u32,
    pub payload: Bytes,
}

pub struct ClientConfig {
    /// Where the (lossy) data stream arrives.
    pub recv_addr: SocketAddr,
    /// The server's retransmit-request port.
    pub request_addr: SocketAddr,
    /// Maximum datagram size.
    pub buf_size: usize,
    /// Missing-set capacity.
    pub max_missing: usize,
    /// Missing-entry TTL.
    pub hold_duration: Duration,
    pub stats_interval: Duration,
    /// Per-datagram debug logging.
    pub verbose: bool,
    /// Optional in-process consumer of received datagrams. Delivery is
    /// drop-not-block: a full channel loses packets, never stalls the
    /// receive loop.
    pub delivery: Option<Sender<ReceivedPacket>>,
}

/// Run the client. Blocks until the shutdown flag is set or the receive
/// loop dies; a bind failure is returned before any thread starts.
pub fn run_client(
    config: ClientConfig,
    stats: Arc<RelayStats>,
    shutdown: Arc<AtomicBool>,
) -> Result<(), RelayError> {
    let socket = Arc::new(net::bind_recv_socket(config.recv_addr)?);
    let missing = Arc::new(MissingSet::new(config.max_missing, config.hold_duration));

    info!(
        data = %config.recv_addr,
        server = %config.request_addr,
        hold_ms = config.hold_duration.as_millis() as u64,
        "client listening",
    );

    // ── Receive loop ───────────────────────────────────────────────────
    let recv_socket = socket.clone();
    let recv_missing = missing.clone();
    let stats_recv = stats.clone();
    let shutdown_recv = shutdown.clone();
    let delivery = config.delivery;
    let buf_size = config.buf_size;
    let verbose = config.verbose;
    let receive_handle = std::thread::Builder::new()
        .name("lp-receive".into())
        .spawn(move || -> Result<(), RelayError> {
            let mut tracker = SequenceTracker::new(recv_missing, stats_recv);
            let mut buf = vec![0u8; buf_size];
            let mut recv_errors = 0u32;
            while !shutdown_recv.load(Ordering::Relaxed) {
                let len = match recv_socket.recv_from(&mut buf) {
                    Ok((len, _src)) => {
                        recv_errors = 0;
                        len
                    }
                    Err(ref e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        recv_errors += 1;
                        if recv_errors >= MAX_RECV_ERRORS {
                            shutdown_recv.store(true, Ordering::Relaxed);
                            return Err(e.into());
                        }
                        warn!("data receive error: {e}");
                        continue;
                    }
                };

                let Some(seq) = data_sequence(&buf[..len]) else {
                    debug!(len, "datagram too short for a sequence field, dropped");
                    continue;
                };

                tracker.observe(seq);

                if verbose {
                    debug!(seq, len, "received");
                }

                if let Some(ref tx) = delivery {
                    let _ = tx.try_send(ReceivedPacket {
                        sequence: seq,
                        payload: Bytes::copy_from_slice(&buf[..len]),
                    });
                }
            }
            Ok(())
        })
        .map_err(RelayError::Io)?;

    // ── Request loop ───────────────────────────────────────────────────
    let request_addr = config.request_addr;
    let stats_req = stats.clone();
    let shutdown_req = shutdown.clone();
    let request_handle = std::thread::Builder::new()
        .name("lp-request".into())
        .spawn(move || {
            while !shutdown_req.load(Ordering::Relaxed) {
                std::thread::sleep(REQUEST_TICK);

                // Every tick purges expired entries, sent or not.
                let batch = missing.collect_batch(Instant::now());
                if batch.is_empty() {
                    continue;
                }

                let wire = encode_request(&batch);
                match socket.send_to(&wire, request_addr) {
                    Ok(_) => {
                        stats_req
                            .requests_issued
                            .fetch_add(batch.len() as u64, Ordering::Relaxed);
                        if verbose {
                            debug!(count = batch.len(), "requested retransmissions");
                        }
                    }
                    Err(e) => debug!("request send failed: {e}"),
                }
            }
        })
        .map_err(RelayError::Io)?;

    // ── Stats loop ─────────────────────────────────────────────────────
    let stats_handle = std::thread::Builder::new()
        .name("lp-stats".into())
        .spawn({
            let stats = stats.clone();
            let shutdown = shutdown.clone();
            let interval = config.stats_interval;
            move || run_reporter("client", stats, interval, shutdown)
        })
        .map_err(RelayError::Io)?;

    receive_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("receive"))??;
    request_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("request"))?;
    stats_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("stats"))?;
    Ok(())
}
