/// Server pipelines: receive-and-forward plus retransmit answering.
///
/// ```text
/// [Forward loop]          [Request loop]          [Stats loop]
/// recv data datagram      recv request batch      periodic report
/// forward to consumer     lookup each sequence
/// insert into ring        resend hits to source
/// ```
///
/// The ring cache is the only state shared between the two socket loops;
/// its lock is held for one slot access at a time and never across a
/// send.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::PacketCache;
use crate::error::RelayError;
use crate::net;
use crate::protocol::{data_sequence, decode_request, REQUEST_MAX};
use crate::stats::{run_reporter, RelayStats};

/// Consecutive receive failures (timeouts excluded) tolerated before a
/// loop gives up on its socket.
const MAX_RECV_ERRORS: u32 = 16;

pub struct ServerConfig {
    /// Where the producer's data stream arrives.
    pub recv_addr: SocketAddr,
    /// Local consumer every datagram is forwarded to.
    pub forward_addr: SocketAddr,
    /// Where retransmit requests arrive.
    pub request_addr: SocketAddr,
    /// Maximum datagram size.
    pub buf_size: usize,
    /// Ring slots.
    pub cache_capacity: usize,
    pub stats_interval: Duration,
    /// Per-datagram debug logging.
    pub verbose: bool,
}

/// Run the server. Blocks until the shutdown flag is set or a socket
/// loop dies; a bind failure is returned before any thread starts.
pub fn run_server(
    config: ServerConfig,
    stats: Arc<RelayStats>,
    shutdown: Arc<AtomicBool>,
) -> Result<(), RelayError> {
    let recv_socket = net::bind_recv_socket(config.recv_addr)?;
    let request_socket = net::bind_recv_socket(config.request_addr)?;
    let forward_socket = net::send_socket()?;
    let cache = Arc::new(PacketCache::new(config.cache_capacity));

    info!(
        data = %config.recv_addr,
        requests = %config.request_addr,
        forward = %config.forward_addr,
        capacity = config.cache_capacity,
        "server listening",
    );

    // ── Forward loop ───────────────────────────────────────────────────
    let cache_fwd = cache.clone();
    let stats_fwd = stats.clone();
    let shutdown_fwd = shutdown.clone();
    let forward_addr = config.forward_addr;
    let buf_size = config.buf_size;
    let verbose = config.verbose;
    let forward_handle = std::thread::Builder::new()
        .name("lp-forward".into())
        .spawn(move || -> Result<(), RelayError> {
            let mut buf = vec![0u8; buf_size];
            let mut recv_errors = 0u32;
            while !shutdown_fwd.load(Ordering::Relaxed) {
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
                            shutdown_fwd.store(true, Ordering::Relaxed);
                            return Err(e.into());
                        }
                        warn!("data receive error: {e}");
                        continue;
                    }
                };

                stats_fwd.packets_received.fetch_add(1, Ordering::Relaxed);

                let Some(seq) = data_sequence(&buf[..len]) else {
                    debug!(len, "datagram too short for a sequence field, dropped");
                    continue;
                };

                // Forward first so the consumer path never waits on the ring.
                match forward_socket.send_to(&buf[..len], forward_addr) {
                    Ok(_) => {
                        stats_fwd.packets_forwarded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => warn!(seq, "forward to {forward_addr} failed: {e}"),
                }

                cache_fwd.insert(seq, Bytes::copy_from_slice(&buf[..len]));

                if verbose {
                    debug!(seq, len, "forwarded");
                }
            }
            Ok(())
        })
        .map_err(RelayError::Io)?;

    // ── Request loop ───────────────────────────────────────────────────
    let stats_req = stats.clone();
    let shutdown_req = shutdown.clone();
    let request_handle = std::thread::Builder::new()
        .name("lp-respond".into())
        .spawn(move || -> Result<(), RelayError> {
            let mut buf = [0u8; REQUEST_MAX];
            let mut recv_errors = 0u32;
            while !shutdown_req.load(Ordering::Relaxed) {
                let (len, src) = match request_socket.recv_from(&mut buf) {
                    Ok(received) => {
                        recv_errors = 0;
                        received
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
                            shutdown_req.store(true, Ordering::Relaxed);
                            return Err(e.into());
                        }
                        warn!("request receive error: {e}");
                        continue;
                    }
                };

                let Some(seqs) = decode_request(&buf[..len]) else {
                    debug!(%src, len, "malformed retransmit request, dropped");
                    continue;
                };

                for seq in seqs {
                    // Lookup clones out of the ring; the send holds no lock.
                    let Some(payload) = cache.lookup(seq) else {
                        // Overwritten or never seen — the requester's entry
                        // will expire on its own.
                        continue;
                    };
                    match request_socket.send_to(&payload, src) {
                        Ok(_) => {
                            stats_req.retransmits_sent.fetch_add(1, Ordering::Relaxed);
                            if verbose {
                                debug!(seq, %src, "retransmitted");
                            }
                        }
                        Err(e) => debug!(seq, %src, "retransmit send failed: {e}"),
                    }
                }
            }
            Ok(())
        })
        .map_err(RelayError::Io)?;

    // ── Stats loop ─────────────────────────────────────────────────────
    let stats_handle = std::thread::Builder::new()
        .name("lp-stats".into())
        .spawn({
            let stats = stats.clone();
            let shutdown = shutdown.clone();
            let interval = config.stats_interval;
            move || run_reporter("server", stats, interval, shutdown)
        })
        .map_err(RelayError::Io)?;

    forward_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("forward"))??;
    request_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("respond"))??;
    stats_handle
        .join()
        .map_err(|_| RelayError::ThreadPanicked("stats"))?;
    Ok(())
}
