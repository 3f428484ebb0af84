use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use linkpatch::{run_server, Config, RelayStats, ServerConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkpatch=info,linkpatch_server=info".into()),
        )
        .init();

    let config_path = parse_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(config = %config_path.display(), "starting server");

    let server = ServerConfig {
        recv_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, config.server_recv_port)),
        forward_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, config.server_send_port)),
        // Requests may come from off-box.
        request_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server_retransmit_port)),
        buf_size: config.buf_size,
        cache_capacity: config.cache_capacity,
        stats_interval: config.stats_interval(),
        verbose: config.server_verbose,
    };

    let stats = Arc::new(RelayStats::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    run_server(server, stats, shutdown)?;
    Ok(())
}

fn parse_args() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    let flag = args.next();
    let path = args.next();
    match (flag.as_deref(), path) {
        (Some("--config"), Some(path)) => Ok(PathBuf::from(path)),
        _ => anyhow::bail!("usage: linkpatch-server --config <file>"),
    }
}
