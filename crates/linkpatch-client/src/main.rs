use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use linkpatch::{run_client, ClientConfig, Config, RelayStats};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkpatch=info,linkpatch_client=info".into()),
        )
        .init();

    let config_path = parse_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(config = %config_path.display(), "starting client");

    let client = ClientConfig {
        recv_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, config.client_recv_port)),
        request_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, config.client_retransmit_port)),
        buf_size: config.buf_size,
        max_missing: config.max_missing,
        hold_duration: config.hold_duration(),
        stats_interval: config.stats_interval(),
        verbose: config.client_verbose,
        delivery: None,
    };

    let stats = Arc::new(RelayStats::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    run_client(client, stats, shutdown)?;
    Ok(())
}

fn parse_args() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    let flag = args.next();
    let path = args.next();
    match (flag.as_deref(), path) {
        (Some("--config"), Some(path)) => Ok(PathBuf::from(path)),
        _ => anyhow::bail!("usage: linkpatch-client --config <file>"),
    }
}
