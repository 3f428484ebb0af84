/// Flat `key=value` configuration file.
///
/// `#`-prefixed lines and blank lines are ignored. Unknown keys and
/// malformed lines are reported with a warning and skipped — a config
/// file never fails to load for anything short of an unreadable file.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::missing::DEFAULT_MAX_MISSING;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Server data-ingress port.
    pub server_recv_port: u16,
    /// Local consumer port the server forwards every datagram to.
    pub server_send_port: u16,
    /// Server request-ingress port.
    pub server_retransmit_port: u16,
    /// Client data-ingress port.
    pub client_recv_port: u16,
    /// Server request port as the client addresses it.
    pub client_retransmit_port: u16,
    /// Maximum datagram size in bytes.
    pub buf_size: usize,
    /// Ring slots on the server.
    pub cache_capacity: usize,
    /// Missing-set capacity on the client.
    pub max_missing: usize,
    /// Missing-entry TTL.
    pub hold_duration_ms: u64,
    /// Stats report period.
    pub stats_interval_ms: u64,
    /// Per-datagram debug logging.
    pub server_verbose: bool,
    pub client_verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_recv_port: 5600,
            server_send_port: 5601,
            server_retransmit_port: 5666,
            client_recv_port: 5601,
            client_retransmit_port: 5666,
            buf_size: 4096,
            cache_capacity: 1024,
            max_missing: DEFAULT_MAX_MISSING,
            hold_duration_ms: 200,
            stats_interval_ms: 1000,
            server_verbose: false,
            client_verbose: false,
        }
    }
}

impl Config {
    /// Load a config file over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse config text over the defaults. Bad lines warn and are skipped.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line = idx + 1, "config line has no '=', skipped: {raw}");
                continue;
            };
            if !config.apply(key.trim(), value.trim()) {
                warn!(line = idx + 1, "bad config line, skipped: {raw}");
            }
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) -> bool {
        fn set<T: std::str::FromStr>(slot: &mut T, value: &str) -> bool {
            match value.parse() {
                Ok(v) => {
                    *slot = v;
                    true
                }
                Err(_) => false,
            }
        }
        fn set_flag(slot: &mut bool, value: &str) -> bool {
            // Accepts 0/1 as well as true/false.
            match value {
                "0" => *slot = false,
                "1" => *slot = true,
                _ => return set(slot, value),
            }
            true
        }

        match key {
            "server_recv_port" => set(&mut self.server_recv_port, value),
            "server_send_port" => set(&mut self.server_send_port, value),
            "server_retransmit_port" => set(&mut self.server_retransmit_port, value),
            "client_recv_port" => set(&mut self.client_recv_port, value),
            "client_retransmit_port" => set(&mut self.client_retransmit_port, value),
            "buf_size" => set(&mut self.buf_size, value),
            "cache_capacity" => set(&mut self.cache_capacity, value),
            "max_missing" => set(&mut self.max_missing, value),
            "hold_duration_ms" => set(&mut self.hold_duration_ms, value),
            "stats_interval_ms" => set(&mut self.stats_interval_ms, value),
            "server_verbose" => set_flag(&mut self.server_verbose, value),
            "client_verbose" => set_flag(&mut self.client_verbose, value),
            _ => false,
        }
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}
