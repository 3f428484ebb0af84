use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
