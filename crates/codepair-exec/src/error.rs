use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to spawn backend: {0}")]
    Spawn(String),
    #[error("backend channel closed")]
    ChannelClosed,
}
