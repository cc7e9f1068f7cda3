use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("session hub is closed")]
    Closed,
}
