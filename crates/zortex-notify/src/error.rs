use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Store(#[from] zortex_store::StoreError),

    #[error("no pending notification with id {0}")]
    NotFound(String),

    #[error("channel delivery failed: {0}")]
    Channel(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
