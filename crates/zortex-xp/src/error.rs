use thiserror::Error;

/// Errors surfaced by the XP ledger and orchestration layer (spec §7).
#[derive(Debug, Error)]
pub enum XpError {
    #[error(transparent)]
    Store(#[from] zortex_store::StoreError),

    #[error("a season is already active")]
    SeasonAlreadyActive,

    #[error("no season is currently active")]
    NoActiveSeason,

    #[error("validation failed: {0}")]
    Validation(String),
}

pub type XpResult<T> = Result<T, XpError>;
