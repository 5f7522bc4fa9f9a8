use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] zortex_config::ConfigError),

    #[error(transparent)]
    Xp(#[from] zortex_xp::XpError),

    #[error(transparent)]
    Notify(#[from] zortex_notify::NotifyError),
}

pub type AppResult<T> = Result<T, AppError>;
