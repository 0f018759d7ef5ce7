use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    /// A configuration value is missing, non-positive, or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),
}

pub type GuardResult<T> = Result<T, GuardError>;
