use crate::services::ServiceError;
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

/// Top-level error for startup, the server loop and the admin tooling.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Pending work that could not be finished on shutdown
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl InfraError {
    /// Configuration error that did not come from a file (env vars, defaults).
    pub fn env_config(source: ConfigErrorKind) -> Self {
        InfraError::Config {
            path: std::path::PathBuf::from("<env>"),
            source,
        }
    }
}
