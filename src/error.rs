use thiserror::Error;

/// Errors raised while querying a service-management backend
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("{backend} not available: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} exited with {status}: {stderr}")]
    CommandFailed {
        backend: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Errors that end a follower before or while it reads its source
#[derive(Error, Debug)]
pub enum FollowerError {
    #[error("Failed to spawn subprocess: {0}")]
    Spawn(String),

    #[error("Subprocess has no stdout: {0}")]
    MissingStdout(String),

    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors that can occur while delivering a chunk to the analyzer
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Request timeout")]
    Timeout,

    #[error("Analyzer returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// True when the request never left the host, so a resend cannot duplicate it
    pub fn is_connect(&self) -> bool {
        match self {
            DeliveryError::Http(e) => e.is_connect(),
            _ => false,
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
