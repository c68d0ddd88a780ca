use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("Test-only policy provider '{provider}' cannot be installed in a production runtime")]
    TestProviderInProduction { provider: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Failure reported by a policy provider. Never escapes the policy store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backing store returned status {0}")]
    Status(u16),

    #[error("undecodable policy document: {0}")]
    Decode(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Parse(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} not set")]
    MissingVar(String),
}

pub type Result<T> = std::result::Result<T, RegionError>;
