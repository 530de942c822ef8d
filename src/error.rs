//! Top-level error types for Rooivalk.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Responses(#[from] ResponsesError),

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key: {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    ProviderRequest(String),

    #[error("provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("completion failed: {0}")]
    CompletionFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Response catalogue loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ResponsesError {
    #[error("failed to read catalogue from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse catalogue: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
