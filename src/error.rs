//! Error types for the financial assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Startup
    // =============================

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =============================
    // Per-Turn Errors (absorbed at component boundaries)
    // =============================

    #[error("Routing parse error: {0}")]
    RoutingParse(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Market data gateway error: {0}")]
    Gateway(String),

    #[error("Generation error: {0}")]
    Generation(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
