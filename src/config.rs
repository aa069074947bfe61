//! Startup configuration
//!
//! Both API keys must be present before the first turn can run.
//! A missing key is fatal at startup, never a per-turn error.

use crate::error::AssistantError;
use std::env;

const DEFAULT_GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash";
const DEFAULT_MARKET_BASE_URL: &str = "https://stock.indianapi.in";

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub market_api_key: String,
    pub gemini_base_url: String,
    pub market_base_url: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `GEMINI_BASE_URL` and `INDIAN_API_BASE_URL` are optional overrides
    /// (used by tests to point at mock servers).
    pub fn from_env() -> crate::Result<Self> {
        Ok(Self {
            gemini_api_key: require("GEMINI_API_KEY")?,
            market_api_key: require("INDIAN_API_KEY")?,
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            market_base_url: env::var("INDIAN_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MARKET_BASE_URL.to_string()),
        })
    }
}

fn require(name: &str) -> crate::Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AssistantError::Configuration(format!(
            "{} is not set. See .env.example for setup instructions.",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_fatal() {
        env::remove_var("GEMINI_API_KEY");

        let result = Config::from_env();

        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("GEMINI_API_KEY"));
    }
}
