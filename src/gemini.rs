//! Gemini API client
//!
//! Two request shapes against the same model endpoint:
//! - single-shot `generateContent` for routing classification
//! - `streamGenerateContent?alt=sse` for the conversational answer
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Reusable Gemini client (connection-pooled)
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Single-shot generation; returns the first candidate's text.
    pub async fn generate(
        &self,
        contents: Vec<Content>,
        generation_config: GenerationConfig,
    ) -> crate::Result<String> {
        let url = format!("{}:generateContent?key={}", self.base_url, self.api_key);
        let request = GeminiRequest {
            contents,
            generation_config,
        };

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AssistantError::Generation(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AssistantError::Generation(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::Generation(format!("Gemini parse error: {}", e))
        })?;

        gemini_response
            .candidate_text()
            .ok_or_else(|| AssistantError::Generation("Empty response from Gemini".to_string()))
    }

    /// Streaming generation; yields incremental text fragments as they
    /// arrive over SSE. The stream is finite and not restartable.
    pub async fn generate_stream(
        &self,
        contents: Vec<Content>,
        generation_config: GenerationConfig,
    ) -> crate::Result<impl Stream<Item = crate::Result<String>> + Send> {
        let url = format!(
            "{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.api_key
        );
        let request = GeminiRequest {
            contents,
            generation_config,
        };

        info!("Calling Gemini API (streaming)");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini streaming request failed: {}", e);
                AssistantError::Generation(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AssistantError::Generation(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let fragments = response.bytes_stream().eventsource().filter_map(|event| {
            let item = match event {
                Ok(event) => match serde_json::from_str::<GeminiResponse>(&event.data) {
                    Ok(chunk) => chunk.candidate_text().filter(|t| !t.is_empty()).map(Ok),
                    Err(e) => Some(Err(AssistantError::Generation(format!(
                        "Malformed stream chunk: {}",
                        e
                    )))),
                },
                Err(e) => Some(Err(AssistantError::Generation(format!(
                    "Stream interrupted: {}",
                    e
                )))),
            };
            async move { item }
        });

        Ok(fragments)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// One conversational turn on the Gemini wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "topK")]
    pub top_k: i32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: i32,
}

impl GenerationConfig {
    /// Terse, deterministic-leaning config for the routing call
    pub fn classification() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 500,
        }
    }

    /// Exploratory config for the streamed conversational answer
    pub fn answer() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(alias = "finishReason")]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

impl GeminiResponse {
    /// All part texts of the first candidate, concatenated. Candidates can
    /// carry more than one part; dropping any of them truncates the answer.
    fn candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        if content.parts.is_empty() {
            return None;
        }
        Some(content.parts.iter().map(|part| part.text.as_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content::user("What is RSI?")],
            generation_config: GenerationConfig::classification(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is RSI?"));
        assert!(json.contains("\"maxOutputTokens\":500"));
        assert!(json.contains("\"topK\":40"));
    }

    #[test]
    fn test_response_candidate_text() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello"}]},
                "finishReason": "STOP"
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.candidate_text().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_multi_part_candidate_concatenates() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Hello "},
                    {"text": "world"}
                ]}
            }]
        }"#;

        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.candidate_text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(response.candidate_text().is_none());
    }

    #[test]
    fn test_generation_configs() {
        let classification = GenerationConfig::classification();
        assert_eq!(classification.max_output_tokens, 500);

        let answer = GenerationConfig::answer();
        assert_eq!(answer.max_output_tokens, 8192);
        assert!(answer.temperature > classification.temperature);
    }
}
