//! Query router
//!
//! Decides whether a user query needs live market data and, if so, which
//! registry operation to invoke with which parameters. The decision comes
//! from a terse, low-temperature Gemini call whose output is expected to
//! contain JSON.
//!
//! Fail-open policy: a malformed classification never blocks the turn.
//! Any LLM failure, parse failure, or shape mismatch degrades to
//! "no data needed" so the conversational answer can still proceed.

use crate::error::AssistantError;
use crate::gemini::{Content, GeminiClient, GenerationConfig};
use crate::registry::OperationRegistry;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Structured routing output for one query
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub needs_data: bool,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl RoutingDecision {
    /// Degraded decision: answer from general knowledge only
    pub fn no_data() -> Self {
        Self {
            needs_data: false,
            operation: None,
            parameters: Map::new(),
        }
    }
}

pub struct Router {
    gemini: GeminiClient,
    registry: Arc<OperationRegistry>,
}

impl Router {
    pub fn new(gemini: GeminiClient, registry: Arc<OperationRegistry>) -> Self {
        Self { gemini, registry }
    }

    /// Classify a query. Always returns a well-formed decision.
    pub async fn route(&self, query: &str) -> RoutingDecision {
        let prompt = build_classification_prompt(&self.registry, query);
        let contents = vec![Content::user(prompt)];

        let raw = match self
            .gemini
            .generate(contents, GenerationConfig::classification())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Routing call failed, answering without data: {}", e);
                return RoutingDecision::no_data();
            }
        };

        let decision = decision_from_response(&raw);

        info!(
            needs_data = decision.needs_data,
            operation = ?decision.operation,
            "Routing decision"
        );
        decision
    }
}

fn build_classification_prompt(registry: &OperationRegistry, query: &str) -> String {
    format!(
        r#"You are an orchestrator for a financial assistant specialized in Indian markets. Your job is to analyze user queries and determine if they need real-time market data.

IMPORTANT: Be very precise in your analysis. Only return TRUE for "needs_data" when the query EXPLICITLY asks for current market data, stock prices, or listings.

Examples where needs_data should be TRUE:
- "Show me the most active stocks on NSE today" -> get_nse_most_active
- "What is the current price of Reliance?" -> get_stock_details with stock_name="Reliance"
- "Tell me about trending stocks" -> get_trending_stocks
- "What are the latest IPOs?" -> get_ipo_data

Examples where needs_data should be FALSE:
- "What is compound interest?"
- "How should I start investing?"
- "What are the tax benefits of PPF?"
- "Explain mutual funds to me"

Available operations:
{}

User query: {}

Respond in JSON format with the following structure:
{{
    "needs_data": true/false,
    "operation": "operation_name_if_needed",
    "parameters": {{
        "param1": "value1"
    }}
}}
"#,
        registry.catalogue(),
        query
    )
}

/// Extract the JSON payload from free-text LLM output.
///
/// Three-tier fallback: fenced block labeled json, then any fenced block,
/// then the whole trimmed text. LLM output formatting is not guaranteed.
/// An unclosed fence yields everything after it.
pub fn extract_json_payload(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        let end = after.find("```").unwrap_or(after.len());
        return after[..end].trim();
    }

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let end = after.find("```").unwrap_or(after.len());
        return after[..end].trim();
    }

    text.trim()
}

/// Parse raw classification output into a routing decision.
pub fn parse_decision(raw: &str) -> crate::Result<RoutingDecision> {
    let payload = extract_json_payload(raw);

    let decision: RoutingDecision = serde_json::from_str(payload)
        .map_err(|e| AssistantError::RoutingParse(format!("{} | raw={}", e, raw)))?;

    if decision.needs_data && decision.operation.is_none() {
        return Err(AssistantError::RoutingParse(
            "needs_data is true but no operation was named".to_string(),
        ));
    }

    Ok(decision)
}

/// `parse_decision` with the fail-open fallback applied.
pub fn decision_from_response(raw: &str) -> RoutingDecision {
    parse_decision(raw).unwrap_or_else(|e| {
        warn!("Routing output unusable, answering without data: {}", e);
        RoutingDecision::no_data()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_labeled_fence() {
        let text = "Here you go:\n```json\n{\"needs_data\": false}\n```\nDone.";
        assert_eq!(extract_json_payload(text), "{\"needs_data\": false}");
    }

    #[test]
    fn test_extract_unlabeled_fence() {
        let text = "```\n{\"needs_data\": false}\n```";
        assert_eq!(extract_json_payload(text), "{\"needs_data\": false}");
    }

    #[test]
    fn test_extract_raw_text() {
        let text = "  {\"needs_data\": true}  ";
        assert_eq!(extract_json_payload(text), "{\"needs_data\": true}");
    }

    #[test]
    fn test_unclosed_fence_takes_remainder() {
        let labeled = "```json\n{\"needs_data\": false}";
        assert_eq!(extract_json_payload(labeled), "{\"needs_data\": false}");

        let unlabeled = "```\n{\"needs_data\": false}";
        assert_eq!(extract_json_payload(unlabeled), "{\"needs_data\": false}");
    }

    #[test]
    fn test_labeled_fence_beats_unlabeled() {
        let text = "```\nnot json\n```\n```json\n{\"needs_data\": false}\n```";
        assert_eq!(extract_json_payload(text), "{\"needs_data\": false}");
    }

    #[test]
    fn test_parse_full_decision() {
        let raw = r#"```json
{
    "needs_data": true,
    "operation": "get_stock_details",
    "parameters": {"stock_name": "Reliance"}
}
```"#;

        let decision = parse_decision(raw).unwrap();
        assert!(decision.needs_data);
        assert_eq!(decision.operation.as_deref(), Some("get_stock_details"));
        assert_eq!(
            decision.parameters.get("stock_name"),
            Some(&json!("Reliance"))
        );
    }

    #[test]
    fn test_parse_rejects_data_without_operation() {
        let result = parse_decision(r#"{"needs_data": true}"#);
        assert!(matches!(result, Err(AssistantError::RoutingParse(_))));
    }

    #[test]
    fn test_fail_open_on_malformed_input() {
        let cases = [
            "",
            "The market looks bullish today.",
            "```json\nnot even close\n```",
            "{\"needs_data\": \"maybe\"}",
        ];

        for raw in cases {
            assert_eq!(decision_from_response(raw), RoutingDecision::no_data());
        }
    }

    #[test]
    fn test_well_formed_inputs_parse_across_tiers() {
        let cases = [
            "```json\n{\"needs_data\": false}\n```",
            "```\n{\"needs_data\": false}\n```",
            "{\"needs_data\": false}",
        ];

        for raw in cases {
            let decision = decision_from_response(raw);
            assert!(!decision.needs_data);
        }
    }

    #[test]
    fn test_prompt_embeds_catalogue_and_query() {
        let registry = OperationRegistry::new();
        let prompt = build_classification_prompt(&registry, "price of TCS?");

        assert!(prompt.contains("get_nse_most_active"));
        assert!(prompt.contains("get_historical_data"));
        assert!(prompt.contains("price of TCS?"));
    }
}
