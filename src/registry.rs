//! Operation registry for the market-data provider
//!
//! Static catalogue mapping logical operation names to REST endpoints,
//! required/optional parameters, parameter renames, and default values.
//! `resolve` is pure validation/transformation; no network call happens here.

use crate::error::AssistantError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Static definition of one data-provider capability
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub description: &'static str,
    pub required_params: &'static [&'static str],
    pub optional_params: &'static [&'static str],
    /// Caller-facing name → provider-facing name
    pub param_mapping: &'static [(&'static str, &'static str)],
    /// Provider-facing name → value, filled when absent after renaming
    pub default_values: &'static [(&'static str, &'static str)],
}

/// Fully-formed provider request: endpoint plus final query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
}

const OPERATIONS: &[OperationDescriptor] = &[
    OperationDescriptor {
        name: "get_stock_details",
        endpoint: "/stock",
        description: "Get details for a specific stock",
        required_params: &["stock_name"],
        optional_params: &[],
        param_mapping: &[("stock_name", "name")],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_trending_stocks",
        endpoint: "/trending",
        description: "Get trending stocks in the market",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_market_news",
        endpoint: "/news",
        description: "Get latest stock market news",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_mutual_funds",
        endpoint: "/mutual_funds",
        description: "Get mutual funds data",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_ipo_data",
        endpoint: "/ipo",
        description: "Get IPO data",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_bse_most_active",
        endpoint: "/BSE_most_active",
        description: "Get BSE most active stocks",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_nse_most_active",
        endpoint: "/NSE_most_active",
        description: "Get NSE most active stocks",
        required_params: &[],
        optional_params: &[],
        param_mapping: &[],
        default_values: &[],
    },
    OperationDescriptor {
        name: "get_historical_data",
        endpoint: "/historical_data",
        description: "Get historical data for a stock",
        required_params: &["stock_name"],
        optional_params: &["period"],
        param_mapping: &[],
        default_values: &[("period", "1m"), ("filter", "default")],
    },
];

/// Registry for looking up operations by name
pub struct OperationRegistry {
    operations: BTreeMap<&'static str, &'static OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        let operations = OPERATIONS.iter().map(|op| (op.name, op)).collect();
        Self { operations }
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.get(name).copied()
    }

    /// Validate caller parameters against the named operation and build
    /// the final provider request (renames applied, defaults filled).
    pub fn resolve(
        &self,
        operation: &str,
        caller_params: &Map<String, Value>,
    ) -> crate::Result<ProviderRequest> {
        let descriptor = self
            .operations
            .get(operation)
            .ok_or_else(|| AssistantError::UnknownOperation(operation.to_string()))?;

        for required in descriptor.required_params {
            if !caller_params.contains_key(*required) {
                return Err(AssistantError::MissingParameter(required.to_string()));
            }
        }

        let mut params = BTreeMap::new();

        for (key, value) in caller_params {
            let provider_key = descriptor
                .param_mapping
                .iter()
                .find(|&&(caller, _)| caller == key.as_str())
                .map(|&(_, provider)| provider)
                .unwrap_or(key.as_str());

            params.insert(provider_key.to_string(), stringify_value(value));
        }

        // Defaults never overwrite explicitly supplied values
        for (key, value) in descriptor.default_values {
            params
                .entry((*key).to_string())
                .or_insert_with(|| (*value).to_string());
        }

        Ok(ProviderRequest {
            endpoint: descriptor.endpoint.to_string(),
            params,
        })
    }

    /// Render the operation list for embedding in the classification prompt
    pub fn catalogue(&self) -> String {
        let mut lines = Vec::with_capacity(self.operations.len());

        for descriptor in self.operations.values() {
            let mut signature: Vec<String> = descriptor
                .required_params
                .iter()
                .map(|p| p.to_string())
                .collect();
            signature.extend(descriptor.optional_params.iter().map(|&p| {
                let default = descriptor
                    .default_values
                    .iter()
                    .find(|&&(key, _)| key == p)
                    .map(|&(_, value)| value);
                match default {
                    Some(value) => format!("{}=\"{}\"", p, value),
                    None => p.to_string(),
                }
            }));

            lines.push(format!(
                "- {}({}): {}",
                descriptor.name,
                signature.join(", "),
                descriptor.description
            ));
        }

        lines.join("\n")
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Query-parameter values are strings on the wire; JSON strings keep their
/// content, everything else uses its JSON rendering.
fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
