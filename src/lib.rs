//! Flaix — conversational financial assistant
//!
//! Answers free-text finance questions, optionally augmented with live
//! Indian stock-market data:
//! - Routes each query through a low-temperature Gemini classification
//! - Validates the routed operation against a static registry
//! - Fetches provider JSON and annotates the prompt with it
//! - Streams the conversational answer back fragment by fragment
//!
//! TURN PIPELINE:
//! QUERY → ROUTE → [FETCH DATA] → COMPOSE → STREAM ANSWER → RECORD

pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod registry;
pub mod router;
pub mod session;

pub use error::{AssistantError, Result};

// Re-export common types
pub use chat::ChatEngine;
pub use config::Config;
pub use router::RoutingDecision;
pub use session::ChatSession;
