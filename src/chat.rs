//! Conversation manager
//!
//! Drives one full turn: route the query, optionally fetch market data,
//! compose the outbound prompt, stream the Gemini answer, and record the
//! turn in the session. Every completed turn appends exactly one user
//! message and one assistant message, in that order, even when generation
//! fails. A data-fetch failure never blocks the conversational turn.

use crate::config::Config;
use crate::gateway::MarketDataGateway;
use crate::gemini::{Content, GeminiClient, GenerationConfig};
use crate::registry::OperationRegistry;
use crate::router::{Router, RoutingDecision};
use crate::session::{ChatSession, Role, HISTORY_EXCHANGE_CAP, PERSONA};
use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};
use tracing::{error, info, warn};

/// Recorded as the assistant turn whenever generation fails
pub const APOLOGY: &str = "I'm sorry, I encountered an error. Please try again later.";

/// Fixed model turn separating persona instructions from the live query
const CONTEXT_ACK: &str = "I understand my role as Flaix, a financial assistant for Indian users. I'll provide helpful information about investing and financial planning in simple language.";

pub struct ChatEngine {
    router: Router,
    registry: std::sync::Arc<OperationRegistry>,
    gateway: MarketDataGateway,
    gemini: GeminiClient,
}

impl ChatEngine {
    pub fn new(config: &Config) -> crate::Result<Self> {
        let registry = std::sync::Arc::new(OperationRegistry::new());
        let gemini = GeminiClient::new(&config.gemini_base_url, config.gemini_api_key.clone())?;
        let gateway =
            MarketDataGateway::new(&config.market_base_url, config.market_api_key.clone())?;
        let router = Router::new(gemini.clone(), registry.clone());

        Ok(Self {
            router,
            registry,
            gateway,
            gemini,
        })
    }

    /// Produce the assistant's answer for one turn as a finite,
    /// non-restartable stream of text fragments.
    ///
    /// The session is mutated exactly once, after the stream is exhausted;
    /// dropping the stream early leaves the history untouched.
    pub fn respond<'a>(
        &'a self,
        session: &'a mut ChatSession,
        query: String,
    ) -> impl Stream<Item = String> + 'a {
        stream! {
            let decision = self.router.route(&query).await;
            let data_context = self.fetch_data_context(&decision).await;

            let contents = compose_contents(session, &query, data_context.as_deref());
            let mut answer = String::new();

            match self
                .gemini
                .generate_stream(contents, GenerationConfig::answer())
                .await
            {
                Ok(fragments) => {
                    pin_mut!(fragments);
                    let mut failed = false;

                    while let Some(fragment) = fragments.next().await {
                        match fragment {
                            Ok(text) => {
                                answer.push_str(&text);
                                yield text;
                            }
                            Err(e) => {
                                error!("Generation stream failed: {}", e);
                                failed = true;
                                break;
                            }
                        }
                    }

                    // Partial output is replaced by the apology, never
                    // recorded as the assistant's turn.
                    if failed {
                        answer = APOLOGY.to_string();
                        yield APOLOGY.to_string();
                    }
                }
                Err(e) => {
                    error!("Generation call failed: {}", e);
                    answer = APOLOGY.to_string();
                    yield APOLOGY.to_string();
                }
            }

            session.push_user(query);
            session.push_assistant(answer);
        }
    }

    /// Resolve and fetch market data for a routing decision.
    ///
    /// Registry rejections and gateway failures are logged and absorbed;
    /// the turn proceeds without data context.
    async fn fetch_data_context(&self, decision: &RoutingDecision) -> Option<String> {
        if !decision.needs_data {
            return None;
        }

        let operation = decision.operation.as_deref()?;

        let request = match self.registry.resolve(operation, &decision.parameters) {
            Ok(request) => request,
            Err(e) => {
                warn!("Skipping data augmentation: {}", e);
                return None;
            }
        };

        match self.gateway.fetch(&request).await {
            Ok(value) => {
                info!(operation, "Market data fetched");
                match serialize_data_context(&value) {
                    Ok(serialized) => Some(serialized),
                    Err(e) => {
                        warn!("Market data unserializable: {}", e);
                        Some(value.to_string())
                    }
                }
            }
            Err(e) => {
                warn!("Proceeding without market data: {}", e);
                None
            }
        }
    }
}

/// Human-readable rendering of provider JSON for the prompt annotation
fn serialize_data_context(value: &serde_json::Value) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Compose the outbound Gemini turns: persona + prior exchanges, the fixed
/// acknowledgment, then the live query with any data context annotated.
fn compose_contents(
    session: &ChatSession,
    query: &str,
    data_context: Option<&str>,
) -> Vec<Content> {
    vec![
        Content::user(compose_system_message(session)),
        Content::model(CONTEXT_ACK),
        Content::user(compose_user_turn(query, data_context)),
    ]
}

/// Persona instructions plus up to the last four prior exchanges rendered
/// as plain User/Assistant lines. The bootstrap pair is never included.
fn compose_system_message(session: &ChatSession) -> String {
    let mut message = PERSONA.to_string();

    let recent = session.recent_exchanges(HISTORY_EXCHANGE_CAP);
    if !recent.is_empty() {
        message.push_str("\n\nPrevious conversation:\n");
        for entry in recent {
            let speaker = match entry.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            message.push_str(&format!("{}: {}\n", speaker, entry.content));
        }
    }

    message
}

/// The user's words, with fetched market data appended as a system-style
/// annotation distinguishable from the query itself.
fn compose_user_turn(query: &str, data_context: Option<&str>) -> String {
    match data_context {
        Some(data) => format!(
            "{}\n\n[SYSTEM NOTE: Here is the real-time market data from the Indian Stock Market API:\n{}\n\nPlease use this data to provide an informative response to the user's query.]",
            query, data
        ),
        None => query.to_string(),
    }
}
