//! Per-turn routing: guardrail, support run with tool execution, escalation.

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use crate::cli::chat::agents::{AgentConfig, AgentRole, AgentSet, RunConfig};
use crate::cli::chat::conversation_state::Message;
use crate::cli::chat::guardrail::{self, RESPECT_NOTICE};
use crate::cli::chat::tools::{OrderLookup, ORDER_LOOKUP_TOOL};
use crate::gemini_client::{GeminiClient, ModelRunError, ModelTurn, ToolCall};

/// Upper bound on tool rounds within a single agent run.
const MAX_TOOL_ROUNDS: usize = 4;

/// Seam between the dispatcher and the model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn run(
        &self,
        agent: &AgentConfig,
        history: &[Message],
        cfg: &RunConfig,
    ) -> Result<ModelTurn, ModelRunError>;
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn run(
        &self,
        agent: &AgentConfig,
        history: &[Message],
        cfg: &RunConfig,
    ) -> Result<ModelTurn, ModelRunError> {
        let messages = history
            .iter()
            .map(|message| (message.role.as_str(), message.content.as_str()))
            .collect::<Vec<_>>();

        self.chat_completions(
            &cfg.model,
            &agent.instructions,
            &messages,
            &agent.tools,
            cfg.request_timeout,
            cfg.log_payloads,
        )
        .await
    }
}

/// How a turn ended, from the session controller's point of view.
///
/// Only `Completed` carries a canonical history; on the other variants the
/// caller leaves the stored transcript at its pre-turn state and may retry
/// the same turn.
pub enum TurnOutcome {
    Completed {
        reply: String,
        history: Vec<Message>,
    },
    Blocked {
        notice: &'static str,
    },
    Failed {
        reply: String,
    },
}

pub struct AgentDispatcher<C> {
    client: C,
    run_config: RunConfig,
    agents: AgentSet,
    order_lookup: OrderLookup,
}

impl<C: ModelClient> AgentDispatcher<C> {
    pub fn new(
        client: C,
        run_config: RunConfig,
        agents: AgentSet,
        order_lookup: OrderLookup,
    ) -> Self {
        Self {
            client,
            run_config,
            agents,
            order_lookup,
        }
    }

    /// Handles one turn. `history` already ends with the latest user message;
    /// `latest_user_text` is that message's raw text.
    pub async fn dispatch(&self, history: &[Message], latest_user_text: &str) -> TurnOutcome {
        if guardrail::is_blocked(latest_user_text) {
            info!("Guardrail blocked the message; no agent run");
            return TurnOutcome::Blocked {
                notice: RESPECT_NOTICE,
            };
        }

        let (mut reply, mut canonical) =
            match self.run_agent(AgentRole::Support, history).await {
                Ok(run) => run,
                Err(e) => return Self::failed(e),
            };

        if let Some(role) = escalation_target(&reply, latest_user_text) {
            info!("Escalating to {}", self.agents.get(role).name);
            // The handoff agent sees the original pre-run history, not the
            // support agent's output history.
            match self.run_agent(role, history).await {
                Ok((handoff_reply, handoff_history)) => {
                    reply = handoff_reply;
                    canonical = handoff_history;
                }
                Err(e) => return Self::failed(e),
            }
        }

        TurnOutcome::Completed {
            reply,
            history: canonical,
        }
    }

    /// One agent run: invokes the model, executing tool calls and feeding
    /// their results back until the model produces plain text.
    async fn run_agent(
        &self,
        role: AgentRole,
        history: &[Message],
    ) -> Result<(String, Vec<Message>), ModelRunError> {
        let agent = self.agents.get(role);
        let mut working = history.to_vec();

        for _ in 0..=MAX_TOOL_ROUNDS {
            let turn = self.client.run(agent, &working, &self.run_config).await?;

            if turn.tool_calls.is_empty() {
                working.push(Message::assistant(turn.text.clone()));
                return Ok((turn.text, working));
            }

            for call in &turn.tool_calls {
                let result = self.execute_tool_call(call);
                working.push(Message::assistant(format!("Tool call: {}", render_call(call))));
                working.push(Message::user(format!("Tool result: {result}")));
            }
        }

        Err(ModelRunError::Malformed(format!(
            "model kept requesting tools after {MAX_TOOL_ROUNDS} rounds"
        )))
    }

    fn execute_tool_call(&self, call: &ToolCall) -> String {
        match call.name.as_str() {
            ORDER_LOOKUP_TOOL => {
                let order_id = call
                    .arguments
                    .get("order_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let query = call
                    .arguments
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                self.order_lookup.lookup(order_id, query)
            }
            other => {
                // Feed the mistake back to the model instead of aborting.
                warn!("Model requested unknown tool: {}", other);
                format!("Unknown tool: {other}")
            }
        }
    }

    fn failed(error: ModelRunError) -> TurnOutcome {
        error!("Model run failed: {}", error);
        TurnOutcome::Failed {
            reply: format!("❌ Error: {error}"),
        }
    }
}

/// Decides whether the turn escalates, and to which role.
///
/// Either trigger alone escalates, even when the support agent has already
/// answered; the user asking for escalation always wins.
pub fn escalation_target(reply: &str, latest_user_text: &str) -> Option<AgentRole> {
    if reply.contains("I don't know") || latest_user_text.to_lowercase().contains("escalate") {
        Some(AgentRole::Handoff)
    } else {
        None
    }
}

fn render_call(call: &ToolCall) -> String {
    json!({
        "name": call.name,
        "parameters": call.arguments
    })
    .to_string()
}
