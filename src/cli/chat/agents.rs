use std::time::Duration;

use serde_json::json;

use crate::cli::chat::tools::ORDER_LOOKUP_TOOL;
use crate::gemini_client::{ToolDefinition, DEFAULT_MODEL};

/// Closed set of agent roles a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// First responder; has access to the order lookup tool.
    Support,
    /// Human-style takeover agent; no tools.
    Handoff,
}

/// A named agent: instructions plus the tools it may call. Immutable after
/// construction.
pub struct AgentConfig {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// The per-session pair of agents, selected by role.
pub struct AgentSet {
    support: AgentConfig,
    handoff: AgentConfig,
}

impl AgentSet {
    pub fn customer_support() -> Self {
        let support = AgentConfig {
            name: "BotAgent".to_string(),
            instructions: "You are a helpful customer support assistant. \
                           Answer FAQs, check order status, or escalate if needed."
                .to_string(),
            tools: vec![order_lookup_definition()],
        };

        let handoff = AgentConfig {
            name: "HumanAgent".to_string(),
            instructions: "You are a friendly human support agent. \
                           Take over if bot cannot handle."
                .to_string(),
            tools: Vec::new(),
        };

        Self { support, handoff }
    }

    pub fn get(&self, role: AgentRole) -> &AgentConfig {
        match role {
            AgentRole::Support => &self.support,
            AgentRole::Handoff => &self.handoff,
        }
    }
}

fn order_lookup_definition() -> ToolDefinition {
    ToolDefinition {
        name: ORDER_LOOKUP_TOOL.to_string(),
        description: "Look up the current status of a customer order".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "order_id": {
                    "type": "string",
                    "description": "The order identifier to look up"
                },
                "query": {
                    "type": "string",
                    "description": "The user's request, used to decide whether lookup applies"
                }
            },
            "required": ["order_id"]
        }),
    }
}

/// Model-run settings, constructed once per session and reused for every run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    pub request_timeout: Duration,
    pub log_payloads: bool,
}

impl RunConfig {
    pub fn new(log_payloads: bool) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            log_payloads,
        }
    }
}
