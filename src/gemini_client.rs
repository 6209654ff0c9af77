use std::env;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

/// Default endpoint base for Gemini's OpenAI-compatible API.
///
/// Reference: https://ai.google.dev/gemini-api/docs/openai
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Fatal startup errors: the process must not proceed past these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set. Please ensure it is defined in your .env file.")]
    MissingApiKey,

    #[error("invalid model endpoint base URL: {0}")]
    BadBaseUrl(#[from] url::ParseError),
}

/// Failures from a single model run. Surfaced once, never retried.
#[derive(Debug, Error)]
pub enum ModelRunError {
    #[error("request to model provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// A callable tool advertised to the model, in OpenAI function format.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// The outcome of one chat-completions request: the assistant text (possibly
/// empty) and any tool calls the model wants executed.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

pub struct GeminiClient {
    api_key: String,
    endpoint: Url,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Builds a client from the environment. `GEMINI_API_KEY` is required;
    /// `GEMINI_BASE_URL` overrides the default endpoint base.
    pub fn new() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        let mut base = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join("chat/completions")?;

        let client = reqwest::Client::new();

        Ok(Self {
            api_key,
            endpoint,
            client,
        })
    }

    /// Runs one chat-completions request.
    ///
    /// `messages` is the ordered (role, content) transcript; `instructions`
    /// is sent as the system message. The request is bounded by `timeout` so
    /// a stalled provider cannot block the turn indefinitely.
    pub async fn chat_completions(
        &self,
        model: &str,
        instructions: &str,
        messages: &[(&str, &str)],
        tools: &[ToolDefinition],
        timeout: Duration,
        log_payloads: bool,
    ) -> Result<ModelTurn, ModelRunError> {
        let mut formatted_messages = Vec::with_capacity(messages.len() + 1);

        formatted_messages.push(json!({
            "role": "system",
            "content": instructions
        }));

        for (role, content) in messages {
            formatted_messages.push(json!({
                "role": role,
                "content": content
            }));
        }

        let mut request_body = json!({
            "model": model,
            "messages": formatted_messages
        });

        if !tools.is_empty() {
            let formatted_tools = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters
                        }
                    })
                })
                .collect::<Vec<_>>();
            request_body["tools"] = Value::Array(formatted_tools);
        }

        if log_payloads {
            debug!(
                "Sending request to model provider: {}",
                serde_json::to_string(&request_body).unwrap_or_default()
            );
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Model provider request failed with status {}: {}", status, body);
            return Err(ModelRunError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response.json().await?;

        if log_payloads {
            debug!(
                "Received response from model provider: {}",
                serde_json::to_string(&response_json).unwrap_or_default()
            );
        }

        parse_turn(&response_json)
    }
}

fn parse_turn(response: &Value) -> Result<ModelTurn, ModelRunError> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ModelRunError::Malformed("no message in first choice".to_string()))?;

    let text = message
        .get("content")
        .and_then(|content| content.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(raw_calls) = message.get("tool_calls").and_then(|calls| calls.as_array()) {
        for raw_call in raw_calls {
            tool_calls.push(parse_tool_call(raw_call)?);
        }
    }

    if text.is_empty() && tool_calls.is_empty() {
        return Err(ModelRunError::Malformed(
            "first choice has neither content nor tool calls".to_string(),
        ));
    }

    Ok(ModelTurn { text, tool_calls })
}

fn parse_tool_call(raw_call: &Value) -> Result<ToolCall, ModelRunError> {
    let id = raw_call
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or("")
        .to_string();

    let function = raw_call
        .get("function")
        .ok_or_else(|| ModelRunError::Malformed("tool call without function".to_string()))?;

    let name = function
        .get("name")
        .and_then(|name| name.as_str())
        .ok_or_else(|| ModelRunError::Malformed("tool call without function name".to_string()))?
        .to_string();

    // Arguments arrive as a JSON-encoded string per the OpenAI wire format.
    let arguments = match function.get("arguments").and_then(|args| args.as_str()) {
        Some(encoded) => serde_json::from_str(encoded).map_err(|e| {
            ModelRunError::Malformed(format!("tool call arguments are not valid JSON: {e}"))
        })?,
        None => json!({}),
    };

    Ok(ToolCall {
        id,
        name,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_turn, ModelRunError};

    #[test]
    fn parses_plain_text_turn() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Your order is on its way."
                }
            }]
        });

        let turn = parse_turn(&response).unwrap();
        assert_eq!(turn.text, "Your order is on its way.");
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_call_turn() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_order_status",
                            "arguments": "{\"order_id\":\"123\",\"query\":\"check my order\"}"
                        }
                    }]
                }
            }]
        });

        let turn = parse_turn(&response).unwrap();
        assert!(turn.text.is_empty());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "get_order_status");
        assert_eq!(turn.tool_calls[0].arguments["order_id"], "123");
    }

    #[test]
    fn empty_choice_is_malformed() {
        let response = json!({
            "choices": [{
                "message": { "role": "assistant", "content": null }
            }]
        });

        let err = parse_turn(&response).unwrap_err();
        assert!(matches!(err, ModelRunError::Malformed(_)));
    }

    #[test]
    fn missing_choices_is_malformed() {
        let err = parse_turn(&json!({})).unwrap_err();
        assert!(matches!(err, ModelRunError::Malformed(_)));
    }

    #[test]
    fn bad_arguments_json_is_malformed() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_order_status",
                            "arguments": "not json"
                        }
                    }]
                }
            }]
        });

        let err = parse_turn(&response).unwrap_err();
        assert!(matches!(err, ModelRunError::Malformed(_)));
    }
}
