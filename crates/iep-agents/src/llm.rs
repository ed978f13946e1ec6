// A minimal OpenAI-compatible chat-completions transport plus a
// tool-calling loop shared by the Structured Extractor (C4) and the
// Translator (C7). Grounded on `open_ai_agent.py`'s `Agent`/`Runner`
// tool-call loop shape (temperature 0, bounded turns, tools as callables).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;
    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value;
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_call_type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    pub tools: &'a [Arc<dyn Tool>],
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError>;
}

/// Chat-completions transport against an OpenAI-compatible endpoint.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn tool_specs(tools: &[Arc<dyn Tool>]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters_schema(),
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        let mut payload = serde_json::json!({
            "model": request.model,
            "temperature": request.temperature,
            "messages": request.messages,
        });
        if !request.tools.is_empty() {
            payload["tools"] = serde_json::Value::Array(Self::tool_specs(request.tools));
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let message = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| AgentError::InvalidJson("response missing choices[0].message".to_string()))?;

        let content = message
            .get("content")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let tool_calls = message
            .get("tool_calls")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e: serde_json::Error| AgentError::InvalidJson(e.to_string()))?
            .unwrap_or_default();

        Ok(ChatResponse { content, tool_calls })
    }
}

/// Strips fenced code blocks an LLM response may wrap its JSON in, matching
/// every original handler's `content.replace('```json','').replace('```','')`.
pub fn strip_json_fence(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Runs the request/tool-call loop until the model responds without tool
/// calls, or `max_turns` is exceeded.
pub async fn run_tool_loop(
    client: &dyn LlmClient,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    tools: &[Arc<dyn Tool>],
    max_turns: u32,
) -> Result<String, AgentError> {
    let mut messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];

    for _ in 0..max_turns {
        let response = client
            .chat(ChatRequest {
                model,
                temperature: 0.0,
                messages: messages.clone(),
                tools,
            })
            .await?;

        if response.tool_calls.is_empty() {
            return Ok(response.content.unwrap_or_default());
        }

        messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: response.content.clone(),
            tool_call_id: None,
            tool_calls: response.tool_calls.clone(),
        });

        for call in &response.tool_calls {
            let tool = tools.iter().find(|t| t.name() == call.function.name);
            let result = match tool {
                Some(tool) => {
                    let args: serde_json::Value =
                        serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::Null);
                    tool.call(args).await
                }
                None => serde_json::json!({ "error": format!("unknown tool: {}", call.function.name) }),
            };
            messages.push(ChatMessage::tool_result(call.id.clone(), result.to_string()));
        }
    }

    Err(AgentError::MaxTurnsExceeded(max_turns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_json_fence_removes_code_fences() {
        assert_eq!(strip_json_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("{\"a\":1}"), "{\"a\":1}");
    }
}
