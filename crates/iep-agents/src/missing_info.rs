// Missing-Info Reviewer (C6): a single no-tool LLM call producing a list of
// compliance/quality findings. Grounded on
// `identify-missing-info/lambda_function.py` + its `prompts.py`.

use iep_core::MissingInfoItem;

use crate::error::AgentError;
use crate::llm::{strip_json_fence, ChatMessage, ChatRequest, LlmClient};

const SYSTEM_PROMPT: &str =
    "You are a meticulous special education IEP reviewer who writes short, clear findings.";

const BASE_INSTRUCTIONS: &str = r#"You are an expert IEP compliance and quality reviewer assisting a parent.
Given the OCR text of a single IEP, produce ONE concise JSON array (no wrapper object).

Each array element must be an object with fields:
- description: short, parent-friendly statement of what is missing/unclear and why it matters (required)
- category: the IEP section or topic this relates to (optional)

Return ONLY valid JSON for the array, e.g.:
[
  { "description": "Present levels do not include reading fluency data.", "category": "Present Levels" },
  { "description": "No measurable goal for written expression; criteria and timeframe unclear.", "category": "Annual Goals" }
]

Guidelines:
- Be specific, actionable, and non-judgmental.
- Do not hallucinate; only infer based on text provided.
- If uncertain, include the item but say "potentially missing" in the description."#;

/// Tolerant JSON normalization matching `MissingInfoList.from_any`: the model
/// may return a bare array, or wrap it under `items`/`missing_items`/
/// `weak_items`/`results`, or return a single object/string.
fn normalize(data: serde_json::Value) -> Vec<serde_json::Value> {
    match data {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(ref map) => {
            for key in ["items", "missing_items", "weak_items", "results"] {
                if let Some(serde_json::Value::Array(items)) = map.get(key) {
                    return items.clone();
                }
            }
            vec![data]
        }
        serde_json::Value::String(ref s) if !s.trim().is_empty() => {
            vec![serde_json::json!({ "description": s.trim() })]
        }
        _ => Vec::new(),
    }
}

/// Parses one candidate item, dropping it (rather than erroring the whole
/// review) if its `description` is missing or blank after trimming.
fn parse_item(value: serde_json::Value) -> Option<MissingInfoItem> {
    let description = value.get("description")?.as_str()?.trim().to_string();
    if description.is_empty() {
        return None;
    }
    let category = value
        .get("category")
        .and_then(|c| c.as_str())
        .map(str::to_string);
    Some(MissingInfoItem { description, category })
}

/// Runs the missing-info review and returns whatever findings survive
/// normalization and validation. Never errors on a malformed model
/// response — an empty list is a valid (if uninteresting) result.
pub async fn review_missing_info(
    client: &dyn LlmClient,
    model: &str,
    ocr_text: &str,
) -> Result<Vec<MissingInfoItem>, AgentError> {
    let user_prompt = format!("{}\n\nOCR_TEXT:\n{}", BASE_INSTRUCTIONS, ocr_text);

    let response = client
        .chat(ChatRequest {
            model,
            temperature: 0.0,
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)],
            tools: &[],
        })
        .await?;

    let content = response.content.unwrap_or_default();
    let cleaned = strip_json_fence(&content);

    let parsed: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(content),
    };

    let items = normalize(parsed)
        .into_iter()
        .filter_map(parse_item)
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatResponse;
    use async_trait::async_trait;

    struct StubClient {
        response: String,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn chat(&self, _request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
            Ok(ChatResponse { content: Some(self.response.clone()), tool_calls: Vec::new() })
        }
    }

    #[tokio::test]
    async fn review_missing_info_parses_bare_array() {
        let client = StubClient {
            response: serde_json::json!([
                { "description": "Missing reading fluency data.", "category": "Present Levels" }
            ])
            .to_string(),
        };
        let items = review_missing_info(&client, "gpt-4.1", "text").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category.as_deref(), Some("Present Levels"));
    }

    #[tokio::test]
    async fn review_missing_info_unwraps_wrapper_keys() {
        let client = StubClient {
            response: serde_json::json!({ "missing_items": [{ "description": "No consent date." }] })
                .to_string(),
        };
        let items = review_missing_info(&client, "gpt-4.1", "text").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "No consent date.");
    }

    #[tokio::test]
    async fn review_missing_info_drops_blank_descriptions() {
        let client = StubClient {
            response: serde_json::json!([{ "description": "   " }, { "description": "Real finding." }])
                .to_string(),
        };
        let items = review_missing_info(&client, "gpt-4.1", "text").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Real finding.");
    }

    #[tokio::test]
    async fn review_missing_info_returns_empty_on_malformed_response() {
        let client = StubClient { response: "not valid json at all".to_string() };
        let items = review_missing_info(&client, "gpt-4.1", "text").await.unwrap();
        assert!(items.is_empty());
    }
}
