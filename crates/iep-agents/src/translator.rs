// Translator (C7): a tool-calling LLM loop that translates either a
// `ParsedResult`-shaped payload or a meeting-notes string into a target
// language, falling back to the untranslated content on any validation
// failure. Grounded on `translate_content/translation_agent.py`.

use std::sync::Arc;

use async_trait::async_trait;
use iep_core::PayloadKind;

use crate::error::AgentError;
use crate::glossary::{language_context, lookup_term};
use crate::llm::{run_tool_loop, strip_json_fence, LlmClient, Tool};

struct LanguageContextTool;

#[async_trait]
impl Tool for LanguageContextTool {
    fn name(&self) -> &str {
        "get_language_context_for_translation"
    }

    fn description(&self) -> &str {
        "Get comprehensive translation guidelines for a target language."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "target_language": { "type": "string" } },
            "required": ["target_language"],
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value {
        let target = arguments.get("target_language").and_then(|v| v.as_str()).unwrap_or("");
        serde_json::Value::String(language_context(target))
    }
}

struct TerminologyTool;

#[async_trait]
impl Tool for TerminologyTool {
    fn name(&self) -> &str {
        "get_iep_terminology"
    }

    fn description(&self) -> &str {
        "Look up an IEP-specific term's translation in the target language glossary."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "term": { "type": "string" },
                "target_language": { "type": "string" },
            },
            "required": ["term", "target_language"],
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value {
        let term = arguments.get("term").and_then(|v| v.as_str()).unwrap_or("");
        let target = arguments.get("target_language").and_then(|v| v.as_str()).unwrap_or("");
        serde_json::Value::String(lookup_term(term, target))
    }
}

fn optimized_prompt(target_language: &str, kind: PayloadKind) -> String {
    let (content_description, tone_guidance, output_format) = match kind {
        PayloadKind::MeetingNotes => (
            "IEP meeting notes that document what was discussed and decided during the meeting",
            "- Be supportive and informative\n\
             - Preserve the exact meaning and tone of the original\n\
             - Maintain all details and specifics from the original text\n\
             - Keep the same structure and format",
            "Simple string with the translated meeting notes text",
        ),
        PayloadKind::Parsed | PayloadKind::MissingInfo => (
            "IEP document content including summaries, sections, document index, and abbreviations",
            "- Use a warm, supportive tone appropriate for parents reading about their child's IEP\n\
             - For abbreviations: translate full forms, keep abbreviation codes in English\n\
             - Maintain educational accuracy while being parent-friendly\n\
             - Use simple language while preserving legal/educational meaning",
            "Structured JSON with the same field names as the input",
        ),
    };

    format!(
        "You are an expert IEP translator using tools for accuracy and consistency.\n\n\
         TRANSLATION TASK:\n\
         Translate English {content_description} to {target_language} while preserving JSON structure.\n\n\
         TOOLS AVAILABLE:\n\
         1. get_language_context_for_translation() - guidelines for the target language\n\
         2. get_iep_terminology() - look up a specific IEP term's translation\n\n\
         WORKFLOW:\n\
         1. FIRST call get_language_context_for_translation(\"{target_language}\") for guidelines\n\
         2. For IEP-specific terms, call get_iep_terminology(term, \"{target_language}\")\n\
         3. Apply the guidelines consistently throughout the translation\n\
         4. Maintain exact JSON structure and field names\n\n\
         QUALITY GUIDELINES:\n{tone_guidance}\n\n\
         TECHNICAL REQUIREMENTS:\n\
         - Do NOT translate JSON keys, field names, or section titles\n\
         - Maintain exact data structure and hierarchy\n\
         - Preserve page numbers, dates, IDs unchanged\n\
         - Output ONLY valid JSON, no surrounding prose\n\n\
         OUTPUT FORMAT: {output_format}",
        content_description = content_description,
        target_language = target_language,
        tone_guidance = tone_guidance,
        output_format = output_format,
    )
}

/// Translates `content` to `target_language`. On any tool-loop, JSON, or
/// validation failure, returns `content` unchanged rather than erroring —
/// translation is best-effort, never a pipeline-fatal step.
pub async fn translate(
    client: &dyn LlmClient,
    model: &str,
    max_turns: u32,
    kind: PayloadKind,
    target_language: &str,
    content: &serde_json::Value,
) -> serde_json::Value {
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(LanguageContextTool), Arc::new(TerminologyTool)];
    let system_prompt = optimized_prompt(target_language, kind);
    let content_json = match serde_json::to_string_pretty(content) {
        Ok(json) => json,
        Err(_) => return content.clone(),
    };
    let user_prompt = format!(
        "Translate this {} content to {}:\n\n{}",
        kind.as_str(),
        target_language,
        content_json
    );

    let raw = match run_tool_loop(client, model, &system_prompt, &user_prompt, &tools, max_turns).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, %target_language, "translation agent failed, keeping untranslated content");
            return content.clone();
        }
    };

    let cleaned = strip_json_fence(&raw);
    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(translated) => translated,
        Err(err) => {
            tracing::warn!(error = %err, %target_language, "translation output was not valid json, keeping untranslated content");
            content.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, ChatResponse};

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
    async fn translate_returns_parsed_json_on_success() {
        let client = StubClient { response: serde_json::json!({ "summary": "Resumen." }).to_string() };
        let content = serde_json::json!({ "summary": "Summary." });
        let result = translate(&client, "gpt-4.1", 5, PayloadKind::Parsed, "es", &content).await;
        assert_eq!(result["summary"], "Resumen.");
    }

    #[tokio::test]
    async fn translate_falls_back_to_original_on_invalid_json() {
        let client = StubClient { response: "not json".to_string() };
        let content = serde_json::json!({ "summary": "Summary." });
        let result = translate(&client, "gpt-4.1", 5, PayloadKind::Parsed, "es", &content).await;
        assert_eq!(result, content);
    }

    #[tokio::test]
    async fn translate_strips_json_fence() {
        let client = StubClient {
            response: format!("```json\n{}\n```", serde_json::json!({ "meeting_notes": "Notas." })),
        };
        let content = serde_json::json!({ "meeting_notes": "Notes." });
        let result = translate(&client, "gpt-4.1", 5, PayloadKind::MeetingNotes, "es", &content).await;
        assert_eq!(result["meeting_notes"], "Notas.");
    }
}
