// Meeting-Notes Extractor (C5): a single no-tool LLM call that copies the
// "IEP meeting notes" section verbatim out of the OCR text. Grounded on
// `extract_meeting_notes/handler.py` + its `prompts.py`.

use crate::error::AgentError;
use crate::llm::{strip_json_fence, ChatMessage, ChatRequest, LlmClient};

const SYSTEM_PROMPT: &str =
    "You are a precise document extraction assistant that returns text exactly as written.";

const BASE_INSTRUCTIONS: &str = r#"You are extracting a specific section from an IEP document.
Locate the section titled "IEP meeting notes" (or similar variations like "Meeting Notes", "IEP Meeting Notes", etc.).
Extract the ENTIRE content of that section WORD-FOR-WORD with NO paraphrasing, summarization, or changes.

Return ONLY valid JSON in this format:
{
  "meeting_notes": "The complete verbatim text from the IEP meeting notes section"
}

If the section is not found, return:
{
  "meeting_notes": ""
}

Do not analyze, summarize, or modify the text in any way. Return it exactly as written."#;

#[derive(Debug, serde::Deserialize)]
struct MeetingNotesExtraction {
    #[serde(default)]
    meeting_notes: String,
}

/// Extracts the meeting-notes section verbatim, or an empty string if the
/// section is absent or the model's response fails to validate.
pub async fn extract_meeting_notes(
    client: &dyn LlmClient,
    model: &str,
    ocr_text: &str,
) -> Result<String, AgentError> {
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

    let parsed: MeetingNotesExtraction = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => MeetingNotesExtraction { meeting_notes: content.trim().to_string() },
    };

    Ok(parsed.meeting_notes.trim().to_string())
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
    async fn extract_meeting_notes_parses_valid_json() {
        let client = StubClient {
            response: serde_json::json!({ "meeting_notes": "We met on Jan 1." }).to_string(),
        };
        let result = extract_meeting_notes(&client, "gpt-5.1", "=== Page 1 ===\nnotes").await.unwrap();
        assert_eq!(result, "We met on Jan 1.");
    }

    #[tokio::test]
    async fn extract_meeting_notes_defaults_to_empty_when_absent() {
        let client = StubClient { response: serde_json::json!({ "meeting_notes": "" }).to_string() };
        let result = extract_meeting_notes(&client, "gpt-5.1", "no such section").await.unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn extract_meeting_notes_falls_back_to_raw_text_on_invalid_json() {
        let client = StubClient { response: "   verbatim text, not json   ".to_string() };
        let result = extract_meeting_notes(&client, "gpt-5.1", "text").await.unwrap();
        assert_eq!(result, "verbatim text, not json");
    }
}
