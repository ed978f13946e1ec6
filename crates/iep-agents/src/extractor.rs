// The Structured Extractor (C4): turns OCR page text into a `ParsedResult`
// via a tool-calling LLM loop. Grounded on `open_ai_agent.py::analyze_document`
// (turn cap, temperature 0, JSON-fence stripping, `_ensure_complete_english_sections`)
// and `parsing_agent/config.py::get_english_only_prompt` (prompt structure).

use std::sync::Arc;

use iep_core::content::ParsedResult;
use iep_core::sections::{CANONICAL_SECTIONS, MISSING_SECTION_PLACEHOLDER};
use iep_core::Section;

use crate::error::AgentError;
use crate::llm::{run_tool_loop, strip_json_fence, LlmClient, Tool};
use crate::ocr_tools::{GetAllOcrText, GetOcrTextForPage, GetOcrTextForPages, GetSectionInfo, OcrPageText};

fn system_prompt() -> String {
    let required_sections = CANONICAL_SECTIONS
        .iter()
        .map(|s| format!("- {}: {}", s.title, s.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert at reading Individualized Education Program (IEP) documents \
         and extracting them into structured data.\n\n\
         The document has been split into OCR pages. Use the provided tools to read the \
         pages you need; call `get_section_info` for extraction guidance on a specific \
         section before writing it.\n\n\
         You must produce exactly one entry for each of the following required sections, \
         in this order:\n{required_sections}\n\n\
         For each section, write clear, parent-friendly markdown content and record the \
         OCR page numbers the content was drawn from. If a section is genuinely absent \
         from the document, still include it with the content \"{placeholder}\" and an \
         empty page_numbers list — do not omit it.\n\n\
         Also extract:\n\
         - `summary`: a 2-4 sentence plain-language summary of the whole document.\n\
         - `document_index`: a short markdown table of contents listing each section \
           and the page(s) it starts on.\n\
         - `abbreviations`: every abbreviation used in the document paired with its full \
           form (e.g. {{\"abbreviation\": \"IEP\", \"full_form\": \"Individualized Education Program\"}}).\n\n\
         Respond with a single JSON object with exactly these keys: `summary` (string), \
         `sections` (array of {{title, content, page_numbers}}), `document_index` (string), \
         `abbreviations` (array of {{abbreviation, full_form}}). Do not wrap the JSON in \
         prose or markdown fences.",
        required_sections = required_sections,
        placeholder = MISSING_SECTION_PLACEHOLDER,
    )
}

fn ensure_sections_complete(sections: Vec<Section>) -> Vec<Section> {
    let mut by_title: std::collections::HashMap<String, Section> =
        sections.into_iter().map(|s| (s.title.clone(), s)).collect();

    CANONICAL_SECTIONS
        .iter()
        .map(|canonical| {
            by_title
                .remove(canonical.title)
                .unwrap_or_else(|| Section::placeholder(canonical.title))
        })
        .collect()
}

/// Runs the extraction agent over a document's OCR pages and returns a
/// `ParsedResult` with every canonical section present (I3).
pub async fn extract(
    client: &dyn LlmClient,
    model: &str,
    max_turns: u32,
    pages: Vec<OcrPageText>,
) -> Result<ParsedResult, AgentError> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GetAllOcrText::new(pages.clone())),
        Arc::new(GetOcrTextForPage::new(pages.clone())),
        Arc::new(GetOcrTextForPages::new(pages)),
        Arc::new(GetSectionInfo),
    ];

    let system = system_prompt();
    let user = "Extract the structured IEP content from this document using the tools provided.";

    let raw = run_tool_loop(client, model, &system, user, &tools, max_turns).await?;
    let cleaned = strip_json_fence(&raw);

    let mut result: ParsedResult = serde_json::from_str(cleaned)
        .map_err(|e| AgentError::InvalidJson(format!("extractor response: {}", e)))?;
    result.sections = ensure_sections_complete(result.sections);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, ChatResponse};
    use async_trait::async_trait;

    struct StubClient {
        response: String,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn chat(&self, _request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
            Ok(ChatResponse {
                content: Some(self.response.clone()),
                tool_calls: Vec::new(),
            })
        }
    }

    fn sample_pages() -> Vec<OcrPageText> {
        vec![OcrPageText { index: 1, content: "Goals: ...".to_string() }]
    }

    #[tokio::test]
    async fn extract_fills_missing_sections() {
        let client = StubClient {
            response: serde_json::json!({
                "summary": "A short summary.",
                "sections": [{"title": "Goals", "content": "Goal content", "page_numbers": [1]}],
                "document_index": "1. Goals",
                "abbreviations": []
            })
            .to_string(),
        };

        let result = extract(&client, "gpt-4.1", 5, sample_pages()).await.unwrap();
        assert_eq!(result.sections.len(), 9);
        let goals = result.sections.iter().find(|s| s.title == "Goals").unwrap();
        assert_eq!(goals.content, "Goal content");
        let present_levels = result.sections.iter().find(|s| s.title == "Present Levels").unwrap();
        assert_eq!(present_levels.content, MISSING_SECTION_PLACEHOLDER);
    }

    #[tokio::test]
    async fn extract_strips_json_fence() {
        let client = StubClient {
            response: format!(
                "```json\n{}\n```",
                serde_json::json!({
                    "summary": "s",
                    "sections": [],
                    "document_index": "",
                    "abbreviations": []
                })
            ),
        };

        let result = extract(&client, "gpt-4.1", 5, sample_pages()).await.unwrap();
        assert_eq!(result.sections.len(), 9);
    }

    #[tokio::test]
    async fn extract_rejects_invalid_json() {
        let client = StubClient { response: "not json".to_string() };
        let err = extract(&client, "gpt-4.1", 5, sample_pages()).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidJson(_)));
    }
}
