// The four read-only OCR tools given to the Structured Extractor (C4),
// grounded on `open_ai_agent.py`'s `_create_ocr_*_tool` factories plus
// `_create_section_info_tool`.

use async_trait::async_trait;
use iep_core::CANONICAL_SECTIONS;

use crate::llm::Tool;

#[derive(Debug, Clone)]
pub struct OcrPageText {
    pub index: u32,
    pub content: String,
}

pub struct GetAllOcrText {
    pages: Vec<OcrPageText>,
}

impl GetAllOcrText {
    pub fn new(pages: Vec<OcrPageText>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Tool for GetAllOcrText {
    fn name(&self) -> &str {
        "get_all_ocr_text"
    }

    fn description(&self) -> &str {
        "Returns the concatenated OCR text of every page, with `Page N:` markers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    async fn call(&self, _arguments: serde_json::Value) -> serde_json::Value {
        let combined = self
            .pages
            .iter()
            .map(|p| format!("Page {}:\n{}", p.index, p.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        serde_json::Value::String(format!("{}\n\nTotal pages: {}", combined, self.pages.len()))
    }
}

pub struct GetOcrTextForPage {
    pages: Vec<OcrPageText>,
}

impl GetOcrTextForPage {
    pub fn new(pages: Vec<OcrPageText>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Tool for GetOcrTextForPage {
    fn name(&self) -> &str {
        "get_ocr_text_for_page"
    }

    fn description(&self) -> &str {
        "Returns the OCR text of a single page by its index."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "page_index": { "type": "integer" } },
            "required": ["page_index"],
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value {
        let Some(index) = arguments.get("page_index").and_then(|v| v.as_u64()) else {
            return serde_json::json!({ "error": "missing page_index argument" });
        };
        match self.pages.iter().find(|p| p.index as u64 == index) {
            Some(page) => serde_json::Value::String(page.content.clone()),
            None => serde_json::Value::String(format!("ERROR: Page {} not found", index)),
        }
    }
}

pub struct GetOcrTextForPages {
    pages: Vec<OcrPageText>,
}

impl GetOcrTextForPages {
    pub fn new(pages: Vec<OcrPageText>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Tool for GetOcrTextForPages {
    fn name(&self) -> &str {
        "get_ocr_text_for_pages"
    }

    fn description(&self) -> &str {
        "Returns the OCR text for several pages at once, given their indices."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "page_indices": { "type": "array", "items": { "type": "integer" } } },
            "required": ["page_indices"],
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value {
        let indices: Vec<u64> = arguments
            .get("page_indices")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())
            .unwrap_or_default();

        let parts: Vec<String> = indices
            .iter()
            .filter_map(|idx| {
                self.pages
                    .iter()
                    .find(|p| p.index as u64 == *idx)
                    .map(|p| format!("Page {}:\n{}", idx, p.content))
            })
            .collect();
        serde_json::Value::String(parts.join("\n\n"))
    }
}

pub struct GetSectionInfo;

#[async_trait]
impl Tool for GetSectionInfo {
    fn name(&self) -> &str {
        "get_section_info"
    }

    fn description(&self) -> &str {
        "Returns the description and extraction guidance for one of the required IEP sections."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "section_name": { "type": "string" } },
            "required": ["section_name"],
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> serde_json::Value {
        let Some(name) = arguments.get("section_name").and_then(|v| v.as_str()) else {
            return serde_json::json!({ "error": "missing section_name argument" });
        };
        match CANONICAL_SECTIONS.iter().find(|s| s.title == name) {
            Some(section) => serde_json::json!({
                "section_name": section.title,
                "description": section.description,
                "key_points": section.guidance,
            }),
            None => serde_json::json!({
                "error": "Unknown section",
                "available_sections": CANONICAL_SECTIONS.iter().map(|s| s.title).collect::<Vec<_>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pages() -> Vec<OcrPageText> {
        vec![
            OcrPageText { index: 1, content: "first page".to_string() },
            OcrPageText { index: 2, content: "second page".to_string() },
        ]
    }

    #[tokio::test]
    async fn get_all_ocr_text_concatenates_pages() {
        let tool = GetAllOcrText::new(sample_pages());
        let result = tool.call(serde_json::Value::Null).await;
        let text = result.as_str().unwrap();
        assert!(text.contains("Page 1:\nfirst page"));
        assert!(text.contains("Total pages: 2"));
    }

    #[tokio::test]
    async fn get_ocr_text_for_page_reports_missing_page() {
        let tool = GetOcrTextForPage::new(sample_pages());
        let result = tool.call(serde_json::json!({ "page_index": 9 })).await;
        assert_eq!(result.as_str().unwrap(), "ERROR: Page 9 not found");
    }

    #[tokio::test]
    async fn get_section_info_returns_guidance_for_known_section() {
        let tool = GetSectionInfo;
        let result = tool.call(serde_json::json!({ "section_name": "Goals" })).await;
        assert_eq!(result["section_name"], "Goals");
        assert!(result["key_points"].is_string());
    }

    #[tokio::test]
    async fn get_section_info_rejects_unknown_section() {
        let tool = GetSectionInfo;
        let result = tool.call(serde_json::json!({ "section_name": "Unknown" })).await;
        assert_eq!(result["error"], "Unknown section");
    }
}
