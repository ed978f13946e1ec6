// Per-item validation for a translated parsing-result payload. Grounded on
// `translation_agent.py::_validate_parsing_result`: each section and
// abbreviation in the translated array is validated independently, and a
// single malformed item falls back to its untranslated shape rather than
// discarding the whole translated payload for that language.

use iep_core::content::ParsedResult;
use iep_core::{Abbreviation, Section};
use serde::Deserialize;

/// Tolerant coercion target for one translated section. Requires `title`
/// and `content` as strings; `page_numbers` defaults to empty and silently
/// drops any non-numeric entries, mirroring the pydantic model's laxer
/// validation compared to the extractor's strict `Section`.
pub struct TranslationSectionContent(pub Section);

impl<'de> Deserialize<'de> for TranslationSectionContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("translated section must be a JSON object"))?;
        let title = obj
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| serde::de::Error::custom("translated section missing 'title'"))?
            .to_string();
        let content = obj
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| serde::de::Error::custom("translated section missing 'content'"))?
            .to_string();
        let page_numbers = obj
            .get("page_numbers")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|n| n.as_u64().map(|n| n as u32)).collect())
            .unwrap_or_default();
        Ok(TranslationSectionContent(Section { title, content, page_numbers }))
    }
}

/// Tolerant coercion target for one translated abbreviation entry.
pub struct AbbreviationLegend(pub Abbreviation);

impl<'de> Deserialize<'de> for AbbreviationLegend {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("translated abbreviation must be a JSON object"))?;
        let abbreviation = obj
            .get("abbreviation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| serde::de::Error::custom("translated abbreviation missing 'abbreviation'"))?
            .to_string();
        let full_form = obj
            .get("full_form")
            .and_then(|v| v.as_str())
            .ok_or_else(|| serde::de::Error::custom("translated abbreviation missing 'full_form'"))?
            .to_string();
        Ok(AbbreviationLegend(Abbreviation { abbreviation, full_form }))
    }
}

/// Reads `field` off `value` as an array, accepting either a bare JSON
/// array or a `{"items": [...]}` wrapper (the translator occasionally
/// returns the latter when the model wraps its own output).
fn array_field<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a Vec<serde_json::Value>> {
    let field_value = value.get(field)?;
    if let Some(arr) = field_value.as_array() {
        return Some(arr);
    }
    field_value.get("items").and_then(|v| v.as_array())
}

/// Coerces a translator's raw JSON response for a `parsed` payload into a
/// `ParsedResult`, validating `sections`/`abbreviations` item by item
/// against `english` (the pre-translation result): an item that fails
/// validation falls back to its English original at the same index rather
/// than failing the whole language's translation. `summary`/`document_index`
/// fall back the same way if missing or not a string.
pub fn coerce_parsed_translation(translated: &serde_json::Value, english: &ParsedResult) -> ParsedResult {
    let summary = translated
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| english.summary.clone());

    let document_index = translated
        .get("document_index")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| english.document_index.clone());

    let sections = match array_field(translated, "sections") {
        Some(items) => english
            .sections
            .iter()
            .enumerate()
            .map(|(i, fallback)| {
                coerce_item::<TranslationSectionContent, Section>(items.get(i), fallback, "section", &fallback.title)
            })
            .collect(),
        None => english.sections.clone(),
    };

    let abbreviations = match array_field(translated, "abbreviations") {
        Some(items) => english
            .abbreviations
            .iter()
            .enumerate()
            .map(|(i, fallback)| {
                coerce_item::<AbbreviationLegend, Abbreviation>(items.get(i), fallback, "abbreviation", &fallback.abbreviation)
            })
            .collect(),
        None => english.abbreviations.clone(),
    };

    ParsedResult { summary, sections, document_index, abbreviations }
}

fn coerce_item<T, Out>(raw: Option<&serde_json::Value>, fallback: &Out, kind: &str, label: &str) -> Out
where
    T: serde::de::DeserializeOwned + Into<Out>,
    Out: Clone,
{
    match raw.and_then(|item| serde_json::from_value::<T>(item.clone()).ok()) {
        Some(coerced) => coerced.into(),
        None => {
            tracing::warn!(%kind, %label, "translated item failed validation, keeping untranslated item");
            fallback.clone()
        }
    }
}

impl From<TranslationSectionContent> for Section {
    fn from(value: TranslationSectionContent) -> Self {
        value.0
    }
}

impl From<AbbreviationLegend> for Abbreviation {
    fn from(value: AbbreviationLegend) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> ParsedResult {
        ParsedResult {
            summary: "English summary.".to_string(),
            sections: vec![
                Section { title: "Present Levels".to_string(), content: "English present levels.".to_string(), page_numbers: vec![1] },
                Section { title: "Goals".to_string(), content: "English goals.".to_string(), page_numbers: vec![2] },
            ],
            document_index: "English index.".to_string(),
            abbreviations: vec![Abbreviation { abbreviation: "IEP".to_string(), full_form: "Individualized Education Program".to_string() }],
        }
    }

    #[test]
    fn keeps_all_valid_translated_items() {
        let translated = serde_json::json!({
            "summary": "Resumen.",
            "document_index": "Indice.",
            "sections": [
                { "title": "Present Levels", "content": "Niveles actuales.", "page_numbers": [1] },
                { "title": "Goals", "content": "Metas.", "page_numbers": [2] },
            ],
            "abbreviations": [ { "abbreviation": "IEP", "full_form": "Programa de Educacion Individualizado" } ],
        });
        let result = coerce_parsed_translation(&translated, &english());
        assert_eq!(result.summary, "Resumen.");
        assert_eq!(result.sections[0].content, "Niveles actuales.");
        assert_eq!(result.sections[1].content, "Metas.");
        assert_eq!(result.abbreviations[0].full_form, "Programa de Educacion Individualizado");
    }

    #[test]
    fn falls_back_to_english_section_when_one_item_is_malformed() {
        let translated = serde_json::json!({
            "summary": "Resumen.",
            "document_index": "Indice.",
            "sections": [
                { "title": "Present Levels", "content": "Niveles actuales.", "page_numbers": [1] },
                { "title": 12345 },
            ],
            "abbreviations": [ { "abbreviation": "IEP", "full_form": "Programa de Educacion Individualizado" } ],
        });
        let result = coerce_parsed_translation(&translated, &english());
        assert_eq!(result.sections[0].content, "Niveles actuales.");
        assert_eq!(result.sections[1], english().sections[1]);
        assert_eq!(result.abbreviations[0].full_form, "Programa de Educacion Individualizado");
    }

    #[test]
    fn accepts_items_wrapper_object_in_place_of_bare_array() {
        let translated = serde_json::json!({
            "summary": "Resumen.",
            "document_index": "Indice.",
            "sections": { "items": [
                { "title": "Present Levels", "content": "Niveles actuales.", "page_numbers": [1] },
                { "title": "Goals", "content": "Metas.", "page_numbers": [2] },
            ]},
            "abbreviations": { "items": [] },
        });
        let result = coerce_parsed_translation(&translated, &english());
        assert_eq!(result.sections[0].content, "Niveles actuales.");
        assert_eq!(result.sections[1].content, "Metas.");
    }

    #[test]
    fn falls_back_entirely_when_sections_field_is_absent() {
        let translated = serde_json::json!({ "summary": "Resumen." });
        let result = coerce_parsed_translation(&translated, &english());
        assert_eq!(result.sections, english().sections);
        assert_eq!(result.abbreviations, english().abbreviations);
        assert_eq!(result.document_index, english().document_index);
    }
}
