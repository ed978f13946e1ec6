use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sections::{CANONICAL_SECTIONS, MISSING_SECTION_PLACEHOLDER};

/// One section of structured content: a canonical title, markdown body, and
/// the OCR page numbers it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub page_numbers: Vec<u32>,
}

impl Section {
    pub fn placeholder(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: MISSING_SECTION_PLACEHOLDER.to_string(),
            page_numbers: Vec::new(),
        }
    }
}

/// An abbreviation/full-form pair surfaced in the document index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abbreviation {
    pub abbreviation: String,
    pub full_form: String,
}

/// The content blob: one JSON object per record, language-keyed, living in
/// the blob store under `iep-data/<iepId>/<childId>/content.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlob {
    #[serde(default)]
    pub summaries: HashMap<String, String>,
    #[serde(default)]
    pub sections: HashMap<String, Vec<Section>>,
    #[serde(default)]
    pub document_index: HashMap<String, String>,
    #[serde(default)]
    pub abbreviations: HashMap<String, Vec<Abbreviation>>,
    #[serde(default, rename = "meetingNotes")]
    pub meeting_notes: HashMap<String, String>,
}

impl ContentBlob {
    /// Invariant I3: `sections.en` has exactly one entry per canonical
    /// section, in canonical order, filling gaps with the placeholder.
    pub fn ensure_english_sections_complete(&mut self) {
        let existing = self.sections.entry("en".to_string()).or_default();
        let mut by_title: HashMap<String, Section> = existing
            .drain(..)
            .map(|s| (s.title.clone(), s))
            .collect();

        let mut ordered = Vec::with_capacity(CANONICAL_SECTIONS.len());
        for canonical in CANONICAL_SECTIONS {
            let section = by_title
                .remove(canonical.title)
                .unwrap_or_else(|| Section::placeholder(canonical.title));
            ordered.push(section);
        }
        *existing = ordered;
    }

    /// Invariant I2: every language present in `summaries` must also be
    /// present in `sections` and `document_index`.
    pub fn languages_complete(&self) -> bool {
        self.summaries.keys().all(|lang| {
            self.sections.contains_key(lang) && self.document_index.contains_key(lang)
        })
    }

    pub fn languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.summaries.keys().cloned().collect();
        langs.sort();
        langs
    }

    pub fn is_empty_content(&self) -> bool {
        self.summaries.is_empty()
            && self.sections.is_empty()
            && self.document_index.is_empty()
            && self.abbreviations.is_empty()
            && self.meeting_notes.is_empty()
    }
}

/// The two payload shapes the Translator (C7) operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Parsed,
    MeetingNotes,
    MissingInfo,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Parsed => "parsed",
            PayloadKind::MeetingNotes => "meeting_notes",
            PayloadKind::MissingInfo => "missing_info",
        }
    }
}

/// The English structured-extractor output (C4), before it is merged into
/// the content blob under the `en` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResult {
    pub summary: String,
    pub sections: Vec<Section>,
    pub document_index: String,
    pub abbreviations: Vec<Abbreviation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_english_sections_complete_fills_gaps() {
        let mut blob = ContentBlob::default();
        blob.sections.insert(
            "en".to_string(),
            vec![Section {
                title: "Goals".to_string(),
                content: "Goal content".to_string(),
                page_numbers: vec![3],
            }],
        );
        blob.ensure_english_sections_complete();
        let sections = &blob.sections["en"];
        assert_eq!(sections.len(), 9);
        assert_eq!(sections[3].title, "Goals");
        assert_eq!(sections[3].content, "Goal content");
        assert_eq!(sections[0].title, "Present Levels");
        assert!(sections[0].content.contains("not found"));
    }

    #[test]
    fn languages_complete_detects_gap() {
        let mut blob = ContentBlob::default();
        blob.summaries.insert("en".to_string(), "s".to_string());
        blob.summaries.insert("es".to_string(), "s".to_string());
        blob.sections.insert("en".to_string(), vec![]);
        blob.document_index.insert("en".to_string(), "idx".to_string());
        assert!(!blob.languages_complete());

        blob.sections.insert("es".to_string(), vec![]);
        blob.document_index.insert("es".to_string(), "idx".to_string());
        assert!(blob.languages_complete());
    }

    #[test]
    fn serde_roundtrip() {
        let mut blob = ContentBlob::default();
        blob.summaries.insert("en".to_string(), "hello".to_string());
        let json = serde_json::to_string(&blob).unwrap();
        let back: ContentBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(blob, back);
    }
}
