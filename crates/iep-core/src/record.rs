use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::content::ContentBlob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Processing,
    ProcessingTranslations,
    Processed,
    Failed,
}

impl RecordStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Processed | RecordStatus::Failed)
    }
}

/// A missing-information item (C6's output), kept on the record rather
/// than the blob per the resolved Open Question in spec.md §9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingInfoItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A reference to the content blob, stored inline on new records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentS3Reference {
    pub s3_key: String,
    pub bucket: String,
    pub size: u64,
    pub last_updated: String,
}

/// Legacy inline content fields kept only for records written before the
/// hybrid-storage migration. New writes never populate these alongside
/// `content_ref` (invariant I1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyInlineContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_index: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviations: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "meetingNotes")]
    pub meeting_notes: Option<serde_json::Map<String, serde_json::Value>>,
}

impl LegacyInlineContent {
    pub fn is_present(&self) -> bool {
        self.summaries.is_some()
            || self.sections.is_some()
            || self.document_index.is_some()
            || self.abbreviations.is_some()
            || self.meeting_notes.is_some()
    }

    /// Reconstruct a `ContentBlob` from the legacy inline fields, the shape
    /// used by the lazy-migration read path.
    pub fn into_content_blob(self) -> Result<ContentBlob, serde_json::Error> {
        fn to_map<T: serde::de::DeserializeOwned>(
            value: Option<serde_json::Map<String, serde_json::Value>>,
        ) -> Result<std::collections::HashMap<String, T>, serde_json::Error> {
            match value {
                Some(map) => serde_json::from_value(serde_json::Value::Object(map)),
                None => Ok(std::collections::HashMap::new()),
            }
        }

        Ok(ContentBlob {
            summaries: to_map(self.summaries)?,
            sections: to_map(self.sections)?,
            document_index: to_map(self.document_index)?,
            abbreviations: to_map(self.abbreviations)?,
            meeting_notes: to_map(self.meeting_notes)?,
        })
    }
}

/// The metadata-store record, kept deliberately small: large content lives
/// in the blob store and is referenced, never inlined, on new writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub iep_id: String,
    pub child_id: String,
    pub user_id: String,
    pub status: RecordStatus,
    pub current_step: String,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_s3_reference: Option<ContentS3Reference>,
    #[serde(flatten)]
    pub legacy_content: LegacyInlineContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_info: Vec<MissingInfoItem>,
    /// Free-form named attributes: OCR/redaction intermediates
    /// (`ocrResult`, `redactedOcrResult`), per-stage analysis results
    /// (`englishResult`, `meetingNotesResult`), and the `save_api_fields`/
    /// `append_to_list_field` targets. Kept separate from `legacy_content`
    /// because it addresses arbitrary attribute names, not the five fixed
    /// content fields.
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// A freshly ingested record: `status=PROCESSING, progress=5`.
    pub fn new_ingress(iep_id: &str, child_id: &str, user_id: &str, document_url: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            iep_id: iep_id.to_string(),
            child_id: child_id.to_string(),
            user_id: user_id.to_string(),
            status: RecordStatus::Processing,
            current_step: "start".to_string(),
            progress: 5,
            last_error: None,
            failed_step: None,
            created_at: now.clone(),
            updated_at: now,
            document_url: Some(document_url.to_string()),
            content_s3_reference: None,
            legacy_content: LegacyInlineContent::default(),
            missing_info: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// `save_api_fields`: set a top-level field (`"ocrResult"`) or a
    /// `parent.lang`-style nested field (`"sections.es"`), initializing the
    /// parent map if needed. Mirrors `ddb-service/handler.py::save_api_fields`.
    pub fn set_field(&mut self, field_path: &str, value: serde_json::Value) {
        match field_path.split_once('.') {
            Some((parent, lang)) => {
                let parent_map = self
                    .extra
                    .entry(parent.to_string())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                if !parent_map.is_object() {
                    *parent_map = serde_json::Value::Object(serde_json::Map::new());
                }
                parent_map
                    .as_object_mut()
                    .expect("just ensured object")
                    .insert(lang.to_string(), value);
            }
            None => {
                self.extra.insert(field_path.to_string(), value);
            }
        }
        self.updated_at = Utc::now().to_rfc3339();
    }

    /// `append_to_list_field`: append items to a `parent.lang` list field,
    /// creating the parent map and the list if either is missing. Mirrors
    /// `ddb-service/handler.py::append_to_list_field`.
    pub fn append_to_list_field(
        &mut self,
        field_path: &str,
        items: Vec<serde_json::Value>,
    ) -> Result<(), String> {
        let (parent, lang) = field_path
            .split_once('.')
            .ok_or_else(|| format!("invalid field path '{}', expected 'parent.lang'", field_path))?;

        let parent_map = self
            .extra
            .entry(parent.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !parent_map.is_object() {
            *parent_map = serde_json::Value::Object(serde_json::Map::new());
        }
        let parent_obj = parent_map.as_object_mut().expect("just ensured object");
        let list = parent_obj
            .entry(lang.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if !list.is_array() {
            *list = serde_json::Value::Array(Vec::new());
        }
        list.as_array_mut().expect("just ensured array").extend(items);
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }

    /// Invariant I1: either a reference exists and no inline fields exist,
    /// or neither exists.
    pub fn content_location_is_consistent(&self) -> bool {
        match &self.content_s3_reference {
            Some(_) => !self.legacy_content.is_present(),
            None => true,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.content_s3_reference.is_none() && self.legacy_content.is_present()
    }

    /// Invariant I4: apply a progress update, refusing to move progress
    /// backward unless paired with a transition into FAILED.
    pub fn apply_progress(&mut self, progress: u8, status: RecordStatus) -> Result<(), String> {
        if progress < self.progress && status != RecordStatus::Failed {
            return Err(format!(
                "progress may not decrease from {} to {} outside of a FAILED transition",
                self.progress, progress
            ));
        }
        self.progress = progress;
        self.status = status;
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ingress_has_expected_defaults() {
        let r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        assert_eq!(r.status, RecordStatus::Processing);
        assert_eq!(r.progress, 5);
        assert_eq!(r.current_step, "start");
        assert!(r.content_location_is_consistent());
    }

    #[test]
    fn apply_progress_rejects_regression() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        r.apply_progress(25, RecordStatus::Processing).unwrap();
        assert!(r.apply_progress(10, RecordStatus::Processing).is_err());
        assert_eq!(r.progress, 25);
    }

    #[test]
    fn apply_progress_allows_reset_on_failure() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        r.apply_progress(70, RecordStatus::ProcessingTranslations).unwrap();
        r.apply_progress(0, RecordStatus::Failed).unwrap();
        assert_eq!(r.progress, 0);
        assert_eq!(r.status, RecordStatus::Failed);
    }

    #[test]
    fn content_location_invariant_flags_mixed_state() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        r.content_s3_reference = Some(ContentS3Reference {
            s3_key: "iep-data/iep-1/child-1/content.json".to_string(),
            bucket: "b".to_string(),
            size: 10,
            last_updated: "now".to_string(),
        });
        let mut map = serde_json::Map::new();
        map.insert("en".to_string(), serde_json::json!("hi"));
        r.legacy_content.summaries = Some(map);
        assert!(!r.content_location_is_consistent());
    }

    #[test]
    fn set_field_writes_nested_path() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        r.set_field("ocrResult", serde_json::json!({"pages": 3}));
        r.set_field("sections.es", serde_json::json!("contenido"));
        assert_eq!(r.extra["ocrResult"], serde_json::json!({"pages": 3}));
        assert_eq!(r.extra["sections"]["es"], serde_json::json!("contenido"));
    }

    #[test]
    fn append_to_list_field_creates_and_extends() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        r.append_to_list_field("sections.es", vec![serde_json::json!({"title": "Goals"})])
            .unwrap();
        r.append_to_list_field("sections.es", vec![serde_json::json!({"title": "Services"})])
            .unwrap();
        let list = r.extra["sections"]["es"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["title"], "Goals");
        assert_eq!(list[1]["title"], "Services");
    }

    #[test]
    fn append_to_list_field_rejects_malformed_path() {
        let mut r = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        assert!(r.append_to_list_field("sections", vec![]).is_err());
    }
}
