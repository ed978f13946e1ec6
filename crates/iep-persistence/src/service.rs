// Persistence service: the only thing in the workspace that touches
// `MetadataStore`/`BlobStore` directly. Every operation mirrors one of
// `ddb-service/handler.py`'s dispatched operations.

use std::sync::Arc;

use chrono::Utc;
use iep_core::record::LegacyInlineContent;
use iep_core::{ContentBlob, MissingInfoItem, Record, RecordStatus};
use iep_storage::{BlobStore, MetadataStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistenceError;

fn blob_key(iep_id: &str, child_id: &str) -> String {
    format!("iep-data/{}/{}/content.json", iep_id, child_id)
}

/// Serializes a language-keyed map into the `serde_json::Map` shape
/// `LegacyInlineContent`'s fields expect.
fn to_json_map<T: Serialize>(
    map: &std::collections::HashMap<String, T>,
) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
    match serde_json::to_value(map)? {
        serde_json::Value::Object(obj) => Ok(obj),
        _ => Ok(serde_json::Map::new()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrDataKind {
    OcrResult,
    RedactedOcrResult,
}

impl OcrDataKind {
    fn field_name(&self) -> &'static str {
        match self {
            OcrDataKind::OcrResult => "ocrResult",
            OcrDataKind::RedactedOcrResult => "redactedOcrResult",
        }
    }
}

/// `get_user_prefs`'s response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    pub languages: Vec<String>,
    pub default_language: String,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            default_language: "en".to_string(),
        }
    }
}

/// A document merged with its content, the `get_document_with_content`
/// response shape after the (possibly lazy) migration.
#[derive(Debug, Clone)]
pub struct DocumentWithContent {
    pub record: Record,
    pub content: ContentBlob,
}

pub struct PersistenceService {
    metadata: Arc<dyn MetadataStore>,
    blob: Arc<dyn BlobStore>,
    bucket: String,
}

impl PersistenceService {
    pub fn new(metadata: Arc<dyn MetadataStore>, blob: Arc<dyn BlobStore>, bucket: impl Into<String>) -> Self {
        Self {
            metadata,
            blob,
            bucket: bucket.into(),
        }
    }

    async fn require_record(&self, iep_id: &str, child_id: &str) -> Result<Record, PersistenceError> {
        self.metadata
            .get_record(iep_id, child_id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                iep_id: iep_id.to_string(),
                child_id: child_id.to_string(),
            })
    }

    /// Invariant I5: a write may only proceed if the caller owns the
    /// record (or the record doesn't exist yet, e.g. first ingestion write).
    fn check_ownership(record: &Option<Record>, user_id: &str) -> Result<(), PersistenceError> {
        if let Some(record) = record {
            let key = iep_core::DocumentKey::new(record.iep_id.clone(), record.child_id.clone(), record.user_id.clone());
            if !key.owned_by(user_id) {
                return Err(PersistenceError::Forbidden {
                    iep_id: record.iep_id.clone(),
                    user_id: user_id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// `update_progress`: create the record on first write, otherwise
    /// update status/step/progress in place. A metadata-store write failure
    /// that looks like a permission error is swallowed for non-terminal
    /// statuses so document processing can continue without status
    /// visibility, matching `database.py::update_iep_document_status`'s
    /// `AccessDeniedException` handling; terminal statuses still propagate.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_progress(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        status: RecordStatus,
        current_step: &str,
        progress: u8,
        error_message: Option<&str>,
        last_error: Option<&str>,
    ) -> Result<Record, PersistenceError> {
        let existing = self.metadata.get_record(iep_id, child_id).await?;
        Self::check_ownership(&existing, user_id)?;

        let mut record = existing.unwrap_or_else(|| {
            Record::new_ingress(iep_id, child_id, user_id, "")
        });

        record
            .apply_progress(progress, status)
            .map_err(|message| PersistenceError::InvalidRequest { message })?;
        record.current_step = current_step.to_string();
        if let Some(msg) = error_message {
            record.last_error = Some(msg.to_string());
        }
        if let Some(msg) = last_error {
            record.last_error = Some(msg.to_string());
        }

        match self.metadata.put_record(&record).await {
            Ok(()) => Ok(record),
            Err(err) if !status.is_terminal() && err.to_string().contains("AccessDenied") => {
                warn!(iep_id, child_id, "metadata store denied progress update; continuing without persisted status");
                Ok(record)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_user_prefs(&self, user_id: &str) -> Result<UserPrefs, PersistenceError> {
        match self.metadata.get_user_profile(user_id).await? {
            None => Ok(UserPrefs::default()),
            Some(profile) => {
                let languages = profile
                    .get("languages")
                    .and_then(|v| v.as_array())
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect::<Vec<_>>()
                    })
                    .filter(|langs| !langs.is_empty())
                    .unwrap_or_else(|| vec!["en".to_string()]);
                let default_language = profile
                    .get("default_language")
                    .and_then(|v| v.as_str())
                    .unwrap_or("en")
                    .to_string();
                Ok(UserPrefs {
                    languages,
                    default_language,
                })
            }
        }
    }

    /// `record_failure`: always resets progress to 0 alongside the FAILED
    /// transition (resolved Open Question, spec.md §9).
    pub async fn record_failure(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        error_message: &str,
        failed_step: Option<&str>,
    ) -> Result<Record, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;

        record
            .apply_progress(0, RecordStatus::Failed)
            .map_err(|message| PersistenceError::InvalidRequest { message })?;
        record.last_error = Some(error_message.to_string());
        record.failed_step = failed_step.map(str::to_string).or(Some("unknown".to_string()));

        self.metadata.put_record(&record).await?;
        info!(iep_id, child_id, error = error_message, "recorded processing failure");
        Ok(record)
    }

    pub async fn get_document(&self, iep_id: &str, child_id: &str, user_id: &str) -> Result<Record, PersistenceError> {
        let record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        Ok(record)
    }

    pub async fn save_ocr_data(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        ocr_data: serde_json::Value,
        kind: OcrDataKind,
    ) -> Result<(), PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        record.extra.insert(kind.field_name().to_string(), ocr_data);
        record.updated_at = Utc::now().to_rfc3339();
        self.metadata.put_record(&record).await?;
        Ok(())
    }

    pub async fn get_ocr_data(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        kind: OcrDataKind,
    ) -> Result<serde_json::Value, PersistenceError> {
        let record = self.get_document(iep_id, child_id, user_id).await?;
        record
            .extra
            .get(kind.field_name())
            .cloned()
            .ok_or_else(|| PersistenceError::InvalidRequest {
                message: format!("{} not found for {}/{}", kind.field_name(), iep_id, child_id),
            })
    }

    /// `save_api_fields`: set each requested field (top-level or
    /// `parent.lang`) on the record.
    pub async fn save_api_fields(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        field_updates: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Record, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        for (path, value) in field_updates {
            record.set_field(&path, value);
        }
        self.metadata.put_record(&record).await?;
        Ok(record)
    }

    pub async fn append_to_list_field(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        field_path: &str,
        items: Vec<serde_json::Value>,
    ) -> Result<Record, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        record
            .append_to_list_field(field_path, items)
            .map_err(|message| PersistenceError::InvalidRequest { message })?;
        self.metadata.put_record(&record).await?;
        Ok(record)
    }

    /// Sets the record's `missingInfo` list (C6's output lives on the
    /// record, not the blob, per the resolved Open Question in spec.md §9).
    pub async fn save_missing_info(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        items: Vec<MissingInfoItem>,
    ) -> Result<Record, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        record.missing_info = items;
        record.updated_at = Utc::now().to_rfc3339();
        self.metadata.put_record(&record).await?;
        Ok(record)
    }

    /// `save_content_to_s3` / legacy `save_final_results`: write the content
    /// blob to the blob store, then point the record's `content_s3_reference`
    /// at it and clear the legacy inline fields (invariant I1).
    pub async fn save_content_to_s3(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        content: &ContentBlob,
    ) -> Result<iep_core::record::ContentS3Reference, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;

        let key = blob_key(iep_id, child_id);
        let body = serde_json::to_vec(content)?;
        let size = body.len() as u64;
        self.blob.write(&key, body).await?;

        let reference = iep_core::record::ContentS3Reference {
            s3_key: key,
            bucket: self.bucket.clone(),
            size,
            last_updated: Utc::now().to_rfc3339(),
        };
        record.content_s3_reference = Some(reference.clone());
        record.legacy_content = iep_core::record::LegacyInlineContent::default();
        self.metadata.put_record(&record).await?;
        Ok(reference)
    }

    /// `save_final/handler.py`'s legacy whole-record write: sets the five
    /// content fields inline on the record (never in the blob store) and
    /// marks the record PROCESSED in the same write. Distinct from
    /// `save_content_to_s3`, which writes the blob and leaves a reference on
    /// the record; this path is the pre-hybrid-storage shape and exists for
    /// callers still producing records in that shape. Clears any existing
    /// `content_s3_reference` so the record never carries both (invariant I1).
    pub async fn save_final_results(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
        content: &ContentBlob,
        missing_info: Vec<MissingInfoItem>,
    ) -> Result<Record, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;

        record.legacy_content = LegacyInlineContent {
            summaries: Some(to_json_map(&content.summaries)?),
            sections: Some(to_json_map(&content.sections)?),
            document_index: Some(to_json_map(&content.document_index)?),
            abbreviations: Some(to_json_map(&content.abbreviations)?),
            meeting_notes: Some(to_json_map(&content.meeting_notes)?),
        };
        record.content_s3_reference = None;
        if !missing_info.is_empty() {
            record.missing_info = missing_info;
        }

        record
            .apply_progress(100, RecordStatus::Processed)
            .map_err(|message| PersistenceError::InvalidRequest { message })?;
        record.current_step = "done".to_string();

        self.metadata.put_record(&record).await?;
        info!(iep_id, child_id, "saved final results via legacy inline write path");
        Ok(record)
    }

    pub async fn delete_content_from_s3(&self, iep_id: &str, child_id: &str, user_id: &str) -> Result<(), PersistenceError> {
        let record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;
        if let Some(reference) = &record.content_s3_reference {
            self.blob.delete(&reference.s3_key).await?;
        }
        Ok(())
    }

    /// `get_document_with_content`: fetch the record, then the content
    /// blob, migrating legacy inline content to the blob store in place if
    /// this is an old-format record (lazy migration).
    pub async fn get_document_with_content(
        &self,
        iep_id: &str,
        child_id: &str,
        user_id: &str,
    ) -> Result<DocumentWithContent, PersistenceError> {
        let mut record = self.require_record(iep_id, child_id).await?;
        Self::check_ownership(&Some(record.clone()), user_id)?;

        if let Some(reference) = record.content_s3_reference.clone() {
            let bytes = self.blob.read(&reference.s3_key).await?;
            let content: ContentBlob = serde_json::from_slice(&bytes)?;
            return Ok(DocumentWithContent { record, content });
        }

        if record.is_legacy() {
            info!(iep_id, child_id, "migrating legacy inline content to blob store");
            let content = record.legacy_content.clone().into_content_blob()?;
            let reference = self.save_content_to_s3(iep_id, child_id, user_id, &content).await?;
            record.content_s3_reference = Some(reference);
            record.legacy_content = iep_core::record::LegacyInlineContent::default();
            return Ok(DocumentWithContent { record, content });
        }

        Ok(DocumentWithContent {
            record,
            content: ContentBlob::default(),
        })
    }
}
