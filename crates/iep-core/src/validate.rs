use crate::content::ContentBlob;
use crate::error::CoreError;
use crate::record::{Record, RecordStatus};
use crate::sections::CANONICAL_SECTIONS;

/// Checks applied before a record is allowed to transition to PROCESSED.
/// Encodes the quantified invariants from spec.md §8.
pub fn validate_processed(record: &Record, blob: &ContentBlob) -> Result<(), CoreError> {
    if record.status != RecordStatus::Processed {
        return Ok(());
    }

    if record.content_s3_reference.is_none() {
        return Err(CoreError::MixedContentLocation(
            "PROCESSED record missing contentS3Reference".to_string(),
        ));
    }
    if record.legacy_content.is_present() {
        return Err(CoreError::MixedContentLocation(
            "PROCESSED record retains legacy inline content fields".to_string(),
        ));
    }

    if !blob.summaries.contains_key("en")
        || !blob.sections.contains_key("en")
        || !blob.document_index.contains_key("en")
    {
        return Err(CoreError::InvalidRecord(
            "PROCESSED record missing English summary/sections/document_index".to_string(),
        ));
    }

    if !blob.languages_complete() {
        return Err(CoreError::InvalidRecord(
            "PROCESSED record has a language present in summaries but not sections".to_string(),
        ));
    }

    let english_sections = &blob.sections["en"];
    if english_sections.len() != CANONICAL_SECTIONS.len() {
        return Err(CoreError::MissingSection(format!(
            "expected {} canonical sections, found {}",
            CANONICAL_SECTIONS.len(),
            english_sections.len()
        )));
    }
    for (actual, canonical) in english_sections.iter().zip(CANONICAL_SECTIONS.iter()) {
        if actual.title != canonical.title {
            return Err(CoreError::MissingSection(format!(
                "expected canonical section '{}', found '{}'",
                canonical.title, actual.title
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Section;

    fn valid_blob() -> ContentBlob {
        let mut blob = ContentBlob::default();
        blob.summaries.insert("en".to_string(), "summary".to_string());
        blob.document_index.insert("en".to_string(), "idx".to_string());
        let sections: Vec<Section> = CANONICAL_SECTIONS
            .iter()
            .map(|s| Section {
                title: s.title.to_string(),
                content: "content".to_string(),
                page_numbers: vec![1],
            })
            .collect();
        blob.sections.insert("en".to_string(), sections);
        blob
    }

    #[test]
    fn accepts_valid_processed_record() {
        let mut record = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        record.status = RecordStatus::Processed;
        record.content_s3_reference = Some(crate::record::ContentS3Reference {
            s3_key: "k".to_string(),
            bucket: "b".to_string(),
            size: 1,
            last_updated: "now".to_string(),
        });
        assert!(validate_processed(&record, &valid_blob()).is_ok());
    }

    #[test]
    fn rejects_processed_without_reference() {
        let mut record = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        record.status = RecordStatus::Processed;
        assert!(validate_processed(&record, &valid_blob()).is_err());
    }

    #[test]
    fn rejects_incomplete_sections() {
        let mut record = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        record.status = RecordStatus::Processed;
        record.content_s3_reference = Some(crate::record::ContentS3Reference {
            s3_key: "k".to_string(),
            bucket: "b".to_string(),
            size: 1,
            last_updated: "now".to_string(),
        });
        let mut blob = valid_blob();
        blob.sections.get_mut("en").unwrap().pop();
        assert!(validate_processed(&record, &blob).is_err());
    }

    #[test]
    fn non_processed_records_skip_validation() {
        let record = Record::new_ingress("iep-1", "child-1", "user-1", "s3://bucket/key");
        assert!(validate_processed(&record, &ContentBlob::default()).is_ok());
    }
}
