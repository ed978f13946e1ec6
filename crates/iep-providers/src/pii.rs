// PII Redactor (C3): redacts every entity type except NAME and DATE_TIME
// from a list of page texts, at bounded concurrency. Grounded on
// `examples/original_source/.../comprehend_redactor.py`'s
// `redact_pii_from_texts`/`redact_single_text`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use iep_config::ALLOWED_PII_ENTITY_TYPES;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::ProviderError;

#[derive(Debug, Clone, Deserialize)]
struct Entity {
    #[serde(rename = "Type")]
    entity_type: String,
    #[serde(rename = "BeginOffset")]
    begin_offset: usize,
    #[serde(rename = "EndOffset")]
    end_offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactionStats {
    pub total_entities: u64,
    pub redacted_entities: u64,
    pub entity_types: HashMap<String, u64>,
    pub processing_time_seconds: f64,
}

#[async_trait]
pub trait PiiRedactor: Send + Sync {
    async fn redact_pages(&self, pages: Vec<String>, language_code: &str) -> Result<(Vec<String>, RedactionStats), ProviderError>;
}

#[derive(Clone)]
pub struct HttpPiiRedactor {
    client: reqwest::Client,
    endpoint: Arc<str>,
    max_concurrent_pages: usize,
}

impl HttpPiiRedactor {
    pub fn new(endpoint: impl Into<String>, max_concurrent_pages: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Arc::from(endpoint.into()),
            max_concurrent_pages,
        }
    }
}

async fn detect_entities(
    client: &reqwest::Client,
    endpoint: &str,
    text: &str,
    language_code: &str,
) -> Result<Vec<Entity>, ProviderError> {
    let payload = serde_json::json!({ "Text": text, "LanguageCode": language_code });
    let response = client
        .post(endpoint)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;
    let body: serde_json::Value = response.json().await?;
    let entities = body
        .get("Entities")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    serde_json::from_value(entities).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Redacts a single page, adjusting offsets cumulatively as replacements
/// change the string's length. Any upstream failure returns the original
/// text unchanged rather than erroring the page.
async fn redact_page(
    client: reqwest::Client,
    endpoint: Arc<str>,
    text: String,
    language_code: String,
) -> (String, HashMap<String, u64>, u64) {
    if text.trim().is_empty() {
        return (text, HashMap::new(), 0);
    }

    let entities = match detect_entities(&client, &endpoint, &text, &language_code).await {
        Ok(entities) => entities,
        Err(_) => return (text, HashMap::new(), 0),
    };

    apply_redactions(text, entities)
}

/// Pure cumulative-offset substring replacement, split out from
/// `redact_page` so the offset arithmetic is unit-testable without a
/// network round trip.
fn apply_redactions(text: String, entities: Vec<Entity>) -> (String, HashMap<String, u64>, u64) {
    let mut entity_counts: HashMap<String, u64> = HashMap::new();
    for entity in &entities {
        *entity_counts.entry(entity.entity_type.clone()).or_insert(0) += 1;
    }

    let mut sorted = entities;
    sorted.sort_by_key(|e| e.begin_offset);

    let mut redacted = text;
    let mut offset: i64 = 0;
    let mut redacted_count = 0u64;
    for entity in sorted {
        if ALLOWED_PII_ENTITY_TYPES.contains(&entity.entity_type.as_str()) {
            continue;
        }
        let begin = (entity.begin_offset as i64 + offset).max(0) as usize;
        let end = (entity.end_offset as i64 + offset).max(0) as usize;
        if begin > redacted.len() || end > redacted.len() || begin > end {
            continue;
        }
        let replacement = format!("[{}]", entity.entity_type);
        redacted.replace_range(begin..end, &replacement);
        offset += replacement.len() as i64 - (end as i64 - begin as i64);
        redacted_count += 1;
    }

    (redacted, entity_counts, redacted_count)
}

#[async_trait]
impl PiiRedactor for HttpPiiRedactor {
    async fn redact_pages(&self, pages: Vec<String>, language_code: &str) -> Result<(Vec<String>, RedactionStats), ProviderError> {
        let start = std::time::Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_pages.max(1)));

        let mut handles = Vec::with_capacity(pages.len());
        for page in pages {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();
            let endpoint = Arc::clone(&self.endpoint);
            let language_code = language_code.to_string();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                redact_page(client, endpoint, page, language_code).await
            }));
        }

        let mut redacted_texts = Vec::with_capacity(handles.len());
        let mut total_entity_counts: HashMap<String, u64> = HashMap::new();
        let mut total_redacted = 0u64;
        for handle in handles {
            let (text, counts, redacted_count) = handle.await.map_err(|e| ProviderError::Upstream(e.to_string()))?;
            redacted_texts.push(text);
            for (k, v) in counts {
                *total_entity_counts.entry(k).or_insert(0) += v;
            }
            total_redacted += redacted_count;
        }

        let total_entities: u64 = total_entity_counts.values().sum();
        let stats = RedactionStats {
            total_entities,
            redacted_entities: total_redacted,
            entity_types: total_entity_counts,
            processing_time_seconds: start.elapsed().as_secs_f64(),
        };

        Ok((redacted_texts, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_stats_default_is_zeroed() {
        let stats = RedactionStats::default();
        assert_eq!(stats.total_entities, 0);
        assert_eq!(stats.redacted_entities, 0);
    }

    #[test]
    fn apply_redactions_skips_allowed_types_and_adjusts_offsets() {
        let text = "Contact Jane Doe at 555-1234 on 2024-01-01.".to_string();
        let entities = vec![
            Entity {
                entity_type: "NAME".to_string(),
                begin_offset: 8,
                end_offset: 16,
            },
            Entity {
                entity_type: "PHONE".to_string(),
                begin_offset: 20,
                end_offset: 29,
            },
            Entity {
                entity_type: "DATE_TIME".to_string(),
                begin_offset: 33,
                end_offset: 43,
            },
        ];

        let (redacted, counts, redacted_count) = apply_redactions(text, entities);

        assert_eq!(redacted, "Contact Jane Doe at [PHONE] on 2024-01-01.");
        assert_eq!(redacted_count, 1);
        assert_eq!(counts["PHONE"], 1);
        assert_eq!(counts["NAME"], 1);
    }

    #[test]
    fn apply_redactions_passes_through_when_no_entities() {
        let (redacted, counts, redacted_count) = apply_redactions("hello world".to_string(), vec![]);
        assert_eq!(redacted, "hello world");
        assert!(counts.is_empty());
        assert_eq!(redacted_count, 0);
    }
}
