// OCR Adapter (C2): uploads a source document to an external OCR provider
// via a three-step handshake (upload -> signed URL -> submit+poll) and
// returns page-indexed text. Grounded on
// `examples/original_source/.../mistral_ocr.py`.

use async_trait::async_trait;
use iep_storage::BlobStore;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrPage {
    pub index: u32,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    pub pages: Vec<OcrPage>,
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn process_document(&self, bucket: &str, key: &str) -> Result<OcrResult, ProviderError>;
}

/// Mistral's three-step OCR handshake: upload the file, request a signed
/// URL for it, then submit that URL to the OCR endpoint.
pub struct HttpOcrProvider {
    client: reqwest::Client,
    blob: std::sync::Arc<dyn BlobStore>,
    api_key: String,
    base_url: String,
}

impl HttpOcrProvider {
    pub fn new(blob: std::sync::Arc<dyn BlobStore>, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            blob,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Fetches the source bytes, retrying with alternate URL-decodings of
    /// the key if the literal key is not found (S3 event keys are
    /// URL-encoded, sometimes doubly so).
    async fn fetch_source(&self, key: &str) -> Result<Vec<u8>, ProviderError> {
        match self.blob.read(key).await {
            Ok(bytes) => Ok(bytes),
            Err(iep_storage::StorageError::NotFound(_)) => {
                let decoded = urlencoding::decode(key)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| key.to_string());
                if decoded != key {
                    if let Ok(bytes) = self.blob.read(&decoded).await {
                        return Ok(bytes);
                    }
                }
                let double_decoded = urlencoding::decode(&decoded)
                    .map(|s| s.into_owned())
                    .unwrap_or(decoded);
                self.blob
                    .read(&double_decoded)
                    .await
                    .map_err(|e| ProviderError::Upstream(e.to_string()))
            }
            Err(e) => Err(ProviderError::Upstream(e.to_string())),
        }
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ProviderError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(ProviderError::Transport)?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "ocr")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Decode("upload response missing file id".to_string()))
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(format!("{}/files/{}/url", self.base_url, file_id))
            .bearer_auth(&self.api_key)
            .query(&[("expiry", "24")])
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        body.get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Decode("signed-url response missing url".to_string()))
    }

    async fn submit_ocr(&self, signed_url: &str) -> Result<serde_json::Value, ProviderError> {
        let payload = serde_json::json!({
            "model": "mistral-ocr-latest",
            "document": {
                "type": "document_url",
                "document_url": signed_url,
            },
            "include_image_base64": false,
        });
        let response = self
            .client
            .post("https://api.mistral.ai/v1/ocr")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OcrProvider for HttpOcrProvider {
    async fn process_document(&self, bucket: &str, key: &str) -> Result<OcrResult, ProviderError> {
        let _ = bucket;
        let filename = key.rsplit('/').next().unwrap_or(key).to_string();
        let bytes = self.fetch_source(key).await?;

        let file_id = self.upload_file(&filename, bytes).await?;
        let url = self.signed_url(&file_id).await?;
        let raw = self.submit_ocr(&url).await?;

        let pages = raw
            .get("pages")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::Decode("ocr response missing pages array".to_string()))?
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let content = page
                    .get("markdown")
                    .or_else(|| page.get("content"))
                    .or_else(|| page.get("text"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                OcrPage {
                    index: i as u32,
                    content,
                }
            })
            .collect();

        Ok(OcrResult { pages })
    }
}
