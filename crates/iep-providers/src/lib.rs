//! iep-providers - external provider adapters the orchestrator calls into:
//! OCR (C2) and PII redaction (C3). No persistence or agent logic lives
//! here; both adapters take and return plain data.

pub mod error;
pub mod ocr;
pub mod pii;

pub use error::ProviderError;
pub use ocr::{HttpOcrProvider, OcrPage, OcrProvider, OcrResult};
pub use pii::{HttpPiiRedactor, PiiRedactor, RedactionStats};
