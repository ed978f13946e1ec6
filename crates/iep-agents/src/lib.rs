//! iep-agents - the LLM-backed steps of the pipeline: structured extraction
//! (C4), meeting-notes extraction (C5), missing-info review (C6), and
//! translation (C7). `llm` holds the shared tool-calling transport; each
//! other module is one agent.

pub mod error;
pub mod extractor;
pub mod glossary;
pub mod llm;
pub mod meeting_notes;
pub mod missing_info;
pub mod ocr_tools;
pub mod translation_validation;
pub mod translator;

pub use error::AgentError;
pub use extractor::extract;
pub use llm::{ChatMessage, ChatRequest, ChatResponse, HttpLlmClient, LlmClient, Tool};
pub use meeting_notes::extract_meeting_notes;
pub use missing_info::review_missing_info;
pub use ocr_tools::OcrPageText;
pub use translation_validation::{coerce_parsed_translation, AbbreviationLegend, TranslationSectionContent};
pub use translator::translate;
