//! iep-persistence - the single entrypoint for reading and writing IEP
//! document records and their content, wrapping the `MetadataStore` +
//! `BlobStore` pair from `iep-storage`.

pub mod error;
pub mod service;

pub use error::PersistenceError;
pub use service::{DocumentWithContent, OcrDataKind, PersistenceService, UserPrefs};
