//! iep-storage - blob and metadata storage primitives
//!
//! Two storage concerns, kept as separate abstractions the way the
//! original system split `database.py` (DynamoDB) from the S3 helpers
//! scattered through the step handlers:
//! - [`BlobStore`]: large content (OCR text, content blobs) in object storage
//! - [`MetadataStore`]: small structured records in a key-value store

mod blob;
mod error;
mod metadata;

pub use blob::{BlobStore, OpenDalBlobStore};
pub use error::StorageError;
pub use metadata::{InMemoryMetadataStore, MetadataStore};

#[cfg(feature = "dynamodb")]
pub use metadata::DynamoMetadataStore;
