//! iep-core - domain model shared across the IEP document pipeline
//!
//! Defines the record schema (metadata store), the content blob schema
//! (blob store), the canonical section table, and the invariants that the
//! rest of the workspace enforces. No I/O lives here.

pub mod content;
pub mod error;
pub mod ids;
pub mod record;
pub mod sections;
pub mod validate;

pub use content::{Abbreviation, ContentBlob, PayloadKind, Section};
pub use error::CoreError;
pub use ids::DocumentKey;
pub use record::{MissingInfoItem, Record, RecordStatus};
pub use sections::{CanonicalSection, CANONICAL_SECTIONS};
