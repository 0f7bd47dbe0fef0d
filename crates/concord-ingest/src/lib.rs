//! # Concord Ingest
//!
//! Report ingestion for the audit pipeline: free text in, a validated
//! [`concord_core::Signal`] out, or a tagged non-signal when the text carries
//! nothing auditable.
//!
//! The pipeline is an ordered strategy chain ([`Extractor`]): the external
//! text-understanding service first when a credential is configured, a
//! deterministic regex pass as the terminal fallback. Every candidate passes
//! through one normalizer ([`schema`]) that resolves historic field-name
//! synonyms and enforces signal ranges; nothing reaches the audit graph
//! unvalidated.
//!
//! Recoverable conditions never cross this crate's boundary as errors. Input
//! with no numeric content becomes [`Extraction::Waste`], fields the
//! normalizer refuses become [`Extraction::Rejected`], and a service outage
//! simply means the fallback did the work.

pub mod extract;
pub mod pattern;
pub mod sanitize;
pub mod schema;
pub mod service;

pub use extract::{Candidate, Extraction, ExtractionStrategy, Extractor, Rejection, StrategyError};
pub use pattern::{PatternStrategy, DAMAGE_SCALE_UNITS};
pub use sanitize::sanitize;
pub use schema::{resolve_fields, validate_fields, validate_value, RawFields, SchemaViolation};
pub use service::{
    ServiceConfig, ServiceStrategy, EXTRACTOR_KEY_ENV, EXTRACTOR_TIMEOUT_ENV, EXTRACTOR_URL_ENV,
};
