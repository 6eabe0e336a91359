//! FHIR wire/boundary support for terminology lookups.
//!
//! This crate provides **wire models** and **format/translation helpers** for the small slice of
//! FHIR used by the encounter form:
//! - `ValueSet/$expand` request URLs built from SNOMED CT ECL expressions
//! - `ValueSet` expansion responses (JSON)
//! - `OperationOutcome` error bodies (JSON)
//!
//! This crate focuses on:
//! - serialisation/deserialisation
//! - translation between domain primitives and wire structs
//!
//! It performs no I/O. HTTP transport lives in `encounter-core`.

pub mod expand;
pub mod operation_outcome;
pub mod value_set;

// Re-export facades
pub use expand::ExpandRequest;
pub use operation_outcome::OperationOutcome;
pub use value_set::ValueSet;

// Re-export public domain-level types
pub use operation_outcome::{IssueData, OutcomeData};
pub use value_set::{Concept, Designation, ExpansionData};

/// Canonical URL of the SNOMED CT code system.
pub const SNOMED_CT_SYSTEM: &str = "http://snomed.info/sct";

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize `json_text` into `T`, reporting the failing field path on schema mismatch.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    json_text: &str,
    what: &str,
) -> FhirResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            if source.is_syntax() || source.is_eof() {
                return Err(FhirError::InvalidJson(source));
            }
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}
