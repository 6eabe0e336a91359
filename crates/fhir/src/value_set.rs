//! FHIR `ValueSet` expansion wire models and translation helpers.
//!
//! Responsibilities:
//! - Define public domain-level types for expansion results
//! - Define a lenient wire model for the subset of `ValueSet` the encounter form reads
//! - Provide translation from the wire model to domain types
//!
//! Notes:
//! - Terminology servers return many more members than modelled here, so unknown keys are ignored
//! - A missing `expansion.contains` means "no matches" and is kept distinct from an empty list

use crate::{parse_json, FhirError};
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for a `ValueSet` expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionData {
    /// Total number of concepts matching the constraint, if the server reported it.
    pub total: Option<u32>,

    /// Concepts in server order. `None` when the server omitted `contains`.
    pub contains: Option<Vec<Concept>>,
}

impl ExpansionData {
    /// True when the expansion carries no concepts at all.
    pub fn is_empty(&self) -> bool {
        self.contains.as_ref().map_or(true, Vec::is_empty)
    }
}

/// A single concept from `expansion.contains`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Concept {
    pub system: Option<String>,
    pub code: String,
    /// Preferred display; falls back to the code when the server sends none.
    pub display: String,
    pub designations: Vec<Designation>,
}

/// An alternative designation of a concept (returned with `includeDesignations=true`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Designation {
    pub language: Option<String>,
    pub value: String,
}

// ============================================================================
// Public ValueSet operations
// ============================================================================

/// ValueSet operations.
///
/// This is a zero-sized type used for namespacing expansion-related operations.
pub struct ValueSet;

impl ValueSet {
    /// Parse a `ValueSet` resource from JSON text and extract its expansion.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the text is not valid JSON,
    /// - `resourceType` is not `ValueSet`,
    /// - the resource has no `expansion` member,
    /// - any modelled field has an unexpected type.
    pub fn parse(json_text: &str) -> Result<ExpansionData, FhirError> {
        let wire: ValueSetWire = parse_json(json_text, "ValueSet")?;
        wire_to_domain(wire)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueSetWire {
    resource_type: String,
    #[serde(default)]
    expansion: Option<ExpansionWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct ExpansionWire {
    #[serde(default)]
    total: Option<u32>,
    #[serde(default)]
    contains: Option<Vec<ContainsWire>>,
}

#[derive(Clone, Debug, Deserialize)]
struct ContainsWire {
    #[serde(default)]
    system: Option<String>,
    code: String,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    designation: Vec<DesignationWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct DesignationWire {
    #[serde(default)]
    language: Option<String>,
    value: String,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: ValueSetWire) -> Result<ExpansionData, FhirError> {
    if wire.resource_type != "ValueSet" {
        return Err(FhirError::Translation(format!(
            "expected resourceType ValueSet, got {}",
            wire.resource_type
        )));
    }

    let expansion = wire
        .expansion
        .ok_or_else(|| FhirError::Translation("ValueSet has no expansion".into()))?;

    let contains = expansion.contains.map(|entries| {
        entries
            .into_iter()
            .map(|entry| Concept {
                display: entry.display.unwrap_or_else(|| entry.code.clone()),
                system: entry.system,
                code: entry.code,
                designations: entry
                    .designation
                    .into_iter()
                    .map(|d| Designation {
                        language: d.language,
                        value: d.value,
                    })
                    .collect(),
            })
            .collect()
    });

    Ok(ExpansionData {
        total: expansion.total,
        contains,
    })
}
