//! FHIR `OperationOutcome` wire models.
//!
//! Terminology servers answer failed `$expand` calls (bad ECL, unknown code system) with an
//! `OperationOutcome`. Only the parts needed to build a readable error message are modelled.

use crate::{parse_json, FhirError};
use serde::Deserialize;

/// Domain-level carrier for an `OperationOutcome`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeData {
    pub issues: Vec<IssueData>,
}

/// One `issue` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueData {
    pub severity: String,
    pub code: String,
    pub diagnostics: Option<String>,
}

impl OutcomeData {
    /// Join the issue diagnostics into a single line, most severe issues first.
    pub fn summary(&self) -> String {
        let mut issues: Vec<&IssueData> = self.issues.iter().collect();
        issues.sort_by_key(|issue| severity_rank(&issue.severity));

        issues
            .into_iter()
            .map(|issue| match &issue.diagnostics {
                Some(text) => format!("{}: {}", issue.severity, text),
                None => format!("{}: {}", issue.severity, issue.code),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// OperationOutcome operations.
pub struct OperationOutcome;

impl OperationOutcome {
    /// Parse an `OperationOutcome` resource from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the text is not JSON, is another resource type, or an issue is
    /// missing its required `severity`/`code`.
    pub fn parse(json_text: &str) -> Result<OutcomeData, FhirError> {
        let wire: OperationOutcomeWire = parse_json(json_text, "OperationOutcome")?;

        if wire.resource_type != "OperationOutcome" {
            return Err(FhirError::Translation(format!(
                "expected resourceType OperationOutcome, got {}",
                wire.resource_type
            )));
        }

        Ok(OutcomeData {
            issues: wire
                .issue
                .into_iter()
                .map(|issue| IssueData {
                    severity: issue.severity,
                    code: issue.code,
                    diagnostics: issue.diagnostics,
                })
                .collect(),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationOutcomeWire {
    resource_type: String,
    #[serde(default)]
    issue: Vec<IssueWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct IssueWire {
    severity: String,
    code: String,
    #[serde(default)]
    diagnostics: Option<String>,
}

fn severity_rank(severity: &str) -> u8 {
    match severity {
        "fatal" => 0,
        "error" => 1,
        "warning" => 2,
        _ => 3,
    }
}
