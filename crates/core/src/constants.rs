//! Constants used throughout the encounter core crate.
//!
//! ECL expressions, SNOMED CT attribute identifiers and configuration defaults live here so the
//! query shapes stay consistent between the autocomplete channels, the laterality cascade and
//! the CLI.

/// Default terminology server base URL when none is configured.
pub const DEFAULT_TERMINOLOGY_SERVER: &str = "https://snowstorm.ihtsdotools.org/fhir";

/// Default input silence before an autocomplete lookup fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default server-side cap on autocomplete results.
pub const DEFAULT_RESULT_COUNT: u32 = 20;

/// Timeout applied to every terminology request.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Relative location of the preferred diagnosis list.
pub const PREFERRED_DIAGNOSES_FILE: &str = "preferred/diagnoses.yaml";

/// Reason for encounter: clinical findings, procedures, contexts and events.
pub const ENCOUNTER_REASON_ECL: &str = "< 404684003 OR < 71388002 OR < 243796009 OR < 272379006";

/// Diagnosis: clinical findings.
pub const DIAGNOSIS_ECL: &str = "< 404684003";

/// Procedure: procedures.
pub const PROCEDURE_ECL: &str = "< 71388002";

/// Laterality: side values.
pub const LATERALITY_ECL: &str = "< 182353008";

/// SNOMED CT attribute "Procedure site".
pub const PROCEDURE_SITE_ATTRIBUTE: &str = "363704007";

/// SNOMED CT attribute "Laterality".
pub const LATERALITY_ATTRIBUTE: &str = "272741003";
