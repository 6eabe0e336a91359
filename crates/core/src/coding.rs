//! Coded values and the autocomplete fields that hold them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SNOMED CT concept as shown in a picker: its code and preferred display.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodedValue {
    pub value: String,
    pub display: String,
}

impl CodedValue {
    pub fn new(value: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display: display.into(),
        }
    }

    /// Two values refer to the same concept when their codes match, whatever the display.
    pub fn same_concept(&self, other: &CodedValue) -> bool {
        self.value == other.value
    }

    /// The code, checked to be a SNOMED CT identifier.
    pub fn sctid(&self) -> crate::EncounterResult<&str> {
        sctid(&self.value)
    }
}

/// Validate a SNOMED CT identifier: 6 to 18 ASCII digits, surrounding whitespace ignored.
pub fn sctid(code: &str) -> crate::EncounterResult<&str> {
    let code = code.trim();
    let valid = (6..=18).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(crate::EncounterError::InvalidInput(format!(
            "not a SNOMED CT identifier: {code:?}"
        )));
    }
    Ok(code)
}

impl fmt::Display for CodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<fhir::Concept> for CodedValue {
    fn from(concept: fhir::Concept) -> Self {
        Self {
            value: concept.code,
            display: concept.display,
        }
    }
}

/// The three fields backed by a live terminology lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutocompleteField {
    ReasonForEncounter,
    Diagnosis,
    Procedure,
}

impl AutocompleteField {
    pub const ALL: [AutocompleteField; 3] = [
        AutocompleteField::ReasonForEncounter,
        AutocompleteField::Diagnosis,
        AutocompleteField::Procedure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AutocompleteField::ReasonForEncounter => "reason_for_encounter",
            AutocompleteField::Diagnosis => "diagnosis",
            AutocompleteField::Procedure => "procedure",
        }
    }
}

impl fmt::Display for AutocompleteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for AutocompleteField {
    type Err = crate::EncounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reason_for_encounter" | "reason" => Ok(AutocompleteField::ReasonForEncounter),
            "diagnosis" => Ok(AutocompleteField::Diagnosis),
            "procedure" => Ok(AutocompleteField::Procedure),
            other => Err(crate::EncounterError::InvalidInput(format!(
                "unknown autocomplete field: {other}"
            ))),
        }
    }
}

/// Contents of an autocomplete field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    /// Free text typed but not (yet) picked from the suggestions.
    Text(String),
    Selected(CodedValue),
}

impl FieldValue {
    /// The selected concept, if any.
    pub fn selected(&self) -> Option<&CodedValue> {
        match self {
            FieldValue::Selected(value) => Some(value),
            _ => None,
        }
    }

    /// Resolve to an optional concept for persisting.
    ///
    /// Blank text counts as empty; non-blank text that was never selected is an error, and so
    /// is a selection whose code is not a SNOMED CT identifier.
    pub fn resolve(&self, field: &'static str) -> crate::EncounterResult<Option<CodedValue>> {
        match self {
            FieldValue::Empty => Ok(None),
            FieldValue::Text(text) if text.trim().is_empty() => Ok(None),
            FieldValue::Text(_) => Err(crate::EncounterError::UnselectedValue(field)),
            FieldValue::Selected(value) => {
                value.sctid()?;
                Ok(Some(value.clone()))
            }
        }
    }
}

/// A change arriving at an autocomplete channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldInput {
    Text(String),
    Selected(CodedValue),
}

impl FieldInput {
    /// The text used as the expansion filter.
    pub fn filter_text(&self) -> &str {
        match self {
            FieldInput::Text(text) => text,
            FieldInput::Selected(value) => &value.display,
        }
    }
}
