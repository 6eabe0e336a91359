//! Preferred diagnosis overlay ("boost").
//!
//! When boost is on, the diagnosis picker lists locally preferred conditions whose display
//! contains the search text ahead of the server's results. The list is configuration data loaded
//! from YAML at startup (see [`crate::config`]).

use crate::coding::CodedValue;
use crate::error::{EncounterError, EncounterResult};
use std::collections::HashSet;
use std::path::Path;

/// Ordered list of preferred diagnoses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferredDiagnoses {
    entries: Vec<CodedValue>,
}

impl PreferredDiagnoses {
    /// Build from entries, rejecting blank codes or displays.
    pub fn new(entries: Vec<CodedValue>) -> EncounterResult<Self> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.value.trim().is_empty() || e.display.trim().is_empty())
        {
            return Err(EncounterError::InvalidInput(format!(
                "preferred diagnosis entries need a code and display: {bad:?}"
            )));
        }
        Ok(Self { entries })
    }

    /// Parse a YAML sequence of `{ value, display }` mappings.
    pub fn from_yaml(yaml_text: &str) -> EncounterResult<Self> {
        let entries: Vec<CodedValue> =
            serde_yaml::from_str(yaml_text).map_err(EncounterError::ConfigParse)?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> EncounterResult<Self> {
        let text = std::fs::read_to_string(path).map_err(EncounterError::ConfigRead)?;
        Self::from_yaml(&text)
    }

    pub fn entries(&self) -> &[CodedValue] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose display contains `term`, ignoring case. Blank terms match everything.
    pub fn matching(&self, term: &str) -> Vec<CodedValue> {
        let needle = term.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.display.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// ECL selecting exactly the preferred concepts, or `None` for an empty list.
    pub fn ecl(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(|e| e.value.as_str())
                .collect::<Vec<_>>()
                .join(" OR "),
        )
    }
}

/// Preferred matches first, then server results whose code is not already listed.
pub fn merge_boosted(preferred: Vec<CodedValue>, server: Vec<CodedValue>) -> Vec<CodedValue> {
    let mut seen: HashSet<String> = preferred.iter().map(|v| v.value.clone()).collect();
    let mut merged = preferred;
    for value in server {
        if seen.insert(value.value.clone()) {
            merged.push(value);
        }
    }
    merged
}
