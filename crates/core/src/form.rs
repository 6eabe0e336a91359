//! Encounter form state.
//!
//! [`EncounterFormState`] is a plain value. Every change goes through
//! [`EncounterFormState::apply`], which returns a new state and leaves the original untouched.

use crate::coding::{AutocompleteField, CodedValue, FieldValue};
use crate::laterality::LateralityOutcome;
use crate::store::NewEncounter;
use crate::{EncounterError, EncounterResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The laterality picker: only editable once a procedure with a site is chosen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateralityField {
    pub enabled: bool,
    pub value: Option<CodedValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterFormState {
    pub reason_for_encounter: FieldValue,
    pub procedure: FieldValue,
    pub diagnosis: FieldValue,
    pub diagnosis_note: String,
    pub laterality: LateralityField,
    pub encounter_note: String,
    pub boosted: bool,
}

/// A single edit to the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormUpdate {
    Text(AutocompleteField, String),
    Select(AutocompleteField, CodedValue),
    DiagnosisNote(String),
    EncounterNote(String),
    Boosted(bool),
    Laterality(Option<CodedValue>),
    LateralityResolved(LateralityOutcome),
}

impl EncounterFormState {
    pub fn field(&self, field: AutocompleteField) -> &FieldValue {
        match field {
            AutocompleteField::ReasonForEncounter => &self.reason_for_encounter,
            AutocompleteField::Diagnosis => &self.diagnosis,
            AutocompleteField::Procedure => &self.procedure,
        }
    }

    fn field_mut(&mut self, field: AutocompleteField) -> &mut FieldValue {
        match field {
            AutocompleteField::ReasonForEncounter => &mut self.reason_for_encounter,
            AutocompleteField::Diagnosis => &mut self.diagnosis,
            AutocompleteField::Procedure => &mut self.procedure,
        }
    }

    /// Return the state after `update`.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidInput`] when setting laterality while it is disabled.
    pub fn apply(&self, update: FormUpdate) -> EncounterResult<Self> {
        let mut next = self.clone();
        match update {
            FormUpdate::Text(field, text) => {
                *next.field_mut(field) = if text.is_empty() {
                    FieldValue::Empty
                } else {
                    FieldValue::Text(text)
                };
            }
            FormUpdate::Select(field, value) => {
                *next.field_mut(field) = FieldValue::Selected(value);
            }
            FormUpdate::DiagnosisNote(note) => next.diagnosis_note = note,
            FormUpdate::EncounterNote(note) => next.encounter_note = note,
            FormUpdate::Boosted(boosted) => next.boosted = boosted,
            FormUpdate::Laterality(value) => {
                if !next.laterality.enabled && value.is_some() {
                    return Err(EncounterError::InvalidInput(
                        "laterality does not apply to the selected procedure".into(),
                    ));
                }
                next.laterality.value = value;
            }
            FormUpdate::LateralityResolved(outcome) => {
                next.laterality = LateralityField {
                    enabled: outcome.enables_field(),
                    value: outcome.value().cloned(),
                };
            }
        }
        Ok(next)
    }

    /// Map the form onto a record ready for the store.
    ///
    /// Every field is optional, so a form holding only notes still yields an encounter.
    ///
    /// # Errors
    ///
    /// - [`EncounterError::UnselectedValue`] if a coded field holds text never picked from the list
    /// - [`EncounterError::InvalidInput`] if a selected or laterality code is not a SNOMED CT identifier
    pub fn to_new_encounter(&self, created_at: DateTime<Utc>) -> EncounterResult<NewEncounter> {
        let reason_for_encounter = self
            .reason_for_encounter
            .resolve(AutocompleteField::ReasonForEncounter.name())?;
        let procedure = self.procedure.resolve(AutocompleteField::Procedure.name())?;
        let diagnosis = self.diagnosis.resolve(AutocompleteField::Diagnosis.name())?;

        let laterality = match &self.laterality {
            LateralityField {
                enabled: true,
                value: Some(value),
            } => {
                value.sctid()?;
                Some(value.clone())
            }
            _ => None,
        };

        Ok(NewEncounter {
            reason_for_encounter,
            procedure,
            diagnosis,
            diagnosis_note: self.diagnosis_note.clone(),
            laterality,
            encounter_note: self.encounter_note.clone(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diabetes() -> CodedValue {
        CodedValue::new("44054006", "Type 2 diabetes mellitus")
    }

    #[test]
    fn apply_leaves_original_untouched() {
        let initial = EncounterFormState::default();
        let next = initial
            .apply(FormUpdate::Select(AutocompleteField::Diagnosis, diabetes()))
            .unwrap();

        assert_eq!(initial.diagnosis, FieldValue::Empty);
        assert_eq!(next.diagnosis, FieldValue::Selected(diabetes()));
    }

    #[test]
    fn laterality_starts_disabled() {
        let initial = EncounterFormState::default();
        assert!(!initial.laterality.enabled);

        let err = initial
            .apply(FormUpdate::Laterality(Some(CodedValue::new("7771000", "Left"))))
            .expect_err("disabled");
        assert!(matches!(err, EncounterError::InvalidInput(_)));

        // Clearing a disabled field is harmless.
        assert!(initial.apply(FormUpdate::Laterality(None)).is_ok());
    }

    #[test]
    fn resolved_outcomes_drive_the_laterality_field() {
        let left = CodedValue::new("7771000", "Left");
        let state = EncounterFormState::default()
            .apply(FormUpdate::LateralityResolved(LateralityOutcome::Lateralised(
                left.clone(),
            )))
            .unwrap();
        assert_eq!(
            state.laterality,
            LateralityField {
                enabled: true,
                value: Some(left)
            }
        );

        let state = state
            .apply(FormUpdate::LateralityResolved(
                LateralityOutcome::SiteWithoutLaterality,
            ))
            .unwrap();
        assert!(state.laterality.enabled);
        assert_eq!(state.laterality.value, None);

        let state = state
            .apply(FormUpdate::LateralityResolved(LateralityOutcome::NoSite))
            .unwrap();
        assert_eq!(state.laterality, LateralityField::default());
    }

    #[test]
    fn empty_text_clears_the_field() {
        let state = EncounterFormState::default()
            .apply(FormUpdate::Text(AutocompleteField::Procedure, "app".into()))
            .unwrap()
            .apply(FormUpdate::Text(AutocompleteField::Procedure, String::new()))
            .unwrap();
        assert_eq!(state.procedure, FieldValue::Empty);
    }

    #[test]
    fn notes_alone_make_an_encounter() {
        let state = EncounterFormState::default()
            .apply(FormUpdate::EncounterNote("Follow up in 2 weeks".into()))
            .unwrap();
        let encounter = state.to_new_encounter(Utc::now()).unwrap();
        assert_eq!(encounter.encounter_note, "Follow up in 2 weeks");
        assert_eq!(encounter.procedure, None);
        assert_eq!(encounter.diagnosis, None);
    }

    #[test]
    fn new_encounter_rejects_codes_that_are_not_identifiers() {
        let state = EncounterFormState::default()
            .apply(FormUpdate::Select(
                AutocompleteField::Procedure,
                CodedValue::new("80146002", "Appendectomy"),
            ))
            .unwrap()
            .apply(FormUpdate::Select(
                AutocompleteField::Diagnosis,
                CodedValue::new("", "Type 2 diabetes mellitus"),
            ))
            .unwrap();
        let err = state.to_new_encounter(Utc::now()).expect_err("blank code");
        assert!(matches!(err, EncounterError::InvalidInput(_)));
    }

    #[test]
    fn new_encounter_rejects_unselected_text() {
        let state = EncounterFormState::default()
            .apply(FormUpdate::Select(AutocompleteField::Diagnosis, diabetes()))
            .unwrap()
            .apply(FormUpdate::Text(AutocompleteField::Procedure, "append".into()))
            .unwrap();
        let err = state.to_new_encounter(Utc::now()).expect_err("unselected");
        assert!(matches!(err, EncounterError::UnselectedValue("procedure")));
    }

    #[test]
    fn new_encounter_tolerates_missing_reason_and_laterality() {
        let now = Utc::now();
        let state = EncounterFormState::default()
            .apply(FormUpdate::Select(AutocompleteField::Diagnosis, diabetes()))
            .unwrap()
            .apply(FormUpdate::DiagnosisNote("HbA1c 58".into()))
            .unwrap();

        let encounter = state.to_new_encounter(now).unwrap();
        assert_eq!(encounter.reason_for_encounter, None);
        assert_eq!(encounter.laterality, None);
        assert_eq!(encounter.diagnosis, Some(diabetes()));
        assert_eq!(encounter.diagnosis_note, "HbA1c 58");
        assert_eq!(encounter.created_at, now);
    }
}
