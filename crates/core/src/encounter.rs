//! Encounter form controller.
//!
//! [`EncounterForm`] ties the form state to its three autocomplete channels, the laterality
//! cascade and the store. It is driven from one task; callers that share it across tasks wrap it
//! in a `tokio::sync::Mutex`.
//!
//! Such callers should not hold the lock across the laterality lookups. Use
//! [`EncounterForm::choose`] under the lock, run the returned [`LateralityLookup`] without it,
//! then hand the result to [`EncounterForm::finish_laterality`]. A result for a procedure that has
//! since been replaced is dropped.

use crate::autocomplete::{AutocompleteChannel, BoostOverlay, ChannelSettings, Suggestions};
use crate::boost::PreferredDiagnoses;
use crate::coding::{AutocompleteField, CodedValue, FieldInput};
use crate::config::CoreConfig;
use crate::form::{EncounterFormState, FormUpdate};
use crate::laterality::{LateralityOutcome, LateralityResolver};
use crate::store::{EncounterRecord, EncounterStore};
use crate::terminology::TerminologyService;
use crate::EncounterResult;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

pub struct EncounterForm {
    state: EncounterFormState,
    reason_channel: AutocompleteChannel,
    diagnosis_channel: AutocompleteChannel,
    procedure_channel: AutocompleteChannel,
    boost_tx: watch::Sender<bool>,
    resolver: LateralityResolver,
    store: Arc<dyn EncounterStore>,
    /// Bumped on every procedure selection and reset.
    procedure_generation: u64,
}

/// Laterality lookups for one procedure selection.
#[derive(Clone)]
pub struct LateralityLookup {
    resolver: LateralityResolver,
    procedure: CodedValue,
    generation: u64,
}

impl LateralityLookup {
    pub fn procedure(&self) -> &CodedValue {
        &self.procedure
    }

    pub async fn run(&self) -> EncounterResult<LateralityOutcome> {
        self.resolver.resolve(&self.procedure).await
    }
}

impl EncounterForm {
    /// Build a form from startup configuration. Must be called inside a tokio runtime.
    pub fn new(
        cfg: &CoreConfig,
        terminology: Arc<dyn TerminologyService>,
        store: Arc<dyn EncounterStore>,
    ) -> Self {
        let settings = ChannelSettings {
            debounce: cfg.debounce(),
            result_count: cfg.result_count(),
        };
        Self::with_settings(
            settings,
            Arc::new(cfg.preferred_diagnoses().clone()),
            terminology,
            store,
        )
    }

    pub fn with_settings(
        settings: ChannelSettings,
        preferred: Arc<PreferredDiagnoses>,
        terminology: Arc<dyn TerminologyService>,
        store: Arc<dyn EncounterStore>,
    ) -> Self {
        let (boost_tx, boost_rx) = watch::channel(false);
        let spawn = |field: AutocompleteField, boost: Option<BoostOverlay>| {
            AutocompleteChannel::spawn(field, Arc::clone(&terminology), settings, boost)
        };

        let reason_channel = spawn(AutocompleteField::ReasonForEncounter, None);
        let procedure_channel = spawn(AutocompleteField::Procedure, None);
        let diagnosis_channel = spawn(
            AutocompleteField::Diagnosis,
            Some(BoostOverlay {
                preferred,
                enabled: boost_rx,
            }),
        );

        Self {
            state: EncounterFormState::default(),
            reason_channel,
            diagnosis_channel,
            procedure_channel,
            boost_tx,
            resolver: LateralityResolver::new(terminology),
            store,
            procedure_generation: 0,
        }
    }

    pub fn state(&self) -> &EncounterFormState {
        &self.state
    }

    fn channel(&self, field: AutocompleteField) -> &AutocompleteChannel {
        match field {
            AutocompleteField::ReasonForEncounter => &self.reason_channel,
            AutocompleteField::Diagnosis => &self.diagnosis_channel,
            AutocompleteField::Procedure => &self.procedure_channel,
        }
    }

    /// Record free text typed into an autocomplete field and queue a lookup for it.
    pub fn type_text(&mut self, field: AutocompleteField, text: &str) -> EncounterResult<()> {
        let next = self.state.apply(FormUpdate::Text(field, text.to_owned()))?;
        self.channel(field).push(FieldInput::Text(text.to_owned()))?;
        self.state = next;
        Ok(())
    }

    /// Select a coded value. Selecting a procedure also resolves its laterality.
    ///
    /// # Errors
    ///
    /// A code that is not a SNOMED CT identifier is rejected and the form is unchanged. A failed
    /// laterality lookup is returned after the selection has been recorded, with laterality
    /// cleared and disabled.
    pub async fn select(&mut self, field: AutocompleteField, value: CodedValue) -> EncounterResult<()> {
        if let Some(lookup) = self.choose(field, value)? {
            let result = lookup.run().await;
            self.finish_laterality(&lookup, result)?;
        }
        Ok(())
    }

    /// Record a selection. For a procedure, returns the laterality lookup still to run.
    pub fn choose(
        &mut self,
        field: AutocompleteField,
        value: CodedValue,
    ) -> EncounterResult<Option<LateralityLookup>> {
        value.sctid()?;
        let next = self.state.apply(FormUpdate::Select(field, value.clone()))?;
        self.channel(field).push(FieldInput::Selected(value.clone()))?;
        self.state = next;

        if field != AutocompleteField::Procedure {
            return Ok(None);
        }
        self.procedure_generation += 1;
        Ok(Some(LateralityLookup {
            resolver: self.resolver.clone(),
            procedure: value,
            generation: self.procedure_generation,
        }))
    }

    /// Apply the result of a [`LateralityLookup`].
    ///
    /// Results for a superseded selection are ignored. A failure clears and disables laterality
    /// and is returned.
    pub fn finish_laterality(
        &mut self,
        lookup: &LateralityLookup,
        result: EncounterResult<LateralityOutcome>,
    ) -> EncounterResult<()> {
        if lookup.generation != self.procedure_generation {
            tracing::debug!(
                "dropping laterality for superseded procedure {}",
                lookup.procedure.value
            );
            return Ok(());
        }

        match result {
            Ok(outcome) => {
                self.state = self.state.apply(FormUpdate::LateralityResolved(outcome))?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("laterality lookup for {} failed: {}", lookup.procedure.value, e);
                self.state = self
                    .state
                    .apply(FormUpdate::LateralityResolved(LateralityOutcome::NoSite))?;
                Err(e)
            }
        }
    }

    pub fn set_laterality(&mut self, laterality: Option<CodedValue>) -> EncounterResult<()> {
        self.state = self.state.apply(FormUpdate::Laterality(laterality))?;
        Ok(())
    }

    pub fn set_diagnosis_note(&mut self, note: &str) -> EncounterResult<()> {
        self.state = self.state.apply(FormUpdate::DiagnosisNote(note.to_owned()))?;
        Ok(())
    }

    pub fn set_encounter_note(&mut self, note: &str) -> EncounterResult<()> {
        self.state = self.state.apply(FormUpdate::EncounterNote(note.to_owned()))?;
        Ok(())
    }

    /// Toggle the preferred diagnosis overlay. Takes effect from the next diagnosis lookup.
    pub fn set_boosted(&mut self, boosted: bool) -> EncounterResult<()> {
        self.state = self.state.apply(FormUpdate::Boosted(boosted))?;
        self.boost_tx.send_replace(boosted);
        Ok(())
    }

    pub fn suggestions(&self, field: AutocompleteField) -> Suggestions {
        self.channel(field).snapshot()
    }

    pub fn subscribe(&self, field: AutocompleteField) -> watch::Receiver<Suggestions> {
        self.channel(field).subscribe()
    }

    /// Values offered by the laterality picker. The blank choice is `None` in
    /// [`EncounterForm::set_laterality`] and is not part of this list.
    pub async fn load_laterality_options(&self) -> EncounterResult<Vec<CodedValue>> {
        self.resolver.options().await
    }

    /// A handle for running terminology lookups without borrowing the form.
    pub fn laterality_resolver(&self) -> LateralityResolver {
        self.resolver.clone()
    }

    pub fn encounters(&self) -> EncounterResult<Vec<EncounterRecord>> {
        self.store.encounters()
    }

    /// Persist the form and reset it.
    ///
    /// Selected procedures and diagnoses are also added to the procedure and problem lists.
    ///
    /// # Errors
    ///
    /// Every field is validated before the first write, so validation errors leave the form and
    /// the store untouched.
    pub fn save(&mut self) -> EncounterResult<EncounterRecord> {
        let created_at = Utc::now();
        let encounter = self.state.to_new_encounter(created_at)?;

        if let Some(procedure) = &encounter.procedure {
            self.store
                .add_procedure(&procedure.value, &procedure.display, created_at)?;
        }
        if let Some(diagnosis) = &encounter.diagnosis {
            self.store
                .add_problem(&diagnosis.value, &diagnosis.display, created_at)?;
        }
        let record = self.store.add_encounter(encounter)?;

        self.reset();
        Ok(record)
    }

    /// Back to the initial state. Nothing is pushed into the channels.
    pub fn reset(&mut self) {
        self.state = EncounterFormState::default();
        self.procedure_generation += 1;
        self.boost_tx.send_replace(false);
    }

    /// Release the autocomplete channels.
    pub async fn close(&mut self) {
        self.reason_channel.close().await;
        self.diagnosis_channel.close().await;
        self.procedure_channel.close().await;
    }
}
