//! Demo data store.
//!
//! Holds the encounters, problems and procedures recorded during a session. Records are
//! append-only and immutable once stored.

use crate::coding::CodedValue;
use crate::{EncounterError, EncounterResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A stored encounter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub id: Uuid,
    pub reason_for_encounter: Option<CodedValue>,
    pub procedure: Option<CodedValue>,
    pub diagnosis: Option<CodedValue>,
    pub diagnosis_note: String,
    pub laterality: Option<CodedValue>,
    pub encounter_note: String,
    pub created_at: DateTime<Utc>,
}

/// Field values for an encounter about to be stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewEncounter {
    pub reason_for_encounter: Option<CodedValue>,
    pub procedure: Option<CodedValue>,
    pub diagnosis: Option<CodedValue>,
    pub diagnosis_note: String,
    pub laterality: Option<CodedValue>,
    pub encounter_note: String,
    pub created_at: DateTime<Utc>,
}

/// A problem-list or procedure-list entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: Uuid,
    pub code: String,
    pub display: String,
    pub recorded_at: DateTime<Utc>,
}

pub type ProblemRecord = ListEntry;
pub type ProcedureRecord = ListEntry;

/// Storage for encounter form output.
pub trait EncounterStore: Send + Sync {
    fn encounters(&self) -> EncounterResult<Vec<EncounterRecord>>;
    fn problems(&self) -> EncounterResult<Vec<ProblemRecord>>;
    fn procedures(&self) -> EncounterResult<Vec<ProcedureRecord>>;

    fn add_encounter(&self, encounter: NewEncounter) -> EncounterResult<EncounterRecord>;
    fn add_problem(
        &self,
        code: &str,
        display: &str,
        recorded_at: DateTime<Utc>,
    ) -> EncounterResult<ProblemRecord>;
    fn add_procedure(
        &self,
        code: &str,
        display: &str,
        recorded_at: DateTime<Utc>,
    ) -> EncounterResult<ProcedureRecord>;
}

#[derive(Debug, Default)]
struct Tables {
    encounters: Vec<EncounterRecord>,
    problems: Vec<ProblemRecord>,
    procedures: Vec<ProcedureRecord>,
}

/// Process-memory store. Clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> EncounterResult<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| EncounterError::Store("store lock poisoned".into()))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> EncounterResult<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| EncounterError::Store("store lock poisoned".into()))?;
        Ok(f(&mut tables))
    }
}

fn list_entry(code: &str, display: &str, recorded_at: DateTime<Utc>) -> EncounterResult<ListEntry> {
    if code.trim().is_empty() {
        return Err(EncounterError::InvalidInput("code cannot be empty".into()));
    }
    Ok(ListEntry {
        id: Uuid::new_v4(),
        code: code.to_owned(),
        display: display.to_owned(),
        recorded_at,
    })
}

impl EncounterStore for InMemoryStore {
    fn encounters(&self) -> EncounterResult<Vec<EncounterRecord>> {
        self.read(|t| t.encounters.clone())
    }

    fn problems(&self) -> EncounterResult<Vec<ProblemRecord>> {
        self.read(|t| t.problems.clone())
    }

    fn procedures(&self) -> EncounterResult<Vec<ProcedureRecord>> {
        self.read(|t| t.procedures.clone())
    }

    fn add_encounter(&self, encounter: NewEncounter) -> EncounterResult<EncounterRecord> {
        let record = EncounterRecord {
            id: Uuid::new_v4(),
            reason_for_encounter: encounter.reason_for_encounter,
            procedure: encounter.procedure,
            diagnosis: encounter.diagnosis,
            diagnosis_note: encounter.diagnosis_note,
            laterality: encounter.laterality,
            encounter_note: encounter.encounter_note,
            created_at: encounter.created_at,
        };
        self.write(|t| t.encounters.push(record.clone()))?;
        tracing::info!("stored encounter {}", record.id);
        Ok(record)
    }

    fn add_problem(
        &self,
        code: &str,
        display: &str,
        recorded_at: DateTime<Utc>,
    ) -> EncounterResult<ProblemRecord> {
        let entry = list_entry(code, display, recorded_at)?;
        self.write(|t| t.problems.push(entry.clone()))?;
        Ok(entry)
    }

    fn add_procedure(
        &self,
        code: &str,
        display: &str,
        recorded_at: DateTime<Utc>,
    ) -> EncounterResult<ProcedureRecord> {
        let entry = list_entry(code, display, recorded_at)?;
        self.write(|t| t.procedures.push(entry.clone()))?;
        Ok(entry)
    }
}
