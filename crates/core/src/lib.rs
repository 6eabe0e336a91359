//! # Encounter Core
//!
//! Core logic for recording a clinical encounter with SNOMED CT coded fields.
//!
//! This crate contains:
//! - Debounced autocomplete channels backed by a FHIR terminology server
//! - The preferred diagnosis overlay ("boost")
//! - The procedure laterality cascade
//! - Form state, validation and the save flow into an [`EncounterStore`]
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.

pub mod autocomplete;
pub mod boost;
pub mod coding;
pub mod config;
pub mod constants;
pub mod encounter;
pub mod error;
pub mod form;
pub mod laterality;
pub mod offline;
pub mod store;
pub mod terminology;

pub use autocomplete::{AutocompleteChannel, ChannelSettings, LookupStatus, Suggestions};
pub use boost::PreferredDiagnoses;
pub use coding::{AutocompleteField, CodedValue, FieldInput, FieldValue};
pub use config::CoreConfig;
pub use encounter::{EncounterForm, LateralityLookup};
pub use error::{EncounterError, EncounterResult};
pub use form::{EncounterFormState, FormUpdate, LateralityField};
pub use laterality::{LateralityOutcome, LateralityResolver};
pub use offline::OfflineTerminology;
pub use store::{EncounterRecord, EncounterStore, InMemoryStore, ListEntry, NewEncounter};
pub use terminology::{ConceptSubset, FhirTerminologyClient, TerminologyService};
