//! In-memory [`TerminologyService`] for tests and offline demos.
//!
//! Concepts are registered per ECL expression. Expansions filter them by case-insensitive
//! substring match on the display, honour the request's `count`, and record every request so
//! callers can assert on what was sent.

use crate::coding::CodedValue;
use crate::terminology::TerminologyService;
use crate::{EncounterError, EncounterResult};
use async_trait::async_trait;
use fhir::ExpandRequest;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct OfflineState {
    subsets: HashMap<String, Vec<CodedValue>>,
    missing_contains: HashSet<String>,
    delays: HashMap<String, Duration>,
    unavailable: bool,
    calls: Vec<ExpandRequest>,
}

#[derive(Clone, Debug, Default)]
pub struct OfflineTerminology {
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OfflineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register the concepts of an ECL expression.
    pub fn with_concepts(self, ecl: &str, concepts: Vec<CodedValue>) -> Self {
        self.lock().subsets.insert(ecl.to_owned(), concepts);
        self
    }

    /// Answer requests filtered by `filter` with an expansion lacking `contains`.
    pub fn with_missing_contains_for(self, filter: &str) -> Self {
        self.lock().missing_contains.insert(filter.to_owned());
        self
    }

    /// Delay answers to requests filtered by `filter`.
    pub fn with_delay(self, filter: &str, delay: Duration) -> Self {
        self.lock().delays.insert(filter.to_owned(), delay);
        self
    }

    /// Simulate the server being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<ExpandRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn calls_for(&self, ecl: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.expression() == ecl)
            .count()
    }
}

#[async_trait]
impl TerminologyService for OfflineTerminology {
    async fn expand(&self, request: &ExpandRequest) -> EncounterResult<Vec<CodedValue>> {
        let filter = request.filter().unwrap_or_default().to_owned();

        let delay = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            if state.unavailable {
                return Err(EncounterError::NetworkUnavailable(
                    "offline terminology marked unavailable".into(),
                ));
            }
            state.delays.get(&filter).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.missing_contains.contains(&filter) {
            return Err(EncounterError::EmptyExpansion);
        }
        let concepts = state
            .subsets
            .get(request.expression())
            .ok_or(EncounterError::EmptyExpansion)?;

        let needle = filter.to_lowercase();
        let limit = request.count().map_or(usize::MAX, |c| c as usize);
        Ok(concepts
            .iter()
            .filter(|c| c.display.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}
