//! Laterality cascade.
//!
//! Selecting a procedure decides whether the laterality field applies:
//! - no procedure site → laterality disabled and cleared
//! - a site but no recorded laterality → laterality enabled and cleared
//! - a site with a laterality → laterality enabled and set to the first one returned
//!
//! Both lookups are issued together; only the laterality lookup supplies the value.

use crate::coding::CodedValue;
use crate::terminology::{
    procedure_laterality_request, procedure_site_request, ConceptSubset, TerminologyService,
};
use crate::{EncounterError, EncounterResult};
use std::sync::Arc;

/// What a procedure selection means for the laterality field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LateralityOutcome {
    NoSite,
    SiteWithoutLaterality,
    Lateralised(CodedValue),
}

impl LateralityOutcome {
    pub fn enables_field(&self) -> bool {
        !matches!(self, LateralityOutcome::NoSite)
    }

    pub fn value(&self) -> Option<&CodedValue> {
        match self {
            LateralityOutcome::Lateralised(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct LateralityResolver {
    service: Arc<dyn TerminologyService>,
}

/// Treat an expansion without `contains` as an empty result.
fn entries(result: EncounterResult<Vec<CodedValue>>) -> EncounterResult<Vec<CodedValue>> {
    match result {
        Err(EncounterError::EmptyExpansion) => Ok(Vec::new()),
        other => other,
    }
}

impl LateralityResolver {
    pub fn new(service: Arc<dyn TerminologyService>) -> Self {
        Self { service }
    }

    /// Run the site and laterality lookups for `procedure`.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidInput`] if the procedure code is not a SNOMED CT
    /// identifier, or the lookup error if either request fails.
    pub async fn resolve(&self, procedure: &CodedValue) -> EncounterResult<LateralityOutcome> {
        let site_request = procedure_site_request(&procedure.value)?;
        let laterality_request = procedure_laterality_request(&procedure.value)?;

        let (sites, lateralities) = tokio::join!(
            self.service.expand(&site_request),
            self.service.expand(&laterality_request),
        );
        let sites = entries(sites)?;

        if sites.is_empty() {
            tracing::debug!("procedure {} has no site, laterality disabled", procedure.value);
            return Ok(LateralityOutcome::NoSite);
        }

        let outcome = match entries(lateralities)?.into_iter().next() {
            Some(laterality) => LateralityOutcome::Lateralised(laterality),
            None => LateralityOutcome::SiteWithoutLaterality,
        };
        tracing::debug!("procedure {} laterality: {:?}", procedure.value, outcome);
        Ok(outcome)
    }

    /// The laterality values offered in the picker.
    pub async fn options(&self) -> EncounterResult<Vec<CodedValue>> {
        let request = ConceptSubset::Laterality.request(None)?;
        entries(self.service.expand(&request).await)
    }
}
