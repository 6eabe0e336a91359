//! Terminology lookups against a FHIR terminology server.
//!
//! [`TerminologyService`] is the seam between the form and the network. The production
//! implementation, [`FhirTerminologyClient`], issues `ValueSet/$expand` GETs with `reqwest`.
//! Tests substitute in-memory implementations.

use crate::coding::{sctid, AutocompleteField, CodedValue};
use crate::config::CoreConfig;
use crate::constants::{
    DIAGNOSIS_ECL, ENCOUNTER_REASON_ECL, LATERALITY_ATTRIBUTE, LATERALITY_ECL, PROCEDURE_ECL,
    PROCEDURE_SITE_ATTRIBUTE, REQUEST_TIMEOUT_SECS,
};
use crate::{EncounterError, EncounterResult};
use async_trait::async_trait;
use fhir::{ExpandRequest, OperationOutcome, ValueSet};
use std::time::Duration;
use url::Url;

/// Expands implicit SNOMED CT value sets.
#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// Expand `request` and return its concepts in server order.
    ///
    /// # Errors
    ///
    /// - [`EncounterError::EmptyExpansion`] when the expansion has no `contains` member
    /// - [`EncounterError::NetworkUnavailable`] when the server cannot be reached
    /// - [`EncounterError::Terminology`] when the server rejects the request
    async fn expand(&self, request: &ExpandRequest) -> EncounterResult<Vec<CodedValue>>;
}

/// The fixed concept subsets the form searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConceptSubset {
    EncounterReason,
    Diagnosis,
    Procedure,
    Laterality,
}

impl ConceptSubset {
    pub fn ecl(&self) -> &'static str {
        match self {
            ConceptSubset::EncounterReason => ENCOUNTER_REASON_ECL,
            ConceptSubset::Diagnosis => DIAGNOSIS_ECL,
            ConceptSubset::Procedure => PROCEDURE_ECL,
            ConceptSubset::Laterality => LATERALITY_ECL,
        }
    }

    /// Base request for this subset, with designations and an optional result cap.
    pub fn request(&self, count: Option<u32>) -> EncounterResult<ExpandRequest> {
        let request = ExpandRequest::ecl(self.ecl())?.with_designations();
        Ok(match count {
            Some(count) => request.with_count(count),
            None => request,
        })
    }
}

impl From<AutocompleteField> for ConceptSubset {
    fn from(field: AutocompleteField) -> Self {
        match field {
            AutocompleteField::ReasonForEncounter => ConceptSubset::EncounterReason,
            AutocompleteField::Diagnosis => ConceptSubset::Diagnosis,
            AutocompleteField::Procedure => ConceptSubset::Procedure,
        }
    }
}

/// Procedure sites of `procedure_code`: `<code>.<< 363704007`.
pub fn procedure_site_request(procedure_code: &str) -> EncounterResult<ExpandRequest> {
    let code = sctid(procedure_code)?;
    Ok(ExpandRequest::ecl(format!(
        "{code}.<< {PROCEDURE_SITE_ATTRIBUTE}"
    ))?)
}

/// Laterality of the procedure sites of `procedure_code`: `<code>.<< 363704007.272741003`.
pub fn procedure_laterality_request(procedure_code: &str) -> EncounterResult<ExpandRequest> {
    let code = sctid(procedure_code)?;
    Ok(ExpandRequest::ecl(format!(
        "{code}.<< {PROCEDURE_SITE_ATTRIBUTE}.{LATERALITY_ATTRIBUTE}"
    ))?)
}

/// `reqwest`-backed terminology client.
#[derive(Clone, Debug)]
pub struct FhirTerminologyClient {
    http: reqwest::Client,
    server: Url,
}

impl FhirTerminologyClient {
    pub fn new(server: Url) -> EncounterResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                EncounterError::InvalidInput(format!("failed to create HTTP client: {e}"))
            })?;

        tracing::info!("terminology client using {}", server);
        Ok(Self { http, server })
    }

    pub fn from_config(cfg: &CoreConfig) -> EncounterResult<Self> {
        Self::new(cfg.terminology_server().clone())
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Run the expansion and return the parsed wire data, including an absent `contains`.
    pub async fn expand_raw(&self, request: &ExpandRequest) -> EncounterResult<fhir::ExpansionData> {
        let url = request.to_url(self.server.as_str())?;
        tracing::debug!("expanding ecl={} filter={:?}", request.expression(), request.filter());

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/fhir+json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match OperationOutcome::parse(&body) {
                Ok(outcome) => outcome.summary(),
                Err(_) => body.chars().take(200).collect(),
            };
            tracing::warn!("terminology server returned {}: {}", status, message);
            return Err(EncounterError::Terminology {
                status: status.as_u16(),
                message,
            });
        }

        Ok(ValueSet::parse(&body)?)
    }
}

#[async_trait]
impl TerminologyService for FhirTerminologyClient {
    async fn expand(&self, request: &ExpandRequest) -> EncounterResult<Vec<CodedValue>> {
        let expansion = self.expand_raw(request).await?;
        match expansion.contains {
            Some(concepts) => Ok(concepts.into_iter().map(CodedValue::from).collect()),
            None => Err(EncounterError::EmptyExpansion),
        }
    }
}
