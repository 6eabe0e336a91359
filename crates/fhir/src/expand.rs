//! `ValueSet/$expand` request construction.
//!
//! Every lookup the encounter form makes is an implicit SNOMED CT value set defined by an ECL
//! expression, expanded by the terminology server:
//!
//! `{server}/ValueSet/$expand?url=http://snomed.info/sct?fhir_vs=ecl/<ecl>&count=<n>&includeDesignations=true&filter=<text>`
//!
//! All query values are percent-encoded.

use crate::{FhirError, FhirResult, SNOMED_CT_SYSTEM};
use url::Url;

/// An expansion request for an implicit ECL value set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandRequest {
    ecl: String,
    count: Option<u32>,
    include_designations: bool,
    filter: Option<String>,
}

impl ExpandRequest {
    /// Start a request for the given ECL expression.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if the expression is empty or whitespace.
    pub fn ecl(expression: impl AsRef<str>) -> FhirResult<Self> {
        let expression = expression.as_ref().trim();
        if expression.is_empty() {
            return Err(FhirError::InvalidInput(
                "ECL expression cannot be empty".into(),
            ));
        }

        Ok(Self {
            ecl: expression.to_owned(),
            count: None,
            include_designations: false,
            filter: None,
        })
    }

    /// Cap the number of returned concepts.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Ask the server to include designations for each concept.
    pub fn with_designations(mut self) -> Self {
        self.include_designations = true;
        self
    }

    /// Restrict the expansion to concepts matching `text`.
    ///
    /// Blank text clears the filter.
    pub fn with_filter(mut self, text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        self.filter = (!text.is_empty()).then(|| text.to_owned());
        self
    }

    pub fn expression(&self) -> &str {
        &self.ecl
    }

    pub fn count(&self) -> Option<u32> {
        self.count
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// The implicit value set canonical, e.g. `http://snomed.info/sct?fhir_vs=ecl/< 71388002`.
    pub fn value_set_url(&self) -> String {
        format!("{SNOMED_CT_SYSTEM}?fhir_vs=ecl/{}", self.ecl)
    }

    /// Build the full `$expand` URL against `server` (the FHIR base, with or without trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidUrl`] if `server` is not an absolute URL.
    pub fn to_url(&self, server: &str) -> FhirResult<Url> {
        let base = server.trim().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/ValueSet/$expand"))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("url", &self.value_set_url());
            if let Some(count) = self.count {
                query.append_pair("count", &count.to_string());
            }
            if self.include_designations {
                query.append_pair("includeDesignations", "true");
            }
            if let Some(filter) = &self.filter {
                query.append_pair("filter", filter);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn builds_full_expand_url() {
        let url = ExpandRequest::ecl("< 404684003")
            .expect("valid ecl")
            .with_count(20)
            .with_designations()
            .with_filter("hyper")
            .to_url("https://snowstorm.example.org/fhir/")
            .expect("valid url");

        assert_eq!(url.path(), "/fhir/ValueSet/$expand");
        assert_eq!(
            pairs(&url),
            vec![
                (
                    "url".to_string(),
                    "http://snomed.info/sct?fhir_vs=ecl/< 404684003".to_string()
                ),
                ("count".to_string(), "20".to_string()),
                ("includeDesignations".to_string(), "true".to_string()),
                ("filter".to_string(), "hyper".to_string()),
            ]
        );
        assert!(!url.as_str().contains(' '));
        assert!(!url.as_str().contains('<'));
    }

    #[test]
    fn blank_filter_is_omitted() {
        let request = ExpandRequest::ecl("< 71388002")
            .expect("valid ecl")
            .with_filter("   ");
        assert_eq!(request.filter(), None);

        let url = request.to_url("http://localhost:8080/fhir").expect("url");
        assert!(pairs(&url).iter().all(|(k, _)| k != "filter"));
        assert!(pairs(&url).iter().all(|(k, _)| k != "count"));
    }

    #[test]
    fn refinement_expressions_survive_encoding() {
        let url = ExpandRequest::ecl("73211009.<< 363704007.272741003")
            .expect("valid ecl")
            .to_url("http://localhost:8080/fhir")
            .expect("url");

        assert_eq!(
            pairs(&url)[0].1,
            "http://snomed.info/sct?fhir_vs=ecl/73211009.<< 363704007.272741003"
        );
    }

    #[test]
    fn rejects_empty_expression() {
        assert!(matches!(
            ExpandRequest::ecl("  "),
            Err(FhirError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_relative_server() {
        let request = ExpandRequest::ecl("< 182353008").expect("valid ecl");
        assert!(matches!(
            request.to_url("snowstorm/fhir"),
            Err(FhirError::InvalidUrl(_))
        ));
    }
}
