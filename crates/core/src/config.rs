//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read only by [`CoreConfig::from_env`],
//! never while the form is handling input.

use crate::boost::PreferredDiagnoses;
use crate::constants::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_RESULT_COUNT, DEFAULT_TERMINOLOGY_SERVER, PREFERRED_DIAGNOSES_FILE,
};
use crate::{EncounterError, EncounterResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    terminology_server: Url,
    debounce: Duration,
    result_count: u32,
    preferred_diagnoses: PreferredDiagnoses,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidInput`] if the server is not an absolute http(s) URL or
    /// `result_count` is zero.
    pub fn new(
        terminology_server: &str,
        debounce: Duration,
        result_count: u32,
        preferred_diagnoses: PreferredDiagnoses,
    ) -> EncounterResult<Self> {
        let terminology_server = parse_server_url(terminology_server)?;

        if result_count == 0 {
            return Err(EncounterError::InvalidInput(
                "result_count must be greater than zero".into(),
            ));
        }

        Ok(Self {
            terminology_server,
            debounce,
            result_count,
            preferred_diagnoses,
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// - `ENCOUNTER_TERMINOLOGY_SERVER`
    /// - `ENCOUNTER_DEBOUNCE_MS`
    /// - `ENCOUNTER_RESULT_COUNT`
    /// - `ENCOUNTER_PREFERRED_DIAGNOSES`
    pub fn from_env() -> EncounterResult<Self> {
        let server = std::env::var("ENCOUNTER_TERMINOLOGY_SERVER")
            .unwrap_or_else(|_| DEFAULT_TERMINOLOGY_SERVER.into());
        let debounce = debounce_from_env_value(std::env::var("ENCOUNTER_DEBOUNCE_MS").ok())?;
        let result_count =
            result_count_from_env_value(std::env::var("ENCOUNTER_RESULT_COUNT").ok())?;

        let preferred_override = std::env::var("ENCOUNTER_PREFERRED_DIAGNOSES")
            .ok()
            .map(PathBuf::from);
        let preferred_path = resolve_preferred_diagnoses_file(preferred_override)?;
        let preferred = PreferredDiagnoses::load(&preferred_path)?;

        tracing::debug!(
            "loaded {} preferred diagnoses from {}",
            preferred.len(),
            preferred_path.display()
        );

        Self::new(&server, debounce, result_count, preferred)
    }

    pub fn terminology_server(&self) -> &Url {
        &self.terminology_server
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn result_count(&self) -> u32 {
        self.result_count
    }

    pub fn preferred_diagnoses(&self) -> &PreferredDiagnoses {
        &self.preferred_diagnoses
    }
}

fn parse_server_url(value: &str) -> EncounterResult<Url> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EncounterError::InvalidInput(
            "terminology server URL cannot be empty".into(),
        ));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        EncounterError::InvalidInput(format!("invalid terminology server URL '{trimmed}': {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(EncounterError::InvalidInput(format!(
            "terminology server URL must use http or https, got {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Resolve the preferred diagnosis file without reading environment variables.
///
/// If `override_path` is provided it must be an existing file. Otherwise this searches for
/// `preferred/diagnoses.yaml` relative to the current working directory and then walks up from
/// `CARGO_MANIFEST_DIR`.
pub fn resolve_preferred_diagnoses_file(override_path: Option<PathBuf>) -> EncounterResult<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path);
        }
        return Err(EncounterError::InvalidInput(format!(
            "ENCOUNTER_PREFERRED_DIAGNOSES override is not a file: {}",
            path.display()
        )));
    }

    let cwd_relative = PathBuf::from(PREFERRED_DIAGNOSES_FILE);
    if cwd_relative.is_file() {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(PREFERRED_DIAGNOSES_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(EncounterError::InvalidInput(format!(
        "could not locate {PREFERRED_DIAGNOSES_FILE}"
    )))
}

/// Parse the debounce window from an optional millisecond value.
///
/// `None` or blank yields the default of 500ms.
pub fn debounce_from_env_value(value: Option<String>) -> EncounterResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let millis = value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                EncounterError::InvalidInput(format!("ENCOUNTER_DEBOUNCE_MS is not a number: {v}"))
            })
        })
        .transpose()?;

    Ok(Duration::from_millis(millis.unwrap_or(DEFAULT_DEBOUNCE_MS)))
}

/// Parse the autocomplete result cap from an optional value.
///
/// `None` or blank yields the default of 20.
pub fn result_count_from_env_value(value: Option<String>) -> EncounterResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_RESULT_COUNT),
        Some(v) => match v.parse::<u32>() {
            Ok(0) | Err(_) => Err(EncounterError::InvalidInput(format!(
                "ENCOUNTER_RESULT_COUNT must be a positive integer: {v}"
            ))),
            Ok(count) => Ok(count),
        },
    }
}
