#[derive(Debug, thiserror::Error)]
pub enum EncounterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("terminology server unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("terminology server returned {status}: {message}")]
    Terminology { status: u16, message: String },
    #[error("expansion returned no concepts")]
    EmptyExpansion,
    #[error("{0} has text that was not selected from the suggestions")]
    UnselectedValue(&'static str),
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("data store error: {0}")]
    Store(String),
    #[error("{0} autocomplete channel is closed")]
    ChannelClosed(&'static str),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to parse configuration YAML: {0}")]
    ConfigParse(serde_yaml::Error),
}

impl EncounterError {
    /// True for failures a user can fix by changing the form contents.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EncounterError::InvalidInput(_)
                | EncounterError::UnselectedValue(_)
        )
    }
}

impl From<reqwest::Error> for EncounterError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EncounterError::Terminology {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => EncounterError::NetworkUnavailable(err.to_string()),
        }
    }
}

pub type EncounterResult<T> = std::result::Result<T, EncounterError>;
