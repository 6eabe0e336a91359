use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use encounter_core::{CoreConfig, EncounterForm, FhirTerminologyClient, InMemoryStore};

/// Main entry point for the encounter application
///
/// Resolves configuration, connects the form to the terminology server and serves the REST API
/// until Ctrl-C. The autocomplete channels are released before exit.
///
/// # Environment Variables
/// - `ENCOUNTER_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ENCOUNTER_TERMINOLOGY_SERVER`: FHIR terminology server base URL
/// - `ENCOUNTER_DEBOUNCE_MS`, `ENCOUNTER_RESULT_COUNT`, `ENCOUNTER_PREFERRED_DIAGNOSES`
///
/// # Errors
/// Returns an error if configuration is invalid, the address cannot be bound, or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("encounter_run=info".parse()?)
                .add_directive("encounter_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("ENCOUNTER_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::from_env()?;
    tracing::info!(
        "++ {} preferred diagnoses, debounce {:?}, {} results per lookup",
        cfg.preferred_diagnoses().len(),
        cfg.debounce(),
        cfg.result_count()
    );

    let terminology = Arc::new(FhirTerminologyClient::from_config(&cfg)?);
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(EncounterForm::new(&cfg, terminology, store));

    tracing::info!("++ Starting encounter REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    state.close().await;
    tracing::info!("-- Encounter REST stopped");
    Ok(())
}
