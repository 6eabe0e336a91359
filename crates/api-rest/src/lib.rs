//! # API REST
//!
//! REST API for the encounter form.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Form behaviour lives in `encounter-core`; this crate only translates HTTP to form calls.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use encounter_core::{
    AutocompleteField, CodedValue, EncounterError, EncounterForm, EncounterFormState,
    EncounterRecord, FieldValue, LookupStatus, Suggestions,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

/// Application state shared across REST API handlers.
///
/// The form is driven by one request at a time.
#[derive(Clone)]
pub struct AppState {
    form: Arc<Mutex<EncounterForm>>,
}

impl AppState {
    pub fn new(form: EncounterForm) -> Self {
        Self {
            form: Arc::new(Mutex::new(form)),
        }
    }

    /// Release the form's autocomplete channels.
    pub async fn close(&self) {
        self.form.lock().await.close().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CodedValueDto {
    pub value: String,
    pub display: String,
}

impl From<CodedValue> for CodedValueDto {
    fn from(v: CodedValue) -> Self {
        Self {
            value: v.value,
            display: v.display,
        }
    }
}

impl From<CodedValueDto> for CodedValue {
    fn from(v: CodedValueDto) -> Self {
        CodedValue::new(v.value, v.display)
    }
}

/// An autocomplete field: free text, a selected concept, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldRes {
    pub text: Option<String>,
    pub selected: Option<CodedValueDto>,
}

impl From<&FieldValue> for FieldRes {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Empty => Self::default(),
            FieldValue::Text(text) => Self {
                text: Some(text.clone()),
                selected: None,
            },
            FieldValue::Selected(value) => Self {
                text: None,
                selected: Some(value.clone().into()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LateralityRes {
    pub enabled: bool,
    pub value: Option<CodedValueDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormStateRes {
    pub reason_for_encounter: FieldRes,
    pub procedure: FieldRes,
    pub diagnosis: FieldRes,
    pub diagnosis_note: String,
    pub laterality: LateralityRes,
    pub encounter_note: String,
    pub boosted: bool,
}

impl From<&EncounterFormState> for FormStateRes {
    fn from(s: &EncounterFormState) -> Self {
        Self {
            reason_for_encounter: (&s.reason_for_encounter).into(),
            procedure: (&s.procedure).into(),
            diagnosis: (&s.diagnosis).into(),
            diagnosis_note: s.diagnosis_note.clone(),
            laterality: LateralityRes {
                enabled: s.laterality.enabled,
                value: s.laterality.value.clone().map(Into::into),
            },
            encounter_note: s.encounter_note.clone(),
            boosted: s.boosted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextReq {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LateralityReq {
    /// `null` selects the blank option.
    pub value: Option<CodedValueDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotesReq {
    pub diagnosis_note: Option<String>,
    pub encounter_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BoostedReq {
    pub boosted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsRes {
    pub items: Vec<CodedValueDto>,
    /// One of `idle`, `pending`, `ready`, `empty`, `failed`.
    pub status: String,
    pub message: Option<String>,
    pub sequence: u64,
}

impl From<Suggestions> for SuggestionsRes {
    fn from(s: Suggestions) -> Self {
        let (status, message) = match s.status {
            LookupStatus::Idle => ("idle", None),
            LookupStatus::Pending => ("pending", None),
            LookupStatus::Ready => ("ready", None),
            LookupStatus::Empty => ("empty", None),
            LookupStatus::Failed(message) => ("failed", Some(message)),
        };
        Self {
            items: s.items.into_iter().map(Into::into).collect(),
            status: status.into(),
            message,
            sequence: s.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EncounterRes {
    pub id: Uuid,
    pub reason_for_encounter: Option<CodedValueDto>,
    pub procedure: Option<CodedValueDto>,
    pub diagnosis: Option<CodedValueDto>,
    pub diagnosis_note: String,
    pub laterality: Option<CodedValueDto>,
    pub encounter_note: String,
    pub created_at: DateTime<Utc>,
}

impl From<EncounterRecord> for EncounterRes {
    fn from(r: EncounterRecord) -> Self {
        Self {
            id: r.id,
            reason_for_encounter: r.reason_for_encounter.map(Into::into),
            procedure: r.procedure.map(Into::into),
            diagnosis: r.diagnosis.map(Into::into),
            diagnosis_note: r.diagnosis_note,
            laterality: r.laterality.map(Into::into),
            encounter_note: r.encounter_note,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SaveRes {
    pub encounter: EncounterRes,
    pub encounters: Vec<EncounterRes>,
    pub form: FormStateRes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListEncountersRes {
    pub encounters: Vec<EncounterRes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LateralityOptionsRes {
    pub options: Vec<CodedValueDto>,
}

type ApiError = (StatusCode, Json<ErrorRes>);

fn error_status(err: &EncounterError) -> StatusCode {
    match err {
        EncounterError::InvalidInput(_) | EncounterError::UnselectedValue(_) => {
            StatusCode::BAD_REQUEST
        }
        EncounterError::NetworkUnavailable(_) | EncounterError::Terminology { .. } => {
            StatusCode::BAD_GATEWAY
        }
        EncounterError::EmptyExpansion => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(context: &str, err: EncounterError) -> ApiError {
    tracing::error!("{} error: {:?}", context, err);
    let status = error_status(&err);
    let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Internal error".to_string()
    } else {
        err.to_string()
    };
    (status, Json(ErrorRes { error }))
}

fn parse_field(field: &str) -> Result<AutocompleteField, ApiError> {
    field.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorRes {
                error: format!("unknown field: {field}"),
            }),
        )
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_form,
        type_text,
        select_value,
        set_laterality,
        set_notes,
        set_boosted,
        get_suggestions,
        save_form,
        reset_form,
        list_encounters,
        laterality_options,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        CodedValueDto,
        FieldRes,
        LateralityRes,
        FormStateRes,
        TextReq,
        LateralityReq,
        NotesReq,
        BoostedReq,
        SuggestionsRes,
        EncounterRes,
        SaveRes,
        ListEncountersRes,
        LateralityOptionsRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/form", get(get_form))
        .route("/form/laterality", put(set_laterality))
        .route("/form/notes", put(set_notes))
        .route("/form/boosted", put(set_boosted))
        .route("/form/save", post(save_form))
        .route("/form/reset", post(reset_form))
        .route("/form/:field/text", put(type_text))
        .route("/form/:field/select", post(select_value))
        .route("/form/:field/suggestions", get(get_suggestions))
        .route("/encounters", get(list_encounters))
        .route("/laterality-options", get(laterality_options))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Encounter REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/form",
    responses(
        (status = 200, description = "Current form state", body = FormStateRes)
    )
)]
async fn get_form(State(state): State<AppState>) -> Json<FormStateRes> {
    let form = state.form.lock().await;
    Json(form.state().into())
}

#[utoipa::path(
    put,
    path = "/form/{field}/text",
    params(("field" = String, Path, description = "reason_for_encounter, diagnosis or procedure")),
    request_body = TextReq,
    responses(
        (status = 200, description = "Text recorded and lookup queued", body = FormStateRes),
        (status = 400, description = "Unknown field", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Record typed text. The suggestions for the field update once typing pauses.
async fn type_text(
    State(state): State<AppState>,
    AxumPath(field): AxumPath<String>,
    Json(req): Json<TextReq>,
) -> Result<Json<FormStateRes>, ApiError> {
    let field = parse_field(&field)?;
    let mut form = state.form.lock().await;
    form.type_text(field, &req.text)
        .map_err(|e| api_error("Type text", e))?;
    Ok(Json(form.state().into()))
}

#[utoipa::path(
    post,
    path = "/form/{field}/select",
    params(("field" = String, Path, description = "reason_for_encounter, diagnosis or procedure")),
    request_body = CodedValueDto,
    responses(
        (status = 200, description = "Value selected", body = FormStateRes),
        (status = 400, description = "Unknown field or invalid code", body = ErrorRes),
        (status = 502, description = "Laterality lookup failed", body = ErrorRes)
    )
)]
/// Select a concept. Selecting a procedure also resolves laterality before responding.
///
/// The form lock is released while the laterality lookups run.
async fn select_value(
    State(state): State<AppState>,
    AxumPath(field): AxumPath<String>,
    Json(req): Json<CodedValueDto>,
) -> Result<Json<FormStateRes>, ApiError> {
    let field = parse_field(&field)?;
    let lookup = state
        .form
        .lock()
        .await
        .choose(field, req.into())
        .map_err(|e| api_error("Select value", e))?;

    if let Some(lookup) = lookup {
        let result = lookup.run().await;
        let mut form = state.form.lock().await;
        form.finish_laterality(&lookup, result)
            .map_err(|e| api_error("Resolve laterality", e))?;
        return Ok(Json(form.state().into()));
    }

    let form = state.form.lock().await;
    Ok(Json(form.state().into()))
}

#[utoipa::path(
    put,
    path = "/form/laterality",
    request_body = LateralityReq,
    responses(
        (status = 200, description = "Laterality set", body = FormStateRes),
        (status = 400, description = "Laterality is disabled", body = ErrorRes)
    )
)]
async fn set_laterality(
    State(state): State<AppState>,
    Json(req): Json<LateralityReq>,
) -> Result<Json<FormStateRes>, ApiError> {
    let mut form = state.form.lock().await;
    form.set_laterality(req.value.map(Into::into))
        .map_err(|e| api_error("Set laterality", e))?;
    Ok(Json(form.state().into()))
}

#[utoipa::path(
    put,
    path = "/form/notes",
    request_body = NotesReq,
    responses(
        (status = 200, description = "Notes updated", body = FormStateRes)
    )
)]
/// Update either note. Omitted notes are left as they are.
async fn set_notes(
    State(state): State<AppState>,
    Json(req): Json<NotesReq>,
) -> Result<Json<FormStateRes>, ApiError> {
    let mut form = state.form.lock().await;
    if let Some(note) = &req.diagnosis_note {
        form.set_diagnosis_note(note)
            .map_err(|e| api_error("Set diagnosis note", e))?;
    }
    if let Some(note) = &req.encounter_note {
        form.set_encounter_note(note)
            .map_err(|e| api_error("Set encounter note", e))?;
    }
    Ok(Json(form.state().into()))
}

#[utoipa::path(
    put,
    path = "/form/boosted",
    request_body = BoostedReq,
    responses(
        (status = 200, description = "Boost toggled", body = FormStateRes)
    )
)]
async fn set_boosted(
    State(state): State<AppState>,
    Json(req): Json<BoostedReq>,
) -> Result<Json<FormStateRes>, ApiError> {
    let mut form = state.form.lock().await;
    form.set_boosted(req.boosted)
        .map_err(|e| api_error("Set boosted", e))?;
    Ok(Json(form.state().into()))
}

#[utoipa::path(
    get,
    path = "/form/{field}/suggestions",
    params(("field" = String, Path, description = "reason_for_encounter, diagnosis or procedure")),
    responses(
        (status = 200, description = "Latest suggestions for the field", body = SuggestionsRes),
        (status = 400, description = "Unknown field", body = ErrorRes)
    )
)]
async fn get_suggestions(
    State(state): State<AppState>,
    AxumPath(field): AxumPath<String>,
) -> Result<Json<SuggestionsRes>, ApiError> {
    let field = parse_field(&field)?;
    let form = state.form.lock().await;
    Ok(Json(form.suggestions(field).into()))
}

#[utoipa::path(
    post,
    path = "/form/save",
    responses(
        (status = 201, description = "Encounter stored and form reset", body = SaveRes),
        (status = 400, description = "Form is incomplete", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Store the encounter, return it with the refreshed list, and reset the form.
async fn save_form(State(state): State<AppState>) -> Result<(StatusCode, Json<SaveRes>), ApiError> {
    let mut form = state.form.lock().await;
    let record = form.save().map_err(|e| api_error("Save encounter", e))?;
    let encounters = form
        .encounters()
        .map_err(|e| api_error("List encounters", e))?;

    Ok((
        StatusCode::CREATED,
        Json(SaveRes {
            encounter: record.into(),
            encounters: encounters.into_iter().map(Into::into).collect(),
            form: form.state().into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/form/reset",
    responses(
        (status = 200, description = "Form reset", body = FormStateRes)
    )
)]
async fn reset_form(State(state): State<AppState>) -> Json<FormStateRes> {
    let mut form = state.form.lock().await;
    form.reset();
    Json(form.state().into())
}

#[utoipa::path(
    get,
    path = "/encounters",
    responses(
        (status = 200, description = "Stored encounters", body = ListEncountersRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
async fn list_encounters(
    State(state): State<AppState>,
) -> Result<Json<ListEncountersRes>, ApiError> {
    let form = state.form.lock().await;
    let encounters = form
        .encounters()
        .map_err(|e| api_error("List encounters", e))?;
    Ok(Json(ListEncountersRes {
        encounters: encounters.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/laterality-options",
    responses(
        (status = 200, description = "Laterality values for the picker", body = LateralityOptionsRes),
        (status = 502, description = "Terminology server unavailable", body = ErrorRes)
    )
)]
async fn laterality_options(
    State(state): State<AppState>,
) -> Result<Json<LateralityOptionsRes>, ApiError> {
    let resolver = state.form.lock().await.laterality_resolver();
    let options = resolver
        .options()
        .await
        .map_err(|e| api_error("Load laterality options", e))?;
    Ok(Json(LateralityOptionsRes {
        options: options.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use encounter_core::{
        ChannelSettings, InMemoryStore, OfflineTerminology, PreferredDiagnoses,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(terminology: OfflineTerminology) -> Router {
        let preferred = PreferredDiagnoses::new(vec![
            CodedValue::new("38341003", "Hypertension"),
            CodedValue::new("34486009", "Hyperthyroidism"),
        ])
        .unwrap();
        let form = EncounterForm::with_settings(
            ChannelSettings {
                debounce: Duration::from_millis(500),
                result_count: 20,
            },
            Arc::new(preferred),
            Arc::new(terminology),
            Arc::new(InMemoryStore::new()),
        );
        router(AppState::new(form))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(OfflineTerminology::new())
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthRes = body_json(response).await;
        assert!(body.ok);
    }

    #[tokio::test]
    async fn save_round_trips_through_the_router() {
        let app = app(OfflineTerminology::new());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/form/procedure/select",
                serde_json::json!({ "value": "73211009", "display": "Diabetes mellitus" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let state: FormStateRes = body_json(response).await;
        assert!(!state.laterality.enabled);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/form/diagnosis/select",
                serde_json::json!({ "value": "44054006", "display": "Type 2 diabetes mellitus" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/form/notes",
                serde_json::json!({ "encounter_note": "Annual review" }),
            ))
            .await
            .unwrap();
        let state: FormStateRes = body_json(response).await;
        assert_eq!(state.encounter_note, "Annual review");
        assert_eq!(state.diagnosis_note, "");

        let response = app
            .clone()
            .oneshot(empty_request("POST", "/form/save"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved: SaveRes = body_json(response).await;
        assert_eq!(
            saved.encounter.procedure.as_ref().map(|p| p.value.as_str()),
            Some("73211009")
        );
        assert_eq!(
            saved.encounter.diagnosis.as_ref().map(|d| d.value.as_str()),
            Some("44054006")
        );
        assert_eq!(saved.encounters, vec![saved.encounter.clone()]);
        assert_eq!(saved.form.procedure, FieldRes::default());

        let response = app
            .oneshot(empty_request("GET", "/encounters"))
            .await
            .unwrap();
        let list: ListEncountersRes = body_json(response).await;
        assert_eq!(list.encounters.len(), 1);
    }

    #[tokio::test]
    async fn unselected_text_cannot_be_saved() {
        let app = app(OfflineTerminology::new());
        app.clone()
            .oneshot(json_request(
                "PUT",
                "/form/procedure/text",
                serde_json::json!({ "text": "append" }),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(empty_request("POST", "/form/save"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorRes = body_json(response).await;
        assert!(body.error.contains("procedure"), "{}", body.error);

        let response = app
            .oneshot(empty_request("GET", "/encounters"))
            .await
            .unwrap();
        let list: ListEncountersRes = body_json(response).await;
        assert!(list.encounters.is_empty());
    }

    #[tokio::test]
    async fn invalid_selection_is_rejected_and_not_kept() {
        let app = app(OfflineTerminology::new());
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/form/procedure/select",
                serde_json::json!({ "value": "< 71388002", "display": "Procedure" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(empty_request("GET", "/form")).await.unwrap();
        let state: FormStateRes = body_json(response).await;
        assert_eq!(state.procedure, FieldRes::default());
    }

    #[tokio::test(start_paused = true)]
    async fn form_stays_responsive_during_laterality_lookups() {
        let terminology = OfflineTerminology::new()
            .with_concepts(
                "274031008.<< 363704007",
                vec![CodedValue::new("6757004", "Structure of left knee region")],
            )
            .with_concepts(
                "274031008.<< 363704007.272741003",
                vec![CodedValue::new("7771000", "Left")],
            )
            .with_delay("", Duration::from_secs(5));
        let app = app(terminology);

        let select = tokio::spawn(app.clone().oneshot(json_request(
            "POST",
            "/form/procedure/select",
            serde_json::json!({ "value": "274031008", "display": "Excision of lesion of left knee" }),
        )));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let response = tokio::time::timeout(
            Duration::from_millis(100),
            app.clone()
                .oneshot(empty_request("GET", "/form/diagnosis/suggestions")),
        )
        .await
        .expect("suggestions answered while lookups run")
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = select.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let state: FormStateRes = body_json(response).await;
        assert!(state.laterality.enabled);
        assert_eq!(
            state.laterality.value.map(|v| v.value),
            Some("7771000".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_field_is_rejected() {
        let response = app(OfflineTerminology::new())
            .oneshot(json_request(
                "PUT",
                "/form/allergy/text",
                serde_json::json!({ "text": "pen" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn disabled_laterality_is_a_bad_request() {
        let response = app(OfflineTerminology::new())
            .oneshot(json_request(
                "PUT",
                "/form/laterality",
                serde_json::json!({ "value": { "value": "7771000", "display": "Left" } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unavailable_terminology_is_a_bad_gateway() {
        let terminology = OfflineTerminology::new();
        terminology.set_unavailable(true);

        let response = app(terminology)
            .oneshot(empty_request("GET", "/laterality-options"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(start_paused = true)]
    async fn boosted_suggestions_are_served() {
        let app = app(OfflineTerminology::new().with_concepts(
            "< 404684003",
            vec![CodedValue::new("48146000", "Diastolic hypertension")],
        ));

        app.clone()
            .oneshot(json_request(
                "PUT",
                "/form/boosted",
                serde_json::json!({ "boosted": true }),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(json_request(
                "PUT",
                "/form/diagnosis/text",
                serde_json::json!({ "text": "hyper" }),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let response = app
            .oneshot(empty_request("GET", "/form/diagnosis/suggestions"))
            .await
            .unwrap();
        let body: SuggestionsRes = body_json(response).await;
        assert_eq!(body.status, "ready");
        let codes: Vec<&str> = body.items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(codes, vec!["38341003", "34486009", "48146000"]);
    }
}
