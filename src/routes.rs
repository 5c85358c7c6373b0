use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    export::{ExportError, ExportFile, Exporter},
    gemini::Artifact,
    models::{Language, LessonPlan, LessonRequest},
    orchestrator::{ArtifactState, Controller, ControllerError, Session},
};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub exporter: Arc<dyn Exporter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/language", put(set_language))
        .route("/api/form", get(get_saved_form))
        .route("/api/plan", post(submit_plan).delete(clear_plan))
        .route("/api/plan/pdf", get(export_plan_pdf))
        .route("/api/presentation", post(generate_presentation))
        .route("/api/presentation/txt", get(export_presentation_text))
        .route("/api/presentation/deck", get(export_presentation_deck))
        .route("/api/handout", post(generate_handout))
        .route("/api/handout/doc", get(export_handout_doc))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Controller(ControllerError),
    Export(ExportError),
    NotFound(&'static str),
}

impl From<ControllerError> for ApiError {
    fn from(e: ControllerError) -> Self { ApiError::Controller(e) }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self { ApiError::Export(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Controller(ControllerError::Invalid(errors)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": errors.to_string(), "fields": errors.fields }))
            }
            ApiError::Controller(e @ (ControllerError::Busy(_) | ControllerError::Superseded(_))) => {
                (StatusCode::CONFLICT, json!({ "error": e.to_string() }))
            }
            ApiError::Controller(ControllerError::Generation(failure)) => {
                (StatusCode::BAD_GATEWAY, json!({ "error": failure.to_string(), "artifact": failure.artifact }))
            }
            ApiError::Export(e) => {
                tracing::error!("❌ Export failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, json!({ "error": format!("no {what} yet") })),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn get_session(State(state): State<AppState>) -> Json<Session> {
    Json(state.controller.snapshot())
}

pub async fn get_saved_form(State(state): State<AppState>) -> Response {
    match state.controller.saved_form() {
        Some(form) => Json(form).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LanguageBody {
    #[serde(default)]
    pub language: Option<Language>,
}

/// Without an explicit language the browser's `Accept-Language` decides.
pub async fn set_language(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<LanguageBody>) -> Json<Session> {
    let language = body.language.unwrap_or_else(|| {
        let accept = headers.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()).unwrap_or_default();
        Language::from_accept_language(accept)
    });
    Json(state.controller.set_language(language))
}

#[derive(Debug, Deserialize)]
pub struct PlanBody {
    pub request: LessonRequest,
    #[serde(default)]
    pub language: Option<Language>,
}

pub async fn submit_plan(State(state): State<AppState>, Json(body): Json<PlanBody>) -> Result<Json<LessonPlan>, ApiError> {
    tracing::info!("📝 Plan requested: {} / {}", body.request.subject, body.request.lesson_title);
    let plan = state.controller.submit_plan(body.request, body.language).await?;
    Ok(Json(plan))
}

pub async fn clear_plan(State(state): State<AppState>) -> Json<Session> {
    Json(state.controller.clear())
}

pub async fn generate_presentation(State(state): State<AppState>) -> Result<Response, ApiError> {
    Ok(match state.controller.generate_presentation().await? {
        Some(presentation) => Json(presentation).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn generate_handout(State(state): State<AppState>) -> Result<Response, ApiError> {
    Ok(match state.controller.generate_handout().await? {
        Some(handout) => Json(handout).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    #[serde(default = "default_notes")]
    pub notes: bool,
}

fn default_notes() -> bool { true }

fn attachment(file: ExportFile) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(file.content_type));
    let disposition = format!("attachment; filename=\"{}\"", file.filename.replace('"', ""));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (StatusCode::OK, headers, file.bytes).into_response()
}

fn no_artifact(artifact: Artifact) -> ApiError {
    ApiError::NotFound(artifact.noun())
}

pub async fn export_plan_pdf(State(state): State<AppState>) -> Result<Response, ApiError> {
    let session = state.controller.snapshot();
    let plan = session.current_plan().ok_or_else(|| no_artifact(Artifact::Plan))?;
    Ok(attachment(state.exporter.lesson_plan_pdf(plan, session.language)?))
}

pub async fn export_presentation_text(State(state): State<AppState>, Query(q): Query<NotesQuery>) -> Result<Response, ApiError> {
    let session = state.controller.snapshot();
    let ArtifactState::Ready(presentation) = &session.presentation else {
        return Err(no_artifact(Artifact::Presentation));
    };
    Ok(attachment(state.exporter.presentation_text(presentation, session.current_plan(), session.language, q.notes)))
}

pub async fn export_presentation_deck(State(state): State<AppState>, Query(q): Query<NotesQuery>) -> Result<Response, ApiError> {
    let session = state.controller.snapshot();
    let (ArtifactState::Ready(presentation), Some(plan)) = (&session.presentation, session.current_plan()) else {
        return Err(no_artifact(Artifact::Presentation));
    };
    Ok(attachment(state.exporter.presentation_deck(presentation, plan, session.language, q.notes)?))
}

pub async fn export_handout_doc(State(state): State<AppState>) -> Result<Response, ApiError> {
    let session = state.controller.snapshot();
    let ArtifactState::Ready(handout) = &session.handout else {
        return Err(no_artifact(Artifact::Handout));
    };
    Ok(attachment(state.exporter.handout_document(handout, session.language)))
}
