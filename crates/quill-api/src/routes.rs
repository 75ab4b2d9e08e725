use std::hash::{Hash, Hasher};
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use chrono::Utc;
use quill_core::models::NoteStats;
use quill_core::query::{ListQuery, NotePage, Pagination};
use quill_core::{Note, NoteId, NoteService};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AccessTokenVerifier, AuthenticatedUser};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::validation::{parse_new_note, parse_note_update};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    token_verifier: Arc<AccessTokenVerifier>,
    notes: NoteService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, notes: NoteService) -> Self {
        Self {
            token_verifier: Arc::new(AccessTokenVerifier::new(config.clone())),
            notes,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let note_routes = Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/stats", get(note_stats))
        .route("/{id}", get(get_note).put(update_note).delete(delete_note))
        .route("/{id}/pin", patch(toggle_pin))
        .route("/{id}/archive", patch(toggle_archive))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(banner))
        .route("/healthz", get(healthz))
        .nest("/api/notes", note_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

async fn banner() -> &'static str {
    "Notes API is running"
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.token_verifier.verify_access_token(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
struct NoteResponse {
    note: Note,
}

/// Raw list query; numbers that fail to parse are treated as absent.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    archived: Option<String>,
    tag: Option<String>,
    search: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ListQuery {
        ListQuery {
            pagination: Pagination::new(parse_number(self.page), parse_number(self.limit)),
            archived: self.archived.map(|value| value == "true"),
            tag: self.tag,
            search: self.search,
        }
    }
}

fn parse_number(value: Option<String>) -> Option<i64> {
    value.and_then(|value| value.trim().parse().ok())
}

/// Unknown or malformed IDs cannot name an existing note
fn parse_note_id(raw: &str) -> Result<NoteId, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let new_note = parse_new_note(&parse_body(body)?)?;
    let note = state.notes.create(&user.user_id, new_note).await?;
    tracing::info!(
        endpoint = "notes_create",
        user = user_fingerprint(user.user_id.as_str()),
        note_id = %note.id,
        tag_count = note.tags.len(),
        "Created note"
    );
    Ok((StatusCode::CREATED, Json(NoteResponse { note })))
}

async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<NotePage>, AppError> {
    let query = params
        .map(|Query(params)| params)
        .unwrap_or_default()
        .into_query();
    let page = state.notes.list(&user.user_id, &query).await?;
    Ok(Json(page))
}

async fn note_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<NoteStats>, AppError> {
    let stats = state.notes.stats(&user.user_id).await?;
    Ok(Json(stats))
}

async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    let id = parse_note_id(&id)?;
    let note = state.notes.get(&user.user_id, &id).await?;
    Ok(Json(NoteResponse { note }))
}

async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<NoteResponse>, AppError> {
    let update = parse_note_update(&parse_body(body)?)?;
    let id = parse_note_id(&id)?;
    let note = state.notes.update(&user.user_id, &id, update).await?;
    tracing::info!(
        endpoint = "notes_update",
        user = user_fingerprint(user.user_id.as_str()),
        note_id = %note.id,
        "Updated note"
    );
    Ok(Json(NoteResponse { note }))
}

async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_note_id(&id)?;
    state.notes.delete(&user.user_id, &id).await?;
    tracing::info!(
        endpoint = "notes_delete",
        user = user_fingerprint(user.user_id.as_str()),
        note_id = %id,
        "Deleted note"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_pin(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    let id = parse_note_id(&id)?;
    let note = state.notes.toggle_pin(&user.user_id, &id).await?;
    tracing::info!(
        endpoint = "notes_pin",
        user = user_fingerprint(user.user_id.as_str()),
        note_id = %id,
        pinned = note.is_pinned,
        "Toggled pin"
    );
    Ok(Json(NoteResponse { note }))
}

async fn toggle_archive(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    let id = parse_note_id(&id)?;
    let note = state.notes.toggle_archive(&user.user_id, &id).await?;
    tracing::info!(
        endpoint = "notes_archive",
        user = user_fingerprint(user.user_id.as_str()),
        note_id = %id,
        archived = note.is_archived,
        "Toggled archive"
    );
    Ok(Json(NoteResponse { note }))
}

fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}
