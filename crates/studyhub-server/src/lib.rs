//! # StudyHub REST server
//!
//! Exposes the pomodoro session store over HTTP under `/api/v1`:
//!
//! | Method | Path                          | Result                      |
//! |--------|-------------------------------|-----------------------------|
//! | GET    | `/pomodoro/sessions?limit=N`  | sessions, newest first      |
//! | POST   | `/pomodoro/session`           | 201 + persisted session     |
//! | DELETE | `/pomodoro/sessions`          | clears every session        |
//! | DELETE | `/pomodoro/session/:id`       | deletes one session         |
//! | GET    | `/health`                     | `{ ok, env }`               |
//!
//! Errors are always `{ "message": "..." }`.

#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use studyhub_core::{
    CreateSessionRequest, Session, SessionStore, StoreError, DEFAULT_LIST_LIMIT,
};
use tracing::{error, info, warn, Instrument};

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    /// Reported by `/health`.
    pub environment: String,
    pub cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, environment: impl Into<String>, cors_origin: &str) -> Self {
        let cors_origin = HeaderValue::from_str(cors_origin).unwrap_or_else(|_| {
            warn!(origin = cors_origin, "invalid CORS origin, falling back to '*'");
            HeaderValue::from_static("*")
        });
        Self {
            store,
            environment: environment.into(),
            cors_origin,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let pomodoro = Router::new()
        .route(
            "/sessions",
            get(list_sessions_handler).delete(clear_sessions_handler),
        )
        .route("/session", post(create_session_handler))
        .route("/session/:id", delete(delete_session_handler));

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .nest("/api/v1/pomodoro", pomodoro)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn(request_tracing_middleware))
        .with_state(state)
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Rejected { .. } | StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "store failure");
        }
        ApiError::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<usize>,
}

async fn list_sessions_handler(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.store.list(limit).await?))
}

async fn create_session_handler(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(request) = body?;
    let draft = request.into_draft().map_err(StoreError::from)?;
    let session = state.store.create(draft).await?;
    info!(id = %session.id, mode = %session.mode, "session created");
    Ok((StatusCode::CREATED, Json(session)))
}

async fn clear_sessions_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.store.delete_all().await?;
    info!("all sessions cleared");
    Ok(Json(json!({ "message": "All sessions cleared" })).into_response())
}

async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.store.delete(&id).await?;
    Ok(Json(json!({ "message": "Session deleted" })).into_response())
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(json!({ "ok": true, "env": state.environment })).into_response()
}

// ── Middleware ───────────────────────────────────────────────────────

async fn cors_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, state.cors_origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        route = %request.uri().path(),
    );
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| info!(status = response.status().as_u16(), "request finished"));
    response
}
