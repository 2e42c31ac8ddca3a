use crate::blob_store::ImageUpload;
use crate::config::{ApiConfig, PagingConfig};
use crate::coordinator::{ExperienceCoordinator, ExperienceError};
use crate::mapper::{ExperienceRequest, ExperienceResponse};
use crate::pager::{Page, PageRequest, PageRequestError, SortDirection};
use crate::record_store::StoreError;
use crate::validation::{self, ValidationError};
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ExperienceCoordinator>,
    pub paging: PagingConfig,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters for the paginated listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub company: String,
}

/// Failures surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Experience(#[from] ExperienceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Paging(#[from] PageRequestError),

    #[error("Malformed multipart request: {0}")]
    Multipart(String),

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid interview experience id: {0}")]
    InvalidId(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Experience(ExperienceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Experience(ExperienceError::Store(StoreError::InvalidSortField(_))) => {
                (StatusCode::BAD_REQUEST, "INVALID_SORT_FIELD")
            }
            ApiError::Experience(ExperienceError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR")
            }
            ApiError::Experience(ExperienceError::BlobStore(_)) => {
                (StatusCode::BAD_GATEWAY, "UPLOAD_ERROR")
            }
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Paging(_) => (StatusCode::BAD_REQUEST, "INVALID_PAGE_REQUEST"),
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "INVALID_MULTIPART"),
            ApiError::MissingHeader(_) => (StatusCode::BAD_REQUEST, "MISSING_HEADER"),
            ApiError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ID"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal details stay in the logs
        let message = match &self {
            ApiError::Experience(ExperienceError::Store(StoreError::InvalidSortField(_))) => {
                self.to_string()
            }
            ApiError::Experience(ExperienceError::Store(e)) => {
                error!(error = %e, "Record store failure");
                "Failed to access interview experiences".to_string()
            }
            ApiError::Experience(ExperienceError::BlobStore(e)) => {
                error!(error = %e, "Image upload failure");
                "Failed to upload image".to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    let experiences = Router::new()
        .route("/", get(list_experiences).post(create_experience))
        .route("/search/email", get(search_by_email))
        .route("/search/me", get(search_mine))
        .route("/search/company", get(search_by_company))
        .route(
            "/:id",
            get(get_experience)
                .put(update_experience)
                .delete(delete_experience),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api/v1/interview-experience", experiences)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(middleware::from_fn(propagate_trace_ids))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run each request inside a span carrying its trace and correlation ids,
/// generating either when the caller did not send one, and echo both back.
async fn propagate_trace_ids(request: Request, next: Next) -> Response {
    let trace_id = header_or_generate(request.headers(), TRACE_ID_HEADER);
    let correlation_id = header_or_generate(request.headers(), CORRELATION_ID_HEADER);

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        correlation_id = %correlation_id,
    );
    let mut response = next.run(request).instrument(span).await;

    let headers = response.headers_mut();
    for (name, value) in [
        (TRACE_ID_HEADER, trace_id),
        (CORRELATION_ID_HEADER, correlation_id),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }

    response
}

fn header_or_generate(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "interview-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.coordinator.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Create a post from a multipart form
#[instrument(skip_all)]
async fn create_experience(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ExperienceResponse>), ApiError> {
    let (request, image) = read_submission(multipart).await?;
    let created = state.coordinator.create(request, image).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List posts one sorted page at a time
#[instrument(skip(state))]
async fn list_experiences(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Page<ExperienceResponse>>, ApiError> {
    let defaults = &state.paging;
    let sort_dir = params.sort_dir.as_deref().unwrap_or(&defaults.sort_dir);

    let request = PageRequest::new(
        params.page_number.unwrap_or(defaults.page_number),
        params.page_size.unwrap_or(defaults.page_size),
        params.sort_by.unwrap_or_else(|| defaults.sort_by.clone()),
        SortDirection::parse(sort_dir),
    )?;

    Ok(Json(state.coordinator.get_page(&request).await?))
}

/// Get a single post
#[instrument(skip(state))]
async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExperienceResponse>, ApiError> {
    Ok(Json(state.coordinator.get_by_id(parse_id(&id)?).await?))
}

/// Posts by an author, newest first
#[instrument(skip(state))]
async fn search_by_email(
    State(state): State<AppState>,
    Query(params): Query<EmailQuery>,
) -> Result<Json<Vec<ExperienceResponse>>, ApiError> {
    Ok(Json(state.coordinator.search_by_owner(&params.email).await?))
}

/// Posts by the caller, identified by the gateway-supplied email header
#[instrument(skip_all)]
async fn search_mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExperienceResponse>>, ApiError> {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingHeader("X-User-Email"))?;

    Ok(Json(state.coordinator.search_by_owner(email).await?))
}

/// Posts about a company, newest first
#[instrument(skip(state))]
async fn search_by_company(
    State(state): State<AppState>,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<Vec<ExperienceResponse>>, ApiError> {
    Ok(Json(state.coordinator.search_by_tag(&params.company).await?))
}

/// Overwrite a post from a multipart form
#[instrument(skip(state, multipart))]
async fn update_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ExperienceResponse>, ApiError> {
    let id = parse_id(&id)?;
    let (request, image) = read_submission(multipart).await?;
    Ok(Json(state.coordinator.update(id, request, image).await?))
}

/// Delete a post
#[instrument(skip(state))]
async fn delete_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.coordinator.delete(parse_id(&id)?).await?;

    Ok(Json(MessageResponse {
        message: "Interview experience deleted successfully".to_string(),
    }))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

/// Read and validate the post fields and optional `image` part of a form
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(ExperienceRequest, Option<ImageUpload>), ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?;
                image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec()));
            }
            "userName" | "userEmail" | "title" | "content" | "companyTag" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?;
                fields.insert(name, value);
            }
            other => {
                warn!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let request = ExperienceRequest {
        user_name: take("userName"),
        user_email: take("userEmail"),
        title: take("title"),
        content: take("content"),
        company_tag: take("companyTag"),
    };

    validation::validate_request(&request)?;
    validation::validate_image(image.as_ref())?;

    Ok((request, image))
}

/// Start the interview experience API server
pub async fn start_api_server(state: AppState, config: &ApiConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting interview experience API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
