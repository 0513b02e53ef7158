use axum::{
    body::Body,
    extract::{multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

use crate::batch::{self, BatchOptions, UploadedFile, ARCHIVE_NAME};
use crate::error::ConvertError;
use crate::schema::{resolve_dialect, ConversionRequest, ConversionResponse, OutputMode};
use crate::state::AppState;

/// Full application: routes, CORS, request tracing, bound to `state`
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(&state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::debug_span!(
                "request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri()
            )
        }))
        .with_state(state)
}

pub fn create_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        // Health check
        .route("/api/health", get(health_check))
        .route("/api/dialects", get(list_dialects))
        // Conversion
        .route("/convert", post(convert))
        .route("/convert-batch", post(convert_batch))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes))
}

async fn root() -> Json<Value> {
    Json(json!({"message": "SQL dialect converter API is running!"}))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let translator = state.service.translator();
    Json(json!({
        "status": "ok",
        "translator": translator.name(),
        "dialects": translator.supported_dialects().len()
    }))
}

async fn list_dialects(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "dialects": state.service.translator().supported_dialects()
    }))
}

async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConversionRequest>, JsonRejection>,
) -> Result<Json<ConversionResponse>, ConvertError> {
    let Json(request) = payload.map_err(|e| ConvertError::validation("body", e.body_text()))?;
    let response = state.service.convert(&request).await?;
    Ok(Json(response))
}

async fn convert_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ConvertError> {
    let mut files = Vec::new();
    let mut dialect_from = None;
    let mut dialect_to = None;
    let mut mode = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") | Some("file") => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadedFile {
                    file_name,
                    content: content.to_vec(),
                });
            }
            Some("dialect_from") => dialect_from = Some(field.text().await.map_err(multipart_error)?),
            Some("dialect_to") => dialect_to = Some(field.text().await.map_err(multipart_error)?),
            Some("mode") => mode = Some(field.text().await.map_err(multipart_error)?),
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let max_files = state.config.conversion.max_batch_files;
    if files.is_empty() {
        return Err(ConvertError::validation("files", "at least one file is required"));
    }
    if files.len() > max_files {
        return Err(ConvertError::validation(
            "files",
            format!("You can upload a maximum of {} files.", max_files),
        ));
    }

    let translator = state.service.translator();
    let (default_from, default_to) = state.default_dialects;
    let options = BatchOptions {
        dialect_from: match dialect_from {
            Some(raw) => resolve_dialect("dialect_from", Some(&raw), translator)?,
            None => default_from,
        },
        dialect_to: match dialect_to {
            Some(raw) => resolve_dialect("dialect_to", Some(&raw), translator)?,
            None => default_to,
        },
        mode: match mode {
            Some(raw) => raw
                .parse::<OutputMode>()
                .map_err(|msg| ConvertError::validation("mode", msg))?,
            None => OutputMode::default(),
        },
    };

    let entries = batch::convert_files(&state.service, files, options).await;
    let archive = tokio::task::spawn_blocking(move || batch::write_archive(&entries))
        .await
        .map_err(anyhow::Error::from)??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-zip-compressed".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", ARCHIVE_NAME),
            ),
        ],
        archive,
    )
        .into_response())
}

fn multipart_error(e: MultipartError) -> ConvertError {
    ConvertError::validation("files", e.body_text())
}
