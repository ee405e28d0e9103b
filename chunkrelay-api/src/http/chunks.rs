//! Producer upload and consumer polling endpoints
//!
//! Field names match the browser client: uploads are multipart forms with
//! `streamId`, `mimeType` and a `videoChunk` file; polling is
//! `GET /getChunk?streamId=..&index=..&clientId=..`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chunkrelay_core::Retrieval;
use serde::{Deserialize, Serialize};

use crate::http::{AppError, AppResult, AppState};

/// Playback must always see the live chunk, never a cached one
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

pub fn create_chunk_router() -> Router<AppState> {
    Router::new()
        .route("/uploadChunk", post(upload_chunk))
        .route("/getChunk", get(get_chunk))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChunkQuery {
    pub stream_id: Option<String>,
    pub index: Option<String>,
    pub client_id: Option<String>,
}

/// Fields collected from an upload form
#[derive(Default)]
struct UploadForm {
    stream_id: Option<String>,
    mime_type: Option<String>,
    chunk: Option<Bytes>,
    file_name: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("streamId") => form.stream_id = Some(field.text().await.map_err(multipart_error)?),
            Some("mimeType") => form.mime_type = Some(field.text().await.map_err(multipart_error)?),
            Some("videoChunk") => {
                form.file_name = field.file_name().map(str::to_string);
                form.chunk = Some(field.bytes().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::new(err.status(), "Invalid input").with_details(err.body_text())
}

/// POST /uploadChunk
pub async fn upload_chunk(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let multipart = multipart.map_err(|_| AppError::missing_upload_fields())?;
    let form = read_upload_form(multipart).await?;

    let (Some(stream_id), Some(mime_type), Some(chunk)) = (form.stream_id, form.mime_type, form.chunk)
    else {
        return Err(AppError::missing_upload_fields());
    };
    if stream_id.trim().is_empty() || mime_type.trim().is_empty() {
        return Err(AppError::missing_upload_fields());
    }

    let size = chunk.len();
    let index = state
        .relay
        .ingest_named(&stream_id, &mime_type, chunk, form.file_name.as_deref())?;

    tracing::debug!(stream_id = %stream_id, index = index, size = size, "Upload accepted");

    Ok(Json(UploadResponse {
        message: "Chunk received and uploading".to_string(),
        index,
    }))
}

/// GET /getChunk
///
/// 200 with the payload when the chunk is buffered, 204 when it is not
/// (not produced yet, already trimmed, or unknown stream).
pub async fn get_chunk(
    State(state): State<AppState>,
    Query(query): Query<GetChunkQuery>,
) -> AppResult<Response> {
    let (Some(stream_id), Some(client_id), Some(index)) = (
        query.stream_id.filter(|s| !s.is_empty()),
        query.client_id.filter(|s| !s.is_empty()),
        query.index.and_then(|i| i.trim().parse::<u64>().ok()),
    ) else {
        return Err(AppError::invalid_chunk_request());
    };

    let response = match state.relay.retrieve(&stream_id, &client_id, index)? {
        Retrieval::Found {
            payload,
            content_type,
        } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, payload.len().to_string()),
                (header::CACHE_CONTROL, NO_CACHE.to_string()),
            ],
            payload,
        )
            .into_response(),
        Retrieval::NotYetAvailable | Retrieval::StreamAbsent => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(response)
}
