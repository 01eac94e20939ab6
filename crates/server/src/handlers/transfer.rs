//! Transfer primitives shared by the config and blob handlers.
//!
//! Each primitive takes an already-resolved storage key.

use crate::error::{ApiError, ApiResult};
use crate::metrics::BlobLabels;
use crate::state::AppState;
use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use restash_core::{ByteRange, Window};
use restash_storage::{ByteStream, ReadRange, StorageError};
use time::OffsetDateTime;

/// Report an object's size without transferring it.
pub async fn check(state: &AppState, key: &str) -> ApiResult<Response> {
    let meta = state.storage.head(key).await?;

    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(meta.size));
    Ok(response)
}

/// Stream an object, honoring a single `Range` request.
///
/// Read metrics are recorded once the body has been fully sent.
pub async fn read(
    state: &AppState,
    key: &str,
    range: Option<HeaderValue>,
    labels: Option<BlobLabels>,
) -> ApiResult<Response> {
    let meta = state.storage.head(key).await?;

    let range = range
        .map(|value| {
            let value = value
                .to_str()
                .map_err(|_| ApiError::BadRequest("range header is not valid text".to_string()))?;
            Ok::<_, ApiError>(ByteRange::parse(value)?)
        })
        .transpose()?;

    let window = match range {
        Some(range) => range.window(meta.size),
        None => Window {
            offset: 0,
            end: meta.size,
            total: meta.size,
        },
    };
    let read_range = range.map(|_| ReadRange {
        offset: window.offset,
        end: window.end,
    });

    let stream = state.storage.get_stream(key, read_range).await?;
    let body = Body::from_stream(counted(stream, key.to_string(), labels));

    let status = if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(window.len()));
    if range.is_some() {
        let content_range = HeaderValue::from_str(&window.content_range())
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        headers.insert(CONTENT_RANGE, content_range);
    }
    Ok(response)
}

/// Wrap a storage stream for an HTTP body, counting bytes sent.
fn counted(
    mut stream: ByteStream,
    key: String,
    labels: Option<BlobLabels>,
) -> impl futures::Stream<Item = Result<bytes::Bytes, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        let mut sent = 0u64;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    sent += chunk.len() as u64;
                    yield Ok(chunk);
                }
                Err(e) => {
                    tracing::error!(key = %key, sent, error = %e, "Read failed mid-transfer");
                    yield Err(std::io::Error::other(e.to_string()));
                    return;
                }
            }
        }
        if let Some(labels) = labels {
            labels.record_read(sent);
        }
    }
}

/// Store a request body as a new object. Never overwrites.
pub async fn save(
    state: &AppState,
    key: &str,
    body: Body,
    labels: Option<BlobLabels>,
) -> ApiResult<Response> {
    match state.storage.head(key).await {
        Ok(_) => return Err(ApiError::Conflict(key.to_string())),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let stream: ByteStream = Box::pin(
        body.into_data_stream()
            .map(|chunk| chunk.map_err(|e| StorageError::Io(std::io::Error::other(e)))),
    );

    // A concurrent writer that won the race surfaces as AlreadyExists (409).
    let meta = state
        .storage
        .create_from_stream(key, stream, OffsetDateTime::now_utc())
        .await?;

    if let Some(labels) = labels {
        labels.record_write(meta.size);
    }
    Ok(StatusCode::OK.into_response())
}

/// Delete an object, recording its size first.
pub async fn remove(state: &AppState, key: &str, labels: Option<BlobLabels>) -> ApiResult<Response> {
    let meta = state.storage.head(key).await?;
    state.storage.delete(key).await?;

    if let Some(labels) = labels {
        labels.record_delete(meta.size);
    }
    Ok(StatusCode::OK.into_response())
}
