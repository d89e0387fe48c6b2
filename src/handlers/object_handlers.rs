//! HTTP handlers for object fetches and the bucket listing.
//! Object bodies are either redirected to a presigned URL or streamed without
//! buffering; all resolution logic lives in the services.

use crate::{
    config::Delivery,
    errors::AppError,
    handlers::list_page,
    models::listing::ListResponse,
    services::storage_service::ObjectBody,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::error;

const OCTET_STREAM: &str = "application/octet-stream";

/// `GET /{*path}` — resolve the raw request path and hand out the object.
///
/// The path is taken from the URI as sent, still percent-encoded; decoding is
/// part of the proxy flow.
pub async fn proxy_object(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let raw_path = uri.path().strip_prefix('/').unwrap_or(uri.path());

    match state.delivery {
        Delivery::Redirect => {
            let target = state.proxy.presigned_url(raw_path).await?;
            let location = HeaderValue::from_str(&target)
                .map_err(|_| AppError::internal("presigned URL is not a valid header value"))?;
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::FOUND;
            response.headers_mut().insert(header::LOCATION, location);
            Ok(response)
        }
        Delivery::Stream => {
            let (key, object) = state.proxy.open(raw_path).await?;
            Ok(stream_object(&key, object))
        }
    }
}

/// `GET /list` — JSON by default, the grouped HTML page when the client
/// accepts `text/html`.
pub async fn list_objects(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let base_url = base_url(&headers, &uri);

    if accepts_html(&headers) {
        let view = state.listing.list_view(&base_url).await.map_err(|err| {
            error!("list view failed: {}", err);
            AppError::internal(format!("Failed to prepare list view: {}", err))
        })?;
        return Ok(Html(list_page::render(&view)).into_response());
    }

    let list = state.listing.list_json(&base_url).await.map_err(|err| {
        error!("listing failed: {}", err);
        AppError::internal(format!("Failed to list files: {}", err))
    })?;
    Ok(Json(ListResponse::ok(list)).into_response())
}

fn stream_object(key: &str, object: ObjectBody) -> Response {
    let ObjectBody {
        content_type,
        content_length,
        etag,
        last_modified,
        reader,
    } = object;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();

    let content_type = content_type
        .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM)
        .unwrap_or_else(|| {
            mime_guess::from_path(key)
                .first_raw()
                .unwrap_or(OCTET_STREAM)
                .to_string()
        });
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM)),
    );
    headers.insert(header::CONTENT_DISPOSITION, inline_disposition(key));

    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    if let Some(etag) = etag {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            headers.insert(header::ETAG, value);
        }
    }

    if let Some(modified) = last_modified {
        let http_date = modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = HeaderValue::from_str(&http_date) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    response
}

/// `inline; filename="<last key component>"`, or bare `inline` when the name
/// cannot be carried in a header.
fn inline_disposition(key: &str) -> HeaderValue {
    let filename = key.rsplit('/').next().unwrap_or(key);
    let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("inline; filename=\"{}\"", quoted).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// `scheme://host` of the gateway as the client addressed it. HTTP/2 clients
/// send the authority in the URI instead of a `Host` header.
fn base_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}
