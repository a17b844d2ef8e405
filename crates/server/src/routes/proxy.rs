use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
};

use crate::errors::ApiError;
use crate::state::AppState;

/// Forward anything under the proxy prefix; the upstream status and body
/// are returned as-is.
pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or_else(|| uri.path());
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    // only the content type travels upstream; cookies and authorization stay here
    let body = (!body.is_empty()).then(|| body.to_vec());

    let upstream = state.proxy.forward(method, path_and_query, content_type, body).await?;

    // upstream status is passed through untouched, including 4xx and 5xx
    let status = StatusCode::from_u16(upstream.status).map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
    })?;
    let mut builder = Response::builder().status(status);
    if let Some(ct) = upstream.content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder
        .body(Body::from(upstream.body))
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string())))
}
