use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use service::{auth::AuthError, errors::ServiceError, proxy::ProxyError};
use tracing::{error, warn};

/// JSON error envelope: `{"success": false, "error": <message>}`.
///
/// `detail` is operator information. It travels in the response extensions
/// and only reaches the body when [`expose_error_detail`] is layered on,
/// which the router does outside production.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Clone, Debug)]
struct ErrorReport {
    message: String,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, message: message.into(), detail }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized. Admin session required.", None)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, None)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        let mut res = (self.status, Json(body)).into_response();
        if let Some(detail) = self.detail {
            res.extensions_mut().insert(ErrorReport { message: self.message, detail });
        }
        res
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        if e.is_internal() {
            error!(err = %e, "storage failure");
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()));
        }
        match e {
            ServiceError::Validation(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::new(StatusCode::CONFLICT, msg, None),
            other => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(other.to_string())),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query: {}", e.body_text()))
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::new(StatusCode::UNAUTHORIZED, "Invalid admin password", None),
            AuthError::Unauthorized => ApiError::unauthorized(),
            AuthError::TokenError(_) => {
                error!(err = %e, code = e.code(), "session token failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(e: ProxyError) -> Self {
        match e {
            ProxyError::NotConfigured | ProxyError::Unavailable(_) => {
                warn!(err = %e, "upstream unavailable");
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Upstream unavailable", Some(e.to_string()))
            }
            ProxyError::Internal(_) => {
                error!(err = %e, "proxy failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
            }
        }
    }
}

/// Middleware: put the operator detail of an [`ApiError`] into the body.
pub async fn expose_error_detail(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    match res.extensions_mut().remove::<ErrorReport>() {
        Some(report) => {
            let body = json!({ "success": false, "error": report.message, "detail": report.detail });
            (res.status(), Json(body)).into_response()
        }
        None => res,
    }
}
