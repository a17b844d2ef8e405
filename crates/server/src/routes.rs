use axum::{
    http::Uri,
    middleware,
    routing::{any, delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::require_admin;
use crate::errors::{expose_error_detail, ApiError};
use crate::state::AppState;

pub mod accounts;
pub mod admin;
pub mod catalog;
pub mod proxy;

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

/// Build the application router: public catalog and session routes,
/// admin-gated inventory and proxy routes.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let prefix = state.proxy.settings().prefix.trim_end_matches('/').to_string();

    // no session needed: catalog, capacity, health and the session endpoints themselves
    let public = Router::new()
        .route("/api/health", get(catalog::health))
        .route("/api/services", get(catalog::services))
        .route("/api/availability", get(catalog::availability))
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/status", get(admin::status))
        .route("/metrics", get(catalog::metrics));

    // everything that mutates the inventory or leaves the process
    let protected = Router::new()
        .route("/api/accounts", get(accounts::list).post(accounts::create))
        .route("/api/accounts/search", get(accounts::search))
        .route("/api/accounts/:service/:id", delete(accounts::remove))
        .route("/api/accounts/:service/:id/slots", post(accounts::assign_slot))
        .route("/api/accounts/:service/:id/slots/:consumer", delete(accounts::release_slot))
        // bare prefix and everything below it
        .route(&prefix, any(proxy::forward))
        .route(&format!("{prefix}/*rest"), any(proxy::forward))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let mut app = public
        .merge(protected)
        .fallback(not_found)
        .with_state(state.clone());
    // 5xx detail is for operators; production bodies carry the message only
    if !state.http.production {
        app = app.layer(middleware::from_fn(expose_error_detail));
    }

    app.layer(cors).layer(
        // one span per request; 5xx logged at ERROR
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
            .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
    )
}
