use axum::{extract::State, http::header, response::IntoResponse, Json};
use common::types::Health;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use service::{availability::ServiceAvailability, metrics};

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    let stats = state.accounts.stats().await?;
    Ok(Json(Health::new("Account panel is running", stats.services, stats.total_accounts)))
}

/// Static catalog; does not read the store.
pub async fn services(State(state): State<AppState>) -> Json<Value> {
    let services = state.accounts.list_services();
    Json(json!({ "success": true, "count": services.len(), "services": services }))
}

#[derive(Serialize)]
pub struct AvailabilityBody {
    success: bool,
    #[serde(serialize_with = "keyed_in_catalog_order")]
    availability: Vec<ServiceAvailability>,
}

/// Object keyed by service id, entries written in catalog order.
fn keyed_in_catalog_order<S: Serializer>(items: &[ServiceAvailability], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(items.iter().map(|a| (&a.id, a)))
}

pub async fn availability(State(state): State<AppState>) -> Result<Json<AvailabilityBody>, ApiError> {
    let availability = state.accounts.availability().await?;
    Ok(Json(AvailabilityBody { success: true, availability }))
}

pub async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::encode_metrics()
        .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
