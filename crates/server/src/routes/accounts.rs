use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use models::NewAccountInput;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    accounts::{AccountFilter, StatusFilter},
    pagination::Pagination,
};

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub service: Option<String>,
    pub status: Option<StatusFilter>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotInput {
    #[serde(default)]
    pub consumer: String,
}

pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<AccountFilter>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(filter) = filter?;
    let listing = state.accounts.list_accounts(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "totalAccounts": listing.stats.total_accounts,
        "services": listing.stats.services,
        "serviceStats": listing.stats.service_stats,
        "accounts": listing.accounts,
    })))
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(q) = query?;
    let filter = AccountFilter { service: q.service, status: q.status, q: q.q };
    let page = state.accounts.search_accounts(&filter, Pagination::new(q.page, q.per_page)).await?;
    // flat page object with the success flag merged in
    let mut body = serde_json::to_value(page)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string())))?;
    body["success"] = Value::Bool(true);
    Ok(Json(body))
}

pub async fn create(
    State(state): State<AppState>,
    input: Result<Json<NewAccountInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(input) = input?;
    let account = state.accounts.add_account(input).await?;
    let body = json!({
        "success": true,
        "message": format!("Account added to {}", account.service_name),
        "account": account,
    });
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((service, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.accounts.delete_account(&service, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Account removed successfully",
        "removedAccount": removed,
    })))
}

pub async fn assign_slot(
    State(state): State<AppState>,
    Path((service, id)): Path<(String, String)>,
    input: Result<Json<SlotInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(input) = input?;
    let account = state.accounts.assign_slot(&service, &id, &input.consumer).await?;
    Ok(Json(json!({ "success": true, "account": account })))
}

pub async fn release_slot(
    State(state): State<AppState>,
    Path((service, id, consumer)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.release_slot(&service, &id, &consumer).await?;
    Ok(Json(json!({ "success": true, "account": account })))
}
