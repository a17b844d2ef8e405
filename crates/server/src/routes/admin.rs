use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use service::auth::domain::LoginInput;

use crate::auth::{removal_cookie, session_cookie, session_token};
use crate::errors::ApiError;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    input: Result<Json<LoginInput>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let Json(input) = input?;
    let session = state.auth.login(&input.password)?;
    // browsers use the cookie; scripts can send the same token as Bearer
    let jar = jar.add(session_cookie(session.token.clone(), state.http.cookie_secure));
    let body = json!({
        "success": true,
        "message": "Logged in",
        "token": session.token,
        "expiresAt": session.expires_at,
    });
    Ok((jar, Json(body)))
}

/// Always succeeds; the cookie is cleared whether or not a session existed.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> (CookieJar, Json<Value>) {
    state.auth.logout(session_token(&headers).as_deref());
    (jar.remove(removal_cookie()), Json(json!({ "success": true, "message": "Logged out" })))
}

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let status = state.auth.status(session_token(&headers).as_deref());
    Json(json!({
        "success": true,
        "authenticated": status.authenticated,
        "expiresAt": status.expires_at,
    }))
}
