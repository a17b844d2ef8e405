#![allow(dead_code)]

use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use configs::{AppConfig, Environment};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "test-admin-password";

pub struct TestApp {
    pub app: Router,
    pub accounts_path: PathBuf,
}

pub fn test_config(upstream: Option<String>) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.data_dir = std::env::temp_dir()
        .join(format!("account_panel_it_{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    cfg.auth.admin_password = PASSWORD.into();
    cfg.auth.session_secret = Some("integration-secret".into());
    cfg.proxy.upstream_base_url = upstream;
    cfg.proxy.upstream_api_key = Some("upstream-key".into());
    cfg.proxy.timeout_secs = 2;
    cfg
}

pub async fn spawn_app(cfg: AppConfig) -> anyhow::Result<TestApp> {
    let accounts_path = cfg.storage.accounts_path();
    let state = server::build_state(&cfg).await?;
    Ok(TestApp { app: server::build_app(state), accounts_path })
}

pub async fn dev_app() -> anyhow::Result<TestApp> {
    spawn_app(test_config(None)).await
}

pub async fn production_app() -> anyhow::Result<TestApp> {
    let mut cfg = test_config(None);
    cfg.server.environment = Environment::Production;
    spawn_app(cfg).await
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> anyhow::Result<Response> {
        Ok(self.app.clone().oneshot(req).await?)
    }

    pub async fn call(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        let req = match body {
            Some(v) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(v.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        let res = self.send(req).await?;
        let status = res.status();
        Ok((status, json_body(res).await?))
    }

    /// Log in and return the `name=value` pair to send back as a Cookie header.
    pub async fn login(&self) -> anyhow::Result<String> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/admin/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "password": PASSWORD }).to_string()))?;
        let res = self.send(req).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow::anyhow!("no session cookie"))?;
        let pair = set_cookie.split(';').next().unwrap_or_default().trim().to_string();
        Ok(pair)
    }
}

pub async fn json_body(res: Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
