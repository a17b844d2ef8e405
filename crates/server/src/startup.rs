use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use configs::AppConfig;
use models::Catalog;
use service::{
    accounts::AccountService,
    auth::{AuthConfig, AuthService},
    proxy::{ProxySettings, UpstreamProxy},
    runtime,
    storage::InventoryStore,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::routes;
use crate::state::{AppState, HttpSettings};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the store and wire every service into the shared state.
///
/// A corrupt accounts file fails here instead of being reset.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    runtime::ensure_env(&cfg.storage.data_dir).await?;

    let path = cfg.storage.accounts_path();
    let store = InventoryStore::open(&path, Arc::new(Catalog::builtin().clone()))
        .await
        .map_err(|e| {
            error!(event = "store_open_failed", path = %path.display(), err = %e, "cannot open accounts store");
            e
        })
        .with_context(|| format!("opening {}", path.display()))?;

    let auth = AuthService::new(AuthConfig::from_settings(&cfg.auth));
    info!(session_ttl_hours = auth.session_ttl().num_hours(), api_key_bypass = cfg.auth.api_key.is_some(), "admin sessions ready");
    let proxy = UpstreamProxy::new(ProxySettings::from_settings(&cfg.proxy))?;
    if proxy.settings().upstream_base_url.is_none() {
        warn!(event = "proxy_disabled", "no upstream configured; proxy routes will answer 503");
    }

    Ok(AppState {
        accounts: AccountService::new(store),
        auth: Arc::new(auth),
        proxy: Arc::new(proxy),
        http: Arc::new(HttpSettings {
            production: cfg.server.environment.is_production(),
            cookie_secure: cfg.auth.cookie_secure,
            api_key_header: cfg.proxy.api_key_header.clone(),
        }),
    })
}

pub fn build_app(state: AppState) -> Router {
    routes::build_router(state, build_cors())
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cfg.server.host, cfg.server.port))?;
    info!(%addr, environment = ?cfg.server.environment, "starting account panel");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
