use std::sync::Arc;

use service::{accounts::AccountService, auth::AuthService, proxy::UpstreamProxy};

/// HTTP-facing knobs that are not owned by a service.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub production: bool,
    pub cookie_secure: bool,
    /// Header carrying the optional service-to-service admin key
    pub api_key_header: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { production: false, cookie_secure: false, api_key_header: "x-admin-api-key".into() }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub auth: Arc<AuthService>,
    pub proxy: Arc<UpstreamProxy>,
    pub http: Arc<HttpSettings>,
}
