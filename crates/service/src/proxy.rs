//! Forwarding of authenticated admin requests to the upstream account API.
//!
//! The client never sees the upstream credential: it is attached here from
//! configuration. Client cookies and authorization headers are not forwarded.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::metrics;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream is not configured")]
    NotConfigured,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("internal proxy error: {0}")]
    Internal(String),
}

/// Upstream response, passed back to the client unchanged.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ProxySettings {
    pub upstream_base_url: Option<String>,
    pub upstream_api_key: Option<String>,
    pub api_key_header: String,
    pub timeout: Duration,
    pub prefix: String,
}

impl ProxySettings {
    pub fn from_settings(cfg: &configs::ProxyConfig) -> Self {
        Self {
            upstream_base_url: cfg.upstream_base_url.clone(),
            upstream_api_key: cfg.upstream_api_key.clone(),
            api_key_header: cfg.api_key_header.clone(),
            timeout: cfg.timeout(),
            prefix: cfg.prefix.clone(),
        }
    }
}

/// Map `<prefix><rest>` onto `<base><rest>`. `rest` must be empty or begin a
/// new path segment or query, so `/api/proxyfoo` does not match `/api/proxy`.
pub fn rewrite_url(base: &str, prefix: &str, path_and_query: &str) -> Result<String, ProxyError> {
    let rest = path_and_query
        .strip_prefix(prefix)
        .filter(|r| r.is_empty() || r.starts_with('/') || r.starts_with('?'))
        .ok_or_else(|| ProxyError::Internal(format!("path {path_and_query} is outside {prefix}")))?;
    Ok(format!("{}{}", base.trim_end_matches('/'), rest))
}

#[derive(Clone)]
pub struct UpstreamProxy {
    client: reqwest::Client,
    settings: ProxySettings,
}

impl UpstreamProxy {
    pub fn new(settings: ProxySettings) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    fn upstream_headers(&self, content_type: Option<&str>) -> Result<HeaderMap, ProxyError> {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            let v = HeaderValue::from_str(ct).map_err(|e| ProxyError::Internal(e.to_string()))?;
            headers.insert(CONTENT_TYPE, v);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = self.settings.upstream_api_key.as_deref() {
            let name = HeaderName::from_bytes(self.settings.api_key_header.as_bytes())
                .map_err(|e| ProxyError::Internal(e.to_string()))?;
            let mut value = HeaderValue::from_str(key).map_err(|e| ProxyError::Internal(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Forward one request. The caller must already have passed the session gate.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use service::proxy::{ProxyError, ProxySettings, UpstreamProxy};
    ///
    /// let proxy = UpstreamProxy::new(ProxySettings {
    ///     upstream_base_url: None,
    ///     upstream_api_key: None,
    ///     api_key_header: "x-admin-api-key".into(),
    ///     timeout: Duration::from_secs(10),
    ///     prefix: "/api/proxy".into(),
    /// })
    /// .unwrap();
    /// let res = tokio_test::block_on(proxy.forward(reqwest::Method::GET, "/api/proxy/accounts", None, None));
    /// assert!(matches!(res, Err(ProxyError::NotConfigured)));
    /// ```
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        content_type: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<ProxyResponse, ProxyError> {
        let base = self.settings.upstream_base_url.as_deref().ok_or(ProxyError::NotConfigured)?;
        let url = rewrite_url(base, &self.settings.prefix, path_and_query)?;
        let headers = self.upstream_headers(content_type)?;

        let mut req = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            req = req.body(body);
        }

        let started = Instant::now();
        let outcome = async {
            let resp = req.send().await?;
            let status = resp.status().as_u16();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.bytes().await?.to_vec();
            Ok::<_, reqwest::Error>(ProxyResponse { status, content_type, body })
        }
        .await;
        let elapsed = started.elapsed();
        metrics::PROXY_REQUEST_DURATION.observe(elapsed.as_secs_f64());

        match outcome {
            Ok(resp) => {
                metrics::PROXY_REQUESTS_TOTAL.with_label_values(&[&resp.status.to_string()]).inc();
                info!(
                    event = "proxy_forward",
                    timestamp = %Utc::now().to_rfc3339(),
                    method = %method,
                    url = %url,
                    status = resp.status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "forwarded request"
                );
                debug!(bytes = resp.body.len(), "upstream body received");
                Ok(resp)
            }
            Err(e) => {
                let mapped = if e.is_builder() || e.is_redirect() {
                    ProxyError::Internal(e.to_string())
                } else {
                    metrics::PROXY_UPSTREAM_ERRORS_TOTAL.inc();
                    ProxyError::Unavailable(e.to_string())
                };
                let status = match mapped {
                    ProxyError::Internal(_) => 500,
                    _ => 503,
                };
                metrics::PROXY_REQUESTS_TOTAL.with_label_values(&[&status.to_string()]).inc();
                error!(
                    event = "proxy_forward",
                    timestamp = %Utc::now().to_rfc3339(),
                    method = %method,
                    url = %url,
                    status,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    err = %e,
                    "upstream request failed"
                );
                Err(mapped)
            }
        }
    }
}
