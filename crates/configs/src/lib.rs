use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: None,
            environment: Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_accounts_file")]
    pub accounts_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), accounts_file: default_accounts_file() }
    }
}

impl StorageConfig {
    pub fn accounts_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.accounts_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub admin_password: String,
    /// HMAC secret for session tokens; a random one is generated per process when empty
    #[serde(default)]
    pub session_secret: Option<String>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    /// Optional service-to-service bypass key
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            session_secret: None,
            session_ttl_hours: default_session_ttl_hours(),
            api_key: None,
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub upstream_base_url: Option<String>,
    #[serde(default)]
    pub upstream_api_key: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_proxy_prefix")]
    pub prefix: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: None,
            upstream_api_key: None,
            api_key_header: default_api_key_header(),
            timeout_secs: default_timeout_secs(),
            prefix: default_proxy_prefix(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 3001 }
fn default_data_dir() -> String { "data".into() }
fn default_accounts_file() -> String { "accounts.json".into() }
fn default_session_ttl_hours() -> u64 { 24 }
fn default_api_key_header() -> String { "x-admin-api-key".into() }
fn default_timeout_secs() -> u64 { 10 }
fn default_proxy_prefix() -> String { "/api/proxy".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or defaults when it is missing), apply env overrides, validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay environment variables on top of file values. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").or_else(|| lookup("SERVER_PORT")).and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(threads) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse().ok()) {
            self.server.worker_threads = Some(threads);
        }
        if let Some(env) = lookup("APP_ENV") {
            if env.eq_ignore_ascii_case("production") {
                self.server.environment = Environment::Production;
            } else if env.eq_ignore_ascii_case("development") {
                self.server.environment = Environment::Development;
            }
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.storage.data_dir = dir;
        }
        if let Some(pw) = lookup("ADMIN_PASSWORD") {
            self.auth.admin_password = pw;
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.auth.session_secret = Some(secret);
        }
        if let Some(key) = lookup("ADMIN_API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Some(url) = lookup("UPSTREAM_API_URL") {
            self.proxy.upstream_base_url = Some(url);
        }
        if let Some(key) = lookup("UPSTREAM_API_KEY") {
            self.proxy.upstream_api_key = Some(key);
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.validate()?;
        self.proxy.normalize_and_validate()?;
        if self.storage.accounts_file.trim().is_empty() {
            return Err(anyhow!("storage.accounts_file must not be empty"));
        }
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }
}

impl AuthConfig {
    fn validate(&mut self) -> Result<()> {
        if self.admin_password.is_empty() {
            return Err(anyhow!("auth.admin_password is empty; set it in config.toml or ADMIN_PASSWORD"));
        }
        if self.session_ttl_hours == 0 {
            return Err(anyhow!("auth.session_ttl_hours must be a positive number of hours"));
        }
        if self.session_secret.as_deref().map(str::trim) == Some("") {
            self.session_secret = None;
        }
        if self.api_key.as_deref().map(str::trim) == Some("") {
            self.api_key = None;
        }
        Ok(())
    }
}

impl ProxyConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("proxy.timeout_secs must be a positive number of seconds"));
        }
        if !self.prefix.starts_with('/') {
            self.prefix = format!("/{}", self.prefix);
        }
        while self.prefix.len() > 1 && self.prefix.ends_with('/') {
            self.prefix.pop();
        }
        if self.prefix == "/" {
            return Err(anyhow!("proxy.prefix must not be the site root"));
        }
        if let Some(url) = self.upstream_base_url.as_mut() {
            let trimmed = url.trim().trim_end_matches('/').to_string();
            if trimmed.is_empty() {
                self.upstream_base_url = None;
            } else {
                let lower = trimmed.to_lowercase();
                if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                    return Err(anyhow!("proxy.upstream_base_url must start with http:// or https://"));
                }
                *url = trimmed;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_reference_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.auth.session_ttl_hours, 24);
        assert_eq!(cfg.proxy.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.proxy.prefix, "/api/proxy");
        assert_eq!(cfg.storage.accounts_path(), PathBuf::from("data").join("accounts.json"));
    }

    #[test]
    fn parses_partial_toml() -> Result<()> {
        let cfg = parse(
            r#"
            [server]
            port = 8088
            environment = "production"

            [proxy]
            upstream_base_url = "https://upstream.example.com/"
            "#,
        )?;
        assert_eq!(cfg.server.port, 8088);
        assert!(cfg.server.environment.is_production());
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.proxy.timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn env_overrides_and_validation() -> Result<()> {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ADMIN_PASSWORD", "s3cret"),
            ("PORT", "4000"),
            ("UPSTREAM_API_URL", "http://localhost:9000/"),
            ("ADMIN_API_KEY", "  "),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.auth.admin_password, "s3cret");
        assert_eq!(cfg.proxy.upstream_base_url.as_deref(), Some("http://localhost:9000"));
        assert!(cfg.auth.api_key.is_none());
        Ok(())
    }

    #[test]
    fn missing_admin_password_is_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn non_http_upstream_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.auth.admin_password = "pw".into();
        cfg.proxy.upstream_base_url = Some("ftp://files".into());
        assert!(cfg.normalize_and_validate().is_err());
    }
}
