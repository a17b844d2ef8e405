use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthSession, Claims, Principal, SessionStatus};
use super::errors::AuthError;

const SUBJECT: &str = "admin";

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub admin_password: String,
    /// Token signing secret; random per process when `None`
    pub session_secret: Option<String>,
    pub session_ttl: Duration,
    /// Service-to-service bypass key
    pub api_key: Option<String>,
}

impl AuthConfig {
    pub fn from_settings(cfg: &configs::AuthConfig) -> Self {
        Self {
            admin_password: cfg.admin_password.clone(),
            session_secret: cfg.session_secret.clone(),
            session_ttl: Duration::hours(cfg.session_ttl_hours as i64),
            api_key: cfg.api_key.clone(),
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn random_secret() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

/// Single-admin session gateway, independent of the web framework.
///
/// A session is `Authenticated` while its id is tracked here and its expiry
/// is in the future; expiry is checked on every call, there is no timer.
pub struct AuthService {
    admin_password: String,
    api_key: Option<String>,
    ttl: Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
    sessions: DashMap<String, DateTime<Utc>>,
}

impl AuthService {
    pub fn new(cfg: AuthConfig) -> Self {
        let secret = cfg.session_secret.unwrap_or_else(random_secret);
        Self {
            admin_password: cfg.admin_password,
            api_key: cfg.api_key,
            ttl: cfg.session_ttl,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            sessions: DashMap::new(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Check the admin password and open a session.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthConfig, AuthService};
    /// let svc = AuthService::new(AuthConfig {
    ///     admin_password: "hunter2".into(),
    ///     session_secret: Some("secret".into()),
    ///     session_ttl: chrono::Duration::hours(24),
    ///     api_key: None,
    /// });
    /// assert!(svc.login("wrong").is_err());
    /// let session = svc.login("hunter2").unwrap();
    /// assert!(svc.require_authenticated(Some(&session.token)).is_ok());
    /// ```
    pub fn login(&self, password: &str) -> Result<AuthSession, AuthError> {
        self.login_at(password, Utc::now())
    }

    #[instrument(skip_all)]
    pub fn login_at(&self, password: &str, now: DateTime<Utc>) -> Result<AuthSession, AuthError> {
        if self.admin_password.is_empty() || !constant_time_eq(password.as_bytes(), self.admin_password.as_bytes()) {
            warn!(event = "login_failed", "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.sessions.retain(|_, exp| *exp > now);

        let session_id = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: SUBJECT.into(),
            sid: session_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&JwtHeader::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(e.to_string()))?;
        self.sessions.insert(session_id.clone(), expires_at);

        info!(event = "login", session_id = %session_id, expires_at = %expires_at, "admin session opened");
        Ok(AuthSession { session_id, token, expires_at })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the caller's clock and the session table
        validation.validate_exp = false;
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Close the session behind `token`. Unknown, expired or missing tokens are a no-op.
    pub fn logout(&self, token: Option<&str>) {
        let Some(token) = token else { return };
        match self.decode_claims(token) {
            Ok(claims) => {
                if self.sessions.remove(&claims.sid).is_some() {
                    info!(event = "logout", session_id = %claims.sid, "admin session closed");
                }
            }
            Err(e) => debug!(err = %e, "logout with unreadable token ignored"),
        }
    }

    pub fn require_authenticated(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        self.require_authenticated_at(token, Utc::now())
    }

    /// Gate for every mutating and proxied route.
    pub fn require_authenticated_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::Unauthorized)?;
        let claims = self.decode_claims(token).map_err(|e| {
            debug!(err = %e, "session token rejected");
            AuthError::Unauthorized
        })?;
        if claims.sub != SUBJECT || claims.exp <= now.timestamp() {
            self.sessions.remove(&claims.sid);
            return Err(AuthError::Unauthorized);
        }
        let expires_at = match self.sessions.get(&claims.sid) {
            Some(exp) => *exp,
            None => return Err(AuthError::Unauthorized),
        };
        if expires_at <= now {
            self.sessions.remove(&claims.sid);
            return Err(AuthError::Unauthorized);
        }
        Ok(Principal::Session { session_id: claims.sid, expires_at })
    }

    /// True when a bypass key is configured and `key` matches it.
    pub fn verify_api_key(&self, key: &str) -> bool {
        match self.api_key.as_deref() {
            Some(expected) if !key.is_empty() => constant_time_eq(key.as_bytes(), expected.as_bytes()),
            _ => false,
        }
    }

    /// Accept either the bypass key or a live session.
    pub fn authenticate(&self, token: Option<&str>, api_key: Option<&str>) -> Result<Principal, AuthError> {
        if let Some(key) = api_key {
            if self.verify_api_key(key) {
                return Ok(Principal::ApiKey);
            }
            warn!(event = "api_key_rejected", "admin api key did not match");
        }
        self.require_authenticated(token)
    }

    pub fn status(&self, token: Option<&str>) -> SessionStatus {
        match self.require_authenticated(token) {
            Ok(Principal::Session { expires_at, .. }) => SessionStatus { authenticated: true, expires_at: Some(expires_at) },
            Ok(Principal::ApiKey) => SessionStatus { authenticated: true, expires_at: None },
            Err(_) => SessionStatus { authenticated: false, expires_at: None },
        }
    }
}
