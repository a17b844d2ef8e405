use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Slot capacity given to accounts created without an explicit limit.
pub const DEFAULT_MAX_USERS: u32 = 5;

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn default_max_users() -> u32 {
    DEFAULT_MAX_USERS
}

/// One shared login of a service, split into slots.
///
/// Every field carries a serde default so records written by older versions
/// (or by hand) still load. `fully_used` is persisted for readers of the raw
/// file only; [`Account::is_full`] is the authority and [`Account::reconcile`]
/// rewrites the flag from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub current_users: u32,
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    #[serde(default)]
    pub fully_used: bool,
    #[serde(default)]
    pub notes: String,
    /// Records without a timestamp load as the epoch so repeated reads agree
    #[serde(default)]
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub used_by: Vec<String>,
}

/// Payload of the add-account operation. Required fields are optional here so
/// that a missing one surfaces as a validation error instead of a decode error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountInput {
    pub service: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub notes: Option<String>,
    pub max_users: Option<u32>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ModelError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ModelError::Validation(format!("{field} is required"))),
    }
}

pub fn validate_service_id(service: &str) -> Result<(), ModelError> {
    if service.trim().is_empty() {
        return Err(ModelError::Validation("service is required".into()));
    }
    if service.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(ModelError::Validation("service must not contain '/' or whitespace".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if !email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

impl NewAccountInput {
    /// Checks the input and returns the trimmed service id.
    pub fn validate(&self) -> Result<&str, ModelError> {
        let service = required(&self.service, "service")?;
        let email = required(&self.email, "email")?;
        required(&self.password, "password")?;
        validate_service_id(service)?;
        validate_email(email)?;
        if self.max_users == Some(0) {
            return Err(ModelError::Validation("maxUsers must be greater than zero".into()));
        }
        Ok(service)
    }

    /// Build the account record. `service_name` comes from the catalog.
    pub fn into_account(self, id: String, service_name: &str, now: DateTime<Utc>) -> Result<Account, ModelError> {
        let service = self.validate()?.to_string();
        let email = required(&self.email, "email")?.to_string();
        let password = self.password.unwrap_or_default();
        let username = match self.username.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => username_from_email(&email).to_string(),
        };
        Ok(Account {
            id,
            email,
            password,
            username,
            service,
            service_name: service_name.to_string(),
            current_users: 0,
            max_users: self.max_users.unwrap_or(DEFAULT_MAX_USERS),
            fully_used: false,
            notes: self.notes.unwrap_or_default(),
            added_at: now,
            used_by: Vec::new(),
        })
    }
}

pub fn username_from_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// `<service>_<unix millis>_<9 base36 chars>`
pub fn generate_account_id(service: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", service, now.timestamp_millis(), suffix)
}

impl Account {
    pub fn is_full(&self) -> bool {
        self.current_users >= self.max_users
    }

    pub fn is_available(&self) -> bool {
        !self.is_full()
    }

    pub fn free_slots(&self) -> u32 {
        self.max_users.saturating_sub(self.current_users)
    }

    /// Restore the record invariants after a load or before a save.
    pub fn reconcile(&mut self, service: &str, service_name: &str) {
        if self.service.is_empty() {
            self.service = service.to_string();
        }
        if self.service_name.is_empty() {
            self.service_name = service_name.to_string();
        }
        if self.username.is_empty() && !self.email.is_empty() {
            self.username = username_from_email(&self.email).to_string();
        }
        if self.max_users == 0 {
            self.max_users = DEFAULT_MAX_USERS;
        }
        // named holders never exceed capacity; the count covers at least them
        self.used_by.truncate(self.max_users as usize);
        let named = self.used_by.len() as u32;
        self.current_users = self.current_users.max(named).min(self.max_users);
        self.fully_used = self.is_full();
    }

    /// Slots counted in `current_users` without a recorded holder, as left by
    /// records that only tracked the count.
    pub fn anonymous_slots(&self) -> u32 {
        self.current_users.saturating_sub(self.used_by.len() as u32)
    }

    /// Give one slot to `consumer`.
    pub fn assign_slot(&mut self, consumer: &str) -> Result<(), ModelError> {
        let consumer = consumer.trim();
        if consumer.is_empty() {
            return Err(ModelError::Validation("consumer is required".into()));
        }
        if self.used_by.iter().any(|c| c == consumer) {
            return Err(ModelError::DuplicateConsumer(consumer.to_string()));
        }
        if self.is_full() {
            return Err(ModelError::CapacityExceeded(self.max_users));
        }
        self.used_by.push(consumer.to_string());
        self.current_users += 1;
        self.fully_used = self.is_full();
        Ok(())
    }

    /// Free the slot held by `consumer`. An unnamed consumer falls back to
    /// one anonymous slot when the account has any.
    pub fn release_slot(&mut self, consumer: &str) -> Result<(), ModelError> {
        match self.used_by.iter().position(|c| c == consumer) {
            Some(idx) => {
                self.used_by.remove(idx);
            }
            None if self.anonymous_slots() > 0 => {}
            None => return Err(ModelError::UnknownConsumer(consumer.to_string())),
        }
        self.current_users = self.current_users.saturating_sub(1);
        self.fully_used = self.is_full();
        Ok(())
    }

    /// Case-insensitive match on email, username and notes.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.email, &self.username, &self.notes]
            .iter()
            .any(|f| f.to_lowercase().contains(&needle))
    }
}
