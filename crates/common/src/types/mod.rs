use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness payload returned by `GET /api/health`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub success: bool,
    pub message: String,
    /// Number of service keys present in the inventory
    pub services: usize,
    pub total_accounts: usize,
    pub timestamp: DateTime<Utc>,
}

impl Health {
    pub fn new(message: impl Into<String>, services: usize, total_accounts: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            services,
            total_accounts,
            timestamp: Utc::now(),
        }
    }
}
