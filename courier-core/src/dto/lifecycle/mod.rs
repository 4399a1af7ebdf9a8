//! Lifecycle control-plane DTOs

use serde::{Deserialize, Serialize};

/// Instance status reported by the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InstanceStatus {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

/// Bearer token granted by the credential exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds; absent means the caller must re-exchange each time
    #[serde(default)]
    pub expires_in: Option<i64>,
}
