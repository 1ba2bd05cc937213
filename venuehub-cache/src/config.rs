//! Cache configuration.

use crate::account::BuiltinCredential;
use crate::policy::SettleStrategy;
use serde::{Deserialize, Serialize};

/// Configuration shared by every service built over one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// How writes wait for their commit time before reconciling.
    pub settle: SettleStrategy,
    /// Logins accepted without an `auth` record.
    pub builtin_credentials: Vec<BuiltinCredential>,
}

impl CacheConfig {
    /// Parses a JSON configuration. Missing keys take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
