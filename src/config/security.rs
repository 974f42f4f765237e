//! Security configuration types.
//!
//! Trimmed to what this server actually terminates: CORS and optional TLS.
//! The teacher's app-auth/metrics-auth/token-binding scaffolding has no
//! counterpart here (see DESIGN.md) — nothing in this protocol
//! authenticates beyond the room password checked at admission.

use super::defaults::default_cors_origins;
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// Allowed CORS origin(s) for the game's client (comma-separated, or "*").
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// TLS termination, only consulted when the root config's `use_https` is set.
    #[serde(default)]
    pub tls: TlsServerConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            tls: TlsServerConfig::default(),
        }
    }
}

/// TLS server configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TlsServerConfig {
    /// Path to the PEM-encoded certificate chain presented to clients.
    #[serde(default)]
    pub certificate_path: Option<String>,
    /// Path to the PEM-encoded private key corresponding to the certificate chain.
    #[serde(default)]
    pub private_key_path: Option<String>,
}
