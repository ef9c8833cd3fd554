// Copyright 2025 Cloudbin (https://github.com/cloudbin)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Cloudbin Server Configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: default_enable_cors(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Path to the metadata database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Process-wide secret for config-field encryption.
    ///
    /// Rotating this renders existing ciphertexts unreadable: affected
    /// configs stay present but become unusable until re-entered.
    pub encryption_secret: String,

    /// Admin session token lifetime
    #[serde(default = "default_token_ttl_hours")]
    pub admin_token_ttl_hours: i64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cloudbin.db")
}

fn default_token_ttl_hours() -> i64 {
    24
}

impl ServerConfig {
    /// Load from a TOML file, with `CLOUDBIN_ENCRYPTION_SECRET` overriding
    /// the file-provided secret
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: ServerConfig =
            toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))?;
        if let Ok(secret) = std::env::var("CLOUDBIN_ENCRYPTION_SECRET") {
            config.security.encryption_secret = secret;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.encryption_secret.trim().is_empty() {
            anyhow::bail!("encryption_secret must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_in() {
        let config: ServerConfig = toml::from_str(
            r#"
            [security]
            encryption_secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:47200");
        assert_eq!(config.security.admin_token_ttl_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config: ServerConfig = toml::from_str(
            r#"
            [security]
            encryption_secret = "  "
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
