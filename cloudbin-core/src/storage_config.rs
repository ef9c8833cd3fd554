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

//! Storage configuration entity
//!
//! One row per configured backend. The driver-private settings live in
//! `config_json`; secret fields inside it are ciphertext-only. At most one
//! config per admin carries `is_default = 1`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default quota applied when a create omits `total_storage_bytes`: 10 GiB
pub const DEFAULT_TOTAL_STORAGE_BYTES: i64 = 10 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub id: String,
    pub name: String,
    /// Tag of the driver variant ("s3", "webdav", ...)
    pub storage_type: String,
    pub admin_id: String,
    pub is_public: bool,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Base URL prepended when a share is served through the URL proxy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_proxy: Option<String>,
    pub status: String,
    /// Driver-private bag; secret members are stored encrypted
    pub config_json: Map<String, Value>,
    /// Quota in bytes; `None` means unlimited
    pub total_storage_bytes: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
}

impl StorageConfig {
    /// Active configs accept uploads; anything else is administratively held
    pub const STATUS_ACTIVE: &'static str = "active";
    pub const STATUS_DISABLED: &'static str = "disabled";

    pub fn is_active(&self) -> bool {
        self.status == Self::STATUS_ACTIVE
    }

    /// Read a string member of the driver-private bag
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_json.get(key).and_then(Value::as_str)
    }

    /// Read a boolean member, honoring the 0/1 and "0"/"1" wire forms
    pub fn config_bool(&self, key: &str) -> bool {
        match self.config_json.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StorageConfig {
        StorageConfig {
            id: "cfg_1".to_string(),
            name: "primary".to_string(),
            storage_type: "s3".to_string(),
            admin_id: "admin_1".to_string(),
            is_public: true,
            is_default: false,
            remark: None,
            url_proxy: None,
            status: StorageConfig::STATUS_ACTIVE.to_string(),
            config_json: json!({
                "endpoint_url": "https://s3.example.com/",
                "path_style": 1,
                "official": "0",
            })
            .as_object()
            .unwrap()
            .clone(),
            total_storage_bytes: Some(DEFAULT_TOTAL_STORAGE_BYTES),
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
            updated_at: "2025-01-01T00:00:00.000Z".to_string(),
            last_used_at: None,
        }
    }

    #[test]
    fn test_config_bool_wire_forms() {
        let cfg = sample();
        assert!(cfg.config_bool("path_style"));
        assert!(!cfg.config_bool("official"));
        assert!(!cfg.config_bool("missing"));
    }

    #[test]
    fn test_config_str() {
        let cfg = sample();
        assert_eq!(cfg.config_str("endpoint_url"), Some("https://s3.example.com/"));
        assert_eq!(cfg.config_str("path_style"), None);
    }
}
