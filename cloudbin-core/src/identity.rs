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

//! Identity entities: admins, admin tokens, API keys

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub username: String,
    /// Argon2 hash
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Opaque bearer token issued at admin login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminToken {
    pub token: String,
    pub admin_id: String,
    pub expires_at: String,
    pub created_at: String,
}

impl AdminToken {
    pub fn is_expired(&self, now_iso: &str) -> bool {
        self.expires_at.as_str() <= now_iso
    }
}

/// API key principal
///
/// The subject string used in ACL bindings and `created_by` columns is
/// `apikey:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    /// The key material itself; presented by clients verbatim
    pub key: String,
    pub text_permission: bool,
    pub file_permission: bool,
    pub mount_permission: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
    pub created_at: String,
}

impl ApiKey {
    /// Creator-identity string recorded on rows this key writes
    pub fn subject(&self) -> String {
        format!("apikey:{}", self.id)
    }

    pub fn is_expired(&self, now_iso: &str) -> bool {
        match &self.expires_at {
            Some(expires_at) => expires_at.as_str() <= now_iso,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_subject() {
        let key = ApiKey {
            id: "k1".to_string(),
            name: "ci".to_string(),
            key: "secret".to_string(),
            text_permission: true,
            file_permission: true,
            mount_permission: false,
            basic_path: None,
            expires_at: None,
            last_used: None,
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(key.subject(), "apikey:k1");
        assert!(!key.is_expired("2099-01-01T00:00:00.000Z"));
    }
}
