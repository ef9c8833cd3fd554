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

//! Share and mount entities
//!
//! A [`FileShare`] ties a public slug to a stored object plus its access
//! policy; a [`PasteRecord`] is the text-share counterpart with the content
//! inline. [`StorageMount`] binds a virtual mount path to a storage config.

use serde::{Deserialize, Serialize};

/// File share record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileShare {
    pub id: String,
    pub slug: String,
    pub filename: String,
    pub storage_config_id: String,
    /// Object key inside the backend
    pub storage_path: String,
    /// Set when the share originates from a mounted filesystem path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub use_proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Argon2 hash; never the plaintext
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_views: Option<i64>,
    pub views: i64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FileShare {
    /// Expired or view-capped shares are treated as gone
    pub fn is_exhausted(&self, now_iso: &str) -> bool {
        if let Some(expires_at) = &self.expires_at {
            if expires_at.as_str() <= now_iso {
                return true;
            }
        }
        if let Some(max_views) = self.max_views {
            if max_views > 0 && self.views >= max_views {
                return true;
            }
        }
        false
    }
}

/// Text share record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteRecord {
    pub id: String,
    pub slug: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_views: Option<i64>,
    pub views: i64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Virtual mount binding a path prefix to a storage config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageMount {
    pub id: String,
    pub name: String,
    pub storage_config_id: String,
    /// Virtual path the mount owns, e.g. `/media`
    pub mount_path: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}
