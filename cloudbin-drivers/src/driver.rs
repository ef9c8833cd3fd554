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

//! Storage driver interface
//!
//! The seam between the upload pipeline and a concrete backend. A driver
//! plans the object key before any bytes move (the quota guard needs the
//! planned key), then performs the upload through whichever capability the
//! request selected. Wire protocols live behind this trait; the core never
//! sees them.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cloudbin_core::AppResult;

use crate::capability::Capabilities;
use crate::types::StorageType;

/// Result of a completed upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub storage_path: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// A presigned upload the client performs directly against the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub storage_path: String,
    pub expires_at_ms: i64,
}

/// Backend-side object metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStat {
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// One probe inside a connection-test report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesterCheck {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Raw tester output before the service normalizes it
///
/// `checks` is optional on purpose: a sloppy tester may omit it, and the
/// storage-config service appends a synthetic `contract` failure when it
/// does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesterReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<TesterCheck>>,
}

impl TesterReport {
    pub fn ok(message: impl Into<String>, checks: Vec<TesterCheck>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            checks: Some(checks),
        }
    }

    pub fn failed(message: impl Into<String>, checks: Vec<TesterCheck>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            checks: Some(checks),
        }
    }
}

#[async_trait]
pub trait StorageDriver: Send + Sync + std::fmt::Debug {
    fn storage_type(&self) -> StorageType;

    fn capabilities(&self) -> Capabilities {
        crate::capability::capabilities_for(self.storage_type())
    }

    /// Compute the key an upload will land at, honoring the config's naming
    /// policy and renaming on conflict. Called before any bytes move.
    async fn plan_key(&self, folder: Option<&str>, filename: &str) -> AppResult<String>;

    /// Stream a whole body to the backend
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        mimetype: Option<&str>,
    ) -> AppResult<UploadOutcome>;

    /// Hand the client a URL to upload directly
    async fn presign_upload(&self, key: &str, expires_secs: u64) -> AppResult<PresignedUpload>;

    /// Backend-side stat of a previously planned key
    async fn stat(&self, key: &str) -> AppResult<Option<ObjectStat>>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Probe the backend and report what works
    async fn test(&self, origin: &str) -> AppResult<TesterReport>;
}
