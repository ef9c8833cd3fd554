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

//! Metrics-cache snapshot rows
//!
//! An out-of-core usage calculator maintains one computed-usage row per
//! storage config. The quota guard reads the latest snapshot before every
//! upload; absence of a snapshot means the guard admits best-effort.

use serde::{Deserialize, Serialize};

/// Scope tag of per-config metric rows
pub const METRICS_SCOPE_STORAGE_CONFIG: &str = "storage_config";

/// Key of the computed-usage snapshot within a scope
pub const COMPUTED_USAGE_KEY: &str = "computed_usage";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsCacheEntry {
    pub scope: String,
    pub scope_id: String,
    pub key: String,
    /// Numeric payload; for computed usage this is used bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_num: Option<i64>,
    /// Textual payload; for computed usage the source of the number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
    /// JSON payload with per-source details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_json_text: Option<String>,
    pub snapshot_at_ms: i64,
}
