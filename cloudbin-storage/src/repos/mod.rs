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

//! Repositories
//!
//! One repository per table group, all speaking JSON attribute bags
//! through the [`Database`](crate::db::Database) seam. Statements are
//! prepared per call.

pub mod identity;
pub mod metrics;
pub mod mounts;
pub mod settings;
pub mod shares;
pub mod storage_configs;

use serde_json::Value;

use crate::db::Row;

pub use identity::{AdminRepo, AdminTokenRepo, ApiKeyRepo};
pub use metrics::MetricsRepo;
pub use mounts::MountRepo;
pub use settings::SettingsRepo;
pub use shares::{FileShareRepo, PasteRepo};
pub use storage_configs::{AclRepo, StorageConfigRepo};

pub(crate) fn row_str(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn row_string(row: &Row, key: &str) -> String {
    row_str(row, key).unwrap_or_default()
}

pub(crate) fn row_i64(row: &Row, key: &str) -> Option<i64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// 0/1 columns, tolerating the "0"/"1" string wire form
pub(crate) fn row_bool(row: &Row, key: &str) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}
