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

//! Metrics-cache repository
//!
//! The usage calculator writes computed-usage snapshots here; the quota
//! guard only ever reads the latest row per config.

use std::sync::Arc;

use cloudbin_core::{
    now_ms, AppResult, MetricsCacheEntry, COMPUTED_USAGE_KEY, METRICS_SCOPE_STORAGE_CONFIG,
};

use crate::db::{Database, Row, SqlStatement, SqlValue};

use super::{row_i64, row_str, row_string};

pub struct MetricsRepo {
    db: Arc<dyn Database>,
}

impl MetricsRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> MetricsCacheEntry {
        MetricsCacheEntry {
            scope: row_string(row, "scope"),
            scope_id: row_string(row, "scope_id"),
            key: row_string(row, "key"),
            value_num: row_i64(row, "value_num"),
            value_text: row_str(row, "value_text"),
            value_json_text: row_str(row, "value_json_text"),
            snapshot_at_ms: row_i64(row, "snapshot_at_ms").unwrap_or(0),
        }
    }

    /// Latest computed-usage snapshot for a storage config
    pub fn computed_usage(&self, storage_config_id: &str) -> AppResult<Option<MetricsCacheEntry>> {
        let rows = self.db.query(
            "SELECT * FROM metrics_cache WHERE scope = ?1 AND scope_id = ?2 AND key = ?3",
            &[
                SqlValue::Text(METRICS_SCOPE_STORAGE_CONFIG.to_string()),
                SqlValue::Text(storage_config_id.to_string()),
                SqlValue::Text(COMPUTED_USAGE_KEY.to_string()),
            ],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    /// Whole-row replacement of the computed-usage snapshot
    pub fn put_computed_usage(
        &self,
        storage_config_id: &str,
        used_bytes: i64,
        source: &str,
        details_json: Option<&str>,
    ) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO metrics_cache \
             (scope, scope_id, key, value_num, value_text, value_json_text, snapshot_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(scope, scope_id, key) DO UPDATE SET \
             value_num = excluded.value_num, value_text = excluded.value_text, \
             value_json_text = excluded.value_json_text, snapshot_at_ms = excluded.snapshot_at_ms",
            vec![
                SqlValue::Text(METRICS_SCOPE_STORAGE_CONFIG.to_string()),
                SqlValue::Text(storage_config_id.to_string()),
                SqlValue::Text(COMPUTED_USAGE_KEY.to_string()),
                SqlValue::Integer(used_bytes),
                SqlValue::Text(source.to_string()),
                details_json
                    .map(|d| SqlValue::Text(d.to_string()))
                    .unwrap_or(SqlValue::Null),
                SqlValue::Integer(now_ms()),
            ],
        ))?;
        Ok(())
    }
}
