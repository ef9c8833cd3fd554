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

//! Quota guard and usage reporting
//!
//! Pre-write admission against the latest computed-usage snapshot. The
//! snapshot is a soft bound: two concurrent uploads may both be admitted
//! even when their joint total would exceed the limit; the backend's own
//! accounting loop provides the hard consistency. A missing snapshot
//! admits best-effort.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use cloudbin_core::{AppError, AppResult, MetricsCacheEntry};
use cloudbin_storage::{Database, FileShareRepo, MetricsRepo, StorageConfigRepo};

pub struct QuotaService {
    configs: StorageConfigRepo,
    metrics: MetricsRepo,
    shares: FileShareRepo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedUsage {
    pub used_bytes: i64,
    pub source: String,
    pub snapshot_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatus {
    pub remaining_bytes: i64,
    pub percent_used: f64,
    pub exceeded: bool,
}

/// Per-config entry of the admin usage report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUsageReport {
    pub storage_config_id: String,
    pub name: String,
    pub storage_type: String,
    pub configured_limit_bytes: Option<i64>,
    pub enable_disk_usage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_usage: Option<ComputedUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_status: Option<LimitStatus>,
}

impl QuotaService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            configs: StorageConfigRepo::new(db.clone()),
            metrics: MetricsRepo::new(db.clone()),
            shares: FileShareRepo::new(db),
        }
    }

    /// Admit or reject an incoming write
    ///
    /// `delta = incoming - old` accounts for same-key overwrites; only a
    /// positive delta consumes quota.
    pub fn assert_can_consume(
        &self,
        storage_config_id: &str,
        incoming_bytes: i64,
        old_bytes: Option<i64>,
        context: &str,
    ) -> AppResult<()> {
        let config = self
            .configs
            .get(storage_config_id)?
            .ok_or_else(|| {
                AppError::not_found(format!("storage config not found: {}", storage_config_id))
            })?;
        let Some(limit) = config.total_storage_bytes else {
            return Ok(());
        };

        let Some(snapshot) = self.metrics.computed_usage(storage_config_id)? else {
            debug!(
                storage_config_id,
                context, "no usage snapshot; admitting best-effort"
            );
            return Ok(());
        };
        let used = snapshot.value_num.unwrap_or(0);

        let delta = (incoming_bytes - old_bytes.unwrap_or(0)).max(0);
        if used + delta > limit {
            return Err(AppError::validation(format!(
                "{}: storage quota exceeded (used {} of {} bytes, incoming delta {})",
                context, used, limit, delta
            )));
        }
        Ok(())
    }

    /// Size of a prior share at the same backend key, if any
    pub fn old_bytes_for_key(
        &self,
        storage_config_id: &str,
        storage_path: &str,
    ) -> AppResult<Option<i64>> {
        Ok(self
            .shares
            .find_by_storage_key(storage_config_id, storage_path)?
            .map(|share| share.size)
            .filter(|size| *size >= 0))
    }

    /// Admin usage report across all configs
    pub fn usage_report(&self) -> AppResult<Vec<ConfigUsageReport>> {
        let mut report = Vec::new();
        for config in self.configs.list()? {
            let snapshot = self.metrics.computed_usage(&config.id)?;
            let computed_usage = snapshot.as_ref().map(Self::computed_usage);
            let limit_status = match (config.total_storage_bytes, &computed_usage) {
                (Some(limit), Some(usage)) if limit > 0 => Some(LimitStatus {
                    remaining_bytes: limit - usage.used_bytes,
                    percent_used: usage.used_bytes as f64 / limit as f64 * 100.0,
                    exceeded: usage.used_bytes > limit,
                }),
                _ => None,
            };
            report.push(ConfigUsageReport {
                storage_config_id: config.id.clone(),
                name: config.name.clone(),
                storage_type: config.storage_type.clone(),
                configured_limit_bytes: config.total_storage_bytes,
                enable_disk_usage: config.config_bool("enable_disk_usage"),
                computed_usage,
                limit_status,
            });
        }
        Ok(report)
    }

    fn computed_usage(entry: &MetricsCacheEntry) -> ComputedUsage {
        ComputedUsage {
            used_bytes: entry.value_num.unwrap_or(0),
            source: entry.value_text.clone().unwrap_or_default(),
            snapshot_at: entry.snapshot_at_ms,
            details: entry
                .value_json_text
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
        }
    }
}
