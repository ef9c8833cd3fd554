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

//! Scheduler tick ledger
//!
//! One row in `system_settings` records when the platform trigger last
//! actually fired and under which cron. Combined with the active cron it
//! yields the next-invocation estimate the admin UI shows. Ledger writes
//! are best-effort: scheduling must never break because bookkeeping did.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use cron::Schedule;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use cloudbin_core::{AppError, AppResult, SchedulerTickState, SCHEDULER_TICK_STATE_KEY};
use cloudbin_storage::{Database, SettingsRepo};

/// Next-invocation estimate
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTickEstimate {
    /// Next cron fire after now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    /// Seconds between two consecutive fires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<i64>,
    /// Last real tick plus one interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_at: Option<String>,
    /// What the UI shows: the estimate when available, else the schedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_parse_error: Option<String>,
}

pub struct SchedulerService {
    settings: SettingsRepo,
}

impl SchedulerService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            settings: SettingsRepo::new(db),
        }
    }

    /// Record a real trigger invocation
    ///
    /// Rejects a non-positive timestamp; a failed write is logged and
    /// swallowed so the tick itself still completes.
    pub fn upsert_tick(&self, last_ms: i64, last_cron: Option<&str>) -> AppResult<()> {
        if last_ms <= 0 {
            return Err(AppError::validation("tick timestamp must be positive"));
        }
        let state = SchedulerTickState {
            last_ms,
            last_cron: last_cron.map(str::to_string),
        };
        let json = serde_json::to_string(&state)
            .map_err(|e| AppError::repository_with("tick state serialization failed", e))?;
        if let Err(e) = self.settings.set(SCHEDULER_TICK_STATE_KEY, &json) {
            warn!(error = %e, "failed to persist scheduler tick state");
        }
        Ok(())
    }

    pub fn load_tick(&self) -> AppResult<Option<SchedulerTickState>> {
        Ok(self
            .settings
            .get(SCHEDULER_TICK_STATE_KEY)?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    /// Estimate the next invocation from the active cron and the ledger
    pub fn compute_next_tick(
        active_cron: &str,
        now_iso: &str,
        last_tick_ms: Option<i64>,
    ) -> NextTickEstimate {
        let now = match DateTime::parse_from_rfc3339(now_iso) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                return NextTickEstimate {
                    cron_parse_error: Some(format!("invalid now timestamp: {}", e)),
                    ..NextTickEstimate::default()
                }
            }
        };

        let schedule = match Schedule::from_str(&with_seconds_field(active_cron)) {
            Ok(schedule) => schedule,
            Err(e) => {
                return NextTickEstimate {
                    cron_parse_error: Some(format!("invalid cron {}: {}", active_cron, e)),
                    ..NextTickEstimate::default()
                }
            }
        };

        let mut fires = schedule.after(&now);
        let (first, second) = match (fires.next(), fires.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => {
                return NextTickEstimate {
                    cron_parse_error: Some(format!("cron {} never fires again", active_cron)),
                    ..NextTickEstimate::default()
                }
            }
        };

        let scheduled_at = Some(iso(first));
        let interval_sec = Some((second - first).num_seconds());

        let estimated_at = last_tick_ms.and_then(|last_ms| {
            let interval = interval_sec?;
            Utc.timestamp_millis_opt(last_ms + interval * 1000)
                .single()
                .map(iso)
        });

        let at = estimated_at.clone().or_else(|| scheduled_at.clone());
        NextTickEstimate {
            scheduled_at,
            interval_sec,
            estimated_at,
            at,
            cron_parse_error: None,
        }
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The cron parser wants a seconds field; standard five-field expressions
/// get a literal zero prepended.
fn with_seconds_field(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbin_storage::{run_migrations, SqliteDatabase};

    fn service() -> SchedulerService {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        SchedulerService::new(Arc::new(db))
    }

    #[test]
    fn test_upsert_and_load() {
        let scheduler = service();
        assert!(scheduler.load_tick().unwrap().is_none());
        scheduler
            .upsert_tick(1735689600000, Some("*/5 * * * *"))
            .unwrap();
        let state = scheduler.load_tick().unwrap().unwrap();
        assert_eq!(state.last_ms, 1735689600000);
        assert_eq!(state.last_cron.as_deref(), Some("*/5 * * * *"));
    }

    #[test]
    fn test_non_positive_tick_rejected() {
        let scheduler = service();
        assert!(scheduler.upsert_tick(0, None).is_err());
        assert!(scheduler.upsert_tick(-5, None).is_err());
    }

    #[test]
    fn test_five_minute_cron_estimate() {
        // Last tick at 00:00:00Z, asked at 00:00:10Z
        let estimate = SchedulerService::compute_next_tick(
            "*/5 * * * *",
            "2025-01-01T00:00:10Z",
            Some(1735689600000),
        );
        assert_eq!(estimate.interval_sec, Some(300));
        assert_eq!(estimate.scheduled_at.as_deref(), Some("2025-01-01T00:05:00Z"));
        assert_eq!(estimate.estimated_at.as_deref(), Some("2025-01-01T00:05:00Z"));
        assert_eq!(estimate.at.as_deref(), Some("2025-01-01T00:05:00Z"));
        assert!(estimate.cron_parse_error.is_none());
    }

    #[test]
    fn test_without_last_tick_falls_back_to_schedule() {
        let estimate =
            SchedulerService::compute_next_tick("*/5 * * * *", "2025-01-01T00:00:10Z", None);
        assert!(estimate.estimated_at.is_none());
        assert_eq!(estimate.at, estimate.scheduled_at);
    }

    #[test]
    fn test_bad_cron_reports_instead_of_throwing() {
        let estimate =
            SchedulerService::compute_next_tick("not a cron", "2025-01-01T00:00:10Z", None);
        assert!(estimate.cron_parse_error.is_some());
        assert!(estimate.at.is_none());
    }
}
