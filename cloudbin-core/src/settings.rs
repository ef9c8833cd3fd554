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

//! System settings KV and the scheduler tick witness

use serde::{Deserialize, Serialize};

/// Key of the single-row scheduler tick witness inside `system_settings`
pub const SCHEDULER_TICK_STATE_KEY: &str = "scheduler_tick_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

/// Last observed platform-trigger invocation
///
/// `last_ms` is the wall-clock of the last real tick; `last_cron` the cron
/// expression active at that time. Both feed the next-invocation estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerTickState {
    #[serde(rename = "lastMs")]
    pub last_ms: i64,
    #[serde(rename = "lastCron")]
    pub last_cron: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_state_wire_names() {
        let state = SchedulerTickState {
            last_ms: 1735689600000,
            last_cron: Some("*/5 * * * *".to_string()),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["lastMs"], 1735689600000i64);
        assert_eq!(json["lastCron"], "*/5 * * * *");

        let back: SchedulerTickState =
            serde_json::from_str(r#"{"lastMs":1,"lastCron":null}"#).unwrap();
        assert_eq!(back.last_ms, 1);
        assert!(back.last_cron.is_none());
    }
}
