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

//! Cloudbin Core
//!
//! Fundamental data structures and types shared by the storage, driver and
//! server crates: the entity model, the error taxonomy, the process-wide
//! secret cipher and the schema-field metadata that drives storage-config
//! validation.

pub mod crypto;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod schema;
pub mod settings;
pub mod share;
pub mod storage_config;
pub mod time;

pub use crypto::{is_masked, mask_secret, SecretCipher, ENCRYPTED_PREFIX};
pub use error::{AppError, AppResult, ErrorKind};
pub use identity::{Admin, AdminToken, ApiKey};
pub use metrics::{MetricsCacheEntry, COMPUTED_USAGE_KEY, METRICS_SCOPE_STORAGE_CONFIG};
pub use schema::{
    ConfigField, ConfigSchema, FieldKind, FieldPredicate, FieldRule, LayoutField, LayoutGroup,
};
pub use settings::{SchedulerTickState, SystemSetting, SCHEDULER_TICK_STATE_KEY};
pub use share::{FileShare, PasteRecord, StorageMount};
pub use storage_config::{StorageConfig, DEFAULT_TOTAL_STORAGE_BYTES};
pub use time::{now_iso, now_ms};
