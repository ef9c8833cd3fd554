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

//! Typed system settings
//!
//! Thin typed layer over the `system_settings` KV. Upload limits and slug
//! policy read through here so the defaults live in exactly one place.

use std::sync::Arc;

use cloudbin_core::AppResult;
use cloudbin_storage::{Database, SettingsRepo};

/// Default upload ceiling: 100 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE_BYTES: i64 = 100 * 1024 * 1024;

pub const SETTING_MAX_UPLOAD_SIZE: &str = "max_upload_size";
pub const SETTING_USE_RANDOM_SUFFIX: &str = "use_random_suffix";
pub const SETTING_SITE_TITLE: &str = "site_title";

pub struct SettingsService {
    repo: SettingsRepo,
}

impl SettingsService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            repo: SettingsRepo::new(db),
        }
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.repo.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.repo.set(key, value)
    }

    /// System-wide upload ceiling in bytes
    pub fn max_upload_size(&self) -> AppResult<i64> {
        Ok(self
            .repo
            .get(SETTING_MAX_UPLOAD_SIZE)?
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_BYTES))
    }

    /// Whether new slugs carry a random suffix (collision-proof) or stay
    /// literal (overwritable with `update_if_exists`)
    pub fn use_random_suffix(&self) -> AppResult<bool> {
        Ok(self
            .repo
            .get(SETTING_USE_RANDOM_SUFFIX)?
            .map(|v| v != "0" && v != "false")
            .unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbin_storage::{run_migrations, SqliteDatabase};

    fn service() -> SettingsService {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        SettingsService::new(Arc::new(db))
    }

    #[test]
    fn test_max_upload_size_default_and_override() {
        let settings = service();
        assert_eq!(
            settings.max_upload_size().unwrap(),
            DEFAULT_MAX_UPLOAD_SIZE_BYTES
        );
        settings.set(SETTING_MAX_UPLOAD_SIZE, "1048576").unwrap();
        assert_eq!(settings.max_upload_size().unwrap(), 1048576);
        // Garbage falls back to the default
        settings.set(SETTING_MAX_UPLOAD_SIZE, "-5").unwrap();
        assert_eq!(
            settings.max_upload_size().unwrap(),
            DEFAULT_MAX_UPLOAD_SIZE_BYTES
        );
    }

    #[test]
    fn test_random_suffix_default_on() {
        let settings = service();
        assert!(settings.use_random_suffix().unwrap());
        settings.set(SETTING_USE_RANDOM_SUFFIX, "0").unwrap();
        assert!(!settings.use_random_suffix().unwrap());
    }
}
