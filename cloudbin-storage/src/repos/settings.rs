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

//! System-settings KV repository

use std::sync::Arc;

use cloudbin_core::{now_iso, AppResult};

use crate::db::{Database, SqlStatement, SqlValue};

use super::row_str;

pub struct SettingsRepo {
    db: Arc<dyn Database>,
}

impl SettingsRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        let rows = self.db.query(
            "SELECT value FROM system_settings WHERE key = ?1",
            &[SqlValue::Text(key.to_string())],
        )?;
        Ok(rows.first().and_then(|r| row_str(r, "value")))
    }

    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO system_settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            vec![
                SqlValue::Text(key.to_string()),
                SqlValue::Text(value.to_string()),
                SqlValue::Text(now_iso()),
            ],
        ))?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "DELETE FROM system_settings WHERE key = ?1",
            vec![SqlValue::Text(key.to_string())],
        ))?;
        Ok(())
    }
}
