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

//! Storage-mount repository

use std::sync::Arc;

use cloudbin_core::{AppResult, StorageMount};

use crate::db::{Database, Row, SqlStatement, SqlValue};

use super::{row_bool, row_str, row_string};

pub struct MountRepo {
    db: Arc<dyn Database>,
}

impl MountRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> StorageMount {
        StorageMount {
            id: row_string(row, "id"),
            name: row_string(row, "name"),
            storage_config_id: row_string(row, "storage_config_id"),
            mount_path: row_string(row, "mount_path"),
            enabled: row_bool(row, "enabled"),
            remark: row_str(row, "remark"),
            created_by: row_string(row, "created_by"),
            created_at: row_string(row, "created_at"),
            updated_at: row_string(row, "updated_at"),
        }
    }

    pub fn insert(&self, mount: &StorageMount) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO storage_mounts \
             (id, name, storage_config_id, mount_path, enabled, remark, created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            vec![
                SqlValue::Text(mount.id.clone()),
                SqlValue::Text(mount.name.clone()),
                SqlValue::Text(mount.storage_config_id.clone()),
                SqlValue::Text(mount.mount_path.clone()),
                SqlValue::Integer(i64::from(mount.enabled)),
                mount
                    .remark
                    .clone()
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                SqlValue::Text(mount.created_by.clone()),
                SqlValue::Text(mount.created_at.clone()),
                SqlValue::Text(mount.updated_at.clone()),
            ],
        ))?;
        Ok(())
    }

    pub fn list_by_config(&self, storage_config_id: &str) -> AppResult<Vec<StorageMount>> {
        let rows = self.db.query(
            "SELECT * FROM storage_mounts WHERE storage_config_id = ?1 ORDER BY mount_path",
            &[SqlValue::Text(storage_config_id.to_string())],
        )?;
        Ok(rows.iter().map(Self::from_row).collect())
    }

    pub fn get(&self, id: &str) -> AppResult<Option<StorageMount>> {
        let rows = self.db.query(
            "SELECT * FROM storage_mounts WHERE id = ?1",
            &[SqlValue::Text(id.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }
}
