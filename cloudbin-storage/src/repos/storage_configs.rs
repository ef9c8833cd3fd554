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

//! Storage-config and ACL repositories

use std::sync::Arc;

use serde_json::{Map, Value};

use cloudbin_core::{now_iso, AppError, AppResult, StorageConfig};

use crate::db::{Database, Row, SqlStatement, SqlValue};

use super::{row_bool, row_str, row_string};

pub struct StorageConfigRepo {
    db: Arc<dyn Database>,
}

impl StorageConfigRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> StorageConfig {
        let config_json: Map<String, Value> = row_str(row, "config_json")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        StorageConfig {
            id: row_string(row, "id"),
            name: row_string(row, "name"),
            storage_type: row_string(row, "storage_type"),
            admin_id: row_string(row, "admin_id"),
            is_public: row_bool(row, "is_public"),
            is_default: row_bool(row, "is_default"),
            remark: row_str(row, "remark"),
            url_proxy: row_str(row, "url_proxy"),
            status: row_string(row, "status"),
            config_json,
            total_storage_bytes: super::row_i64(row, "total_storage_bytes"),
            created_at: row_string(row, "created_at"),
            updated_at: row_string(row, "updated_at"),
            last_used_at: row_str(row, "last_used_at"),
        }
    }

    fn bind(config: &StorageConfig) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(config.id.clone()),
            SqlValue::Text(config.name.clone()),
            SqlValue::Text(config.storage_type.clone()),
            SqlValue::Text(config.admin_id.clone()),
            SqlValue::Integer(i64::from(config.is_public)),
            SqlValue::Integer(i64::from(config.is_default)),
            config
                .remark
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
            config
                .url_proxy
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
            SqlValue::Text(config.status.clone()),
            SqlValue::Text(Value::Object(config.config_json.clone()).to_string()),
            config
                .total_storage_bytes
                .map(SqlValue::Integer)
                .unwrap_or(SqlValue::Null),
            SqlValue::Text(config.created_at.clone()),
            SqlValue::Text(config.updated_at.clone()),
            config
                .last_used_at
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
        ]
    }

    pub fn insert(&self, config: &StorageConfig) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO storage_configs \
             (id, name, storage_type, admin_id, is_public, is_default, remark, url_proxy, \
              status, config_json, total_storage_bytes, created_at, updated_at, last_used_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            Self::bind(config),
        ))?;
        Ok(())
    }

    pub fn update(&self, config: &StorageConfig) -> AppResult<()> {
        let mut params = Self::bind(config);
        // Move the id to the end for the WHERE clause
        let id = params.remove(0);
        params.push(id);
        let changes = self.db.execute(&SqlStatement::new(
            "UPDATE storage_configs SET \
             name = ?1, storage_type = ?2, admin_id = ?3, is_public = ?4, is_default = ?5, \
             remark = ?6, url_proxy = ?7, status = ?8, config_json = ?9, \
             total_storage_bytes = ?10, created_at = ?11, updated_at = ?12, last_used_at = ?13 \
             WHERE id = ?14",
            params,
        ))?;
        if changes == 0 {
            return Err(AppError::not_found(format!(
                "storage config not found: {}",
                config.id
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> AppResult<Option<StorageConfig>> {
        let rows = self.db.query(
            "SELECT * FROM storage_configs WHERE id = ?1",
            &[SqlValue::Text(id.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    pub fn list(&self) -> AppResult<Vec<StorageConfig>> {
        let rows = self
            .db
            .query("SELECT * FROM storage_configs ORDER BY created_at, id", &[])?;
        Ok(rows.iter().map(Self::from_row).collect())
    }

    pub fn list_public(&self) -> AppResult<Vec<StorageConfig>> {
        let rows = self.db.query(
            "SELECT * FROM storage_configs WHERE is_public = 1 ORDER BY created_at, id",
            &[],
        )?;
        Ok(rows.iter().map(Self::from_row).collect())
    }

    pub fn find_default(&self, admin_id: &str) -> AppResult<Option<StorageConfig>> {
        let rows = self.db.query(
            "SELECT * FROM storage_configs WHERE admin_id = ?1 AND is_default = 1",
            &[SqlValue::Text(admin_id.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    /// Clear all sibling defaults and set the target in one transaction
    pub fn set_default(&self, admin_id: &str, id: &str) -> AppResult<()> {
        let changes = self.db.execute_atomic(&[
            SqlStatement::new(
                "UPDATE storage_configs SET is_default = 0, updated_at = ?2 \
                 WHERE admin_id = ?1 AND is_default = 1",
                vec![
                    SqlValue::Text(admin_id.to_string()),
                    SqlValue::Text(now_iso()),
                ],
            ),
            SqlStatement::new(
                "UPDATE storage_configs SET is_default = 1, updated_at = ?3 \
                 WHERE id = ?1 AND admin_id = ?2",
                vec![
                    SqlValue::Text(id.to_string()),
                    SqlValue::Text(admin_id.to_string()),
                    SqlValue::Text(now_iso()),
                ],
            ),
        ])?;
        if changes[1] == 0 {
            return Err(AppError::not_found(format!(
                "storage config not found for admin: {}",
                id
            )));
        }
        Ok(())
    }

    /// Delete the config after cascading dependent mounts and ACL bindings
    pub fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let id_param = SqlValue::Text(id.to_string());
        let changes = self.db.execute_atomic(&[
            SqlStatement::new(
                "DELETE FROM storage_mounts WHERE storage_config_id = ?1",
                vec![id_param.clone()],
            ),
            SqlStatement::new(
                "DELETE FROM principal_storage_acl WHERE storage_config_id = ?1",
                vec![id_param.clone()],
            ),
            SqlStatement::new("DELETE FROM storage_configs WHERE id = ?1", vec![id_param]),
        ])?;
        if changes[2] == 0 {
            return Err(AppError::not_found(format!(
                "storage config not found: {}",
                id
            )));
        }
        Ok(())
    }

    pub fn touch_last_used(&self, id: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "UPDATE storage_configs SET last_used_at = ?2 WHERE id = ?1",
            vec![SqlValue::Text(id.to_string()), SqlValue::Text(now_iso())],
        ))?;
        Ok(())
    }
}

/// Principal -> allowed storage-config bindings
pub struct AclRepo {
    db: Arc<dyn Database>,
}

impl AclRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Allowed config ids for a principal; empty means no restriction rows
    pub fn allowed_config_ids(&self, principal: &str) -> AppResult<Vec<String>> {
        let rows = self.db.query(
            "SELECT storage_config_id FROM principal_storage_acl WHERE principal = ?1",
            &[SqlValue::Text(principal.to_string())],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| row_str(r, "storage_config_id"))
            .collect())
    }

    pub fn grant(&self, principal: &str, storage_config_id: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT OR IGNORE INTO principal_storage_acl \
             (principal, storage_config_id, created_at) VALUES (?1, ?2, ?3)",
            vec![
                SqlValue::Text(principal.to_string()),
                SqlValue::Text(storage_config_id.to_string()),
                SqlValue::Text(now_iso()),
            ],
        ))?;
        Ok(())
    }

    pub fn revoke_all(&self, principal: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "DELETE FROM principal_storage_acl WHERE principal = ?1",
            vec![SqlValue::Text(principal.to_string())],
        ))?;
        Ok(())
    }
}
