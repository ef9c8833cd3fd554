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

//! Identity repositories: admins, admin tokens, API keys

use std::sync::Arc;

use cloudbin_core::{now_iso, Admin, AdminToken, ApiKey, AppResult};

use crate::db::{Database, Row, SqlStatement, SqlValue};

use super::{row_bool, row_str, row_string};

pub struct AdminRepo {
    db: Arc<dyn Database>,
}

impl AdminRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> Admin {
        Admin {
            id: row_string(row, "id"),
            username: row_string(row, "username"),
            password: row_string(row, "password"),
            created_at: row_string(row, "created_at"),
            updated_at: row_string(row, "updated_at"),
        }
    }

    pub fn insert(&self, admin: &Admin) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO admins (id, username, password, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                SqlValue::Text(admin.id.clone()),
                SqlValue::Text(admin.username.clone()),
                SqlValue::Text(admin.password.clone()),
                SqlValue::Text(admin.created_at.clone()),
                SqlValue::Text(admin.updated_at.clone()),
            ],
        ))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> AppResult<Option<Admin>> {
        let rows = self.db.query(
            "SELECT * FROM admins WHERE id = ?1",
            &[SqlValue::Text(id.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    pub fn find_by_username(&self, username: &str) -> AppResult<Option<Admin>> {
        let rows = self.db.query(
            "SELECT * FROM admins WHERE username = ?1",
            &[SqlValue::Text(username.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }
}

pub struct AdminTokenRepo {
    db: Arc<dyn Database>,
}

impl AdminTokenRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, token: &AdminToken) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO admin_tokens (token, admin_id, expires_at, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            vec![
                SqlValue::Text(token.token.clone()),
                SqlValue::Text(token.admin_id.clone()),
                SqlValue::Text(token.expires_at.clone()),
                SqlValue::Text(token.created_at.clone()),
            ],
        ))?;
        Ok(())
    }

    /// Look up a token that has not expired yet
    pub fn find_valid(&self, token: &str) -> AppResult<Option<AdminToken>> {
        let rows = self.db.query(
            "SELECT * FROM admin_tokens WHERE token = ?1 AND expires_at > ?2",
            &[
                SqlValue::Text(token.to_string()),
                SqlValue::Text(now_iso()),
            ],
        )?;
        Ok(rows.first().map(|row| AdminToken {
            token: row_string(row, "token"),
            admin_id: row_string(row, "admin_id"),
            expires_at: row_string(row, "expires_at"),
            created_at: row_string(row, "created_at"),
        }))
    }

    pub fn delete_expired(&self) -> AppResult<u64> {
        self.db.execute(&SqlStatement::new(
            "DELETE FROM admin_tokens WHERE expires_at <= ?1",
            vec![SqlValue::Text(now_iso())],
        ))
    }
}

pub struct ApiKeyRepo {
    db: Arc<dyn Database>,
}

impl ApiKeyRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> ApiKey {
        ApiKey {
            id: row_string(row, "id"),
            name: row_string(row, "name"),
            key: row_string(row, "key"),
            text_permission: row_bool(row, "text_permission"),
            file_permission: row_bool(row, "file_permission"),
            mount_permission: row_bool(row, "mount_permission"),
            basic_path: row_str(row, "basic_path"),
            expires_at: row_str(row, "expires_at"),
            last_used: row_str(row, "last_used"),
            created_at: row_string(row, "created_at"),
        }
    }

    pub fn insert(&self, key: &ApiKey) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO api_keys \
             (id, name, key, text_permission, file_permission, mount_permission, basic_path, \
              expires_at, last_used, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            vec![
                SqlValue::Text(key.id.clone()),
                SqlValue::Text(key.name.clone()),
                SqlValue::Text(key.key.clone()),
                SqlValue::Integer(i64::from(key.text_permission)),
                SqlValue::Integer(i64::from(key.file_permission)),
                SqlValue::Integer(i64::from(key.mount_permission)),
                key.basic_path
                    .clone()
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                key.expires_at
                    .clone()
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                key.last_used
                    .clone()
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                SqlValue::Text(key.created_at.clone()),
            ],
        ))?;
        Ok(())
    }

    pub fn find_by_key(&self, key: &str) -> AppResult<Option<ApiKey>> {
        let rows = self.db.query(
            "SELECT * FROM api_keys WHERE key = ?1",
            &[SqlValue::Text(key.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    pub fn touch_last_used(&self, id: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "UPDATE api_keys SET last_used = ?2 WHERE id = ?1",
            vec![SqlValue::Text(id.to_string()), SqlValue::Text(now_iso())],
        ))?;
        Ok(())
    }
}
