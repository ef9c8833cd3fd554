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

//! File-share and paste repositories

use std::sync::Arc;

use cloudbin_core::{AppError, AppResult, FileShare, PasteRecord};

use crate::db::{Database, Row, SqlStatement, SqlValue};

use super::{row_bool, row_i64, row_str, row_string};

fn opt_text(value: &Option<String>) -> SqlValue {
    value
        .clone()
        .map(SqlValue::Text)
        .unwrap_or(SqlValue::Null)
}

fn opt_int(value: Option<i64>) -> SqlValue {
    value.map(SqlValue::Integer).unwrap_or(SqlValue::Null)
}

pub struct FileShareRepo {
    db: Arc<dyn Database>,
}

impl FileShareRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> FileShare {
        FileShare {
            id: row_string(row, "id"),
            slug: row_string(row, "slug"),
            filename: row_string(row, "filename"),
            storage_config_id: row_string(row, "storage_config_id"),
            storage_path: row_string(row, "storage_path"),
            file_path: row_str(row, "file_path"),
            size: row_i64(row, "size").unwrap_or(0),
            mimetype: row_str(row, "mimetype"),
            etag: row_str(row, "etag"),
            use_proxy: row_bool(row, "use_proxy"),
            remark: row_str(row, "remark"),
            password: row_str(row, "password"),
            expires_at: row_str(row, "expires_at"),
            max_views: row_i64(row, "max_views"),
            views: row_i64(row, "views").unwrap_or(0),
            created_by: row_string(row, "created_by"),
            created_at: row_string(row, "created_at"),
            updated_at: row_string(row, "updated_at"),
        }
    }

    fn bind(share: &FileShare) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(share.id.clone()),
            SqlValue::Text(share.slug.clone()),
            SqlValue::Text(share.filename.clone()),
            SqlValue::Text(share.storage_config_id.clone()),
            SqlValue::Text(share.storage_path.clone()),
            opt_text(&share.file_path),
            SqlValue::Integer(share.size),
            opt_text(&share.mimetype),
            opt_text(&share.etag),
            SqlValue::Integer(i64::from(share.use_proxy)),
            opt_text(&share.remark),
            opt_text(&share.password),
            opt_text(&share.expires_at),
            opt_int(share.max_views),
            SqlValue::Integer(share.views),
            SqlValue::Text(share.created_by.clone()),
            SqlValue::Text(share.created_at.clone()),
            SqlValue::Text(share.updated_at.clone()),
        ]
    }

    pub fn insert(&self, share: &FileShare) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO files \
             (id, slug, filename, storage_config_id, storage_path, file_path, size, mimetype, \
              etag, use_proxy, remark, password, expires_at, max_views, views, created_by, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            Self::bind(share),
        ))?;
        Ok(())
    }

    /// Replace an existing record under the same slug, keeping its id
    pub fn replace_by_slug(&self, share: &FileShare) -> AppResult<()> {
        let mut params = Self::bind(share);
        params.remove(0); // id is immutable on replace
        let changes = self.db.execute(&SqlStatement::new(
            "UPDATE files SET filename = ?2, storage_config_id = ?3, storage_path = ?4, \
             file_path = ?5, size = ?6, mimetype = ?7, etag = ?8, use_proxy = ?9, remark = ?10, \
             password = ?11, expires_at = ?12, max_views = ?13, views = ?14, created_by = ?15, \
             created_at = ?16, updated_at = ?17 WHERE slug = ?1",
            params,
        ))?;
        if changes == 0 {
            return Err(AppError::not_found(format!(
                "file share not found: {}",
                share.slug
            )));
        }
        Ok(())
    }

    pub fn find_by_slug(&self, slug: &str) -> AppResult<Option<FileShare>> {
        let rows = self.db.query(
            "SELECT * FROM files WHERE slug = ?1",
            &[SqlValue::Text(slug.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    /// Prior share at the same backend key; drives same-key overwrite
    /// accounting in the quota guard
    pub fn find_by_storage_key(
        &self,
        storage_config_id: &str,
        storage_path: &str,
    ) -> AppResult<Option<FileShare>> {
        let rows = self.db.query(
            "SELECT * FROM files WHERE storage_config_id = ?1 AND storage_path = ?2",
            &[
                SqlValue::Text(storage_config_id.to_string()),
                SqlValue::Text(storage_path.to_string()),
            ],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    pub fn increment_views(&self, slug: &str) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "UPDATE files SET views = views + 1 WHERE slug = ?1",
            vec![SqlValue::Text(slug.to_string())],
        ))?;
        Ok(())
    }

    /// Recoverable password sidecar; the value arrives already encrypted
    pub fn set_password_ciphertext(&self, file_id: &str, ciphertext: &str) -> AppResult<()> {
        let now = cloudbin_core::now_iso();
        self.db.execute(&SqlStatement::new(
            "INSERT INTO file_passwords (file_id, password_ciphertext, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3) \
             ON CONFLICT(file_id) DO UPDATE SET password_ciphertext = excluded.password_ciphertext, \
             updated_at = excluded.updated_at",
            vec![
                SqlValue::Text(file_id.to_string()),
                SqlValue::Text(ciphertext.to_string()),
                SqlValue::Text(now),
            ],
        ))?;
        Ok(())
    }

    pub fn password_ciphertext(&self, file_id: &str) -> AppResult<Option<String>> {
        let rows = self.db.query(
            "SELECT password_ciphertext FROM file_passwords WHERE file_id = ?1",
            &[SqlValue::Text(file_id.to_string())],
        )?;
        Ok(rows.first().and_then(|r| row_str(r, "password_ciphertext")))
    }
}

pub struct PasteRepo {
    db: Arc<dyn Database>,
}

impl PasteRepo {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    fn from_row(row: &Row) -> PasteRecord {
        PasteRecord {
            id: row_string(row, "id"),
            slug: row_string(row, "slug"),
            content: row_string(row, "content"),
            remark: row_str(row, "remark"),
            password: row_str(row, "password"),
            expires_at: row_str(row, "expires_at"),
            max_views: row_i64(row, "max_views"),
            views: row_i64(row, "views").unwrap_or(0),
            created_by: row_string(row, "created_by"),
            created_at: row_string(row, "created_at"),
            updated_at: row_string(row, "updated_at"),
        }
    }

    pub fn insert(&self, paste: &PasteRecord) -> AppResult<()> {
        self.db.execute(&SqlStatement::new(
            "INSERT INTO pastes \
             (id, slug, content, remark, password, expires_at, max_views, views, created_by, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            vec![
                SqlValue::Text(paste.id.clone()),
                SqlValue::Text(paste.slug.clone()),
                SqlValue::Text(paste.content.clone()),
                opt_text(&paste.remark),
                opt_text(&paste.password),
                opt_text(&paste.expires_at),
                opt_int(paste.max_views),
                SqlValue::Integer(paste.views),
                SqlValue::Text(paste.created_by.clone()),
                SqlValue::Text(paste.created_at.clone()),
                SqlValue::Text(paste.updated_at.clone()),
            ],
        ))?;
        Ok(())
    }

    pub fn find_by_slug(&self, slug: &str) -> AppResult<Option<PasteRecord>> {
        let rows = self.db.query(
            "SELECT * FROM pastes WHERE slug = ?1",
            &[SqlValue::Text(slug.to_string())],
        )?;
        Ok(rows.first().map(Self::from_row))
    }

    pub fn set_password_ciphertext(&self, paste_id: &str, ciphertext: &str) -> AppResult<()> {
        let now = cloudbin_core::now_iso();
        self.db.execute(&SqlStatement::new(
            "INSERT INTO paste_passwords (paste_id, password_ciphertext, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3) \
             ON CONFLICT(paste_id) DO UPDATE SET password_ciphertext = excluded.password_ciphertext, \
             updated_at = excluded.updated_at",
            vec![
                SqlValue::Text(paste_id.to_string()),
                SqlValue::Text(ciphertext.to_string()),
                SqlValue::Text(now),
            ],
        ))?;
        Ok(())
    }

    pub fn password_ciphertext(&self, paste_id: &str) -> AppResult<Option<String>> {
        let rows = self.db.query(
            "SELECT password_ciphertext FROM paste_passwords WHERE paste_id = ?1",
            &[SqlValue::Text(paste_id.to_string())],
        )?;
        Ok(rows.first().and_then(|r| row_str(r, "password_ciphertext")))
    }
}
