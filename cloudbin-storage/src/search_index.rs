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

//! FS search-index coordinator
//!
//! The search index is derived data. Any event that changes its fidelity -
//! a driver-config change, a config deletion, a restore - clears the
//! affected tables here. Rebuilding is the indexer's job, not ours.

use tracing::debug;

use cloudbin_core::{now_iso, AppResult};

use crate::db::{Database, SqlStatement, SqlValue};
use crate::tables::FS_SEARCH_INDEX_TABLES;

/// Clears derived index state for configs and whole databases
pub struct SearchIndexCoordinator<'a> {
    db: &'a dyn Database,
}

impl<'a> SearchIndexCoordinator<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Truncate every index table; used after a restore
    pub fn clear_all(&self) -> AppResult<()> {
        for table in FS_SEARCH_INDEX_TABLES {
            self.db
                .execute(&SqlStatement::bare(format!("DELETE FROM {}", table)))?;
        }
        debug!("cleared all fs search index tables");
        Ok(())
    }

    /// Clear index rows for every mount bound to a storage config
    ///
    /// With `keep_state` the per-mount state row survives but is marked
    /// not-ready (a config edit invalidates content, not the mount); a
    /// delete drops the state row too.
    pub fn clear_for_config(&self, storage_config_id: &str, keep_state: bool) -> AppResult<()> {
        let mounts = self.db.query(
            "SELECT id FROM storage_mounts WHERE storage_config_id = ?1",
            &[SqlValue::Text(storage_config_id.to_string())],
        )?;

        for mount in mounts {
            let Some(mount_id) = mount.get("id").and_then(serde_json::Value::as_str) else {
                continue;
            };
            self.clear_for_mount(mount_id, keep_state)?;
        }
        Ok(())
    }

    fn clear_for_mount(&self, mount_id: &str, keep_state: bool) -> AppResult<()> {
        let id = SqlValue::Text(mount_id.to_string());
        self.db.execute(&SqlStatement::new(
            "DELETE FROM fs_search_fts WHERE entry_id IN \
             (SELECT id FROM fs_search_entries WHERE mount_id = ?1)",
            vec![id.clone()],
        ))?;
        self.db.execute(&SqlStatement::new(
            "DELETE FROM fs_search_entries WHERE mount_id = ?1",
            vec![id.clone()],
        ))?;
        self.db.execute(&SqlStatement::new(
            "DELETE FROM fs_search_dirty WHERE mount_id = ?1",
            vec![id.clone()],
        ))?;

        if keep_state {
            self.db.execute(&SqlStatement::new(
                "UPDATE fs_search_state SET ready = 0, last_built_at = ?2 WHERE mount_id = ?1",
                vec![id, SqlValue::Text(now_iso())],
            ))?;
        } else {
            self.db.execute(&SqlStatement::new(
                "DELETE FROM fs_search_state WHERE mount_id = ?1",
                vec![id],
            ))?;
        }
        debug!(mount_id, keep_state, "cleared fs search index for mount");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteDatabase;
    use crate::migrations::run_migrations;

    fn seeded_db() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        let now = now_iso();
        db.execute(&SqlStatement::new(
            "INSERT INTO admins (id, username, password, created_at, updated_at) \
             VALUES ('a1', 'root', 'x', ?1, ?1)",
            vec![SqlValue::Text(now.clone())],
        ))
        .unwrap();
        db.execute(&SqlStatement::new(
            "INSERT INTO storage_configs (id, name, storage_type, admin_id, created_at, updated_at) \
             VALUES ('cfg1', 'primary', 'local', 'a1', ?1, ?1)",
            vec![SqlValue::Text(now.clone())],
        ))
        .unwrap();
        db.execute(&SqlStatement::new(
            "INSERT INTO storage_mounts (id, name, storage_config_id, mount_path, created_by, created_at, updated_at) \
             VALUES ('m1', 'media', 'cfg1', '/media', 'a1', ?1, ?1)",
            vec![SqlValue::Text(now.clone())],
        ))
        .unwrap();
        db.execute(&SqlStatement::bare(
            "INSERT INTO fs_search_entries (mount_id, path, name) VALUES ('m1', '/media/a.txt', 'a.txt')",
        ))
        .unwrap();
        db.execute(&SqlStatement::bare(
            "INSERT INTO fs_search_state (mount_id, ready) VALUES ('m1', 1)",
        ))
        .unwrap();
        db
    }

    fn count(db: &SqliteDatabase, sql: &str) -> usize {
        db.query(sql, &[]).unwrap().len()
    }

    #[test]
    fn test_clear_for_config_keep_state_marks_not_ready() {
        let db = seeded_db();
        SearchIndexCoordinator::new(&db)
            .clear_for_config("cfg1", true)
            .unwrap();
        assert_eq!(count(&db, "SELECT * FROM fs_search_entries"), 0);
        let state = db.query("SELECT * FROM fs_search_state", &[]).unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0]["ready"], 0);
    }

    #[test]
    fn test_clear_for_config_drop_state() {
        let db = seeded_db();
        SearchIndexCoordinator::new(&db)
            .clear_for_config("cfg1", false)
            .unwrap();
        assert_eq!(count(&db, "SELECT * FROM fs_search_state"), 0);
    }

    #[test]
    fn test_clear_all_truncates_every_table() {
        let db = seeded_db();
        SearchIndexCoordinator::new(&db).clear_all().unwrap();
        for table in FS_SEARCH_INDEX_TABLES {
            assert_eq!(count(&db, &format!("SELECT * FROM {}", table)), 0);
        }
    }
}
