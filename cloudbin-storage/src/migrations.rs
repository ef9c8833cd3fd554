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

//! Schema migrations
//!
//! Ordered, idempotent DDL steps recorded as `app-vNN` rows in
//! `schema_migrations`. The largest applied `NN` is the schema version a
//! backup carries in its metadata.

use tracing::info;

use cloudbin_core::{now_iso, AppResult};

use crate::db::{Database, SqlStatement, SqlValue};

struct Migration {
    id: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "app-v01",
        statements: &[
            "CREATE TABLE IF NOT EXISTS admins (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS admin_tokens (
                token TEXT PRIMARY KEY,
                admin_id TEXT NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS api_keys (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                key TEXT NOT NULL UNIQUE,
                text_permission INTEGER NOT NULL DEFAULT 0,
                file_permission INTEGER NOT NULL DEFAULT 0,
                mount_permission INTEGER NOT NULL DEFAULT 0,
                basic_path TEXT,
                expires_at TEXT,
                last_used TEXT,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS system_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        ],
    },
    Migration {
        id: "app-v02",
        statements: &[
            "CREATE TABLE IF NOT EXISTS storage_configs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                storage_type TEXT NOT NULL,
                admin_id TEXT NOT NULL REFERENCES admins(id),
                is_public INTEGER NOT NULL DEFAULT 0,
                is_default INTEGER NOT NULL DEFAULT 0,
                remark TEXT,
                url_proxy TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                config_json TEXT NOT NULL DEFAULT '{}',
                total_storage_bytes INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_used_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS storage_mounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                storage_config_id TEXT NOT NULL REFERENCES storage_configs(id) ON DELETE CASCADE,
                mount_path TEXT NOT NULL UNIQUE,
                enabled INTEGER NOT NULL DEFAULT 1,
                remark TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS principal_storage_acl (
                principal TEXT NOT NULL,
                storage_config_id TEXT NOT NULL REFERENCES storage_configs(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                PRIMARY KEY (principal, storage_config_id)
            )",
        ],
    },
    Migration {
        id: "app-v03",
        statements: &[
            "CREATE TABLE IF NOT EXISTS pastes (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                remark TEXT,
                password TEXT,
                expires_at TEXT,
                max_views INTEGER,
                views INTEGER NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS paste_passwords (
                paste_id TEXT PRIMARY KEY REFERENCES pastes(id) ON DELETE CASCADE,
                password_ciphertext TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                storage_config_id TEXT,
                storage_path TEXT,
                file_path TEXT,
                size INTEGER NOT NULL DEFAULT 0,
                mimetype TEXT,
                etag TEXT,
                use_proxy INTEGER NOT NULL DEFAULT 0,
                remark TEXT,
                password TEXT,
                expires_at TEXT,
                max_views INTEGER,
                views INTEGER NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS file_passwords (
                file_id TEXT PRIMARY KEY REFERENCES files(id) ON DELETE CASCADE,
                password_ciphertext TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        ],
    },
    Migration {
        id: "app-v04",
        statements: &[
            "CREATE TABLE IF NOT EXISTS fs_meta (
                path TEXT PRIMARY KEY,
                meta_json TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                status TEXT NOT NULL,
                user_type TEXT,
                user_id TEXT,
                payload_json TEXT,
                result_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS scheduled_jobs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                cron TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                payload_json TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS scheduled_job_runs (
                id TEXT PRIMARY KEY,
                job_id TEXT NOT NULL REFERENCES scheduled_jobs(id) ON DELETE CASCADE,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                status TEXT NOT NULL,
                detail TEXT
            )",
            "CREATE TABLE IF NOT EXISTS upload_sessions (
                id TEXT PRIMARY KEY,
                storage_config_id TEXT REFERENCES storage_configs(id),
                storage_mount_id TEXT REFERENCES storage_mounts(id),
                upload_id TEXT,
                storage_path TEXT,
                status TEXT NOT NULL DEFAULT 'open',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        ],
    },
    Migration {
        id: "app-v05",
        statements: &[
            "CREATE TABLE IF NOT EXISTS metrics_cache (
                scope TEXT NOT NULL,
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value_num INTEGER,
                value_text TEXT,
                value_json_text TEXT,
                snapshot_at_ms INTEGER NOT NULL,
                PRIMARY KEY (scope, scope_id, key)
            )",
            "CREATE TABLE IF NOT EXISTS fs_search_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mount_id TEXT NOT NULL,
                path TEXT NOT NULL,
                name TEXT NOT NULL,
                size INTEGER NOT NULL DEFAULT 0,
                mtime TEXT,
                is_dir INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS fs_search_state (
                mount_id TEXT PRIMARY KEY,
                ready INTEGER NOT NULL DEFAULT 0,
                last_built_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS fs_search_dirty (
                mount_id TEXT PRIMARY KEY,
                marked_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS fs_search_fts (
                entry_id INTEGER NOT NULL,
                term TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_fs_search_fts_term ON fs_search_fts(term)",
        ],
    },
];

/// Apply every pending migration in order
pub fn run_migrations(db: &dyn Database) -> AppResult<()> {
    db.execute(&SqlStatement::bare(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    ))?;

    let applied: Vec<String> = db
        .query("SELECT id FROM schema_migrations", &[])?
        .into_iter()
        .filter_map(|row| {
            row.get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .collect();

    for migration in MIGRATIONS {
        if applied.iter().any(|id| id == migration.id) {
            continue;
        }
        for sql in migration.statements {
            db.execute(&SqlStatement::bare(*sql))?;
        }
        db.execute(&SqlStatement::new(
            "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
            vec![
                SqlValue::Text(migration.id.to_string()),
                SqlValue::Text(now_iso()),
            ],
        ))?;
        info!(migration = migration.id, "applied schema migration");
    }
    Ok(())
}

/// Largest applied migration number, e.g. `"5"` for `app-v05`
pub fn schema_version(db: &dyn Database) -> Option<String> {
    let rows = db.query("SELECT id FROM schema_migrations", &[]).ok()?;
    rows.iter()
        .filter_map(|row| row.get("id").and_then(serde_json::Value::as_str))
        .filter_map(|id| id.strip_prefix("app-v"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteDatabase;
    use crate::tables::{all_backup_tables, FS_SEARCH_INDEX_TABLES};

    #[test]
    fn test_migrations_create_every_registered_table() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        for table in all_backup_tables() {
            assert!(db.table_exists(&table).unwrap(), "missing table {}", table);
        }
        for table in FS_SEARCH_INDEX_TABLES {
            assert!(db.table_exists(table).unwrap(), "missing table {}", table);
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        run_migrations(&db).unwrap();
        let rows = db
            .query("SELECT id FROM schema_migrations", &[])
            .unwrap();
        assert_eq!(rows.len(), MIGRATIONS.len());
    }

    #[test]
    fn test_schema_version_is_max_applied() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        assert_eq!(schema_version(&db), None);
        run_migrations(&db).unwrap();
        assert_eq!(schema_version(&db).unwrap(), "5");
    }
}
