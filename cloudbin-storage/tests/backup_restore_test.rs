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

// End-to-end backup/restore across a populated database: create a full
// backup, replay it into a fresh database, and verify the second export is
// bit-identical.

use cloudbin_core::now_iso;
use cloudbin_storage::{
    BackupEngine, BackupOptions, BackupType, CancelToken, Database, RestoreMode, RestoreOptions,
    SqlStatement, SqlValue, SqliteDatabase, run_migrations,
};

fn populated_db() -> SqliteDatabase {
    let db = SqliteDatabase::open_in_memory().unwrap();
    run_migrations(&db).unwrap();
    let now = now_iso();
    let t = |s: &str| SqlValue::Text(s.to_string());

    db.execute(&SqlStatement::new(
        "INSERT INTO admins (id, username, password, created_at, updated_at) \
         VALUES ('a1', 'root', 'hash', ?1, ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO admin_tokens (token, admin_id, expires_at, created_at) \
         VALUES ('tok1', 'a1', '2099-01-01T00:00:00.000Z', ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO api_keys (id, name, key, text_permission, file_permission, mount_permission, created_at) \
         VALUES ('k1', 'ci', 'sk_abc', 1, 1, 0, ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO storage_configs (id, name, storage_type, admin_id, is_public, config_json, created_at, updated_at) \
         VALUES ('cfg1', 'primary', 's3', 'a1', 1, '{\"bucket_name\":\"b\"}', ?1, ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO storage_mounts (id, name, storage_config_id, mount_path, created_by, created_at, updated_at) \
         VALUES ('m1', 'media', 'cfg1', '/media', 'a1', ?1, ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO principal_storage_acl (principal, storage_config_id, created_at) \
         VALUES ('apikey:k1', 'cfg1', ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    for i in 0..25 {
        db.execute(&SqlStatement::new(
            "INSERT INTO pastes (id, slug, content, created_by, created_at, updated_at) \
             VALUES (?1, ?2, 'body', 'a1', ?3, ?3)",
            vec![
                SqlValue::Text(format!("p{}", i)),
                SqlValue::Text(format!("slug{}", i)),
                t(&now),
            ],
        ))
        .unwrap();
    }
    db.execute(&SqlStatement::new(
        "INSERT INTO files (id, slug, filename, storage_config_id, storage_path, size, created_by, created_at, updated_at) \
         VALUES ('f1', 'file1', 'a.bin', 'cfg1', 'uploads/a.bin', 1024, 'a1', ?1, ?1)",
        vec![t(&now)],
    ))
    .unwrap();
    db.execute(&SqlStatement::new(
        "INSERT INTO tasks (id, type, status, user_type, user_id, created_at, updated_at) \
         VALUES ('t1', 'cleanup', 'done', 'apikey', 'k1', 1735689600000, 1735689600000)",
        vec![],
    ))
    .unwrap();
    db
}

fn full_backup(db: &SqliteDatabase) -> cloudbin_storage::BackupFile {
    BackupEngine::new(db)
        .create_backup(&BackupOptions {
            backup_type: BackupType::Full,
            selected_modules: vec![],
        })
        .unwrap()
}

#[test]
fn backup_restore_backup_is_identity() {
    let source = populated_db();
    let first = full_backup(&source);

    let target = SqliteDatabase::open_in_memory().unwrap();
    run_migrations(&target).unwrap();
    let report = BackupEngine::new(&target)
        .restore_backup(
            &serde_json::to_value(&first).unwrap(),
            &RestoreOptions {
                mode: RestoreMode::Overwrite,
                preserve_timestamps: true,
                ..RestoreOptions::default()
            },
            &CancelToken::new(),
        )
        .unwrap();

    for (table, rows) in &first.data {
        assert_eq!(
            report.results[table].success,
            rows.len() as u64,
            "table {}",
            table
        );
        assert_eq!(report.results[table].failed, 0, "table {}", table);
    }

    let second = full_backup(&target);
    assert_eq!(first.metadata.checksum, second.metadata.checksum);
    assert_eq!(
        serde_json::to_value(&first.data).unwrap(),
        serde_json::to_value(&second.data).unwrap()
    );
}

#[test]
fn restore_is_dependency_safe_under_enforced_fks() {
    // Restore into a fresh database with FK enforcement on: parents must
    // land before children or the per-table counters would show failures.
    let source = populated_db();
    let backup = full_backup(&source);

    let target = SqliteDatabase::open_in_memory().unwrap();
    run_migrations(&target).unwrap();
    let report = BackupEngine::new(&target)
        .restore_backup(
            &serde_json::to_value(&backup).unwrap(),
            &RestoreOptions {
                mode: RestoreMode::Overwrite,
                ..RestoreOptions::default()
            },
            &CancelToken::new(),
        )
        .unwrap();

    let total_failed: u64 = report.results.values().map(|r| r.failed).sum();
    assert_eq!(total_failed, 0);
    assert_eq!(
        target
            .query("SELECT * FROM principal_storage_acl", &[])
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn merge_into_populated_db_ignores_duplicates_and_keeps_new_rows() {
    let source = populated_db();
    let backup = full_backup(&source);

    // Target already has one of the pastes plus its own extra row
    let target = populated_db();
    let now = now_iso();
    target
        .execute(&SqlStatement::new(
            "INSERT INTO pastes (id, slug, content, created_by, created_at, updated_at) \
             VALUES ('local', 'local-slug', 'kept', 'a1', ?1, ?1)",
            vec![SqlValue::Text(now)],
        ))
        .unwrap();

    let report = BackupEngine::new(&target)
        .restore_backup(
            &serde_json::to_value(&backup).unwrap(),
            &RestoreOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

    assert_eq!(report.results["pastes"].ignored, 25);
    assert_eq!(report.results["pastes"].success, 0);
    assert_eq!(
        target.query("SELECT * FROM pastes", &[]).unwrap().len(),
        26
    );
}
