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

//! Backup engine
//!
//! Consistent, dependency-ordered export and replay of the relational
//! metadata. A backup is a JSON document `{metadata, data}` whose checksum
//! covers `data` with recursively sorted keys. Restore replays the data in
//! dependency order, in batches of at most [`MAX_STATEMENTS_PER_BATCH`]
//! statements.
//!
//! Batches are not globally atomic. A failure late in the sequence leaves
//! earlier tables written; the per-table counters in [`RestoreReport`]
//! stay correct either way so the operator can diagnose.

pub mod preview;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use cloudbin_core::{now_iso, AppError, AppResult};

use crate::checksum::data_checksum;
use crate::db::{Database, Row, SqlStatement};
use crate::dialect::{build_insert_statements, quote_ident, RestoreMode};
use crate::migrations::schema_version;
use crate::search_index::SearchIndexCoordinator;
use crate::tables::{
    all_backup_tables, expand_modules, is_known_module, is_known_table, module_tables,
    sort_tables_by_dependency,
};

pub use preview::{IssueLevel, PreviewIssue, RestorePreview, TablePlan};

/// Statement ceiling per executed batch
pub const MAX_STATEMENTS_PER_BATCH: usize = 80;

/// Backup file format version; widening any wire shape breaks this
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Modules,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Modules => "modules",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub backup_type: BackupType,
    pub selected_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub version: String,
    pub timestamp: String,
    pub backup_type: String,
    pub schema_version: Option<String>,
    pub selected_modules: Option<Vec<String>>,
    pub included_modules: Option<Vec<String>>,
    pub auto_included_dependencies: Option<Vec<String>>,
    pub tables: BTreeMap<String, usize>,
    pub total_records: usize,
    pub checksum: String,
}

/// A parsed, checksum-verified backup document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    pub metadata: BackupMetadata,
    pub data: BTreeMap<String, Vec<Row>>,
}

impl BackupFile {
    /// The `data` member as a JSON value, for checksum computation
    pub fn data_value(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub mode: RestoreMode,
    /// In merge mode, ownership of restored configs/mounts/shares moves here
    pub current_admin_id: Option<String>,
    pub skip_integrity_check: bool,
    pub preserve_timestamps: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            mode: RestoreMode::Merge,
            current_admin_id: None,
            skip_integrity_check: false,
            preserve_timestamps: false,
        }
    }
}

/// Advisory finding from the referential-integrity scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub table: String,
    pub code: String,
    pub message: String,
}

/// Per-table restore counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableResult {
    pub success: u64,
    pub ignored: u64,
    pub failed: u64,
    pub expected: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored_tables: Vec<String>,
    pub total_records: u64,
    pub results: BTreeMap<String, TableResult>,
    pub integrity_issues: Vec<IntegrityIssue>,
    pub cancelled: bool,
}

/// Cooperative cancellation for long-running restores
///
/// The current batch is allowed to finish; there is no mid-batch rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What one emitted statement is expected to do, for reconciliation
enum StatementPlan {
    /// FK toggles; outcome is not counted
    Control,
    Delete { table: String },
    Insert { table: String, expected: u64 },
}

pub struct BackupEngine<'a> {
    db: &'a dyn Database,
}

impl<'a> BackupEngine<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_backup(&self, options: &BackupOptions) -> AppResult<BackupFile> {
        let (tables, selected, included, auto_included) = match options.backup_type {
            BackupType::Full => (all_backup_tables(), None, None, None),
            BackupType::Modules => {
                if options.selected_modules.is_empty() {
                    return Err(AppError::validation(
                        "module backup requires at least one selected module",
                    ));
                }
                for module in &options.selected_modules {
                    if !is_known_module(module) {
                        return Err(AppError::validation(format!(
                            "unknown backup module: {}",
                            module
                        )));
                    }
                }
                let expansion = expand_modules(&options.selected_modules);
                let mut tables: Vec<String> = Vec::new();
                for module in &expansion.final_modules {
                    for table in module_tables(module).unwrap_or(&[]) {
                        if !tables.iter().any(|t| t == table) {
                            tables.push(table.to_string());
                        }
                    }
                }
                (
                    tables,
                    Some(options.selected_modules.clone()),
                    Some(expansion.final_modules.clone()),
                    Some(expansion.auto_included),
                )
            }
        };

        // Stable read order keeps checksums reproducible
        let ordered = sort_tables_by_dependency(&tables);
        let mut data: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        let mut table_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_records = 0usize;

        for table in &ordered {
            let rows = self
                .db
                .query(&format!("SELECT * FROM {}", quote_ident(table)), &[])?;
            total_records += rows.len();
            table_counts.insert(table.clone(), rows.len());
            data.insert(table.clone(), rows);
        }

        let checksum = data_checksum(&serde_json::to_value(&data).unwrap_or(Value::Null));
        let metadata = BackupMetadata {
            version: BACKUP_FORMAT_VERSION.to_string(),
            timestamp: now_iso(),
            backup_type: options.backup_type.as_str().to_string(),
            schema_version: schema_version(self.db),
            selected_modules: selected,
            included_modules: included,
            auto_included_dependencies: auto_included,
            tables: table_counts,
            total_records,
            checksum,
        };

        info!(
            backup_type = metadata.backup_type,
            total_records, "created backup"
        );
        Ok(BackupFile { metadata, data })
    }

    // ------------------------------------------------------------------
    // Validate
    // ------------------------------------------------------------------

    /// Shape- and checksum-validate a raw backup document
    pub fn validate_backup_data(value: &Value) -> AppResult<BackupFile> {
        let Some(root) = value.as_object() else {
            return Err(AppError::validation("invalid backup: not a JSON object"));
        };
        let Some(metadata) = root.get("metadata").and_then(Value::as_object) else {
            return Err(AppError::validation("invalid backup: missing metadata"));
        };
        let Some(data) = root.get("data").and_then(Value::as_object) else {
            return Err(AppError::validation("invalid backup: missing data"));
        };
        if metadata.get("version").and_then(Value::as_str).is_none() {
            return Err(AppError::validation("invalid backup: metadata.version missing"));
        }
        if metadata.get("timestamp").and_then(Value::as_str).is_none() {
            return Err(AppError::validation(
                "invalid backup: metadata.timestamp missing",
            ));
        }

        let declared = metadata
            .get("checksum")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let actual = data_checksum(&Value::Object(data.clone()));
        if declared != actual {
            return Err(AppError::validation(format!(
                "backup checksum mismatch: declared {} actual {}",
                declared, actual
            )));
        }

        serde_json::from_value(value.clone())
            .map_err(|e| AppError::validation(format!("invalid backup: {}", e)))
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    pub fn restore_backup(
        &self,
        value: &Value,
        options: &RestoreOptions,
        cancel: &CancelToken,
    ) -> AppResult<RestoreReport> {
        let mut backup = Self::validate_backup_data(value)?;

        if options.mode == RestoreMode::Merge {
            if let Some(admin_id) = &options.current_admin_id {
                map_admin_ids(&mut backup.data, admin_id);
            }
        }

        for table in backup.data.keys() {
            if !is_known_table(table) {
                return Err(AppError::validation(format!(
                    "backup contains unknown table: {}",
                    table
                )));
            }
        }

        // Pre-flight: schema-drift issues are hard blockers
        let preview = preview::preview_restore(self.db, &backup, options.mode, true)?;
        let blocking: Vec<&PreviewIssue> = preview
            .issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .collect();
        if !blocking.is_empty() {
            let summary = blocking
                .iter()
                .map(|i| format!("{} ({})", i.code, i.table))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::validation(format!(
                "restore blocked by pre-flight issues: {}",
                summary
            )));
        }

        let integrity_issues = if options.skip_integrity_check {
            Vec::new()
        } else {
            self.scan_integrity(&backup)
        };

        let ordered = sort_tables_by_dependency(&backup.data.keys().cloned().collect::<Vec<_>>());
        let (statements, plans) = self.assemble_statements(&backup, &ordered, options);

        // Execute in bounded batches; serial, in emitted order
        let mut outcomes = Vec::with_capacity(statements.len());
        let mut cancelled = false;
        for chunk in statements.chunks(MAX_STATEMENTS_PER_BATCH) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            outcomes.extend(self.db.execute_batch(chunk));
        }

        let mut results: BTreeMap<String, TableResult> = BTreeMap::new();
        for table in &ordered {
            let expected = backup.data.get(table).map(|r| r.len() as u64).unwrap_or(0);
            results.insert(
                table.clone(),
                TableResult {
                    expected,
                    ..TableResult::default()
                },
            );
        }
        reconcile(&plans, &outcomes, options.mode, &mut results);

        // The index is derived data; whatever just happened, it is stale
        if let Err(e) = SearchIndexCoordinator::new(self.db).clear_all() {
            warn!(error = %e, "failed to clear fs search index after restore");
        }

        let total_records: u64 = results.values().map(|r| r.success).sum();
        let report = RestoreReport {
            restored_tables: ordered,
            total_records,
            results,
            integrity_issues,
            cancelled,
        };
        info!(
            total_records = report.total_records,
            cancelled = report.cancelled,
            "restore finished"
        );
        Ok(report)
    }

    fn assemble_statements(
        &self,
        backup: &BackupFile,
        ordered: &[String],
        options: &RestoreOptions,
    ) -> (Vec<SqlStatement>, Vec<StatementPlan>) {
        let dialect = self.db.dialect();
        let mut statements = Vec::new();
        let mut plans = Vec::new();

        if let Some(sql) = dialect.defer_foreign_keys() {
            statements.push(SqlStatement::bare(sql));
            plans.push(StatementPlan::Control);
        }

        if options.mode == RestoreMode::Overwrite {
            for table in ordered.iter().rev() {
                statements.push(SqlStatement::bare(format!(
                    "DELETE FROM {}",
                    quote_ident(table)
                )));
                plans.push(StatementPlan::Delete {
                    table: table.clone(),
                });
            }
        }

        let now = Utc::now();
        for table in ordered {
            let Some(rows) = backup.data.get(table) else {
                continue;
            };
            for built in build_insert_statements(
                dialect,
                table,
                rows,
                options.mode,
                options.preserve_timestamps,
                now,
            ) {
                plans.push(StatementPlan::Insert {
                    table: built.table,
                    expected: built.row_count as u64,
                });
                statements.push(built.statement);
            }
        }

        if let Some(sql) = dialect.restore_foreign_keys() {
            statements.push(SqlStatement::bare(sql));
            plans.push(StatementPlan::Control);
        }

        (statements, plans)
    }

    // ------------------------------------------------------------------
    // Integrity scan
    // ------------------------------------------------------------------

    /// Advisory referential checks: collected, returned, never fatal
    fn scan_integrity(&self, backup: &BackupFile) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let backup_ids = |table: &str| -> Vec<String> {
            backup
                .data
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter_map(|r| r.get("id").and_then(Value::as_str).map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };

        let live_ids = |table: &str| -> Vec<String> {
            self.db
                .query(&format!("SELECT id FROM {}", quote_ident(table)), &[])
                .map(|rows| {
                    rows.iter()
                        .filter_map(|r| r.get("id").and_then(Value::as_str).map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(mounts) = backup.data.get("storage_mounts") {
            let known: Vec<String> = backup_ids("storage_configs")
                .into_iter()
                .chain(live_ids("storage_configs"))
                .collect();
            for mount in mounts {
                let config_id = mount
                    .get("storage_config_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !known.iter().any(|id| id == config_id) {
                    issues.push(IntegrityIssue {
                        table: "storage_mounts".to_string(),
                        code: "MISSING_STORAGE_CONFIG".to_string(),
                        message: format!(
                            "mount {} references storage config {} found in neither the backup nor the database",
                            mount.get("id").and_then(Value::as_str).unwrap_or("?"),
                            config_id
                        ),
                    });
                }
            }
        }

        for (child, parent, fk) in [
            ("file_passwords", "files", "file_id"),
            ("paste_passwords", "pastes", "paste_id"),
        ] {
            let Some(rows) = backup.data.get(child) else {
                continue;
            };
            let known: Vec<String> = backup_ids(parent)
                .into_iter()
                .chain(live_ids(parent))
                .collect();
            for row in rows {
                let parent_id = row.get(fk).and_then(Value::as_str).unwrap_or_default();
                if !known.iter().any(|id| id == parent_id) {
                    issues.push(IntegrityIssue {
                        table: child.to_string(),
                        code: "MISSING_PARENT_ROW".to_string(),
                        message: format!("{} row references missing {} {}", child, parent, parent_id),
                    });
                }
            }
        }

        issues
    }
}

/// Rewrite ownership columns to the restoring admin
///
/// Applies to `storage_configs.admin_id` and the `created_by` of mounts,
/// files and pastes. API keys and admin tokens are never remapped.
/// Applying twice with the same admin is the same as applying once.
pub fn map_admin_ids(data: &mut BTreeMap<String, Vec<Row>>, admin_id: &str) {
    if let Some(rows) = data.get_mut("storage_configs") {
        for row in rows {
            row.insert("admin_id".to_string(), Value::String(admin_id.to_string()));
        }
    }
    for table in ["storage_mounts", "files", "pastes"] {
        if let Some(rows) = data.get_mut(table) {
            for row in rows {
                row.insert(
                    "created_by".to_string(),
                    Value::String(admin_id.to_string()),
                );
            }
        }
    }
}

/// Fold statement outcomes back into per-table counters
fn reconcile(
    plans: &[StatementPlan],
    outcomes: &[crate::db::StatementOutcome],
    mode: RestoreMode,
    results: &mut BTreeMap<String, TableResult>,
) {
    for (idx, plan) in plans.iter().enumerate() {
        // A cancelled run has fewer outcomes than plans
        let Some(outcome) = outcomes.get(idx) else {
            break;
        };
        match plan {
            StatementPlan::Control => {}
            StatementPlan::Delete { table } => {
                if !outcome.ok {
                    if let Some(result) = results.get_mut(table) {
                        result.failed += 1;
                    }
                }
            }
            StatementPlan::Insert { table, expected } => {
                let Some(result) = results.get_mut(table) else {
                    continue;
                };
                if outcome.ok {
                    result.success += outcome.changes;
                    if *expected > outcome.changes {
                        let shortfall = expected - outcome.changes;
                        match mode {
                            RestoreMode::Merge => result.ignored += shortfall,
                            RestoreMode::Overwrite => result.failed += shortfall,
                        }
                    }
                } else {
                    result.failed += (*expected).max(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteDatabase, SqlValue};
    use crate::migrations::run_migrations;
    use serde_json::json;

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
            vec![SqlValue::Text(now)],
        ))
        .unwrap();
        db
    }

    #[test]
    fn test_full_backup_validates() {
        let db = seeded_db();
        let engine = BackupEngine::new(&db);
        let backup = engine
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        assert_eq!(backup.metadata.version, BACKUP_FORMAT_VERSION);
        assert_eq!(backup.metadata.tables["admins"], 1);
        assert_eq!(backup.metadata.total_records, 3);

        let value = serde_json::to_value(&backup).unwrap();
        BackupEngine::validate_backup_data(&value).unwrap();
    }

    #[test]
    fn test_module_backup_expands_dependencies() {
        let db = seeded_db();
        let engine = BackupEngine::new(&db);
        let backup = engine
            .create_backup(&BackupOptions {
                backup_type: BackupType::Modules,
                selected_modules: vec!["mount_management".to_string()],
            })
            .unwrap();
        assert_eq!(
            backup.metadata.included_modules.as_deref().unwrap(),
            ["mount_management".to_string(), "storage_config".to_string()]
        );
        assert_eq!(
            backup.metadata.auto_included_dependencies.as_deref().unwrap(),
            ["storage_config".to_string()]
        );
        let mut tables: Vec<&str> = backup.data.keys().map(String::as_str).collect();
        tables.sort_unstable();
        assert_eq!(
            tables,
            ["principal_storage_acl", "storage_configs", "storage_mounts"]
        );
    }

    #[test]
    fn test_unknown_module_rejected() {
        let db = seeded_db();
        let engine = BackupEngine::new(&db);
        let err = engine
            .create_backup(&BackupOptions {
                backup_type: BackupType::Modules,
                selected_modules: vec!["nope".to_string()],
            })
            .unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);
    }

    #[test]
    fn test_validate_rejects_checksum_mismatch() {
        let db = seeded_db();
        let backup = BackupEngine::new(&db)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let mut value = serde_json::to_value(&backup).unwrap();
        value["data"]["admins"][0]["username"] = json!("tampered");
        let err = BackupEngine::validate_backup_data(&value).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_validate_rejects_bad_shape() {
        assert!(BackupEngine::validate_backup_data(&json!([])).is_err());
        assert!(BackupEngine::validate_backup_data(&json!({"metadata": {}})).is_err());
        assert!(BackupEngine::validate_backup_data(
            &json!({"metadata": {"version": "1.0"}, "data": {}})
        )
        .is_err());
    }

    #[test]
    fn test_restore_overwrite_into_empty_db() {
        let source = seeded_db();
        let backup = BackupEngine::new(&source)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let value = serde_json::to_value(&backup).unwrap();

        let target = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&target).unwrap();
        let report = BackupEngine::new(&target)
            .restore_backup(
                &value,
                &RestoreOptions {
                    mode: RestoreMode::Overwrite,
                    ..RestoreOptions::default()
                },
                &CancelToken::new(),
            )
            .unwrap();

        assert!(!report.cancelled);
        for (table, rows) in &backup.data {
            let result = &report.results[table];
            assert_eq!(result.success, rows.len() as u64, "table {}", table);
            assert_eq!(result.failed, 0, "table {}", table);
        }
        assert_eq!(
            target.query("SELECT * FROM admins", &[]).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_restore_round_trip_checksum_is_stable() {
        let source = seeded_db();
        let backup = BackupEngine::new(&source)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let value = serde_json::to_value(&backup).unwrap();

        let target = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&target).unwrap();
        BackupEngine::new(&target)
            .restore_backup(
                &value,
                &RestoreOptions {
                    mode: RestoreMode::Overwrite,
                    preserve_timestamps: true,
                    ..RestoreOptions::default()
                },
                &CancelToken::new(),
            )
            .unwrap();

        let second = BackupEngine::new(&target)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        assert_eq!(backup.metadata.checksum, second.metadata.checksum);
    }

    #[test]
    fn test_restore_merge_counts_ignored() {
        let db = seeded_db();
        let backup = BackupEngine::new(&db)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let value = serde_json::to_value(&backup).unwrap();

        // Restoring into the same database: every row already exists
        let report = BackupEngine::new(&db)
            .restore_backup(&value, &RestoreOptions::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(report.results["admins"].ignored, 1);
        assert_eq!(report.results["admins"].success, 0);
        assert_eq!(report.results["admins"].failed, 0);
    }

    #[test]
    fn test_restore_unknown_table_rejected_before_write() {
        let db = seeded_db();
        let data = json!({"sneaky_table": [{"id": "x"}]});
        let value = json!({
            "metadata": {
                "version": "1.0",
                "timestamp": "2025-01-01T00:00:00.000Z",
                "backup_type": "full",
                "schema_version": null,
                "selected_modules": null,
                "included_modules": null,
                "auto_included_dependencies": null,
                "tables": {"sneaky_table": 1},
                "total_records": 1,
                "checksum": data_checksum(&data),
            },
            "data": data,
        });
        let err = BackupEngine::new(&db)
            .restore_backup(&value, &RestoreOptions::default(), &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("unknown table"));
    }

    #[test]
    fn test_restore_clears_search_index() {
        let db = seeded_db();
        db.execute(&SqlStatement::bare(
            "INSERT INTO fs_search_entries (mount_id, path, name) VALUES ('m1', '/a', 'a')",
        ))
        .unwrap();
        let backup = BackupEngine::new(&db)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        BackupEngine::new(&db)
            .restore_backup(
                &serde_json::to_value(&backup).unwrap(),
                &RestoreOptions::default(),
                &CancelToken::new(),
            )
            .unwrap();
        assert!(db
            .query("SELECT * FROM fs_search_entries", &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_merge_remaps_ownership() {
        let source = seeded_db();
        let backup = BackupEngine::new(&source)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let value = serde_json::to_value(&backup).unwrap();

        let target = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&target).unwrap();
        // The restoring admin exists under a different id
        let now = now_iso();
        target
            .execute(&SqlStatement::new(
                "INSERT INTO admins (id, username, password, created_at, updated_at) \
                 VALUES ('a2', 'other', 'x', ?1, ?1)",
                vec![SqlValue::Text(now)],
            ))
            .unwrap();

        BackupEngine::new(&target)
            .restore_backup(
                &value,
                &RestoreOptions {
                    mode: RestoreMode::Merge,
                    current_admin_id: Some("a2".to_string()),
                    ..RestoreOptions::default()
                },
                &CancelToken::new(),
            )
            .unwrap();

        let configs = target.query("SELECT * FROM storage_configs", &[]).unwrap();
        assert_eq!(configs[0]["admin_id"], "a2");
        let mounts = target.query("SELECT * FROM storage_mounts", &[]).unwrap();
        assert_eq!(mounts[0]["created_by"], "a2");
    }

    #[test]
    fn test_map_admin_ids_is_idempotent() {
        let mut data: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        data.insert(
            "storage_configs".to_string(),
            vec![json!({"id": "c", "admin_id": "old"}).as_object().unwrap().clone()],
        );
        map_admin_ids(&mut data, "new");
        let once = data.clone();
        map_admin_ids(&mut data, "new");
        assert_eq!(serde_json::to_value(&once).unwrap(), serde_json::to_value(&data).unwrap());
    }

    #[test]
    fn test_integrity_scan_flags_orphan_mount() {
        let db = seeded_db();
        let mut backup = BackupEngine::new(&db)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        // Point the mount at a config that exists nowhere
        backup.data.get_mut("storage_mounts").unwrap()[0]
            .insert("storage_config_id".to_string(), json!("ghost"));
        let issues = BackupEngine::new(&db).scan_integrity(&backup);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "MISSING_STORAGE_CONFIG");
    }

    #[test]
    fn test_cancelled_restore_reports_partial() {
        let db = seeded_db();
        let backup = BackupEngine::new(&db)
            .create_backup(&BackupOptions {
                backup_type: BackupType::Full,
                selected_modules: vec![],
            })
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = BackupEngine::new(&db)
            .restore_backup(
                &serde_json::to_value(&backup).unwrap(),
                &RestoreOptions::default(),
                &cancel,
            )
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.total_records, 0);
    }
}
