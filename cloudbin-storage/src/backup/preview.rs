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

//! Restore pre-flight
//!
//! A dry run over a parsed backup: insert order, delete order, per-table
//! statement estimates and the issues that would block a real restore.
//! Nothing here writes.
//!
//! Schema introspection is best-effort. When the database refuses to
//! describe a table, the check downgrades to an advisory note instead of
//! inventing a blocker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use cloudbin_core::AppResult;

use crate::db::Database;
use crate::dialect::{max_rows_per_statement, RestoreMode};
use crate::tables::sort_tables_by_dependency;

use super::{BackupFile, IntegrityIssue, MAX_STATEMENTS_PER_BATCH};

/// Rows sampled per table when estimating column width
const SAMPLE_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
}

/// A blocking or advisory finding from pre-flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewIssue {
    pub level: IssueLevel,
    pub code: String,
    pub table: String,
    pub message: String,
}

/// Per-table dry-run plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePlan {
    pub table: String,
    pub records: usize,
    pub sampled_columns: Vec<String>,
    pub estimated_statements: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePreview {
    pub mode: String,
    pub backup_type: String,
    pub schema_version: Option<String>,
    /// Insert order (parents first)
    pub ordered_tables: Vec<String>,
    /// Reverse of insert order; only meaningful in overwrite mode
    pub delete_order: Option<Vec<String>>,
    pub tables: Vec<TablePlan>,
    pub total_statements: usize,
    pub batches: usize,
    pub issues: Vec<PreviewIssue>,
    pub integrity_issues: Vec<IntegrityIssue>,
    pub notes: Vec<String>,
}

/// Simulate a restore without writing anything
pub fn preview_restore(
    db: &dyn Database,
    backup: &BackupFile,
    mode: RestoreMode,
    skip_integrity: bool,
) -> AppResult<RestorePreview> {
    let dialect = db.dialect();
    let ordered =
        sort_tables_by_dependency(&backup.data.keys().cloned().collect::<Vec<_>>());

    let mut issues = Vec::new();
    let mut notes = Vec::new();
    let mut plans = Vec::new();
    let mut total_statements = 0usize;

    for table in &ordered {
        let rows = backup.data.get(table).map(Vec::as_slice).unwrap_or(&[]);

        let sampled_columns: Vec<String> = rows
            .iter()
            .take(SAMPLE_ROWS)
            .flat_map(|r| r.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let estimated_statements = if rows.is_empty() {
            0
        } else {
            let per_statement = max_rows_per_statement(dialect, sampled_columns.len());
            rows.len().div_ceil(per_statement)
        };
        total_statements += estimated_statements;

        match db.table_exists(table) {
            Ok(false) => {
                issues.push(PreviewIssue {
                    level: IssueLevel::Error,
                    code: "TABLE_NOT_FOUND".to_string(),
                    table: table.clone(),
                    message: format!("table {} does not exist in the target schema", table),
                });
            }
            Ok(true) => match db.table_columns(table) {
                Ok(target_columns) => {
                    let missing: Vec<&String> = sampled_columns
                        .iter()
                        .filter(|c| !target_columns.iter().any(|t| t == *c))
                        .collect();
                    if !missing.is_empty() {
                        issues.push(PreviewIssue {
                            level: IssueLevel::Error,
                            code: "COLUMN_MISMATCH".to_string(),
                            table: table.clone(),
                            message: format!(
                                "backup columns not present in target table {}: {}",
                                table,
                                missing
                                    .iter()
                                    .map(|s| s.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            ),
                        });
                    }
                }
                Err(e) => notes.push(format!(
                    "could not introspect columns of {}: {}; column checks skipped",
                    table, e
                )),
            },
            Err(e) => notes.push(format!(
                "could not check existence of {}: {}; schema checks skipped",
                table, e
            )),
        }

        plans.push(TablePlan {
            table: table.clone(),
            records: rows.len(),
            sampled_columns,
            estimated_statements,
        });
    }

    let integrity_issues = if skip_integrity {
        Vec::new()
    } else {
        super::BackupEngine::new(db).scan_integrity(backup)
    };

    let delete_order = match mode {
        RestoreMode::Overwrite => {
            let mut reversed = ordered.clone();
            reversed.reverse();
            notes.push(format!(
                "overwrite mode deletes {} tables before inserting",
                reversed.len()
            ));
            Some(reversed)
        }
        RestoreMode::Merge => None,
    };

    let total_records: usize = plans.iter().map(|p| p.records).sum();
    notes.push(format!(
        "{} records across {} tables, about {} insert statements",
        total_records,
        plans.len(),
        total_statements
    ));
    if !dialect.is_sqlite_family() {
        notes.push("non-SQLite dialect: one statement per row".to_string());
    }

    Ok(RestorePreview {
        mode: mode.as_str().to_string(),
        backup_type: backup.metadata.backup_type.clone(),
        schema_version: backup.metadata.schema_version.clone(),
        ordered_tables: ordered,
        delete_order,
        tables: plans,
        total_statements,
        batches: total_statements.div_ceil(MAX_STATEMENTS_PER_BATCH),
        issues,
        integrity_issues,
        notes,
    })
}
