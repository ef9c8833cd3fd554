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

//! Dialect and insert-statement builder
//!
//! Turns `{table, rows, mode}` into an ordered list of prepared statements.
//! The SQLite family packs multiple rows per INSERT under the bind-variable
//! ceiling; every other dialect degrades to one row per statement through
//! its insert-ignore form. The builder itself never fails: unknown
//! attributes bind NULL and an unknown dialect simply loses the packing
//! optimization.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::db::{Row, SqlStatement, SqlValue};

/// Bind-variable ceiling per statement
///
/// Hosted SQLite flavors cap far below the vanilla 999; 80 stays under
/// all of them.
pub const MAX_BIND_VARS: usize = 80;

/// How restored rows meet existing rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Existing rows are deleted first; inserts are plain
    Overwrite,
    /// Existing rows win; inserts are insert-ignore
    Merge,
}

impl RestoreMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overwrite" => Some(Self::Overwrite),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Merge => "merge",
        }
    }
}

/// SQL flavor of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
    Postgres,
}

impl Dialect {
    /// Only the SQLite family gets multi-row packing
    pub fn is_sqlite_family(&self) -> bool {
        matches!(self, Self::Sqlite)
    }

    /// `(prefix, suffix)` around `INTO table (cols) VALUES (...)`
    fn insert_clause(&self, mode: RestoreMode) -> (&'static str, &'static str) {
        match (self, mode) {
            (_, RestoreMode::Overwrite) => ("INSERT", ""),
            (Self::Sqlite, RestoreMode::Merge) => ("INSERT OR IGNORE", ""),
            (Self::Mysql, RestoreMode::Merge) => ("INSERT IGNORE", ""),
            (Self::Postgres, RestoreMode::Merge) => ("INSERT", " ON CONFLICT DO NOTHING"),
        }
    }

    /// Statement switching FK enforcement off for the restore window
    pub fn defer_foreign_keys(&self) -> Option<&'static str> {
        match self {
            Self::Sqlite => Some("PRAGMA defer_foreign_keys = ON"),
            Self::Mysql => Some("SET FOREIGN_KEY_CHECKS = 0"),
            Self::Postgres => Some("SET CONSTRAINTS ALL DEFERRED"),
        }
    }

    /// Statement restoring FK enforcement after the restore window
    pub fn restore_foreign_keys(&self) -> Option<&'static str> {
        match self {
            Self::Sqlite => Some("PRAGMA defer_foreign_keys = OFF"),
            Self::Mysql => Some("SET FOREIGN_KEY_CHECKS = 1"),
            Self::Postgres => None,
        }
    }
}

/// One emitted statement plus the rows it carries
#[derive(Debug, Clone)]
pub struct BuiltInsert {
    pub table: String,
    pub statement: SqlStatement,
    pub row_count: usize,
}

/// Rows a single statement may carry for a given column count
pub fn max_rows_per_statement(dialect: Dialect, column_count: usize) -> usize {
    if !dialect.is_sqlite_family() {
        return 1;
    }
    (MAX_BIND_VARS / column_count.max(1)).max(1)
}

/// Build the ordered insert statements for one table's records
///
/// Columns are the lexicographically sorted union across all records, so
/// two backups of the same data always produce the same statement shapes.
/// When `preserve_timestamps` is off in merge mode, `updated_at` is
/// rewritten to `now` - ISO-8601 except for `tasks`, which carries epoch
/// millis. `created_at` is never touched.
pub fn build_insert_statements(
    dialect: Dialect,
    table: &str,
    records: &[Row],
    mode: RestoreMode,
    preserve_timestamps: bool,
    now: DateTime<Utc>,
) -> Vec<BuiltInsert> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut columns: Vec<String> = records
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    columns.sort();

    let rewrite_updated_at = !preserve_timestamps && mode == RestoreMode::Merge;
    let now_value = if table == "tasks" {
        Value::from(now.timestamp_millis())
    } else {
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
    };

    let chunk = max_rows_per_statement(dialect, columns.len());
    let (prefix, suffix) = dialect.insert_clause(mode);
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = Vec::new();
    for batch in records.chunks(chunk) {
        let mut params = Vec::with_capacity(batch.len() * columns.len());
        let mut tuples = Vec::with_capacity(batch.len());

        for record in batch {
            let mut placeholders = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = if rewrite_updated_at && column == "updated_at" && record.contains_key("updated_at")
                {
                    &now_value
                } else {
                    record.get(column).unwrap_or(&Value::Null)
                };
                params.push(SqlValue::from_json(value));
                placeholders.push(format!("?{}", params.len()));
            }
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let sql = format!(
            "{} INTO {} ({}) VALUES {}{}",
            prefix,
            quote_ident(table),
            column_list,
            tuples.join(", "),
            suffix,
        );
        out.push(BuiltInsert {
            table: table.to_string(),
            statement: SqlStatement::new(sql, params),
            row_count: batch.len(),
        });
    }
    out
}

/// Double-quote an identifier, stripping anything that could escape it
pub fn quote_ident(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("\"{}\"", cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn ten_column_rows(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| {
                let mut r = Row::new();
                for c in 0..10 {
                    r.insert(format!("c{:02}", c), json!(i));
                }
                r
            })
            .collect()
    }

    #[test]
    fn test_multi_row_packing() {
        // 10 columns -> 8 rows per statement -> ceil(100/8) = 13 statements
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "files",
            &ten_column_rows(100),
            RestoreMode::Merge,
            true,
            Utc::now(),
        );
        assert_eq!(stmts.len(), 13);
        assert!(stmts[0].statement.sql.starts_with("INSERT OR IGNORE INTO"));
        assert_eq!(stmts[0].row_count, 8);
        assert_eq!(stmts[12].row_count, 4);
        assert_eq!(stmts[0].statement.params.len(), 80);
    }

    #[test]
    fn test_non_sqlite_is_one_row_per_statement() {
        let stmts = build_insert_statements(
            Dialect::Postgres,
            "files",
            &ten_column_rows(5),
            RestoreMode::Merge,
            true,
            Utc::now(),
        );
        assert_eq!(stmts.len(), 5);
        assert!(stmts[0].statement.sql.ends_with("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn test_overwrite_uses_plain_insert() {
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "files",
            &ten_column_rows(1),
            RestoreMode::Overwrite,
            true,
            Utc::now(),
        );
        assert!(stmts[0].statement.sql.starts_with("INSERT INTO"));
    }

    #[test]
    fn test_wide_table_still_restores_one_row_per_statement() {
        // More columns than MAX_BIND_VARS: every statement carries one row
        let mut r = Row::new();
        for c in 0..120 {
            r.insert(format!("c{:03}", c), json!(c));
        }
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "wide",
            &[r.clone(), r],
            RestoreMode::Merge,
            true,
            Utc::now(),
        );
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].row_count, 1);
    }

    #[test]
    fn test_column_union_sorted_and_missing_binds_null() {
        let records = vec![
            row(json!({"id": "a", "zeta": 1})),
            row(json!({"alpha": 2, "id": "b"})),
        ];
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "t",
            &records,
            RestoreMode::Overwrite,
            true,
            Utc::now(),
        );
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].statement.sql.contains("(\"alpha\", \"id\", \"zeta\")"));
        // First record has no alpha -> NULL in slot 1
        assert_eq!(stmts[0].statement.params[0], SqlValue::Null);
        assert_eq!(stmts[0].statement.params[1], SqlValue::Text("a".into()));
    }

    #[test]
    fn test_merge_rewrites_updated_at_iso() {
        let now = Utc::now();
        let records = vec![row(json!({"id": "a", "updated_at": "2020-01-01T00:00:00Z", "created_at": "2020-01-01T00:00:00Z"}))];
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "files",
            &records,
            RestoreMode::Merge,
            false,
            now,
        );
        // columns sorted: created_at, id, updated_at
        let expect = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        assert_eq!(
            stmts[0].statement.params[2],
            SqlValue::Text(expect)
        );
        // created_at untouched
        assert_eq!(
            stmts[0].statement.params[0],
            SqlValue::Text("2020-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn test_merge_rewrites_tasks_updated_at_as_millis() {
        let now = Utc::now();
        let records = vec![row(json!({"id": "t1", "updated_at": 123}))];
        let stmts =
            build_insert_statements(Dialect::Sqlite, "tasks", &records, RestoreMode::Merge, false, now);
        assert_eq!(
            stmts[0].statement.params[1],
            SqlValue::Integer(now.timestamp_millis())
        );
    }

    #[test]
    fn test_preserve_timestamps_leaves_updated_at() {
        let records = vec![row(json!({"id": "a", "updated_at": "2020-01-01T00:00:00Z"}))];
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "files",
            &records,
            RestoreMode::Merge,
            true,
            Utc::now(),
        );
        assert_eq!(
            stmts[0].statement.params[1],
            SqlValue::Text("2020-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn test_record_without_updated_at_is_not_given_one() {
        // Union includes updated_at from another record, but a record that
        // never carried it binds NULL, not now
        let records = vec![
            row(json!({"id": "a", "updated_at": "2020-01-01T00:00:00Z"})),
            row(json!({"id": "b"})),
        ];
        let stmts = build_insert_statements(
            Dialect::Sqlite,
            "files",
            &records,
            RestoreMode::Merge,
            false,
            Utc::now(),
        );
        assert_eq!(stmts[0].statement.params[3], SqlValue::Null);
    }
}
