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

//! Database handle
//!
//! A thin prepared-statement seam over the relational store. Repositories
//! and the backup engine speak [`SqlStatement`] + [`SqlValue`]; the
//! concrete [`SqliteDatabase`] maps those onto rusqlite. Statements are
//! prepared per call - nothing here caches prepared statements globally.
//!
//! Rows come back as JSON object maps so the backup engine can move them
//! between the database and the backup file without a per-table codec.

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Number, Value};
use std::path::Path;

use cloudbin_core::{AppError, AppResult};

use crate::dialect::Dialect;

/// One database row as an attribute bag
pub type Row = Map<String, Value>;

/// A bound SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Convert a JSON attribute into its bound form
    ///
    /// Booleans become 0/1; arrays and objects are stored as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Real(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<SqlValue> for rusqlite::types::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(i) => Self::Integer(i),
            SqlValue::Real(f) => Self::Real(f),
            SqlValue::Text(s) => Self::Text(s),
            SqlValue::Blob(b) => Self::Blob(b),
        }
    }
}

/// A prepared statement with positional parameters
#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn bare(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Outcome of one statement inside a batch
#[derive(Debug, Clone)]
pub struct StatementOutcome {
    pub ok: bool,
    /// Rows changed, as reported by the driver
    pub changes: u64,
    pub error: Option<String>,
}

impl StatementOutcome {
    pub fn success(changes: u64) -> Self {
        Self {
            ok: true,
            changes,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            changes: 0,
            error: Some(error.into()),
        }
    }
}

/// Relational store seam
///
/// Batch execution never aborts on a failed statement: every statement gets
/// an outcome and the caller reconciles. Atomic execution is reserved for
/// small invariants (default flipping, cascaded deletes).
pub trait Database: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a SELECT and map every row to a JSON attribute bag
    fn query(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<Row>>;

    /// Run one mutating statement, returning the driver's change count
    fn execute(&self, stmt: &SqlStatement) -> AppResult<u64>;

    /// Run a batch serially, collecting one outcome per statement
    fn execute_batch(&self, stmts: &[SqlStatement]) -> Vec<StatementOutcome>;

    /// Run a group of statements inside one transaction
    fn execute_atomic(&self, stmts: &[SqlStatement]) -> AppResult<Vec<u64>>;

    /// Best-effort schema introspection; failures downgrade callers to advisory
    fn table_exists(&self, table: &str) -> AppResult<bool>;
    fn table_columns(&self, table: &str) -> AppResult<Vec<String>>;
}

/// SQLite-backed implementation
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::repository_with("failed to open database", e))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::repository_with("failed to open in-memory database", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| AppError::repository_with("failed to enable foreign keys", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn to_params(params: &[SqlValue]) -> Vec<rusqlite::types::Value> {
        params.iter().cloned().map(Into::into).collect()
    }

    fn value_ref_to_json(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Number(i.into()),
            ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::String(hex::encode(b)),
        }
    }

    fn execute_locked(conn: &Connection, stmt: &SqlStatement) -> Result<u64, rusqlite::Error> {
        // PRAGMA and friends refuse to go through execute(); route them
        // through the script runner, which ignores any returned rows.
        let trimmed = stmt.sql.trim_start();
        if stmt.params.is_empty()
            && trimmed
                .get(..6)
                .map(|p| p.eq_ignore_ascii_case("pragma"))
                .unwrap_or(false)
        {
            conn.execute_batch(&stmt.sql)?;
            return Ok(0);
        }
        let changes = conn.execute(
            &stmt.sql,
            rusqlite::params_from_iter(Self::to_params(&stmt.params)),
        )?;
        Ok(changes as u64)
    }
}

impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::repository_with(format!("failed to prepare: {}", sql), e))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(Self::to_params(params)))
            .map_err(|e| AppError::repository_with("query failed", e))?;

        let mut out = Vec::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(AppError::repository_with("row fetch failed", e)),
            };
            let mut bag = Map::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| AppError::repository_with("column read failed", e))?;
                bag.insert(name.clone(), Self::value_ref_to_json(value));
            }
            out.push(bag);
        }
        Ok(out)
    }

    fn execute(&self, stmt: &SqlStatement) -> AppResult<u64> {
        let conn = self.conn.lock();
        Self::execute_locked(&conn, stmt)
            .map_err(|e| AppError::repository_with(format!("statement failed: {}", stmt.sql), e))
    }

    fn execute_batch(&self, stmts: &[SqlStatement]) -> Vec<StatementOutcome> {
        let conn = self.conn.lock();
        stmts
            .iter()
            .map(|stmt| match Self::execute_locked(&conn, stmt) {
                Ok(changes) => StatementOutcome::success(changes),
                Err(e) => StatementOutcome::failure(e.to_string()),
            })
            .collect()
    }

    fn execute_atomic(&self, stmts: &[SqlStatement]) -> AppResult<Vec<u64>> {
        let conn = self.conn.lock();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AppError::repository_with("failed to begin transaction", e))?;
        let mut changes = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let count = tx
                .execute(
                    &stmt.sql,
                    rusqlite::params_from_iter(Self::to_params(&stmt.params)),
                )
                .map_err(|e| {
                    AppError::repository_with(format!("statement failed: {}", stmt.sql), e)
                })?;
            changes.push(count as u64);
        }
        tx.commit()
            .map_err(|e| AppError::repository_with("commit failed", e))?;
        Ok(changes)
    }

    fn table_exists(&self, table: &str) -> AppResult<bool> {
        let rows = self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[SqlValue::Text(table.to_string())],
        )?;
        Ok(!rows.is_empty())
    }

    fn table_columns(&self, table: &str) -> AppResult<Vec<String>> {
        if !is_safe_identifier(table) {
            return Err(AppError::validation(format!(
                "invalid table name: {}",
                table
            )));
        }
        let rows = self.query(&format!("PRAGMA table_info({})", table), &[])?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_string))
            .collect())
    }
}

/// Identifiers that may be spliced into SQL text
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().unwrap_or('0').is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute(&SqlStatement::bare(
            "CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER, note TEXT)",
        ))
        .unwrap();
        db
    }

    #[test]
    fn test_execute_and_query_round_trip() {
        let db = db();
        let changes = db
            .execute(&SqlStatement::new(
                "INSERT INTO t (id, n, note) VALUES (?1, ?2, ?3)",
                vec![
                    SqlValue::Text("a".into()),
                    SqlValue::Integer(7),
                    SqlValue::Null,
                ],
            ))
            .unwrap();
        assert_eq!(changes, 1);

        let rows = db.query("SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "a");
        assert_eq!(rows[0]["n"], 7);
        assert_eq!(rows[0]["note"], Value::Null);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let db = db();
        let outcomes = db.execute_batch(&[
            SqlStatement::new(
                "INSERT INTO t (id) VALUES (?1)",
                vec![SqlValue::Text("a".into())],
            ),
            SqlStatement::bare("INSERT INTO missing_table (id) VALUES ('x')"),
            SqlStatement::new(
                "INSERT INTO t (id) VALUES (?1)",
                vec![SqlValue::Text("b".into())],
            ),
        ]);
        assert!(outcomes[0].ok);
        assert!(!outcomes[1].ok);
        assert!(outcomes[2].ok);
        assert_eq!(db.query("SELECT * FROM t", &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_atomic_rolls_back_on_failure() {
        let db = db();
        let result = db.execute_atomic(&[
            SqlStatement::new(
                "INSERT INTO t (id) VALUES (?1)",
                vec![SqlValue::Text("a".into())],
            ),
            SqlStatement::bare("INSERT INTO missing_table (id) VALUES ('x')"),
        ]);
        assert!(result.is_err());
        assert!(db.query("SELECT * FROM t", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_pragma_routes_through_script_runner() {
        let db = db();
        db.execute(&SqlStatement::bare("PRAGMA defer_foreign_keys = ON"))
            .unwrap();
    }

    #[test]
    fn test_table_introspection() {
        let db = db();
        assert!(db.table_exists("t").unwrap());
        assert!(!db.table_exists("nope").unwrap());
        assert_eq!(db.table_columns("t").unwrap(), vec!["id", "n", "note"]);
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("storage_configs"));
        assert!(!is_safe_identifier("1table"));
        assert!(!is_safe_identifier("t; DROP TABLE x"));
        assert!(!is_safe_identifier(""));
    }
}
