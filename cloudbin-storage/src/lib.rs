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

//! Cloudbin Storage Layer
//!
//! Relational persistence for the sharing backend:
//!
//! - **Database seam**: prepared statements over rusqlite, rows as JSON bags
//! - **Dialect builder**: multi-row insert packing under the bind ceiling
//! - **Backup engine**: dependency-ordered export, validation, dry-run
//!   pre-flight and batched replay with partial counters
//! - **Repositories**: per-table-group row mappers
//! - **Search-index coordinator**: derived-data invalidation

pub mod backup;
pub mod checksum;
pub mod db;
pub mod dialect;
pub mod migrations;
pub mod repos;
pub mod search_index;
pub mod tables;

pub use backup::{
    BackupEngine, BackupFile, BackupMetadata, BackupOptions, BackupType, CancelToken,
    IntegrityIssue, IssueLevel, PreviewIssue, RestoreOptions, RestorePreview, RestoreReport,
    TablePlan, TableResult, MAX_STATEMENTS_PER_BATCH,
};
pub use checksum::{canonical_json, data_checksum, CHECKSUM_HEX_LEN};
pub use db::{Database, Row, SqlStatement, SqlValue, SqliteDatabase, StatementOutcome};
pub use dialect::{
    build_insert_statements, max_rows_per_statement, BuiltInsert, Dialect, RestoreMode,
    MAX_BIND_VARS,
};
pub use migrations::{run_migrations, schema_version};
pub use repos::{
    AclRepo, AdminRepo, AdminTokenRepo, ApiKeyRepo, FileShareRepo, MetricsRepo, MountRepo,
    PasteRepo, SettingsRepo, StorageConfigRepo,
};
pub use search_index::SearchIndexCoordinator;
pub use tables::{
    all_backup_tables, expand_modules, is_known_module, is_known_table, module_tables,
    sort_tables_by_dependency, table_parents, ModuleExpansion, BACKUP_MODULES,
    FS_SEARCH_INDEX_TABLES, MODULE_DEPENDENCIES, TABLE_PARENTS,
};
