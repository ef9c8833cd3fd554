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

//! Backup service
//!
//! Wire-level adapter over the storage backup engine: parses the caller's
//! string-typed options into engine options and owns the cancellation
//! token handed to long-running restores.

use serde_json::Value;
use std::sync::Arc;

use cloudbin_core::{AppError, AppResult};
use cloudbin_storage::{
    BackupEngine, BackupFile, BackupOptions, BackupType, CancelToken, Database, RestoreMode,
    RestoreOptions, RestorePreview, RestoreReport,
};

pub struct BackupService {
    db: Arc<dyn Database>,
}

impl BackupService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn create_backup(
        &self,
        backup_type: &str,
        selected_modules: Vec<String>,
    ) -> AppResult<BackupFile> {
        let backup_type = match backup_type {
            "full" => BackupType::Full,
            "modules" => BackupType::Modules,
            other => {
                return Err(AppError::validation(format!(
                    "unknown backup type: {}",
                    other
                )))
            }
        };
        BackupEngine::new(self.db.as_ref()).create_backup(&BackupOptions {
            backup_type,
            selected_modules,
        })
    }

    pub fn validate(&self, backup: &Value) -> AppResult<BackupFile> {
        BackupEngine::validate_backup_data(backup)
    }

    /// Dry run: nothing is written, blocking issues are reported
    pub fn preview_restore(&self, backup: &Value, mode: &str) -> AppResult<RestorePreview> {
        let parsed = BackupEngine::validate_backup_data(backup)?;
        let mode = parse_mode(mode)?;
        cloudbin_storage::backup::preview::preview_restore(self.db.as_ref(), &parsed, mode, false)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore_backup(
        &self,
        backup: &Value,
        mode: &str,
        current_admin_id: Option<String>,
        skip_integrity_check: bool,
        preserve_timestamps: bool,
        cancel: &CancelToken,
    ) -> AppResult<RestoreReport> {
        let mode = parse_mode(mode)?;
        BackupEngine::new(self.db.as_ref()).restore_backup(
            backup,
            &RestoreOptions {
                mode,
                current_admin_id,
                skip_integrity_check,
                preserve_timestamps,
            },
            cancel,
        )
    }
}

fn parse_mode(mode: &str) -> AppResult<RestoreMode> {
    RestoreMode::parse(mode)
        .ok_or_else(|| AppError::validation(format!("unknown restore mode: {}", mode)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbin_storage::{run_migrations, SqliteDatabase};

    fn service() -> BackupService {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        BackupService::new(Arc::new(db))
    }

    #[test]
    fn test_unknown_mode_and_type_rejected() {
        let backup_service = service();
        assert!(backup_service.create_backup("increment", vec![]).is_err());

        let backup = backup_service.create_backup("full", vec![]).unwrap();
        let value = serde_json::to_value(&backup).unwrap();
        let err = backup_service
            .preview_restore(&value, "sideways")
            .unwrap_err();
        assert!(err.to_string().contains("unknown restore mode"));
    }

    #[test]
    fn test_preview_round_trip() {
        let backup_service = service();
        let backup = backup_service.create_backup("full", vec![]).unwrap();
        let value = serde_json::to_value(&backup).unwrap();
        let preview = backup_service.preview_restore(&value, "merge").unwrap();
        assert_eq!(preview.mode, "merge");
        assert!(preview.issues.is_empty());
    }
}
