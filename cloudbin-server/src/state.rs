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

//! Shared application state
//!
//! One instance per process; every service hangs off the same database
//! handle and the same process-wide cipher.

use std::sync::Arc;

use cloudbin_core::SecretCipher;
use cloudbin_drivers::DriverRegistry;
use cloudbin_storage::Database;

use crate::auth::AuthService;
use crate::services::{
    BackupService, QuotaService, SchedulerService, SettingsService, StorageConfigService,
    UploadService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub cipher: SecretCipher,
    pub registry: Arc<DriverRegistry>,
    pub auth: Arc<AuthService>,
    pub storage_configs: Arc<StorageConfigService>,
    pub uploads: Arc<UploadService>,
    pub quota: Arc<QuotaService>,
    pub backups: Arc<BackupService>,
    pub scheduler: Arc<SchedulerService>,
    pub settings: Arc<SettingsService>,
}

impl AppState {
    pub fn new(
        db: Arc<dyn Database>,
        registry: Arc<DriverRegistry>,
        cipher: SecretCipher,
        admin_token_ttl_hours: i64,
    ) -> Self {
        let storage_configs = Arc::new(StorageConfigService::new(
            db.clone(),
            registry.clone(),
            cipher.clone(),
        ));
        let uploads = Arc::new(UploadService::new(
            db.clone(),
            storage_configs.clone(),
            registry.clone(),
            cipher.clone(),
        ));
        Self {
            auth: Arc::new(AuthService::new(db.clone(), admin_token_ttl_hours)),
            quota: Arc::new(QuotaService::new(db.clone())),
            backups: Arc::new(BackupService::new(db.clone())),
            scheduler: Arc::new(SchedulerService::new(db.clone())),
            settings: Arc::new(SettingsService::new(db.clone())),
            storage_configs,
            uploads,
            registry,
            cipher,
            db,
        }
    }
}
