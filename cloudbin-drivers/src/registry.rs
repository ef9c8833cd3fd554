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

//! Driver registry
//!
//! Per-type metadata (schema, capabilities, provider presets) is static;
//! transports are registered at init. The local-disk transport ships
//! built-in, remote ones are supplied by the embedding application.

use dashmap::DashMap;
use std::str::FromStr;
use std::sync::Arc;

use cloudbin_core::{AppError, AppResult, ConfigSchema, SecretCipher, StorageConfig};

use crate::capability::{capabilities_for, Capabilities};
use crate::driver::StorageDriver;
use crate::local::LocalDriver;
use crate::schema_defs::config_schema;
use crate::types::StorageType;

/// Everything the admin UI needs to render one storage type
#[derive(Debug, Clone, serde::Serialize)]
pub struct DriverSpec {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub display_name: &'static str,
    pub provider_options: &'static [&'static str],
    pub config_schema: ConfigSchema,
    pub capabilities: Capabilities,
}

/// Preset providers shown in the type picker
pub fn provider_options(storage_type: StorageType) -> &'static [&'static str] {
    match storage_type {
        StorageType::S3 => &["AWS S3", "Cloudflare R2", "Backblaze B2", "MinIO", "Other"],
        StorageType::Webdav => &["Nextcloud", "ownCloud", "Generic WebDAV"],
        _ => &[],
    }
}

/// Static metadata for one type
pub fn driver_spec(storage_type: StorageType) -> DriverSpec {
    DriverSpec {
        storage_type,
        display_name: storage_type.display_name(),
        provider_options: provider_options(storage_type),
        config_schema: config_schema(storage_type),
        capabilities: capabilities_for(storage_type),
    }
}

/// Metadata for every registered type, in declaration order
pub fn driver_specs() -> Vec<DriverSpec> {
    StorageType::ALL.iter().copied().map(driver_spec).collect()
}

type DriverFactory =
    Arc<dyn Fn(&StorageConfig, &SecretCipher) -> AppResult<Arc<dyn StorageDriver>> + Send + Sync>;

pub struct DriverRegistry {
    factories: DashMap<StorageType, DriverFactory>,
}

impl DriverRegistry {
    /// Registry with the built-in local transport
    pub fn new() -> Self {
        let registry = Self {
            factories: DashMap::new(),
        };
        registry.register(StorageType::Local, |config, _cipher| {
            Ok(Arc::new(LocalDriver::from_config(config)?) as Arc<dyn StorageDriver>)
        });
        registry
    }

    /// Install or replace the transport for a type
    pub fn register<F>(&self, storage_type: StorageType, factory: F)
    where
        F: Fn(&StorageConfig, &SecretCipher) -> AppResult<Arc<dyn StorageDriver>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(storage_type, Arc::new(factory));
    }

    pub fn has_transport(&self, storage_type: StorageType) -> bool {
        self.factories.contains_key(&storage_type)
    }

    /// Build a driver for a config, decrypting secrets through the cipher
    pub fn connect(
        &self,
        config: &StorageConfig,
        cipher: &SecretCipher,
    ) -> AppResult<Arc<dyn StorageDriver>> {
        let storage_type = StorageType::from_str(&config.storage_type)?;
        let factory = self.factories.get(&storage_type).ok_or_else(|| {
            AppError::driver(format!(
                "no transport registered for storage type {}",
                storage_type
            ))
        })?;
        factory(config, cipher)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local_config(root: &str) -> StorageConfig {
        StorageConfig {
            id: "c1".to_string(),
            name: "local".to_string(),
            storage_type: "local".to_string(),
            admin_id: "a1".to_string(),
            is_public: false,
            is_default: false,
            remark: None,
            url_proxy: None,
            status: StorageConfig::STATUS_ACTIVE.to_string(),
            config_json: json!({"root_path": root}).as_object().unwrap().clone(),
            total_storage_bytes: None,
            created_at: String::new(),
            updated_at: String::new(),
            last_used_at: None,
        }
    }

    #[test]
    fn test_local_transport_is_built_in() {
        let registry = DriverRegistry::new();
        assert!(registry.has_transport(StorageType::Local));
        assert!(!registry.has_transport(StorageType::S3));
    }

    #[test]
    fn test_connect_local() {
        let registry = DriverRegistry::new();
        let cipher = SecretCipher::new("secret");
        let driver = registry.connect(&local_config("/tmp"), &cipher).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Local);
    }

    #[test]
    fn test_connect_unknown_type_is_validation() {
        let registry = DriverRegistry::new();
        let cipher = SecretCipher::new("secret");
        let mut config = local_config("/tmp");
        config.storage_type = "ftp".to_string();
        let err = registry.connect(&config, &cipher).unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);
    }

    #[test]
    fn test_connect_unregistered_transport_is_driver_error() {
        let registry = DriverRegistry::new();
        let cipher = SecretCipher::new("secret");
        let mut config = local_config("/tmp");
        config.storage_type = "s3".to_string();
        let err = registry.connect(&config, &cipher).unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Driver);
    }

    #[test]
    fn test_specs_cover_every_type() {
        let specs = driver_specs();
        assert_eq!(specs.len(), StorageType::ALL.len());
        assert!(specs.iter().all(|s| !s.config_schema.fields.is_empty()));
    }
}
