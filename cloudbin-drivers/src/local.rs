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

//! Local-disk driver
//!
//! The only transport that ships in-tree. Remote transports register
//! through the driver registry; this one doubles as the reference
//! implementation and the workhorse for tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;

use cloudbin_core::{AppError, AppResult, StorageConfig};

use crate::driver::{ObjectStat, PresignedUpload, StorageDriver, TesterCheck, TesterReport, UploadOutcome};
use crate::types::StorageType;

#[derive(Debug)]
pub struct LocalDriver {
    root: PathBuf,
    default_folder: Option<String>,
    random_names: bool,
}

impl LocalDriver {
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let root = config
            .config_str("root_path")
            .ok_or_else(|| AppError::validation("local storage requires root_path"))?;
        let root = PathBuf::from(root);
        if !root.is_absolute() {
            return Err(AppError::validation("root_path must be absolute"));
        }
        Ok(Self {
            root,
            default_folder: config.config_str("default_folder").map(str::to_string),
            random_names: config.config_str("naming_policy") == Some("random"),
        })
    }

    #[cfg(test)]
    pub fn for_tests(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_folder: None,
            random_names: false,
        }
    }

    /// Keys are relative, slash-separated, and may not escape the root
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if key.split('/').any(|seg| seg == ".." || seg == ".") {
            return Err(AppError::validation(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(key.trim_start_matches('/')))
    }

    fn sanitize_filename(filename: &str) -> String {
        let name = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename)
            .trim();
        if name.is_empty() {
            "file".to_string()
        } else {
            name.to_string()
        }
    }

    fn with_suffix(name: &str, suffix: &str) -> String {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
            _ => format!("{}-{}", name, suffix),
        }
    }

    fn short_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

#[async_trait]
impl StorageDriver for LocalDriver {
    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    async fn plan_key(&self, folder: Option<&str>, filename: &str) -> AppResult<String> {
        let name = Self::sanitize_filename(filename);
        let name = if self.random_names {
            Self::with_suffix(&name, &Self::short_id())
        } else {
            name
        };

        let folder = folder
            .or(self.default_folder.as_deref())
            .unwrap_or("")
            .trim_matches('/')
            .to_string();
        let base_key = if folder.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", folder, name)
        };

        // Conflict rename: never silently clobber an existing object
        let mut key = base_key.clone();
        while fs::metadata(self.resolve(&key)?).await.is_ok() {
            let renamed = Self::with_suffix(&name, &Self::short_id());
            key = if folder.is_empty() {
                renamed
            } else {
                format!("{}/{}", folder, renamed)
            };
        }
        Ok(key)
    }

    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        _mimetype: Option<&str>,
    ) -> AppResult<UploadOutcome> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::driver_with("failed to create parent directory", e))?;
        }
        fs::write(&path, &body)
            .await
            .map_err(|e| AppError::driver_with(format!("failed to write {}", key), e))?;
        Ok(UploadOutcome {
            storage_path: key.to_string(),
            size: body.len() as i64,
            etag: None,
        })
    }

    async fn presign_upload(&self, _key: &str, _expires_secs: u64) -> AppResult<PresignedUpload> {
        Err(AppError::validation(
            "local storage does not support presigned uploads",
        ))
    }

    async fn stat(&self, key: &str) -> AppResult<Option<ObjectStat>> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(ObjectStat {
                size: meta.len() as i64,
                mtime: None,
                etag: None,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::driver_with(format!("failed to stat {}", key), e)),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::driver_with(format!("failed to delete {}", key), e)),
        }
    }

    async fn test(&self, _origin: &str) -> AppResult<TesterReport> {
        let mut checks = Vec::new();

        let root_ok = fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        checks.push(TesterCheck {
            name: "root_exists".to_string(),
            ok: root_ok,
            detail: Some(self.root.display().to_string()),
        });

        let probe = self.root.join(format!(".cloudbin-probe-{}", Self::short_id()));
        let write_ok = fs::write(&probe, b"probe").await.is_ok();
        if write_ok {
            let _ = fs::remove_file(&probe).await;
        }
        checks.push(TesterCheck {
            name: "root_writable".to_string(),
            ok: write_ok,
            detail: None,
        });

        let success = root_ok && write_ok;
        Ok(if success {
            TesterReport::ok("local storage reachable", checks)
        } else {
            TesterReport::failed("local storage probe failed", checks)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn driver() -> (TempDir, LocalDriver) {
        let dir = TempDir::new().unwrap();
        let driver = LocalDriver::for_tests(dir.path());
        (dir, driver)
    }

    #[tokio::test]
    async fn test_upload_stat_delete_cycle() {
        let (_dir, driver) = driver();
        let key = driver.plan_key(Some("uploads"), "a.txt").await.unwrap();
        assert_eq!(key, "uploads/a.txt");

        let outcome = driver
            .upload(&key, Bytes::from_static(b"hello"), Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(outcome.size, 5);

        let stat = driver.stat(&key).await.unwrap().unwrap();
        assert_eq!(stat.size, 5);

        driver.delete(&key).await.unwrap();
        assert!(driver.stat(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plan_key_renames_on_conflict() {
        let (_dir, driver) = driver();
        let first = driver.plan_key(None, "a.txt").await.unwrap();
        driver
            .upload(&first, Bytes::from_static(b"x"), None)
            .await
            .unwrap();
        let second = driver.plan_key(None, "a.txt").await.unwrap();
        assert_ne!(first, second);
        assert!(second.starts_with("a-"));
        assert!(second.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_key_cannot_escape_root() {
        let (_dir, driver) = driver();
        let err = driver.stat("../outside.txt").await.unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_sanitize_strips_directories() {
        let (_dir, driver) = driver();
        let key = driver.plan_key(None, "/etc/passwd").await.unwrap();
        assert_eq!(key, "passwd");
    }

    #[tokio::test]
    async fn test_tester_reports_checks() {
        let (_dir, driver) = driver();
        let report = driver.test("http://localhost").await.unwrap();
        assert!(report.success);
        let checks = report.checks.unwrap();
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| c.ok));
    }
}
