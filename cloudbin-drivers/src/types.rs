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

//! Storage-type tags
//!
//! A closed set: an unknown tag is a validation error at parse time, not a
//! runtime string match deep inside a driver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use cloudbin_core::{AppError, StorageConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    S3,
    Webdav,
    Onedrive,
    GoogleDrive,
    GithubReleases,
    Telegram,
    Local,
    Mirror,
}

impl StorageType {
    pub const ALL: &'static [StorageType] = &[
        Self::S3,
        Self::Webdav,
        Self::Onedrive,
        Self::GoogleDrive,
        Self::GithubReleases,
        Self::Telegram,
        Self::Local,
        Self::Mirror,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Webdav => "webdav",
            Self::Onedrive => "onedrive",
            Self::GoogleDrive => "google_drive",
            Self::GithubReleases => "github_releases",
            Self::Telegram => "telegram",
            Self::Local => "local",
            Self::Mirror => "mirror",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::S3 => "S3-Compatible",
            Self::Webdav => "WebDAV",
            Self::Onedrive => "OneDrive",
            Self::GoogleDrive => "Google Drive",
            Self::GithubReleases => "GitHub Releases",
            Self::Telegram => "Telegram Bot",
            Self::Local => "Local Disk",
            Self::Mirror => "Mirror Source",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown storage type: {}", s)))
    }
}

/// Bodies over this size are rejected for official-mode Telegram bots
pub const TELEGRAM_OFFICIAL_MAX_BYTES: i64 = 20 * 1024 * 1024;

/// Official Telegram bots cap uploads; self-hosted bot servers do not.
/// Official mode is the default when the config does not say otherwise.
pub fn telegram_is_official(config: &StorageConfig) -> bool {
    config
        .config_str("mode")
        .map(|mode| mode == "official")
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for t in StorageType::ALL {
            assert_eq!(StorageType::from_str(t.as_str()).unwrap(), *t);
        }
    }

    #[test]
    fn test_unknown_tag_is_validation_error() {
        let err = StorageType::from_str("ftp").unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(StorageType::GithubReleases).unwrap(),
            "github_releases"
        );
    }
}
