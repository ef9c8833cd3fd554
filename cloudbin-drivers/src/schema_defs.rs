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

//! Config schemas per storage type
//!
//! Field metadata drives both the admin form and the wire-level validation
//! in the storage-config service. Secrets are declared here; the service
//! uses the declaration to decide what to encrypt and what to mask.

use cloudbin_core::{ConfigField, ConfigSchema, FieldKind, FieldPredicate, FieldRule, LayoutField, LayoutGroup};

use crate::types::StorageType;

fn group(title_key: &str, fields: &[&str]) -> LayoutGroup {
    LayoutGroup {
        title_key: title_key.to_string(),
        fields: fields
            .iter()
            .map(|f| LayoutField::Single(f.to_string()))
            .collect(),
    }
}

pub fn config_schema(storage_type: StorageType) -> ConfigSchema {
    match storage_type {
        StorageType::S3 => ConfigSchema::new(
            vec![
                ConfigField::new("endpoint_url", FieldKind::String)
                    .required()
                    .rule(FieldRule::Url),
                ConfigField::new("bucket_name", FieldKind::String).required(),
                ConfigField::new("region", FieldKind::String).default_value("auto"),
                ConfigField::new("access_key_id", FieldKind::Secret).required_on_create(),
                ConfigField::new("secret_access_key", FieldKind::Secret).required_on_create(),
                ConfigField::new("path_style", FieldKind::Boolean).default_value(false),
                ConfigField::new("default_folder", FieldKind::String),
                ConfigField::new("signature_expires_secs", FieldKind::Number)
                    .default_value(3600),
            ],
            vec![
                LayoutGroup {
                    title_key: "storage.group.connection".to_string(),
                    fields: vec![
                        LayoutField::Single("endpoint_url".to_string()),
                        LayoutField::Row(vec![
                            "bucket_name".to_string(),
                            "region".to_string(),
                        ]),
                        LayoutField::Row(vec![
                            "access_key_id".to_string(),
                            "secret_access_key".to_string(),
                        ]),
                    ],
                },
                group(
                    "storage.group.behavior",
                    &["path_style", "default_folder", "signature_expires_secs"],
                ),
            ],
        ),
        StorageType::Webdav => ConfigSchema::new(
            vec![
                ConfigField::new("server_url", FieldKind::String)
                    .required()
                    .rule(FieldRule::Url),
                ConfigField::new("username", FieldKind::String).required(),
                ConfigField::new("password", FieldKind::Secret).required_on_create(),
                ConfigField::new("default_folder", FieldKind::String),
            ],
            vec![group(
                "storage.group.connection",
                &["server_url", "username", "password", "default_folder"],
            )],
        ),
        StorageType::Onedrive => ConfigSchema::new(
            vec![
                ConfigField::new("client_id", FieldKind::String).required(),
                ConfigField::new("client_secret", FieldKind::Secret).required_on_create(),
                ConfigField::new("refresh_token", FieldKind::Secret).required_on_create(),
                ConfigField::new("drive_type", FieldKind::Enum)
                    .enum_values(&["personal", "business"])
                    .default_value("personal"),
                ConfigField::new("default_folder", FieldKind::String),
            ],
            vec![group(
                "storage.group.connection",
                &[
                    "client_id",
                    "client_secret",
                    "refresh_token",
                    "drive_type",
                    "default_folder",
                ],
            )],
        ),
        StorageType::GoogleDrive => ConfigSchema::new(
            vec![
                ConfigField::new("service_account_json", FieldKind::Secret).required_on_create(),
                ConfigField::new("folder_id", FieldKind::String).required(),
                ConfigField::new("shared_drive_id", FieldKind::String),
            ],
            vec![group(
                "storage.group.connection",
                &["service_account_json", "folder_id", "shared_drive_id"],
            )],
        ),
        StorageType::GithubReleases => ConfigSchema::new(
            vec![
                ConfigField::new("repo", FieldKind::String).required(),
                ConfigField::new("token", FieldKind::Secret).required_on_create(),
                ConfigField::new("release_tag", FieldKind::String).default_value("assets"),
            ],
            vec![group(
                "storage.group.connection",
                &["repo", "token", "release_tag"],
            )],
        ),
        StorageType::Telegram => ConfigSchema::new(
            vec![
                ConfigField::new("mode", FieldKind::Enum)
                    .enum_values(&["official", "self_hosted"])
                    .default_value("official"),
                ConfigField::new("bot_token", FieldKind::Secret).required_on_create(),
                ConfigField::new("chat_id", FieldKind::String).required(),
                ConfigField::new("api_base", FieldKind::String)
                    .rule(FieldRule::Url)
                    .required()
                    .required_when(FieldPredicate::equals("mode", "self_hosted")),
            ],
            vec![group(
                "storage.group.connection",
                &["mode", "bot_token", "chat_id", "api_base"],
            )],
        ),
        StorageType::Local => ConfigSchema::new(
            vec![
                ConfigField::new("root_path", FieldKind::String)
                    .required()
                    .rule(FieldRule::AbsPath),
                ConfigField::new("default_folder", FieldKind::String),
                ConfigField::new("naming_policy", FieldKind::Enum)
                    .enum_values(&["original", "random"])
                    .default_value("original"),
            ],
            vec![group(
                "storage.group.behavior",
                &["root_path", "default_folder", "naming_policy"],
            )],
        ),
        StorageType::Mirror => ConfigSchema::new(
            vec![
                ConfigField::new("upstream_url", FieldKind::String)
                    .required()
                    .rule(FieldRule::Url),
                ConfigField::new("cache_ttl_secs", FieldKind::Number).default_value(300),
            ],
            vec![group(
                "storage.group.connection",
                &["upstream_url", "cache_ttl_secs"],
            )],
        ),
    }
}
