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

// End-to-end pipeline: bootstrap a server state over an in-memory
// database, create a local storage config, push an upload through the
// share pipeline, back everything up, and replay it into a second state.

use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use cloudbin_core::SecretCipher;
use cloudbin_drivers::DriverRegistry;
use cloudbin_server::services::{ShareOptions, StorageConfigInput, UploadRequest};
use cloudbin_server::{AppState, Subject};
use cloudbin_storage::{run_migrations, CancelToken, Database, SqliteDatabase};

fn state_over(db: Arc<dyn Database>) -> AppState {
    AppState::new(
        db,
        Arc::new(DriverRegistry::new()),
        SecretCipher::new("integration-secret"),
        24,
    )
}

fn fresh_state() -> AppState {
    let db = SqliteDatabase::open_in_memory().unwrap();
    run_migrations(&db).unwrap();
    let state = state_over(Arc::new(db));
    state.auth.create_admin("a1", "root", "hunter2!").unwrap();
    state
}

fn admin() -> Subject {
    Subject::Admin {
        admin_id: "a1".to_string(),
    }
}

#[tokio::test]
async fn upload_backup_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let state = fresh_state();

    // Storage config over a local directory
    let input = StorageConfigInput {
        name: Some("disk".to_string()),
        storage_type: Some("local".to_string()),
        is_public: Some(true),
        config: json!({"root_path": dir.path().to_str().unwrap()})
            .as_object()
            .unwrap()
            .clone(),
        ..StorageConfigInput::default()
    };
    let config = state.storage_configs.create("a1", &input).unwrap();

    // Upload through the share pipeline
    let request = UploadRequest {
        filename: "notes.txt".to_string(),
        mimetype: Some("text/plain".to_string()),
        storage_config_id: Some(config.id.clone()),
        share: ShareOptions {
            slug: Some("notes".to_string()),
            ..ShareOptions::default()
        },
        ..UploadRequest::default()
    };
    let share = state
        .uploads
        .upload_direct_stream(&admin(), &request, Bytes::from_static(b"remember this"))
        .await
        .unwrap();
    assert_eq!(share.slug, "notes");
    assert_eq!(share.size, 13);
    assert!(dir.path().join(&share.storage_path).exists());

    // Full backup carries the config and the share
    let backup = state.backups.create_backup("full", vec![]).unwrap();
    assert_eq!(backup.metadata.tables["storage_configs"], 1);
    assert_eq!(backup.metadata.tables["files"], 1);

    // Replay into a second, empty deployment owned by a different admin
    let target = fresh_state();
    // The target's seeded admin is 'a1'; remap ownership to it on merge
    let report = target
        .backups
        .restore_backup(
            &serde_json::to_value(&backup).unwrap(),
            "merge",
            Some("a1".to_string()),
            false,
            false,
            &CancelToken::new(),
        )
        .unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.results["files"].success, 1);

    let restored = target.storage_configs.get(&config.id).unwrap();
    assert_eq!(restored.name, "disk");
    assert_eq!(restored.admin_id, "a1");

    // The restored share resolves by slug
    let share_row = cloudbin_storage::FileShareRepo::new(target.db.clone())
        .find_by_slug("notes")
        .unwrap()
        .unwrap();
    assert_eq!(share_row.size, 13);
}

#[tokio::test]
async fn quota_snapshot_gates_second_upload() {
    let dir = TempDir::new().unwrap();
    let state = fresh_state();

    let input = StorageConfigInput {
        name: Some("disk".to_string()),
        storage_type: Some("local".to_string()),
        is_public: Some(true),
        total_storage_bytes: Some(json!(20)),
        config: json!({"root_path": dir.path().to_str().unwrap()})
            .as_object()
            .unwrap()
            .clone(),
        ..StorageConfigInput::default()
    };
    let config = state.storage_configs.create("a1", &input).unwrap();

    // No snapshot yet: admitted best-effort
    let request = UploadRequest {
        filename: "first.bin".to_string(),
        storage_config_id: Some(config.id.clone()),
        ..UploadRequest::default()
    };
    state
        .uploads
        .upload_direct_stream(&admin(), &request, Bytes::from(vec![0u8; 15]))
        .await
        .unwrap();

    // The usage calculator catches up; the next upload no longer fits
    cloudbin_storage::MetricsRepo::new(state.db.clone())
        .put_computed_usage(&config.id, 15, "object_scan", None)
        .unwrap();
    let second = UploadRequest {
        filename: "second.bin".to_string(),
        storage_config_id: Some(config.id.clone()),
        ..UploadRequest::default()
    };
    let err = state
        .uploads
        .upload_direct_stream(&admin(), &second, Bytes::from(vec![0u8; 10]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("quota"));
}
