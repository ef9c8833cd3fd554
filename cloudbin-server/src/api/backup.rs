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

//! Backup and restore endpoints (admin)

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use cloudbin_storage::CancelToken;

use crate::api::{require_admin, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBackupRequest {
    /// "full" or "modules"
    pub backup_type: String,
    #[serde(default)]
    pub selected_modules: Vec<String>,
}

/// POST /api/admin/backup - the response body is the backup file itself
pub async fn create_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBackupRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let backup = state
        .backups
        .create_backup(&request.backup_type, request.selected_modules)?;
    Ok(Json(json!(backup)))
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub mode: String,
    pub backup_data: Value,
}

/// POST /api/admin/backup/preview - dry run, writes nothing
pub async fn preview_restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let preview = state
        .backups
        .preview_restore(&request.backup_data, &request.mode)?;
    Ok(Json(json!(preview)))
}

#[derive(Deserialize)]
pub struct RestoreRequest {
    pub mode: String,
    pub backup_data: Value,
    #[serde(default)]
    pub skip_integrity_check: bool,
    #[serde(default)]
    pub preserve_timestamps: bool,
}

/// POST /api/admin/backup/restore
pub async fn restore_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RestoreRequest>,
) -> ApiResult<Json<Value>> {
    let admin_id = require_admin(&state, &headers)?;
    let report = state.backups.restore_backup(
        &request.backup_data,
        &request.mode,
        Some(admin_id),
        request.skip_integrity_check,
        request.preserve_timestamps,
        &CancelToken::new(),
    )?;
    Ok(Json(json!(report)))
}
