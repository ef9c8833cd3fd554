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

//! Storage-config endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{require_admin, subject_from_headers, ApiResult};
use crate::services::{RevealMode, StorageConfigInput};
use crate::state::AppState;

/// GET /api/storage-types
pub async fn storage_types(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.storage_configs.storage_type_specs()))
}

/// GET /api/storage-configs (admin)
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    Ok(Json(json!(state.storage_configs.list()?)))
}

/// GET /api/storage-configs/public
pub async fn list_public(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    subject_from_headers(&state, &headers)?;
    Ok(Json(json!(state.storage_configs.list_public()?)))
}

/// GET /api/storage-configs/:id
pub async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let subject = subject_from_headers(&state, &headers)?;
    let config = if subject.is_admin() {
        state.storage_configs.get(&id)?
    } else {
        state.storage_configs.get_public(&id)?
    };
    Ok(Json(json!(config)))
}

#[derive(Deserialize)]
pub struct RevealQuery {
    #[serde(default = "default_reveal_mode")]
    pub mode: RevealMode,
}

fn default_reveal_mode() -> RevealMode {
    RevealMode::Masked
}

/// GET /api/storage-configs/:id/reveal?mode=plain (admin)
pub async fn reveal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<RevealQuery>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    Ok(Json(json!(state.storage_configs.reveal(&id, query.mode)?)))
}

/// POST /api/storage-configs (admin)
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StorageConfigInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let admin_id = require_admin(&state, &headers)?;
    let created = state.storage_configs.create(&admin_id, &input)?;
    Ok((StatusCode::CREATED, Json(json!(created))))
}

/// PUT /api/storage-configs/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<StorageConfigInput>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    Ok(Json(json!(state.storage_configs.update(&id, &input)?)))
}

/// DELETE /api/storage-configs/:id (admin)
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_admin(&state, &headers)?;
    state.storage_configs.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/storage-configs/:id/default (admin)
pub async fn set_default(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let admin_id = require_admin(&state, &headers)?;
    state.storage_configs.set_default(&admin_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/storage-configs/:id/test (admin)
pub async fn test_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let origin = headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http://localhost");
    let report = state.storage_configs.test_connection(&id, origin).await?;
    Ok(Json(json!(report)))
}

/// GET /api/storage-configs/:id/webdav-policies
pub async fn webdav_policies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    subject_from_headers(&state, &headers)?;
    Ok(Json(json!({
        "policies": state.storage_configs.webdav_policies(&id)?,
    })))
}
