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

//! System endpoints: health, auth, settings, scheduler

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use cloudbin_core::now_ms;

use crate::api::{require_admin, ApiResult};
use crate::services::SchedulerService;
use crate::state::AppState;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let token = state.auth.login(&request.username, &request.password)?;
    Ok(Json(json!({
        "token": token.token,
        "expiresAt": token.expires_at,
    })))
}

/// GET /api/system/settings/:key (admin)
pub async fn get_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    Ok(Json(json!({
        "key": key,
        "value": state.settings.get(&key)?,
    })))
}

#[derive(Deserialize)]
pub struct PutSettingRequest {
    pub key: String,
    pub value: String,
}

/// PUT /api/system/settings (admin)
pub async fn put_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PutSettingRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    state.settings.set(&request.key, &request.value)?;
    Ok(Json(json!({"ok": true})))
}

#[derive(Deserialize)]
pub struct NextTickQuery {
    pub cron: String,
}

/// GET /api/system/scheduler/next-tick?cron=… (admin)
pub async fn next_tick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NextTickQuery>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let last_tick = state.scheduler.load_tick()?;
    let estimate = SchedulerService::compute_next_tick(
        &query.cron,
        &cloudbin_core::now_iso(),
        last_tick.map(|state| state.last_ms),
    );
    Ok(Json(json!(estimate)))
}

#[derive(Deserialize)]
pub struct RecordTickRequest {
    pub cron: Option<String>,
}

/// POST /api/system/scheduler/tick - called by the platform trigger
pub async fn record_tick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RecordTickRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    state.scheduler.upsert_tick(now_ms(), request.cron.as_deref())?;
    Ok(Json(json!({"ok": true})))
}
