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

//! HTTP API
//!
//! Thin adapters over the service layer: extract a subject, call the
//! service, map the error taxonomy onto status codes.

pub mod backup;
pub mod shares;
pub mod storage_configs;
pub mod system;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cloudbin_core::{AppError, ErrorKind};

use crate::auth::Subject;
use crate::state::AppState;

pub type ApiResult<T> = Result<T, ApiError>;

/// [`AppError`] carried through axum
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Driver => StatusCode::BAD_GATEWAY,
            ErrorKind::Repository => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": {
                "kind": self.0.kind().as_str(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Resolve the caller from `Authorization: Bearer` (admin token) or
/// `X-Api-Key`
pub fn subject_from_headers(state: &AppState, headers: &HeaderMap) -> ApiResult<Subject> {
    if let Some(bearer) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Ok(state.auth.verify_admin_token(bearer)?);
    }
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Ok(state.auth.resolve_api_key(key)?);
    }
    Err(ApiError(AppError::validation(
        "missing credentials: provide a bearer token or an api key",
    )))
}

pub fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    match subject_from_headers(state, headers)? {
        Subject::Admin { admin_id } => Ok(admin_id),
        Subject::ApiKey { .. } => Err(ApiError(AppError::validation(
            "this operation requires an admin session",
        ))),
    }
}

pub fn router(state: AppState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(system::health))
        .route("/api/auth/login", post(system::login))
        .route("/api/system/settings/:key", get(system::get_setting))
        .route("/api/system/settings", put(system::put_setting))
        .route("/api/system/scheduler/next-tick", get(system::next_tick))
        .route("/api/system/scheduler/tick", post(system::record_tick))
        .route("/api/storage-types", get(storage_configs::storage_types))
        .route(
            "/api/storage-configs",
            get(storage_configs::list).post(storage_configs::create),
        )
        .route(
            "/api/storage-configs/public",
            get(storage_configs::list_public),
        )
        .route(
            "/api/storage-configs/:id",
            get(storage_configs::get_one)
                .put(storage_configs::update)
                .delete(storage_configs::delete),
        )
        .route(
            "/api/storage-configs/:id/reveal",
            get(storage_configs::reveal),
        )
        .route(
            "/api/storage-configs/:id/default",
            post(storage_configs::set_default),
        )
        .route(
            "/api/storage-configs/:id/test",
            post(storage_configs::test_connection),
        )
        .route(
            "/api/storage-configs/:id/webdav-policies",
            get(storage_configs::webdav_policies),
        )
        .route("/api/usage", get(shares::usage_report))
        .route("/api/shares/upload", post(shares::upload_direct))
        .route("/api/shares/presign", post(shares::presign_init))
        .route("/api/shares/presign/commit", post(shares::presign_commit))
        .route("/api/shares/from-fs", post(shares::create_from_fs))
        .route("/api/shares/validate-url", get(shares::validate_url))
        .route("/api/shares/:slug", get(shares::get_share))
        .route("/api/admin/backup", post(backup::create_backup))
        .route("/api/admin/backup/preview", post(backup::preview_restore))
        .route("/api/admin/backup/restore", post(backup::restore_backup))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}
