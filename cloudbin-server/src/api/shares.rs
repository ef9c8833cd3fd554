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

//! Share upload endpoints

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use cloudbin_core::AppError;
use cloudbin_storage::FileShareRepo;

use crate::api::{require_admin, subject_from_headers, ApiError, ApiResult};
use crate::services::{FsShareRequest, PresignCommitRequest, UploadRequest};
use crate::state::AppState;

/// POST /api/shares/upload - multipart with an `options` JSON part and a
/// `file` part
pub async fn upload_direct(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let subject = subject_from_headers(&state, &headers)?;

    let mut request: Option<UploadRequest> = None;
    let mut body: Option<Bytes> = None;
    let mut fallback_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(AppError::validation(format!("invalid multipart body: {}", e))))?
    {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("options") => {
                let raw = field.text().await.map_err(|e| {
                    ApiError(AppError::validation(format!("unreadable options part: {}", e)))
                })?;
                let parsed = serde_json::from_str(&raw).map_err(|e| {
                    ApiError(AppError::validation(format!("invalid options JSON: {}", e)))
                })?;
                request = Some(parsed);
            }
            Some("file") => {
                fallback_filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    ApiError(AppError::validation(format!("unreadable file part: {}", e)))
                })?;
                body = Some(data);
            }
            _ => {}
        }
    }

    let body =
        body.ok_or_else(|| ApiError(AppError::validation("multipart body missing file part")))?;
    let mut request = request.unwrap_or_default();
    if request.filename.is_empty() {
        request.filename = fallback_filename
            .ok_or_else(|| ApiError(AppError::validation("upload needs a filename")))?;
    }

    let share = state
        .uploads
        .upload_direct_stream(&subject, &request, body)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(share))))
}

/// POST /api/shares/presign
pub async fn presign_init(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<Value>> {
    let subject = subject_from_headers(&state, &headers)?;
    let response = state.uploads.presign_init(&subject, &request).await?;
    Ok(Json(json!(response)))
}

/// POST /api/shares/presign/commit
pub async fn presign_commit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PresignCommitRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let subject = subject_from_headers(&state, &headers)?;
    let share = state.uploads.presign_commit(&subject, &request).await?;
    Ok((StatusCode::CREATED, Json(json!(share))))
}

/// POST /api/shares/from-fs
pub async fn create_from_fs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<FsShareRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let subject = subject_from_headers(&state, &headers)?;
    let share = state.uploads.create_share_from_fs(&subject, &request).await?;
    Ok((StatusCode::CREATED, Json(json!(share))))
}

#[derive(Deserialize)]
pub struct ValidateUrlQuery {
    pub url: String,
}

/// GET /api/shares/validate-url?url=…
pub async fn validate_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ValidateUrlQuery>,
) -> ApiResult<Json<Value>> {
    subject_from_headers(&state, &headers)?;
    let metadata = state.uploads.validate_url_metadata(&query.url).await?;
    Ok(Json(json!(metadata)))
}

/// GET /api/shares/:slug - public metadata lookup; counts as a view
pub async fn get_share(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let repo = FileShareRepo::new(state.db.clone());
    let share = repo
        .find_by_slug(&slug)?
        .filter(|share| !share.is_exhausted(&cloudbin_core::now_iso()))
        .ok_or_else(|| AppError::not_found(format!("share not found: {}", slug)))?;
    repo.increment_views(&slug)?;
    // Never expose the password hash on the public path
    let mut value = json!(share);
    value.as_object_mut().and_then(|o| o.remove("password"));
    Ok(Json(value))
}

/// GET /api/usage (admin)
pub async fn usage_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;
    Ok(Json(json!(state.quota.usage_report()?)))
}
