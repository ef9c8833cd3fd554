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

//! Share upload pipeline
//!
//! Every upload, whatever its shape, walks the same prologue: system size
//! ceiling, ACL-aware config resolution, backend-specific caps, planned-key
//! quota admission. Only then does a driver see bytes, and only after the
//! driver succeeds does a share record exist.

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use cloudbin_core::{now_iso, AppError, AppResult, FileShare, SecretCipher, StorageConfig};
use cloudbin_drivers::{
    telegram_is_official, DriverRegistry, PresignedUpload, StorageDriver, StorageType,
    TELEGRAM_OFFICIAL_MAX_BYTES,
};
use cloudbin_storage::{Database, FileShareRepo};

use crate::auth::{hash_password, Subject};
use crate::services::quota::QuotaService;
use crate::services::settings::SettingsService;
use crate::services::storage_config::StorageConfigService;

/// Default HEAD/GET probe timeout for URL validation
pub const DEFAULT_URL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Slug alphabet without lookalike characters
const SLUG_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const SLUG_LEN: usize = 6;
const SLUG_SUFFIX_LEN: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareOptions {
    pub slug: Option<String>,
    #[serde(default)]
    pub update_if_exists: bool,
    pub password: Option<String>,
    pub expires_at: Option<String>,
    pub max_views: Option<i64>,
    #[serde(default)]
    pub use_proxy: bool,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// Declared size; streams use the actual body length instead
    pub size: Option<i64>,
    pub mimetype: Option<String>,
    pub storage_config_id: Option<String>,
    pub folder: Option<String>,
    #[serde(default)]
    pub share: ShareOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignInitResponse {
    pub storage_config_id: String,
    pub presigned: PresignedUpload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignCommitRequest {
    pub storage_config_id: String,
    pub storage_path: String,
    pub filename: String,
    pub size: Option<i64>,
    pub etag: Option<String>,
    pub mimetype: Option<String>,
    #[serde(default)]
    pub share: ShareOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsShareRequest {
    pub storage_config_id: String,
    /// FS-origin path the share points back at
    pub file_path: String,
    pub storage_path: String,
    pub filename: Option<String>,
    pub mimetype: Option<String>,
    #[serde(default)]
    pub share: ShareOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    pub url: String,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub last_modified: Option<String>,
    pub filename: String,
}

pub struct UploadService {
    configs: Arc<StorageConfigService>,
    config_repo: cloudbin_storage::StorageConfigRepo,
    acl: cloudbin_storage::AclRepo,
    mounts: cloudbin_storage::MountRepo,
    quota: QuotaService,
    settings: SettingsService,
    registry: Arc<DriverRegistry>,
    cipher: SecretCipher,
    shares: FileShareRepo,
    http: reqwest::Client,
    url_probe_timeout: Duration,
}

impl UploadService {
    pub fn new(
        db: Arc<dyn Database>,
        configs: Arc<StorageConfigService>,
        registry: Arc<DriverRegistry>,
        cipher: SecretCipher,
    ) -> Self {
        Self {
            configs,
            config_repo: cloudbin_storage::StorageConfigRepo::new(db.clone()),
            acl: cloudbin_storage::AclRepo::new(db.clone()),
            mounts: cloudbin_storage::MountRepo::new(db.clone()),
            quota: QuotaService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            registry,
            cipher,
            shares: FileShareRepo::new(db),
            http: reqwest::Client::new(),
            url_probe_timeout: DEFAULT_URL_PROBE_TIMEOUT,
        }
    }

    pub fn with_url_probe_timeout(mut self, timeout: Duration) -> Self {
        self.url_probe_timeout = timeout;
        self
    }

    // ------------------------------------------------------------------
    // Config resolution (ACL-aware)
    // ------------------------------------------------------------------

    /// Resolve which storage config an upload lands in
    ///
    /// API-key subjects may only use public configs, and only those in
    /// their ACL allow-set when one exists. Admins skip the public check.
    pub fn resolve_config(
        &self,
        subject: &Subject,
        requested: Option<&str>,
    ) -> AppResult<StorageConfig> {
        let allowed = match subject.principal() {
            Some(principal) => Some(self.quota_acl_allowed(&principal)?),
            None => None,
        };

        if let Some(id) = requested {
            let config = self.configs.get_raw(id)?;
            if !subject.is_admin() {
                if !config.is_public {
                    return Err(AppError::validation(format!(
                        "storage config {} is not public",
                        id
                    )));
                }
                if let Some(allowed) = &allowed {
                    if !allowed.is_empty() && !allowed.iter().any(|a| a == id) {
                        return Err(AppError::validation(format!(
                            "storage config {} is not allowed for this api key",
                            id
                        )));
                    }
                }
            }
            return Ok(config);
        }

        if let Subject::Admin { admin_id } = subject {
            if let Some(default) = self.configs_repo_default(admin_id)? {
                return Ok(default);
            }
        }

        // First allowed entry of the public (API key) or full (admin) list
        let candidates = if subject.is_admin() {
            self.configs_repo_list()?
        } else {
            self.configs_repo_list_public()?
        };
        candidates
            .into_iter()
            .find(|config| match &allowed {
                Some(allowed) if !allowed.is_empty() => {
                    allowed.iter().any(|a| a == &config.id)
                }
                _ => true,
            })
            .ok_or_else(|| AppError::validation("no usable storage config"))
    }

    // Raw-row accessors: the pipeline needs ciphertext rows for the driver
    fn configs_repo_default(&self, admin_id: &str) -> AppResult<Option<StorageConfig>> {
        self.config_repo.find_default(admin_id)
    }

    fn configs_repo_list(&self) -> AppResult<Vec<StorageConfig>> {
        self.config_repo.list()
    }

    fn configs_repo_list_public(&self) -> AppResult<Vec<StorageConfig>> {
        self.config_repo.list_public()
    }

    fn quota_acl_allowed(&self, principal: &str) -> AppResult<Vec<String>> {
        self.acl.allowed_config_ids(principal)
    }

    // ------------------------------------------------------------------
    // Common prologue
    // ------------------------------------------------------------------

    async fn prologue(
        &self,
        subject: &Subject,
        requested_config: Option<&str>,
        folder: Option<&str>,
        filename: &str,
        incoming_bytes: i64,
    ) -> AppResult<(StorageConfig, Arc<dyn StorageDriver>, String)> {
        let max_upload = self.settings.max_upload_size()?;
        if incoming_bytes > max_upload {
            return Err(AppError::validation(format!(
                "upload of {} bytes exceeds the system limit of {} bytes",
                incoming_bytes, max_upload
            )));
        }

        let config = self.resolve_config(subject, requested_config)?;

        if matches!(
            StorageType::from_str(&config.storage_type),
            Ok(StorageType::Telegram)
        ) && telegram_is_official(&config)
            && incoming_bytes > TELEGRAM_OFFICIAL_MAX_BYTES
        {
            return Err(AppError::validation(
                "official Telegram bots cap uploads at 20 MiB; switch the config to a self-hosted bot server for larger files",
            ));
        }

        let plain = self.configs.decrypt_secrets(&config)?;
        let driver = self.registry.connect(&plain, &self.cipher)?;
        if driver.capabilities().read_only {
            return Err(AppError::validation(format!(
                "storage type {} is read-only",
                config.storage_type
            )));
        }

        let planned_key = driver.plan_key(folder, filename).await?;
        let old_bytes = self.quota.old_bytes_for_key(&config.id, &planned_key)?;
        self.quota
            .assert_can_consume(&config.id, incoming_bytes, old_bytes, "share_upload")?;

        Ok((config, driver, planned_key))
    }

    // ------------------------------------------------------------------
    // Upload shapes
    // ------------------------------------------------------------------

    pub async fn upload_direct_stream(
        &self,
        subject: &Subject,
        request: &UploadRequest,
        body: Bytes,
    ) -> AppResult<FileShare> {
        let (config, driver, key) = self
            .prologue(
                subject,
                request.storage_config_id.as_deref(),
                request.folder.as_deref(),
                &request.filename,
                body.len() as i64,
            )
            .await?;
        if !driver.capabilities().share.backend_stream {
            return Err(AppError::validation(format!(
                "storage type {} does not accept streamed uploads",
                config.storage_type
            )));
        }

        let outcome = driver
            .upload(&key, body, request.mimetype.as_deref())
            .await?;
        self.create_share_record(
            subject,
            &config,
            &outcome.storage_path,
            outcome.size,
            &request.filename,
            request.mimetype.as_deref(),
            outcome.etag.as_deref(),
            None,
            &request.share,
        )
    }

    /// Whole-file form upload; same pipeline, negotiated against the form
    /// capability instead of the stream one
    pub async fn upload_file_object(
        &self,
        subject: &Subject,
        request: &UploadRequest,
        body: Bytes,
    ) -> AppResult<FileShare> {
        let (config, driver, key) = self
            .prologue(
                subject,
                request.storage_config_id.as_deref(),
                request.folder.as_deref(),
                &request.filename,
                body.len() as i64,
            )
            .await?;
        if !driver.capabilities().share.backend_form {
            return Err(AppError::validation(format!(
                "storage type {} does not accept form uploads",
                config.storage_type
            )));
        }

        let outcome = driver
            .upload(&key, body, request.mimetype.as_deref())
            .await?;
        self.create_share_record(
            subject,
            &config,
            &outcome.storage_path,
            outcome.size,
            &request.filename,
            request.mimetype.as_deref(),
            outcome.etag.as_deref(),
            None,
            &request.share,
        )
    }

    pub async fn presign_init(
        &self,
        subject: &Subject,
        request: &UploadRequest,
    ) -> AppResult<PresignInitResponse> {
        let declared = request.size.unwrap_or(0);
        let (config, driver, key) = self
            .prologue(
                subject,
                request.storage_config_id.as_deref(),
                request.folder.as_deref(),
                &request.filename,
                declared,
            )
            .await?;
        if !driver.capabilities().share.presigned {
            return Err(AppError::validation(format!(
                "storage type {} does not support presigned uploads",
                config.storage_type
            )));
        }

        let presigned = driver.presign_upload(&key, 3600).await?;
        Ok(PresignInitResponse {
            storage_config_id: config.id,
            presigned,
        })
    }

    /// After the client finished a presigned upload: confirm the object
    /// exists backend-side, then create the share record
    pub async fn presign_commit(
        &self,
        subject: &Subject,
        request: &PresignCommitRequest,
    ) -> AppResult<FileShare> {
        let config = self.resolve_config(subject, Some(&request.storage_config_id))?;
        let plain = self.configs.decrypt_secrets(&config)?;
        let driver = self.registry.connect(&plain, &self.cipher)?;

        let stat = driver.stat(&request.storage_path).await?.ok_or_else(|| {
            AppError::validation(format!(
                "no object found at {}; the presigned upload did not complete",
                request.storage_path
            ))
        })?;
        let size = request.size.unwrap_or(stat.size);

        self.create_share_record(
            subject,
            &config,
            &request.storage_path,
            size,
            &request.filename,
            request.mimetype.as_deref(),
            request.etag.as_deref().or(stat.etag.as_deref()),
            None,
            &request.share,
        )
    }

    /// Share an object that already lives behind a mount
    pub async fn create_share_from_fs(
        &self,
        subject: &Subject,
        request: &FsShareRequest,
    ) -> AppResult<FileShare> {
        let config = self.resolve_config(subject, Some(&request.storage_config_id))?;

        // The virtual path must resolve through one of this config's mounts
        let mounted = self
            .mounts
            .list_by_config(&config.id)?
            .into_iter()
            .any(|mount| mount.enabled && request.file_path.starts_with(&mount.mount_path));
        if !mounted {
            return Err(AppError::validation(format!(
                "{} is not under any enabled mount of this storage config",
                request.file_path
            )));
        }

        let plain = self.configs.decrypt_secrets(&config)?;
        let driver = self.registry.connect(&plain, &self.cipher)?;

        let stat = driver.stat(&request.storage_path).await?.ok_or_else(|| {
            AppError::not_found(format!("no object at {}", request.storage_path))
        })?;

        let filename = request
            .filename
            .clone()
            .unwrap_or_else(|| tail_filename(&request.file_path));
        self.create_share_record(
            subject,
            &config,
            &request.storage_path,
            stat.size,
            &filename,
            request.mimetype.as_deref(),
            stat.etag.as_deref(),
            Some(request.file_path.clone()),
            &request.share,
        )
    }

    // ------------------------------------------------------------------
    // Record creation and slug policy
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn create_share_record(
        &self,
        subject: &Subject,
        config: &StorageConfig,
        storage_path: &str,
        size: i64,
        filename: &str,
        mimetype: Option<&str>,
        etag: Option<&str>,
        file_path: Option<String>,
        options: &ShareOptions,
    ) -> AppResult<FileShare> {
        let (slug, overwrite) =
            self.resolve_slug(options.slug.as_deref(), options.update_if_exists)?;

        let password = options
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(hash_password)
            .transpose()?;

        let now = now_iso();
        let share = FileShare {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.clone(),
            filename: filename.to_string(),
            storage_config_id: config.id.clone(),
            storage_path: storage_path.to_string(),
            file_path,
            size,
            mimetype: mimetype.map(str::to_string),
            etag: etag.map(str::to_string),
            use_proxy: options.use_proxy,
            remark: options.remark.clone(),
            password,
            expires_at: options.expires_at.clone(),
            max_views: options.max_views,
            views: 0,
            created_by: subject.creator_id(),
            created_at: now.clone(),
            updated_at: now,
        };

        if overwrite {
            self.shares.replace_by_slug(&share)?;
        } else {
            self.shares.insert(&share)?;
        }
        info!(
            slug,
            storage_config_id = config.id,
            size,
            overwrite,
            "created file share"
        );
        // Return the stored row so an overwrite reflects the kept id
        let stored = self
            .shares
            .find_by_slug(&slug)?
            .ok_or_else(|| AppError::repository("share row missing after write"))?;

        // Recoverable sidecar so the owner can re-read the share password
        if let Some(password) = options.password.as_deref().filter(|p| !p.is_empty()) {
            self.shares
                .set_password_ciphertext(&stored.id, &self.cipher.encrypt(password)?)?;
        }
        Ok(stored)
    }

    fn resolve_slug(
        &self,
        requested: Option<&str>,
        update_if_exists: bool,
    ) -> AppResult<(String, bool)> {
        let random_suffix = self.settings.use_random_suffix()?;

        if let Some(requested) = requested.filter(|s| !s.is_empty()) {
            if !is_valid_slug(requested) {
                return Err(AppError::validation(format!(
                    "invalid slug: {} (letters, digits, dash and underscore only)",
                    requested
                )));
            }
            if self.shares.find_by_slug(requested)?.is_none() {
                return Ok((requested.to_string(), false));
            }
            if random_suffix {
                // Collision under suffix mode: mint a fresh variant
                loop {
                    let candidate =
                        format!("{}-{}", requested, random_slug(SLUG_SUFFIX_LEN));
                    if self.shares.find_by_slug(&candidate)?.is_none() {
                        return Ok((candidate, false));
                    }
                }
            }
            if update_if_exists {
                return Ok((requested.to_string(), true));
            }
            return Err(AppError::validation(format!(
                "slug already in use: {}",
                requested
            )));
        }

        loop {
            let candidate = random_slug(SLUG_LEN);
            if self.shares.find_by_slug(&candidate)?.is_none() {
                return Ok((candidate, false));
            }
        }
    }

    // ------------------------------------------------------------------
    // URL metadata
    // ------------------------------------------------------------------

    /// Probe a URL with HEAD, falling back to GET, and extract metadata
    ///
    /// URL-shape problems are validation errors; network problems are
    /// driver errors.
    pub async fn validate_url_metadata(&self, raw_url: &str) -> AppResult<UrlMetadata> {
        let parsed = url::Url::parse(raw_url)
            .map_err(|e| AppError::validation(format!("invalid URL {}: {}", raw_url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::validation("only http and https URLs are accepted"));
        }

        let response = match self
            .http
            .head(parsed.clone())
            .timeout(self.url_probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            // Some origins refuse HEAD; retry with GET before giving up
            _ => self
                .http
                .get(parsed.clone())
                .timeout(self.url_probe_timeout)
                .send()
                .await
                .map_err(|e| AppError::driver_with(format!("failed to reach {}", raw_url), e))
                .and_then(|response| {
                    if response.status().is_success() {
                        Ok(response)
                    } else {
                        Err(AppError::driver(format!(
                            "{} answered {}",
                            raw_url,
                            response.status()
                        )))
                    }
                })?,
        };

        let headers = response.headers();
        let content_type = header_str(headers, "content-type");
        let content_length = header_str(headers, "content-length").and_then(|v| v.parse().ok());
        let last_modified = header_str(headers, "last-modified");
        let disposition = header_str(headers, "content-disposition");

        Ok(UrlMetadata {
            filename: pick_filename(&parsed, disposition.as_deref()),
            url: raw_url.to_string(),
            content_type,
            content_length,
            last_modified,
        })
    }

    /// Fetch a URL's body for proxy serving
    pub async fn proxy_url_content(&self, raw_url: &str) -> AppResult<(UrlMetadata, Bytes)> {
        let metadata = self.validate_url_metadata(raw_url).await?;
        let response = self
            .http
            .get(raw_url)
            .send()
            .await
            .map_err(|e| AppError::driver_with(format!("failed to fetch {}", raw_url), e))?;
        if !response.status().is_success() {
            return Err(AppError::driver(format!(
                "{} answered {}",
                raw_url,
                response.status()
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::driver_with("failed to read response body", e))?;
        Ok((metadata, body))
    }
}

fn header_str(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn random_slug(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
        .collect()
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 64
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn tail_filename(path: &str) -> String {
    path.rsplit('/')
        .find(|seg| !seg.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// Filename precedence: URL path tail with an extension, then the
/// Content-Disposition filename, then the path tail, then `download`
fn pick_filename(url: &url::Url, disposition: Option<&str>) -> String {
    let tail = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("")
        .to_string();
    if tail.contains('.') {
        return tail;
    }
    if let Some(from_disposition) = disposition.and_then(parse_disposition_filename) {
        return from_disposition;
    }
    if !tail.is_empty() {
        return tail;
    }
    "download".to_string()
}

fn parse_disposition_filename(disposition: &str) -> Option<String> {
    for part in disposition.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("filename=") {
            let cleaned = value.trim_matches('"').trim();
            if !cleaned.is_empty() {
                return Some(cleaned.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbin_core::ApiKey;
    use cloudbin_storage::{
        run_migrations, AclRepo, MetricsRepo, SqlStatement, SqlValue, SqliteDatabase,
    };
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Arc<dyn Database>,
        service: UploadService,
        configs: Arc<StorageConfigService>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        let db: Arc<dyn Database> = Arc::new(db);
        db.execute(&SqlStatement::new(
            "INSERT INTO admins (id, username, password, created_at, updated_at) \
             VALUES ('a1', 'root', 'x', ?1, ?1)",
            vec![SqlValue::Text(now_iso())],
        ))
        .unwrap();

        let registry = Arc::new(DriverRegistry::new());
        let cipher = SecretCipher::new("unit-test-secret");
        let configs = Arc::new(StorageConfigService::new(
            db.clone(),
            registry.clone(),
            cipher.clone(),
        ));
        let service = UploadService::new(db.clone(), configs.clone(), registry, cipher);

        let input = crate::services::storage_config::StorageConfigInput {
            name: Some("disk".to_string()),
            storage_type: Some("local".to_string()),
            is_public: Some(true),
            config: json!({"root_path": dir.path().to_str().unwrap()})
                .as_object()
                .unwrap()
                .clone(),
            ..Default::default()
        };
        configs.create("a1", &input).unwrap();

        Fixture {
            _dir: dir,
            db,
            service,
            configs,
        }
    }

    fn admin() -> Subject {
        Subject::Admin {
            admin_id: "a1".to_string(),
        }
    }

    fn api_key_subject() -> Subject {
        Subject::ApiKey {
            key: ApiKey {
                id: "k1".to_string(),
                name: "ci".to_string(),
                key: "sk_abc".to_string(),
                text_permission: true,
                file_permission: true,
                mount_permission: false,
                basic_path: None,
                expires_at: None,
                last_used: None,
                created_at: now_iso(),
            },
        }
    }

    #[tokio::test]
    async fn test_direct_upload_creates_share() {
        let fx = fixture();
        let request = UploadRequest {
            filename: "report.pdf".to_string(),
            mimetype: Some("application/pdf".to_string()),
            ..UploadRequest::default()
        };
        let share = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"pdf-bytes"))
            .await
            .unwrap();
        assert_eq!(share.size, 9);
        assert_eq!(share.filename, "report.pdf");
        assert_eq!(share.created_by, "a1");
        assert_eq!(share.slug.len(), SLUG_LEN);
    }

    #[tokio::test]
    async fn test_oversize_rejected_before_driver() {
        let fx = fixture();
        SettingsService::new(fx.db.clone())
            .set(crate::services::settings::SETTING_MAX_UPLOAD_SIZE, "4")
            .unwrap();
        let request = UploadRequest {
            filename: "big.bin".to_string(),
            ..UploadRequest::default()
        };
        let err = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"12345"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds the system limit"));
    }

    #[tokio::test]
    async fn test_api_key_requires_public_and_acl() {
        let fx = fixture();
        let config_id = fx.configs.list().unwrap()[0].id.clone();

        // Public config with empty ACL: allowed
        let request = UploadRequest {
            filename: "a.txt".to_string(),
            storage_config_id: Some(config_id.clone()),
            ..UploadRequest::default()
        };
        fx.service
            .upload_direct_stream(&api_key_subject(), &request, Bytes::from_static(b"x"))
            .await
            .unwrap();

        // Non-empty ACL that does not list this config: rejected
        let other_input = crate::services::storage_config::StorageConfigInput {
            name: Some("other".to_string()),
            storage_type: Some("local".to_string()),
            is_public: Some(true),
            config: json!({"root_path": "/tmp"}).as_object().unwrap().clone(),
            ..Default::default()
        };
        let other = fx.configs.create("a1", &other_input).unwrap();
        AclRepo::new(fx.db.clone())
            .grant("apikey:k1", &other.id)
            .unwrap();
        let err = fx
            .service
            .upload_direct_stream(&api_key_subject(), &request, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not allowed"));

        // Listing the config restores access
        AclRepo::new(fx.db.clone())
            .grant("apikey:k1", &config_id)
            .unwrap();
        fx.service
            .upload_direct_stream(&api_key_subject(), &request, Bytes::from_static(b"x"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_quota_rejection_uses_planned_key() {
        let fx = fixture();
        let config_id = fx.configs.list().unwrap()[0].id.clone();
        // Limit 1000, used 990
        fx.configs
            .update(
                &config_id,
                &crate::services::storage_config::StorageConfigInput {
                    total_storage_bytes: Some(json!(1000)),
                    ..Default::default()
                },
            )
            .unwrap();
        MetricsRepo::new(fx.db.clone())
            .put_computed_usage(&config_id, 990, "object_scan", None)
            .unwrap();

        let request = UploadRequest {
            filename: "block.bin".to_string(),
            ..UploadRequest::default()
        };
        let err = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from(vec![0u8; 100]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn test_slug_overwrite_policy() {
        let fx = fixture();
        SettingsService::new(fx.db.clone())
            .set(crate::services::settings::SETTING_USE_RANDOM_SUFFIX, "0")
            .unwrap();

        let request = UploadRequest {
            filename: "a.txt".to_string(),
            share: ShareOptions {
                slug: Some("mydoc".to_string()),
                ..ShareOptions::default()
            },
            ..UploadRequest::default()
        };
        let first = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(first.slug, "mydoc");

        // Same slug without update_if_exists: rejected
        let err = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"two"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));

        // With update_if_exists: overwrites, id is kept
        let overwrite = UploadRequest {
            filename: "b.txt".to_string(),
            share: ShareOptions {
                slug: Some("mydoc".to_string()),
                update_if_exists: true,
                ..ShareOptions::default()
            },
            ..UploadRequest::default()
        };
        let second = fx
            .service
            .upload_direct_stream(&admin(), &overwrite, Bytes::from_static(b"two"))
            .await
            .unwrap();
        assert_eq!(second.slug, "mydoc");
        assert_eq!(second.id, first.id);
        assert_eq!(second.filename, "b.txt");
    }

    #[tokio::test]
    async fn test_slug_suffix_policy() {
        let fx = fixture();
        // Suffix mode is the default
        let request = UploadRequest {
            filename: "a.txt".to_string(),
            share: ShareOptions {
                slug: Some("mydoc".to_string()),
                ..ShareOptions::default()
            },
            ..UploadRequest::default()
        };
        let first = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"one"))
            .await
            .unwrap();
        let second = fx
            .service
            .upload_direct_stream(&admin(), &request, Bytes::from_static(b"two"))
            .await
            .unwrap();
        assert_eq!(first.slug, "mydoc");
        assert!(second.slug.starts_with("mydoc-"));
        assert_ne!(first.slug, second.slug);
    }

    #[tokio::test]
    async fn test_fs_share_requires_an_enabled_mount() {
        let fx = fixture();
        let config_id = fx.configs.list().unwrap()[0].id.clone();

        // Put an object into the backend through the normal pipeline first
        let upload = UploadRequest {
            filename: "doc.txt".to_string(),
            storage_config_id: Some(config_id.clone()),
            ..UploadRequest::default()
        };
        let uploaded = fx
            .service
            .upload_direct_stream(&admin(), &upload, Bytes::from_static(b"content"))
            .await
            .unwrap();

        let request = FsShareRequest {
            storage_config_id: config_id.clone(),
            file_path: "/media/doc.txt".to_string(),
            storage_path: uploaded.storage_path.clone(),
            filename: None,
            mimetype: None,
            share: ShareOptions::default(),
        };

        // No mount covers /media yet
        let err = fx
            .service
            .create_share_from_fs(&admin(), &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mount"));

        let now = now_iso();
        cloudbin_storage::MountRepo::new(fx.db.clone())
            .insert(&cloudbin_core::StorageMount {
                id: "m1".to_string(),
                name: "media".to_string(),
                storage_config_id: config_id,
                mount_path: "/media".to_string(),
                enabled: true,
                remark: None,
                created_by: "a1".to_string(),
                created_at: now.clone(),
                updated_at: now,
            })
            .unwrap();

        let share = fx
            .service
            .create_share_from_fs(&admin(), &request)
            .await
            .unwrap();
        assert_eq!(share.file_path.as_deref(), Some("/media/doc.txt"));
        assert_eq!(share.filename, "doc.txt");
        assert_eq!(share.size, 7);
    }

    #[tokio::test]
    async fn test_invalid_url_is_validation_error() {
        let fx = fixture();
        let err = fx
            .service
            .validate_url_metadata("not a url")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);

        let err = fx
            .service
            .validate_url_metadata("ftp://example.com/a.txt")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), cloudbin_core::ErrorKind::Validation);
    }

    #[test]
    fn test_filename_extraction() {
        let url = url::Url::parse("https://example.com/files/report.pdf?sig=1").unwrap();
        assert_eq!(pick_filename(&url, None), "report.pdf");

        let url = url::Url::parse("https://example.com/download").unwrap();
        assert_eq!(
            pick_filename(&url, Some("attachment; filename=\"backup.zip\"")),
            "backup.zip"
        );
        assert_eq!(pick_filename(&url, None), "download");

        let url = url::Url::parse("https://example.com/").unwrap();
        assert_eq!(pick_filename(&url, None), "download");
    }

    #[test]
    fn test_slug_charset() {
        assert!(is_valid_slug("abc-123_X"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("semi;colon"));
    }
}
