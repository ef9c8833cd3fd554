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

//! Auth subjects
//!
//! Two kinds of caller: admins (opaque bearer tokens minted at login) and
//! API keys (presented verbatim). The subject carries everything the
//! services need for ACL gating and creator attribution.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;
use std::sync::Arc;

use cloudbin_core::{now_iso, Admin, AdminToken, ApiKey, AppError, AppResult};
use cloudbin_storage::{AdminRepo, AdminTokenRepo, ApiKeyRepo, Database};

/// Authenticated caller identity
#[derive(Debug, Clone)]
pub enum Subject {
    Admin { admin_id: String },
    ApiKey { key: ApiKey },
}

impl Subject {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    /// Identity recorded in `created_by` columns
    pub fn creator_id(&self) -> String {
        match self {
            Self::Admin { admin_id } => admin_id.clone(),
            Self::ApiKey { key } => key.subject(),
        }
    }

    /// ACL principal string; admins are not ACL-gated
    pub fn principal(&self) -> Option<String> {
        match self {
            Self::Admin { .. } => None,
            Self::ApiKey { key } => Some(key.subject()),
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::repository("password hashing failed"))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct AuthService {
    admins: AdminRepo,
    tokens: AdminTokenRepo,
    api_keys: ApiKeyRepo,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(db: Arc<dyn Database>, token_ttl_hours: i64) -> Self {
        Self {
            admins: AdminRepo::new(db.clone()),
            tokens: AdminTokenRepo::new(db.clone()),
            api_keys: ApiKeyRepo::new(db),
            token_ttl_hours,
        }
    }

    /// Verify credentials and mint a session token
    pub fn login(&self, username: &str, password: &str) -> AppResult<AdminToken> {
        let admin = self
            .admins
            .find_by_username(username)?
            .filter(|admin| verify_password(password, &admin.password))
            .ok_or_else(|| AppError::validation("invalid username or password"))?;

        let token = AdminToken {
            token: random_token(),
            admin_id: admin.id,
            expires_at: (Utc::now() + Duration::hours(self.token_ttl_hours))
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            created_at: now_iso(),
        };
        self.tokens.insert(&token)?;
        Ok(token)
    }

    pub fn verify_admin_token(&self, token: &str) -> AppResult<Subject> {
        let token = self
            .tokens
            .find_valid(token)?
            .ok_or_else(|| AppError::not_found("admin token invalid or expired"))?;
        // A token may outlive its admin; treat that the same as expiry
        if self.admins.get(&token.admin_id)?.is_none() {
            return Err(AppError::not_found("admin token invalid or expired"));
        }
        Ok(Subject::Admin {
            admin_id: token.admin_id,
        })
    }

    pub fn resolve_api_key(&self, key: &str) -> AppResult<Subject> {
        let api_key = self
            .api_keys
            .find_by_key(key)?
            .filter(|k| !k.is_expired(&now_iso()))
            .ok_or_else(|| AppError::not_found("api key invalid or expired"))?;
        // Usage tracking only; a failed write must not block the caller
        if let Err(e) = self.api_keys.touch_last_used(&api_key.id) {
            tracing::warn!(error = %e, "failed to update api key last_used");
        }
        Ok(Subject::ApiKey { key: api_key })
    }

    /// First-boot helper: create an admin with a hashed password
    pub fn create_admin(&self, id: &str, username: &str, password: &str) -> AppResult<Admin> {
        let now = now_iso();
        let admin = Admin {
            id: id.to_string(),
            username: username.to_string(),
            password: hash_password(password)?,
            created_at: now.clone(),
            updated_at: now,
        };
        self.admins.insert(&admin)?;
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbin_storage::{run_migrations, SqliteDatabase};

    fn service() -> AuthService {
        let db = SqliteDatabase::open_in_memory().unwrap();
        run_migrations(&db).unwrap();
        AuthService::new(Arc::new(db), 24)
    }

    #[test]
    fn test_login_round_trip() {
        let auth = service();
        auth.create_admin("a1", "root", "hunter2!").unwrap();

        let token = auth.login("root", "hunter2!").unwrap();
        let subject = auth.verify_admin_token(&token.token).unwrap();
        assert!(subject.is_admin());
        assert_eq!(subject.creator_id(), "a1");

        assert!(auth.login("root", "wrong").is_err());
        assert!(auth.verify_admin_token("bogus").is_err());
    }

    #[test]
    fn test_password_hash_is_not_plaintext() {
        let hash = hash_password("topsecret").unwrap();
        assert!(!hash.contains("topsecret"));
        assert!(verify_password("topsecret", &hash));
        assert!(!verify_password("other", &hash));
    }

    #[test]
    fn test_api_key_subject_strings() {
        let auth = service();
        let now = now_iso();
        let repo_key = ApiKey {
            id: "k1".to_string(),
            name: "ci".to_string(),
            key: "sk_abc".to_string(),
            text_permission: true,
            file_permission: true,
            mount_permission: false,
            basic_path: None,
            expires_at: None,
            last_used: None,
            created_at: now,
        };
        auth.api_keys.insert(&repo_key).unwrap();

        let subject = auth.resolve_api_key("sk_abc").unwrap();
        assert!(!subject.is_admin());
        assert_eq!(subject.creator_id(), "apikey:k1");
        assert_eq!(subject.principal().unwrap(), "apikey:k1");
    }
}
