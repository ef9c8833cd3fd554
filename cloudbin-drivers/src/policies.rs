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

//! WebDAV supported-policy computation
//!
//! A derived view over a config: which serving policies the WebDAV surface
//! may offer for objects stored in it.

use std::str::FromStr;

use cloudbin_core::StorageConfig;

use crate::capability::capabilities_for;
use crate::types::StorageType;

/// Serve through the backend via this process
pub const POLICY_NATIVE_PROXY: &str = "native_proxy";
/// Serve through the configured URL-proxy base
pub const POLICY_USE_PROXY_URL: &str = "use_proxy_url";
/// Redirect the client straight at the backend
pub const POLICY_302_REDIRECT: &str = "302_redirect";

/// Policies a config supports: `native_proxy` always, `use_proxy_url` iff
/// a URL proxy is set, `302_redirect` iff the type declares direct links.
pub fn webdav_supported_policies(config: &StorageConfig) -> Vec<&'static str> {
    let mut policies = vec![POLICY_NATIVE_PROXY];
    if config
        .url_proxy
        .as_deref()
        .map(|p| !p.is_empty())
        .unwrap_or(false)
    {
        policies.push(POLICY_USE_PROXY_URL);
    }
    let direct_link = StorageType::from_str(&config.storage_type)
        .map(|t| capabilities_for(t).direct_link)
        .unwrap_or(false);
    if direct_link {
        policies.push(POLICY_302_REDIRECT);
    }
    policies
}
