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

//! Per-driver capability sets
//!
//! Declares which upload/download shapes a backend supports. The upload
//! pipeline negotiates against these flags before ever touching a driver.

use serde::{Deserialize, Serialize};

use crate::types::StorageType;

/// Upload shapes supported on the share path
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShareCapabilities {
    pub backend_stream: bool,
    pub backend_form: bool,
    pub presigned: bool,
    pub url: bool,
}

/// Upload shapes supported on the mounted-FS path
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FsCapabilities {
    pub backend_stream: bool,
    pub backend_form: bool,
    pub presigned_single: bool,
    pub multipart: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub share: ShareCapabilities,
    pub fs: FsCapabilities,
    /// Backend can serve a public URL directly (enables 302 redirects)
    pub direct_link: bool,
    pub read_only: bool,
}

/// Static capability set of a storage type
pub fn capabilities_for(storage_type: StorageType) -> Capabilities {
    match storage_type {
        StorageType::S3 => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned: true,
                url: true,
            },
            fs: FsCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned_single: true,
                multipart: true,
            },
            direct_link: true,
            read_only: false,
        },
        StorageType::Webdav => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned: false,
                url: true,
            },
            fs: FsCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned_single: false,
                multipart: false,
            },
            direct_link: false,
            read_only: false,
        },
        StorageType::Onedrive => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: false,
                presigned: true,
                url: true,
            },
            fs: FsCapabilities {
                backend_stream: true,
                backend_form: false,
                presigned_single: true,
                multipart: true,
            },
            direct_link: true,
            read_only: false,
        },
        StorageType::GoogleDrive => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: false,
                presigned: false,
                url: true,
            },
            fs: FsCapabilities {
                backend_stream: true,
                backend_form: false,
                presigned_single: false,
                multipart: false,
            },
            direct_link: false,
            read_only: false,
        },
        StorageType::GithubReleases => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: false,
                presigned: false,
                url: true,
            },
            fs: FsCapabilities::default(),
            direct_link: true,
            read_only: false,
        },
        StorageType::Telegram => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned: false,
                url: false,
            },
            fs: FsCapabilities::default(),
            direct_link: false,
            read_only: false,
        },
        StorageType::Local => Capabilities {
            share: ShareCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned: false,
                url: false,
            },
            fs: FsCapabilities {
                backend_stream: true,
                backend_form: true,
                presigned_single: false,
                multipart: false,
            },
            direct_link: false,
            read_only: false,
        },
        StorageType::Mirror => Capabilities {
            share: ShareCapabilities {
                backend_stream: false,
                backend_form: false,
                presigned: false,
                url: true,
            },
            fs: FsCapabilities::default(),
            direct_link: true,
            read_only: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_is_read_only() {
        let caps = capabilities_for(StorageType::Mirror);
        assert!(caps.read_only);
        assert!(!caps.share.backend_stream);
    }

    #[test]
    fn test_s3_supports_presign() {
        let caps = capabilities_for(StorageType::S3);
        assert!(caps.share.presigned);
        assert!(caps.fs.multipart);
        assert!(caps.direct_link);
    }
}
