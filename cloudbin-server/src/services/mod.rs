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

//! Service layer

pub mod backup;
pub mod quota;
pub mod scheduler;
pub mod settings;
pub mod storage_config;
pub mod upload;

pub use backup::BackupService;
pub use quota::{ComputedUsage, ConfigUsageReport, LimitStatus, QuotaService};
pub use scheduler::{NextTickEstimate, SchedulerService};
pub use settings::{SettingsService, DEFAULT_MAX_UPLOAD_SIZE_BYTES};
pub use storage_config::{
    ConnectionReport, RevealMode, StorageConfigInput, StorageConfigService,
};
pub use upload::{
    FsShareRequest, PresignCommitRequest, PresignInitResponse, ShareOptions, UploadRequest,
    UploadService, UrlMetadata,
};
