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

//! Cloudbin Drivers
//!
//! Capability negotiation for heterogeneous object stores: the closed set
//! of storage-type tags, per-type config schemas and capability sets, the
//! async driver interface, and the registry that binds configs to
//! transports. The local-disk transport ships in-tree; remote transports
//! are registered by the embedding application.

pub mod capability;
pub mod driver;
pub mod local;
pub mod policies;
pub mod registry;
pub mod schema_defs;
pub mod types;

pub use capability::{capabilities_for, Capabilities, FsCapabilities, ShareCapabilities};
pub use driver::{
    ObjectStat, PresignedUpload, StorageDriver, TesterCheck, TesterReport, UploadOutcome,
};
pub use local::LocalDriver;
pub use policies::{
    webdav_supported_policies, POLICY_302_REDIRECT, POLICY_NATIVE_PROXY, POLICY_USE_PROXY_URL,
};
pub use registry::{driver_spec, driver_specs, provider_options, DriverRegistry, DriverSpec};
pub use schema_defs::config_schema;
pub use types::{telegram_is_official, StorageType, TELEGRAM_OFFICIAL_MAX_BYTES};
