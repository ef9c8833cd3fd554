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

//! Cloudbin Server
//!
//! The service layer of the sharing backend - storage-config lifecycle,
//! quota admission, the share upload pipeline, backup administration and
//! the scheduler tick ledger - plus the thin HTTP surface over it.

pub mod api;
pub mod auth;
pub mod config;
pub mod services;
pub mod state;

pub use auth::{hash_password, verify_password, AuthService, Subject};
pub use config::ServerConfig;
pub use state::AppState;
