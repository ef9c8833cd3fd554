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

//! Process-wide error taxonomy
//!
//! Four kinds cover every failure the services surface to a caller:
//!
//! - `Validation` - the caller's data is wrong (missing field, masked
//!   placeholder, oversize upload, unknown mode or table)
//! - `NotFound` - a named entity does not exist for the caller
//! - `Driver` - a downstream storage or HTTP failure, wrapped with its cause
//! - `Repository` - a database statement failed unexpectedly
//!
//! Wrapping preserves the kind: a `Driver` error stays a `Driver` error no
//! matter how many layers annotate it.

use thiserror::Error;

/// Result alias used across the workspace
pub type AppResult<T> = Result<T, AppError>;

/// Boxed source error carried by wrapped variants
type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant of [`AppError`], stable under wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Driver,
    Repository,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Driver => "driver",
            Self::Repository => "repository",
        }
    }
}

/// Application error with a preserved kind
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Driver {
        message: String,
        #[source]
        source: Option<Source>,
    },

    #[error("{message}")]
    Repository {
        message: String,
        #[source]
        source: Option<Source>,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            source: None,
        }
    }

    pub fn driver_with(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            source: None,
        }
    }

    pub fn repository_with(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Repository {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Driver { .. } => ErrorKind::Driver,
            Self::Repository { .. } => ErrorKind::Repository,
        }
    }

    /// Annotate the message without changing the kind
    pub fn context(self, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref();
        match self {
            Self::Validation(m) => Self::Validation(format!("{}: {}", prefix, m)),
            Self::NotFound(m) => Self::NotFound(format!("{}: {}", prefix, m)),
            Self::Driver { message, source } => Self::Driver {
                message: format!("{}: {}", prefix, message),
                source,
            },
            Self::Repository { message, source } => Self::Repository {
                message: format!("{}: {}", prefix, message),
                source,
            },
        }
    }
}
