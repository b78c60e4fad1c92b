// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Shaver.

use thiserror::Error;

use crate::types::LoadStatus;

/// A document or page could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    // -- Document load statuses --
    #[error("unable to open file ({path})")]
    File { path: String },

    #[error("file ({path}) is not a valid PDF")]
    Format { path: String },

    #[error("file ({path}) is encrypted")]
    Password { path: String },

    #[error("file ({path}) uses an unsupported security handler")]
    Security { path: String },

    #[error("could not find handler for media objects in file ({path})")]
    MissingHandler { path: String },

    #[error("failed to open file ({path})")]
    Unknown { path: String },

    // -- Lifecycle --
    #[error("document is not open")]
    NotOpened,

    #[error("document has already been released")]
    Released,

    #[error("page {index} could not be loaded")]
    PageUnavailable { index: usize },

    #[error("page {index} is not loaded")]
    PageNotLoaded { index: usize },

    #[error("page has already been released")]
    StalePage,
}

impl LoadError {
    /// Map an engine load status onto the error reported to callers.
    pub fn from_status(status: LoadStatus, path: impl Into<String>) -> Self {
        let path = path.into();
        match status {
            LoadStatus::File => Self::File { path },
            LoadStatus::Format => Self::Format { path },
            LoadStatus::Password => Self::Password { path },
            LoadStatus::Security => Self::Security { path },
            LoadStatus::Handler => Self::MissingHandler { path },
            LoadStatus::Unknown => Self::Unknown { path },
        }
    }
}

/// A request was rejected before any rendering resources were acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("can't save to unrecognized image format ({0})")]
    UnsupportedFormat(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Rendering failed after resources were acquired. Everything acquired has
/// been released by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("could not allocate a {width}x{height} bitmap")]
    Allocation { width: u32, height: u32 },

    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u64, height: u64 },

    #[error("bitmap geometry overflows: {width}x{height}, stride {stride}")]
    GeometryOverflow { width: i64, height: i64, stride: i64 },

    #[error("image conversion failed: {0}")]
    Codec(String),

    #[error("failed to save image to {path}: {reason}")]
    Save { path: String, reason: String },
}

/// Top-level error type for all Shaver operations.
#[derive(Debug, Error)]
pub enum ShaverError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ShaverError>;
