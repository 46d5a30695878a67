// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for scanflow.

use thiserror::Error;

/// Top-level error type for all scanflow operations.
///
/// Session-internal races (a task whose slot vanished, an out-of-range index)
/// are not errors and never show up here; they are reported as `bool` or
/// `Option` signals by the session itself.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Image / kernel errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("transform kernel failed: {0}")]
    Kernel(String),

    #[error("crop region too small: {extent:.3} < {minimum:.3}")]
    CropTooSmall { extent: f32, minimum: f32 },

    // -- Session / worker --
    #[error("scan session is empty")]
    EmptySession,

    #[error("transform worker is no longer running")]
    WorkerStopped,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
