// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stampwerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Stampwerk operations.
#[derive(Debug, Error)]
pub enum StampError {
    // -- Inputs --
    #[error("missing {what}: {}", path.display())]
    MissingInput { what: String, path: PathBuf },

    #[error("decorative asset {} is unusable: {reason}", path.display())]
    Asset { path: PathBuf, reason: String },

    #[error("font {} could not be registered: {reason}", path.display())]
    Font { path: PathBuf, reason: String },

    // -- Source document --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image {image} on page {page} could not be decoded: {reason}")]
    Decode {
        page: u32,
        image: usize,
        reason: String,
    },

    #[error(
        "{images} code images but only {text_blocks} text blocks; \
         stopped after {produced} complete vouchers"
    )]
    PairingShortfall {
        images: usize,
        text_blocks: usize,
        produced: usize,
    },

    // -- Output --
    #[error("voucher {index} could not be rendered to {}: {reason}", path.display())]
    Render {
        index: usize,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StampError {
    /// Whether the run can carry on after this error.
    ///
    /// Only a pairing shortfall is recoverable, and only when the caller has
    /// not asked for strict pairing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StampError::PairingShortfall { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StampError>;
