// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Caller-facing taxonomy --
    /// Missing or incorrect password for a natively encrypted PDF.
    #[error("password required or incorrect: {0}")]
    Password(String),

    /// Input is not a structurally valid document.
    #[error("document is corrupt: {0}")]
    Corrupt(String),

    /// Envelope integrity check failed (wrong password or tampered file).
    #[error("incorrect password or damaged encrypted file")]
    Authentication,

    #[error("rendering failed: {0}")]
    Render(String),

    /// Caller-supplied options or files violate a precondition.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Legacy binary formats and other inputs we refuse outright.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    // -- Plumbing --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("container packaging failed: {0}")]
    Container(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    /// Prefix the message with the name of the file being processed, so that
    /// multi-file operations report which input failed.
    pub fn for_file(self, file_name: &str) -> Self {
        match self {
            Self::Password(msg) => Self::Password(format!("{file_name}: {msg}")),
            Self::Corrupt(msg) => Self::Corrupt(format!("{file_name}: {msg}")),
            Self::Render(msg) => Self::Render(format!("{file_name}: {msg}")),
            Self::UnsupportedFormat(msg) => {
                Self::UnsupportedFormat(format!("{file_name}: {msg}"))
            }
            Self::Pdf(msg) => Self::Pdf(format!("{file_name}: {msg}")),
            Self::Image(msg) => Self::Image(format!("{file_name}: {msg}")),
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
