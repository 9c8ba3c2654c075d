// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor error types.
//!
//! Every variant is recoverable: the host turns it into a transient notice
//! and the editor state stays as it was before the failed operation.

use thiserror::Error;

/// Errors raised by editor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("A class named \"{0}\" already exists")]
    DuplicateLabel(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("No images selected")]
    NothingSelected,
    #[error("Class transfer data is unusable: {0}")]
    TransferMalformed(String),
    #[error("Export failed: {0}")]
    ExportFailed(String),
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;
