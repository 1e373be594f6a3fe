//! Result and error types for Cotejo.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Cotejo operations
pub type CotejoResult<T> = Result<T, CotejoError>;

/// Errors that can occur while running a suite
#[derive(Debug, Error)]
pub enum CotejoError {
    /// Test tree could not be read at all (fatal for the suite)
    #[error("Test discovery failed under {root}: {message}")]
    Discovery {
        /// Test root that failed
        root: PathBuf,
        /// Error message
        message: String,
    },

    /// Working-directory allocation, copy, or removal failed (fails one test)
    #[error("Workspace error: {message}")]
    Workspace {
        /// Error message
        message: String,
    },

    /// Document host refused or failed an operation (fails one test)
    #[error("Document host error: {message}")]
    Host {
        /// Error message
        message: String,
    },

    /// Document host never became ready (fatal for the suite)
    #[error("Document host not ready after {waited_ms}ms")]
    HostNotReady {
        /// How long we polled before giving up
        waited_ms: u64,
    },

    /// The external image-diff tool failed to launch or exited non-zero
    #[error("Comparison tool failed: {message}")]
    ComparisonTool {
        /// Captured standard-error text (or launch failure message)
        message: String,
    },

    /// The image-diff binary could not be located
    #[error("Comparison tool not found at {path}")]
    ComparisonToolNotFound {
        /// Path that was probed
        path: PathBuf,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CotejoError {
    /// Create a discovery error
    #[must_use]
    pub fn discovery(root: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Discovery {
            root: root.into(),
            message: message.into(),
        }
    }

    /// Create a workspace error
    #[must_use]
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    /// Create a host error
    #[must_use]
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Create a comparison-tool error
    #[must_use]
    pub fn comparison_tool(message: impl Into<String>) -> Self {
        Self::ComparisonTool {
            message: message.into(),
        }
    }

    /// True for errors that abort the whole suite rather than one test
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Discovery { .. } | Self::HostNotReady { .. })
    }
}
