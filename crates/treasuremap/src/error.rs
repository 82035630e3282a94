//! Error types for treasuremap.
//!
//! This module defines all error types used throughout the treasuremap crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for treasuremap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Marker Errors ===
    /// The persisted marker list could not be parsed.
    #[error("stored markers under '{key}' are corrupt: {message}")]
    CorruptMarkers {
        /// The slot key that held the blob.
        key: String,
        /// Description of the parse failure.
        message: String,
    },

    /// A coordinate was not a finite number.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Export Errors ===
    /// The export receiver was found but did not accept the payload.
    #[error("failed to hand off export to '{target}': {message}")]
    Handoff {
        /// Name of the export target.
        target: String,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for treasuremap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a corrupt-markers error for the given slot key.
    #[must_use]
    pub fn corrupt_markers(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptMarkers {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a hand-off error for the named export target.
    #[must_use]
    pub fn handoff(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handoff {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Check if this error means the persisted markers could not be read.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptMarkers { .. })
    }

    /// Check if this error came from the export receiver.
    #[must_use]
    pub fn is_handoff_error(&self) -> bool {
        matches!(self, Self::Handoff { .. })
    }
}
