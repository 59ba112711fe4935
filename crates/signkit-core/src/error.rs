//! Error types for the signkit core library.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Core error type for signing setup.
#[derive(Error, Debug)]
pub enum SignkitError {
    #[error("keytool not found (install a JDK or add its bin directory to PATH)")]
    KeytoolNotFound,

    #[error("keytool at {path} is not usable: {message}")]
    KeytoolUnusable { path: PathBuf, message: String },

    #[error("keytool failed ({status}): {diagnostics}")]
    KeytoolFailed {
        status: ExitStatus,
        diagnostics: String,
    },

    #[error("Keystore already exists: {0}")]
    KeystoreExists(PathBuf),

    #[error("Directory does not exist: {0}")]
    MissingParentDir(PathBuf),

    #[error("No build.gradle or build.gradle.kts found in {0}")]
    NoBuildScript(PathBuf),

    #[error("Unsupported build script: {0}")]
    UnsupportedBuildScript(PathBuf),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SignkitError {
    /// Wraps an IO error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for signkit operations.
pub type Result<T> = std::result::Result<T, SignkitError>;
