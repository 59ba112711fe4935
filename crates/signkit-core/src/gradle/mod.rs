//! Gradle build script detection and release signing patching.

pub mod patcher;
pub mod scanner;
pub mod templates;

use std::path::{Path, PathBuf};

use crate::config::ProjectLayout;
use crate::error::{Result, SignkitError};

pub use patcher::*;

/// Build script syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `build.gradle`
    Groovy,
    /// `build.gradle.kts`
    Kotlin,
}

impl Dialect {
    /// Detects the dialect from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gradle") => Some(Dialect::Groovy),
            Some("kts") => Some(Dialect::Kotlin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Groovy => "groovy",
            Dialect::Kotlin => "kotlin",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A build script on disk together with its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScript {
    pub path: PathBuf,
    pub dialect: Dialect,
}

impl BuildScript {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dialect =
            Dialect::from_path(&path).ok_or_else(|| SignkitError::UnsupportedBuildScript(path.clone()))?;
        Ok(Self { path, dialect })
    }
}

/// Finds the app module's build script, preferring `build.gradle`.
pub fn locate_build_script(layout: &ProjectLayout) -> Result<BuildScript> {
    layout
        .build_script_candidates()
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| SignkitError::NoBuildScript(layout.app_dir()))
        .and_then(BuildScript::new)
}
