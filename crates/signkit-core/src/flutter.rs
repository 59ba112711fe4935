//! Flutter project detection.
//!
//! This module provides utilities for recognising a Flutter project and
//! finding out whether it uses Firebase.

use std::path::Path;

use crate::error::{Result, SignkitError};
use crate::models::Platform;

/// Packages that indicate a Firebase-backed app.
pub const FIREBASE_PACKAGES: [&str; 6] = [
    "firebase_core",
    "firebase_auth",
    "firebase_analytics",
    "firebase_messaging",
    "cloud_firestore",
    "firebase_storage",
];

/// Detects if a directory contains a Flutter project.
///
/// A Flutter project is identified by the presence of `pubspec.yaml`.
pub async fn detect_flutter_project(workspace: &Path) -> bool {
    tokio::fs::try_exists(workspace.join("pubspec.yaml"))
        .await
        .unwrap_or(false)
}

/// Lists the Firebase packages the project depends on.
///
/// Returns an empty list when there is no `pubspec.yaml`.
pub async fn detect_firebase_packages(workspace: &Path) -> Result<Vec<String>> {
    let path = workspace.join("pubspec.yaml");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SignkitError::io(format!("Failed to read {}", path.display()), e)),
    };

    let dependencies = parse_dependency_names(&content)?;
    Ok(FIREBASE_PACKAGES
        .iter()
        .filter(|pkg| dependencies.iter().any(|d| d == *pkg))
        .map(|pkg| pkg.to_string())
        .collect())
}

/// Collects package names from `dependencies` and `dev_dependencies`.
fn parse_dependency_names(content: &str) -> Result<Vec<String>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;

    let mut names = Vec::new();
    for section in ["dependencies", "dev_dependencies"] {
        if let Some(deps) = doc.get(section).and_then(|v| v.as_mapping()) {
            names.extend(deps.keys().filter_map(|k| k.as_str()).map(str::to_string));
        }
    }
    Ok(names)
}

/// Returns the platforms with a platform directory in the project.
pub async fn detect_platforms(workspace: &Path) -> Vec<Platform> {
    let mut platforms = Vec::new();

    if workspace.join("android").is_dir() {
        platforms.push(Platform::Android);
    }
    if workspace.join("ios").is_dir() {
        platforms.push(Platform::Ios);
    }

    platforms
}
