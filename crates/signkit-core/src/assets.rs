//! Backup and restore of Firebase platform config files.
//!
//! Each platform has one well-known config file. Files that exist are
//! copied into the staging directory and listed in a manifest. Every file
//! is handled on its own: a failed copy is recorded and the next platform
//! is still processed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::{MANIFEST_FILE, ProjectLayout};
use crate::error::{Result, SignkitError};
use crate::models::{AssetEntry, AssetManifest, Platform};

const RULE: &str = "============================================================";
const SUBRULE: &str = "------------------------------";

/// A file that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub platform: Platform,
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub manifest: AssetManifest,
    /// Platforms whose config file does not exist.
    pub missing: Vec<Platform>,
    pub failures: Vec<AssetFailure>,
    /// Written only when at least one file was copied.
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<AssetEntry>,
    /// Platforms with nothing in the staging directory.
    pub missing: Vec<Platform>,
    /// Destinations left alone because they hold different content.
    pub conflicts: Vec<PathBuf>,
    pub failures: Vec<AssetFailure>,
}

pub struct AssetCollector<'a> {
    layout: &'a ProjectLayout,
    platforms: Vec<Platform>,
}

impl<'a> AssetCollector<'a> {
    /// Collector for every supported platform.
    pub fn new(layout: &'a ProjectLayout) -> Self {
        Self {
            layout,
            platforms: Platform::ALL.to_vec(),
        }
    }

    pub fn with_platforms(mut self, platforms: &[Platform]) -> Self {
        self.platforms = platforms.to_vec();
        self
    }

    /// Copies every present config file into the staging directory.
    ///
    /// Only a failure to write the manifest is returned as an error.
    pub async fn collect(&self) -> Result<CollectionReport> {
        let mut report = CollectionReport::default();
        let root = self.layout.root();

        for &platform in &self.platforms {
            let original = PathBuf::from(platform.source_path());
            let source = root.join(&original);

            if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
                tracing::info!("{} not found at {}", platform.description(), source.display());
                report.missing.push(platform);
                continue;
            }

            let backup = self.layout.staging_dir_name().join(platform.file_name());
            let destination = root.join(&backup);

            match tokio::fs::copy(&source, &destination).await {
                Ok(_) => {
                    tracing::debug!("Copied {} to {}", source.display(), destination.display());
                    report.manifest.push(AssetEntry {
                        platform,
                        file_name: platform.file_name().to_string(),
                        original,
                        backup,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to copy {}: {}", source.display(), e);
                    report.failures.push(AssetFailure {
                        platform,
                        path: source,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.manifest.is_empty() {
            let path = write_manifest(
                &self.layout.staging_dir(),
                &report.manifest,
                self.layout.staging_dir_name(),
            )
            .await?;
            report.manifest_path = Some(path);
        }

        Ok(report)
    }

    /// Copies staged config files back to their platform locations.
    ///
    /// An existing destination with different content is only replaced when
    /// `force` is set.
    pub async fn restore(&self, force: bool) -> RestoreReport {
        let mut report = RestoreReport::default();
        let root = self.layout.root();

        for &platform in &self.platforms {
            let backup = self.layout.staging_dir_name().join(platform.file_name());
            let staged = root.join(&backup);
            if !staged.is_file() {
                report.missing.push(platform);
                continue;
            }

            let original = PathBuf::from(platform.source_path());
            let destination = root.join(&original);

            if destination.exists() && !force && !same_content(&staged, &destination).await {
                tracing::info!("Not overwriting {}", destination.display());
                report.conflicts.push(destination);
                continue;
            }

            let copied = async {
                if let Some(parent) = destination.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(&staged, &destination).await
            }
            .await;

            match copied {
                Ok(_) => report.restored.push(AssetEntry {
                    platform,
                    file_name: platform.file_name().to_string(),
                    original,
                    backup,
                }),
                Err(e) => {
                    tracing::warn!("Failed to restore {}: {}", destination.display(), e);
                    report.failures.push(AssetFailure {
                        platform,
                        path: destination,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

async fn same_content(a: &Path, b: &Path) -> bool {
    match (tokio::fs::read(a).await, tokio::fs::read(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Renders the human-readable backup manifest.
pub fn render_manifest(
    manifest: &AssetManifest,
    timestamp: DateTime<Local>,
    staging_dir: &Path,
) -> String {
    let staging = staging_dir.display();
    let mut content = String::new();

    content.push_str(&format!("{RULE}\nFirebase config backup\n{RULE}\n\n"));
    content.push_str(&format!(
        "The following Firebase files were copied to {}:\n\n",
        staging
    ));

    for entry in &manifest.entries {
        content.push_str(&format!(
            "\nPlatform: {}\n{SUBRULE}\nFile name:     {}\nOriginal path: {}\nBackup:        {}\n\n",
            entry.platform.as_str().to_uppercase(),
            entry.file_name,
            entry.original.display(),
            entry.backup.display()
        ));
    }

    content.push_str(&format!("\n{RULE}\nImportant notes\n{RULE}\n\n"));
    content.push_str("- These files contain Firebase API keys\n");
    content.push_str(&format!(
        "- {}/ is listed in .gitignore; keep it out of version control\n",
        staging
    ));
    content.push_str("- Keep a copy of these files somewhere safe\n\n");
    content.push_str(&format!(
        "{RULE}\nBacked up at: {}\n{RULE}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    ));

    content
}

/// Writes the manifest into `dir`, replacing the previous one.
pub async fn write_manifest(
    dir: &Path,
    manifest: &AssetManifest,
    staging_name: &Path,
) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    let content = render_manifest(manifest, Local::now(), staging_name);

    tokio::fs::write(&path, content)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::debug!("Wrote asset manifest to {}", path.display());

    Ok(path)
}
