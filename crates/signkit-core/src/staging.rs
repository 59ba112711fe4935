//! The staging directory holding the keystore and other secrets.

use std::path::{Path, PathBuf};

use crate::config::ProjectLayout;
use crate::error::{Result, SignkitError};

/// Creates the staging directory (owner-only on Unix) and returns its path.
pub async fn prepare_staging_dir(layout: &ProjectLayout) -> Result<PathBuf> {
    let dir = layout.staging_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to create {}", dir.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
            .await
            .map_err(|e| {
                SignkitError::io(format!("Failed to set permissions on {}", dir.display()), e)
            })?;
    }

    tracing::debug!("Staging directory ready at {}", dir.display());
    Ok(dir)
}

/// Ensures the staging directory is listed in the project's `.gitignore`.
///
/// Returns `true` when an entry was added (or would be, with `dry_run`).
pub async fn ensure_gitignore(layout: &ProjectLayout, dry_run: bool) -> Result<bool> {
    let gitignore_path = layout.root().join(".gitignore");
    let name = gitignore_name(layout.staging_dir_name());

    let content = match tokio::fs::read_to_string(&gitignore_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(SignkitError::io(
                format!("Failed to read {}", gitignore_path.display()),
                e,
            ));
        }
    };

    let already_listed = content.lines().any(|line| {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        let line = line.strip_suffix('/').unwrap_or(line);
        line == name
    });
    if already_listed {
        return Ok(false);
    }

    if dry_run {
        return Ok(true);
    }

    let mut updated = content;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("/{}/\n", name));

    tokio::fs::write(&gitignore_path, updated)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to write {}", gitignore_path.display()), e))?;

    tracing::debug!("Added /{}/ to {}", name, gitignore_path.display());
    Ok(true)
}

fn gitignore_name(dir: &Path) -> String {
    dir.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| c != ".")
        .collect::<Vec<_>>()
        .join("/")
}
