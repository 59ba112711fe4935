//! key.properties generation and setup bookkeeping for Android signing.
//!
//! The key.properties file is read by the Gradle build script to
//! configure signing for release builds.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::config::{KEY_PROPERTIES_FILE, SETUP_MARKER_FILE, SetupConfig};
use crate::error::{Result, SignkitError};
use crate::models::{KeystoreCredentials, SetupMarker, SigningProperties};

/// Builds the properties record for a freshly generated keystore.
pub fn signing_properties(
    config: &SetupConfig,
    credentials: &KeystoreCredentials,
) -> SigningProperties {
    SigningProperties {
        store_password: SecretString::from(credentials.store_password.expose_secret().to_string()),
        key_password: SecretString::from(credentials.key_password.expose_secret().to_string()),
        key_alias: config.keystore.alias.clone(),
        store_file: config.store_file_reference(),
    }
}

/// Generates the key.properties file content for Flutter/Gradle.
pub fn generate_key_properties(properties: &SigningProperties) -> String {
    format!(
        "storePassword={}\n\
         keyPassword={}\n\
         keyAlias={}\n\
         storeFile={}\n",
        properties.store_password.expose_secret(),
        properties.key_password.expose_secret(),
        properties.key_alias,
        properties.store_file
    )
}

/// Writes `key.properties` into `dir`, replacing any previous file.
pub async fn write_key_properties(dir: &Path, properties: &SigningProperties) -> Result<PathBuf> {
    let path = dir.join(KEY_PROPERTIES_FILE);
    let content = generate_key_properties(properties);

    tokio::fs::write(&path, content)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to write {}", path.display()), e))?;

    set_owner_only(&path).await?;

    tracing::debug!("Wrote key.properties to {}", path.display());

    Ok(path)
}

/// Deletes an existing keystore so a new one can be generated in its place.
pub async fn remove_keystore(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| SignkitError::io(format!("Failed to remove {}", path.display()), e))?;
        tracing::debug!("Removed keystore {}", path.display());
    }
    Ok(())
}

/// Records a completed setup in the staging directory.
pub async fn write_setup_marker(dir: &Path, marker: &SetupMarker) -> Result<PathBuf> {
    let path = dir.join(SETUP_MARKER_FILE);
    let json = serde_json::to_string_pretty(marker)?;

    tokio::fs::write(&path, json)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::debug!("Wrote setup marker to {}", path.display());

    Ok(path)
}

/// Reads the setup marker, if a previous run left one.
pub async fn read_setup_marker(dir: &Path) -> Result<Option<SetupMarker>> {
    let path = dir.join(SETUP_MARKER_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SignkitError::io(format!("Failed to read {}", path.display()), e)),
    }
}

/// Restricts a secrets file to owner read/write.
#[cfg(unix)]
async fn set_owner_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| {
            SignkitError::io(format!("Failed to set permissions on {}", path.display()), e)
        })
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &Path) -> Result<()> {
    Ok(())
}
