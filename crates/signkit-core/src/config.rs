//! Immutable setup configuration shared by every component.
//!
//! A [`SetupConfig`] is built once by the caller (the CLI resolves it from
//! flags, environment and the config file) and passed by reference to the
//! generator, the properties writer, the asset collector and the patcher.

use std::path::{Component, Path, PathBuf};

use rand::RngCore;
use secrecy::ExposeSecret;

use crate::error::{Result, SignkitError};
use crate::models::{Identity, KeystoreCredentials};

pub const DEFAULT_STAGING_DIR: &str = "necessary_files";
pub const DEFAULT_ANDROID_DIR: &str = "android";
pub const DEFAULT_APP_DIR: &str = "android/app";
pub const DEFAULT_KEYSTORE_NAME: &str = "upload-keystore.jks";
pub const DEFAULT_KEY_ALIAS: &str = "upload";
/// Roughly 27 years.
pub const DEFAULT_VALIDITY_DAYS: u32 = 10_000;

pub const KEY_PROPERTIES_FILE: &str = "key.properties";
pub const MANIFEST_FILE: &str = "firebase-info.txt";
pub const SETUP_MARKER_FILE: &str = ".setup_complete";

/// keytool rejects store passwords shorter than this.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Locations inside a Flutter project, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    staging_dir: PathBuf,
    android_dir: PathBuf,
    app_dir: PathBuf,
}

impl ProjectLayout {
    /// Standard Flutter layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            android_dir: PathBuf::from(DEFAULT_ANDROID_DIR),
            app_dir: PathBuf::from(DEFAULT_APP_DIR),
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging directory name relative to the project root.
    pub fn staging_dir_name(&self) -> &Path {
        &self.staging_dir
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(&self.staging_dir)
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join(&self.app_dir)
    }

    /// Build script paths in lookup order.
    pub fn build_script_candidates(&self) -> [PathBuf; 2] {
        let app_dir = self.app_dir();
        [app_dir.join("build.gradle"), app_dir.join("build.gradle.kts")]
    }

    pub fn properties_path(&self) -> PathBuf {
        self.staging_dir().join(KEY_PROPERTIES_FILE)
    }

    /// `key.properties` as seen from the Gradle root project (`rootProject.file(...)`).
    pub fn properties_reference(&self) -> String {
        relative_reference(&self.android_dir, &self.staging_dir.join(KEY_PROPERTIES_FILE))
    }

    /// A staged file as seen from the app module (`file(...)` in the app build script).
    pub fn app_module_reference(&self, file_name: &str) -> String {
        relative_reference(&self.app_dir, &self.staging_dir.join(file_name))
    }

    fn validate(&self) -> Result<()> {
        for (name, dir) in [
            ("staging directory", &self.staging_dir),
            ("android directory", &self.android_dir),
            ("app directory", &self.app_dir),
        ] {
            if dir.as_os_str().is_empty() || !is_plain_relative(dir) {
                return Err(SignkitError::Configuration(format!(
                    "{} must be a relative path inside the project, got '{}'",
                    name,
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Keystore parameters.
#[derive(Debug)]
pub struct KeystoreSettings {
    pub file_name: String,
    pub alias: String,
    pub validity_days: u32,
    pub credentials: KeystoreCredentials,
}

impl KeystoreSettings {
    /// Default file name, alias and validity with the given credentials.
    pub fn new(credentials: KeystoreCredentials) -> Self {
        Self {
            file_name: DEFAULT_KEYSTORE_NAME.to_string(),
            alias: DEFAULT_KEY_ALIAS.to_string(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            credentials,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() || self.file_name.contains(['/', '\\']) {
            return Err(SignkitError::Configuration(format!(
                "keystore name must be a plain file name, got '{}'",
                self.file_name
            )));
        }
        if self.alias.trim().is_empty() {
            return Err(SignkitError::Configuration(
                "key alias must not be empty".to_string(),
            ));
        }
        if self.validity_days == 0 {
            return Err(SignkitError::Configuration(
                "validity must be at least one day".to_string(),
            ));
        }
        for (name, secret) in [
            ("store password", &self.credentials.store_password),
            ("key password", &self.credentials.key_password),
        ] {
            if secret.expose_secret().chars().count() < MIN_PASSWORD_LEN {
                return Err(SignkitError::Configuration(format!(
                    "{} must be at least {} characters",
                    name, MIN_PASSWORD_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Everything a setup run needs, fixed for the duration of the run.
#[derive(Debug)]
pub struct SetupConfig {
    pub identity: Identity,
    pub keystore: KeystoreSettings,
    pub layout: ProjectLayout,
}

impl SetupConfig {
    /// Validates the configuration, returning it unchanged on success.
    pub fn validated(self) -> Result<Self> {
        self.identity.validate()?;
        self.keystore.validate()?;
        self.layout.validate()?;
        Ok(self)
    }

    pub fn keystore_path(&self) -> PathBuf {
        self.layout.staging_dir().join(&self.keystore.file_name)
    }

    /// `storeFile` value written to `key.properties`.
    pub fn store_file_reference(&self) -> String {
        self.layout.app_module_reference(&self.keystore.file_name)
    }
}

/// Generates a random hex password (32 characters).
pub fn generate_password() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Expresses `target` (relative to the project root) as seen from `from_dir`
/// (also relative to the project root), always with forward slashes.
fn relative_reference(from_dir: &Path, target: &Path) -> String {
    let depth = from_dir
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), depth).collect();
    parts.extend(
        target
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            }),
    );
    parts.join("/")
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
