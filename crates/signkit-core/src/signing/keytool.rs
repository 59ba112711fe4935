//! Keystore generation through the JDK `keytool` binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use secrecy::ExposeSecret;
use tokio::process::Command;

use crate::config::SetupConfig;
use crate::error::{Result, SignkitError};
use crate::models::{Identity, KeystoreCredentials};

pub const KEY_ALGORITHM: &str = "RSA";
pub const KEY_SIZE: u32 = 2048;

/// Environment variable naming the keytool binary to use instead of searching.
pub const KEYTOOL_ENV: &str = "SIGNKIT_KEYTOOL";

/// JDK install locations checked when keytool is neither on PATH nor under JAVA_HOME.
const WELL_KNOWN_KEYTOOL_PATHS: &[&str] = &[
    r"C:\Program Files\Java\jdk-22\bin\keytool.exe",
    r"C:\Program Files\Java\jdk-21\bin\keytool.exe",
    r"C:\Program Files\Java\jdk-20\bin\keytool.exe",
    r"C:\Program Files\Java\jdk-17\bin\keytool.exe",
    "/opt/homebrew/opt/openjdk/bin/keytool",
    "/usr/local/opt/openjdk/bin/keytool",
    "/usr/lib/jvm/default-java/bin/keytool",
];

/// Parameters for a new keystore.
#[derive(Debug)]
pub struct KeystoreRequest<'a> {
    pub path: PathBuf,
    pub alias: &'a str,
    pub validity_days: u32,
    pub identity: &'a Identity,
    pub credentials: &'a KeystoreCredentials,
}

impl<'a> KeystoreRequest<'a> {
    pub fn from_config(config: &'a SetupConfig) -> Self {
        Self {
            path: config.keystore_path(),
            alias: &config.keystore.alias,
            validity_days: config.keystore.validity_days,
            identity: &config.identity,
            credentials: &config.keystore.credentials,
        }
    }

    /// Command-line arguments for `keytool -genkey`.
    pub fn keytool_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-genkey".into(), "-v".into(), "-keystore".into()];
        args.push(self.path.clone().into_os_string());
        args.extend(
            [
                "-keyalg".to_string(),
                KEY_ALGORITHM.to_string(),
                "-keysize".to_string(),
                KEY_SIZE.to_string(),
                "-validity".to_string(),
                self.validity_days.to_string(),
                "-alias".to_string(),
                self.alias.to_string(),
                "-storepass".to_string(),
                self.credentials.store_password.expose_secret().to_string(),
                "-keypass".to_string(),
                self.credentials.key_password.expose_secret().to_string(),
                "-dname".to_string(),
                self.identity.distinguished_name(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }
}

/// A usable keytool binary.
#[derive(Debug, Clone)]
pub struct Keytool {
    path: PathBuf,
}

impl Keytool {
    /// Uses the binary at `path` without checking that it runs.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finds keytool through the process environment and verifies that it runs.
    pub async fn locate() -> Result<Self> {
        Self::locate_in(&KeytoolSearch::from_env()).await
    }

    /// Finds keytool under `search` and verifies that it runs.
    pub async fn locate_in(search: &KeytoolSearch) -> Result<Self> {
        let path = search.find().ok_or(SignkitError::KeytoolNotFound)?;
        let keytool = Self::at(path);
        keytool.verify().await?;
        tracing::debug!("Using keytool at {}", keytool.path.display());
        Ok(keytool)
    }

    /// Runs `keytool -help` to make sure the binary is executable.
    pub async fn verify(&self) -> Result<()> {
        let output = Command::new(&self.path)
            .arg("-help")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SignkitError::KeytoolUnusable {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SignkitError::KeytoolUnusable {
                path: self.path.clone(),
                message: diagnostics(&output.stdout, &output.stderr),
            });
        }

        Ok(())
    }

    /// Creates a new keystore holding one RSA key pair.
    ///
    /// The parent directory must exist and no file may be present at the
    /// target path; removing an old keystore is the caller's decision. On
    /// failure keytool may leave a partial file behind.
    pub async fn generate<'a>(
        &self,
        request: &KeystoreRequest<'a>,
    ) -> Result<&'a KeystoreCredentials> {
        let parent = match request.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(SignkitError::MissingParentDir(parent));
        }
        if request.path.exists() {
            return Err(SignkitError::KeystoreExists(request.path.clone()));
        }

        tracing::debug!(
            "Generating {}-bit {} keystore at {} (alias {})",
            KEY_SIZE,
            KEY_ALGORITHM,
            request.path.display(),
            request.alias
        );

        let output = Command::new(&self.path)
            .args(request.keytool_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SignkitError::KeytoolUnusable {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SignkitError::KeytoolFailed {
                status: output.status,
                diagnostics: diagnostics(&output.stdout, &output.stderr),
            });
        }

        Ok(request.credentials)
    }
}

/// Where to look for keytool.
///
/// An `explicit` path disables every other location.
#[derive(Debug, Clone, Default)]
pub struct KeytoolSearch {
    pub explicit: Option<PathBuf>,
    pub path: Option<OsString>,
    pub java_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub well_known: Vec<PathBuf>,
}

impl KeytoolSearch {
    /// Search roots taken from `SIGNKIT_KEYTOOL`, `PATH`, `JAVA_HOME` and the
    /// home directory, plus the common JDK locations.
    pub fn from_env() -> Self {
        Self {
            explicit: std::env::var_os(KEYTOOL_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path: std::env::var_os("PATH"),
            java_home: std::env::var_os("JAVA_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            home: dirs::home_dir(),
            well_known: WELL_KNOWN_KEYTOOL_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Looks for keytool on PATH, under JAVA_HOME, under SDKMAN's current
    /// Java, then in the well-known locations.
    pub fn find(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return explicit.is_file().then(|| explicit.clone());
        }

        if let Some(paths) = &self.path {
            if let Ok(path) = which::which_in("keytool", Some(paths), ".") {
                return Some(path);
            }
        }

        let binary = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        let java_home = self.java_home.as_ref().map(|dir| dir.join("bin").join(binary));
        let sdkman = self
            .home
            .as_ref()
            .map(|home| home.join(".sdkman/candidates/java/current/bin").join(binary));

        java_home
            .into_iter()
            .chain(sdkman)
            .chain(self.well_known.iter().cloned())
            .find(|p| p.is_file())
    }
}

/// keytool reports some errors on stdout, so fall back to it when stderr is empty.
fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = String::from_utf8_lossy(stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        "no output".to_string()
    } else {
        stdout.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keytool_args() {
        let identity = Identity::default();
        let credentials = KeystoreCredentials::shared("s3cret!");
        let request = KeystoreRequest {
            path: PathBuf::from("necessary_files/upload-keystore.jks"),
            alias: "upload",
            validity_days: 10_000,
            identity: &identity,
            credentials: &credentials,
        };

        let args: Vec<String> = request
            .keytool_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..3], ["-genkey", "-v", "-keystore"]);
        assert_eq!(args[3], "necessary_files/upload-keystore.jks");
        let after = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(after("-keyalg"), "RSA");
        assert_eq!(after("-keysize"), "2048");
        assert_eq!(after("-validity"), "10000");
        assert_eq!(after("-alias"), "upload");
        assert_eq!(after("-storepass"), "s3cret!");
        assert_eq!(after("-keypass"), "s3cret!");
        assert_eq!(after("-dname"), identity.distinguished_name());
    }

    #[test]
    fn test_diagnostics_prefers_stderr() {
        assert_eq!(diagnostics(b"out", b" err \n"), "err");
        assert_eq!(diagnostics(b"keytool error: bad\n", b""), "keytool error: bad");
        assert_eq!(diagnostics(b"", b""), "no output");
    }

    #[tokio::test]
    async fn test_verify_missing_binary() {
        let keytool = Keytool::at("/nonexistent/bin/keytool");
        let err = keytool.verify().await.unwrap_err();
        assert!(matches!(err, SignkitError::KeytoolUnusable { .. }));
    }

    #[tokio::test]
    async fn test_locate_in_empty_search_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let search = KeytoolSearch {
            explicit: None,
            path: Some(dir.path().as_os_str().to_owned()),
            java_home: Some(dir.path().join("jdk")),
            home: Some(dir.path().to_path_buf()),
            well_known: vec![dir.path().join("opt/openjdk/bin/keytool")],
        };

        assert!(search.find().is_none());
        let err = Keytool::locate_in(&search).await.unwrap_err();
        assert!(matches!(err, SignkitError::KeytoolNotFound));
        assert!(err.to_string().contains("keytool not found"));
    }

    #[test]
    fn test_find_prefers_java_home_over_well_known() {
        let dir = tempfile::tempdir().unwrap();
        let binary = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        let java_bin = dir.path().join("jdk/bin");
        let other = dir.path().join("other");
        std::fs::create_dir_all(&java_bin).unwrap();
        std::fs::create_dir_all(&other).unwrap();
        std::fs::write(java_bin.join(binary), "").unwrap();
        std::fs::write(other.join(binary), "").unwrap();

        let search = KeytoolSearch {
            java_home: Some(dir.path().join("jdk")),
            well_known: vec![other.join(binary)],
            ..Default::default()
        };
        assert_eq!(search.find(), Some(java_bin.join(binary)));

        let search = KeytoolSearch {
            java_home: Some(dir.path().join("missing")),
            well_known: vec![other.join(binary)],
            ..Default::default()
        };
        assert_eq!(search.find(), Some(other.join(binary)));
    }

    #[test]
    fn test_explicit_path_disables_search() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("keytool");
        std::fs::write(&installed, "").unwrap();

        let search = KeytoolSearch {
            explicit: Some(dir.path().join("absent/keytool")),
            well_known: vec![installed.clone()],
            ..Default::default()
        };
        assert!(search.find().is_none());

        let search = KeytoolSearch {
            explicit: Some(installed.clone()),
            ..Default::default()
        };
        assert_eq!(search.find(), Some(installed));
    }
}
