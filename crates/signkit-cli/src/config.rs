//! Configuration file loading and resolution.
//!
//! Settings come from `signkit.huml` in the project directory (or the file
//! named by `--config`), with priority order:
//! CLI flags > environment variables > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signkit_core::SetupConfig;
use signkit_core::config::{
    DEFAULT_KEY_ALIAS, DEFAULT_KEYSTORE_NAME, DEFAULT_STAGING_DIR, DEFAULT_VALIDITY_DAYS,
    KeystoreSettings, ProjectLayout, generate_password,
};
use signkit_core::models::{Identity, KeystoreCredentials};

use crate::output::print_warning;

pub const CONFIG_FILE_NAME: &str = "signkit.huml";

pub const ENV_STORE_PASSWORD: &str = "SIGNKIT_STORE_PASSWORD";
pub const ENV_KEY_PASSWORD: &str = "SIGNKIT_KEY_PASSWORD";
pub const ENV_KEY_ALIAS: &str = "SIGNKIT_KEY_ALIAS";
pub const ENV_KEYSTORE_NAME: &str = "SIGNKIT_KEYSTORE_NAME";
pub const ENV_VALIDITY_DAYS: &str = "SIGNKIT_VALIDITY_DAYS";
pub const ENV_STAGING_DIR: &str = "SIGNKIT_STAGING_DIR";

/// Config file contents. Every value is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub keystore: KeystoreSection,
    #[serde(default)]
    pub project: ProjectSection,
}

/// Distinguished name fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdentitySection {
    pub common_name: Option<String>,
    pub organizational_unit: Option<String>,
    pub organization: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeystoreSection {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub validity_days: Option<u32>,
    pub store_password: Option<String>,
    pub key_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectSection {
    pub staging_dir: Option<String>,
}

/// Values given on the `setup` command line.
#[derive(Debug, Clone, Default)]
pub struct SetupOverrides {
    pub store_password: Option<String>,
    pub key_password: Option<String>,
    pub alias: Option<String>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Env,
    File,
    /// Built-in default: a generated store password, or a key password
    /// equal to the store password.
    Default,
}

impl Source {
    pub fn describe(&self) -> &'static str {
        match self {
            Source::Flag => "command line",
            Source::Env => "environment",
            Source::File => "config file",
            Source::Default => "default",
        }
    }
}

/// Setup configuration after applying priority rules.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub setup: SetupConfig,
    pub store_password: Source,
    pub key_password: Source,
}

/// Returns the config file path used when `--config` is not given.
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE_NAME)
}

/// Load configuration from the config file.
///
/// Returns `Ok(None)` if the config file doesn't exist.
/// Returns an error if the file exists but is invalid.
pub fn load_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let config: FileConfig = huml_rs::serde::from_str(&content)
        .with_context(|| format!("Invalid HUML in {}", path.display()))?;

    if config.keystore.store_password.is_some() || config.keystore.key_password.is_some() {
        check_file_permissions(path);
    }

    Ok(Some(config))
}

/// Warn if a config file holding passwords is readable by others (on Unix).
#[cfg(unix)]
fn check_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            print_warning(&format!(
                "{} contains passwords and has permissions {:o}. Consider running: chmod 600 {}",
                path.display(),
                mode & 0o777,
                path.display()
            ));
        }
    }
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &Path) {}

/// Resolves the project layout: `SIGNKIT_STAGING_DIR` > config file > default.
pub fn resolve_layout(project_dir: &Path, file: Option<&FileConfig>) -> ProjectLayout {
    let file_value = file.and_then(|f| f.project.staging_dir.as_ref());
    let staging = env_value(ENV_STAGING_DIR)
        .or_else(|| file_value.cloned())
        .unwrap_or_else(|| DEFAULT_STAGING_DIR.to_string());
    ProjectLayout::new(project_dir).with_staging_dir(staging)
}

/// Resolves the keystore file name: `SIGNKIT_KEYSTORE_NAME` > config file > default.
pub fn resolve_keystore_name(file: Option<&FileConfig>) -> String {
    let file_value = file.and_then(|f| f.keystore.name.as_ref());
    layered(None, ENV_KEYSTORE_NAME, file_value)
        .map(|(v, _)| v)
        .unwrap_or_else(|| DEFAULT_KEYSTORE_NAME.to_string())
}

/// Resolve the setup configuration by applying priority rules.
///
/// Priority order (highest to lowest):
/// 1. CLI flags (`--store-password`, `--key-password`, `--alias`)
/// 2. Environment variables (`SIGNKIT_*`)
/// 3. Config file
/// 4. Defaults; the store password is generated and the key password
///    reuses it
pub fn resolve_config(
    project_dir: &Path,
    overrides: &SetupOverrides,
    file_config: Option<FileConfig>,
) -> Result<ResolvedConfig> {
    let layout = resolve_layout(project_dir, file_config.as_ref());
    let file = file_config.unwrap_or_default();

    let mut identity = Identity::default();
    for (target, env_key, file_value) in [
        (&mut identity.common_name, "SIGNKIT_COMMON_NAME", &file.identity.common_name),
        (
            &mut identity.organizational_unit,
            "SIGNKIT_ORGANIZATIONAL_UNIT",
            &file.identity.organizational_unit,
        ),
        (&mut identity.organization, "SIGNKIT_ORGANIZATION", &file.identity.organization),
        (&mut identity.city, "SIGNKIT_CITY", &file.identity.city),
        (&mut identity.state, "SIGNKIT_STATE", &file.identity.state),
        (&mut identity.country, "SIGNKIT_COUNTRY", &file.identity.country),
    ] {
        if let Some((value, _)) = layered(None, env_key, file_value.as_ref()) {
            *target = value;
        }
    }

    let file_name = resolve_keystore_name(Some(&file));

    let alias = layered(overrides.alias.as_ref(), ENV_KEY_ALIAS, file.keystore.alias.as_ref())
        .map(|(v, _)| v)
        .unwrap_or_else(|| DEFAULT_KEY_ALIAS.to_string());

    let validity_days = match env_value(ENV_VALIDITY_DAYS) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("{} must be a number of days, got '{}'", ENV_VALIDITY_DAYS, raw))?,
        None => file.keystore.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
    };

    let (store_password, store_source) = layered(
        overrides.store_password.as_ref(),
        ENV_STORE_PASSWORD,
        file.keystore.store_password.as_ref(),
    )
    .unwrap_or_else(|| (generate_password(), Source::Default));

    let (key_password, key_source) = layered(
        overrides.key_password.as_ref(),
        ENV_KEY_PASSWORD,
        file.keystore.key_password.as_ref(),
    )
    .unwrap_or_else(|| (store_password.clone(), Source::Default));

    let keystore = KeystoreSettings {
        file_name,
        alias,
        validity_days,
        credentials: KeystoreCredentials::separate(&store_password, &key_password),
    };

    let setup = SetupConfig {
        identity,
        keystore,
        layout,
    }
    .validated()
    .context("Invalid signing configuration")?;

    Ok(ResolvedConfig {
        setup,
        store_password: store_source,
        key_password: key_source,
    })
}

/// First of flag, environment variable and file value that is set.
fn layered(flag: Option<&String>, env_key: &str, file: Option<&String>) -> Option<(String, Source)> {
    if let Some(value) = flag {
        return Some((value.clone(), Source::Flag));
    }
    if let Some(value) = env_value(env_key) {
        return Some((value, Source::Env));
    }
    file.map(|value| (value.clone(), Source::File))
}

/// Empty variables count as unset.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Mask a secret for display (show first 2 and last 2 characters).
/// Requires at least 10 characters to show partial content.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 10 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Serialize config to HUML format.
///
/// huml-rs may not support serialization, so we manually generate HUML.
pub fn serialize_to_huml(config: &FileConfig) -> String {
    let mut output = String::new();
    output.push_str("%HUML v0.2.0\n");

    let identity = &config.identity;
    push_section(
        &mut output,
        "identity",
        &[
            ("common_name", quoted(&identity.common_name)),
            ("organizational_unit", quoted(&identity.organizational_unit)),
            ("organization", quoted(&identity.organization)),
            ("city", quoted(&identity.city)),
            ("state", quoted(&identity.state)),
            ("country", quoted(&identity.country)),
        ],
    );

    let keystore = &config.keystore;
    push_section(
        &mut output,
        "keystore",
        &[
            ("name", quoted(&keystore.name)),
            ("alias", quoted(&keystore.alias)),
            ("validity_days", keystore.validity_days.map(|d| d.to_string())),
            ("store_password", quoted(&keystore.store_password)),
            ("key_password", quoted(&keystore.key_password)),
        ],
    );

    push_section(
        &mut output,
        "project",
        &[("staging_dir", quoted(&config.project.staging_dir))],
    );

    output
}

fn push_section(output: &mut String, name: &str, entries: &[(&str, Option<String>)]) {
    if entries.iter().all(|(_, value)| value.is_none()) {
        return;
    }
    output.push('\n');
    output.push_str(&format!("{}::\n", name));
    for (key, value) in entries {
        if let Some(value) = value {
            output.push_str(&format!("  {}: {}\n", key, value));
        }
    }
}

fn quoted(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ALL_ENV: [&str; 12] = [
        ENV_STORE_PASSWORD,
        ENV_KEY_PASSWORD,
        ENV_KEY_ALIAS,
        ENV_KEYSTORE_NAME,
        ENV_VALIDITY_DAYS,
        ENV_STAGING_DIR,
        "SIGNKIT_COMMON_NAME",
        "SIGNKIT_ORGANIZATIONAL_UNIT",
        "SIGNKIT_ORGANIZATION",
        "SIGNKIT_CITY",
        "SIGNKIT_STATE",
        "SIGNKIT_COUNTRY",
    ];

    /// Runs `f` with every signkit variable unset plus the given ones set.
    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let mut all: Vec<(&str, Option<&str>)> = ALL_ENV.iter().map(|k| (*k, None)).collect();
        for &(key, value) in vars {
            all.retain(|(k, _)| *k != key);
            all.push((key, Some(value)));
        }
        temp_env::with_vars(all, f)
    }

    fn file_config() -> FileConfig {
        FileConfig {
            identity: IdentitySection {
                common_name: Some("Jane Doe".to_string()),
                country: Some("DE".to_string()),
                ..Default::default()
            },
            keystore: KeystoreSection {
                alias: Some("file-alias".to_string()),
                store_password: Some("file-store-pass".to_string()),
                validity_days: Some(365),
                ..Default::default()
            },
            project: ProjectSection {
                staging_dir: Some("secrets".to_string()),
            },
        }
    }

    #[test]
    fn test_resolve_with_no_config() {
        with_env(&[], || {
            let resolved =
                resolve_config(Path::new("/p"), &SetupOverrides::default(), None).unwrap();
            let setup = &resolved.setup;

            assert_eq!(setup.keystore.alias, "upload");
            assert_eq!(setup.keystore.file_name, "upload-keystore.jks");
            assert_eq!(setup.keystore.validity_days, 10_000);
            assert_eq!(setup.identity, Identity::default());
            assert_eq!(setup.layout.staging_dir(), PathBuf::from("/p/necessary_files"));

            assert_eq!(resolved.store_password, Source::Default);
            assert_eq!(resolved.key_password, Source::Default);
            assert_eq!(setup.keystore.credentials.store_password.expose_secret().len(), 32);
            assert!(setup.keystore.credentials.is_shared());
        });
    }

    #[test]
    fn test_resolve_with_config_file() {
        with_env(&[], || {
            let resolved =
                resolve_config(Path::new("/p"), &SetupOverrides::default(), Some(file_config()))
                    .unwrap();
            let setup = &resolved.setup;

            assert_eq!(setup.identity.common_name, "Jane Doe");
            assert_eq!(setup.identity.country, "DE");
            assert_eq!(setup.identity.city, "Unknown");
            assert_eq!(setup.keystore.alias, "file-alias");
            assert_eq!(setup.keystore.validity_days, 365);
            assert_eq!(setup.layout.staging_dir(), PathBuf::from("/p/secrets"));
            assert_eq!(resolved.store_password, Source::File);
            assert_eq!(
                setup.keystore.credentials.key_password.expose_secret(),
                "file-store-pass"
            );
        });
    }

    #[test]
    fn test_resolve_env_overrides_file() {
        with_env(
            &[
                (ENV_KEY_ALIAS, "env-alias"),
                (ENV_STORE_PASSWORD, "env-store-pass"),
                (ENV_STAGING_DIR, "env_secrets"),
                ("SIGNKIT_COUNTRY", "FR"),
            ],
            || {
                let resolved = resolve_config(
                    Path::new("/p"),
                    &SetupOverrides::default(),
                    Some(file_config()),
                )
                .unwrap();

                assert_eq!(resolved.setup.keystore.alias, "env-alias");
                assert_eq!(resolved.setup.identity.country, "FR");
                assert_eq!(resolved.store_password, Source::Env);
                assert_eq!(
                    resolved.setup.layout.staging_dir(),
                    PathBuf::from("/p/env_secrets")
                );
            },
        );
    }

    #[test]
    fn test_resolve_cli_flags_override() {
        with_env(
            &[(ENV_KEY_ALIAS, "env-alias"), (ENV_STORE_PASSWORD, "env-store-pass")],
            || {
                let overrides = SetupOverrides {
                    store_password: Some("flag-store-pass".to_string()),
                    key_password: Some("flag-key-pass".to_string()),
                    alias: Some("flag-alias".to_string()),
                };
                let resolved =
                    resolve_config(Path::new("/p"), &overrides, Some(file_config())).unwrap();
                let credentials = &resolved.setup.keystore.credentials;

                assert_eq!(resolved.setup.keystore.alias, "flag-alias");
                assert_eq!(credentials.store_password.expose_secret(), "flag-store-pass");
                assert_eq!(credentials.key_password.expose_secret(), "flag-key-pass");
                assert_eq!(resolved.store_password, Source::Flag);
                assert_eq!(resolved.key_password, Source::Flag);
                assert!(!credentials.is_shared());
            },
        );
    }

    #[test]
    fn test_resolve_rejects_invalid_values() {
        with_env(&[(ENV_VALIDITY_DAYS, "forever")], || {
            let err = resolve_config(Path::new("/p"), &SetupOverrides::default(), None)
                .unwrap_err();
            assert!(err.to_string().contains(ENV_VALIDITY_DAYS));
        });

        with_env(&[(ENV_STORE_PASSWORD, "short")], || {
            let err = resolve_config(Path::new("/p"), &SetupOverrides::default(), None)
                .unwrap_err();
            assert!(format!("{:#}", err).contains("at least 6 characters"));
        });
    }

    #[test]
    fn test_empty_env_counts_as_unset() {
        with_env(&[(ENV_KEY_ALIAS, "")], || {
            let resolved =
                resolve_config(Path::new("/p"), &SetupOverrides::default(), Some(file_config()))
                    .unwrap();
            assert_eq!(resolved.setup.keystore.alias, "file-alias");
        });
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("123456789"), "*********");
        assert_eq!(mask_secret("0123456789abcdef"), "01...ef");
    }

    #[test]
    fn test_serialize_to_huml() {
        let huml = serialize_to_huml(&file_config());

        assert!(huml.starts_with("%HUML v0.2.0\n"));
        assert!(huml.contains("identity::\n  common_name: \"Jane Doe\"\n  country: \"DE\"\n"));
        assert!(huml.contains("  validity_days: 365\n"));
        assert!(huml.contains("project::\n  staging_dir: \"secrets\"\n"));
        assert!(!huml.contains("key_password"));
    }

    #[test]
    fn test_serialize_escapes_quotes() {
        let config = FileConfig {
            identity: IdentitySection {
                organization: Some("Acme \"Labs\"".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let huml = serialize_to_huml(&config);
        assert!(huml.contains("organization: \"Acme \\\"Labs\\\"\""));
        assert!(!huml.contains("keystore::"));
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(load_config(&path).unwrap().is_none());

        std::fs::write(&path, serialize_to_huml(&file_config())).unwrap();
        let loaded = load_config(&path).unwrap().unwrap();
        assert_eq!(loaded, file_config());
    }

    #[test]
    fn test_load_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "%HUML v0.2.0\nkeystore::\n  validity_days: \"soon\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid HUML"));
    }
}
