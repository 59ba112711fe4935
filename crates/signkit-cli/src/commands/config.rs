//! `signkit config` commands for managing the project config file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use signkit_core::config::{
    DEFAULT_KEY_ALIAS, DEFAULT_KEYSTORE_NAME, DEFAULT_STAGING_DIR, DEFAULT_VALIDITY_DAYS,
};
use signkit_core::models::Identity;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::config::{
    ENV_KEY_ALIAS, ENV_KEY_PASSWORD, ENV_KEYSTORE_NAME, ENV_STAGING_DIR, ENV_STORE_PASSWORD,
    ENV_VALIDITY_DAYS, FileConfig, IdentitySection, KeystoreSection, ProjectSection, load_config,
    mask_secret, serialize_to_huml,
};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create a config file with default settings
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show actual password values (by default they are masked)
        #[arg(long)]
        show_secrets: bool,
    },
}

pub fn handle_config_command(config_path: &Path, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => init_config(config_path, force),
        ConfigCommands::Show { show_secrets } => show_config(config_path, show_secrets),
    }
}

/// Config file holding every default except passwords.
fn default_file_config() -> FileConfig {
    let identity = Identity::default();
    FileConfig {
        identity: IdentitySection {
            common_name: Some(identity.common_name),
            organizational_unit: Some(identity.organizational_unit),
            organization: Some(identity.organization),
            city: Some(identity.city),
            state: Some(identity.state),
            country: Some(identity.country),
        },
        keystore: KeystoreSection {
            name: Some(DEFAULT_KEYSTORE_NAME.to_string()),
            alias: Some(DEFAULT_KEY_ALIAS.to_string()),
            validity_days: Some(DEFAULT_VALIDITY_DAYS),
            store_password: None,
            key_password: None,
        },
        project: ProjectSection {
            staging_dir: Some(DEFAULT_STAGING_DIR.to_string()),
        },
    }
}

/// Create a new config file.
fn init_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    write_config(config_path, &default_file_config())?;

    println!("Created config file at {}", config_path.display());
    println!();
    println!("Edit the identity section before running 'signkit setup'.");
    println!("Passwords are generated when not set; to choose them, use:");
    println!("  {}=<password> signkit setup", ENV_STORE_PASSWORD);

    Ok(())
}

/// Display current configuration.
fn show_config(config_path: &Path, show_secrets: bool) -> Result<()> {
    let config = match load_config(config_path)? {
        Some(c) => c,
        None => {
            println!("No config file found at {}", config_path.display());
            println!();
            println!("Using defaults:");
            print_sections(&default_file_config(), show_secrets);
            println!();
            println!("Run 'signkit config init' to create a config file.");
            print_env_overrides(show_secrets);
            return Ok(());
        }
    };

    println!("Config file: {}", config_path.display());
    print_sections(&config, show_secrets);
    print_env_overrides(show_secrets);

    Ok(())
}

fn print_sections(config: &FileConfig, show_secrets: bool) {
    let identity = &config.identity;
    print_section(
        "identity",
        &[
            ("common_name", identity.common_name.clone()),
            ("organizational_unit", identity.organizational_unit.clone()),
            ("organization", identity.organization.clone()),
            ("city", identity.city.clone()),
            ("state", identity.state.clone()),
            ("country", identity.country.clone()),
        ],
    );

    let keystore = &config.keystore;
    let secret = |value: &Option<String>| {
        value.as_ref().map(|v| {
            if show_secrets {
                v.clone()
            } else {
                format!("{} (use --show-secrets to reveal)", mask_secret(v))
            }
        })
    };
    print_section(
        "keystore",
        &[
            ("name", keystore.name.clone()),
            ("alias", keystore.alias.clone()),
            ("validity_days", keystore.validity_days.map(|d| d.to_string())),
            ("store_password", secret(&keystore.store_password)),
            ("key_password", secret(&keystore.key_password)),
        ],
    );

    print_section("project", &[("staging_dir", config.project.staging_dir.clone())]);
}

fn print_section(name: &str, entries: &[(&str, Option<String>)]) {
    println!();
    println!("[{}]", name);
    for (key, value) in entries {
        match value {
            Some(value) => println!("  {:<20} {}", key, value),
            None => println!("  {:<20} (not set)", key),
        }
    }
}

/// Lists environment variables that take precedence over the file.
fn print_env_overrides(show_secrets: bool) {
    let secrets = [ENV_STORE_PASSWORD, ENV_KEY_PASSWORD];
    let keys = [
        ENV_STORE_PASSWORD,
        ENV_KEY_PASSWORD,
        ENV_KEY_ALIAS,
        ENV_KEYSTORE_NAME,
        ENV_VALIDITY_DAYS,
        ENV_STAGING_DIR,
    ];

    let set: Vec<(&str, String)> = keys
        .iter()
        .filter_map(|key| {
            let value = std::env::var(key).ok().filter(|v| !v.is_empty())?;
            if secrets.contains(key) && !show_secrets {
                Some((*key, mask_secret(&value)))
            } else {
                Some((*key, value))
            }
        })
        .collect();

    if set.is_empty() {
        return;
    }

    println!();
    println!("Environment overrides:");
    for (key, value) in set {
        println!("  {}={}", key, value);
    }
}

/// Write config to file with proper HUML formatting and secure permissions.
fn write_config(path: &Path, config: &FileConfig) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let content = serialize_to_huml(config);
    fs::write(path, &content).with_context(|| format!("Failed to write {}", path.display()))?;

    // Set secure permissions (owner read/write only)
    #[cfg(unix)]
    {
        let permissions = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, permissions)?;
    }

    Ok(())
}
