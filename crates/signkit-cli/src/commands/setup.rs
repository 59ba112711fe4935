//! `signkit setup`: the full signing setup run.
//!
//! Keystore → key.properties → Firebase config backup → build script patch,
//! all driven by one resolved [`SetupConfig`](signkit_core::SetupConfig).

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use signkit_core::assets::AssetCollector;
use signkit_core::flutter::{detect_firebase_packages, detect_flutter_project};
use signkit_core::models::SetupMarker;
use signkit_core::signing::{
    Keytool, KeystoreRequest, remove_keystore, signing_properties, write_key_properties,
    write_setup_marker,
};
use signkit_core::staging::{ensure_gitignore, prepare_staging_dir};

use super::assets::print_collection_report;
use super::patch::patch_step;
use crate::config::{ResolvedConfig, SetupOverrides, Source, load_config, resolve_config};
use crate::output::{
    confirm, print_info, print_key_value, print_section, print_success, print_warning, spinner,
};

#[derive(Args)]
pub struct SetupArgs {
    /// Replace an existing keystore without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Keystore password (a random one is generated when not configured)
    #[arg(long)]
    pub store_password: Option<String>,

    /// Key password (defaults to the keystore password)
    #[arg(long)]
    pub key_password: Option<String>,

    /// Key alias
    #[arg(long)]
    pub alias: Option<String>,
}

impl SetupArgs {
    fn overrides(&self) -> SetupOverrides {
        SetupOverrides {
            store_password: self.store_password.clone(),
            key_password: self.key_password.clone(),
            alias: self.alias.clone(),
        }
    }
}

pub async fn handle_setup_command(
    project_dir: &Path,
    config_path: &Path,
    args: SetupArgs,
) -> Result<()> {
    print_section("Android release signing setup");

    let keytool = Keytool::locate().await?;
    print_success(&format!("Using keytool at {}", keytool.path().display()));

    let file_config = load_config(config_path)?;
    let resolved = resolve_config(project_dir, &args.overrides(), file_config)?;
    let config = &resolved.setup;
    let layout = &config.layout;

    if !detect_flutter_project(layout.root()).await {
        print_warning(&format!(
            "No pubspec.yaml in {}; continuing anyway",
            layout.root().display()
        ));
    }

    let keystore_path = config.keystore_path();
    if keystore_path.exists() {
        print_warning(&format!("Keystore already exists at {}", keystore_path.display()));
        let replace = args.yes
            || confirm("Generate a new one? (the old one will be deleted)")
                .context("Failed to read answer")?;
        if !replace {
            print_info("Keeping the existing keystore; nothing was changed");
            return Ok(());
        }
        remove_keystore(&keystore_path).await?;
    }

    prepare_staging_dir(layout).await?;
    if ensure_gitignore(layout, false).await? {
        print_info(&format!(
            "Added {}/ to .gitignore",
            layout.staging_dir_name().display()
        ));
    }

    let progress = spinner("Generating keystore...");
    let generated = keytool.generate(&KeystoreRequest::from_config(config)).await;
    progress.finish_and_clear();
    let credentials = generated.context("Keystore generation failed")?;
    print_success(&format!("Created keystore {}", keystore_path.display()));

    let properties = signing_properties(config, credentials);
    let properties_path = write_key_properties(&layout.staging_dir(), &properties).await?;
    print_success(&format!("Wrote {}", properties_path.display()));

    backup_firebase_configs(&resolved).await;

    let patched = patch_step(layout).await?;

    let marker = SetupMarker::completed(&config.keystore.file_name, &config.keystore.alias);
    write_setup_marker(&layout.staging_dir(), &marker).await?;

    print_summary(&resolved, patched);
    Ok(())
}

/// Backs up Firebase config files. Never fails the run.
async fn backup_firebase_configs(resolved: &ResolvedConfig) {
    let layout = &resolved.setup.layout;

    match detect_firebase_packages(layout.root()).await {
        Ok(packages) if !packages.is_empty() => {
            print_info(&format!("Firebase packages in use: {}", packages.join(", ")));
        }
        Ok(_) => {}
        Err(e) => print_warning(&format!("Could not read pubspec.yaml: {}", e)),
    }

    match AssetCollector::new(layout).collect().await {
        Ok(report) => print_collection_report(&report),
        Err(e) => print_warning(&format!("Firebase config backup incomplete: {}", e)),
    }
}

fn print_summary(resolved: &ResolvedConfig, patched: bool) {
    let config = &resolved.setup;

    print_section("Summary");
    print_key_value("Keystore", &config.keystore_path().display().to_string());
    print_key_value("Alias", &config.keystore.alias);
    print_key_value("Validity", &format!("{} days", config.keystore.validity_days));
    print_key_value("Certificate", &config.identity.distinguished_name());
    print_key_value(
        "key.properties",
        &config.layout.properties_path().display().to_string(),
    );
    print_key_value(
        "Store password",
        match resolved.store_password {
            Source::Default => "generated, stored in key.properties",
            other => other.describe(),
        },
    );
    print_key_value(
        "Key password",
        match resolved.key_password {
            Source::Default => "same as store password",
            other => other.describe(),
        },
    );
    print_key_value("Build script", if patched { "patched" } else { "not patched" });

    println!();
    print_info(&format!(
        "Back up {} somewhere safe: without the keystore you cannot publish updates",
        config.layout.staging_dir_name().display()
    ));
    if patched {
        print_info("Build a signed release with: flutter build appbundle --release");
    } else {
        print_warning("Signing is not wired into the build script; run 'signkit doctor' for details");
    }
}
