//! `signkit doctor`: report what a setup run would find.

use std::path::Path;

use anyhow::Result;
use signkit_core::config::ProjectLayout;
use signkit_core::flutter::{detect_firebase_packages, detect_flutter_project, detect_platforms};
use signkit_core::gradle::{is_patched, locate_build_script};
use signkit_core::signing::{Keytool, KeytoolSearch, read_setup_marker};
use signkit_core::staging::ensure_gitignore;

use crate::output::{print_info, print_key_value, print_section, print_success, print_warning};

pub async fn handle_doctor_command(layout: &ProjectLayout, keystore_name: &str) -> Result<()> {
    print_section("Toolchain");
    check_keytool().await;

    print_section("Project");
    check_project(layout).await;

    print_section("Signing");
    check_signing(layout, keystore_name).await;

    print_section("Build script");
    check_build_script(layout).await;

    Ok(())
}

async fn check_keytool() {
    match KeytoolSearch::from_env().find() {
        Some(path) => match Keytool::at(&path).verify().await {
            Ok(()) => print_success(&format!("keytool found at {}", path.display())),
            Err(e) => print_warning(&e.to_string()),
        },
        None => print_warning("keytool not found; install a JDK or set JAVA_HOME"),
    }
}

async fn check_project(layout: &ProjectLayout) {
    let root = layout.root();

    if detect_flutter_project(root).await {
        print_success(&format!("Flutter project at {}", root.display()));
    } else {
        print_warning(&format!("No pubspec.yaml in {}", root.display()));
    }

    let platforms = detect_platforms(root).await;
    let names: Vec<&str> = platforms.iter().map(|p| p.as_str()).collect();
    if names.is_empty() {
        print_key_value("Platforms", "none");
    } else {
        print_key_value("Platforms", &names.join(", "));
    }

    match detect_firebase_packages(root).await {
        Ok(packages) if packages.is_empty() => print_key_value("Firebase", "not used"),
        Ok(packages) => print_key_value("Firebase", &packages.join(", ")),
        Err(e) => print_warning(&format!("Could not read pubspec.yaml: {}", e)),
    }
}

async fn check_signing(layout: &ProjectLayout, keystore_name: &str) {
    let staging = layout.staging_dir();

    report_file("Keystore", &staging.join(keystore_name));
    report_file("key.properties", &layout.properties_path());

    match read_setup_marker(&staging).await {
        Ok(Some(marker)) => print_key_value(
            "Last setup",
            &format!(
                "{} (signkit {})",
                marker.setup_date.format("%Y-%m-%d %H:%M:%S UTC"),
                marker.version
            ),
        ),
        Ok(None) => print_info("Setup has not been run yet"),
        Err(e) => print_warning(&format!("Unreadable setup marker: {}", e)),
    }

    match ensure_gitignore(layout, true).await {
        Ok(false) => print_key_value("Git", "staging directory is ignored"),
        Ok(true) => print_warning(&format!(
            "{}/ is not in .gitignore",
            layout.staging_dir_name().display()
        )),
        Err(e) => print_warning(&e.to_string()),
    }
}

async fn check_build_script(layout: &ProjectLayout) {
    let script = match locate_build_script(layout) {
        Ok(script) => script,
        Err(e) => {
            print_warning(&e.to_string());
            return;
        }
    };

    print_key_value("Path", &script.path.display().to_string());
    print_key_value("Dialect", script.dialect.as_str());

    match tokio::fs::read_to_string(&script.path).await {
        Ok(text) if is_patched(&text, script.dialect, &layout.properties_reference()) => {
            print_success("Release signing is configured");
        }
        Ok(_) => print_info("Release signing is not configured; run 'signkit patch'"),
        Err(e) => print_warning(&format!("Could not read {}: {}", script.path.display(), e)),
    }
}

fn report_file(label: &str, path: &Path) {
    let state = if path.is_file() { "present" } else { "missing" };
    print_key_value(label, &format!("{} ({})", path.display(), state));
}
