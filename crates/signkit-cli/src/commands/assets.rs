//! `signkit assets` commands for Firebase config backups.

use anyhow::Result;
use clap::Subcommand;
use signkit_core::assets::{AssetCollector, CollectionReport, RestoreReport};
use signkit_core::config::ProjectLayout;
use signkit_core::staging::{ensure_gitignore, prepare_staging_dir};

use crate::output::{print_info, print_success, print_warning};

#[derive(Subcommand)]
pub enum AssetsCommands {
    /// Copy Firebase config files into the staging directory
    Collect,

    /// Copy staged Firebase config files back into the project
    Restore {
        /// Overwrite files that differ from the staged copy
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_assets_command(layout: &ProjectLayout, cmd: AssetsCommands) -> Result<()> {
    match cmd {
        AssetsCommands::Collect => {
            prepare_staging_dir(layout).await?;
            if ensure_gitignore(layout, false).await? {
                print_info(&format!(
                    "Added {}/ to .gitignore",
                    layout.staging_dir_name().display()
                ));
            }
            let report = AssetCollector::new(layout).collect().await?;
            print_collection_report(&report);
        }
        AssetsCommands::Restore { force } => {
            let report = AssetCollector::new(layout).restore(force).await;
            print_restore_report(&report);
        }
    }
    Ok(())
}

pub fn print_collection_report(report: &CollectionReport) {
    for entry in &report.manifest.entries {
        print_success(&format!(
            "Backed up {} to {}",
            entry.original.display(),
            entry.backup.display()
        ));
    }
    for platform in &report.missing {
        print_info(&format!("No {} found", platform.description()));
    }
    for failure in &report.failures {
        print_warning(&format!(
            "Could not back up {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
    if let Some(path) = &report.manifest_path {
        print_info(&format!("Manifest written to {}", path.display()));
    }
}

fn print_restore_report(report: &RestoreReport) {
    for entry in &report.restored {
        print_success(&format!("Restored {}", entry.original.display()));
    }
    for platform in &report.missing {
        print_info(&format!("No staged {}", platform.description()));
    }
    for path in &report.conflicts {
        print_warning(&format!(
            "{} differs from the staged copy; use --force to overwrite",
            path.display()
        ));
    }
    for failure in &report.failures {
        print_warning(&format!(
            "Could not restore {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
}
