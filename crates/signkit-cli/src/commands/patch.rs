//! `signkit patch`: wire release signing into the Gradle build script.

use anyhow::Result;
use signkit_core::SignkitError;
use signkit_core::config::ProjectLayout;
use signkit_core::gradle::{PatchReport, PatchStatus, patch_project};

use crate::output::{print_info, print_success, print_warning};

pub async fn handle_patch_command(layout: &ProjectLayout) -> Result<()> {
    let report = patch_project(layout).await?;
    print_patch_report(&report);
    Ok(())
}

/// Runs the patcher as one step of a larger run.
///
/// A missing build script is reported as a warning instead of an error.
/// Returns whether the patch was applied.
pub async fn patch_step(layout: &ProjectLayout) -> Result<bool> {
    match patch_project(layout).await {
        Ok(report) => {
            print_patch_report(&report);
            Ok(report.status.is_applied())
        }
        Err(e @ SignkitError::NoBuildScript(_)) => {
            print_warning(&format!("{}; skipping build script patch", e));
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn print_patch_report(report: &PatchReport) {
    let path = report.script.path.display();

    match report.status {
        PatchStatus::Applied => {
            print_success(&format!(
                "Patched {} ({} DSL)",
                path,
                report.script.dialect
            ));
            if report.removed_blocks > 0 {
                print_info(&format!(
                    "Replaced {} existing release block(s)",
                    report.removed_blocks
                ));
            }
            if report.imports_inserted > 0 {
                print_info(&format!("Added {} import(s)", report.imports_inserted));
            }
        }
        PatchStatus::NoRootBlock => {
            print_warning(&format!(
                "No android {{ }} block found in {}; file left untouched",
                path
            ));
        }
        PatchStatus::NoInjectionPoint => {
            print_warning(&format!(
                "No defaultConfig {{ }} block inside android {{ }} in {}; add signing manually",
                path
            ));
        }
    }

    if let Some(backup) = &report.backup {
        print_info(&format!("Backup written to {}", backup.display()));
    }
}
