//! Release signing patcher for Gradle build scripts.
//!
//! A patch run walks a single document through
//! `Loaded → ReleaseBlockStripped → PreambleEnsured → ReleaseBlockInjected → Persisted`:
//!
//! 1. Existing release entries in `buildTypes`/`signingConfigs` are removed
//!    (containers left empty go with them). Top-level `android.buildTypes {`
//!    containers count too.
//! 2. The `key.properties` loader is inserted before `android {` unless the
//!    script already declares `keystorePropertiesFile`. Kotlin scripts also
//!    get their two imports.
//! 3. Fresh `signingConfigs`/`buildTypes` blocks are inserted right after the
//!    first `defaultConfig` block of `android`.
//! 4. The original bytes go to `<script>.backup`, then the patched text
//!    replaces the script.
//!
//! Applying the patch to an already patched script reproduces it exactly.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;

use super::scanner::{Block, Scanner};
use super::templates::{self, KOTLIN_IMPORTS, PREAMBLE_MARKER};
use super::{BuildScript, Dialect, locate_build_script};
use crate::config::ProjectLayout;
use crate::error::{Result, SignkitError};

pub const BACKUP_SUFFIX: &str = ".backup";

static ROOT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bandroid\s*\{").expect("valid root block pattern"));

static DEFAULT_CONFIG_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdefaultConfig\s*\{").expect("valid defaultConfig pattern"));

static RELEASE_CONTAINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:android\s*\.\s*)?(?:buildTypes|signingConfigs)\s*\{")
        .expect("valid container pattern")
});

static RELEASE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\brelease|\b(?:getByName|create|named|register|maybeCreate)\(\s*["']release["']\s*\))\s*\{"#,
    )
    .expect("valid release entry pattern")
});

/// Progress of a patch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchStage {
    Loaded,
    ReleaseBlockStripped,
    PreambleEnsured,
    ReleaseBlockInjected,
    Persisted,
}

impl PatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchStage::Loaded => "loaded",
            PatchStage::ReleaseBlockStripped => "release_block_stripped",
            PatchStage::PreambleEnsured => "preamble_ensured",
            PatchStage::ReleaseBlockInjected => "release_block_injected",
            PatchStage::Persisted => "persisted",
        }
    }
}

impl std::fmt::Display for PatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of patching a document in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    /// Signing configuration injected.
    Applied,
    /// No top-level `android { }` block; nothing is written.
    NoRootBlock,
    /// No `defaultConfig { }` inside `android`; the text is left unchanged.
    NoInjectionPoint,
}

impl PatchStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchStatus::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    pub status: PatchStatus,
    /// Release entries removed before injection.
    pub removed_blocks: usize,
    pub preamble_inserted: bool,
    pub imports_inserted: usize,
}

/// Result of patching a script on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub script: BuildScript,
    pub status: PatchStatus,
    /// Last stage reached.
    pub stage: PatchStage,
    /// Backup written before any change, if the run got that far.
    pub backup: Option<PathBuf>,
    pub removed_blocks: usize,
    pub preamble_inserted: bool,
    pub imports_inserted: usize,
}

/// Patches a script's text. Pure: no IO.
///
/// When the status is not [`PatchStatus::Applied`] the returned text equals
/// the input.
pub fn patch_document(original: &str, dialect: Dialect, properties_reference: &str) -> PatchOutcome {
    let unchanged = |status| PatchOutcome {
        text: original.to_string(),
        status,
        removed_blocks: 0,
        preamble_inserted: false,
        imports_inserted: 0,
    };
    let newline = if original.contains("\r\n") { "\r\n" } else { "\n" };

    let (text, removed_blocks) = strip_release_blocks(original);
    tracing::debug!(stage = %PatchStage::ReleaseBlockStripped, removed_blocks);

    if find_root_block(&text).is_none() {
        return unchanged(PatchStatus::NoRootBlock);
    }

    let (text, imports_inserted) = match dialect {
        Dialect::Kotlin => ensure_kotlin_imports(&text, newline),
        Dialect::Groovy => (text, 0),
    };
    let Some((text, preamble_inserted)) =
        ensure_preamble(&text, dialect, properties_reference, newline)
    else {
        return unchanged(PatchStatus::NoRootBlock);
    };
    tracing::debug!(stage = %PatchStage::PreambleEnsured, preamble_inserted, imports_inserted);

    let Some(text) = inject_signing_blocks(&text, dialect, newline) else {
        tracing::debug!("No defaultConfig block inside android; leaving script unchanged");
        return unchanged(PatchStatus::NoInjectionPoint);
    };
    tracing::debug!(stage = %PatchStage::ReleaseBlockInjected);

    PatchOutcome {
        text,
        status: PatchStatus::Applied,
        removed_blocks,
        preamble_inserted,
        imports_inserted,
    }
}

/// Whether patching `text` would be a no-op, i.e. it already carries the signing setup.
pub fn is_patched(text: &str, dialect: Dialect, properties_reference: &str) -> bool {
    let outcome = patch_document(text, dialect, properties_reference);
    outcome.status.is_applied() && outcome.text == text
}

/// Removes every release entry of every `buildTypes`/`signingConfigs` block.
///
/// Returns the new text and the number of release entries removed.
pub fn strip_release_blocks(text: &str) -> (String, usize) {
    let mut text = text.to_string();
    let mut removed = 0;

    while let Some(range) = next_release_removal(&text) {
        text.replace_range(range, "");
        removed += 1;
    }

    (text, removed)
}

/// Locates the next release entry and returns the span to delete: the entry
/// itself, or its whole container when nothing else would remain inside.
fn next_release_removal(text: &str) -> Option<Range<usize>> {
    let scanner = Scanner::new(text);

    for container in scanner.blocks(&RELEASE_CONTAINER, 0..text.len(), None) {
        let child_depth = scanner.depth_at(container.open) + 1;
        let Some(entry) = scanner
            .blocks(&RELEASE_ENTRY, container.body(), Some(child_depth))
            .into_iter()
            .next()
        else {
            continue;
        };

        let entry_span = removal_span(text, &entry);
        let before = &text[container.open + 1..entry_span.start];
        let after = &text[entry_span.end..container.close];
        if before.trim().is_empty() && after.trim().is_empty() {
            return Some(removal_span(text, &container));
        }
        return Some(entry_span);
    }

    None
}

/// A block plus the whitespace preceding it.
fn removal_span(text: &str, block: &Block) -> Range<usize> {
    let bytes = text.as_bytes();
    let mut start = block.start;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t' | b'\r' | b'\n') {
        start -= 1;
    }
    start..block.end()
}

fn find_root_block(text: &str) -> Option<Block> {
    Scanner::new(text)
        .blocks(&ROOT_BLOCK, 0..text.len(), Some(0))
        .into_iter()
        .next()
}

/// Inserts the properties loader before `android {` unless already present.
///
/// Returns `None` when there is no root block.
fn ensure_preamble(
    text: &str,
    dialect: Dialect,
    properties_reference: &str,
    newline: &str,
) -> Option<(String, bool)> {
    let root = find_root_block(text)?;
    if text.contains(PREAMBLE_MARKER) {
        return Some((text.to_string(), false));
    }

    let preamble = with_line_endings(&templates::preamble(dialect, properties_reference), newline);
    let mut patched = String::with_capacity(text.len() + preamble.len() + 2);
    patched.push_str(&text[..root.start]);
    patched.push_str(&preamble);
    patched.push_str(newline);
    patched.push_str(&text[root.start..]);
    Some((patched, true))
}

/// Adds the imports the Kotlin loader needs, each only once.
///
/// Missing imports go after the last existing top-level import. Without
/// one they follow the leading `@file:` annotations and `package` line, or
/// open the file, separated from the rest by a blank line.
fn ensure_kotlin_imports(text: &str, newline: &str) -> (String, usize) {
    let present = |import: &str| {
        text.lines()
            .any(|line| line.trim().trim_end_matches(';').trim_end() == import)
    };
    let missing: Vec<&str> = KOTLIN_IMPORTS.into_iter().filter(|i| !present(i)).collect();
    if missing.is_empty() {
        return (text.to_string(), 0);
    }

    let mut block = String::new();
    for import in &missing {
        block.push_str(import);
        block.push_str(newline);
    }

    let mut offset = 0;
    let mut last_import_end = None;
    for line in text.split_inclusive('\n') {
        if line.starts_with("import ") {
            last_import_end = Some(offset + line.len());
        }
        offset += line.len();
    }

    let patched = match last_import_end {
        Some(end) if text[..end].ends_with('\n') => {
            format!("{}{}{}", &text[..end], block, &text[end..])
        }
        Some(end) => format!("{}{}{}{}", &text[..end], newline, block, &text[end..]),
        None => match file_header_end(text) {
            Some(end) if text[..end].ends_with('\n') => {
                format!("{}{}{}{}", &text[..end], newline, block, &text[end..])
            }
            Some(end) => format!("{}{}{}{}{}", &text[..end], newline, newline, block, &text[end..]),
            None => format!("{}{}{}", block, newline, text),
        },
    };
    (patched, missing.len())
}

/// End of the last `@file:` annotation or `package` line before any code.
///
/// Blank lines and comments may sit between them.
fn file_header_end(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut end = None;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("@file:") || trimmed.starts_with("package ") {
            end = Some(offset + line.len());
        } else if !(trimmed.is_empty()
            || trimmed.starts_with("//")
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*'))
        {
            break;
        }
        offset += line.len();
    }
    end
}

/// Inserts the signing blocks after the first `defaultConfig` of `android`.
///
/// Returns `None` when there is no such block.
fn inject_signing_blocks(text: &str, dialect: Dialect, newline: &str) -> Option<String> {
    let scanner = Scanner::new(text);
    let root = scanner
        .blocks(&ROOT_BLOCK, 0..text.len(), Some(0))
        .into_iter()
        .next()?;
    let default_config = scanner
        .blocks(&DEFAULT_CONFIG_BLOCK, root.body(), Some(1))
        .into_iter()
        .next()?;

    let indent = line_indent(text, default_config.start);
    let blocks = with_line_endings(&templates::signing_blocks(dialect, indent), newline);

    let at = default_config.end();
    let mut patched = String::with_capacity(text.len() + blocks.len());
    patched.push_str(&text[..at]);
    patched.push_str(&blocks);
    patched.push_str(&text[at..]);
    Some(patched)
}

/// Leading whitespace of the line containing `pos`, or four spaces if the
/// header does not start its line.
fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &text[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') && !prefix.is_empty() {
        prefix
    } else {
        "    "
    }
}

fn with_line_endings(snippet: &str, newline: &str) -> String {
    if newline == "\n" {
        snippet.to_string()
    } else {
        snippet.replace('\n', newline)
    }
}

/// Path of the backup written next to `script`.
pub fn backup_path(script: &Path) -> PathBuf {
    let mut name = script.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Locates the project's build script and patches it.
pub async fn patch_project(layout: &ProjectLayout) -> Result<PatchReport> {
    let script = locate_build_script(layout)?;
    patch_script(&script, &layout.properties_reference()).await
}

/// Patches `script` on disk.
///
/// The backup is written for every run that finds the root block, even when
/// no injection point exists. The script itself is only rewritten when the
/// patch applied.
pub async fn patch_script(script: &BuildScript, properties_reference: &str) -> Result<PatchReport> {
    let bytes = tokio::fs::read(&script.path)
        .await
        .map_err(|e| SignkitError::io(format!("Failed to read {}", script.path.display()), e))?;
    let original = String::from_utf8(bytes).map_err(|e| {
        SignkitError::io(
            format!("{} is not valid UTF-8", script.path.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;
    tracing::debug!(stage = %PatchStage::Loaded, dialect = %script.dialect, path = %script.path.display());

    let outcome = patch_document(&original, script.dialect, properties_reference);
    let mut report = PatchReport {
        script: script.clone(),
        status: outcome.status,
        stage: PatchStage::ReleaseBlockStripped,
        backup: None,
        removed_blocks: outcome.removed_blocks,
        preamble_inserted: outcome.preamble_inserted,
        imports_inserted: outcome.imports_inserted,
    };

    if outcome.status == PatchStatus::NoRootBlock {
        tracing::warn!("No android block in {}; leaving it untouched", script.path.display());
        return Ok(report);
    }

    let backup = backup_path(&script.path);
    tokio::fs::write(&backup, original.as_bytes())
        .await
        .map_err(|e| SignkitError::io(format!("Failed to write {}", backup.display()), e))?;
    tracing::debug!("Backed up {} to {}", script.path.display(), backup.display());
    report.backup = Some(backup);

    if outcome.status == PatchStatus::NoInjectionPoint {
        report.stage = PatchStage::PreambleEnsured;
        return Ok(report);
    }

    write_replacing(&script.path, &outcome.text).await?;
    report.stage = PatchStage::Persisted;
    tracing::debug!(stage = %PatchStage::Persisted, path = %script.path.display());

    Ok(report)
}

/// Writes to a sibling temp file and renames it over `path`.
async fn write_replacing(path: &Path, content: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".signkit-tmp");
    let tmp = PathBuf::from(tmp);

    let replaced = match tokio::fs::write(&tmp, content).await {
        Ok(()) => tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| SignkitError::io(format!("Failed to replace {}", path.display()), e)),
        Err(e) => Err(SignkitError::io(format!("Failed to write {}", tmp.display()), e)),
    };
    if replaced.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &str = "../necessary_files/key.properties";

    const GROOVY: &str = "\
plugins {
    id \"com.android.application\"
}

android {
    namespace \"com.example.app\"

    defaultConfig {
        applicationId \"com.example.app\"
        minSdkVersion 21
    }

    buildTypes {
        release {
            signingConfig signingConfigs.debug
        }
    }
}

flutter {
    source '../..'
}
";

    const KOTLIN: &str = "\
plugins {
    id(\"com.android.application\")
}

android {
    namespace = \"com.example.app\"

    defaultConfig {
        applicationId = \"com.example.app\"
    }

    buildTypes {
        getByName(\"release\") {
            isMinifyEnabled = false
            proguardFiles(getDefaultProguardFile(\"proguard-android.txt\"), \"proguard-rules.pro\")
        }
    }
}
";

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_groovy_patch_applies() {
        let outcome = patch_document(GROOVY, Dialect::Groovy, PROPS);

        assert_eq!(outcome.status, PatchStatus::Applied);
        assert_eq!(outcome.removed_blocks, 1);
        assert!(outcome.preamble_inserted);
        assert_eq!(outcome.imports_inserted, 0);

        let text = &outcome.text;
        assert_eq!(count(text, "def keystorePropertiesFile"), 1);
        assert!(text.find("def keystorePropertiesFile").unwrap() < text.find("android {").unwrap());
        assert_eq!(count(text, "signingConfigs {"), 1);
        assert_eq!(count(text, "buildTypes {"), 1);
        assert_eq!(count(text, "signingConfig signingConfigs.release"), 1);
        assert!(!text.contains("signingConfigs.debug"));
        assert!(text.contains("flutter {\n    source '../..'\n}\n"));
        // Injected right after defaultConfig.
        let default_end = text.find("minSdkVersion 21\n    }").unwrap();
        let signing = text.find("    signingConfigs {").unwrap();
        assert!(signing > default_end);
        assert_eq!(&text[default_end + 22..signing], "\n\n");
    }

    #[test]
    fn test_kotlin_patch_applies() {
        let outcome = patch_document(KOTLIN, Dialect::Kotlin, PROPS);

        assert_eq!(outcome.status, PatchStatus::Applied);
        assert_eq!(outcome.imports_inserted, 2);
        let text = &outcome.text;
        assert!(text.starts_with(
            "import java.util.Properties\nimport java.io.FileInputStream\n\nplugins {"
        ));
        assert!(text.contains("rootProject.file(\"../necessary_files/key.properties\")"));
        assert_eq!(count(text, "create(\"release\")"), 1);
        assert_eq!(count(text, "getByName(\"release\") {"), 1);
        assert!(!text.contains("isMinifyEnabled"));
    }

    #[test]
    fn test_patch_is_idempotent() {
        for (doc, dialect) in [(GROOVY, Dialect::Groovy), (KOTLIN, Dialect::Kotlin)] {
            let once = patch_document(doc, dialect, PROPS);
            let twice = patch_document(&once.text, dialect, PROPS);
            assert_eq!(twice.status, PatchStatus::Applied);
            assert_eq!(twice.text, once.text);
            assert!(!twice.preamble_inserted);
            assert_eq!(twice.imports_inserted, 0);
            assert_eq!(twice.removed_blocks, 2);
            assert!(is_patched(&once.text, dialect, PROPS));
            assert!(!is_patched(doc, dialect, PROPS));
        }
    }

    #[test]
    fn test_no_default_config_leaves_text_unchanged() {
        let doc = "android {\n}\n";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert_eq!(outcome.status, PatchStatus::NoInjectionPoint);
        assert_eq!(outcome.text, doc);
    }

    #[test]
    fn test_no_default_config_discards_strip() {
        let doc = "android {\n    buildTypes {\n        release {\n        }\n    }\n}\n";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert_eq!(outcome.status, PatchStatus::NoInjectionPoint);
        assert_eq!(outcome.text, doc);
    }

    #[test]
    fn test_no_root_block() {
        let doc = "plugins {\n}\ndefaultConfig {\n}\n";
        let outcome = patch_document(doc, Dialect::Kotlin, PROPS);
        assert_eq!(outcome.status, PatchStatus::NoRootBlock);
        assert_eq!(outcome.text, doc);
    }

    #[test]
    fn test_strip_keeps_sibling_build_types() {
        let doc = "\
android {
    buildTypes {
        debug {
            debuggable true
        }
        release {
            minifyEnabled true
        }
    }
}
";
        let (text, removed) = strip_release_blocks(doc);
        assert_eq!(removed, 1);
        assert_eq!(
            text,
            "android {\n    buildTypes {\n        debug {\n            debuggable true\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_strip_handles_deep_nesting() {
        let doc = "\
android {
    buildTypes {
        release {
            if (true) {
                ndk {
                    abiFilters 'arm64-v8a'
                }
            }
        }
    }
}
";
        let (text, removed) = strip_release_blocks(doc);
        assert_eq!(removed, 1);
        assert_eq!(text, "android {\n}\n");
    }

    #[test]
    fn test_strip_ignores_commented_release() {
        let doc = "android {\n    buildTypes {\n        // release { }\n        debug { }\n    }\n}\n";
        let (text, removed) = strip_release_blocks(doc);
        assert_eq!(removed, 0);
        assert_eq!(text, doc);
    }

    #[test]
    fn test_strip_is_noop_without_release() {
        let (text, removed) = strip_release_blocks(GROOVY.replace("release", "debug").as_str());
        assert_eq!(removed, 0);
        assert_eq!(text, GROOVY.replace("release", "debug"));
    }

    #[test]
    fn test_existing_preamble_not_duplicated() {
        let doc = "\
def keystoreProperties = new Properties()
def keystorePropertiesFile = rootProject.file('key.properties')

android {
    defaultConfig {
    }
}
";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert!(!outcome.preamble_inserted);
        assert_eq!(count(&outcome.text, "def keystorePropertiesFile"), 1);
    }

    #[test]
    fn test_kotlin_imports_after_existing_imports() {
        let doc = "import java.io.FileInputStream\nimport java.util.Base64\n\nandroid {\n    defaultConfig {\n    }\n}\n";
        let outcome = patch_document(doc, Dialect::Kotlin, PROPS);
        assert_eq!(outcome.imports_inserted, 1);
        assert!(outcome.text.starts_with(
            "import java.io.FileInputStream\nimport java.util.Base64\nimport java.util.Properties\n\n"
        ));
        assert_eq!(count(&outcome.text, "import java.io.FileInputStream"), 1);
    }

    #[test]
    fn test_kotlin_imports_follow_file_header() {
        let doc = "\
@file:Suppress(\"UnstableApiUsage\")

package com.example.app

android {
    defaultConfig {
    }
}
";
        let outcome = patch_document(doc, Dialect::Kotlin, PROPS);
        assert_eq!(outcome.imports_inserted, 2);
        assert!(outcome.text.starts_with(
            "@file:Suppress(\"UnstableApiUsage\")\n\npackage com.example.app\n\n\
             import java.util.Properties\nimport java.io.FileInputStream\n\n"
        ));
        let again = patch_document(&outcome.text, Dialect::Kotlin, PROPS);
        assert_eq!(again.text, outcome.text);
    }

    #[test]
    fn test_file_header_end_skips_comments() {
        let doc = "// Generated\n@file:JvmName(\"App\")\n/* note */\nplugins {\n}\n";
        assert_eq!(file_header_end(doc), Some(doc.find("/*").unwrap()));
        assert_eq!(file_header_end("plugins {\n}\n@file:JvmName(\"App\")\n"), None);
        assert_eq!(file_header_end("package demo"), Some(12));
    }

    #[test]
    fn test_strip_top_level_member_container() {
        let doc = "\
android {
    defaultConfig {
    }
}

android.buildTypes {
    release {
        minifyEnabled true
    }
}

android.signingConfigs {
    debug { }
    release { }
}
";
        let (text, removed) = strip_release_blocks(doc);
        assert_eq!(removed, 2);
        assert_eq!(
            text,
            "android {\n    defaultConfig {\n    }\n}\n\nandroid.signingConfigs {\n    debug { }\n}\n"
        );

        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert_eq!(outcome.status, PatchStatus::Applied);
        assert_eq!(count(&outcome.text, "release {"), 2);
        assert!(!outcome.text.contains("minifyEnabled"));
    }

    #[test]
    fn test_strip_ignores_nested_member_container() {
        let doc = "project.android.buildTypes {\n    release { }\n}\n";
        let (text, removed) = strip_release_blocks(doc);
        assert_eq!(removed, 0);
        assert_eq!(text, doc);
    }

    #[tokio::test]
    async fn test_write_replacing_cleans_up_on_failure() {
        let dir = tempfile::tempdir().unwrap();

        // Rename onto a non-empty directory fails after the temp file exists.
        let target = dir.path().join("build.gradle");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "").unwrap();
        assert!(write_replacing(&target, "patched").await.is_err());
        assert!(!dir.path().join("build.gradle.signkit-tmp").exists());
        assert!(target.join("keep").is_file());

        // The temp file cannot be written at all.
        let target = dir.path().join("missing/build.gradle");
        let err = write_replacing(&target, "patched").await.unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_write_replacing_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.gradle");
        std::fs::write(&target, "original").unwrap();

        write_replacing(&target, "patched").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "patched");
        assert!(!dir.path().join("build.gradle.signkit-tmp").exists());
    }

    #[test]
    fn test_only_first_default_config_used() {
        let doc = "\
android {
    defaultConfig {
    }
    productFlavors {
        free {
            defaultConfig {
            }
        }
    }
}
";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert_eq!(count(&outcome.text, "signingConfigs {"), 1);
        let first = outcome.text.find("defaultConfig {\n    }").unwrap();
        let signing = outcome.text.find("signingConfigs {").unwrap();
        let flavors = outcome.text.find("productFlavors").unwrap();
        assert!(first < signing && signing < flavors);
    }

    #[test]
    fn test_crlf_preserved() {
        let doc = "android {\r\n    defaultConfig {\r\n    }\r\n}\r\n";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert_eq!(outcome.status, PatchStatus::Applied);
        assert!(!outcome.text.replace("\r\n", "").contains('\n'));
        let again = patch_document(&outcome.text, Dialect::Groovy, PROPS);
        assert_eq!(again.text, outcome.text);
    }

    #[test]
    fn test_tab_indentation_followed() {
        let doc = "android {\n\tdefaultConfig {\n\t}\n}\n";
        let outcome = patch_document(doc, Dialect::Groovy, PROPS);
        assert!(outcome.text.contains("\n\tsigningConfigs {\n\t    release {"));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("android/app/build.gradle.kts")),
            PathBuf::from("android/app/build.gradle.kts.backup")
        );
    }
}
