//! Firebase platform config assets and the backup manifest.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Platform owning an auxiliary config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    /// Well-known location of the Firebase config, relative to the project root.
    pub fn source_path(&self) -> &'static str {
        match self {
            Platform::Android => "android/app/google-services.json",
            Platform::Ios => "ios/Runner/GoogleService-Info.plist",
        }
    }

    /// File name used inside the staging directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Platform::Android => "google-services.json",
            Platform::Ios => "GoogleService-Info.plist",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Platform::Android => "Android Firebase Config",
            Platform::Ios => "iOS Firebase Config",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One auxiliary file copied into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub platform: Platform,
    pub file_name: String,
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// Ordered list of assets backed up during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    pub entries: Vec<AssetEntry>,
}

impl AssetManifest {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: AssetEntry) {
        self.entries.push(entry);
    }
}
