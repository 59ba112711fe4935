//! Keystore credential models.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Passwords protecting a generated keystore and its key entry.
#[derive(Debug)]
pub struct KeystoreCredentials {
    pub store_password: SecretString,
    pub key_password: SecretString,
}

impl KeystoreCredentials {
    /// Uses the same password for the store and the key entry.
    pub fn shared(password: &str) -> Self {
        Self {
            store_password: SecretString::from(password.to_string()),
            key_password: SecretString::from(password.to_string()),
        }
    }

    /// Uses independent store and key passwords.
    pub fn separate(store_password: &str, key_password: &str) -> Self {
        Self {
            store_password: SecretString::from(store_password.to_string()),
            key_password: SecretString::from(key_password.to_string()),
        }
    }

    /// Returns true when the key entry reuses the store password.
    pub fn is_shared(&self) -> bool {
        self.store_password.expose_secret() == self.key_password.expose_secret()
    }
}

/// Contents of `key.properties`, consumed by the Gradle build.
#[derive(Debug)]
pub struct SigningProperties {
    pub store_password: SecretString,
    pub key_password: SecretString,
    pub key_alias: String,
    /// Keystore path as resolved by the Gradle app module.
    pub store_file: String,
}

/// Marker written once a setup run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupMarker {
    pub setup_completed: bool,
    pub setup_date: DateTime<Utc>,
    pub keystore_name: String,
    pub key_alias: String,
    pub version: String,
}

impl SetupMarker {
    pub fn completed(keystore_name: &str, key_alias: &str) -> Self {
        Self {
            setup_completed: true,
            setup_date: Utc::now(),
            keystore_name: keystore_name.to_string(),
            key_alias: key_alias.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}
