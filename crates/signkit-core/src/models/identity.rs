//! Certificate identity attributes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignkitError};

/// Identity bound into the self-signed certificate of a new keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Developer name (CN).
    pub common_name: String,
    /// Organizational unit (OU).
    pub organizational_unit: String,
    /// Organization (O).
    pub organization: String,
    /// City or locality (L).
    pub city: String,
    /// State or province (ST).
    pub state: String,
    /// Two-letter country code (C).
    pub country: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            common_name: "Android Developer".to_string(),
            organizational_unit: "Development".to_string(),
            organization: "Unknown".to_string(),
            city: "Unknown".to_string(),
            state: "Unknown".to_string(),
            country: "US".to_string(),
        }
    }
}

impl Identity {
    /// Checks that every attribute is present and the country code is two letters.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in self.fields() {
            if value.trim().is_empty() {
                return Err(SignkitError::InvalidIdentity(format!(
                    "{} must not be empty",
                    field
                )));
            }
            if value.chars().any(|c| c.is_control()) {
                return Err(SignkitError::InvalidIdentity(format!(
                    "{} contains control characters",
                    field
                )));
            }
        }

        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SignkitError::InvalidIdentity(format!(
                "country must be a two-letter code, got '{}'",
                self.country
            )));
        }

        Ok(())
    }

    /// Renders the distinguished name passed to `keytool -dname`.
    pub fn distinguished_name(&self) -> String {
        self.fields()
            .iter()
            .map(|(field, value)| format!("{}={}", field, escape_dn_value(value)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("CN", self.common_name.as_str()),
            ("OU", self.organizational_unit.as_str()),
            ("O", self.organization.as_str()),
            ("L", self.city.as_str()),
            ("ST", self.state.as_str()),
            ("C", self.country.as_str()),
        ]
    }
}

/// Escapes RFC 2253 special characters so keytool keeps the value intact.
///
/// A leading `#` would otherwise start a hex-encoded value, and unescaped
/// leading or trailing spaces are dropped.
fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len() + 2);
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && c == '#')
            || ((i == 0 || i == last) && c == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
