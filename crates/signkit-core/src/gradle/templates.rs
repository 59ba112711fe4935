//! Code snippets injected into Gradle build scripts.

use super::Dialect;

/// Identifier declared by the properties loader; its presence means the loader exists.
pub const PREAMBLE_MARKER: &str = "keystorePropertiesFile";

/// Imports a Kotlin script needs for the properties loader.
pub const KOTLIN_IMPORTS: [&str; 2] = ["import java.util.Properties", "import java.io.FileInputStream"];

/// Loader placed before the `android` block. Ends with a newline.
pub fn preamble(dialect: Dialect, properties_reference: &str) -> String {
    match dialect {
        Dialect::Groovy => format!(
            "def keystoreProperties = new Properties()\n\
             def keystorePropertiesFile = rootProject.file('{}')\n\
             if (keystorePropertiesFile.exists()) {{\n\
             \x20   keystoreProperties.load(new FileInputStream(keystorePropertiesFile))\n\
             }}\n",
            properties_reference
        ),
        Dialect::Kotlin => format!(
            "val keystorePropertiesFile = rootProject.file(\"{}\")\n\
             val keystoreProperties = Properties()\n\
             if (keystorePropertiesFile.exists()) {{\n\
             \x20   keystoreProperties.load(FileInputStream(keystorePropertiesFile))\n\
             }}\n",
            properties_reference
        ),
    }
}

/// `signingConfigs` and `buildTypes` blocks inserted after `defaultConfig`.
///
/// Starts with a blank line and has no trailing newline, so removing both
/// blocks together with their leading whitespace restores the original text.
pub fn signing_blocks(dialect: Dialect, indent: &str) -> String {
    let body = match dialect {
        Dialect::Groovy => GROOVY_SIGNING_BLOCKS,
        Dialect::Kotlin => KOTLIN_SIGNING_BLOCKS,
    };

    let mut out = String::from("\n");
    for line in body.lines() {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

const GROOVY_SIGNING_BLOCKS: &str = "\
signingConfigs {
    release {
        if (keystorePropertiesFile.exists()) {
            keyAlias keystoreProperties['keyAlias']
            keyPassword keystoreProperties['keyPassword']
            storeFile keystoreProperties['storeFile'] ? file(keystoreProperties['storeFile']) : null
            storePassword keystoreProperties['storePassword']
        }
    }
}

buildTypes {
    release {
        signingConfig signingConfigs.release
    }
}";

const KOTLIN_SIGNING_BLOCKS: &str = "\
signingConfigs {
    create(\"release\") {
        if (keystorePropertiesFile.exists()) {
            keyAlias = keystoreProperties[\"keyAlias\"] as String
            keyPassword = keystoreProperties[\"keyPassword\"] as String
            storeFile = file(keystoreProperties[\"storeFile\"] as String)
            storePassword = keystoreProperties[\"storePassword\"] as String
        }
    }
}

buildTypes {
    getByName(\"release\") {
        signingConfig = signingConfigs.getByName(\"release\")
    }
}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groovy_preamble() {
        let text = preamble(Dialect::Groovy, "../necessary_files/key.properties");
        assert!(text.contains("rootProject.file('../necessary_files/key.properties')"));
        assert!(text.contains(PREAMBLE_MARKER));
        assert!(text.contains("\n    keystoreProperties.load(new FileInputStream"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_kotlin_preamble() {
        let text = preamble(Dialect::Kotlin, "../necessary_files/key.properties");
        assert!(text.contains("rootProject.file(\"../necessary_files/key.properties\")"));
        assert!(text.contains("Properties()"));
    }

    #[test]
    fn test_signing_blocks_indentation() {
        let text = signing_blocks(Dialect::Groovy, "\t");
        assert!(text.starts_with("\n\n\tsigningConfigs {"));
        assert!(text.contains("\n\n\tbuildTypes {"));
        assert!(text.ends_with("\t}"));
        assert!(!text.contains("\n\t\n"));
    }
}
