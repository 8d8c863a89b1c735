//! Discovery configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! private_prefix = "_"
//! include_symbols = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::class::Visibility;
use crate::error::{Error, Result};

/// Rules deciding which callable members discovery reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Names starting with this prefix are private. Empty disables the
    /// naming convention; `Visibility::Private` members stay private.
    #[serde(default = "default_private_prefix")]
    pub private_prefix: String,

    /// Report symbol-keyed methods (stringified as `Symbol(desc)`)
    #[serde(default = "default_include_symbols")]
    pub include_symbols: bool,
}

fn default_private_prefix() -> String {
    "_".to_string()
}

fn default_include_symbols() -> bool {
    true
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            private_prefix: default_private_prefix(),
            include_symbols: default_include_symbols(),
        }
    }
}

impl DiscoveryConfig {
    /// Parse a config from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DiscoveryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<()> {
        if self.private_prefix.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig(format!(
                "private_prefix {:?} must not contain whitespace",
                self.private_prefix
            )));
        }
        Ok(())
    }

    /// Use a different private prefix. Fails on the same prefixes
    /// [`validate`](Self::validate) rejects.
    pub fn with_private_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        self.private_prefix = prefix.into();
        self.validate()?;
        Ok(self)
    }

    /// Toggle symbol-keyed methods
    pub fn with_symbols(mut self, include: bool) -> Self {
        self.include_symbols = include;
        self
    }

    /// Check whether a member with this name and visibility is hidden
    pub fn is_private(&self, name: &str, visibility: Visibility) -> bool {
        visibility == Visibility::Private
            || (!self.private_prefix.is_empty() && name.starts_with(&self.private_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.private_prefix, "_");
        assert!(config.include_symbols);
        assert!(config.is_private("_hidden", Visibility::Public));
        assert!(config.is_private("shown", Visibility::Private));
        assert!(!config.is_private("shown", Visibility::Public));
    }

    #[test]
    fn test_parse_partial() {
        let config = DiscoveryConfig::from_toml_str("include_symbols = false").unwrap();
        assert_eq!(config.private_prefix, "_");
        assert!(!config.include_symbols);
    }

    #[test]
    fn test_empty_prefix_disables_convention() {
        let config = DiscoveryConfig::from_toml_str(r#"private_prefix = """#).unwrap();
        assert!(!config.is_private("_hidden", Visibility::Public));
        assert!(config.is_private("_hidden", Visibility::Private));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            DiscoveryConfig::from_toml_str(r#"private_prefix = "_ ""#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            DiscoveryConfig::from_toml_str("private_prefix = 3"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_prefix() {
        assert!(matches!(
            DiscoveryConfig::default().with_private_prefix(" "),
            Err(Error::InvalidConfig(_))
        ));
        let config = DiscoveryConfig::default().with_private_prefix("").unwrap();
        assert!(!config.is_private("_shown", Visibility::Public));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "private_prefix = \"__\"").unwrap();
        let config = DiscoveryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.private_prefix, "__");
        assert!(!config.is_private("_single", Visibility::Public));

        let missing = DiscoveryConfig::from_file(Path::new("/nonexistent/bindery.toml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = DiscoveryConfig::default()
            .with_private_prefix("$")
            .unwrap()
            .with_symbols(false);
        let serialized = toml::to_string(&config).unwrap();
        assert_eq!(DiscoveryConfig::from_toml_str(&serialized).unwrap(), config);
    }
}
