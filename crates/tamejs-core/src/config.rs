//! Rewriter configuration.
//!
//! Loaded from YAML or JSON; every field has a default so partial files are
//! accepted.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Nesting the rewriter reaches on a default thread stack in debug builds.
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    /// Mark every input node before the pass and report any that reach the
    /// output unvetted.
    pub taint_checking: bool,

    /// Log each rule firing at debug level rather than trace.
    pub log_rule_firings: bool,

    /// Try every rule in registration order instead of the index's candidates
    /// and report when a rule fires that the index would have skipped.
    pub verify_rule_index: bool,

    /// Bound on nested `expand` calls. `None` disables the check.
    pub max_expansion_depth: Option<usize>,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        RewriterConfig {
            taint_checking: true,
            log_rule_firings: false,
            verify_rule_index: false,
            max_expansion_depth: Some(DEFAULT_MAX_EXPANSION_DEPTH),
        }
    }
}

impl RewriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("").to_string(),
            )),
        }
    }

    pub fn with_taint_checking(mut self, enabled: bool) -> Self {
        self.taint_checking = enabled;
        self
    }

    pub fn with_rule_index_verification(mut self, enabled: bool) -> Self {
        self.verify_rule_index = enabled;
        self
    }

    pub fn with_max_expansion_depth(mut self, depth: Option<usize>) -> Self {
        self.max_expansion_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = RewriterConfig::from_yaml_str("log_rule_firings: true\n").unwrap();
        assert!(config.log_rule_firings);
        assert!(config.taint_checking);
        assert_eq!(config.max_expansion_depth, Some(DEFAULT_MAX_EXPANSION_DEPTH));
    }

    #[test]
    fn json_can_disable_depth_limit() {
        let json = r#"{"max_expansion_depth": null, "taint_checking": false}"#;
        let config = RewriterConfig::from_json_str(json).unwrap();
        assert_eq!(config.max_expansion_depth, None);
        assert!(!config.taint_checking);
    }

    #[test]
    fn loads_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "verify_rule_index: true").unwrap();
        let config = RewriterConfig::from_file(file.path()).unwrap();
        assert!(config.verify_rule_index);

        let toml = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(matches!(
            RewriterConfig::from_file(toml.path()),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }
}
