//! Renderer configuration.
//!
//! [`RendererConfig`] holds the few knobs of a [`ViewRenderer`](crate::ViewRenderer).
//! It can be assembled in code or read from YAML:
//!
//! ```rust
//! use standout_views::{ObjectWrapper, RendererConfig};
//!
//! let config = RendererConfig::from_yaml(r#"
//! suffix: .ftl
//! sample_limit: 8192
//! concurrency: 64
//! object_wrapper: strict
//! "#).unwrap();
//!
//! assert_eq!(config.sample_limit, 8192);
//! assert_eq!(config.object_wrapper, ObjectWrapper::Strict);
//! ```
//!
//! Omitted keys keep their defaults; unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::configuration::{ObjectWrapper, DEFAULT_CONCURRENCY};
use crate::encoding::DEFAULT_SAMPLE_LIMIT;
use crate::error::ConfigError;

/// Template file suffix claimed by the renderer by default.
pub const DEFAULT_SUFFIX: &str = ".ftl";

/// Settings of a [`ViewRenderer`](crate::ViewRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Template names ending with this suffix are renderable.
    pub suffix: String,
    /// Maximum bytes sampled when detecting a template's encoding.
    pub sample_limit: usize,
    /// Shard count of the configuration cache; a power of two above one.
    pub concurrency: usize,
    /// How views are exposed to templates.
    pub object_wrapper: ObjectWrapper,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            object_wrapper: ObjectWrapper::default(),
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn with_concurrency(mut self, shards: usize) -> Self {
        self.concurrency = shards;
        self
    }

    pub fn with_object_wrapper(mut self, wrapper: ObjectWrapper) -> Self {
        self.object_wrapper = wrapper;
        self
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Checks the settings for values the renderer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suffix.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }
        if self.sample_limit == 0 {
            return Err(ConfigError::SampleLimit);
        }
        if self.concurrency < 2 || !self.concurrency.is_power_of_two() {
            return Err(ConfigError::Concurrency(self.concurrency));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RendererConfig::default();
        assert_eq!(config.suffix, ".ftl");
        assert_eq!(config.concurrency, 128);
        assert_eq!(config.object_wrapper, ObjectWrapper::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RendererConfig::from_yaml("suffix: .tmpl\n").unwrap();
        assert_eq!(config.suffix, ".tmpl");
        assert_eq!(config.sample_limit, DEFAULT_SAMPLE_LIMIT);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = RendererConfig::from_yaml("suffixes: [.ftl]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation() {
        let bad_shards = RendererConfig::new().with_concurrency(100);
        assert!(matches!(
            bad_shards.validate(),
            Err(ConfigError::Concurrency(100))
        ));
        assert!(RendererConfig::new().with_concurrency(1).validate().is_err());
        assert!(matches!(
            RendererConfig::new().with_suffix("").validate(),
            Err(ConfigError::EmptySuffix)
        ));
        assert!(matches!(
            RendererConfig::new().with_sample_limit(0).validate(),
            Err(ConfigError::SampleLimit)
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.yaml");
        fs::write(&path, "concurrency: 16\nobject_wrapper: strict\n").unwrap();

        let config = RendererConfig::from_file(&path).unwrap();
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.object_wrapper, ObjectWrapper::Strict);

        let missing = RendererConfig::from_file(dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
