//! Configuration source loading and composition

use crate::validation::Validate;
use crate::{ApplicationConfig, ConfigResult};
use std::path::Path;

/// Trait for layering configuration from different sources
pub trait ConfigurationSource {
    /// Apply this source on top of `config`
    ///
    /// # Errors
    /// Returns configuration loading errors
    fn apply(&self, config: &mut ApplicationConfig) -> ConfigResult<()>;

    /// Get the name of this configuration source
    fn name(&self) -> &str;

    /// Get the priority of this source (higher number = applied later, wins)
    fn priority(&self) -> u8;
}

/// Overrides from `EMBEDSERVE_*` environment variables
pub struct EnvironmentSource;

impl ConfigurationSource for EnvironmentSource {
    fn apply(&self, config: &mut ApplicationConfig) -> ConfigResult<()> {
        config.apply_env_overrides();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "environment"
    }

    fn priority(&self) -> u8 {
        100 // Environment variables override everything
    }
}

/// Load configuration from a TOML file
///
/// Keys missing from the file keep their compiled defaults.
pub struct TomlFileSource {
    path: std::path::PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn apply(&self, config: &mut ApplicationConfig) -> ConfigResult<()> {
        let content = std::fs::read_to_string(&self.path)?;
        *config = toml::from_str(&content)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }

    fn priority(&self) -> u8 {
        50 // Below env vars, above defaults
    }
}

/// Type alias for configuration sources
type ConfigSources = Vec<Box<dyn ConfigurationSource>>;

/// Configuration loader that combines multiple sources
pub struct ConfigurationLoader {
    sources: ConfigSources,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Load configuration from all sources with priority ordering
    ///
    /// # Errors
    /// Returns the first source that fails to load, or a validation error
    pub fn load(&self) -> ConfigResult<ApplicationConfig> {
        let mut config = ApplicationConfig::default();

        // Lowest priority first, so higher priorities overwrite
        let mut sorted_sources = self.sources.iter().collect::<Vec<_>>();
        sorted_sources.sort_by_key(|source| source.priority());

        for source in sorted_sources {
            source.apply(&mut config).inspect_err(|e| {
                tracing::error!("Failed to load configuration from {}: {e}", source.name());
            })?;
            tracing::debug!("Loaded configuration from source: {}", source.name());
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}
