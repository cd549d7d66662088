//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.introspect/config.toml`
//! 2. Local config: `introspect.toml` in the input directory, or an explicit
//!    file given on the command line
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    AnalysisConfig, CacheConfig, ConfigOverrides, InputConfig, IntrospectConfig, LoggingConfig,
    OutputConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Global configuration file name.
const GLOBAL_CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".introspect";

/// Local configuration file name.
pub const LOCAL_CONFIG_FILE_NAME: &str = "introspect.toml";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.introspect`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<IntrospectConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.introspect`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(GLOBAL_CONFIG_FILE_NAME))
    }

    /// Get the local config file path for an input directory.
    pub fn local_config_path(&self, input_root: &Path) -> PathBuf {
        input_root.join(LOCAL_CONFIG_FILE_NAME)
    }

    /// Load and validate configuration for an input directory.
    ///
    /// Merges config in order: global → local (or `explicit`) → overrides.
    /// An explicit file must exist.
    pub fn load(
        &mut self,
        input_root: &Path,
        explicit: Option<&Path>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<IntrospectConfig, ConfigError> {
        // Start with default config
        let mut config = IntrospectConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        let local_config = match explicit {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                Some(load_config_file(path)?)
            }
            None => self.load_local(input_root)?,
        };
        if let Some(local_config) = local_config {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<IntrospectConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for an input directory.
    pub fn load_local(&self, input_root: &Path) -> Result<Option<IntrospectConfig>, ConfigError> {
        let local_path = self.local_config_path(input_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<IntrospectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Overlay values equal to the default keep the base value, so partial files
/// only change what they mention.
fn merge_configs(base: IntrospectConfig, overlay: IntrospectConfig) -> IntrospectConfig {
    IntrospectConfig {
        input: merge_input(base.input, overlay.input),
        output: merge_output(base.output, overlay.output),
        cache: merge_cache(base.cache, overlay.cache),
        analysis: merge_analysis(base.analysis, overlay.analysis),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge input config. Exclude patterns accumulate.
fn merge_input(base: InputConfig, overlay: InputConfig) -> InputConfig {
    let default = InputConfig::default();

    let mut exclude_patterns = base.exclude_patterns;
    for pattern in overlay.exclude_patterns {
        if !exclude_patterns.contains(&pattern) {
            exclude_patterns.push(pattern);
        }
    }

    InputConfig {
        extensions: pick(base.extensions, overlay.extensions, default.extensions),
        exclude_patterns,
        respect_gitignore: pick(
            base.respect_gitignore,
            overlay.respect_gitignore,
            default.respect_gitignore,
        ),
    }
}

/// Merge output config. Type exclusions accumulate.
fn merge_output(base: OutputConfig, overlay: OutputConfig) -> OutputConfig {
    let default = OutputConfig::default();

    let mut exclude_types = base.exclude_types;
    for pattern in overlay.exclude_types {
        if !exclude_types.contains(&pattern) {
            exclude_types.push(pattern);
        }
    }

    OutputConfig {
        dir: pick(base.dir, overlay.dir, default.dir),
        filename: pick(base.filename, overlay.filename, default.filename),
        emit: pick(base.emit, overlay.emit, default.emit),
        tagged_only: pick(base.tagged_only, overlay.tagged_only, default.tagged_only),
        exclude_types,
    }
}

fn merge_cache(base: CacheConfig, overlay: CacheConfig) -> CacheConfig {
    let default = CacheConfig::default();
    CacheConfig {
        enabled: pick(base.enabled, overlay.enabled, default.enabled),
        dir: pick(base.dir, overlay.dir, default.dir),
    }
}

fn merge_analysis(base: AnalysisConfig, overlay: AnalysisConfig) -> AnalysisConfig {
    AnalysisConfig {
        parallelism: if overlay.parallelism != 0 {
            overlay.parallelism
        } else {
            base.parallelism
        },
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let default = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, default.level),
        format: pick(base.format, overlay.format, default.format),
    }
}
