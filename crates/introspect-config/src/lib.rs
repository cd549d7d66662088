//! Introspect Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.introspect/config.toml`
//! - Local config: `introspect.toml` (in the input directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LOCAL_CONFIG_FILE_NAME};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for Introspect.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct IntrospectConfig {
    /// Header discovery configuration
    pub input: InputConfig,

    /// Generated code configuration
    pub output: OutputConfig,

    /// Symbol table cache configuration
    pub cache: CacheConfig,

    /// Analysis configuration
    pub analysis: AnalysisConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which headers are read.
///
/// # Example TOML
///
/// ```toml
/// [input]
/// extensions = ["h", "hpp", "hxx"]
/// exclude_patterns = ["**/third_party/**"]
/// respect_gitignore = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Header file extensions, without the leading dot
    pub extensions: Vec<String>,

    /// File patterns to exclude (glob patterns)
    pub exclude_patterns: Vec<String>,

    /// Honor `.gitignore` files while walking
    pub respect_gitignore: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["h".to_string(), "hpp".to_string()],
            exclude_patterns: vec![
                "**/.git/**".to_string(),
                "**/build/**".to_string(),
                "**/vendor/**".to_string(),
                "**/third_party/**".to_string(),
            ],
            respect_gitignore: true,
        }
    }
}

/// Where and what code is generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, relative to the input directory unless absolute
    pub dir: PathBuf,

    /// Base name of the generated `.h`/`.cpp` pair
    pub filename: String,

    /// Kinds of types to emit
    pub emit: EmitConfig,

    /// Only emit types preceded by `ENUM_META` / `CLASS_META`
    pub tagged_only: bool,

    /// Regular expressions matched against type ids and qualified names
    pub exclude_types: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            filename: "metadata".to_string(),
            emit: EmitConfig::default(),
            tagged_only: false,
            exclude_types: Vec::new(),
        }
    }
}

/// Emit selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmitConfig {
    pub enums: bool,
    pub classes: bool,
    pub structs: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            enums: true,
            classes: true,
            structs: true,
        }
    }
}

impl EmitConfig {
    /// True when nothing would be emitted.
    pub fn is_empty(&self) -> bool {
        !(self.enums || self.classes || self.structs)
    }

    /// Parse a comma separated list such as `enums,structs`. `all` selects
    /// everything.
    pub fn from_list(list: &str) -> Result<Self, ConfigError> {
        let mut emit = Self {
            enums: false,
            classes: false,
            structs: false,
        };

        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "enums" | "enum" => emit.enums = true,
                "classes" | "class" => emit.classes = true,
                "structs" | "struct" => emit.structs = true,
                "all" => emit = Self::default(),
                other => {
                    return Err(ConfigError::invalid_value(
                        "output.emit",
                        format!("unknown kind '{}'. Valid values: enums, classes, structs, all", other),
                    ))
                }
            }
        }

        Ok(emit)
    }
}

/// Symbol table cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Reuse parsed symbol tables between runs
    pub enabled: bool,

    /// Cache directory, relative to the input directory unless absolute
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".introspect-cache"),
        }
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Parallelism level (0 = auto-detect)
    pub parallelism: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override output directory
    pub output_dir: Option<PathBuf>,

    /// Override generated file base name
    pub filename: Option<String>,

    /// Override emit selection
    pub emit: Option<EmitConfig>,

    /// Force tagged-only emission
    pub tagged_only: Option<bool>,

    /// Additional type exclusion patterns
    pub exclude_types: Vec<String>,

    /// Disable the cache
    pub no_cache: bool,

    /// Override log level
    pub log_level: Option<String>,

    /// Override parallelism
    pub parallelism: Option<usize>,
}

impl IntrospectConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.output_dir {
            self.output.dir = dir.clone();
        }

        if let Some(ref filename) = overrides.filename {
            self.output.filename = filename.clone();
        }

        if let Some(emit) = overrides.emit {
            self.output.emit = emit;
        }

        if let Some(tagged_only) = overrides.tagged_only {
            self.output.tagged_only = tagged_only;
        }

        for pattern in &overrides.exclude_types {
            if !self.output.exclude_types.contains(pattern) {
                self.output.exclude_types.push(pattern.clone());
            }
        }

        if overrides.no_cache {
            self.cache.enabled = false;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(parallelism) = overrides.parallelism {
            self.analysis.parallelism = parallelism;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.emit.is_empty() {
            return Err(ConfigError::ValidationError(
                "output.emit selects no kinds of types".to_string(),
            ));
        }

        if self.output.filename.trim().is_empty() {
            return Err(ConfigError::invalid_value("output.filename", "must not be empty"));
        }

        if self.input.extensions.is_empty() {
            return Err(ConfigError::invalid_value("input.extensions", "must not be empty"));
        }

        for pattern in &self.input.exclude_patterns {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::invalid_value("input.exclude_patterns", format!("'{}': {}", pattern, e))
            })?;
        }

        self.logging.level.parse::<tracing::Level>().map_err(|_| {
            ConfigError::invalid_value(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: trace, debug, info, warn, error",
                    self.logging.level
                ),
            )
        })?;

        self.exclude_type_patterns()?;
        Ok(())
    }

    /// Compile `output.exclude_types`.
    pub fn exclude_type_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.output
            .exclude_types
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::invalid_value("output.exclude_types", format!("'{}': {}", pattern, e))
                })
            })
            .collect()
    }

    /// Effective output directory for an input directory.
    pub fn output_dir(&self, input_root: &Path) -> PathBuf {
        resolve(input_root, &self.output.dir)
    }

    /// Effective cache directory, or `None` when caching is disabled.
    pub fn cache_dir(&self, input_root: &Path) -> Option<PathBuf> {
        self.cache
            .enabled
            .then(|| resolve(input_root, &self.cache.dir))
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = IntrospectConfig::default();
        assert_eq!(config.input.extensions, vec!["h", "hpp"]);
        assert!(config.input.respect_gitignore);
        assert_eq!(config.output.filename, "metadata");
        assert_eq!(config.output.emit, EmitConfig::default());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from(".introspect-cache"));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = IntrospectConfig::default();
        config.output.exclude_types = vec!["^detail::".to_string()];
        let overrides = ConfigOverrides {
            output_dir: Some(PathBuf::from("/out")),
            filename: Some("reflect".to_string()),
            tagged_only: Some(true),
            exclude_types: vec!["^detail::".to_string(), "Impl$".to_string()],
            no_cache: true,
            log_level: Some("debug".to_string()),
            parallelism: Some(4),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.output.dir, PathBuf::from("/out"));
        assert_eq!(config.output.filename, "reflect");
        assert!(config.output.tagged_only);
        assert_eq!(config.output.exclude_types, vec!["^detail::", "Impl$"]);
        assert!(!config.cache.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.analysis.parallelism, 4);
    }

    #[test]
    fn test_emit_from_list() {
        let emit = EmitConfig::from_list("enums, structs").unwrap();
        assert!(emit.enums && emit.structs && !emit.classes);

        assert_eq!(EmitConfig::from_list("all").unwrap(), EmitConfig::default());
        assert!(EmitConfig::from_list("").unwrap().is_empty());

        let err = EmitConfig::from_list("enums,unions").unwrap_err();
        assert!(err.to_string().contains("unions"));
    }

    #[test]
    fn test_validate_rejects_empty_emit() {
        let mut config = IntrospectConfig::default();
        config.output.emit = EmitConfig::from_list("").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.emit"));
    }

    #[test]
    fn test_validate_rejects_bad_patterns() {
        let mut config = IntrospectConfig::default();
        config.output.exclude_types = vec!["(unclosed".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.exclude_types"));

        let mut config = IntrospectConfig::default();
        config.input.exclude_patterns = vec!["[".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("input.exclude_patterns"));

        let mut config = IntrospectConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_directory_resolution() {
        let mut config = IntrospectConfig::default();
        let root = PathBuf::from("/project");

        assert_eq!(config.output_dir(&root), PathBuf::from("/project/."));
        assert_eq!(
            config.cache_dir(&root),
            Some(PathBuf::from("/project/.introspect-cache"))
        );

        config.output.dir = PathBuf::from("/abs/out");
        config.cache.enabled = false;
        assert_eq!(config.output_dir(&root), PathBuf::from("/abs/out"));
        assert_eq!(config.cache_dir(&root), None);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = IntrospectConfig::default();
        config.output.tagged_only = true;
        config.logging.format = LogFormat::Json;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: IntrospectConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
