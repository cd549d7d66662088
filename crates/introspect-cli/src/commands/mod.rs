//! CLI command implementations

pub mod clean;
pub mod dump;
pub mod generate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use introspect_config::{ConfigLoader, ConfigOverrides, IntrospectConfig};
use introspect_core::ParserError;

use crate::GlobalOptions;

/// Resolve the input directory from an argument or the current directory.
pub fn resolve_input_root(input_dir: Option<&Path>) -> Result<PathBuf> {
    match input_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Load configuration for `input_root`, honoring `--config`, then install
/// logging according to it.
pub fn load_config(
    global: &GlobalOptions,
    input_root: &Path,
    overrides: Option<&ConfigOverrides>,
) -> Result<IntrospectConfig> {
    let mut loader = ConfigLoader::new();
    let config = loader
        .load(input_root, global.config.as_deref(), overrides)
        .context("Failed to load configuration")?;

    crate::init_logging(global, &config.logging)?;
    Ok(config)
}

/// Print parser diagnostics as `file:line:column: error[CODE]: message`.
pub fn print_diagnostics(path: &Path, diagnostics: &[ParserError]) {
    for diagnostic in diagnostics {
        eprintln!("{}:{}", path.display(), diagnostic);
    }
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
