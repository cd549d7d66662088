//! Clean command - Remove the symbol table cache for an input directory

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use introspect_core::SymTableCache;

use super::{load_config, print_info, resolve_input_root};
use crate::GlobalOptions;

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Input directory whose cache should be removed (defaults to the current directory)
    pub input_dir: Option<PathBuf>,

    /// Show what would be deleted without actually deleting
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

/// Execute the clean command
pub fn execute(args: CleanArgs, global: GlobalOptions) -> Result<()> {
    let input_root = resolve_input_root(args.input_dir.as_deref())?;
    let config = load_config(&global, &input_root, None)?;

    // Resolved even when caching is disabled so stale caches can be removed.
    let cache_dir = if config.cache.dir.is_absolute() {
        config.cache.dir.clone()
    } else {
        input_root.join(&config.cache.dir)
    };

    if args.dry_run {
        let status = if cache_dir.exists() { "would remove" } else { "nothing at" };
        println!("{} {}", status, cache_dir.display());
        return Ok(());
    }

    let removed = SymTableCache::clear(&cache_dir)
        .with_context(|| format!("Failed to remove {}", cache_dir.display()))?;

    if removed {
        print_info(&format!("Removed {}", cache_dir.display()), global.quiet);
    } else {
        print_info(&format!("No cache at {}", cache_dir.display()), global.quiet);
    }

    Ok(())
}
