//! Generate command - Parse headers and write introspection code
//!
//! Discovers headers under the input directory, parses them in parallel and
//! writes `<filename>.h` / `<filename>.cpp` to the output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use introspect_config::{ConfigOverrides, EmitConfig, IntrospectConfig};
use introspect_core::{
    collect_headers, CodeGenerator, DiscoveryOptions, EmitFlags, ExtractorFilter, OutputSink,
    Pipeline, PipelineOptions,
};
use tracing::debug;

use super::{load_config, print_diagnostics, print_info, resolve_input_root};
use crate::progress;
use crate::GlobalOptions;

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory to scan for headers (defaults to the current directory)
    pub input_dir: Option<PathBuf>,

    /// Output directory for the generated files
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Base name of the generated files
    #[arg(long)]
    pub filename: Option<String>,

    /// Kinds of types to emit (comma separated: enums, classes, structs, all)
    #[arg(long, value_name = "LIST")]
    pub emit: Option<String>,

    /// Only emit types marked with ENUM_META / CLASS_META
    #[arg(long)]
    pub tagged_only: bool,

    /// Skip types whose id or qualified name matches this regex
    #[arg(long = "exclude-type", value_name = "REGEX")]
    pub exclude_types: Vec<String>,

    /// Parse every header afresh without touching the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Number of worker threads (0 = auto)
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,
}

impl GenerateArgs {
    /// Convert arguments to config overrides
    fn to_config_overrides(&self) -> Result<ConfigOverrides> {
        let emit = self
            .emit
            .as_deref()
            .map(EmitConfig::from_list)
            .transpose()
            .context("Invalid --emit value")?;

        Ok(ConfigOverrides {
            output_dir: self.output.clone(),
            filename: self.filename.clone(),
            emit,
            tagged_only: self.tagged_only.then_some(true),
            exclude_types: self.exclude_types.clone(),
            no_cache: self.no_cache,
            parallelism: self.jobs,
            ..Default::default()
        })
    }
}

fn emit_flags(emit: &EmitConfig) -> EmitFlags {
    let mut flags = EmitFlags::NONE;
    if emit.enums {
        flags |= EmitFlags::ENUMS;
    }
    if emit.classes {
        flags |= EmitFlags::CLASSES;
    }
    if emit.structs {
        flags |= EmitFlags::STRUCTS;
    }
    flags
}

fn discovery_options(config: &IntrospectConfig) -> DiscoveryOptions {
    DiscoveryOptions {
        extensions: config.input.extensions.clone(),
        exclude_patterns: config.input.exclude_patterns.clone(),
        respect_gitignore: config.input.respect_gitignore,
    }
}

fn pipeline_options(config: &IntrospectConfig, input_root: &Path) -> Result<PipelineOptions> {
    let filter = ExtractorFilter::new(emit_flags(&config.output.emit))
        .with_tagged_only(config.output.tagged_only)
        .with_exclude(config.exclude_type_patterns()?);

    Ok(PipelineOptions {
        parallelism: config.analysis.parallelism,
        cache_dir: config.cache_dir(input_root),
        filter,
    })
}

/// Execute the generate command
pub fn execute(args: GenerateArgs, global: GlobalOptions) -> Result<()> {
    let input_root = resolve_input_root(args.input_dir.as_deref())?;
    let overrides = args.to_config_overrides()?;
    let config = load_config(&global, &input_root, Some(&overrides))?;

    let output_dir = config.output_dir(&input_root);
    let mut generator = CodeGenerator::to_directory(&output_dir, &config.output.filename);

    let mut files = collect_headers(&input_root, &discovery_options(&config))
        .with_context(|| format!("Failed to discover headers in {}", input_root.display()))?;
    // A previous run's output must not feed back into this one.
    let generated = generator.header().path().to_path_buf();
    files.retain(|file| *file != generated);
    debug!("Generating {:?} from {} header(s)", generated, files.len());

    if files.is_empty() {
        print_info(
            &format!("No headers found in {}", input_root.display()),
            global.quiet,
        );
    }

    let pipeline = Pipeline::new(pipeline_options(&config, &input_root)?);

    let pb = progress::spinner(&format!("Parsing {} header(s)...", files.len()), global.quiet);
    let report = match pipeline.run(&files) {
        Ok(report) => report,
        Err(e) => {
            progress::finish_spinner_error(pb, "Parsing failed");
            return Err(e).context("Failed to process headers");
        }
    };

    let failed = report.failed().count();
    let diagnostics = report.diagnostic_count();
    let parsed_message = format!(
        "Parsed {} header(s) ({} from cache)",
        report.files.len() - failed,
        report.cache_hits()
    );
    if failed > 0 || diagnostics > 0 {
        progress::finish_spinner_warn(
            pb,
            &format!("{}, {} unreadable, {} error(s)", parsed_message, failed, diagnostics),
        );
    } else {
        progress::finish_spinner(pb, &parsed_message);
    }

    for file in &report.files {
        if let Some(ref error) = file.error {
            eprintln!("{}: error: {}", file.path.display(), error);
        }
        print_diagnostics(&file.path, &file.diagnostics);
    }

    let summary = pipeline
        .emit(&report, &mut generator)
        .context("Failed to write generated code")?;

    print_info(
        &format!(
            "Wrote {} enum and {} class trait(s) to {} and {}",
            summary.enums,
            summary.classes,
            generator.header().name(),
            generator.source().name()
        ),
        global.quiet,
    );

    Ok(())
}
