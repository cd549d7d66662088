//! Batch processing of header files.
//!
//! Every file is lexed and parsed into its own [`SymTable`] on a rayon thread
//! pool. Extraction and code emission then run on the calling thread over the
//! finished tables.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{compute_file_key, CacheError, SymTableCache};
use crate::codegen::{CodeGenerator, CodegenError, GenerationSummary, OutputSink};
use crate::extractor::{ClassEntry, ClassesExtractor, EnumEntry, EnumsExtractor, ExtractorFilter};
use crate::lexer::Lexer;
use crate::parser::{parse_into, ParserError};
use crate::source::{FileSource, SourceReader};
use crate::symtable::SymTable;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Code generation error: {0}")]
    Codegen(#[from] CodegenError),
}

/// Result type for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline settings.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Worker threads; 0 lets rayon decide.
    pub parallelism: usize,
    /// Cache directory, or `None` to parse everything afresh.
    pub cache_dir: Option<PathBuf>,
    pub filter: ExtractorFilter,
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    /// Parsed table, absent when the file could not be read.
    pub table: Option<SymTable>,
    pub diagnostics: Vec<ParserError>,
    /// Open or read failure.
    pub error: Option<String>,
    pub from_cache: bool,
    key: Option<String>,
}

impl FileResult {
    fn failed(path: &Path, error: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            table: None,
            diagnostics: Vec::new(),
            error: Some(error.to_string()),
            from_cache: false,
            key: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a batch, in input order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub files: Vec<FileResult>,
}

impl PipelineReport {
    pub fn tables(&self) -> impl Iterator<Item = &SymTable> + '_ {
        self.files.iter().filter_map(|f| f.table.as_ref())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileResult> + '_ {
        self.files.iter().filter(|f| !f.is_ok())
    }

    pub fn diagnostic_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn cache_hits(&self) -> usize {
        self.files.iter().filter(|f| f.from_cache).count()
    }
}

/// Parses a batch of files and emits introspection code for them.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Parse every file. Per-file failures are recorded in the report.
    pub fn run(&self, files: &[PathBuf]) -> Result<PipelineReport> {
        let start = Instant::now();
        let mut cache = match &self.options.cache_dir {
            Some(dir) => Some(SymTableCache::open(dir, files)?),
            None => None,
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.parallelism)
            .build()?;

        let shared_cache = cache.as_ref();
        let results: Vec<FileResult> = pool.install(|| {
            files
                .par_iter()
                .map(|path| process_file(path, shared_cache))
                .collect()
        });

        if let Some(cache) = cache.as_mut() {
            for result in &results {
                // Files with diagnostics are reparsed next time so the
                // diagnostics are reported again.
                if result.from_cache || !result.diagnostics.is_empty() {
                    continue;
                }
                if let (Some(table), Some(key)) = (&result.table, &result.key) {
                    if let Err(e) = cache.store(&result.path, key, table) {
                        warn!("Failed to cache {:?}: {}", result.path, e);
                    }
                }
            }
            cache.save_index()?;
        }

        let report = PipelineReport { files: results };
        info!(
            "Processed {} file(s) in {:.2?}: {} from cache, {} failed, {} diagnostic(s)",
            report.files.len(),
            start.elapsed(),
            report.cache_hits(),
            report.failed().count(),
            report.diagnostic_count()
        );
        Ok(report)
    }

    /// Run the extractors over every table in the report.
    pub fn extract<'a>(&self, report: &'a PipelineReport) -> (Vec<EnumEntry<'a>>, Vec<ClassEntry<'a>>) {
        let mut enums = EnumsExtractor::new(self.options.filter.clone());
        let mut classes = ClassesExtractor::new(self.options.filter.clone());

        for table in report.tables() {
            enums.visit_table(table);
            classes.visit_table(table);
        }

        let enums = enums.into_entries();
        let classes = classes.into_entries();
        info!("Extracted {} enum(s) and {} class(es)", enums.len(), classes.len());
        (enums, classes)
    }

    /// Extract from the report and write the result through `generator`.
    pub fn emit<S: OutputSink>(
        &self,
        report: &PipelineReport,
        generator: &mut CodeGenerator<S>,
    ) -> Result<GenerationSummary> {
        let (enums, classes) = self.extract(report);
        Ok(generator.generate(&enums, &classes)?)
    }
}

fn process_file(path: &Path, cache: Option<&SymTableCache>) -> FileResult {
    let key = match cache {
        Some(_) => match compute_file_key(path) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                return FileResult::failed(path, e);
            }
        },
        None => None,
    };

    if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
        if let Some(table) = cache.lookup(path, key) {
            debug!("Cache hit for {:?}", path);
            return FileResult {
                path: path.to_path_buf(),
                table: Some(table),
                diagnostics: Vec::new(),
                error: None,
                from_cache: true,
                key: None,
            };
        }
    }

    let mut lexer = match Lexer::open(FileSource::new(path)) {
        Ok(lexer) => lexer,
        Err(e) => {
            warn!("Failed to open {:?}: {}", path, e);
            return FileResult::failed(path, e);
        }
    };

    let mut table = SymTable::with_source_filename(lexer.source_name().to_string());
    let diagnostics = parse_into(&mut lexer, &mut table);
    let mut source = lexer.into_source();
    let read_error = source.take_error();
    if let Err(e) = source.close() {
        debug!("Failed to close {:?}: {}", path, e);
    }

    // A truncated table must neither be emitted nor cached.
    if let Some(e) = read_error {
        return FileResult {
            diagnostics,
            ..FileResult::failed(path, format!("read failed: {}", e))
        };
    }

    if diagnostics.is_empty() {
        debug!("Parsed {:?}: {} scope(s)", path, table.scope_count());
    } else {
        warn!("Parsed {:?} with {} error(s)", path, diagnostics.len());
    }

    FileResult {
        path: path.to_path_buf(),
        table: Some(table),
        diagnostics,
        error: None,
        from_cache: false,
        key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::StringSink;
    use crate::extractor::EmitFlags;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_headers(root: &Path) -> Vec<PathBuf> {
        let a = root.join("a.h");
        let b = root.join("b.h");
        fs::write(&a, "namespace ns { enum class Color : unsigned char { Red, Green }; }").unwrap();
        fs::write(&b, "struct Base {};\nclass Widget final : public Base {};\n").unwrap();
        vec![a, b]
    }

    #[test]
    fn test_run_parses_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let files = write_headers(temp_dir.path());

        let pipeline = Pipeline::new(PipelineOptions {
            parallelism: 2,
            ..Default::default()
        });
        let report = pipeline.run(&files).unwrap();

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.tables().count(), 2);
        assert_eq!(report.diagnostic_count(), 0);
        assert_eq!(report.files[0].path, files[0]);
    }

    #[test]
    fn test_missing_file_does_not_stop_batch() {
        let temp_dir = TempDir::new().unwrap();
        let mut files = write_headers(temp_dir.path());
        files.insert(0, temp_dir.path().join("missing.h"));

        let report = Pipeline::default().run(&files).unwrap();
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.tables().count(), 2);
        assert!(report.files[0].error.is_some());
    }

    #[test]
    fn test_second_run_hits_cache() {
        let temp_dir = TempDir::new().unwrap();
        let files = write_headers(temp_dir.path());
        let pipeline = Pipeline::new(PipelineOptions {
            cache_dir: Some(temp_dir.path().join(".introspect-cache")),
            ..Default::default()
        });

        let first = pipeline.run(&files).unwrap();
        assert_eq!(first.cache_hits(), 0);

        let second = pipeline.run(&files).unwrap();
        assert_eq!(second.cache_hits(), 2);
        let first_tables: Vec<_> = first.tables().collect();
        let second_tables: Vec<_> = second.tables().collect();
        assert_eq!(first_tables, second_tables);
    }

    #[test]
    fn test_files_with_diagnostics_are_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let bad = temp_dir.path().join("bad.h");
        fs::write(&bad, "enum E { A }").unwrap();
        let pipeline = Pipeline::new(PipelineOptions {
            cache_dir: Some(temp_dir.path().join(".introspect-cache")),
            ..Default::default()
        });

        let files = vec![bad];
        assert!(pipeline.run(&files).unwrap().diagnostic_count() > 0);
        let second = pipeline.run(&files).unwrap();
        assert_eq!(second.cache_hits(), 0);
        assert!(second.diagnostic_count() > 0);
    }

    #[test]
    fn test_invalid_utf8_does_not_truncate_file() {
        let temp_dir = TempDir::new().unwrap();
        let legacy = temp_dir.path().join("legacy.h");
        fs::write(&legacy, b"enum A { X };\n// copyright \xA9 2020\nenum B { Y };\n").unwrap();

        let report = Pipeline::default().run(&[legacy]).unwrap();
        let file = &report.files[0];
        assert!(file.is_ok());
        assert_eq!(file.diagnostics.len(), 0);

        let table = file.table.as_ref().unwrap();
        let named: Vec<&str> = table.global_scope().named().keys().map(String::as_str).collect();
        assert_eq!(named, vec!["A", "B"]);
    }

    #[test]
    fn test_emit_through_string_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let files = write_headers(temp_dir.path());
        let pipeline = Pipeline::new(PipelineOptions {
            filter: ExtractorFilter::new(EmitFlags::ENUMS | EmitFlags::CLASSES),
            ..Default::default()
        });

        let report = pipeline.run(&files).unwrap();
        let mut generator = CodeGenerator::new(StringSink::new("meta.h"), StringSink::new("meta.cpp"), "meta");
        let summary = pipeline.emit(&report, &mut generator).unwrap();

        assert_eq!(summary.enums, 1);
        assert_eq!(summary.classes, 1);
        assert_eq!(summary.includes, 2);
        assert!(generator.header().contents().contains("EnumTrait<ns::Color>"));
        assert!(generator.header().contents().contains("ClassTrait<Widget>"));
        assert!(!generator.header().contents().contains("ClassTrait<Base>"));
    }
}
