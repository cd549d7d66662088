//! Header discovery.
//!
//! Walks an input directory with `ignore::WalkBuilder`, honoring `.gitignore`
//! and `.introspectignore`, and keeps files with a configured extension that
//! no exclude glob matches.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, info};

/// Name of the per-directory ignore file.
pub const IGNORE_FILENAME: &str = ".introspectignore";

/// Errors that can occur during discovery.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Input directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Result type for discovery.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// What to collect while walking.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Globs matched against paths relative to the root.
    pub exclude_patterns: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["h".to_string(), "hpp".to_string()],
            exclude_patterns: Vec::new(),
            respect_gitignore: true,
        }
    }
}

impl DiscoveryOptions {
    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }
}

fn build_exclude_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DiscoveryError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Collect header files under `root`, sorted.
pub fn collect_headers(root: &Path, options: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DiscoveryError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let glob_set = build_exclude_glob_set(&options.exclude_patterns)?;

    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .hidden(true)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILENAME)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Error walking directory: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        if !options.has_extension(path) {
            continue;
        }

        let rel_path = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
        if glob_set.is_match(rel_path.as_ref()) {
            debug!("Excluded {:?}", path);
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    info!("Discovered {} header(s) under {:?}", files.len(), root);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_collects_sorted_headers_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "b.hpp");
        touch(root, "a.h");
        touch(root, "src/c.h");
        touch(root, "src/c.cpp");
        touch(root, "README.md");

        let files = collect_headers(root, &DiscoveryOptions::default()).unwrap();
        assert_eq!(relative(root, &files), vec!["a.h", "b.hpp", "src/c.h"]);
    }

    #[test]
    fn test_exclude_patterns_and_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "keep.h");
        touch(root, "build/gen.h");
        touch(root, "third_party/lib.h");
        fs::write(root.join(IGNORE_FILENAME), "third_party/\n").unwrap();

        let options = DiscoveryOptions {
            exclude_patterns: vec!["build/**".to_string()],
            ..Default::default()
        };
        let files = collect_headers(root, &options).unwrap();
        assert_eq!(relative(root, &files), vec!["keep.h"]);
    }

    #[test]
    fn test_gitignore_respected_without_repository() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "keep.h");
        touch(root, "out/skip.h");
        fs::write(root.join(".gitignore"), "out/\n").unwrap();

        let files = collect_headers(root, &DiscoveryOptions::default()).unwrap();
        assert_eq!(relative(root, &files), vec!["keep.h"]);

        let options = DiscoveryOptions {
            respect_gitignore: false,
            ..Default::default()
        };
        let files = collect_headers(root, &options).unwrap();
        assert_eq!(relative(root, &files), vec!["keep.h", "out/skip.h"]);
    }

    #[test]
    fn test_missing_root_and_bad_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(matches!(
            collect_headers(&missing, &DiscoveryOptions::default()),
            Err(DiscoveryError::NotFound(_))
        ));

        let options = DiscoveryOptions {
            exclude_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            collect_headers(temp_dir.path(), &options),
            Err(DiscoveryError::InvalidPattern { .. })
        ));
    }
}
