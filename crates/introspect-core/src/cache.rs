//! On-disk cache of parsed symbol tables.
//!
//! Each input file is keyed by a SHA-256 hash over its content and
//! modification time. The cache directory holds one archive per key
//! (`<key>.bin`) plus `index.json`, which maps input paths to keys and records
//! a hash of the whole input set. A different input set invalidates every
//! entry.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::ArchiveError;
use crate::symtable::SymTable;

/// Bumped whenever the archive layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const INDEX_FILENAME: &str = "index.json";
const ARCHIVE_EXTENSION: &str = "bin";

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CacheIndex {
    version: u32,
    input_set_hash: String,
    /// Input path to key hash.
    files: BTreeMap<String, String>,
}

/// Symbol table cache rooted at a directory.
#[derive(Debug)]
pub struct SymTableCache {
    dir: PathBuf,
    index: CacheIndex,
}

impl SymTableCache {
    /// Open the cache for the given input set, invalidating it when the set
    /// or the format version changed.
    pub fn open(dir: impl Into<PathBuf>, inputs: &[PathBuf]) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let input_set_hash = compute_input_set_hash(inputs);
        let stored = load_index(&dir.join(INDEX_FILENAME));

        let index = match stored {
            Some(index)
                if index.version == CACHE_FORMAT_VERSION
                    && index.input_set_hash == input_set_hash =>
            {
                debug!("Loaded cache index with {} entries", index.files.len());
                index
            }
            stored => {
                if stored.is_some() {
                    info!("Input set changed, invalidating cache at {:?}", dir);
                }
                remove_archives(&dir)?;
                CacheIndex {
                    version: CACHE_FORMAT_VERSION,
                    input_set_hash,
                    files: BTreeMap::new(),
                }
            }
        };

        Ok(Self { dir, index })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.index.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.files.is_empty()
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ARCHIVE_EXTENSION))
    }

    /// Cached table for `path`, if its stored key matches `key`.
    pub fn lookup(&self, path: &Path, key: &str) -> Option<SymTable> {
        let stored = self.index.files.get(&index_key(path))?;
        if stored != key {
            return None;
        }

        let archive_path = self.archive_path(key);
        let file = match File::open(&archive_path) {
            Ok(file) => file,
            Err(e) => {
                debug!("Cache archive {:?} unavailable: {}", archive_path, e);
                return None;
            }
        };

        match SymTable::load(BufReader::new(file)) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Discarding corrupt cache archive {:?}: {}", archive_path, e);
                None
            }
        }
    }

    /// Store the table for `path` under `key`, replacing a stale archive.
    pub fn store(&mut self, path: &Path, key: &str, table: &SymTable) -> Result<()> {
        let archive_path = self.archive_path(key);
        let mut writer = BufWriter::new(File::create(&archive_path)?);
        table.save(&mut writer)?;
        std::io::Write::flush(&mut writer)?;

        if let Some(previous) = self.index.files.insert(index_key(path), key.to_string()) {
            let shared = self.index.files.values().any(|k| *k == previous);
            if previous != key && !shared {
                let stale = self.archive_path(&previous);
                if let Err(e) = fs::remove_file(&stale) {
                    debug!("Could not remove stale archive {:?}: {}", stale, e);
                }
            }
        }
        Ok(())
    }

    /// Persist `index.json`.
    pub fn save_index(&self) -> Result<()> {
        let path = self.dir.join(INDEX_FILENAME);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, &self.index)?;
        info!("Saved cache index with {} entries to {:?}", self.index.files.len(), path);
        Ok(())
    }

    /// Remove a cache directory entirely. Returns false when it did not exist.
    pub fn clear(dir: &Path) -> Result<bool> {
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                info!("Removed cache directory {:?}", dir);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}

fn index_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn load_index(path: &Path) -> Option<CacheIndex> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("No cache index at {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("Ignoring unreadable cache index {:?}: {}", path, e);
            None
        }
    }
}

fn remove_archives(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION) {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// SHA-256 over the sorted list of input paths.
pub fn compute_input_set_hash(inputs: &[PathBuf]) -> String {
    let mut paths: Vec<String> = inputs.iter().map(|p| index_key(p)).collect();
    paths.sort();

    let mut hasher = Sha256::new();
    for path in &paths {
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// SHA-256 over a file's content and modification time.
pub fn compute_file_key(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let modified = file
        .metadata()?
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();

    let mut reader = BufReader::with_capacity(8192, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        match reader.read(&mut buffer)? {
            0 => break,
            n => hasher.update(&buffer[..n]),
        }
    }
    hasher.update(modified.to_le_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, Vec<PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let header = temp_dir.path().join("a.h");
        fs::write(&header, "enum A { X };").unwrap();
        let cache_dir = temp_dir.path().join(".introspect-cache");
        (temp_dir, cache_dir, vec![header])
    }

    #[test]
    fn test_file_key_changes_with_content() {
        let (_temp_dir, _, inputs) = setup();
        let first = compute_file_key(&inputs[0]).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, compute_file_key(&inputs[0]).unwrap());

        fs::write(&inputs[0], "enum A { X, Y };").unwrap();
        assert_ne!(first, compute_file_key(&inputs[0]).unwrap());
    }

    #[test]
    fn test_input_set_hash_ignores_order() {
        let a = vec![PathBuf::from("a.h"), PathBuf::from("b.h")];
        let b = vec![PathBuf::from("b.h"), PathBuf::from("a.h")];
        assert_eq!(compute_input_set_hash(&a), compute_input_set_hash(&b));
        assert_ne!(compute_input_set_hash(&a), compute_input_set_hash(&a[..1]));
    }

    #[test]
    fn test_store_and_lookup_across_sessions() {
        let (_temp_dir, cache_dir, inputs) = setup();
        let (table, _) = parse_str("a.h", "enum A { X };");
        let key = compute_file_key(&inputs[0]).unwrap();

        let mut cache = SymTableCache::open(&cache_dir, &inputs).unwrap();
        assert!(cache.lookup(&inputs[0], &key).is_none());
        cache.store(&inputs[0], &key, &table).unwrap();
        cache.save_index().unwrap();

        let reopened = SymTableCache::open(&cache_dir, &inputs).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.lookup(&inputs[0], &key), Some(table));
        assert!(reopened.lookup(&inputs[0], "other-key").is_none());
    }

    #[test]
    fn test_changed_input_set_invalidates() {
        let (temp_dir, cache_dir, inputs) = setup();
        let (table, _) = parse_str("a.h", "enum A { X };");
        let key = compute_file_key(&inputs[0]).unwrap();

        let mut cache = SymTableCache::open(&cache_dir, &inputs).unwrap();
        cache.store(&inputs[0], &key, &table).unwrap();
        cache.save_index().unwrap();

        let mut more_inputs = inputs.clone();
        more_inputs.push(temp_dir.path().join("b.h"));
        let reopened = SymTableCache::open(&cache_dir, &more_inputs).unwrap();
        assert!(reopened.is_empty());
        assert!(reopened.lookup(&inputs[0], &key).is_none());
        assert!(!cache_dir.join(format!("{}.bin", key)).exists());
    }

    #[test]
    fn test_store_replaces_stale_archive() {
        let (_temp_dir, cache_dir, inputs) = setup();
        let (table, _) = parse_str("a.h", "enum A { X };");

        let mut cache = SymTableCache::open(&cache_dir, &inputs).unwrap();
        cache.store(&inputs[0], "old", &table).unwrap();
        cache.store(&inputs[0], "new", &table).unwrap();

        assert!(!cache_dir.join("old.bin").exists());
        assert!(cache_dir.join("new.bin").exists());
    }

    #[test]
    fn test_corrupt_archive_is_a_miss() {
        let (_temp_dir, cache_dir, inputs) = setup();
        let (table, _) = parse_str("a.h", "enum A { X };");

        let mut cache = SymTableCache::open(&cache_dir, &inputs).unwrap();
        cache.store(&inputs[0], "k", &table).unwrap();
        fs::write(cache_dir.join("k.bin"), [1, 2, 3]).unwrap();
        assert!(cache.lookup(&inputs[0], "k").is_none());
    }

    #[test]
    fn test_clear() {
        let (_temp_dir, cache_dir, inputs) = setup();
        SymTableCache::open(&cache_dir, &inputs).unwrap();
        assert!(SymTableCache::clear(&cache_dir).unwrap());
        assert!(!SymTableCache::clear(&cache_dir).unwrap());
    }
}
