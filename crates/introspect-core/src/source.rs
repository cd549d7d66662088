//! Line-oriented input sources for the lexer.
//!
//! A [`SourceReader`] hands out physical lines one at a time. Exhaustion is
//! signalled explicitly with `None`, so an empty line is never confused with
//! the end of the stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Supplier of raw source lines.
pub trait SourceReader {
    /// Prepare the source for reading.
    fn open(&mut self) -> io::Result<()>;

    /// Release any held resources. Closing an unopened source is a no-op.
    fn close(&mut self) -> io::Result<()>;

    /// Next physical line without its terminator, or `None` once exhausted.
    fn read_line(&mut self) -> Option<String>;

    /// Display name of the source, used for diagnostics and symbol tables.
    fn name(&self) -> &str;

    /// Read failure that ended the stream early, if any. Taking it clears it.
    fn take_error(&mut self) -> Option<io::Error> {
        None
    }
}

// ============================================================================
// File source
// ============================================================================

/// Buffered reader over a file on disk.
pub struct FileSource {
    path: PathBuf,
    name: String,
    reader: Option<BufReader<File>>,
    error: Option<io::Error>,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.to_string_lossy().into_owned();
        Self {
            path,
            name,
            reader: None,
            error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl SourceReader for FileSource {
    fn open(&mut self) -> io::Result<()> {
        let file = File::open(&self.path)?;
        self.reader = Some(BufReader::new(file));
        self.error = None;
        debug!("Opened source {:?}", self.path);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }

    fn read_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut bytes = Vec::new();

        match reader.read_until(b'\n', &mut bytes) {
            Ok(0) => None,
            Ok(_) => {
                if bytes.last() == Some(&b'\n') {
                    bytes.pop();
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                }
                // Legacy encodings degrade to replacement characters.
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => {
                warn!("Error reading {:?}: {}", self.path, e);
                self.reader = None;
                self.error = Some(e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// Source backed by a string, mostly useful for tests and the `dump` command.
pub struct StringSource {
    name: String,
    lines: Vec<String>,
    cursor: usize,
    opened: bool,
}

impl StringSource {
    pub fn new(text: &str) -> Self {
        Self::with_name("<string>", text)
    }

    pub fn with_name(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            lines: text
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect(),
            cursor: 0,
            opened: false,
        }
    }
}

impl SourceReader for StringSource {
    fn open(&mut self) -> io::Result<()> {
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.opened = false;
        Ok(())
    }

    fn read_line(&mut self) -> Option<String> {
        if !self.opened {
            return None;
        }

        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(line)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
