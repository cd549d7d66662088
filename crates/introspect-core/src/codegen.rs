//! Emission of the generated metadata header and source.
//!
//! Output goes through an [`OutputSink`] handle passed in by the caller, so
//! generation can target files or in-memory buffers alike.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::extractor::{ClassEntry, EnumEntry};
use crate::types::qualify;

/// Errors raised while writing generated files.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Failed to open output {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write output {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for code generation.
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Destination of generated text.
pub trait OutputSink {
    fn open(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
    fn write_str(&mut self, text: &str) -> io::Result<()>;
    fn name(&self) -> &str;
}

// ============================================================================
// Sinks
// ============================================================================

/// Buffered file output. Parent directories are created on open.
pub struct FileSink {
    path: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn open(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.writer = Some(BufWriter::new(File::create(&self.path)?));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_all(text.as_bytes()),
            None => Err(io::Error::other(format!("{} is not open", self.name))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory output.
#[derive(Debug, Default)]
pub struct StringSink {
    name: String,
    buffer: String,
    opened: bool,
}

impl StringSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for StringSink {
    fn open(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.opened = false;
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        if !self.opened {
            return Err(io::Error::other(format!("{} is not open", self.name)));
        }
        self.buffer.push_str(text);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Generator
// ============================================================================

const HEADER_PRELUDE: &str = r#"/*!
	\file {filename}.h
	\brief The file is generated by introspect. Do not edit it manually.
*/

#pragma once

#include <array>
#include <cstdint>

#ifndef INTROSPECT_META_TRAITS
#define INTROSPECT_META_TRAITS

using TypeId = std::uint64_t;

template <typename T>
struct EnumFieldInfo
{
	T           value;
	const char* name;
};

template <typename T> struct EnumTrait;
template <typename T> struct ClassTrait;

#endif
"#;

/// Stable 64-bit FNV-1a hash of a qualified type name.
pub fn type_id(qualified_name: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    qualified_name.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

/// Counts of what a generation run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationSummary {
    pub enums: usize,
    pub classes: usize,
    pub includes: usize,
}

/// Writes `<filename>.h` and `<filename>.cpp`.
pub struct CodeGenerator<S: OutputSink> {
    header: S,
    source: S,
    filename: String,
}

impl CodeGenerator<FileSink> {
    /// Generator writing `<dir>/<filename>.h` and `<dir>/<filename>.cpp`.
    pub fn to_directory(dir: &Path, filename: &str) -> Self {
        Self::new(
            FileSink::new(dir.join(format!("{}.h", filename))),
            FileSink::new(dir.join(format!("{}.cpp", filename))),
            filename,
        )
    }
}

impl<S: OutputSink> CodeGenerator<S> {
    pub fn new(header: S, source: S, filename: impl Into<String>) -> Self {
        Self {
            header,
            source,
            filename: filename.into(),
        }
    }

    pub fn header(&self) -> &S {
        &self.header
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Emit traits for every extracted enum and class.
    pub fn generate(&mut self, enums: &[EnumEntry<'_>], classes: &[ClassEntry<'_>]) -> Result<GenerationSummary> {
        let includes: BTreeSet<&str> = enums
            .iter()
            .map(|entry| entry.source_filename())
            .chain(classes.iter().map(|entry| entry.source_filename()))
            .filter(|name| !name.is_empty())
            .collect();

        let header_text = self.render_header(&includes, enums, classes);
        let source_text = format!("#include \"{}.h\"\n", self.filename);

        write_all(&mut self.header, &header_text)?;
        write_all(&mut self.source, &source_text)?;

        info!(
            "Generated {} enum and {} class traits into {}",
            enums.len(),
            classes.len(),
            self.header.name()
        );

        Ok(GenerationSummary {
            enums: enums.len(),
            classes: classes.len(),
            includes: includes.len(),
        })
    }

    fn render_header(&self, includes: &BTreeSet<&str>, enums: &[EnumEntry<'_>], classes: &[ClassEntry<'_>]) -> String {
        let mut out = HEADER_PRELUDE.replace("{filename}", &self.filename);

        if !includes.is_empty() {
            out.push('\n');
            for include in includes {
                let _ = writeln!(out, "#include \"{}\"", include.replace('\\', "/"));
            }
        }

        out.push_str("\n/*\n\tenums' meta declarations\n*/\n");
        for entry in enums {
            render_enum_trait(&mut out, entry);
        }

        out.push_str("\n/*\n\tclasses' meta declarations\n*/\n");
        for entry in classes {
            render_class_trait(&mut out, entry);
        }

        out
    }
}

fn write_all<S: OutputSink>(sink: &mut S, text: &str) -> Result<()> {
    let name = sink.name().to_string();
    sink.open().map_err(|source| CodegenError::Open {
        name: name.clone(),
        source,
    })?;
    sink.write_str(text)
        .and_then(|_| sink.close())
        .map_err(|source| CodegenError::Write { name, source })
}

fn render_enum_trait(out: &mut String, entry: &EnumEntry<'_>) {
    let ty = entry.ty;
    let full_name = qualify(&ty.mangled_id);
    let count = ty.enumerators.len();

    let fields = ty
        .enumerators
        .iter()
        .map(|enumerator| {
            format!(
                "EnumFieldInfo<{0}> {{ {0}::{1}, \"{1}\" }}",
                full_name, enumerator
            )
        })
        .collect::<Vec<_>>()
        .join(",\n\t\t\t");

    let _ = write!(
        out,
        r#"
template <>
struct EnumTrait<{name}>
{{
	static const bool         isOpaque = {opaque};
	static const unsigned int elementsCount = {count};

	static const std::array<EnumFieldInfo<{name}>, elementsCount> GetFields()
	{{
		static const std::array<EnumFieldInfo<{name}>, {count}> fields
		{{
			{fields}
		}};

		return fields;
	}}
}};
"#,
        name = full_name,
        opaque = ty.is_strongly_typed,
        count = count,
        fields = fields,
    );
}

fn render_class_trait(out: &mut String, entry: &ClassEntry<'_>) {
    let ty = entry.ty;
    let full_name = qualify(&ty.mangled_id);

    let bases = ty
        .base_classes
        .iter()
        .map(|base| format!("\"{}\"", base.full_name))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = write!(
        out,
        r#"
template <>
struct ClassTrait<{name}>
{{
	static constexpr const char* name = "{name}";
	static constexpr TypeId      typeId = {type_id}ull;
	static constexpr bool        isFinal = {is_final};

	static constexpr std::array<const char*, {base_count}> baseClasses {{ {bases} }};
}};
"#,
        name = full_name,
        type_id = type_id(&full_name),
        is_final = ty.is_final,
        base_count = ty.base_classes.len(),
        bases = bases,
    );
}
