//! Introspect Core - Type metadata extraction from C-family headers
//!
//! This crate provides the core functionality for header introspection:
//! - Line-oriented sources and a token lexer with lookahead
//! - A scope tree symbol table with binary persistence
//! - A recursive-descent parser for namespaces, enums and classes
//! - Enum and class extractors plus trait code emission
//! - Header discovery, a symbol table cache and a parallel batch pipeline

pub mod archive;
pub mod cache;
pub mod codegen;
pub mod discovery;
pub mod extractor;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod symtable;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use lexer::Lexer;
pub use source::{FileSource, SourceReader, StringSource};
pub use token::{CursorPos, Token, TokenKind, TokenType};
pub use types::{
    qualify, AccessModifier, BaseClassInfo, ClassType, EnumType, Type, TypeInfo, TypeKind,
    MANGLE_SEPARATOR,
};

// Symbol table re-exports
pub use archive::ArchiveError;
pub use symtable::{Scope, ScopeId, SymTable, SymTableError, Symbol};

// Parser re-exports
pub use parser::{parse_into, parse_str, ErrorCallback, Parser, ParserError, ParserErrorCode};

// Extractor re-exports
pub use extractor::{
    ClassEntry, ClassesExtractor, EmitFlags, EnumEntry, EnumsExtractor, ExtractorFilter,
    TypeCollector, TypeEntry,
};

// Output re-exports
pub use codegen::{
    type_id, CodeGenerator, CodegenError, FileSink, GenerationSummary, OutputSink, StringSink,
};

// Batch processing re-exports
pub use cache::{compute_file_key, CacheError, SymTableCache};
pub use discovery::{collect_headers, DiscoveryError, DiscoveryOptions};
pub use pipeline::{FileResult, Pipeline, PipelineError, PipelineOptions, PipelineReport};
