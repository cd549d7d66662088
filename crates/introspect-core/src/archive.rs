//! Binary archive used to persist symbol tables.
//!
//! Encoding is little-endian throughout:
//! - counts and string lengths: `u64`
//! - subtype tags and access specifiers: `u32`
//! - booleans: a single byte, `0` or `1`
//! - strings: byte length followed by UTF-8 bytes
//!
//! Each serialized type starts with its subtype tag followed by `id` and
//! `mangled_id`; enums and classes append their own fields. A missing type is
//! written as the bare [`TAG_UNKNOWN`] tag.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::types::{AccessModifier, BaseClassInfo, ClassType, EnumType, Type, TypeInfo};

pub const TAG_BASE: u32 = 0;
pub const TAG_NAMESPACE: u32 = 1;
pub const TAG_ENUM: u32 = 2;
pub const TAG_CLASS: u32 = 3;
pub const TAG_UNKNOWN: u32 = 4;

/// Stand-in for the `-1` index of named scopes.
pub const NAMED_SCOPE_INDEX: i32 = i32::MAX;

/// Upper bound for a single string, guards against corrupt length prefixes.
const MAX_STRING_LEN: u64 = 16 * 1024 * 1024;

/// Errors raised while reading or writing an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected end of archive")]
    UnexpectedEof,

    #[error("Invalid UTF-8 in archived string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Unknown type tag: {0}")]
    UnknownTag(u32),

    #[error("Invalid access specifier: {0}")]
    InvalidAccess(u32),

    #[error("Invalid boolean byte: {0}")]
    InvalidBool(u8),

    #[error("String length {0} exceeds the archive limit")]
    StringTooLong(u64),

    #[error("Invalid scope index: {0}")]
    InvalidIndex(i32),
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

// ============================================================================
// Writer
// ============================================================================

pub struct ArchiveWriter<W: Write> {
    inner: W,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_count(&mut self, count: usize) -> Result<()> {
        self.write_u64(count as u64)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.inner.write_all(&[u8::from(value)])?;
        Ok(())
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_count(value.len())?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Write a type, or the unknown tag when there is none.
    pub fn write_type(&mut self, ty: Option<&Type>) -> Result<()> {
        let Some(ty) = ty else {
            return self.write_u32(TAG_UNKNOWN);
        };

        match ty {
            Type::Base(info) => self.write_type_header(TAG_BASE, &info.id, &info.mangled_id),
            Type::Namespace(info) => {
                self.write_type_header(TAG_NAMESPACE, &info.id, &info.mangled_id)
            }
            Type::Enum(ty) => self.write_enum(ty),
            Type::Class(ty) => self.write_class(ty),
        }
    }

    fn write_type_header(&mut self, tag: u32, id: &str, mangled_id: &str) -> Result<()> {
        self.write_u32(tag)?;
        self.write_str(id)?;
        self.write_str(mangled_id)
    }

    fn write_enum(&mut self, ty: &EnumType) -> Result<()> {
        self.write_type_header(TAG_ENUM, &ty.id, &ty.mangled_id)?;
        self.write_bool(ty.is_strongly_typed)?;
        self.write_bool(ty.is_introspectable)?;
        self.write_bool(ty.is_forward_declaration)?;
        self.write_str(&ty.underlying_type)?;

        self.write_count(ty.enumerators.len())?;
        for enumerator in &ty.enumerators {
            self.write_str(enumerator)?;
        }

        self.write_bool(ty.is_marked_with_attribute)?;
        self.write_u32(ty.access_modifier.as_u32())
    }

    fn write_class(&mut self, ty: &ClassType) -> Result<()> {
        self.write_type_header(TAG_CLASS, &ty.id, &ty.mangled_id)?;
        self.write_bool(ty.is_final)?;
        self.write_bool(ty.is_forward_declaration)?;
        self.write_bool(ty.is_struct)?;
        self.write_bool(ty.is_template)?;

        self.write_count(ty.base_classes.len())?;
        for base in &ty.base_classes {
            self.write_str(&base.full_name)?;
            self.write_bool(base.is_virtual_inherited)?;
            self.write_u32(base.access.as_u32())?;
        }

        self.write_bool(ty.is_marked_with_attribute)?;
        self.write_u32(ty.access_modifier.as_u32())
    }
}

// ============================================================================
// Reader
// ============================================================================

pub struct ArchiveReader<R: Read> {
    inner: R,
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ArchiveError::UnexpectedEof,
            _ => ArchiveError::Io(e),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_count(&mut self) -> Result<u64> {
        self.read_u64()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        match buf[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ArchiveError::InvalidBool(other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u64()?;
        if len > MAX_STRING_LEN {
            return Err(ArchiveError::StringTooLong(len));
        }

        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    fn read_access(&mut self) -> Result<AccessModifier> {
        let value = self.read_u32()?;
        AccessModifier::from_u32(value).ok_or(ArchiveError::InvalidAccess(value))
    }

    /// Read a type written by [`ArchiveWriter::write_type`].
    pub fn read_type(&mut self) -> Result<Option<Type>> {
        let tag = self.read_u32()?;
        if tag == TAG_UNKNOWN {
            return Ok(None);
        }
        if tag > TAG_CLASS {
            return Err(ArchiveError::UnknownTag(tag));
        }

        let id = self.read_string()?;
        let mangled_id = self.read_string()?;

        let ty = match tag {
            TAG_BASE => Type::Base(TypeInfo::new(id, mangled_id)),
            TAG_NAMESPACE => Type::Namespace(TypeInfo::new(id, mangled_id)),
            TAG_ENUM => Type::Enum(self.read_enum_fields(EnumType::new(id, mangled_id))?),
            _ => Type::Class(self.read_class_fields(ClassType::new(id, mangled_id))?),
        };
        Ok(Some(ty))
    }

    fn read_enum_fields(&mut self, mut ty: EnumType) -> Result<EnumType> {
        ty.is_strongly_typed = self.read_bool()?;
        ty.is_introspectable = self.read_bool()?;
        ty.is_forward_declaration = self.read_bool()?;
        ty.underlying_type = self.read_string()?;

        let count = self.read_count()?;
        for _ in 0..count {
            ty.enumerators.push(self.read_string()?);
        }

        ty.is_marked_with_attribute = self.read_bool()?;
        ty.access_modifier = self.read_access()?;
        Ok(ty)
    }

    fn read_class_fields(&mut self, mut ty: ClassType) -> Result<ClassType> {
        ty.is_final = self.read_bool()?;
        ty.is_forward_declaration = self.read_bool()?;
        ty.is_struct = self.read_bool()?;
        ty.is_template = self.read_bool()?;

        let count = self.read_count()?;
        for _ in 0..count {
            let full_name = self.read_string()?;
            let is_virtual_inherited = self.read_bool()?;
            let access = self.read_access()?;
            ty.base_classes.push(BaseClassInfo {
                full_name,
                is_virtual_inherited,
                access,
            });
        }

        ty.is_marked_with_attribute = self.read_bool()?;
        ty.access_modifier = self.read_access()?;
        Ok(ty)
    }
}
