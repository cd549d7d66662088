//! Type descriptors attached to named scopes.
//!
//! A closed set of variants: plain base types, namespaces, enums and
//! classes. Consumers dispatch with `match` instead of a visitor hierarchy.

use std::fmt;

use serde::Serialize;

/// Separator used inside mangled ids.
pub const MANGLE_SEPARATOR: &str = "@";

/// Turn a mangled id (`Outer@Inner@Name`) into its qualified form
/// (`Outer::Inner::Name`).
pub fn qualify(mangled_id: &str) -> String {
    mangled_id.replace(MANGLE_SEPARATOR, "::")
}

/// Access of a member or base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessModifier {
    #[default]
    Public,
    Protected,
    Private,
}

impl AccessModifier {
    pub fn as_u32(self) -> u32 {
        match self {
            AccessModifier::Public => 0,
            AccessModifier::Protected => 1,
            AccessModifier::Private => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(AccessModifier::Public),
            1 => Some(AccessModifier::Protected),
            2 => Some(AccessModifier::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessModifier::Public => "public",
            AccessModifier::Protected => "protected",
            AccessModifier::Private => "private",
        }
    }
}

impl fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant tag of a [`Type`], also used as the archive subtype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKind {
    Base,
    Namespace,
    Enum,
    Class,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Base => "base",
            TypeKind::Namespace => "namespace",
            TypeKind::Enum => "enum",
            TypeKind::Class => "class",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TypeInfo {
    /// Local name.
    pub id: String,
    /// `@`-joined path from the global scope.
    pub mangled_id: String,
}

impl TypeInfo {
    pub fn new(id: impl Into<String>, mangled_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mangled_id: mangled_id.into(),
        }
    }
}

/// Enum descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumType {
    pub id: String,
    pub mangled_id: String,
    pub is_strongly_typed: bool,
    /// False for enums hidden inside anonymous namespaces.
    pub is_introspectable: bool,
    pub is_forward_declaration: bool,
    pub underlying_type: String,
    /// Enumerator names in declaration order.
    pub enumerators: Vec<String>,
    pub is_marked_with_attribute: bool,
    pub access_modifier: AccessModifier,
}

impl EnumType {
    pub fn new(id: impl Into<String>, mangled_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mangled_id: mangled_id.into(),
            is_strongly_typed: false,
            is_introspectable: true,
            is_forward_declaration: false,
            underlying_type: "int".to_string(),
            enumerators: Vec::new(),
            is_marked_with_attribute: false,
            access_modifier: AccessModifier::Public,
        }
    }

    /// Whether this descriptor should supersede `other` for the same name.
    pub fn is_more_complete_than(&self, other: &EnumType) -> bool {
        if other.is_forward_declaration && !self.is_forward_declaration {
            return true;
        }
        other.enumerators.is_empty() && !self.enumerators.is_empty()
    }
}

/// One entry of a class's base list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseClassInfo {
    pub full_name: String,
    pub is_virtual_inherited: bool,
    pub access: AccessModifier,
}

/// Class or struct descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassType {
    pub id: String,
    pub mangled_id: String,
    pub is_final: bool,
    pub is_forward_declaration: bool,
    pub is_struct: bool,
    pub is_template: bool,
    pub base_classes: Vec<BaseClassInfo>,
    pub is_marked_with_attribute: bool,
    pub access_modifier: AccessModifier,
}

impl ClassType {
    pub fn new(id: impl Into<String>, mangled_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mangled_id: mangled_id.into(),
            is_final: false,
            is_forward_declaration: false,
            is_struct: false,
            is_template: false,
            base_classes: Vec::new(),
            is_marked_with_attribute: false,
            access_modifier: AccessModifier::Public,
        }
    }

    /// Access applied to members and bases when none is written.
    pub fn default_access(&self) -> AccessModifier {
        if self.is_struct {
            AccessModifier::Public
        } else {
            AccessModifier::Private
        }
    }

    pub fn is_more_complete_than(&self, other: &ClassType) -> bool {
        other.is_forward_declaration && !self.is_forward_declaration
    }
}

/// Descriptor attached to a named scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Type {
    Base(TypeInfo),
    Namespace(TypeInfo),
    Enum(EnumType),
    Class(ClassType),
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Base(_) => TypeKind::Base,
            Type::Namespace(_) => TypeKind::Namespace,
            Type::Enum(_) => TypeKind::Enum,
            Type::Class(_) => TypeKind::Class,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Type::Base(info) | Type::Namespace(info) => &info.id,
            Type::Enum(ty) => &ty.id,
            Type::Class(ty) => &ty.id,
        }
    }

    pub fn mangled_id(&self) -> &str {
        match self {
            Type::Base(info) | Type::Namespace(info) => &info.mangled_id,
            Type::Enum(ty) => &ty.mangled_id,
            Type::Class(ty) => &ty.mangled_id,
        }
    }

    /// `::`-joined fully qualified name.
    pub fn qualified_name(&self) -> String {
        qualify(self.mangled_id())
    }

    pub fn is_forward_declaration(&self) -> bool {
        match self {
            Type::Enum(ty) => ty.is_forward_declaration,
            Type::Class(ty) => ty.is_forward_declaration,
            _ => false,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Type::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_enum_mut(&mut self) -> Option<&mut EnumType> {
        match self {
            Type::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassType> {
        match self {
            Type::Class(ty) => Some(ty),
            _ => None,
        }
    }
}
