//! Collect enum and class descriptors from one or more symbol tables.
//!
//! Tables are walked depth-first, anonymous children before named ones.
//! Filters are applied at visit time, and the first descriptor seen for a
//! mangled id is kept unless a later one is strictly more complete, so a
//! forward declaration never hides a full definition regardless of order.

use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::symtable::{ScopeId, SymTable};
use crate::types::{qualify, AccessModifier, ClassType, EnumType, Type};

/// Bitmask of declaration kinds eligible for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EmitFlags(u32);

impl EmitFlags {
    pub const NONE: EmitFlags = EmitFlags(0);
    pub const ENUMS: EmitFlags = EmitFlags(1);
    pub const CLASSES: EmitFlags = EmitFlags(1 << 1);
    pub const STRUCTS: EmitFlags = EmitFlags(1 << 2);
    pub const ALL: EmitFlags = EmitFlags(0b111);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: EmitFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Build flags from names such as `enums`, `classes`, `structs`, `all`.
    pub fn from_names<'n>(names: impl IntoIterator<Item = &'n str>) -> Option<EmitFlags> {
        let mut flags = EmitFlags::NONE;
        for name in names {
            flags |= match name.trim().to_ascii_lowercase().as_str() {
                "enums" | "enum" => EmitFlags::ENUMS,
                "classes" | "class" => EmitFlags::CLASSES,
                "structs" | "struct" => EmitFlags::STRUCTS,
                "all" => EmitFlags::ALL,
                _ => return None,
            };
        }
        Some(flags)
    }
}

impl Default for EmitFlags {
    fn default() -> Self {
        EmitFlags::ALL
    }
}

impl BitOr for EmitFlags {
    type Output = EmitFlags;

    fn bitor(self, rhs: EmitFlags) -> EmitFlags {
        EmitFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EmitFlags {
    fn bitor_assign(&mut self, rhs: EmitFlags) {
        self.0 |= rhs.0;
    }
}

/// Filters shared by both extractors.
#[derive(Debug, Clone, Default)]
pub struct ExtractorFilter {
    pub emit_flags: EmitFlags,
    /// Only keep types preceded by their attribute marker.
    pub tagged_only: bool,
    /// Matched against both the type id and its qualified name.
    pub exclude: Vec<Regex>,
}

impl ExtractorFilter {
    pub fn new(emit_flags: EmitFlags) -> Self {
        Self {
            emit_flags,
            ..Self::default()
        }
    }

    pub fn with_tagged_only(mut self, tagged_only: bool) -> Self {
        self.tagged_only = tagged_only;
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn is_excluded(&self, id: &str, mangled_id: &str) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        let qualified = qualify(mangled_id);
        self.exclude
            .iter()
            .any(|pattern| pattern.is_match(id) || pattern.is_match(&qualified))
    }
}

/// An accepted descriptor together with the table it came from.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry<'a, T> {
    pub table: &'a SymTable,
    pub scope: ScopeId,
    pub ty: &'a T,
}

impl<T> TypeEntry<'_, T> {
    pub fn source_filename(&self) -> &str {
        self.table.source_filename()
    }
}

pub type EnumEntry<'a> = TypeEntry<'a, EnumType>;
pub type ClassEntry<'a> = TypeEntry<'a, ClassType>;

/// Receives every typed named scope during a walk.
pub trait TypeCollector<'a> {
    fn visit_type(&mut self, table: &'a SymTable, scope: ScopeId, ty: &'a Type);
}

/// Walk `table`, anonymous children first, then named children. A named
/// child's type is visited before its own subtree.
pub fn walk_table<'a, C: TypeCollector<'a>>(table: &'a SymTable, collector: &mut C) {
    walk_scope(table, ScopeId::GLOBAL, collector);
}

fn walk_scope<'a, C: TypeCollector<'a>>(table: &'a SymTable, id: ScopeId, collector: &mut C) {
    let scope = table.scope(id);

    for child in scope.nested() {
        walk_scope(table, *child, collector);
    }

    for child in scope.named().values() {
        if let Some(ty) = table.scope(*child).ty() {
            collector.visit_type(table, *child, ty);
        }
        walk_scope(table, *child, collector);
    }
}

/// True when any enclosing class of `id` is a template.
fn inside_template(table: &SymTable, id: ScopeId) -> bool {
    let mut cursor = table.scope(id).parent();
    while let Some(parent) = cursor {
        let scope = table.scope(parent);
        if scope.ty().and_then(Type::as_class).is_some_and(|class| class.is_template) {
            return true;
        }
        cursor = scope.parent();
    }
    false
}

/// De-duplicating ordered store shared by the extractors.
struct EntryStore<'a, T> {
    index: HashMap<&'a str, usize>,
    entries: Vec<TypeEntry<'a, T>>,
}

impl<'a, T> EntryStore<'a, T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn insert(
        &mut self,
        mangled_id: &'a str,
        entry: TypeEntry<'a, T>,
        supersedes: impl Fn(&T, &T) -> bool,
    ) {
        match self.index.get(mangled_id) {
            Some(&position) => {
                if supersedes(entry.ty, self.entries[position].ty) {
                    trace!("Replacing {} with a more complete definition", mangled_id);
                    self.entries[position] = entry;
                }
            }
            None => {
                self.index.insert(mangled_id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

pub struct EnumsExtractor<'a> {
    filter: ExtractorFilter,
    store: EntryStore<'a, EnumType>,
}

impl<'a> EnumsExtractor<'a> {
    pub fn new(filter: ExtractorFilter) -> Self {
        Self {
            filter,
            store: EntryStore::new(),
        }
    }

    pub fn visit_table(&mut self, table: &'a SymTable) {
        walk_table(table, self);
    }

    pub fn visit_tables(&mut self, tables: impl IntoIterator<Item = &'a SymTable>) {
        for table in tables {
            self.visit_table(table);
        }
        debug!("Extracted {} enums", self.store.entries.len());
    }

    pub fn entries(&self) -> &[EnumEntry<'a>] {
        &self.store.entries
    }

    pub fn into_entries(self) -> Vec<EnumEntry<'a>> {
        self.store.entries
    }

    fn accepts(&self, table: &SymTable, scope: ScopeId, ty: &EnumType) -> bool {
        self.filter.emit_flags.contains(EmitFlags::ENUMS)
            && ty.access_modifier == AccessModifier::Public
            && ty.is_introspectable
            && !inside_template(table, scope)
            && (!self.filter.tagged_only || ty.is_marked_with_attribute)
            && !self.filter.is_excluded(&ty.id, &ty.mangled_id)
    }
}

impl<'a> TypeCollector<'a> for EnumsExtractor<'a> {
    fn visit_type(&mut self, table: &'a SymTable, scope: ScopeId, ty: &'a Type) {
        let Type::Enum(ty) = ty else {
            return;
        };
        if !self.accepts(table, scope, ty) {
            return;
        }

        self.store.insert(
            &ty.mangled_id,
            TypeEntry { table, scope, ty },
            EnumType::is_more_complete_than,
        );
    }
}

// ============================================================================
// Classes
// ============================================================================

pub struct ClassesExtractor<'a> {
    filter: ExtractorFilter,
    store: EntryStore<'a, ClassType>,
}

impl<'a> ClassesExtractor<'a> {
    pub fn new(filter: ExtractorFilter) -> Self {
        Self {
            filter,
            store: EntryStore::new(),
        }
    }

    pub fn visit_table(&mut self, table: &'a SymTable) {
        walk_table(table, self);
    }

    pub fn visit_tables(&mut self, tables: impl IntoIterator<Item = &'a SymTable>) {
        for table in tables {
            self.visit_table(table);
        }
        debug!("Extracted {} classes", self.store.entries.len());
    }

    pub fn entries(&self) -> &[ClassEntry<'a>] {
        &self.store.entries
    }

    pub fn into_entries(self) -> Vec<ClassEntry<'a>> {
        self.store.entries
    }

    fn accepts(&self, table: &SymTable, scope: ScopeId, ty: &ClassType) -> bool {
        let kind_flag = if ty.is_struct {
            EmitFlags::STRUCTS
        } else {
            EmitFlags::CLASSES
        };

        self.filter.emit_flags.contains(kind_flag)
            && !ty.is_template
            && !ty.is_forward_declaration
            && ty.access_modifier == AccessModifier::Public
            && table.is_reachable_by_name(scope)
            && !inside_template(table, scope)
            && (!self.filter.tagged_only || ty.is_marked_with_attribute)
            && !self.filter.is_excluded(&ty.id, &ty.mangled_id)
    }
}

impl<'a> TypeCollector<'a> for ClassesExtractor<'a> {
    fn visit_type(&mut self, table: &'a SymTable, scope: ScopeId, ty: &'a Type) {
        let Type::Class(ty) = ty else {
            return;
        };
        if !self.accepts(table, scope, ty) {
            return;
        }

        self.store.insert(
            &ty.mangled_id,
            TypeEntry { table, scope, ty },
            ClassType::is_more_complete_than,
        );
    }
}
