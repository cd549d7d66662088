//! Hierarchical symbol table built while parsing a single source file.
//!
//! Scopes live in an arena owned by [`SymTable`] and are addressed by
//! [`ScopeId`]. Every scope owns an ordered list of anonymous children, an
//! insertion-ordered map of named children, a list of symbols and optionally a
//! [`Type`] descriptor.
//!
//! The table has two ways of moving the cursor into a child scope:
//! - [`SymTable::create_scope`] builds a new child (write mode)
//! - [`SymTable::enter_scope`] re-enters an existing child (read-only mode),
//!   e.g. to reopen a namespace or complete a forward-declared class
//!
//! Anonymous children are re-entered in order. The position of the last
//! visited anonymous child is saved on an explicit stack of entry frames, so
//! any nesting of named re-entries restores the right cursor on exit.

use std::io::{Read, Write};

use indexmap::IndexMap;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use thiserror::Error;
use tracing::{trace, warn};

use crate::archive::{self, ArchiveError, ArchiveReader, ArchiveWriter, NAMED_SCOPE_INDEX};
use crate::types::{qualify, Type, MANGLE_SEPARATOR};

/// Errors raised by scope navigation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymTableError {
    #[error("Scope '{name}' already exists in the current scope")]
    DuplicateScope { name: String },

    #[error("Scope '{name}' not found in the current scope")]
    ScopeNotFound { name: String },

    #[error("No anonymous scope left to enter at position {position}")]
    NoMoreAnonymousScopes { position: usize },
}

/// Result type for scope navigation.
pub type Result<T> = std::result::Result<T, SymTableError>;

/// Stable handle of a scope inside its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The global scope of every table.
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A named entry inside a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<Type>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Option<Type>) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One node of the scope tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    parent: Option<ScopeId>,
    nested: Vec<ScopeId>,
    named: IndexMap<String, ScopeId>,
    symbols: Vec<Symbol>,
    /// Position among the parent's anonymous children, `-1` for named scopes.
    index: i32,
    ty: Option<Type>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, index: i32) -> Self {
        Self {
            parent,
            nested: Vec::new(),
            named: IndexMap::new(),
            symbols: Vec::new(),
            index,
            ty: None,
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Anonymous children in creation order.
    pub fn nested(&self) -> &[ScopeId] {
        &self.nested
    }

    /// Named children in creation order.
    pub fn named(&self) -> &IndexMap<String, ScopeId> {
        &self.named
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn is_anonymous(&self) -> bool {
        self.index >= 0
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }
}

/// Saved traversal state of one create/enter call.
#[derive(Debug, Clone, Copy)]
struct EntryFrame {
    saved_cursor: i32,
    read_only: bool,
}

/// Scope tree of one source file plus its traversal cursor.
#[derive(Debug, Clone)]
pub struct SymTable {
    scopes: Vec<Scope>,
    current: ScopeId,
    previous: Option<ScopeId>,
    read_only: bool,
    /// Index of the last visited anonymous child of the current scope.
    last_visited_index: i32,
    frames: Vec<EntryFrame>,
    source_filename: String,
}

impl Default for SymTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SymTable {
    /// Structural equality of the scope trees and source filename. Cursor
    /// state is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.source_filename == other.source_filename
            && scopes_equal(self, ScopeId::GLOBAL, other, ScopeId::GLOBAL)
    }
}

fn scopes_equal(a: &SymTable, a_id: ScopeId, b: &SymTable, b_id: ScopeId) -> bool {
    let (sa, sb) = (a.scope(a_id), b.scope(b_id));

    sa.index == sb.index
        && sa.ty == sb.ty
        && sa.symbols == sb.symbols
        && sa.nested.len() == sb.nested.len()
        && sa.named.len() == sb.named.len()
        && sa
            .nested
            .iter()
            .zip(&sb.nested)
            .all(|(x, y)| scopes_equal(a, *x, b, *y))
        && sa
            .named
            .iter()
            .zip(&sb.named)
            .all(|((nx, x), (ny, y))| nx == ny && scopes_equal(a, *x, b, *y))
}

impl SymTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, -1)],
            current: ScopeId::GLOBAL,
            previous: None,
            read_only: false,
            last_visited_index: -1,
            frames: Vec::new(),
            source_filename: String::new(),
        }
    }

    pub fn with_source_filename(filename: impl Into<String>) -> Self {
        let mut table = Self::new();
        table.source_filename = filename.into();
        table
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn global_scope(&self) -> &Scope {
        self.scope(ScopeId::GLOBAL)
    }

    pub fn current_scope_id(&self) -> ScopeId {
        self.current
    }

    pub fn current_scope(&self) -> &Scope {
        self.scope(self.current)
    }

    /// Scope the cursor was in before the last `enter_scope`.
    pub fn previous_scope_id(&self) -> Option<ScopeId> {
        self.previous
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn source_filename(&self) -> &str {
        &self.source_filename
    }

    pub fn set_source_filename(&mut self, filename: impl Into<String>) {
        self.source_filename = filename.into();
    }

    pub fn current_scope_type(&self) -> Option<&Type> {
        self.current_scope().ty.as_ref()
    }

    pub fn current_scope_type_mut(&mut self) -> Option<&mut Type> {
        self.scopes[self.current.0].ty.as_mut()
    }

    /// Attach (or replace) the type of the current scope.
    pub fn set_current_scope_type(&mut self, ty: Type) {
        self.scopes[self.current.0].ty = Some(ty);
    }

    /// Type of the nearest enclosing scope that carries one.
    pub fn parent_type_of(&self, id: ScopeId) -> Option<&Type> {
        let mut cursor = self.scope(id).parent;
        while let Some(parent) = cursor {
            let scope = self.scope(parent);
            if let Some(ty) = scope.ty.as_ref() {
                return Some(ty);
            }
            cursor = scope.parent;
        }
        None
    }

    /// True when every scope between `id` and the global scope is named.
    pub fn is_reachable_by_name(&self, id: ScopeId) -> bool {
        let mut cursor = Some(id);
        while let Some(scope_id) = cursor {
            if scope_id == ScopeId::GLOBAL {
                return true;
            }
            let scope = self.scope(scope_id);
            if scope.is_anonymous() {
                return false;
            }
            cursor = scope.parent;
        }
        true
    }

    /// `::`-joined form of a mangled id.
    pub fn qualified_name(mangled_id: &str) -> String {
        qualify(mangled_id)
    }

    // ========================================================================
    // Scope navigation
    // ========================================================================

    fn push_scope(&mut self, parent: ScopeId, index: i32) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Some(parent), index));
        id
    }

    /// Create a child of the current scope and move into it.
    ///
    /// An empty name creates an anonymous scope. A named scope fails with
    /// [`SymTableError::DuplicateScope`] if a sibling already uses the name;
    /// callers then switch to [`SymTable::enter_scope`].
    pub fn create_scope(&mut self, name: &str) -> Result<ScopeId> {
        self.read_only = false;

        let parent = self.current;
        let id = if name.is_empty() {
            let index = self.scope(parent).nested.len() as i32;
            let id = self.push_scope(parent, index);
            self.scopes[parent.0].nested.push(id);
            id
        } else {
            if self.scope(parent).named.contains_key(name) {
                return Err(SymTableError::DuplicateScope {
                    name: name.to_string(),
                });
            }
            let id = self.push_scope(parent, -1);
            self.scopes[parent.0].named.insert(name.to_string(), id);
            id
        };

        self.frames.push(EntryFrame {
            saved_cursor: self.last_visited_index,
            read_only: false,
        });
        self.current = id;
        trace!("Created scope {:?} '{}'", id, name);
        Ok(id)
    }

    /// Re-enter an existing child of the current scope.
    ///
    /// An empty name enters the next anonymous child that has not been
    /// visited yet.
    pub fn enter_scope(&mut self, name: &str) -> Result<ScopeId> {
        self.read_only = true;

        let parent = self.current;
        let id = if name.is_empty() {
            let position = (self.last_visited_index + 1) as usize;
            *self
                .scope(parent)
                .nested
                .get(position)
                .ok_or(SymTableError::NoMoreAnonymousScopes { position })?
        } else {
            *self
                .scope(parent)
                .named
                .get(name)
                .ok_or_else(|| SymTableError::ScopeNotFound {
                    name: name.to_string(),
                })?
        };

        self.frames.push(EntryFrame {
            saved_cursor: self.last_visited_index,
            read_only: true,
        });
        self.previous = Some(parent);
        self.current = id;
        self.last_visited_index = -1;
        trace!("Entered scope {:?} '{}'", id, name);
        Ok(id)
    }

    /// Move back to the parent scope.
    pub fn exit_scope(&mut self) {
        let leaving = self.current;
        let Some(parent) = self.scope(leaving).parent else {
            warn!("exit_scope called on the global scope");
            return;
        };

        let frame = self.frames.pop().unwrap_or(EntryFrame {
            saved_cursor: self.last_visited_index,
            read_only: self.read_only,
        });
        self.current = parent;

        if frame.read_only {
            let index = self.scope(leaving).index;
            self.last_visited_index = if index >= 0 {
                index
            } else {
                frame.saved_cursor
            };
        }
    }

    /// Return the cursor to the global scope and forget traversal state.
    pub fn reset_cursor(&mut self) {
        self.current = ScopeId::GLOBAL;
        self.previous = None;
        self.read_only = false;
        self.last_visited_index = -1;
        self.frames.clear();
    }

    // ========================================================================
    // Symbols and lookups
    // ========================================================================

    /// Add a symbol to the current scope. An existing symbol with the same
    /// name keeps its position and gets the new type.
    pub fn add_symbol(&mut self, name: impl Into<String>, ty: Option<Type>) {
        let name = name.into();
        let symbols = &mut self.scopes[self.current.0].symbols;

        match symbols.iter_mut().find(|symbol| symbol.name == name) {
            Some(existing) => existing.ty = ty,
            None => symbols.push(Symbol::new(name, ty)),
        }
    }

    /// Remove a symbol from the current scope.
    pub fn remove_symbol(&mut self, name: &str) -> Option<Symbol> {
        let symbols = &mut self.scopes[self.current.0].symbols;
        let position = symbols.iter().position(|symbol| symbol.name == name)?;
        Some(symbols.remove(position))
    }

    fn ancestors_from_current(&self) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(self.current), move |id| self.scope(*id).parent)
    }

    /// Find a symbol in the current scope or any of its ancestors.
    pub fn look_up_symbol(&self, name: &str) -> Option<&Symbol> {
        self.ancestors_from_current().find_map(|id| {
            self.scope(id)
                .symbols
                .iter()
                .find(|symbol| symbol.name == name)
        })
    }

    /// Find a named scope among the children of the current scope or of any
    /// of its ancestors, nearest first.
    pub fn look_up_named_scope(&self, name: &str) -> Option<ScopeId> {
        self.ancestors_from_current()
            .find_map(|id| self.scope(id).named.get(name).copied())
    }

    /// `@`-joined path of the named scope `name` as seen from the current
    /// scope. Anonymous and untyped ancestors do not contribute.
    pub fn mangled_name_for_named_scope(&self, name: &str) -> Option<String> {
        let found = self.look_up_named_scope(name)?;
        Some(self.mangled_name_of(found, name))
    }

    /// `@`-joined path of `id`, using `name` as its last component.
    pub fn mangled_name_of(&self, id: ScopeId, name: &str) -> String {
        let mut parts = vec![name.to_string()];

        let mut cursor = self.scope(id).parent;
        while let Some(parent) = cursor {
            let scope = self.scope(parent);
            if !scope.is_anonymous() {
                if let Some(ty) = scope.ty.as_ref() {
                    parts.push(ty.id().to_string());
                }
            }
            cursor = scope.parent;
        }

        parts.reverse();
        parts.join(MANGLE_SEPARATOR)
    }

    /// Every scope carrying a type, in arena order.
    pub fn typed_scopes(&self) -> impl Iterator<Item = (ScopeId, &Type)> + '_ {
        self.scopes
            .iter()
            .enumerate()
            .filter_map(|(i, scope)| scope.ty.as_ref().map(|ty| (ScopeId(i), ty)))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the scope tree depth-first followed by the source filename.
    pub fn save<W: Write>(&self, writer: W) -> archive::Result<()> {
        let mut archive = ArchiveWriter::new(writer);
        self.save_scope(&mut archive, ScopeId::GLOBAL)?;
        archive.write_str(&self.source_filename)
    }

    fn save_scope<W: Write>(&self, archive: &mut ArchiveWriter<W>, id: ScopeId) -> archive::Result<()> {
        let scope = self.scope(id);

        archive.write_count(scope.nested.len())?;
        for child in &scope.nested {
            self.save_scope(archive, *child)?;
        }

        archive.write_count(scope.named.len())?;
        for (name, child) in &scope.named {
            archive.write_str(name)?;
            self.save_scope(archive, *child)?;
        }

        archive.write_count(scope.symbols.len())?;
        for symbol in &scope.symbols {
            archive.write_str(&symbol.name)?;
            archive.write_type(symbol.ty.as_ref())?;
        }

        archive.write_i32(if scope.index >= 0 {
            scope.index
        } else {
            NAMED_SCOPE_INDEX
        })?;
        archive.write_type(scope.ty.as_ref())
    }

    /// Read a table written by [`SymTable::save`]. The cursor starts at the
    /// global scope.
    pub fn load<R: Read>(reader: R) -> archive::Result<Self> {
        let mut archive = ArchiveReader::new(reader);
        let mut table = Self::new();

        table.load_scope(&mut archive, ScopeId::GLOBAL)?;
        table.source_filename = archive.read_string()?;
        Ok(table)
    }

    fn load_scope<R: Read>(&mut self, archive: &mut ArchiveReader<R>, id: ScopeId) -> archive::Result<()> {
        let nested_count = archive.read_count()?;
        for _ in 0..nested_count {
            let child = self.push_scope(id, 0);
            self.scopes[id.0].nested.push(child);
            self.load_scope(archive, child)?;
        }

        let named_count = archive.read_count()?;
        for _ in 0..named_count {
            let name = archive.read_string()?;
            let child = self.push_scope(id, -1);
            self.scopes[id.0].named.insert(name, child);
            self.load_scope(archive, child)?;
        }

        let symbol_count = archive.read_count()?;
        for _ in 0..symbol_count {
            let name = archive.read_string()?;
            let ty = archive.read_type()?;
            self.scopes[id.0].symbols.push(Symbol::new(name, ty));
        }

        let index = archive.read_i32()?;
        self.scopes[id.0].index = match index {
            NAMED_SCOPE_INDEX => -1,
            value if value >= 0 => value,
            value => return Err(ArchiveError::InvalidIndex(value)),
        };
        self.scopes[id.0].ty = archive.read_type()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> archive::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.save(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> archive::Result<Self> {
        Self::load(bytes)
    }
}

// ============================================================================
// JSON view
// ============================================================================

/// Borrowed view of one scope subtree used for serialization.
struct ScopeTree<'a> {
    table: &'a SymTable,
    id: ScopeId,
}

impl Serialize for ScopeTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let scope = self.table.scope(self.id);
        let mut state = serializer.serialize_struct("Scope", 5)?;
        state.serialize_field("index", &scope.index)?;
        state.serialize_field("type", &scope.ty)?;
        state.serialize_field("symbols", &scope.symbols)?;
        state.serialize_field(
            "nested",
            &scope
                .nested
                .iter()
                .map(|id| ScopeTree {
                    table: self.table,
                    id: *id,
                })
                .collect::<Vec<_>>(),
        )?;
        state.serialize_field(
            "named",
            &scope
                .named
                .iter()
                .map(|(name, id)| {
                    (
                        name.as_str(),
                        ScopeTree {
                            table: self.table,
                            id: *id,
                        },
                    )
                })
                .collect::<IndexMap<_, _>>(),
        )?;
        state.end()
    }
}

impl Serialize for SymTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SymTable", 2)?;
        state.serialize_field("source_filename", &self.source_filename)?;
        state.serialize_field(
            "global",
            &ScopeTree {
                table: self,
                id: ScopeId::GLOBAL,
            },
        )?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumType, TypeInfo};
    use pretty_assertions::assert_eq;

    fn namespace(id: &str) -> Type {
        Type::Namespace(TypeInfo::new(id, id))
    }

    #[test]
    fn test_create_anonymous_scopes_are_indexed() {
        let mut table = SymTable::new();
        let first = table.create_scope("").unwrap();
        table.exit_scope();
        let second = table.create_scope("").unwrap();
        table.exit_scope();

        assert_eq!(table.scope(first).index(), 0);
        assert_eq!(table.scope(second).index(), 1);
        assert_eq!(table.global_scope().nested(), &[first, second]);
        assert_eq!(table.current_scope_id(), ScopeId::GLOBAL);
    }

    #[test]
    fn test_create_duplicate_named_scope_fails() {
        let mut table = SymTable::new();
        table.create_scope("A").unwrap();
        table.exit_scope();

        assert_eq!(
            table.create_scope("A"),
            Err(SymTableError::DuplicateScope { name: "A".into() })
        );
        assert_eq!(table.current_scope_id(), ScopeId::GLOBAL);
        assert!(table.enter_scope("A").is_ok());
    }

    #[test]
    fn test_enter_missing_scope_fails() {
        let mut table = SymTable::new();
        assert_eq!(
            table.enter_scope("Missing"),
            Err(SymTableError::ScopeNotFound {
                name: "Missing".into()
            })
        );
        assert_eq!(
            table.enter_scope(""),
            Err(SymTableError::NoMoreAnonymousScopes { position: 0 })
        );
    }

    #[test]
    fn test_anonymous_scopes_are_revisited_in_order() {
        let mut table = SymTable::new();
        for name in ["a", "b", "c"] {
            table.create_scope("").unwrap();
            table.add_symbol(name, None);
            table.exit_scope();
        }

        for name in ["a", "b", "c"] {
            table.enter_scope("").unwrap();
            assert!(table.current_scope().symbols().iter().any(|s| s.name == name));
            table.exit_scope();
        }
        assert!(table.enter_scope("").is_err());
    }

    #[test]
    fn test_nested_named_reentry_restores_cursor() {
        let mut table = SymTable::new();
        table.create_scope("").unwrap();
        table.create_scope("Outer").unwrap();
        table.create_scope("Inner").unwrap();
        table.exit_scope();
        table.exit_scope();
        table.exit_scope();
        table.create_scope("").unwrap();
        table.add_symbol("second", None);
        table.exit_scope();

        table.enter_scope("").unwrap();
        table.enter_scope("Outer").unwrap();
        table.enter_scope("Inner").unwrap();
        table.exit_scope();
        table.exit_scope();
        table.exit_scope();

        table.enter_scope("").unwrap();
        assert_eq!(table.current_scope().symbols()[0].name, "second");
    }

    #[test]
    fn test_exit_global_scope_is_noop() {
        let mut table = SymTable::new();
        table.exit_scope();
        assert_eq!(table.current_scope_id(), ScopeId::GLOBAL);
    }

    #[test]
    fn test_add_symbol_updates_in_place() {
        let mut table = SymTable::new();
        table.add_symbol("x", None);
        table.add_symbol("y", None);
        table.add_symbol("x", Some(namespace("T")));

        let symbols = table.current_scope().symbols();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "x");
        assert_eq!(symbols[0].ty, Some(namespace("T")));

        assert!(table.remove_symbol("x").is_some());
        assert!(table.remove_symbol("x").is_none());
        assert_eq!(table.current_scope().symbols().len(), 1);
    }

    #[test]
    fn test_look_up_symbol_walks_ancestors_only() {
        let mut table = SymTable::new();
        table.add_symbol("global", None);
        table.create_scope("A").unwrap();
        table.add_symbol("in_a", None);
        table.exit_scope();
        table.create_scope("B").unwrap();

        assert!(table.look_up_symbol("global").is_some());
        assert!(table.look_up_symbol("in_a").is_none());
    }

    #[test]
    fn test_look_up_named_scope_nearest_first() {
        let mut table = SymTable::new();
        let outer_x = table.create_scope("X").unwrap();
        table.exit_scope();
        table.create_scope("A").unwrap();
        let inner_x = table.create_scope("X").unwrap();
        table.exit_scope();

        assert_eq!(table.look_up_named_scope("X"), Some(inner_x));
        table.exit_scope();
        assert_eq!(table.look_up_named_scope("X"), Some(outer_x));
        assert_eq!(table.look_up_named_scope("Y"), None);
    }

    #[test]
    fn test_mangled_name_skips_anonymous_scopes() {
        let mut table = SymTable::new();
        table.create_scope("Outer").unwrap();
        table.set_current_scope_type(namespace("Outer"));
        table.create_scope("").unwrap();
        table.create_scope("Inner").unwrap();
        table.set_current_scope_type(namespace("Inner"));
        table.create_scope("E").unwrap();
        table.exit_scope();

        assert_eq!(
            table.mangled_name_for_named_scope("E").as_deref(),
            Some("Outer@Inner@E")
        );
        assert_eq!(SymTable::qualified_name("Outer@Inner@E"), "Outer::Inner::E");
        assert_eq!(table.mangled_name_for_named_scope("Nope"), None);
    }

    #[test]
    fn test_parent_type_and_reachability() {
        let mut table = SymTable::new();
        table.create_scope("ns").unwrap();
        table.set_current_scope_type(namespace("ns"));
        let e = table.create_scope("E").unwrap();
        table.exit_scope();
        table.create_scope("").unwrap();
        let hidden = table.create_scope("H").unwrap();

        assert_eq!(table.parent_type_of(e).map(|t| t.id()), Some("ns"));
        assert!(table.is_reachable_by_name(e));
        assert!(!table.is_reachable_by_name(hidden));
        assert_eq!(table.parent_type_of(hidden).map(|t| t.id()), Some("ns"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut table = SymTable::with_source_filename("include/a.h");
        table.create_scope("ns").unwrap();
        table.set_current_scope_type(namespace("ns"));
        table.create_scope("").unwrap();
        table.add_symbol("local", None);
        table.exit_scope();
        table.create_scope("E").unwrap();
        let mut ty = EnumType::new("E", "ns@E");
        ty.enumerators = vec!["A".into(), "B".into()];
        table.set_current_scope_type(Type::Enum(ty));
        table.add_symbol("typed", Some(namespace("T")));

        let bytes = table.to_bytes().unwrap();
        let loaded = SymTable::from_bytes(&bytes).unwrap();

        assert_eq!(loaded, table);
        assert_eq!(loaded.source_filename(), "include/a.h");
        assert_eq!(loaded.current_scope_id(), ScopeId::GLOBAL);
        assert_eq!(loaded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_json_view_has_tree_shape() {
        let mut table = SymTable::with_source_filename("a.h");
        table.create_scope("ns").unwrap();
        table.set_current_scope_type(namespace("ns"));

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["source_filename"], "a.h");
        assert_eq!(value["global"]["named"]["ns"]["type"]["kind"], "namespace");
        assert_eq!(value["global"]["named"]["ns"]["index"], -1);
    }
}
