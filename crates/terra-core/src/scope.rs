//! Scope chain and symbol table.
//!
//! Every scope is a fixed-size hash table of symbol chains plus a link to
//! its enclosing scope. Scopes and symbols are stored in the table's own
//! slabs and are never removed, so a block's scope stays reachable from the
//! AST after parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arena::NodeId;
use crate::intern::{Interner, Name};

/// Default number of buckets per scope.
pub const DEFAULT_BUCKETS: usize = 32;

/// Primitive type names seeded into the global scope.
pub const BUILTIN_TYPES: [&str; 10] = [
    "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "bool", "void",
];

/// djb2 string hash (`hash * 33 + c`, seed 5381).
pub fn djb2(bytes: &[u8]) -> usize {
    bytes.iter().fold(5381usize, |hash, &b| {
        (hash << 5).wrapping_add(hash).wrapping_add(usize::from(b))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
    Parameter,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Type => "type",
            SymbolKind::Parameter => "parameter",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    /// Declaring node; `None` for built-ins and not-yet-defined functions.
    pub decl: Option<NodeId>,
    next: Option<SymbolId>,
}

#[derive(Debug, Clone)]
struct Scope {
    buckets: Box<[Option<SymbolId>]>,
    parent: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    bucket_count: usize,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::with_bucket_count(DEFAULT_BUCKETS)
    }

    pub fn with_bucket_count(bucket_count: usize) -> Self {
        Self {
            scopes: Vec::new(),
            symbols: Vec::new(),
            bucket_count: bucket_count.max(1),
        }
    }

    /// Create an empty scope enclosed by `parent` (`None` for the global scope).
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            buckets: vec![None; self.bucket_count].into_boxed_slice(),
            parent,
        });
        id
    }

    fn bucket(&self, scope: ScopeId, interner: &Interner, name: Name) -> usize {
        djb2(interner.resolve(name).as_bytes()) % self.scopes[scope.index()].buckets.len()
    }

    /// Insert a symbol at the head of its bucket chain.
    ///
    /// Existing entries are not checked; use [`ScopeTable::lookup_current`]
    /// first when redeclarations must be detected.
    pub fn define(
        &mut self,
        interner: &Interner,
        scope: ScopeId,
        name: Name,
        kind: SymbolKind,
        decl: Option<NodeId>,
    ) -> SymbolId {
        let bucket = self.bucket(scope, interner, name);
        let id = SymbolId(self.symbols.len() as u32);
        let head = &mut self.scopes[scope.index()].buckets[bucket];
        self.symbols.push(Symbol {
            name,
            kind,
            decl,
            next: *head,
        });
        *head = Some(id);
        id
    }

    fn find_in(&self, interner: &Interner, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let bucket = self.bucket(scope, interner, name);
        let mut cursor = self.scopes[scope.index()].buckets[bucket];
        while let Some(id) = cursor {
            let symbol = &self.symbols[id.index()];
            if symbol.name == name {
                return Some(id);
            }
            cursor = symbol.next;
        }
        None
    }

    /// Resolve `name` starting at `scope` and walking outward.
    pub fn lookup(&self, interner: &Interner, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(id) = self.find_in(interner, scope, name) {
                return Some(id);
            }
            current = self.scopes[scope.index()].parent;
        }
        None
    }

    /// Resolve `name` in `scope` only.
    pub fn lookup_current(
        &self,
        interner: &Interner,
        scope: ScopeId,
        name: Name,
    ) -> Option<SymbolId> {
        self.find_in(interner, scope, name)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Attach the declaring node to a forward-declared symbol.
    pub fn set_decl(&mut self, id: SymbolId, decl: NodeId) {
        self.symbols[id.index()].decl = Some(decl);
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    /// Symbols defined directly in `scope`, in bucket order, newest first
    /// within a bucket.
    pub fn symbols_in(&self, scope: ScopeId) -> Vec<SymbolId> {
        let mut found = Vec::new();
        for head in self.scopes[scope.index()].buckets.iter() {
            let mut cursor = *head;
            while let Some(id) = cursor {
                found.push(id);
                cursor = self.symbols[id.index()].next;
            }
        }
        found
    }

    /// Register the built-in primitive type names in `scope`.
    ///
    /// They are plain variable symbols without a declaring node.
    pub fn seed_builtins(&mut self, interner: &mut Interner, scope: ScopeId) {
        for builtin in BUILTIN_TYPES {
            let name = interner.intern(builtin);
            self.define(interner, scope, name, SymbolKind::Variable, None);
        }
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Scope ids in creation order.
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len() as u32).map(ScopeId)
    }
}
