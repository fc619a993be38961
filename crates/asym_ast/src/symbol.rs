//! Symbol interning for variable and function names.
//!
//! Every name is stored once and referenced by [`SymbolId`], so comparing two
//! variables or two function heads is an integer comparison.

use rustc_hash::FxHashMap;

/// Identifier of an interned name. Indexes directly into the table.
pub type SymbolId = usize;

/// Interning table owned by a [`crate::Context`].
///
/// Not thread-safe; each classification owns its own context.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: Vec<String>,
    lookup: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing id when already present.
    pub fn intern(&mut self, s: &str) -> SymbolId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len();
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    /// Resolve an id back to its name.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this table.
    #[inline]
    pub fn resolve(&self, id: SymbolId) -> &str {
        &self.strings[id]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
