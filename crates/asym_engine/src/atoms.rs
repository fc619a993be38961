//! Interned atoms: the indivisible factors of a monomial.

use crate::normal::NormalForm;
use num_bigint::BigInt;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u32);

impl AtomId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        AtomId(index as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    Variable(String),
    Pi,
    E,
    /// Integer base `> 1` carried with an exponent in `(0, 1)`.
    Radical(BigInt),
    Log(NormalForm),
    Exp(NormalForm),
    /// Primitive multi-term sum carried with an exponent in `(0, 1)`.
    Root(NormalForm),
    // The four below only wrap varying arguments; constants are evaluated.
    Factorial(NormalForm),
    Floor(NormalForm),
    Ceil(NormalForm),
    Abs(NormalForm),
}

impl Atom {
    /// Atoms whose exponent is reduced into `[0, 1)` with the integer part
    /// multiplied back out.
    pub fn is_fractional_only(&self) -> bool {
        matches!(self, Atom::Radical(_) | Atom::Root(_))
    }
}

#[derive(Debug, Clone)]
pub struct AtomEntry {
    pub atom: Atom,
    /// Whether the atom varies with a variable.
    pub varies: bool,
    /// Numeric value of a constant atom.
    pub approx: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    entries: Vec<AtomEntry>,
    lookup: FxHashMap<Atom, AtomId>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, atom: &Atom) -> Option<AtomId> {
        self.lookup.get(atom).copied()
    }

    /// Store a new atom. Callers check [`AtomTable::find`] first.
    pub(crate) fn insert(&mut self, entry: AtomEntry) -> AtomId {
        let id = AtomId::from_index(self.entries.len());
        self.lookup.insert(entry.atom.clone(), id);
        self.entries.push(entry);
        id
    }

    /// # Panics
    /// Panics if `id` belongs to another table.
    #[inline]
    pub fn get(&self, id: AtomId) -> &AtomEntry {
        &self.entries[id.index()]
    }

    #[inline]
    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.get(id).atom
    }

    #[inline]
    pub fn varies(&self, id: AtomId) -> bool {
        self.get(id).varies
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
