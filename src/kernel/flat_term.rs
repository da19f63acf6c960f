// The flattened term tape.
//
// A term or literal is laid out in prefix order, one entry per atom. Every functor entry
// records the span of its subtree, so a subterm can be skipped in constant time.
// For f(x0, g(a)) the tape is:
//
//   [f span=4] [x0] [g span=2] [a span=1]
//
// A literal starts with a header entry that encodes both its predicate and its sign,
// followed by the flattened arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::atom::{Atom, AtomId};
use crate::kernel::literal::Literal;
use crate::kernel::symbol::Symbol;
use crate::kernel::term::Term;

/// What a functor entry on the tape holds.
/// Inside terms this is the symbol id. In the header position of a literal it is
/// 2 * predicate + sign, so that complementary literals differ only in the low bit.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Functor(pub u32);

impl Functor {
    pub fn symbol(symbol: Symbol) -> Functor {
        Functor(symbol.0)
    }

    pub fn header(predicate: Symbol, positive: bool) -> Functor {
        Functor(2 * predicate.0 + positive as u32)
    }

    /// The header of the complementary literal.
    pub fn opposite_header(&self) -> Functor {
        Functor(self.0 ^ 1)
    }

    pub fn header_predicate(&self) -> Symbol {
        Symbol(self.0 >> 1)
    }

    pub fn header_is_positive(&self) -> bool {
        self.0 & 1 == 1
    }
}

impl fmt::Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum FlatEntry {
    /// A symbol application, or a literal header.
    /// The span counts this entry plus all entries of its arguments.
    Functor { functor: Functor, span: u32 },

    /// A variable of the flattened clause.
    Variable(AtomId),
}

impl FlatEntry {
    pub fn span(&self) -> usize {
        match self {
            FlatEntry::Functor { span, .. } => *span as usize,
            FlatEntry::Variable(_) => 1,
        }
    }
}

/// A term or literal in flattened form.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct FlatTerm {
    entries: Vec<FlatEntry>,
}

fn flatten_into(term: &Term, entries: &mut Vec<FlatEntry>) {
    match term.get_head_atom() {
        Atom::Variable(i) => entries.push(FlatEntry::Variable(*i)),
        Atom::Symbol(s) => {
            let start = entries.len();
            entries.push(FlatEntry::Functor {
                functor: Functor::symbol(*s),
                span: 0,
            });
            for arg in term.iter_args() {
                flatten_into(arg, entries);
            }
            let span = (entries.len() - start) as u32;
            if let FlatEntry::Functor { span: s, .. } = &mut entries[start] {
                *s = span;
            }
        }
    }
}

impl FlatTerm {
    pub fn from_term(term: &Term) -> FlatTerm {
        let mut entries = Vec::with_capacity(term.weight());
        flatten_into(term, &mut entries);
        FlatTerm { entries }
    }

    pub fn from_literal(literal: &Literal) -> FlatTerm {
        let mut entries = Vec::with_capacity(literal.atom.weight());
        entries.push(FlatEntry::Functor {
            functor: Functor::header(literal.predicate(), literal.positive),
            span: 0,
        });
        for arg in literal.args() {
            flatten_into(arg, &mut entries);
        }
        let span = entries.len() as u32;
        if let FlatEntry::Functor { span: s, .. } = &mut entries[0] {
            *s = span;
        }
        FlatTerm { entries }
    }

    pub fn entries(&self) -> &[FlatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: usize) -> &FlatEntry {
        &self.entries[pos]
    }

    /// The number of entries of the subterm starting at pos.
    pub fn span_at(&self, pos: usize) -> usize {
        self.entries[pos].span()
    }

    /// The subterm starting at pos, as a slice of the tape.
    pub fn subterm_at(&self, pos: usize) -> &[FlatEntry] {
        &self.entries[pos..pos + self.span_at(pos)]
    }

    /// Whether this tape is a literal whose header is the equality predicate.
    pub fn is_equality_literal(&self) -> bool {
        match self.entries.first() {
            Some(FlatEntry::Functor { functor, .. }) => {
                functor.header_predicate().is_equality()
            }
            _ => false,
        }
    }

    /// The flattened complement of a literal: same arguments, opposite sign.
    pub fn opposite(&self) -> FlatTerm {
        let mut entries = self.entries.clone();
        if let Some(FlatEntry::Functor { functor, .. }) = entries.first_mut() {
            *functor = functor.opposite_header();
        }
        FlatTerm { entries }
    }

    /// For a flattened equality, the same literal with its two sides swapped.
    pub fn reversed(&self) -> FlatTerm {
        debug_assert!(self.is_equality_literal());
        let left_start = 1;
        let right_start = left_start + self.span_at(left_start);
        let mut entries = Vec::with_capacity(self.entries.len());
        entries.push(self.entries[0]);
        entries.extend_from_slice(self.subterm_at(right_start));
        entries.extend_from_slice(self.subterm_at(left_start));
        FlatTerm { entries }
    }

    /// Rebuilds the owned term whose flattened form starts at pos.
    /// The position must not be a literal header.
    pub fn to_term(&self, pos: usize) -> Term {
        term_from_entries(self.subterm_at(pos))
    }
}

/// Rebuilds a term from a slice holding exactly one flattened term.
pub fn term_from_entries(entries: &[FlatEntry]) -> Term {
    match entries[0] {
        FlatEntry::Variable(i) => Term::var(i),
        FlatEntry::Functor { functor, span } => {
            let mut args = vec![];
            let mut pos = 1;
            while pos < span as usize {
                let arg_span = entries[pos].span();
                args.push(term_from_entries(&entries[pos..pos + arg_span]));
                pos += arg_span;
            }
            Term::apply(Symbol(functor.0), args)
        }
    }
}

impl fmt::Display for FlatTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match entry {
                FlatEntry::Functor { functor, span } => write!(f, "{}/{}", functor, span)?,
                FlatEntry::Variable(v) => write!(f, "x{}", v)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::symbol_table::SymbolTable;

    #[test]
    fn test_flatten_spans() {
        let mut table = SymbolTable::new();
        let lit = table.make_literal("p(f(x0, g(a)), x1)");
        let flat = FlatTerm::from_literal(&lit);
        assert_eq!(flat.len(), 6);
        assert_eq!(flat.span_at(0), 6);
        assert_eq!(flat.span_at(1), 4);
        assert_eq!(flat.span_at(2), 1);
        assert_eq!(flat.span_at(3), 2);
        assert_eq!(flat.span_at(5), 1);
        assert_eq!(*flat.get(5), FlatEntry::Variable(1));
    }

    #[test]
    fn test_to_term_rebuilds_subterms() {
        let mut table = SymbolTable::new();
        let lit = table.make_literal("p(f(x0, g(a)), x1)");
        let flat = FlatTerm::from_literal(&lit);
        assert_eq!(flat.to_term(1), lit.args()[0]);
        assert_eq!(flat.to_term(5), lit.args()[1]);
    }

    #[test]
    fn test_opposite_flips_only_the_header() {
        let mut table = SymbolTable::new();
        let lit = table.make_literal("p(a)");
        let flat = FlatTerm::from_literal(&lit);
        let opposite = flat.opposite();
        assert_eq!(opposite, FlatTerm::from_literal(&lit.negate()));
        assert_eq!(opposite.opposite(), flat);
    }

    #[test]
    fn test_reversed_equality() {
        let mut table = SymbolTable::new();
        let lit = table.make_literal("f(x0) = g(a, x1)");
        let flat = FlatTerm::from_literal(&lit);
        assert!(flat.is_equality_literal());
        assert_eq!(flat.reversed(), FlatTerm::from_literal(&lit.reversed()));
    }

    #[test]
    fn test_header_encoding() {
        let header = Functor::header(Symbol(7), false);
        assert_eq!(header.header_predicate(), Symbol(7));
        assert!(!header.header_is_positive());
        assert!(header.opposite_header().header_is_positive());
    }
}
