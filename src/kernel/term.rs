use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::atom::{Atom, AtomId};
use crate::kernel::symbol::Symbol;

/// A Term is an atom applied to arguments.
/// A term with no args is a plain atom. Variables never have args.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Term {
    head: Atom,
    args: Vec<Term>,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Term {
    pub fn new(head: Atom, args: Vec<Term>) -> Term {
        debug_assert!(
            !head.is_variable() || args.is_empty(),
            "variables cannot be applied to arguments"
        );
        Term { head, args }
    }

    pub fn var(id: AtomId) -> Term {
        Term {
            head: Atom::Variable(id),
            args: vec![],
        }
    }

    pub fn constant(symbol: Symbol) -> Term {
        Term {
            head: Atom::Symbol(symbol),
            args: vec![],
        }
    }

    pub fn apply(symbol: Symbol, args: Vec<Term>) -> Term {
        Term {
            head: Atom::Symbol(symbol),
            args,
        }
    }

    pub fn get_head_atom(&self) -> &Atom {
        &self.head
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn iter_args(&self) -> impl Iterator<Item = &Term> {
        self.args.iter()
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    pub fn is_variable(&self) -> bool {
        self.head.is_variable()
    }

    /// If this term is a bare variable, return its id.
    pub fn atomic_variable(&self) -> Option<AtomId> {
        self.head.as_variable()
    }

    /// Iterates over the variable occurrences of the term, in prefix order.
    /// A variable that occurs twice is reported twice.
    pub fn iter_vars(&self) -> Box<dyn Iterator<Item = AtomId> + '_> {
        Box::new(
            self.head
                .as_variable()
                .into_iter()
                .chain(self.args.iter().flat_map(|arg| arg.iter_vars())),
        )
    }

    pub fn has_any_variable(&self) -> bool {
        self.head.is_variable() || self.args.iter().any(|arg| arg.has_any_variable())
    }

    pub fn max_variable(&self) -> Option<AtomId> {
        self.iter_vars().max()
    }

    /// The number of atoms in the term.
    pub fn weight(&self) -> usize {
        1 + self.args.iter().map(|arg| arg.weight()).sum::<usize>()
    }

    /// The number of symbol atoms in the term.
    pub fn symbol_count(&self) -> usize {
        let own = if self.head.is_variable() { 0 } else { 1 };
        own + self.args.iter().map(|arg| arg.symbol_count()).sum::<usize>()
    }
}
