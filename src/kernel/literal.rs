use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::atom::{Atom, AtomId};
use crate::kernel::symbol::Symbol;
use crate::kernel::term::Term;

/// A literal is a predicate applied to arguments, possibly negated.
/// Equalities are literals whose predicate is Symbol::EQUALITY.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Literal {
    pub positive: bool,

    /// The head of the atom is always a predicate symbol.
    pub atom: Term,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_equality() {
            let op = if self.positive { "=" } else { "!=" };
            write!(f, "{} {} {}", self.atom.args()[0], op, self.atom.args()[1])
        } else if self.positive {
            write!(f, "{}", self.atom)
        } else {
            write!(f, "not {}", self.atom)
        }
    }
}

impl Literal {
    pub fn new(positive: bool, atom: Term) -> Literal {
        debug_assert!(
            !atom.get_head_atom().is_variable(),
            "literal atoms must be headed by a predicate"
        );
        Literal { positive, atom }
    }

    pub fn positive(atom: Term) -> Literal {
        Literal::new(true, atom)
    }

    pub fn negative(atom: Term) -> Literal {
        Literal::new(false, atom)
    }

    pub fn equals(left: Term, right: Term) -> Literal {
        Literal::new(true, Term::apply(Symbol::EQUALITY, vec![left, right]))
    }

    pub fn not_equals(left: Term, right: Term) -> Literal {
        Literal::new(false, Term::apply(Symbol::EQUALITY, vec![left, right]))
    }

    pub fn predicate(&self) -> Symbol {
        match self.atom.get_head_atom() {
            Atom::Symbol(s) => *s,
            Atom::Variable(i) => panic!("literal headed by variable x{}", i),
        }
    }

    pub fn args(&self) -> &[Term] {
        self.atom.args()
    }

    pub fn is_equality(&self) -> bool {
        matches!(self.atom.get_head_atom(), Atom::Symbol(s) if s.is_equality())
            && self.atom.num_args() == 2
    }

    pub fn negate(&self) -> Literal {
        Literal {
            positive: !self.positive,
            atom: self.atom.clone(),
        }
    }

    /// For an equality, swaps the two sides. Other literals are returned unchanged.
    pub fn reversed(&self) -> Literal {
        if !self.is_equality() {
            return self.clone();
        }
        let args = self.atom.args();
        Literal {
            positive: self.positive,
            atom: Term::apply(Symbol::EQUALITY, vec![args[1].clone(), args[0].clone()]),
        }
    }

    pub fn iter_vars(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.atom.iter_vars()
    }

    pub fn has_any_variable(&self) -> bool {
        self.atom.has_any_variable()
    }

    /// The number of symbols, counting the predicate.
    pub fn symbol_count(&self) -> usize {
        self.atom.symbol_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_display() {
        let p = Term::apply(Symbol(1), vec![Term::var(0)]);
        assert_eq!(Literal::positive(p.clone()).to_string(), "s1(x0)");
        assert_eq!(Literal::negative(p).to_string(), "not s1(x0)");
        let eq = Literal::not_equals(Term::var(0), Term::constant(Symbol(2)));
        assert_eq!(eq.to_string(), "x0 != s2");
    }

    #[test]
    fn test_reversed_equality() {
        let eq = Literal::equals(Term::var(0), Term::constant(Symbol(2)));
        let rev = eq.reversed();
        assert_eq!(rev.to_string(), "s2 = x0");
        assert_eq!(rev.reversed(), eq);
        assert!(rev.is_equality());
    }

    #[test]
    fn test_reversed_non_equality_is_identity() {
        let lit = Literal::positive(Term::apply(Symbol(1), vec![Term::var(0), Term::var(1)]));
        assert_eq!(lit.reversed(), lit);
        assert_eq!(lit.negate().negate(), lit);
    }
}
