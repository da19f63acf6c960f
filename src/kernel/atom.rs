use std::fmt;

use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

pub type AtomId = u16;

/// An atomic value does not have any internal structure.
/// Terms are built by applying symbol atoms to arguments.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Atom {
    // A universally quantified variable of the clause it appears in.
    // Variables in different clauses are unrelated, even when they share an id.
    Variable(AtomId),

    // A function or predicate symbol.
    Symbol(Symbol),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Atom::Variable(i) => write!(f, "x{}", i),
            Atom::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl Atom {
    pub fn is_variable(&self) -> bool {
        matches!(self, Atom::Variable(_))
    }

    pub fn as_variable(&self) -> Option<AtomId> {
        match self {
            Atom::Variable(i) => Some(*i),
            Atom::Symbol(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Atom::Variable(_) => None,
            Atom::Symbol(s) => Some(*s),
        }
    }

    /// Parses a variable in the "x<N>" syntax.
    pub fn parse_variable(s: &str) -> Option<Atom> {
        let rest = s.trim().strip_prefix('x')?;
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Atom::Variable(rest.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        assert_eq!(Atom::parse_variable("x0"), Some(Atom::Variable(0)));
        assert_eq!(Atom::parse_variable(" x12 "), Some(Atom::Variable(12)));
        assert_eq!(Atom::parse_variable("x"), None);
        assert_eq!(Atom::parse_variable("xy"), None);
        assert_eq!(Atom::parse_variable("f"), None);
    }

    #[test]
    fn test_atom_display() {
        assert_eq!(Atom::Variable(3).to_string(), "x3");
        assert_eq!(Atom::Symbol(Symbol(4)).to_string(), "s4");
        assert_eq!(Atom::Symbol(Symbol::EQUALITY).to_string(), "=");
    }
}
