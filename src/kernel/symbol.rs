use std::fmt;

use serde::{Deserialize, Serialize};

/// A Symbol names a function or a predicate.
/// The arity of a symbol is fixed, and tracked by the SymbolTable.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Symbol(pub u32);

impl Symbol {
    /// The equality predicate. Every SymbolTable reserves it as "=" with arity 2.
    pub const EQUALITY: Symbol = Symbol(0);

    pub fn id(&self) -> u32 {
        self.0
    }

    pub fn is_equality(&self) -> bool {
        *self == Symbol::EQUALITY
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_equality() {
            write!(f, "=")
        } else {
            write!(f, "s{}", self.0)
        }
    }
}
