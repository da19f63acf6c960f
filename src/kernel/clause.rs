use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::atom::AtomId;
use crate::kernel::literal::Literal;

/// A clause is a disjunction (an "or") of literals, universally quantified over its variables.
/// The literal order is preserved as given.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Clause {
    pub literals: Vec<Literal>,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "<empty>");
        }
        for (i, literal) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            write!(f, "{}", literal)?;
        }
        Ok(())
    }
}

impl Clause {
    pub fn new(literals: Vec<Literal>) -> Clause {
        Clause { literals }
    }

    pub fn empty() -> Clause {
        Clause { literals: vec![] }
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    pub fn num_variables(&self) -> usize {
        self.literals
            .iter()
            .flat_map(|lit| lit.iter_vars())
            .max()
            .map_or(0, |max| max as usize + 1)
    }

    /// The distinct variables of the clause, in order of first occurrence.
    pub fn variables(&self) -> Vec<AtomId> {
        let mut answer: Vec<AtomId> = vec![];
        for var in self.literals.iter().flat_map(|lit| lit.iter_vars()) {
            if !answer.contains(&var) {
                answer.push(var);
            }
        }
        answer
    }

    /// Returns a copy of this clause without the literal at the given index.
    pub fn remove_literal(&self, index: usize) -> Clause {
        let literals = self
            .literals
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, lit)| lit.clone())
            .collect();
        Clause { literals }
    }
}
