use crate::kernel::atom::{Atom, AtomId};
use crate::kernel::clause::Clause;
use crate::kernel::literal::Literal;
use crate::kernel::term::Term;
use std::fmt;

// A VariableMap maintains a mapping from variables to terms, allowing us to turn a more general term
// into a more specific one by substituting variables.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct VariableMap {
    map: Vec<Option<Term>>,
}

impl VariableMap {
    pub fn new() -> VariableMap {
        VariableMap { map: Vec::new() }
    }

    pub fn get_mapping(&self, i: AtomId) -> Option<&Term> {
        let i = i as usize;
        if i >= self.map.len() {
            None
        } else {
            self.map[i].as_ref()
        }
    }

    pub fn match_var(&mut self, var_id: AtomId, special_term: &Term) -> bool {
        let var_id = var_id as usize;
        if var_id >= self.map.len() {
            self.map.resize(var_id + 1, None);
        }
        match &self.map[var_id] {
            None => {
                self.map[var_id] = Some(special_term.clone());
                true
            }
            Some(general_term) => general_term == special_term,
        }
    }

    /// Extends the map so that general, once specialized, equals special.
    /// On failure the map may hold partial bindings, so callers that backtrack should clone first.
    pub fn match_terms(&mut self, general: &Term, special: &Term) -> bool {
        // Handle the case where a general variable is being mapped to the whole term
        if let Some(i) = general.atomic_variable() {
            return self.match_var(i, special);
        }
        if general.get_head_atom() != special.get_head_atom() {
            return false;
        }
        if general.num_args() != special.num_args() {
            return false;
        }
        for (g, s) in general.iter_args().zip(special.iter_args()) {
            if !self.match_terms(g, s) {
                return false;
            }
        }
        true
    }

    /// Matches the literals argument by argument. Signs and predicates must agree.
    pub fn match_literals(&mut self, general: &Literal, special: &Literal) -> bool {
        general.positive == special.positive && self.match_terms(&general.atom, &special.atom)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.iter().all(|opt| opt.is_none())
    }

    pub fn set(&mut self, i: AtomId, term: Term) {
        let i = i as usize;
        if i >= self.map.len() {
            self.map.resize(i + 1, None);
        }
        self.map[i] = Some(term);
    }

    pub fn has_mapping(&self, i: AtomId) -> bool {
        let i = i as usize;
        i < self.map.len() && self.map[i].is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Term)> {
        self.map
            .iter()
            .enumerate()
            .filter_map(|(i, opt)| opt.as_ref().map(|term| (i, term)))
    }

    /// Unmapped variables are kept as-is.
    pub fn specialize_term(&self, term: &Term) -> Term {
        match term.get_head_atom() {
            Atom::Variable(i) => match self.get_mapping(*i) {
                Some(replacement) => replacement.clone(),
                None => term.clone(),
            },
            head => Term::new(
                *head,
                term.iter_args().map(|arg| self.specialize_term(arg)).collect(),
            ),
        }
    }

    /// Unmapped variables are kept as-is.
    pub fn specialize_literal(&self, literal: &Literal) -> Literal {
        Literal::new(literal.positive, self.specialize_term(&literal.atom))
    }

    /// Unmapped variables are kept as-is.
    pub fn specialize_clause(&self, clause: &Clause) -> Clause {
        let literals = clause
            .literals
            .iter()
            .map(|lit| self.specialize_literal(lit))
            .collect();
        Clause { literals }
    }

    pub fn output_has_any_variable(&self) -> bool {
        self.map
            .iter()
            .flatten()
            .any(|term| term.has_any_variable())
    }
}

impl fmt::Display for VariableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for (i, term) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "x{} -> {}", i, term)?;
            first = false;
        }
        write!(f, ")")
    }
}
