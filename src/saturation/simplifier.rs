use tracing::trace;

use super::subsumption_index::ClauseSubsumptionIndex;
use crate::code_tree::{ClauseId, CodeTreeError};
use crate::kernel::clause::Clause;

/// What forward simplification did with a new clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Simplification {
    /// A stored clause subsumes the new one, so it is redundant.
    Subsumed { by: ClauseId },

    /// Subsumption resolution with a stored clause removes one literal.
    /// The clause is what remains.
    Resolved {
        by: ClauseId,
        literal: usize,
        clause: Clause,
    },

    /// Nothing applies.
    Kept,
}

/// Applies forward subsumption, and optionally subsumption resolution, to new clauses using
/// the clauses in an index.
pub struct ForwardSimplifier<I: ClauseSubsumptionIndex> {
    index: I,
    subsumption_resolution: bool,
}

impl<I: ClauseSubsumptionIndex> ForwardSimplifier<I> {
    pub fn new(index: I, subsumption_resolution: bool) -> ForwardSimplifier<I> {
        ForwardSimplifier {
            index,
            subsumption_resolution,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut I {
        &mut self.index
    }

    pub fn add(&mut self, clause: &Clause, id: ClauseId) -> Result<(), CodeTreeError> {
        self.index.handle_clause(clause, id, true)
    }

    pub fn remove(&mut self, clause: &Clause, id: ClauseId) -> Result<(), CodeTreeError> {
        self.index.handle_clause(clause, id, false)
    }

    /// One simplification step.
    pub fn simplify(&mut self, clause: &Clause) -> Simplification {
        let matches = self
            .index
            .subsuming_or_resolving(clause, self.subsumption_resolution);
        if let Some(m) = matches.iter().find(|m| m.resolved_literal.is_none()) {
            return Simplification::Subsumed { by: m.clause };
        }
        for m in &matches {
            if let Some(literal) = m.resolved_literal {
                return Simplification::Resolved {
                    by: m.clause,
                    literal,
                    clause: clause.remove_literal(literal),
                };
            }
        }
        Simplification::Kept
    }

    /// Simplifies until nothing more applies.
    /// Returns None if the clause turns out to be redundant, and the simplified clause otherwise,
    /// along with the ids of the clauses used to resolve literals away.
    pub fn simplify_fully(&mut self, clause: &Clause) -> Option<(Clause, Vec<ClauseId>)> {
        let mut current = clause.clone();
        let mut used = vec![];
        loop {
            match self.simplify(&current) {
                Simplification::Subsumed { by } => {
                    trace!(clause = %clause, by = %by, "clause is subsumed");
                    return None;
                }
                Simplification::Resolved { by, literal, clause } => {
                    trace!(clause = %clause, by = %by, literal, "resolved away a literal");
                    used.push(by);
                    current = clause;
                }
                Simplification::Kept => return Some((current, used)),
            }
        }
    }
}
