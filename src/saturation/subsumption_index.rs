use std::collections::BTreeMap;

use crate::code_tree::{ClauseId, CodeTree, CodeTreeError, SubsumptionMatch};
use crate::kernel::clause::Clause;
use crate::kernel::subsumption::find_subsumption;

/// An index of clauses that answers forward subsumption and subsumption resolution queries.
pub trait ClauseSubsumptionIndex {
    /// Adds the clause to the index, or removes it.
    fn handle_clause(
        &mut self,
        clause: &Clause,
        id: ClauseId,
        adding: bool,
    ) -> Result<(), CodeTreeError>;

    /// Every stored clause that subsumes the query, or, with subsumption_resolution, resolves
    /// away one of its literals. Each stored clause appears at most once, and plain
    /// subsumption is reported in preference to resolution.
    fn subsuming_or_resolving(
        &mut self,
        clause: &Clause,
        subsumption_resolution: bool,
    ) -> Vec<SubsumptionMatch>;
}

impl ClauseSubsumptionIndex for CodeTree {
    fn handle_clause(
        &mut self,
        clause: &Clause,
        id: ClauseId,
        adding: bool,
    ) -> Result<(), CodeTreeError> {
        if adding {
            self.insert(clause, id);
            Ok(())
        } else {
            self.remove(clause, id)
        }
    }

    fn subsuming_or_resolving(
        &mut self,
        clause: &Clause,
        subsumption_resolution: bool,
    ) -> Vec<SubsumptionMatch> {
        self.query(clause, subsumption_resolution).collect()
    }
}

/// Checks the query against every stored clause in turn.
/// Slow, but simple enough to compare the code tree against.
#[derive(Clone, Debug, Default)]
pub struct LinearSubsumptionIndex {
    clauses: BTreeMap<ClauseId, Clause>,
}

impl LinearSubsumptionIndex {
    pub fn new() -> LinearSubsumptionIndex {
        LinearSubsumptionIndex::default()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn check(
        id: ClauseId,
        general: &Clause,
        query: &Clause,
        subsumption_resolution: bool,
    ) -> Option<SubsumptionMatch> {
        if let Some((literal_map, substitution)) = find_subsumption(general, query, None) {
            return Some(SubsumptionMatch {
                clause: id,
                resolved_literal: None,
                literal_map,
                substitution,
            });
        }
        if !subsumption_resolution {
            return None;
        }
        (0..query.len()).find_map(|k| {
            find_subsumption(general, query, Some(k)).map(|(literal_map, substitution)| {
                SubsumptionMatch {
                    clause: id,
                    resolved_literal: Some(k),
                    literal_map,
                    substitution,
                }
            })
        })
    }
}

impl ClauseSubsumptionIndex for LinearSubsumptionIndex {
    fn handle_clause(
        &mut self,
        clause: &Clause,
        id: ClauseId,
        adding: bool,
    ) -> Result<(), CodeTreeError> {
        if adding {
            self.clauses.entry(id).or_insert_with(|| clause.clone());
            return Ok(());
        }
        match self.clauses.remove(&id) {
            Some(_) => Ok(()),
            None => Err(CodeTreeError::NotFound(id)),
        }
    }

    fn subsuming_or_resolving(
        &mut self,
        clause: &Clause,
        subsumption_resolution: bool,
    ) -> Vec<SubsumptionMatch> {
        self.clauses
            .iter()
            .filter_map(|(id, general)| Self::check(*id, general, clause, subsumption_resolution))
            .collect()
    }
}
