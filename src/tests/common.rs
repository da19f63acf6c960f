use crate::code_tree::{ClauseId, CodeTree, CodeTreeConfig, SubsumptionMatch};
use crate::kernel::clause::Clause;
use crate::kernel::symbol_table::SymbolTable;

/// Builds a tree holding the given clauses, with ids in order.
pub fn tree_with(table: &mut SymbolTable, config: CodeTreeConfig, clauses: &[&str]) -> CodeTree {
    let mut tree = CodeTree::with_config(config);
    for (i, text) in clauses.iter().enumerate() {
        let clause = table.make_clause(text);
        tree.insert(&clause, ClauseId(i));
    }
    tree
}

/// The sorted ids of every stored clause that matches the query.
pub fn matching_ids(tree: &mut CodeTree, query: &Clause, subsumption_resolution: bool) -> Vec<usize> {
    let mut answer: Vec<usize> = tree
        .query(query, subsumption_resolution)
        .map(|m| m.clause.0)
        .collect();
    answer.sort();
    answer
}

/// Expects exactly one match and returns it.
pub fn single_match(
    tree: &mut CodeTree,
    query: &Clause,
    subsumption_resolution: bool,
) -> SubsumptionMatch {
    let matches: Vec<SubsumptionMatch> = tree.query(query, subsumption_resolution).collect();
    assert_eq!(matches.len(), 1, "expected one match, got {:?}", matches);
    matches.into_iter().next().unwrap()
}
