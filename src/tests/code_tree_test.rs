use super::common::*;
use crate::code_tree::{ClauseId, CodeTree, CodeTreeConfig, Instruction};
use crate::kernel::symbol_table::SymbolTable;

// These tests run whole queries against trees built from a handful of clauses.

fn small_dispatch() -> CodeTreeConfig {
    CodeTreeConfig {
        dispatch_threshold: 2,
        ..CodeTreeConfig::default()
    }
}

#[test]
fn test_subsumption_binds_variables() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(f(x0)) or q(x0)"]);
    let query = table.make_clause("p(f(a)) or q(a) or r(b)");
    let m = single_match(&mut tree, &query, false);
    assert_eq!(m.clause, ClauseId(0));
    assert_eq!(m.resolved_literal, None);
    assert_eq!(m.literal_map, vec![0, 1]);
    assert_eq!(table.format_term(m.substitution.get_mapping(0).unwrap()), "a");
}

#[test]
fn test_missing_literal_blocks_subsumption() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(f(x0)) or q(x0)"]);
    let query = table.make_clause("p(f(a)) or r(b)");
    assert!(matching_ids(&mut tree, &query, false).is_empty());
    assert!(matching_ids(&mut tree, &query, true).is_empty());
}

#[test]
fn test_subsumption_resolution_on_first_literal() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(f(x0)) or q(x0)"]);
    let query = table.make_clause("not p(f(a)) or q(a) or r(b)");
    assert!(matching_ids(&mut tree, &query, false).is_empty());
    let m = single_match(&mut tree, &query, true);
    assert_eq!(m.resolved_literal, Some(0));
    assert_eq!(m.literal_map, vec![0, 1]);
    assert_eq!(table.format_term(m.substitution.get_mapping(0).unwrap()), "a");
}

#[test]
fn test_resolution_needs_consistent_bindings() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0) or q(x0)"]);
    let query = table.make_clause("not p(a) or q(b)");
    assert!(matching_ids(&mut tree, &query, true).is_empty());
    let query = table.make_clause("q(a) or not p(a)");
    assert_eq!(single_match(&mut tree, &query, true).resolved_literal, Some(1));
}

#[test]
fn test_subsumption_preferred_over_resolution() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0)"]);
    let query = table.make_clause("not p(b) or p(a)");
    let m = single_match(&mut tree, &query, true);
    assert_eq!(m.resolved_literal, None);
    assert_eq!(m.literal_map, vec![1]);
}

#[test]
fn test_shared_prefix_lives_in_one_block() {
    let mut table = SymbolTable::new();
    let tree = tree_with(
        &mut table,
        CodeTreeConfig::default(),
        &["p(x0, x0)", "p(x0, x1)"],
    );
    let first = tree.clause_path(ClauseId(0)).unwrap();
    let second = tree.clause_path(ClauseId(1)).unwrap();
    assert_eq!(first[0], second[0]);
    assert_eq!(first[1], second[1]);
    assert_eq!(first[0].block, first[1].block);
    assert_ne!(first[2], second[2]);

    let p = table.get_symbol("p").unwrap();
    assert_eq!(
        tree.instruction(first[0]),
        Some(Instruction::CheckFunctor(
            crate::kernel::flat_term::Functor::header(p, true)
        ))
    );
    assert_eq!(tree.instruction(first[1]), Some(Instruction::AssignVar(0)));
    assert_eq!(tree.instruction(first[2]), Some(Instruction::CheckVar(0)));
    assert_eq!(tree.instruction(second[2]), Some(Instruction::AssignVar(1)));

    // The second clause diverges as the alternative of the first one's CheckVar.
    let block = tree.block(first[2].block).unwrap();
    assert_eq!(block[first[2].offset].alternative, Some(second[2].block));
    assert_eq!(second[2].offset, 0);
}

#[test]
fn test_each_clause_reported_once() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0)"]);
    let query = table.make_clause("p(a) or p(b) or p(c)");
    assert_eq!(matching_ids(&mut tree, &query, true), vec![0]);
}

#[test]
fn test_literals_map_injectively() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0) or p(x1)"]);
    let query = table.make_clause("p(a)");
    assert!(matching_ids(&mut tree, &query, false).is_empty());
    let query = table.make_clause("p(a) or p(b)");
    assert_eq!(matching_ids(&mut tree, &query, false), vec![0]);
}

#[test]
fn test_literal_map_follows_stored_order() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["q(x0) or p(f(x0))"]);
    assert_eq!(tree.literal_order(ClauseId(0)), Some(&[1, 0][..]));
    let query = table.make_clause("p(f(a)) or r(b) or q(a)");
    let m = single_match(&mut tree, &query, false);
    assert_eq!(m.literal_map, vec![2, 0]);
}

#[test]
fn test_literal_order_without_reordering() {
    let mut table = SymbolTable::new();
    let config = CodeTreeConfig {
        reorder_literals: false,
        ..CodeTreeConfig::default()
    };
    let mut tree = tree_with(&mut table, config, &["q(x0) or p(f(x0))"]);
    assert_eq!(tree.literal_order(ClauseId(0)), Some(&[0, 1][..]));
    let query = table.make_clause("p(f(a)) or q(a)");
    assert_eq!(single_match(&mut tree, &query, false).literal_map, vec![1, 0]);
}

#[test]
fn test_equalities_match_either_way() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(
        &mut table,
        CodeTreeConfig::default(),
        &["f(x0) = a", "g(x0) != x0"],
    );
    let query = table.make_clause("a = f(b)");
    assert_eq!(matching_ids(&mut tree, &query, false), vec![0]);
    let query = table.make_clause("c != g(c)");
    assert_eq!(matching_ids(&mut tree, &query, false), vec![1]);
    let query = table.make_clause("c = g(c)");
    assert!(matching_ids(&mut tree, &query, false).is_empty());
    assert_eq!(single_match(&mut tree, &query, true).resolved_literal, Some(0));
}

#[test]
fn test_empty_clause_subsumes_everything() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["<empty>", "p(x0)"]);
    let query = table.make_clause("q(a)");
    let m = single_match(&mut tree, &query, false);
    assert_eq!(m.clause, ClauseId(0));
    assert!(m.literal_map.is_empty());

    let empty = table.make_clause("<empty>");
    assert_eq!(matching_ids(&mut tree, &empty, true), vec![0]);
}

#[test]
fn test_dispatch_at_the_root() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, small_dispatch(), &["p(a)", "q(a)", "r(a)"]);
    assert_eq!(tree.stats().dispatch_tables, 1);

    // Code added after compression goes through the table, or onto the dispatch's alternatives.
    tree.insert(&table.make_clause("s(x0)"), ClauseId(3));
    tree.insert(&table.make_clause("<empty>"), ClauseId(4));
    for (text, expected) in [
        ("p(a)", vec![0, 4]),
        ("r(a) or s(b)", vec![2, 3, 4]),
        ("q(b)", vec![4]),
    ] {
        let query = table.make_clause(text);
        assert_eq!(matching_ids(&mut tree, &query, false), expected, "{}", text);
    }

    let query = table.make_clause("not q(a) or t(a)");
    let matches: Vec<_> = tree.query(&query, true).collect();
    let resolved: Vec<_> = matches
        .iter()
        .filter(|m| m.resolved_literal.is_some())
        .map(|m| m.clause)
        .collect();
    assert_eq!(resolved, vec![ClauseId(1)]);
}

#[test]
fn test_dispatch_inside_a_literal() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(
        &mut table,
        small_dispatch(),
        &["p(a)", "p(b)", "p(c)", "p(x0)", "q(x0)"],
    );
    assert_eq!(tree.stats().dispatch_tables, 1);
    let query = table.make_clause("p(b)");
    assert_eq!(matching_ids(&mut tree, &query, false), vec![1, 3]);

    tree.remove(&table.make_clause("p(b)"), ClauseId(1)).unwrap();
    assert_eq!(matching_ids(&mut tree, &query, false), vec![3]);
    let query = table.make_clause("p(c) or q(d)");
    assert_eq!(matching_ids(&mut tree, &query, false), vec![2, 3, 4]);
}

#[test]
fn test_removal_restores_an_empty_tree() {
    let mut table = SymbolTable::new();
    let texts = [
        "p(a)",
        "p(b)",
        "p(c)",
        "p(x0)",
        "q(x0) or p(x0)",
        "p(x0) or q(f(x0))",
        "<empty>",
    ];
    let mut tree = tree_with(&mut table, small_dispatch(), &texts);
    assert_eq!(tree.len(), texts.len());

    // Remove in an order that doesn't match insertion.
    for i in [3, 0, 6, 5, 2, 4, 1] {
        let clause = table.make_clause(texts[i]);
        tree.remove(&clause, ClauseId(i)).unwrap();
        assert!(!tree.contains(ClauseId(i)));
        for j in 0..texts.len() {
            assert_eq!(tree.clause_path(ClauseId(j)).is_some(), tree.contains(ClauseId(j)));
        }
    }
    let stats = tree.stats();
    assert_eq!(stats.clauses, 0);
    assert_eq!(stats.blocks, 0);
    assert_eq!(stats.instructions, 0);
    assert_eq!(stats.literal_records, 0);
    assert_eq!(stats.dispatch_tables, 0);
}

#[test]
fn test_reinsert_after_remove() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0) or q(x0)"]);
    let clause = table.make_clause("p(x0) or q(x0)");
    let query = table.make_clause("q(a) or p(a)");
    tree.remove(&clause, ClauseId(0)).unwrap();
    assert!(matching_ids(&mut tree, &query, false).is_empty());
    tree.insert(&clause, ClauseId(0));
    assert_eq!(matching_ids(&mut tree, &query, false), vec![0]);
}

#[test]
fn test_queries_do_not_leak_into_each_other() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(
        &mut table,
        CodeTreeConfig::default(),
        &["p(x0) or q(x0)", "p(a)"],
    );
    let hit = table.make_clause("p(a) or q(a)");
    let miss = table.make_clause("p(b) or q(a)");
    assert_eq!(matching_ids(&mut tree, &hit, false), vec![0, 1]);
    assert!(matching_ids(&mut tree, &miss, false).is_empty());

    // Abandoning a query halfway doesn't affect the next one.
    assert!(tree.query(&hit, true).next().is_some());
    assert!(matching_ids(&mut tree, &miss, false).is_empty());
    assert_eq!(matching_ids(&mut tree, &hit, false), vec![0, 1]);
}

#[test]
fn test_find_subsuming() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(&mut table, CodeTreeConfig::default(), &["p(x0, b)"]);
    assert_eq!(
        tree.find_subsuming(&table.make_clause("p(a, b) or q(a)")),
        Some(ClauseId(0))
    );
    assert_eq!(tree.find_subsuming(&table.make_clause("p(a, a)")), None);
}

#[test]
fn test_deep_shared_variables() {
    let mut table = SymbolTable::new();
    let mut tree = tree_with(
        &mut table,
        CodeTreeConfig::default(),
        &["p(x0, x1) or q(x1, x2) or r(x2, x0)"],
    );
    let hit = table.make_clause("r(c, a) or q(b, c) or s(a) or p(a, b)");
    let m = single_match(&mut tree, &hit, false);
    assert_eq!(m.literal_map, vec![3, 1, 0]);
    let specialized = m.substitution.specialize_clause(&table.make_clause(
        "p(x0, x1) or q(x1, x2) or r(x2, x0)",
    ));
    assert_eq!(
        table.format_clause(&specialized),
        "p(a, b) or q(b, c) or r(c, a)"
    );

    let miss = table.make_clause("r(c, b) or q(b, c) or p(a, b)");
    assert!(matching_ids(&mut tree, &miss, false).is_empty());
}
