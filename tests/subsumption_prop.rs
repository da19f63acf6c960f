use proptest::prelude::*;
use std::collections::BTreeSet;

use codetree::code_tree::{ClauseId, CodeTree, CodeTreeConfig, SubsumptionMatch};
use codetree::kernel::clause::Clause;
use codetree::kernel::literal::Literal;
use codetree::kernel::symbol::Symbol;
use codetree::kernel::symbol_table::SymbolTable;
use codetree::kernel::term::Term;
use codetree::kernel::variable_map::VariableMap;
use codetree::saturation::{ClauseSubsumptionIndex, LinearSubsumptionIndex};

const MAX_VAR: u16 = 3;
const VAR_COUNT: usize = (MAX_VAR as usize) + 1;

// Constants first, then f/1 and g/2.
const FUNCTOR_NAMES: [(&str, usize); 5] = [("a", 0), ("b", 0), ("c", 0), ("f", 1), ("g", 2)];

// The last predicate stands for equality.
const PREDICATE_NAMES: [(&str, usize); 4] = [("p", 1), ("q", 2), ("r", 1), ("=", 2)];

#[derive(Clone, Debug)]
enum RawTerm {
    Var(u16),
    App { f: usize, kids: Vec<RawTerm> },
}

#[derive(Clone, Debug)]
struct RawLiteral {
    positive: bool,
    predicate: usize,
    args: Vec<RawTerm>,
}

/// A stored clause made specific: variables instantiated, maybe one literal negated, and
/// maybe some literals added.
#[derive(Clone, Debug)]
struct RawInstance {
    source: prop::sample::Index,
    values: Vec<RawTerm>,
    negate: Option<prop::sample::Index>,
    extra: Vec<RawLiteral>,
}

fn term_strategy(with_vars: bool) -> impl Strategy<Value = RawTerm> {
    let constants = (0..3usize).prop_map(|f| RawTerm::App { f, kids: vec![] });
    let leaf = if with_vars {
        prop_oneof![(0..=MAX_VAR).prop_map(RawTerm::Var), constants].boxed()
    } else {
        constants.boxed()
    };
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| RawTerm::App {
                f: 3,
                kids: vec![t]
            }),
            (inner.clone(), inner).prop_map(|(a, b)| RawTerm::App {
                f: 4,
                kids: vec![a, b],
            }),
        ]
    })
}

fn literal_strategy(with_vars: bool) -> impl Strategy<Value = RawLiteral> {
    (
        any::<bool>(),
        0..PREDICATE_NAMES.len(),
        term_strategy(with_vars),
        term_strategy(with_vars),
    )
        .prop_map(|(positive, predicate, left, right)| {
            let args = if PREDICATE_NAMES[predicate].1 == 1 {
                vec![left]
            } else {
                vec![left, right]
            };
            RawLiteral {
                positive,
                predicate,
                args,
            }
        })
}

fn clauses_strategy() -> impl Strategy<Value = Vec<Vec<RawLiteral>>> {
    prop::collection::vec(prop::collection::vec(literal_strategy(true), 1..=3), 1..10)
}

prop_compose! {
    fn instance_strategy()
        (
            source in any::<prop::sample::Index>(),
            values in prop::collection::vec(term_strategy(false), VAR_COUNT..=VAR_COUNT),
            negate in prop::option::of(any::<prop::sample::Index>()),
            extra in prop::collection::vec(literal_strategy(false), 0..=2),
        )
        -> RawInstance
    {
        RawInstance { source, values, negate, extra }
    }
}

/// Interns the signature up front, so that symbol ids don't depend on the generated clauses.
struct Signature {
    functors: Vec<Symbol>,
    predicates: Vec<Symbol>,
}

impl Signature {
    fn new() -> Signature {
        let mut table = SymbolTable::new();
        let functors = FUNCTOR_NAMES
            .iter()
            .map(|(name, arity)| table.add(name, *arity).unwrap())
            .collect();
        let predicates = PREDICATE_NAMES
            .iter()
            .map(|(name, arity)| table.add(name, *arity).unwrap())
            .collect();
        Signature {
            functors,
            predicates,
        }
    }

    fn term(&self, raw: &RawTerm) -> Term {
        match raw {
            RawTerm::Var(v) => Term::var(*v),
            RawTerm::App { f, kids } => Term::apply(
                self.functors[*f],
                kids.iter().map(|kid| self.term(kid)).collect(),
            ),
        }
    }

    fn literal(&self, raw: &RawLiteral) -> Literal {
        let args = raw.args.iter().map(|arg| self.term(arg)).collect();
        Literal::new(raw.positive, Term::apply(self.predicates[raw.predicate], args))
    }

    fn clause(&self, raw: &[RawLiteral]) -> Clause {
        Clause::new(raw.iter().map(|lit| self.literal(lit)).collect())
    }

    fn instance(&self, stored: &[Clause], raw: &RawInstance) -> Clause {
        let source = &stored[raw.source.index(stored.len())];
        let mut map = VariableMap::new();
        for (v, value) in raw.values.iter().enumerate() {
            map.set(v as u16, self.term(value));
        }
        let mut literals = map.specialize_clause(source).literals;
        if let Some(index) = &raw.negate {
            let i = index.index(literals.len());
            literals[i] = literals[i].negate();
        }
        literals.extend(raw.extra.iter().map(|lit| self.literal(lit)));
        Clause::new(literals)
    }
}

fn ids(matches: &[SubsumptionMatch]) -> BTreeSet<ClauseId> {
    matches.iter().map(|m| m.clause).collect()
}

/// Checks that a reported match really is a witness: every stored literal, instantiated,
/// equals the query literal it was mapped to, up to equality orientation. The resolved
/// literal is compared in negated form.
fn check_witness(stored: &Clause, query: &Clause, m: &SubsumptionMatch) -> Result<(), TestCaseError> {
    prop_assert_eq!(m.literal_map.len(), stored.len());
    let distinct: BTreeSet<usize> = m.literal_map.iter().copied().collect();
    prop_assert_eq!(distinct.len(), m.literal_map.len());
    if let Some(k) = m.resolved_literal {
        prop_assert!(m.literal_map.contains(&k));
    }
    for (i, literal) in stored.iter().enumerate() {
        let j = m.literal_map[i];
        let target = if m.resolved_literal == Some(j) {
            query.literals[j].negate()
        } else {
            query.literals[j].clone()
        };
        let instance = m.substitution.specialize_literal(literal);
        prop_assert!(
            instance == target || (instance.is_equality() && instance.reversed() == target),
            "{} does not map onto {}",
            instance,
            target
        );
    }
    Ok(())
}

fn build_queries(
    signature: &Signature,
    stored: &[Clause],
    random: &[Vec<RawLiteral>],
    instances: &[RawInstance],
) -> Vec<Clause> {
    random
        .iter()
        .map(|raw| signature.clause(raw))
        .chain(instances.iter().map(|raw| signature.instance(stored, raw)))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn tree_agrees_with_linear_scan(
        raw_stored in clauses_strategy(),
        raw_queries in clauses_strategy(),
        instances in prop::collection::vec(instance_strategy(), 1..6),
        threshold in 2usize..6,
        subsumption_resolution in any::<bool>(),
    ) {
        let signature = Signature::new();
        let stored: Vec<Clause> = raw_stored.iter().map(|raw| signature.clause(raw)).collect();
        let queries = build_queries(&signature, &stored, &raw_queries, &instances);

        let mut tree = CodeTree::with_config(CodeTreeConfig {
            dispatch_threshold: threshold,
            ..CodeTreeConfig::default()
        });
        let mut linear = LinearSubsumptionIndex::new();
        for (i, clause) in stored.iter().enumerate() {
            tree.insert(clause, ClauseId(i));
            linear.handle_clause(clause, ClauseId(i), true).unwrap();
        }

        for query in &queries {
            let found: Vec<SubsumptionMatch> = tree.query(query, subsumption_resolution).collect();
            let expected = linear.subsuming_or_resolving(query, subsumption_resolution);
            prop_assert_eq!(found.len(), ids(&found).len(), "a clause was reported twice");
            prop_assert_eq!(ids(&found), ids(&expected), "query {}", query);
            for m in &found {
                check_witness(&stored[m.clause.0], query, m)?;
                // Plain subsumption is reported whenever it exists.
                let plain = expected.iter().find(|e| e.clause == m.clause);
                prop_assert_eq!(
                    m.resolved_literal.is_none(),
                    plain.map_or(false, |e| e.resolved_literal.is_none())
                );
            }
        }
    }

    #[test]
    fn instances_are_subsumed(
        raw_stored in clauses_strategy(),
        instances in prop::collection::vec(instance_strategy(), 1..6),
    ) {
        let signature = Signature::new();
        let stored: Vec<Clause> = raw_stored.iter().map(|raw| signature.clause(raw)).collect();
        let mut tree = CodeTree::new();
        for (i, clause) in stored.iter().enumerate() {
            tree.insert(clause, ClauseId(i));
        }
        for raw in &instances {
            if raw.negate.is_some() {
                continue;
            }
            let source = ClauseId(raw.source.index(stored.len()));
            let query = signature.instance(&stored, raw);
            let found: Vec<SubsumptionMatch> = tree.query(&query, false).collect();
            prop_assert!(ids(&found).contains(&source), "{} should subsume {}", stored[source.0], query);
        }
    }

    #[test]
    fn removal_forgets_exactly_the_removed_clauses(
        raw_stored in clauses_strategy(),
        raw_queries in clauses_strategy(),
        instances in prop::collection::vec(instance_strategy(), 1..6),
        keep in prop::collection::vec(any::<bool>(), 10),
        threshold in 2usize..4,
    ) {
        let signature = Signature::new();
        let stored: Vec<Clause> = raw_stored.iter().map(|raw| signature.clause(raw)).collect();
        let queries = build_queries(&signature, &stored, &raw_queries, &instances);

        let mut tree = CodeTree::with_config(CodeTreeConfig {
            dispatch_threshold: threshold,
            ..CodeTreeConfig::default()
        });
        let mut linear = LinearSubsumptionIndex::new();
        for (i, clause) in stored.iter().enumerate() {
            tree.insert(clause, ClauseId(i));
            if keep[i] {
                linear.handle_clause(clause, ClauseId(i), true).unwrap();
            }
        }
        for (i, clause) in stored.iter().enumerate() {
            if !keep[i] {
                prop_assert_eq!(tree.remove(clause, ClauseId(i)), Ok(()));
            }
        }
        prop_assert_eq!(tree.len(), linear.len());

        for query in &queries {
            let found: Vec<SubsumptionMatch> = tree.query(query, true).collect();
            let expected = linear.subsuming_or_resolving(query, true);
            prop_assert_eq!(ids(&found), ids(&expected));
        }

        for (i, clause) in stored.iter().enumerate() {
            if keep[i] {
                prop_assert_eq!(tree.remove(clause, ClauseId(i)), Ok(()));
            }
        }
        let stats = tree.stats();
        prop_assert_eq!(stats.blocks, 0);
        prop_assert_eq!(stats.instructions, 0);
        prop_assert_eq!(stats.literal_records, 0);
        prop_assert_eq!(stats.dispatch_tables, 0);
    }

    #[test]
    fn answers_do_not_depend_on_layout(
        raw_stored in clauses_strategy(),
        raw_queries in clauses_strategy(),
        instances in prop::collection::vec(instance_strategy(), 1..6),
    ) {
        let signature = Signature::new();
        let stored: Vec<Clause> = raw_stored.iter().map(|raw| signature.clause(raw)).collect();
        let queries = build_queries(&signature, &stored, &raw_queries, &instances);

        let configs = [
            CodeTreeConfig::default(),
            CodeTreeConfig { dispatch_threshold: 2, reorder_literals: true },
            CodeTreeConfig { dispatch_threshold: 2, reorder_literals: false },
        ];
        let mut trees: Vec<CodeTree> = configs
            .iter()
            .map(|config| {
                let mut tree = CodeTree::with_config(config.clone());
                for (i, clause) in stored.iter().enumerate() {
                    tree.insert(clause, ClauseId(i));
                }
                tree
            })
            .collect();

        for query in &queries {
            let answers: Vec<BTreeSet<ClauseId>> = trees
                .iter_mut()
                .map(|tree| ids(&tree.query(query, true).collect::<Vec<_>>()))
                .collect();
            prop_assert_eq!(&answers[0], &answers[1]);
            prop_assert_eq!(&answers[0], &answers[2]);
        }
    }

    #[test]
    fn repeated_queries_give_the_same_answers(
        raw_stored in clauses_strategy(),
        raw_queries in clauses_strategy(),
        instances in prop::collection::vec(instance_strategy(), 1..6),
    ) {
        let signature = Signature::new();
        let stored: Vec<Clause> = raw_stored.iter().map(|raw| signature.clause(raw)).collect();
        let queries = build_queries(&signature, &stored, &raw_queries, &instances);
        let mut tree = CodeTree::new();
        for (i, clause) in stored.iter().enumerate() {
            tree.insert(clause, ClauseId(i));
        }

        let first: Vec<Vec<SubsumptionMatch>> = queries
            .iter()
            .map(|query| tree.query(query, true).collect())
            .collect();

        // Interleave abandoned queries with complete ones, in reverse order.
        for (query, expected) in queries.iter().zip(&first).rev() {
            tree.query(query, false).next();
            let again: Vec<SubsumptionMatch> = tree.query(query, true).collect();
            prop_assert_eq!(&again, expected);
        }
    }
}
