// A representative code tree workload, to use for profiling.
//
// To profile using samply:
//
//   cargo build --bin=profile_code_tree --profile=fastdev
//   samply record target/fastdev/profile_code_tree --clauses 20000 --queries 20000
//
// Use RUST_LOG to see what the tree is doing, e.g.:
//   RUST_LOG=codetree::code_tree=debug cargo run --bin=profile_code_tree -- --clauses 10

use clap::Parser;
use codetree::code_tree::{ClauseId, CodeTree, CodeTreeConfig, CodeTreeStats};
use codetree::kernel::clause::Clause;
use codetree::kernel::literal::Literal;
use codetree::kernel::symbol::Symbol;
use codetree::kernel::symbol_table::SymbolTable;
use codetree::kernel::term::Term;
use codetree::kernel::variable_map::VariableMap;
use codetree::saturation::{ClauseSubsumptionIndex, LinearSubsumptionIndex};
use mimalloc::MiMalloc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "profile_code_tree",
    about = "Runs a forward subsumption workload against the code tree."
)]
struct Args {
    #[clap(long, default_value_t = 5000, help = "How many random clauses to store.")]
    clauses: usize,

    #[clap(long, default_value_t = 5000, help = "How many random queries to run.")]
    queries: usize,

    #[clap(long, default_value_t = 0, help = "Seed for clause generation.")]
    seed: u64,

    #[clap(long, default_value_t = 12, help = "How many symbols to generate clauses from.")]
    symbols: usize,

    #[clap(long, default_value_t = 3, help = "Maximum nesting depth of generated terms.")]
    max_depth: usize,

    #[clap(long, help = "A JSON file with the code tree configuration.", value_name = "FILE")]
    config: Option<String>,

    #[clap(
        long,
        help = "Read clauses from a file, one per line, instead of generating them.",
        value_name = "FILE"
    )]
    input: Option<String>,

    #[clap(long, help = "Print the report as JSON.")]
    json: bool,

    #[clap(long, help = "Check every answer against a linear scan.")]
    verify: bool,
}

#[derive(Serialize)]
struct Report {
    stored: usize,
    queries: usize,
    subsumed: usize,
    resolved: usize,
    insert_ms: f64,
    query_ms: f64,
    stats: CodeTreeStats,
}

/// Random clauses over a fixed signature.
struct Generator {
    rng: StdRng,
    predicates: Vec<(Symbol, usize)>,
    functions: Vec<(Symbol, usize)>,
    constants: Vec<Symbol>,
    max_depth: usize,
}

impl Generator {
    fn new(table: &mut SymbolTable, symbols: usize, max_depth: usize, seed: u64) -> Generator {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut predicates = vec![];
        let mut functions = vec![];
        let mut constants = vec![];
        for i in 0..symbols.max(3) {
            let result = match i % 3 {
                0 => {
                    let arity = rng.gen_range(1..=3);
                    table
                        .add(&format!("p{}", i), arity)
                        .map(|s| predicates.push((s, arity)))
                }
                1 => {
                    let arity = rng.gen_range(1..=2);
                    table
                        .add(&format!("f{}", i), arity)
                        .map(|s| functions.push((s, arity)))
                }
                _ => table.add(&format!("c{}", i), 0).map(|s| constants.push(s)),
            };
            if let Err(e) = result {
                eprintln!("error building the signature: {}", e);
                std::process::exit(1);
            }
        }
        Generator {
            rng,
            predicates,
            functions,
            constants,
            max_depth,
        }
    }

    fn constant(&mut self) -> Term {
        let i = self.rng.gen_range(0..self.constants.len());
        Term::constant(self.constants[i])
    }

    fn term(&mut self, depth: usize, variables: bool) -> Term {
        if depth >= self.max_depth || self.rng.gen_bool(0.4) {
            if variables && self.rng.gen_bool(0.5) {
                return Term::var(self.rng.gen_range(0..4));
            }
            return self.constant();
        }
        let (f, arity) = self.functions[self.rng.gen_range(0..self.functions.len())];
        let args = (0..arity).map(|_| self.term(depth + 1, variables)).collect();
        Term::apply(f, args)
    }

    fn literal(&mut self, variables: bool) -> Literal {
        let positive = self.rng.gen_bool(0.5);
        if self.rng.gen_bool(0.15) {
            let left = self.term(1, variables);
            let right = self.term(1, variables);
            let atom = Term::apply(Symbol::EQUALITY, vec![left, right]);
            return Literal::new(positive, atom);
        }
        let (p, arity) = self.predicates[self.rng.gen_range(0..self.predicates.len())];
        let args = (0..arity).map(|_| self.term(1, variables)).collect();
        Literal::new(positive, Term::apply(p, args))
    }

    fn clause(&mut self) -> Clause {
        let len = self.rng.gen_range(1..=3);
        Clause::new((0..len).map(|_| self.literal(true)).collect())
    }

    /// A query built from a stored clause, so that it has a fair chance of being subsumed.
    /// Variables are instantiated, a literal may be negated, and extra literals may be added.
    fn instance_of(&mut self, clause: &Clause) -> Clause {
        let mut map = VariableMap::new();
        for var in clause.variables() {
            let term = self.term(self.max_depth.saturating_sub(1), false);
            map.set(var, term);
        }
        let mut literals = map.specialize_clause(clause).literals;
        if self.rng.gen_bool(0.3) {
            let i = self.rng.gen_range(0..literals.len());
            literals[i] = literals[i].negate();
        }
        for _ in 0..self.rng.gen_range(0..=2) {
            let literal = self.literal(false);
            let at = self.rng.gen_range(0..=literals.len());
            literals.insert(at, literal);
        }
        Clause::new(literals)
    }
}

fn load_config(path: &Option<String>) -> CodeTreeConfig {
    let Some(path) = path else {
        return CodeTreeConfig::default();
    };
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error reading {}: {}", path, e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("error parsing {}: {}", path, e);
        std::process::exit(1);
    })
}

fn read_clauses(path: &str, table: &mut SymbolTable) -> Vec<Clause> {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error reading {}: {}", path, e);
        std::process::exit(1);
    });
    let mut clauses = vec![];
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        match table.parse_clause(line) {
            Ok(clause) => clauses.push(clause),
            Err(e) => {
                eprintln!("{}:{}: {}", path, i + 1, e);
                std::process::exit(1);
            }
        }
    }
    clauses
}

fn matched_ids(index: &mut dyn ClauseSubsumptionIndex, query: &Clause, sres: bool) -> BTreeSet<ClauseId> {
    index
        .subsuming_or_resolving(query, sres)
        .into_iter()
        .map(|m| m.clause)
        .collect()
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = load_config(&args.config);
    let mut table = SymbolTable::new();

    let (stored, queries) = match &args.input {
        Some(path) => {
            let clauses = read_clauses(path, &mut table);
            (clauses.clone(), clauses)
        }
        None => {
            let mut generator = Generator::new(&mut table, args.symbols, args.max_depth, args.seed);
            let stored: Vec<Clause> = (0..args.clauses).map(|_| generator.clause()).collect();
            let queries = (0..args.queries)
                .map(|i| {
                    if i % 2 == 0 && !stored.is_empty() {
                        let source = &stored[generator.rng.gen_range(0..stored.len())];
                        generator.instance_of(source)
                    } else {
                        generator.clause()
                    }
                })
                .collect();
            (stored, queries)
        }
    };

    let mut tree = CodeTree::with_config(config);
    let start = Instant::now();
    for (i, clause) in stored.iter().enumerate() {
        tree.insert(clause, ClauseId(i));
    }
    let insert_ms = start.elapsed().as_secs_f64() * 1000.0;

    let start = Instant::now();
    let mut subsumed = 0;
    let mut resolved = 0;
    for query in &queries {
        for m in tree.query(query, true) {
            if m.resolved_literal.is_some() {
                resolved += 1;
            } else {
                subsumed += 1;
            }
        }
    }
    let query_ms = start.elapsed().as_secs_f64() * 1000.0;

    if args.verify {
        let mut linear = LinearSubsumptionIndex::new();
        for (i, clause) in stored.iter().enumerate() {
            if let Err(e) = linear.handle_clause(clause, ClauseId(i), true) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        let mut failures = 0;
        for query in &queries {
            for sres in [false, true] {
                let expected = matched_ids(&mut linear, query, sres);
                let actual = matched_ids(&mut tree, query, sres);
                if expected != actual {
                    failures += 1;
                    eprintln!(
                        "mismatch for {} (resolution: {}): linear scan found {:?}, code tree found {:?}",
                        table.format_clause(query),
                        sres,
                        expected,
                        actual
                    );
                }
            }
        }
        if failures > 0 {
            eprintln!("{} queries disagreed", failures);
            std::process::exit(1);
        }
        println!("verified {} queries against a linear scan", queries.len());
    }

    let report = Report {
        stored: stored.len(),
        queries: queries.len(),
        subsumed,
        resolved,
        insert_ms,
        query_ms,
        stats: tree.stats(),
    };
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error writing report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!(
            "inserted {} clauses in {:.1} ms",
            report.stored, report.insert_ms
        );
        println!(
            "ran {} queries in {:.1} ms: {} subsumptions, {} resolutions",
            report.queries, report.query_ms, report.subsumed, report.resolved
        );
        println!(
            "{} blocks, {} instructions, {} literal records, {} dispatch tables",
            report.stats.blocks,
            report.stats.instructions,
            report.stats.literal_records,
            report.stats.dispatch_tables
        );
    }
}
