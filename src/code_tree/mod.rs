// A code tree indexes clauses for forward subsumption and subsumption resolution.
//
// Each stored clause is compiled into instructions for a small matching machine, and the
// instructions of all clauses are merged into one tree so that common prefixes are run once.
// A query interprets the tree against the literals of the query clause.

pub mod clause_matcher;
pub mod compiler;
pub mod instruction;
pub mod literal_matcher;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::kernel::atom::AtomId;
use crate::kernel::clause::Clause;
use crate::kernel::variable_map::VariableMap;
use clause_matcher::ClauseMatcher;
use compiler::{compile_clause, find_path, insert_code, literal_order, remove_path};
use store::CodeStore;

pub use instruction::{BlockId, ClauseId, CodeAddr, Instruction, OpCode};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeTreeConfig {
    /// A chain of alternatives with more CheckFunctors than this becomes a dispatch table.
    pub dispatch_threshold: usize,

    /// Whether to reorder a clause's literals before compiling it.
    pub reorder_literals: bool,
}

impl Default for CodeTreeConfig {
    fn default() -> Self {
        CodeTreeConfig {
            dispatch_threshold: 5,
            reorder_literals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeTreeError {
    /// No clause with this id is stored.
    NotFound(ClauseId),

    /// The clause is registered, but its code can't be located in the tree.
    MissingPath(ClauseId),
}

impl fmt::Display for CodeTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodeTreeError::NotFound(id) => write!(f, "clause {} is not in the code tree", id),
            CodeTreeError::MissingPath(id) => {
                write!(f, "no code for clause {} was found in the code tree", id)
            }
        }
    }
}

impl std::error::Error for CodeTreeError {}

/// What the tree remembers about a stored clause, so that its code can be found again and
/// its matches reported in its own terms.
#[derive(Clone, Debug)]
pub struct StoredClause {
    pub clause: Clause,

    /// literal_order[i] is the index in clause of the i-th compiled literal.
    pub literal_order: Vec<usize>,

    /// global_vars[g] is the variable of clause that got global number g.
    pub global_vars: Vec<AtomId>,
}

/// A stored clause that subsumes the query, or that resolves with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubsumptionMatch {
    pub clause: ClauseId,

    /// For subsumption resolution, the query literal whose complement was matched.
    /// None for plain subsumption.
    pub resolved_literal: Option<usize>,

    /// literal_map[i] is the query literal that stored literal i matched.
    pub literal_map: Vec<usize>,

    /// Maps the stored clause's variables to subterms of the query.
    pub substitution: VariableMap,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CodeTreeStats {
    pub clauses: usize,
    pub blocks: usize,
    pub instructions: usize,
    pub literal_records: usize,
    pub dispatch_tables: usize,
    pub epoch: u64,
}

/// The lazy sequence of matches for one query.
pub struct SubsumptionIter<'a> {
    matcher: ClauseMatcher<'a>,
}

impl<'a> Iterator for SubsumptionIter<'a> {
    type Item = SubsumptionMatch;

    fn next(&mut self) -> Option<SubsumptionMatch> {
        self.matcher.next()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CodeTree {
    store: CodeStore,
    clauses: HashMap<ClauseId, StoredClause>,
    config: CodeTreeConfig,
}

impl CodeTree {
    pub fn new() -> CodeTree {
        CodeTree::with_config(CodeTreeConfig::default())
    }

    pub fn with_config(mut config: CodeTreeConfig) -> CodeTree {
        config.dispatch_threshold = config.dispatch_threshold.max(2);
        CodeTree {
            store: CodeStore::new(),
            clauses: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CodeTreeConfig {
        &self.config
    }

    /// The number of stored clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn contains(&self, id: ClauseId) -> bool {
        self.clauses.contains_key(&id)
    }

    /// Adds a clause to the tree. Inserting an id that is already stored does nothing.
    pub fn insert(&mut self, clause: &Clause, id: ClauseId) {
        if self.clauses.contains_key(&id) {
            debug!(id = %id, "clause is already in the code tree");
            return;
        }
        let order = literal_order(&self.store, clause, self.config.reorder_literals);
        let compiled = compile_clause(clause, order, id);
        let shared = insert_code(&mut self.store, &compiled.ops, self.config.dispatch_threshold);
        debug!(
            clause = %clause,
            id = %id,
            shared,
            unshared = compiled.ops.len() - shared,
            "inserted clause"
        );
        self.clauses.insert(
            id,
            StoredClause {
                clause: clause.clone(),
                literal_order: compiled.literal_order,
                global_vars: compiled.global_vars,
            },
        );
    }

    /// Removes a clause, which must be given as it was inserted.
    pub fn remove(&mut self, clause: &Clause, id: ClauseId) -> Result<(), CodeTreeError> {
        let stored = self.clauses.get(&id).ok_or(CodeTreeError::NotFound(id))?;
        let compiled = compile_clause(clause, stored.literal_order.clone(), id);
        let Some(path) = find_path(&self.store, &compiled.ops) else {
            debug_assert!(
                &stored.clause != clause,
                "stored clause {} has no code",
                id
            );
            return Err(CodeTreeError::MissingPath(id));
        };
        remove_path(&mut self.store, &path);
        self.clauses.remove(&id);
        debug!(clause = %clause, id = %id, "removed clause");
        Ok(())
    }

    /// Finds the stored clauses that subsume the query clause. With subsumption_resolution, also
    /// finds the ones that would subsume it if one query literal were negated.
    /// Each stored clause is reported at most once. One that both subsumes and resolves is
    /// reported as subsuming.
    pub fn query(&mut self, clause: &Clause, subsumption_resolution: bool) -> SubsumptionIter<'_> {
        SubsumptionIter {
            matcher: ClauseMatcher::new(
                &mut self.store,
                &self.clauses,
                clause,
                subsumption_resolution,
            ),
        }
    }

    /// The first stored clause found that subsumes the query.
    pub fn find_subsuming(&mut self, clause: &Clause) -> Option<ClauseId> {
        self.query(clause, false).next().map(|m| m.clause)
    }

    pub fn stats(&self) -> CodeTreeStats {
        CodeTreeStats {
            clauses: self.clauses.len(),
            blocks: self.store.live_blocks(),
            instructions: self.store.instruction_count(),
            literal_records: self.store.live_literals(),
            dispatch_tables: self.store.live_tables(),
            epoch: self.store.epoch(),
        }
    }

    /// The address of every instruction in a stored clause's code.
    pub fn clause_path(&self, id: ClauseId) -> Option<Vec<CodeAddr>> {
        let stored = self.clauses.get(&id)?;
        let compiled = compile_clause(&stored.clause, stored.literal_order.clone(), id);
        find_path(&self.store, &compiled.ops).map(|path| path.addrs)
    }

    pub fn instruction(&self, addr: CodeAddr) -> Option<Instruction> {
        if !self.store.is_live_block(addr.block) {
            return None;
        }
        self.store
            .block(addr.block)
            .get(addr.offset)
            .map(|op| op.instr)
    }

    /// The instructions of a live block.
    pub fn block(&self, id: BlockId) -> Option<&[OpCode]> {
        if self.store.is_live_block(id) {
            Some(self.store.block(id))
        } else {
            None
        }
    }

    /// The literal order a stored clause was compiled in.
    pub fn literal_order(&self, id: ClauseId) -> Option<&[usize]> {
        self.clauses.get(&id).map(|stored| stored.literal_order.as_slice())
    }
}
