// The automaton store.
//
// Code lives in blocks: short sequences of instructions that run in order. Each block ends with a
// Success or a Dispatch, so a non-terminal instruction always has a successor in its own block.
// Blocks, literal records, and dispatch tables are kept in arenas and addressed by index, with
// free lists so that removal doesn't move anything that a live index refers to.

use smallvec::SmallVec;

use crate::code_tree::instruction::{
    BlockId, CodeAddr, Instruction, LiteralId, OpCode, TableId,
};
use crate::kernel::flat_term::Functor;

/// One match of a stored literal against a query literal candidate, cached for the
/// duration of one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchInfo {
    /// Which candidate matched.
    pub li_index: u32,

    /// For each local variable slot, the tape position of the subterm it was bound to.
    pub bindings: SmallVec<[u32; 4]>,
}

/// The data behind a LitEnd instruction.
#[derive(Clone, Debug)]
pub struct LiteralRecord {
    /// How many literals of the clause come before this one.
    pub depth: usize,

    /// The record of the literal that precedes this one in the compiled clause.
    pub previous: Option<LiteralId>,

    /// For each local variable slot of this literal, the clause-wide variable number.
    pub global_vars: SmallVec<[u16; 4]>,

    /// The query that last wrote to matches. Older contents are stale.
    pub epoch: u64,

    /// Whether the clause matcher already descended past this record in the current query.
    pub visited: bool,

    pub matches: Vec<MatchInfo>,
}

impl LiteralRecord {
    pub fn new(
        depth: usize,
        previous: Option<LiteralId>,
        global_vars: SmallVec<[u16; 4]>,
    ) -> LiteralRecord {
        LiteralRecord {
            depth,
            previous,
            global_vars,
            epoch: 0,
            visited: false,
            matches: vec![],
        }
    }

    pub fn var_count(&self) -> usize {
        self.global_vars.len()
    }
}

/// A sorted map from functor to the block that continues matching for that functor.
/// Every target block starts with the CheckFunctor for its key.
#[derive(Clone, Debug, Default)]
pub struct DispatchTable {
    entries: Vec<(Functor, BlockId)>,
}

impl DispatchTable {
    pub fn new(mut entries: Vec<(Functor, BlockId)>) -> DispatchTable {
        entries.sort();
        DispatchTable { entries }
    }

    pub fn lookup(&self, functor: Functor) -> Option<BlockId> {
        self.entries
            .binary_search_by_key(&functor, |(f, _)| *f)
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn insert(&mut self, functor: Functor, block: BlockId) {
        match self.entries.binary_search_by_key(&functor, |(f, _)| *f) {
            Ok(i) => self.entries[i].1 = block,
            Err(i) => self.entries.insert(i, (functor, block)),
        }
    }

    pub fn remove(&mut self, functor: Functor) -> Option<BlockId> {
        match self.entries.binary_search_by_key(&functor, |(f, _)| *f) {
            Ok(i) => Some(self.entries.remove(i).1),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Functor, BlockId)> {
        self.entries.iter()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CodeStore {
    blocks: Vec<Option<Vec<OpCode>>>,
    free_blocks: Vec<BlockId>,

    literals: Vec<Option<LiteralRecord>>,
    free_literals: Vec<LiteralId>,

    tables: Vec<Option<DispatchTable>>,
    free_tables: Vec<TableId>,

    /// Where every query starts. None when nothing is stored.
    pub entry: Option<BlockId>,

    epoch: u64,
}

impl CodeStore {
    pub fn new() -> CodeStore {
        CodeStore::default()
    }

    pub fn block(&self, id: BlockId) -> &[OpCode] {
        match &self.blocks[id] {
            Some(ops) => ops,
            None => panic!("block b{} was freed", id),
        }
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Vec<OpCode> {
        match &mut self.blocks[id] {
            Some(ops) => ops,
            None => panic!("block b{} was freed", id),
        }
    }

    pub fn is_live_block(&self, id: BlockId) -> bool {
        id < self.blocks.len() && self.blocks[id].is_some()
    }

    pub fn op(&self, addr: CodeAddr) -> &OpCode {
        &self.block(addr.block)[addr.offset]
    }

    pub fn op_mut(&mut self, addr: CodeAddr) -> &mut OpCode {
        &mut self.block_mut(addr.block)[addr.offset]
    }

    pub fn new_block(&mut self, ops: Vec<OpCode>) -> BlockId {
        debug_assert!(ops.last().map_or(false, |op| op.instr.is_terminal()));
        match self.free_blocks.pop() {
            Some(id) => {
                self.blocks[id] = Some(ops);
                id
            }
            None => {
                self.blocks.push(Some(ops));
                self.blocks.len() - 1
            }
        }
    }

    /// Frees the block and returns its instructions, so the caller can release what they own.
    pub fn free_block(&mut self, id: BlockId) -> Vec<OpCode> {
        let ops = self.blocks[id].take().unwrap_or_default();
        self.free_blocks.push(id);
        ops
    }

    /// Moves the instructions from offset onward into a new block, which is returned.
    /// The original block keeps only the instructions before offset, so the caller must
    /// append a terminal instruction to it.
    pub fn split_block(&mut self, id: BlockId, offset: usize) -> BlockId {
        debug_assert!(offset > 0);
        let tail = self.block_mut(id).split_off(offset);
        self.new_block(tail)
    }

    pub fn literal(&self, id: LiteralId) -> &LiteralRecord {
        match &self.literals[id] {
            Some(record) => record,
            None => panic!("literal record l{} was freed", id),
        }
    }

    pub fn literal_mut(&mut self, id: LiteralId) -> &mut LiteralRecord {
        match &mut self.literals[id] {
            Some(record) => record,
            None => panic!("literal record l{} was freed", id),
        }
    }

    pub fn new_literal(&mut self, record: LiteralRecord) -> LiteralId {
        match self.free_literals.pop() {
            Some(id) => {
                self.literals[id] = Some(record);
                id
            }
            None => {
                self.literals.push(Some(record));
                self.literals.len() - 1
            }
        }
    }

    pub fn table(&self, id: TableId) -> &DispatchTable {
        match &self.tables[id] {
            Some(table) => table,
            None => panic!("dispatch table t{} was freed", id),
        }
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut DispatchTable {
        match &mut self.tables[id] {
            Some(table) => table,
            None => panic!("dispatch table t{} was freed", id),
        }
    }

    pub fn new_table(&mut self, table: DispatchTable) -> TableId {
        match self.free_tables.pop() {
            Some(id) => {
                self.tables[id] = Some(table);
                id
            }
            None => {
                self.tables.push(Some(table));
                self.tables.len() - 1
            }
        }
    }

    /// Releases the literal records and tables owned by instructions that are being dropped.
    pub fn release(&mut self, ops: &[OpCode]) {
        for op in ops {
            match op.instr {
                Instruction::LitEnd(id) => {
                    self.literals[id] = None;
                    self.free_literals.push(id);
                }
                Instruction::Dispatch(id) => {
                    self.tables[id] = None;
                    self.free_tables.push(id);
                }
                _ => {}
            }
        }
    }

    /// The members of the alternative chain that starts at addr, in order.
    /// All of them are tried at the same tape position.
    pub fn chain(&self, addr: CodeAddr) -> Vec<CodeAddr> {
        let mut answer = vec![addr];
        let mut current = addr;
        while let Some(alt) = self.op(current).alternative {
            current = CodeAddr::start(alt);
            answer.push(current);
        }
        answer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Starts a new query. Every cached match from earlier queries becomes stale.
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn live_blocks(&self) -> usize {
        self.blocks.len() - self.free_blocks.len()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().flatten().map(|ops| ops.len()).sum()
    }

    pub fn live_literals(&self) -> usize {
        self.literals.len() - self.free_literals.len()
    }

    pub fn live_tables(&self) -> usize {
        self.tables.len() - self.free_tables.len()
    }
}
