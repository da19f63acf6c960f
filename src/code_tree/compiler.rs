// Compiling clauses into the store, and taking them back out.
//
// A clause compiles to the code of each literal in turn, each followed by a LitEnd, and then a
// Success. Literal code walks the flattened literal: a CheckFunctor per functor entry, and an
// AssignVar or CheckVar per variable entry, with slots numbered per literal.
//
// New code shares the longest prefix that is already in the store. Where it diverges, the rest
// goes into a fresh block, hung off the chain of alternatives at that point. When a chain holds
// too many CheckFunctors, they are moved into a dispatch table.

use smallvec::SmallVec;
use std::cmp::Reverse;
use tracing::trace;

use crate::code_tree::instruction::{
    BlockId, ClauseId, CodeAddr, Instruction, LiteralId, OpCode, Slot,
};
use crate::code_tree::store::{CodeStore, DispatchTable, LiteralRecord};
use crate::kernel::atom::AtomId;
use crate::kernel::clause::Clause;
use crate::kernel::flat_term::{FlatEntry, FlatTerm, Functor};
use crate::kernel::literal::Literal;

/// The variable numbering a LitEnd will carry once it is in the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiteralTemplate {
    pub global_vars: SmallVec<[u16; 4]>,
}

/// An instruction that is not in the store yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompiledOp {
    CheckFunctor(Functor),
    AssignVar(Slot),
    CheckVar(Slot),
    LitEnd(LiteralTemplate),
    Success(ClauseId),
}

impl CompiledOp {
    /// Whether this would be the same instruction as one already in the store.
    /// LitEnds are the same when they number their variables the same way.
    pub fn matches(&self, store: &CodeStore, instr: &Instruction) -> bool {
        match (self, instr) {
            (CompiledOp::CheckFunctor(a), Instruction::CheckFunctor(b)) => a == b,
            (CompiledOp::AssignVar(a), Instruction::AssignVar(b)) => a == b,
            (CompiledOp::CheckVar(a), Instruction::CheckVar(b)) => a == b,
            (CompiledOp::LitEnd(template), Instruction::LitEnd(id)) => {
                store.literal(*id).global_vars == template.global_vars
            }
            (CompiledOp::Success(a), Instruction::Success(b)) => a == b,
            _ => false,
        }
    }

    fn functor(&self) -> Option<Functor> {
        match self {
            CompiledOp::CheckFunctor(f) => Some(*f),
            _ => None,
        }
    }
}

/// A clause compiled in a fixed literal order.
#[derive(Clone, Debug)]
pub struct CompiledClause {
    pub ops: Vec<CompiledOp>,

    /// literal_order[i] is the index, in the original clause, of the i-th compiled literal.
    pub literal_order: Vec<usize>,

    /// global_vars[g] is the clause variable that got global number g.
    pub global_vars: Vec<AtomId>,
}

/// Compiles one literal. Global numbers are assigned to new variables in global_vars.
/// Without a LitEnd, the result is just the matching code, which is how sharing is estimated.
fn compile_literal(
    literal: &Literal,
    global_vars: &mut Vec<AtomId>,
    with_lit_end: bool,
    ops: &mut Vec<CompiledOp>,
) {
    let flat = FlatTerm::from_literal(literal);
    let mut local_vars: SmallVec<[AtomId; 4]> = SmallVec::new();
    let mut template = LiteralTemplate {
        global_vars: SmallVec::new(),
    };
    for entry in flat.entries() {
        match entry {
            FlatEntry::Functor { functor, .. } => ops.push(CompiledOp::CheckFunctor(*functor)),
            FlatEntry::Variable(v) => match local_vars.iter().position(|x| x == v) {
                Some(slot) => ops.push(CompiledOp::CheckVar(slot as Slot)),
                None => {
                    let slot = local_vars.len() as Slot;
                    local_vars.push(*v);
                    let global = match global_vars.iter().position(|x| x == v) {
                        Some(g) => g,
                        None => {
                            global_vars.push(*v);
                            global_vars.len() - 1
                        }
                    };
                    template.global_vars.push(global as u16);
                    ops.push(CompiledOp::AssignVar(slot));
                }
            },
        }
    }
    if with_lit_end {
        ops.push(CompiledOp::LitEnd(template));
    }
}

pub fn compile_clause(clause: &Clause, literal_order: Vec<usize>, id: ClauseId) -> CompiledClause {
    debug_assert_eq!(literal_order.len(), clause.len());
    let mut ops = vec![];
    let mut global_vars = vec![];
    for &i in &literal_order {
        compile_literal(&clause.literals[i], &mut global_vars, true, &mut ops);
    }
    ops.push(CompiledOp::Success(id));
    CompiledClause {
        ops,
        literal_order,
        global_vars,
    }
}

/// Finds the member of the chain at addr that executes op.
/// Looks through dispatch tables. Returns None when no member does.
fn follow(store: &CodeStore, addr: CodeAddr, op: &CompiledOp) -> Option<CodeAddr> {
    let mut member = addr;
    loop {
        let code = store.op(member);
        if let (Instruction::Dispatch(table), Some(f)) = (code.instr, op.functor()) {
            return store.table(table).lookup(f).map(CodeAddr::start);
        }
        if op.matches(store, &code.instr) {
            return Some(member);
        }
        member = CodeAddr::start(code.alternative?);
    }
}

/// How much of a literal's code is already present at addr.
struct Sharing {
    shared: usize,

    /// Where the literal's code ends, if all of it is shared.
    end: Option<CodeAddr>,
}

fn eval_sharing(store: &CodeStore, addr: CodeAddr, literal: &Literal) -> Sharing {
    let mut ops = vec![];
    compile_literal(literal, &mut vec![], false, &mut ops);
    let mut cursor = addr;
    for (i, op) in ops.iter().enumerate() {
        match follow(store, cursor, op) {
            Some(found) => cursor = found.next(),
            None => {
                return Sharing {
                    shared: i,
                    end: None,
                }
            }
        }
    }
    Sharing {
        shared: ops.len(),
        end: Some(cursor),
    }
}

/// Chooses the order in which a clause's literals are compiled.
///
/// Starting from the entry, greedily takes the literal whose code is already present the
/// furthest, so that new clauses reuse existing code. Once nothing more can be shared, the
/// remaining literals go most specific first: more symbols, then fewer variables.
pub fn literal_order(store: &CodeStore, clause: &Clause, reorder: bool) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..clause.len()).collect();
    if !reorder {
        return remaining;
    }
    remaining.sort_by_key(|&i| {
        let literal = &clause.literals[i];
        let mut vars: Vec<AtomId> = literal.iter_vars().collect();
        vars.sort();
        vars.dedup();
        (Reverse(literal.symbol_count()), vars.len(), i)
    });

    let mut order = vec![];
    let mut cursor = store.entry.map(CodeAddr::start);
    while let Some(addr) = cursor {
        if remaining.is_empty() {
            break;
        }
        let mut best: Option<(usize, Sharing)> = None;
        for (pos, &i) in remaining.iter().enumerate() {
            let sharing = eval_sharing(store, addr, &clause.literals[i]);
            if best.as_ref().map_or(true, |(_, b)| sharing.shared > b.shared) {
                best = Some((pos, sharing));
            }
        }
        let Some((pos, sharing)) = best else {
            break;
        };
        if sharing.shared == 0 {
            break;
        }
        order.push(remaining.remove(pos));
        cursor = sharing.end.and_then(|end| {
            store
                .chain(end)
                .into_iter()
                .find(|member| matches!(store.op(*member).instr, Instruction::LitEnd(_)))
                .map(|lit_end| lit_end.next())
        });
    }
    order.extend(remaining);
    order
}

/// Where the unshared part of new code gets linked in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Attach {
    /// The store is empty.
    Entry,

    /// As the alternative of the last member of the chain that starts at head.
    Alternative {
        last: CodeAddr,
        head: CodeAddr,
        check_functors: usize,
    },

    /// As a new entry in the table of the dispatch at this address.
    Dispatch { dispatch: CodeAddr, functor: Functor },
}

struct SharedPrefix {
    /// How many ops are already in the store.
    shared: usize,

    /// The record of the last LitEnd in the shared part.
    last_literal: Option<LiteralId>,

    /// None if every op was found, which only happens for an id that is already stored.
    attach: Option<Attach>,
}

fn match_code(store: &CodeStore, ops: &[CompiledOp]) -> SharedPrefix {
    let mut cursor = match store.entry {
        Some(entry) => CodeAddr::start(entry),
        None => {
            return SharedPrefix {
                shared: 0,
                last_literal: None,
                attach: Some(Attach::Entry),
            }
        }
    };
    let mut last_literal = None;
    for (i, op) in ops.iter().enumerate() {
        let head = cursor;
        let mut member = cursor;
        let mut check_functors = 0;
        let found = loop {
            let code = store.op(member);
            if let (Instruction::Dispatch(table), Some(functor)) = (code.instr, op.functor()) {
                match store.table(table).lookup(functor) {
                    Some(target) => break CodeAddr::start(target),
                    None => {
                        return SharedPrefix {
                            shared: i,
                            last_literal,
                            attach: Some(Attach::Dispatch {
                                dispatch: member,
                                functor,
                            }),
                        }
                    }
                }
            }
            if op.matches(store, &code.instr) {
                break member;
            }
            if code.instr.is_check_functor() {
                check_functors += 1;
            }
            match code.alternative {
                Some(alt) => member = CodeAddr::start(alt),
                None => {
                    return SharedPrefix {
                        shared: i,
                        last_literal,
                        attach: Some(Attach::Alternative {
                            last: member,
                            head,
                            check_functors,
                        }),
                    }
                }
            }
        };
        if let Instruction::LitEnd(id) = store.op(found).instr {
            last_literal = Some(id);
        }
        if store.op(found).instr.is_terminal() {
            break;
        }
        cursor = found.next();
    }
    SharedPrefix {
        shared: ops.len(),
        last_literal,
        attach: None,
    }
}

/// Turns compiled ops into store instructions, creating the records for their LitEnds.
fn build_block(
    store: &mut CodeStore,
    ops: &[CompiledOp],
    mut previous: Option<LiteralId>,
) -> Vec<OpCode> {
    let mut depth = previous.map_or(0, |id| store.literal(id).depth + 1);
    ops.iter()
        .map(|op| {
            let instr = match op {
                CompiledOp::CheckFunctor(f) => Instruction::CheckFunctor(*f),
                CompiledOp::AssignVar(slot) => Instruction::AssignVar(*slot),
                CompiledOp::CheckVar(slot) => Instruction::CheckVar(*slot),
                CompiledOp::Success(id) => Instruction::Success(*id),
                CompiledOp::LitEnd(template) => {
                    let record =
                        LiteralRecord::new(depth, previous, template.global_vars.clone());
                    let id = store.new_literal(record);
                    previous = Some(id);
                    depth += 1;
                    Instruction::LitEnd(id)
                }
            };
            OpCode::new(instr)
        })
        .collect()
}

/// Moves the CheckFunctors of the chain at head into a dispatch table.
///
/// The head is moved to the start of a block first, by splitting its block or by putting a
/// new block in front of the entry, so that every member can be a table target. The
/// dispatch takes the head's place, and the members that aren't CheckFunctors become its
/// chain of alternatives.
fn compress_check_fn_ops(store: &mut CodeStore, head: CodeAddr) {
    let (dispatch_block, head_block) = if head.offset > 0 {
        let tail = store.split_block(head.block, head.offset);
        (Some(head.block), tail)
    } else if store.entry == Some(head.block) {
        (None, head.block)
    } else {
        debug_assert!(false, "chain head {} is not reached in sequence", head);
        return;
    };

    let mut entries = vec![];
    let mut others: Vec<BlockId> = vec![];
    for member in store.chain(CodeAddr::start(head_block)) {
        debug_assert_eq!(member.offset, 0);
        match store.op(member).instr {
            Instruction::CheckFunctor(f) => entries.push((f, member.block)),
            _ => others.push(member.block),
        }
    }
    for &(_, block) in &entries {
        store.op_mut(CodeAddr::start(block)).alternative = None;
    }
    for pair in others.windows(2) {
        store.op_mut(CodeAddr::start(pair[0])).alternative = Some(pair[1]);
    }
    if let Some(&last) = others.last() {
        store.op_mut(CodeAddr::start(last)).alternative = None;
    }

    trace!(
        head = %head,
        functors = entries.len(),
        others = others.len(),
        "compressing check-functor chain"
    );
    let table = store.new_table(DispatchTable::new(entries));
    let dispatch = OpCode {
        instr: Instruction::Dispatch(table),
        alternative: others.first().copied(),
    };
    match dispatch_block {
        Some(block) => store.block_mut(block).push(dispatch),
        None => {
            let block = store.new_block(vec![dispatch]);
            store.entry = Some(block);
        }
    }
}

/// Merges compiled code into the store. Returns the number of ops that were already there.
pub fn insert_code(store: &mut CodeStore, ops: &[CompiledOp], dispatch_threshold: usize) -> usize {
    let prefix = match_code(store, ops);
    let Some(attach) = prefix.attach else {
        debug_assert!(false, "the same code was inserted twice");
        return prefix.shared;
    };
    let code = build_block(store, &ops[prefix.shared..], prefix.last_literal);
    let block = store.new_block(code);
    match attach {
        Attach::Entry => store.entry = Some(block),
        Attach::Alternative {
            last,
            head,
            check_functors,
        } => {
            store.op_mut(last).alternative = Some(block);
            if ops[prefix.shared].functor().is_some() && check_functors + 1 > dispatch_threshold {
                compress_check_fn_ops(store, head);
            }
        }
        Attach::Dispatch { dispatch, functor } => {
            if let Instruction::Dispatch(table) = store.op(dispatch).instr {
                store.table_mut(table).insert(functor, block);
            }
        }
    }
    prefix.shared
}

/// How a block on a clause's path is reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ParentRef {
    Entry,
    Alternative(CodeAddr),
    DispatchTarget { dispatch: CodeAddr, functor: Functor },
}

#[derive(Clone, Debug)]
pub struct ClausePath {
    /// The address of every instruction of the clause, in order.
    pub addrs: Vec<CodeAddr>,

    // The blocks the path runs through, with how each is entered.
    blocks: Vec<(BlockId, ParentRef)>,
}

/// Locates the instructions that execute exactly the given code, ending in its Success.
pub fn find_path(store: &CodeStore, ops: &[CompiledOp]) -> Option<ClausePath> {
    let entry = store.entry?;
    let mut blocks = vec![(entry, ParentRef::Entry)];
    let mut addrs = vec![];
    let mut cursor = CodeAddr::start(entry);
    for op in ops {
        let mut member = cursor;
        let mut parent = None;
        loop {
            let code = store.op(member);
            if let (Instruction::Dispatch(table), Some(functor)) = (code.instr, op.functor()) {
                let target = store.table(table).lookup(functor)?;
                parent = Some(ParentRef::DispatchTarget {
                    dispatch: member,
                    functor,
                });
                member = CodeAddr::start(target);
                break;
            }
            if op.matches(store, &code.instr) {
                break;
            }
            parent = Some(ParentRef::Alternative(member));
            member = CodeAddr::start(code.alternative?);
        }
        if let Some(parent) = parent {
            blocks.push((member.block, parent));
        }
        addrs.push(member);
        if store.op(member).instr.is_terminal() {
            break;
        }
        cursor = member.next();
    }
    if addrs.len() != ops.len() {
        return None;
    }
    Some(ClausePath { addrs, blocks })
}

/// Detaches the code of one clause from the store.
///
/// Only the tail of the path's last block belongs to this clause alone, from the last
/// instruction that has an alternative onward. That alternative's block is moved into its
/// place. If no instruction in the block has an alternative, the whole block goes, and the
/// reference to it is dropped. Emptying a dispatch table repeats the process on the block
/// holding the dispatch.
pub fn remove_path(store: &mut CodeStore, path: &ClausePath) {
    for &(block, parent) in path.blocks.iter().rev() {
        let spliced = store
            .block(block)
            .iter()
            .rposition(|op| op.alternative.is_some());
        if let Some(k) = spliced {
            let ops = store.block_mut(block);
            let alternative = ops[k].alternative;
            let removed = ops.split_off(k);
            if let Some(alternative) = alternative {
                let moved = store.free_block(alternative);
                store.block_mut(block).extend(moved);
            }
            trace!(block, offset = k, "spliced alternative into removed code");
            store.release(&removed);
            return;
        }

        let removed = store.free_block(block);
        store.release(&removed);
        match parent {
            ParentRef::Entry => {
                store.entry = None;
                return;
            }
            ParentRef::Alternative(addr) => {
                store.op_mut(addr).alternative = None;
                return;
            }
            ParentRef::DispatchTarget { dispatch, functor } => {
                let Instruction::Dispatch(table) = store.op(dispatch).instr else {
                    return;
                };
                store.table_mut(table).remove(functor);
                if !store.table(table).is_empty() {
                    return;
                }
                trace!(dispatch = %dispatch, "dispatch table emptied");
            }
        }
    }
}
