// The literal matcher runs the code from one entry point against the query's literal
// candidates, one candidate at a time, and collects every LitEnd that some candidate reaches.
//
// Backtracking uses an explicit stack of (tape position, alternative block) points. A point is
// pushed whenever the current instruction has an alternative, and failure pops the most
// recent one. Slots bound on an abandoned branch are never read again, because any
// CheckVar on another branch comes after that branch's own AssignVar for the slot.

use smallvec::SmallVec;

use crate::code_tree::instruction::{BlockId, ClauseId, CodeAddr, Instruction, LiteralId};
use crate::code_tree::store::{CodeStore, MatchInfo};
use crate::kernel::clause::Clause;
use crate::kernel::flat_term::{FlatEntry, FlatTerm};

/// One way of presenting a query literal to the code.
#[derive(Clone, Debug)]
pub struct LitInfo {
    /// Position in the query's candidate list.
    pub li_index: usize,

    /// Which literal of the query clause this came from.
    pub lit_index: usize,

    pub tape: FlatTerm,

    /// Whether the tape is the complement of the query literal.
    pub opposite: bool,
}

impl LitInfo {
    /// Every candidate for a query clause. Equalities are also tried with their sides
    /// swapped. For subsumption resolution, complements are tried too.
    pub fn candidates(clause: &Clause, subsumption_resolution: bool) -> Vec<LitInfo> {
        let mut tapes: Vec<(usize, FlatTerm, bool)> = vec![];
        for (i, literal) in clause.iter().enumerate() {
            let tape = FlatTerm::from_literal(literal);
            let mut forms = vec![tape];
            if forms[0].is_equality_literal() {
                let reversed = forms[0].reversed();
                if reversed != forms[0] {
                    forms.push(reversed);
                }
            }
            let opposites: Vec<FlatTerm> = if subsumption_resolution {
                forms.iter().map(|tape| tape.opposite()).collect()
            } else {
                vec![]
            };
            tapes.extend(forms.into_iter().map(|tape| (i, tape, false)));
            tapes.extend(opposites.into_iter().map(|tape| (i, tape, true)));
        }
        tapes
            .into_iter()
            .enumerate()
            .map(|(li_index, (lit_index, tape, opposite))| LitInfo {
                li_index,
                lit_index,
                tape,
                opposite,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct BacktrackPoint {
    tp: usize,
    alt: BlockId,
}

/// What the matcher hands back to the clause matcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchEvent {
    /// A stored clause ends right at the entry point.
    Success(ClauseId),

    /// Some candidate matched the literal that ends at this LitEnd.
    LitEnd(CodeAddr, LiteralId),
}

pub struct LiteralMatcher {
    entry: CodeAddr,

    /// The record of the LitEnd that the entry follows. None at the root.
    via: Option<LiteralId>,

    successes: Vec<ClauseId>,
    lit_ends: Vec<(CodeAddr, LiteralId)>,
    next_success: usize,
    next_lit_end: usize,

    bindings: SmallVec<[u32; 8]>,
    backtrack: Vec<BacktrackPoint>,
}

impl LiteralMatcher {
    /// Creates a matcher at the entry and does all of its matching up front.
    /// With seek_only_success, only clauses ending at the entry are collected.
    pub fn new(
        store: &mut CodeStore,
        entry: CodeAddr,
        via: Option<LiteralId>,
        lit_infos: &[LitInfo],
        seek_only_success: bool,
    ) -> LiteralMatcher {
        let successes = store
            .chain(entry)
            .into_iter()
            .filter_map(|addr| match store.op(addr).instr {
                Instruction::Success(id) => Some(id),
                _ => None,
            })
            .collect();
        let mut matcher = LiteralMatcher {
            entry,
            via,
            successes,
            lit_ends: vec![],
            next_success: 0,
            next_lit_end: 0,
            bindings: SmallVec::new(),
            backtrack: vec![],
        };
        if !seek_only_success {
            matcher.do_eager_matching(store, lit_infos);
        }
        matcher
    }

    pub fn via(&self) -> Option<LiteralId> {
        self.via
    }

    /// Runs every candidate to exhaustion, caching each LitEnd match in its record.
    fn do_eager_matching(&mut self, store: &mut CodeStore, lit_infos: &[LitInfo]) {
        for info in lit_infos {
            self.run_candidate(store, info);
        }
    }

    fn run_candidate(&mut self, store: &mut CodeStore, info: &LitInfo) {
        let tape = info.tape.entries();
        self.backtrack.clear();
        let mut state = Some((self.entry, 0));
        loop {
            let (addr, tp) = match state.take() {
                Some(state) => state,
                None => match self.backtrack.pop() {
                    Some(point) => (CodeAddr::start(point.alt), point.tp),
                    None => return,
                },
            };
            let op = *store.op(addr);
            if let Some(alt) = op.alternative {
                self.backtrack.push(BacktrackPoint { tp, alt });
            }
            state = match op.instr {
                Instruction::CheckFunctor(f) => match tape.get(tp) {
                    Some(FlatEntry::Functor { functor, .. }) if *functor == f => {
                        Some((addr.next(), tp + 1))
                    }
                    _ => None,
                },
                Instruction::AssignVar(slot) => match tape.get(tp) {
                    Some(entry) => {
                        let slot = slot as usize;
                        if self.bindings.len() <= slot {
                            self.bindings.resize(slot + 1, 0);
                        }
                        self.bindings[slot] = tp as u32;
                        Some((addr.next(), tp + entry.span()))
                    }
                    None => None,
                },
                Instruction::CheckVar(slot) => match tape.get(tp) {
                    Some(entry) => {
                        let bound = self.bindings[slot as usize] as usize;
                        let span = entry.span();
                        if info.tape.subterm_at(bound) == &tape[tp..tp + span] {
                            Some((addr.next(), tp + span))
                        } else {
                            None
                        }
                    }
                    None => None,
                },
                Instruction::LitEnd(id) => {
                    if tp == tape.len() {
                        self.record(store, addr, id, info.li_index);
                    }
                    None
                }
                // Clauses that end here were collected up front.
                Instruction::Success(_) => None,
                Instruction::Dispatch(table) => match tape.get(tp) {
                    Some(FlatEntry::Functor { functor, .. }) => store
                        .table(table)
                        .lookup(*functor)
                        .map(|block| (CodeAddr::start(block), tp)),
                    _ => None,
                },
            };
        }
    }

    fn record(&mut self, store: &mut CodeStore, addr: CodeAddr, id: LiteralId, li_index: usize) {
        let epoch = store.epoch();
        let record = store.literal_mut(id);
        if record.epoch != epoch {
            record.epoch = epoch;
            record.matches.clear();
            record.visited = false;
            self.lit_ends.push((addr, id));
        }
        let var_count = record.var_count();
        record.matches.push(MatchInfo {
            li_index: li_index as u32,
            bindings: SmallVec::from_slice(&self.bindings[..var_count]),
        });
    }

    /// Clauses that end at the entry come first, then LitEnds in the order they were found.
    pub fn next(&mut self) -> Option<MatchEvent> {
        if let Some(&id) = self.successes.get(self.next_success) {
            self.next_success += 1;
            return Some(MatchEvent::Success(id));
        }
        let &(addr, id) = self.lit_ends.get(self.next_lit_end)?;
        self.next_lit_end += 1;
        Some(MatchEvent::LitEnd(addr, id))
    }
}
