// The clause matcher searches for stored clauses whose literals all match distinct query
// literals under one substitution.
//
// It keeps a stack of literal matchers. The bottom one runs from the entry. Each time a
// matcher reports a LitEnd, the code after it is the code for the next literal of every stored
// clause that starts with the literals matched so far, so a new matcher is pushed there.
// A matcher that is exhausted is popped. When a stored clause ends at a matcher's entry, the
// cached matches of its literals are combined, looking for one match per literal that uses
// distinct query literals and binds every variable consistently.

use std::collections::HashMap;
use tracing::trace;

use crate::code_tree::instruction::{ClauseId, CodeAddr, LiteralId};
use crate::code_tree::literal_matcher::{LitInfo, LiteralMatcher, MatchEvent};
use crate::code_tree::store::{CodeStore, LiteralRecord, MatchInfo};
use crate::code_tree::{StoredClause, SubsumptionMatch};
use crate::kernel::clause::Clause;
use crate::kernel::variable_map::VariableMap;

pub struct ClauseMatcher<'a> {
    store: &'a mut CodeStore,
    clauses: &'a HashMap<ClauseId, StoredClause>,

    lit_infos: Vec<LitInfo>,
    query_len: usize,
    subsumption_resolution: bool,

    matchers: Vec<LiteralMatcher>,
    results: usize,
}

impl<'a> ClauseMatcher<'a> {
    /// Starts a new query. This begins a new epoch, so nothing cached by earlier queries is used.
    pub fn new(
        store: &'a mut CodeStore,
        clauses: &'a HashMap<ClauseId, StoredClause>,
        query: &Clause,
        subsumption_resolution: bool,
    ) -> ClauseMatcher<'a> {
        let epoch = store.next_epoch();
        trace!(epoch, query = %query, subsumption_resolution, "starting query");
        let mut matcher = ClauseMatcher {
            store,
            clauses,
            lit_infos: LitInfo::candidates(query, subsumption_resolution),
            query_len: query.len(),
            subsumption_resolution,
            matchers: vec![],
            results: 0,
        };
        if let Some(entry) = matcher.store.entry {
            matcher.enter_literal(CodeAddr::start(entry), None);
        }
        matcher
    }

    /// Pushes a matcher for the code at entry.
    /// Once every query literal could be used up, only clause ends are worth looking for.
    fn enter_literal(&mut self, entry: CodeAddr, via: Option<LiteralId>) {
        let depth = self.matchers.len();
        let matcher = LiteralMatcher::new(
            self.store,
            entry,
            via,
            &self.lit_infos,
            depth >= self.query_len,
        );
        self.matchers.push(matcher);
    }

    fn leave_literal(&mut self) {
        self.matchers.pop();
    }

    fn lit_end_already_visited(&mut self, id: LiteralId) -> bool {
        let record = self.store.literal_mut(id);
        if record.visited {
            return true;
        }
        record.visited = true;
        false
    }

    /// The next stored clause that subsumes the query, or resolves with it.
    pub fn next(&mut self) -> Option<SubsumptionMatch> {
        loop {
            let Some(top) = self.matchers.last_mut() else {
                trace!(results = self.results, "query exhausted");
                return None;
            };
            let via = top.via();
            match top.next() {
                None => self.leave_literal(),
                Some(MatchEvent::Success(id)) => {
                    if let Some(answer) = self.check_candidate(id, via) {
                        self.results += 1;
                        return Some(answer);
                    }
                }
                Some(MatchEvent::LitEnd(addr, id)) => {
                    if !self.lit_end_already_visited(id) {
                        self.enter_literal(addr.next(), Some(id));
                    }
                }
            }
        }
    }

    /// Decides whether the clause that ends after the literal record via is a match.
    /// Plain subsumption is tried before subsumption resolution.
    fn check_candidate(&self, id: ClauseId, via: Option<LiteralId>) -> Option<SubsumptionMatch> {
        let stored = self.clauses.get(&id)?;
        let mut chain = vec![];
        let mut current = via;
        while let Some(literal) = current {
            chain.push(literal);
            current = self.store.literal(literal).previous;
        }
        chain.reverse();
        debug_assert_eq!(chain.len(), stored.literal_order.len());

        if let Some(choice) = self.match_global_vars(&chain, stored.global_vars.len(), 0) {
            return Some(self.build_match(id, stored, &chain, &choice));
        }
        if self.subsumption_resolution {
            if let Some(choice) = self.match_global_vars(&chain, stored.global_vars.len(), 1) {
                return Some(self.build_match(id, stored, &chain, &choice));
            }
        }
        None
    }

    /// Whether a match agrees with the global variables bound so far.
    fn compatible(
        &self,
        record: &LiteralRecord,
        info: &MatchInfo,
        globals: &[Option<(usize, usize)>],
    ) -> bool {
        let tape = &self.lit_infos[info.li_index as usize].tape;
        record
            .global_vars
            .iter()
            .zip(info.bindings.iter())
            .all(|(&g, &pos)| match globals[g as usize] {
                Some((li_index, bound)) => {
                    self.lit_infos[li_index].tape.subterm_at(bound)
                        == tape.subterm_at(pos as usize)
                }
                None => true,
            })
    }

    /// Picks one cached match for each literal record in the chain, such that the matches use
    /// distinct query literals, at most allowed_opposite of them match a complement, and every
    /// global variable is bound to a single subterm. Returns the index of the chosen match for
    /// each record.
    fn match_global_vars(
        &self,
        chain: &[LiteralId],
        num_globals: usize,
        allowed_opposite: usize,
    ) -> Option<Vec<usize>> {
        let mut chosen: Vec<usize> = Vec::with_capacity(chain.len());
        let mut next_try = vec![0; chain.len()];
        let mut globals: Vec<Option<(usize, usize)>> = vec![None; num_globals];
        let mut trail: Vec<usize> = vec![];
        let mut marks: Vec<usize> = vec![];
        let mut used = vec![false; self.query_len];
        let mut opposite = 0;

        loop {
            let depth = chosen.len();
            if depth == chain.len() {
                return Some(chosen);
            }
            let record = self.store.literal(chain[depth]);
            let mut advanced = false;
            while next_try[depth] < record.matches.len() {
                let index = next_try[depth];
                next_try[depth] += 1;
                let info = &record.matches[index];
                let li = &self.lit_infos[info.li_index as usize];
                if used[li.lit_index] || (li.opposite && opposite >= allowed_opposite) {
                    continue;
                }
                if !self.compatible(record, info, &globals) {
                    continue;
                }
                marks.push(trail.len());
                for (&g, &pos) in record.global_vars.iter().zip(info.bindings.iter()) {
                    let g = g as usize;
                    if globals[g].is_none() {
                        globals[g] = Some((li.li_index, pos as usize));
                        trail.push(g);
                    }
                }
                used[li.lit_index] = true;
                if li.opposite {
                    opposite += 1;
                }
                chosen.push(index);
                advanced = true;
                break;
            }
            if advanced {
                continue;
            }

            // Nothing left at this depth, so undo the choice one level up.
            next_try[depth] = 0;
            let index = chosen.pop()?;
            let record = self.store.literal(chain[depth - 1]);
            let li = &self.lit_infos[record.matches[index].li_index as usize];
            used[li.lit_index] = false;
            if li.opposite {
                opposite -= 1;
            }
            let mark = marks.pop().unwrap_or(0);
            for g in trail.drain(mark..) {
                globals[g] = None;
            }
        }
    }

    fn build_match(
        &self,
        id: ClauseId,
        stored: &StoredClause,
        chain: &[LiteralId],
        choice: &[usize],
    ) -> SubsumptionMatch {
        let mut literal_map = vec![0; chain.len()];
        let mut substitution = VariableMap::new();
        let mut resolved_literal = None;
        for (depth, (&literal, &index)) in chain.iter().zip(choice).enumerate() {
            let record = self.store.literal(literal);
            let info = &record.matches[index];
            let li = &self.lit_infos[info.li_index as usize];
            literal_map[stored.literal_order[depth]] = li.lit_index;
            if li.opposite {
                resolved_literal = Some(li.lit_index);
            }
            for (&g, &pos) in record.global_vars.iter().zip(info.bindings.iter()) {
                let var = stored.global_vars[g as usize];
                if !substitution.has_mapping(var) {
                    substitution.set(var, li.tape.to_term(pos as usize));
                }
            }
        }
        trace!(clause = %id, resolved = ?resolved_literal, "matched stored clause");
        SubsumptionMatch {
            clause: id,
            resolved_literal,
            literal_map,
            substitution,
        }
    }
}
