// Clause-to-clause subsumption by plain backtracking over literal assignments.
//
// This is the slow checker. It tries every injective assignment of general literals to
// special literals, so it is exponential in the worst case, but it is simple enough to
// trust. Equalities are matched in both orientations.

use crate::kernel::clause::Clause;
use crate::kernel::literal::Literal;
use crate::kernel::variable_map::VariableMap;

/// The literal orientations worth trying when matching against a fixed target.
fn orientations(literal: &Literal) -> Vec<Literal> {
    if literal.is_equality() {
        vec![literal.clone(), literal.reversed()]
    } else {
        vec![literal.clone()]
    }
}

struct Search<'a> {
    general: &'a [Literal],
    special: &'a [Literal],

    // The special literal that must be matched in negated form, if any.
    resolved: Option<usize>,

    used: Vec<bool>,
    assignment: Vec<usize>,
}

impl<'a> Search<'a> {
    fn run(&mut self, map: &VariableMap) -> Option<VariableMap> {
        let depth = self.assignment.len();
        if depth == self.general.len() {
            return match self.resolved {
                Some(k) if !self.used[k] => None,
                _ => Some(map.clone()),
            };
        }
        let general = &self.general[depth];
        for t in 0..self.special.len() {
            if self.used[t] {
                continue;
            }
            let target = if self.resolved == Some(t) {
                self.special[t].negate()
            } else {
                self.special[t].clone()
            };
            for candidate in orientations(general) {
                let mut extended = map.clone();
                if !extended.match_literals(&candidate, &target) {
                    continue;
                }
                self.used[t] = true;
                self.assignment.push(t);
                if let Some(answer) = self.run(&extended) {
                    return Some(answer);
                }
                self.assignment.pop();
                self.used[t] = false;
            }
        }
        None
    }
}

/// Finds an injective assignment of the general clause's literals to the special clause's
/// literals, together with one substitution that makes every assigned pair equal.
/// With resolved = Some(k), exactly one general literal must match the negation of special
/// literal k, and every other one matches a special literal other than k.
/// Returns, for each general literal, the index of the special literal it was assigned to.
pub fn find_subsumption(
    general: &Clause,
    special: &Clause,
    resolved: Option<usize>,
) -> Option<(Vec<usize>, VariableMap)> {
    if general.len() > special.len() {
        return None;
    }
    if let Some(k) = resolved {
        if k >= special.len() {
            return None;
        }
    }
    let mut search = Search {
        general: &general.literals,
        special: &special.literals,
        resolved,
        used: vec![false; special.len()],
        assignment: vec![],
    };
    let map = search.run(&VariableMap::new())?;
    Some((search.assignment, map))
}

/// If general subsumes special, returns the substitution that witnesses it.
pub fn subsumes(general: &Clause, special: &Clause) -> Option<VariableMap> {
    find_subsumption(general, special, None).map(|(_, map)| map)
}

/// Whether special literal k can be removed by subsumption resolution with general.
pub fn resolves_on(general: &Clause, special: &Clause, k: usize) -> bool {
    find_subsumption(general, special, Some(k)).is_some()
}

/// The first special literal that subsumption resolution with general removes, if any.
pub fn subsumption_resolution(general: &Clause, special: &Clause) -> Option<usize> {
    (0..special.len()).find(|&k| resolves_on(general, special, k))
}
