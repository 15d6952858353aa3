//! Merging of equivalent DFA states.

use std::collections::HashSet;

use bit_vec::BitVec;
use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::automaton::{Automaton, State, Transition};

/// How [`Automaton::minimize_with`] looks for states to merge.
///
/// Two states are merged when they agree on finality and go to the same
/// state on every letter. The surviving state keeps its incoming and
/// outgoing transitions, the other state disappears. The initial state and
/// [`State::Dead`] are never the ones removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Merge {
    /// One sweep over all pairs of states. This is an approximation: a pair
    /// whose rows only become identical after a later merge is missed.
    #[default]
    SinglePass,
    /// Sweeps until a full sweep merges nothing. States that only agree up to
    /// a cycle through each other still survive as separate states.
    Fixpoint,
    /// Moore partition refinement over all states, then one merge per class.
    /// The result has the fewest states among the given ones.
    Refine,
}

impl Automaton {
    /// Single-pass pairwise merge, see [`Merge::SinglePass`].
    ///
    /// The automaton must be deterministic.
    pub fn minimize(&self) -> Automaton {
        self.minimize_with(Merge::SinglePass)
    }

    pub fn minimize_with(&self, merge: Merge) -> Automaton {
        let mut reduction = Reduction::new(self);
        let merged = match merge {
            Merge::SinglePass => reduction.sweep(),
            Merge::Fixpoint => {
                let mut total = 0;
                loop {
                    let merged = reduction.sweep();
                    total += merged;
                    if merged == 0 {
                        break total;
                    }
                }
            }
            Merge::Refine => reduction.refine(),
        };
        debug!("{:?} minimization merged {} states", merge, merged);
        reduction.finish()
    }
}

/// Working copy of a DFA, states and letters referred to by index.
struct Reduction<'a> {
    dfa: &'a Automaton,
    alive: BitVec,
    finals: BitVec,
    // state -> letter -> destination
    rows: Vec<Vec<Option<usize>>>,
    initial: Option<usize>,
    dead: Option<usize>,
}

impl<'a> Reduction<'a> {
    fn new(dfa: &'a Automaton) -> Self {
        let states = dfa.states();
        let width = dfa.alphabet().len();
        let mut rows = vec![vec![None; width]; states.len()];
        for transition in dfa.transitions() {
            let source = states.get_index_of(&transition.source);
            let letter = transition
                .symbol
                .as_letter()
                .and_then(|letter| dfa.alphabet().get_index_of(letter));
            let destination = transition
                .destinations
                .iter()
                .next()
                .and_then(|state| states.get_index_of(state));
            if let (Some(source), Some(letter), Some(destination)) = (source, letter, destination) {
                rows[source][letter].get_or_insert(destination);
            }
        }

        let mut finals = BitVec::from_elem(states.len(), false);
        for state in dfa.final_states() {
            if let Some(index) = states.get_index_of(state) {
                finals.set(index, true);
            }
        }

        Reduction {
            dfa,
            alive: BitVec::from_elem(states.len(), true),
            finals,
            rows,
            initial: states.get_index_of(dfa.initial_state()),
            dead: states.get_index_of(&State::Dead),
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn equivalent(&self, a: usize, b: usize) -> bool {
        self.finals[a] == self.finals[b] && self.rows[a] == self.rows[b]
    }

    fn remove(&mut self, remove: usize, replace: usize) {
        debug!(
            "merging {} into {}",
            self.dfa.states()[remove],
            self.dfa.states()[replace]
        );
        self.alive.set(remove, false);
        self.finals.set(remove, false);
        self.rows[remove].iter_mut().for_each(|dest| *dest = None);
        for dest in self.rows.iter_mut().flat_map(|row| row.iter_mut()) {
            if *dest == Some(remove) {
                *dest = Some(replace);
            }
        }
    }

    /// One pass over all ordered pairs of live states.
    fn sweep(&mut self) -> usize {
        let mut merged = 0;
        for a in 0..self.len() {
            for b in 0..self.len() {
                if a == b || !self.alive[a] || !self.alive[b] || !self.equivalent(a, b) {
                    continue;
                }
                let (remove, replace) = if Some(a) == self.initial { (b, a) } else { (a, b) };
                if Some(remove) == self.dead {
                    continue;
                }
                self.remove(remove, replace);
                merged += 1;
                if remove == a {
                    break;
                }
            }
        }
        merged
    }

    fn refine(&mut self) -> usize {
        let live: Vec<usize> = (0..self.len()).filter(|&i| self.alive[i]).collect();
        let mut class: Vec<usize> = (0..self.len()).map(|i| self.finals[i] as usize).collect();
        let mut classes = live.iter().map(|&i| class[i]).collect::<HashSet<_>>().len();

        loop {
            let mut signatures: IndexMap<(usize, Vec<Option<usize>>), usize> = IndexMap::new();
            let mut next = vec![0; self.len()];
            for &i in &live {
                let row = self.rows[i].iter().map(|dest| dest.map(|d| class[d])).collect();
                let fresh = signatures.len();
                next[i] = *signatures.entry((class[i], row)).or_insert(fresh);
            }
            class = next;
            if signatures.len() == classes {
                break;
            }
            classes = signatures.len();
        }

        let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
        for &i in &live {
            groups.entry(class[i]).or_default().push(i);
        }

        let mut merged = 0;
        for members in groups.values() {
            let keep = members
                .iter()
                .copied()
                .find(|&i| Some(i) == self.initial)
                .or_else(|| members.iter().copied().find(|&i| Some(i) == self.dead))
                .unwrap_or(members[0]);
            for &i in members {
                if i != keep && Some(i) != self.dead {
                    self.remove(i, keep);
                    merged += 1;
                }
            }
        }
        merged
    }

    fn finish(self) -> Automaton {
        let dfa = self.dfa;
        let states = dfa.states();
        let alive = |state: &State| {
            states
                .get_index_of(state)
                .map_or(false, |index| self.alive[index])
        };

        let mut emitted = HashSet::new();
        let mut transitions = Vec::new();
        for transition in dfa.transitions() {
            let (Some(source), Some(letter)) = (
                states.get_index_of(&transition.source),
                transition
                    .symbol
                    .as_letter()
                    .and_then(|letter| dfa.alphabet().get_index_of(letter)),
            ) else {
                continue;
            };
            if !self.alive[source] || !emitted.insert((source, letter)) {
                continue;
            }
            if let Some(destination) = self.rows[source][letter] {
                transitions.push(Transition::new(
                    transition.source.clone(),
                    transition.symbol.clone(),
                    std::iter::once(states[destination].clone()),
                ));
            }
        }

        Automaton::from_parts(
            dfa.initial_state().clone(),
            dfa.final_states().iter().filter(|s| alive(*s)).cloned().collect(),
            states.iter().filter(|s| alive(*s)).cloned().collect::<IndexSet<_>>(),
            dfa.alphabet().clone(),
            transitions,
        )
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::automaton::Symbol;
    use crate::testing::{same_language, SmallNfa};

    fn q(name: &str) -> State {
        State::simple(name)
    }

    fn on(from: &str, letter: &str, to: &str) -> Transition {
        Transition::new(q(from), Symbol::letter(letter), vec![q(to)])
    }

    fn dfa(
        states: &[&str],
        finals: &[&str],
        letters: &[&str],
        transitions: Vec<Transition>,
    ) -> Automaton {
        Automaton::new_dfa(
            q(states[0]),
            finals.iter().map(|s| q(s)),
            states.iter().map(|s| q(s)),
            letters.iter().cloned(),
            transitions,
        )
        .unwrap()
    }

    fn names(automaton: &Automaton) -> Vec<String> {
        automaton.states().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_rows_are_merged() {
        let input = dfa(
            &["A", "B", "C", "D"],
            &["D"],
            &["a", "b"],
            vec![
                on("A", "a", "B"),
                on("A", "b", "C"),
                on("B", "a", "D"),
                on("B", "b", "D"),
                on("C", "a", "D"),
                on("C", "b", "D"),
                on("D", "a", "D"),
                on("D", "b", "D"),
            ],
        );
        let reduced = input.minimize();

        assert_eq!(names(&reduced), vec!["A", "C", "D"]);
        assert!(reduced.transitions().contains(&on("A", "a", "C")));
        assert!(reduced.transitions().contains(&on("A", "b", "C")));
        assert!(reduced.transitions().iter().all(|t| t.source != q("B")));
        assert_eq!(reduced.transitions().len(), 6);
        assert!(reduced.is_deterministic());
        // the input is left alone
        assert_eq!(input.states().len(), 4);
        assert!(input.transitions().contains(&on("A", "a", "B")));
    }

    #[test]
    fn initial_state_survives() {
        let input = dfa(
            &["A", "B", "C"],
            &["C"],
            &["a"],
            vec![on("A", "a", "C"), on("B", "a", "C"), on("C", "a", "C")],
        );
        let reduced = input.minimize();
        assert_eq!(names(&reduced), vec!["A", "C"]);
        assert_eq!(reduced.initial_state(), &q("A"));
    }

    #[test]
    fn dead_state_survives() {
        let nfa = dfa(
            &["q0", "q1", "q2"],
            &["q2"],
            &["a", "b"],
            vec![on("q0", "a", "q1"), on("q1", "a", "q2")],
        );
        let determinized = nfa.to_dfa(None).dfa;
        let reduced = determinized.minimize();
        // q2 is the only final state, so it cannot merge into DEAD
        assert!(reduced.has_state(&State::Dead));
        assert!(reduced.has_state(&q("q2")));
        assert!(same_language(&nfa, &reduced, 5));
    }

    #[test]
    fn state_equal_to_dead_merges_into_it() {
        let input = Automaton::new_dfa(
            q("A"),
            vec![q("B")],
            vec![q("A"), q("B"), q("X"), State::Dead],
            vec!["a"],
            vec![
                on("A", "a", "B"),
                Transition::new(q("B"), Symbol::letter("a"), vec![q("X")]),
                Transition::new(q("X"), Symbol::letter("a"), vec![State::Dead]),
                Transition::new(State::Dead, Symbol::letter("a"), vec![State::Dead]),
            ],
        )
        .unwrap();
        let reduced = input.minimize();
        assert_eq!(names(&reduced), vec!["A", "B", "DEAD"]);
        assert_eq!(
            reduced.next_state(&q("B"), &Symbol::letter("a")),
            Some(&State::Dead)
        );
    }

    #[test]
    fn initial_equal_to_dead_keeps_both() {
        let input = Automaton::new_dfa(
            q("A"),
            vec![],
            vec![q("A"), State::Dead],
            vec!["a"],
            vec![
                Transition::new(q("A"), Symbol::letter("a"), vec![State::Dead]),
                Transition::new(State::Dead, Symbol::letter("a"), vec![State::Dead]),
            ],
        )
        .unwrap();
        for merge in [Merge::SinglePass, Merge::Fixpoint, Merge::Refine] {
            assert_eq!(input.minimize_with(merge).states().len(), 2, "{merge:?}");
        }
    }

    // B and C only become identical once D and E are merged, which a single
    // sweep does after it has already compared B with C.
    fn late_merge() -> Automaton {
        dfa(
            &["A", "B", "C", "D", "E", "F"],
            &["F"],
            &["a", "b"],
            vec![
                on("A", "a", "B"),
                on("A", "b", "C"),
                on("B", "a", "D"),
                on("C", "a", "E"),
                on("D", "a", "F"),
                on("E", "a", "F"),
                on("F", "a", "F"),
            ],
        )
    }

    #[test]
    fn single_pass_misses_late_merges() {
        let reduced = late_merge().minimize();
        assert_eq!(names(&reduced), vec!["A", "B", "C", "E", "F"]);
        assert!(same_language(&late_merge(), &reduced, 5));
    }

    #[test]
    fn fixpoint_catches_late_merges() {
        let reduced = late_merge().minimize_with(Merge::Fixpoint);
        assert_eq!(names(&reduced), vec!["A", "C", "E", "F"]);
        assert_eq!(late_merge().minimize_with(Merge::Refine).states().len(), 4);
    }

    #[test]
    fn refine_merges_cycles() {
        let input = dfa(
            &["A", "B", "C"],
            &[],
            &["a"],
            vec![on("A", "a", "B"), on("B", "a", "C"), on("C", "a", "B")],
        );
        assert_eq!(input.minimize_with(Merge::Fixpoint).states().len(), 2);

        let refined = input.minimize_with(Merge::Refine);
        assert_eq!(names(&refined), vec!["A"]);
        assert_eq!(refined.transitions(), &[on("A", "a", "A")]);
    }

    #[test]
    fn finality_keeps_states_apart() {
        let input = dfa(
            &["A", "B"],
            &["B"],
            &["a"],
            vec![on("A", "a", "A"), on("B", "a", "A")],
        );
        for merge in [Merge::SinglePass, Merge::Fixpoint, Merge::Refine] {
            assert_eq!(input.minimize_with(merge), input, "{merge:?}");
        }
    }

    #[quickcheck]
    fn minimization_preserves_language(nfa: SmallNfa) -> bool {
        let determinized = nfa.0.to_dfa(None).dfa;
        [Merge::SinglePass, Merge::Fixpoint, Merge::Refine]
            .iter()
            .all(|&merge| {
                let reduced = determinized.minimize_with(merge);
                reduced.is_deterministic() && same_language(&nfa.0, &reduced, 5)
            })
    }

    #[quickcheck]
    fn minimization_never_grows(nfa: SmallNfa) -> bool {
        let determinized = nfa.0.to_dfa(None).dfa;
        let single = determinized.minimize().states().len();
        let fixpoint = determinized.minimize_with(Merge::Fixpoint).states().len();
        let refined = determinized.minimize_with(Merge::Refine).states().len();
        refined <= fixpoint && fixpoint <= single && single <= determinized.states().len()
    }
}
