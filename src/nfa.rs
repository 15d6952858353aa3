use std::collections::{BTreeSet, HashMap, HashSet};
use std::iter;
use std::mem;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use crate::automaton::{Automaton, State, Symbol, Transition};
use crate::closure::EpsilonGraph;

/// Outcome of [`Automaton::to_dfa`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Construction {
    pub dfa: Automaton,
    /// Number of states whose outgoing transitions were computed.
    pub steps_completed: usize,
    /// The step budget ran out while states were still waiting on the stack.
    /// The automaton is then a well-formed prefix of the full construction;
    /// to continue, start over with a larger budget.
    pub interrupted: bool,
}

impl Automaton {
    /// Removes epsilon moves by adding direct transitions.
    ///
    /// For every state `s` and letter `a` the new transition goes to the
    /// closure of everything reachable with `a` from the closure of `s`.
    /// Empty destination sets produce no transition. If the closure of the
    /// initial state meets a final state, the initial state becomes final.
    pub fn eliminate_epsilon(&self) -> Automaton {
        if !self.has_epsilon_transitions() {
            return self.clone();
        }

        let graph = EpsilonGraph::new(self.transitions());
        let closures: HashMap<&State, HashSet<State>> = self
            .states()
            .iter()
            .map(|state| (state, graph.closure(state)))
            .collect();

        let mut transitions = Vec::new();
        for state in self.states() {
            for letter in self.alphabet() {
                let symbol = Symbol::letter(letter.as_str());
                let mut destinations = BTreeSet::new();
                for member in &closures[state] {
                    for next in self.next_states(member, &symbol) {
                        match closures.get(&next) {
                            Some(closure) => destinations.extend(closure.iter().cloned()),
                            None => destinations.extend(graph.closure(&next)),
                        }
                    }
                }
                if !destinations.is_empty() {
                    transitions.push(Transition::new(state.clone(), symbol, destinations));
                }
            }
        }

        let mut finals = self.final_states().clone();
        let accepts_empty = closures
            .get(self.initial_state())
            .map_or(false, |closure| closure.iter().any(|s| self.is_final(s)));
        if accepts_empty {
            finals.insert(self.initial_state().clone());
        }

        debug!(
            "epsilon elimination: {} transitions became {}",
            self.transitions().len(),
            transitions.len()
        );
        Automaton::from_parts(
            self.initial_state().clone(),
            finals,
            self.states().clone(),
            self.alphabet().clone(),
            transitions,
        )
    }

    /// Subset construction.
    ///
    /// Epsilon moves are eliminated first. Starting from the initial state,
    /// every discovered set of states gets one transition per letter; letters
    /// without a destination go to the shared [`State::Dead`] sink, which loops
    /// on itself. A set is final if one of its members is.
    ///
    /// With a `step_budget`, at most that many states are expanded; see
    /// [`Construction::interrupted`].
    pub fn to_dfa(&self, step_budget: Option<usize>) -> Construction {
        let nfa = self.eliminate_epsilon();
        let alphabet: Vec<Symbol> = nfa.alphabet().iter().map(Symbol::letter).collect();

        // NFA states -> the DFA state standing for them
        let mut discovered: IndexMap<BTreeSet<State>, State> = IndexMap::new();
        let start = live(iter::once(nfa.initial_state().clone()));
        discovered.insert(start.clone(), nfa.initial_state().clone());

        let mut worklist = vec![start];
        let mut transitions = Vec::new();
        let mut steps_completed = 0;
        let mut interrupted = false;

        while let Some(members) = worklist.pop() {
            if step_budget.map_or(false, |budget| steps_completed >= budget) {
                interrupted = true;
                break;
            }
            let current = discovered[&members].clone();
            debug!("expanding {}", current);

            for symbol in &alphabet {
                let union = live(members.iter().flat_map(|member| nfa.next_states(member, symbol)));

                match label_of(&union) {
                    Some(next) => {
                        trace!("{}, {} -> {}", current, symbol, next);
                        transitions.push(Transition::new(
                            current.clone(),
                            symbol.clone(),
                            iter::once(next.clone()),
                        ));
                        if !discovered.contains_key(&union) {
                            discovered.insert(union.clone(), next);
                            worklist.push(union);
                        }
                    }
                    None => {
                        if !discovered.contains_key(&union) {
                            debug!("{} has no {} move, adding the DEAD state", current, symbol);
                            for letter in &alphabet {
                                transitions.push(Transition::new(
                                    State::Dead,
                                    letter.clone(),
                                    iter::once(State::Dead),
                                ));
                            }
                            discovered.insert(union, State::Dead);
                        }
                        transitions.push(Transition::new(
                            current.clone(),
                            symbol.clone(),
                            iter::once(State::Dead),
                        ));
                    }
                }
            }
            steps_completed += 1;
        }

        let finals: IndexSet<State> = discovered
            .iter()
            .filter(|(members, _)| members.iter().any(|member| nfa.is_final(member)))
            .map(|(_, state)| state.clone())
            .collect();

        debug!(
            "subset construction: {} states after {} steps{}",
            discovered.len(),
            steps_completed,
            if interrupted { " (interrupted)" } else { "" }
        );
        Construction {
            dfa: Automaton::from_parts(
                nfa.initial_state().clone(),
                finals,
                discovered.into_values().collect(),
                nfa.alphabet().clone(),
                transitions,
            ),
            steps_completed,
            interrupted,
        }
    }

    /// Runs the automaton on a word, following epsilon moves.
    pub fn accepts<S: AsRef<str>>(&self, word: &[S]) -> bool {
        let graph = EpsilonGraph::new(self.transitions());
        let mut cur_states = graph.closure(self.initial_state());
        let mut nxt_states = HashSet::new();
        for letter in word {
            let symbol = Symbol::letter(letter.as_ref());
            for state in &cur_states {
                for next in self.next_states(state, &symbol) {
                    nxt_states.extend(graph.closure(&next));
                }
            }
            cur_states.clear();
            mem::swap(&mut cur_states, &mut nxt_states);

            // stuck
            if cur_states.is_empty() {
                return false;
            }
        }
        cur_states.iter().any(|state| self.is_final(state))
    }
}

/// Drops the sink: it accepts nothing, so it adds nothing to a set.
fn live<I: IntoIterator<Item = State>>(states: I) -> BTreeSet<State> {
    states.into_iter().filter(|state| !state.is_dead()).collect()
}

/// The DFA state standing for a set of live NFA states, `None` for the
/// empty set.
///
/// Distinct sets get distinct labels: an automaton from [`Automaton::new`]
/// never shares a name between two states, and one from
/// [`Automaton::new_dfa`] only ever yields single-state sets.
fn label_of(set: &BTreeSet<State>) -> Option<State> {
    match set.len() {
        0 => None,
        1 => set.iter().next().cloned(),
        _ => State::combine(set.iter().flat_map(|state| state.members())),
    }
}
