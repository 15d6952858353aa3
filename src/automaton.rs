use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::iter;

use indexmap::IndexSet;
use itertools::Itertools;
use lazy_static::lazy_static;

use crate::error::{InvalidAutomaton, MalformedTransition, Result};

/// Label of the shared reject sink.
pub const DEAD: &str = "DEAD";
/// Rendering-only pseudo-state pointing at the initial state.
pub const INITIAL_STATE: &str = "INITIAL_STATE";
/// Rendering-only pseudo-state used for final-state markers.
pub const FINAL_STATE: &str = "FINAL_STATE";
/// Spelling of the epsilon symbol.
pub const LAMBDA: &str = "\u{03BB}";

lazy_static! {
    static ref RESERVED_NAMES: HashSet<&'static str> =
        [INITIAL_STATE, FINAL_STATE, DEAD].iter().cloned().collect();
}

/// A state of an automaton.
///
/// `Composite` always holds at least two names; a set of one name is the
/// `Simple` state itself. Use [`State::combine`] to get the canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    Simple(String),
    Composite(BTreeSet<String>),
    Dead,
}

impl State {
    pub fn simple<S: Into<String>>(name: S) -> Self {
        State::Simple(name.into())
    }

    /// Canonical state for a set of simple-state names, `None` for no names.
    pub fn combine<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        match names.len() {
            0 => None,
            1 => names.pop_first().map(State::Simple),
            _ => Some(State::Composite(names)),
        }
    }

    /// The simple-state names this state stands for, sorted.
    pub fn members(&self) -> Vec<&str> {
        match self {
            State::Simple(name) => vec![name.as_str()],
            State::Composite(names) => names.iter().map(String::as_str).collect(),
            State::Dead => Vec::new(),
        }
    }

    /// Parses a rendered label back into a state.
    ///
    /// `"{q1,q0}"` and `"{q0,q1}"` give the same composite state, `"{q0}"`
    /// gives `q0` and `"DEAD"` gives the sink.
    pub fn from_label(label: &str) -> Option<Self> {
        if label == DEAD {
            return Some(State::Dead);
        }
        match label.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            Some(inner) => {
                let names: Vec<&str> = inner.split(',').collect();
                if names.iter().all(|name| is_valid_name(name)) {
                    State::combine(names)
                } else {
                    None
                }
            }
            None if is_valid_name(label) => Some(State::simple(label)),
            None => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, State::Composite(_))
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, State::Dead)
    }

    fn validate(&self, kind: Kind) -> std::result::Result<(), InvalidAutomaton> {
        match self {
            State::Dead if kind == Kind::Dfa => return Ok(()),
            State::Dead => return Err(InvalidAutomaton::ReservedName(DEAD.to_owned())),
            State::Composite(names) if names.len() < 2 => {
                return Err(InvalidAutomaton::InvalidStateName(self.to_string()))
            }
            _ => {}
        }
        for name in self.members() {
            if RESERVED_NAMES.contains(name) {
                return Err(InvalidAutomaton::ReservedName(name.to_owned()));
            }
            if !is_valid_name(name) {
                return Err(InvalidAutomaton::InvalidStateName(name.to_owned()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            State::Simple(name) => f.write_str(name),
            State::Composite(names) => write!(f, "{{{}}}", names.iter().join(",")),
            State::Dead => f.write_str(DEAD),
        }
    }
}

// Names must survive a trip through the label syntax.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c == '{' || c == '}' || c == ',')
}

/// Whether a textual symbol denotes an epsilon move.
pub fn is_epsilon_token(symbol: &str) -> bool {
    let symbol = symbol.trim();
    symbol.is_empty() || symbol == LAMBDA
}

/// A transition label: an alphabet letter or the epsilon move.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Epsilon,
    Letter(String),
}

impl Symbol {
    pub fn letter<S: Into<String>>(letter: S) -> Self {
        Symbol::Letter(letter.into())
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Epsilon)
    }

    pub fn as_letter(&self) -> Option<&str> {
        match self {
            Symbol::Letter(letter) => Some(letter),
            Symbol::Epsilon => None,
        }
    }
}

impl From<&str> for Symbol {
    fn from(symbol: &str) -> Self {
        if is_epsilon_token(symbol) {
            Symbol::Epsilon
        } else {
            Symbol::letter(symbol)
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Symbol::Epsilon => f.write_str(LAMBDA),
            Symbol::Letter(letter) => f.write_str(letter),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub source: State,
    pub symbol: Symbol,
    pub destinations: BTreeSet<State>,
}

impl Transition {
    pub fn new<D>(source: State, symbol: Symbol, destinations: D) -> Self
    where
        D: IntoIterator<Item = State>,
    {
        Transition {
            source,
            symbol,
            destinations: destinations.into_iter().collect(),
        }
    }

    pub fn epsilon<D>(source: State, destinations: D) -> Self
    where
        D: IntoIterator<Item = State>,
    {
        Transition::new(source, Symbol::Epsilon, destinations)
    }

    /// The destination of a deterministic transition.
    pub fn destination(&self) -> Option<&State> {
        if self.destinations.len() == 1 {
            self.destinations.iter().next()
        } else {
            None
        }
    }
}

/// What [`Automaton::new`] and [`Automaton::new_dfa`] accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    /// Any automaton; no `DEAD` state and no name shared by two states.
    Nfa,
    /// A deterministic automaton, possibly with `DEAD` and overlapping
    /// composite states as produced by [`Automaton::to_dfa`].
    Dfa,
}

/// A finite automaton over string-named states.
///
/// Values are immutable once built; every pipeline stage returns a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Automaton {
    initial: State,
    finals: IndexSet<State>,
    states: IndexSet<State>,
    alphabet: IndexSet<String>,
    transitions: Vec<Transition>,
}

impl Automaton {
    /// Builds an automaton, rejecting anything that does not fit together.
    ///
    /// Duplicates in the declared collections are collapsed. Reserved names
    /// (the `DEAD` sink included), undeclared states or symbols, names
    /// belonging to two declared states and empty destination sets are errors.
    pub fn new<F, S, A, T>(
        initial: State,
        finals: F,
        states: S,
        alphabet: A,
        transitions: T,
    ) -> Result<Self>
    where
        F: IntoIterator<Item = State>,
        S: IntoIterator<Item = State>,
        A: IntoIterator,
        A::Item: Into<String>,
        T: IntoIterator<Item = Transition>,
    {
        let automaton =
            Automaton::build(Kind::Nfa, initial, finals, states, alphabet, transitions)?;

        if let Some(name) = automaton.shared_name() {
            return Err(InvalidAutomaton::SharedName(name).into());
        }
        Ok(automaton)
    }

    /// Builds a deterministic automaton, such as one read back after
    /// [`Automaton::to_dfa`].
    ///
    /// Besides the checks of [`Automaton::new`] minus the name sharing rule,
    /// every transition must be a single-destination letter move, unique per
    /// state and letter. [`State::Dead`] may be declared but no final state
    /// may be reachable from it.
    pub fn new_dfa<F, S, A, T>(
        initial: State,
        finals: F,
        states: S,
        alphabet: A,
        transitions: T,
    ) -> Result<Self>
    where
        F: IntoIterator<Item = State>,
        S: IntoIterator<Item = State>,
        A: IntoIterator,
        A::Item: Into<String>,
        T: IntoIterator<Item = Transition>,
    {
        let automaton =
            Automaton::build(Kind::Dfa, initial, finals, states, alphabet, transitions)?;

        if let Some((source, symbol)) = automaton.first_nondeterministic_move() {
            return Err(InvalidAutomaton::NotDeterministic(source, symbol).into());
        }
        if automaton.dead_state_accepts() {
            return Err(InvalidAutomaton::DeadStateAccepts.into());
        }
        Ok(automaton)
    }

    fn shared_name(&self) -> Option<String> {
        let mut owners = HashSet::new();
        self.states
            .iter()
            .flat_map(State::members)
            .find(|name| !owners.insert(*name))
            .map(str::to_owned)
    }

    fn first_nondeterministic_move(&self) -> Option<(State, Symbol)> {
        let mut seen = HashSet::new();
        self.transitions
            .iter()
            .find(|t| {
                let single = !t.symbol.is_epsilon() && t.destinations.len() == 1;
                !single || !seen.insert((&t.source, &t.symbol))
            })
            .map(|t| (t.source.clone(), t.symbol.clone()))
    }

    // Whether a final state is reachable from DEAD, DEAD itself included.
    fn dead_state_accepts(&self) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<&State> = self.states.get(&State::Dead).into_iter().collect();
        while let Some(state) = stack.pop() {
            if !visited.insert(state) {
                continue;
            }
            if self.is_final(state) {
                return true;
            }
            stack.extend(
                self.transitions
                    .iter()
                    .filter(|t| t.source == *state)
                    .flat_map(|t| &t.destinations),
            );
        }
        false
    }

    fn build<F, S, A, T>(
        kind: Kind,
        initial: State,
        finals: F,
        states: S,
        alphabet: A,
        transitions: T,
    ) -> Result<Self>
    where
        F: IntoIterator<Item = State>,
        S: IntoIterator<Item = State>,
        A: IntoIterator,
        A::Item: Into<String>,
        T: IntoIterator<Item = Transition>,
    {
        let states: IndexSet<State> = states.into_iter().collect();
        for state in &states {
            state.validate(kind)?;
        }
        initial.validate(kind)?;
        if !states.contains(&initial) {
            return Err(InvalidAutomaton::UnknownInitialState(initial).into());
        }

        let finals: IndexSet<State> = finals.into_iter().collect();
        for state in &finals {
            state.validate(kind)?;
            if !states.contains(state) {
                return Err(InvalidAutomaton::UnknownFinalState(state.clone()).into());
            }
        }

        let alphabet: IndexSet<String> = alphabet.into_iter().map(Into::into).collect();
        if alphabet.iter().any(|letter| is_epsilon_token(letter)) {
            return Err(InvalidAutomaton::EpsilonInAlphabet.into());
        }

        let transitions: Vec<Transition> = transitions.into_iter().collect();
        for transition in &transitions {
            if transition.destinations.is_empty() {
                return Err(MalformedTransition::EmptyDestinations {
                    from: transition.source.clone(),
                    symbol: transition.symbol.clone(),
                }
                .into());
            }
            let endpoints = iter::once(&transition.source).chain(&transition.destinations);
            for state in endpoints {
                state.validate(kind)?;
                if !states.contains(state) {
                    return Err(InvalidAutomaton::UnknownState(state.clone()).into());
                }
            }
            if let Symbol::Letter(letter) = &transition.symbol {
                if !alphabet.contains(letter) {
                    return Err(InvalidAutomaton::UnknownSymbol(letter.clone()).into());
                }
            }
        }

        Ok(Automaton {
            initial,
            finals,
            states,
            alphabet,
            transitions,
        })
    }

    /// Assembles an automaton from parts already known to be consistent.
    pub(crate) fn from_parts(
        initial: State,
        finals: IndexSet<State>,
        states: IndexSet<State>,
        alphabet: IndexSet<String>,
        transitions: Vec<Transition>,
    ) -> Self {
        Automaton {
            initial,
            finals,
            states,
            alphabet,
            transitions,
        }
    }

    pub fn initial_state(&self) -> &State {
        &self.initial
    }

    pub fn final_states(&self) -> &IndexSet<State> {
        &self.finals
    }

    pub fn states(&self) -> &IndexSet<State> {
        &self.states
    }

    pub fn alphabet(&self) -> &IndexSet<String> {
        &self.alphabet
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn has_state(&self, state: &State) -> bool {
        self.states.contains(state)
    }

    pub fn has_symbol(&self, letter: &str) -> bool {
        self.alphabet.contains(letter)
    }

    pub fn is_final(&self, state: &State) -> bool {
        self.finals.contains(state)
    }

    pub fn has_epsilon_transitions(&self) -> bool {
        self.transitions.iter().any(|t| t.symbol.is_epsilon())
    }

    /// Union of the destinations of every `state --symbol-->` transition.
    pub fn next_states(&self, state: &State, symbol: &Symbol) -> BTreeSet<State> {
        self.transitions
            .iter()
            .filter(|t| t.source == *state && t.symbol == *symbol)
            .flat_map(|t| t.destinations.iter().cloned())
            .collect()
    }

    /// The destination of the first `state --symbol-->` transition.
    pub fn next_state(&self, state: &State, symbol: &Symbol) -> Option<&State> {
        self.transitions
            .iter()
            .find(|t| t.source == *state && t.symbol == *symbol)
            .and_then(|t| t.destinations.iter().next())
    }

    /// At most one single-destination transition per state and letter, and no
    /// epsilon moves.
    pub fn is_deterministic(&self) -> bool {
        let mut seen = HashSet::new();
        self.transitions.iter().all(|t| {
            !t.symbol.is_epsilon()
                && t.destinations.len() == 1
                && seen.insert((&t.source, &t.symbol))
        })
    }
}
