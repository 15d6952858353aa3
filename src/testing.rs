//! Small random automata and word enumeration for property tests.

use quickcheck::{Arbitrary, Gen};

use crate::automaton::{Automaton, State, Symbol, Transition};

pub const LETTERS: [&str; 2] = ["a", "b"];

/// An automaton over `{a, b}` with up to four states and random epsilon moves.
#[derive(Clone, Debug)]
pub struct SmallNfa(pub Automaton);

impl Arbitrary for SmallNfa {
    fn arbitrary(g: &mut Gen) -> Self {
        let count = 1 + usize::arbitrary(g) % 4;
        let states: Vec<State> = (0..count).map(|i| State::simple(format!("q{i}"))).collect();
        let finals: Vec<State> = states
            .iter()
            .filter(|_| bool::arbitrary(g))
            .cloned()
            .collect();

        let symbols = ["a", "b", ""];
        let mut transitions = Vec::new();
        for _ in 0..usize::arbitrary(g) % 8 {
            let from = pick(g, &states);
            let symbol = Symbol::from(*g.choose(&symbols).unwrap());
            let mut to = vec![pick(g, &states)];
            if bool::arbitrary(g) {
                to.push(pick(g, &states));
            }
            transitions.push(Transition::new(from, symbol, to));
        }

        let initial = states[0].clone();
        SmallNfa(Automaton::new(initial, finals, states, LETTERS, transitions).unwrap())
    }
}

fn pick(g: &mut Gen, states: &[State]) -> State {
    g.choose(states).unwrap().clone()
}

/// Every word over [`LETTERS`] of length at most `max_len`.
pub fn words(max_len: usize) -> Vec<Vec<&'static str>> {
    let mut frontier: Vec<Vec<&'static str>> = vec![vec![]];
    let mut words = frontier.clone();
    for _ in 0..max_len {
        frontier = frontier
            .iter()
            .flat_map(|word| {
                LETTERS.iter().map(move |letter| {
                    let mut longer = word.clone();
                    longer.push(*letter);
                    longer
                })
            })
            .collect();
        words.extend(frontier.iter().cloned());
    }
    words
}

/// Whether both automata agree on every word up to `max_len` letters.
pub fn same_language(left: &Automaton, right: &Automaton, max_len: usize) -> bool {
    words(max_len)
        .iter()
        .all(|word| left.accepts(word) == right.accepts(word))
}
