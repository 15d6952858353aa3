//! Epsilon closures over a list of transitions.

use std::collections::HashSet;

use bit_set::BitSet;
use indexmap::IndexSet;

use crate::automaton::{State, Transition};

/// The states reachable from `state` through epsilon moves only, `state`
/// included.
pub fn epsilon_closure(state: &State, transitions: &[Transition]) -> HashSet<State> {
    EpsilonGraph::new(transitions).closure(state)
}

/// The epsilon edges of a transition list, indexed once so that the closures
/// of many states can be taken against it.
pub struct EpsilonGraph<'a> {
    nodes: IndexSet<&'a State>,
    // node -> epsilon successors
    edges: Vec<Vec<usize>>,
}

impl<'a> EpsilonGraph<'a> {
    pub fn new(transitions: &'a [Transition]) -> Self {
        let mut nodes = IndexSet::new();
        let mut edges: Vec<Vec<usize>> = Vec::new();
        for transition in transitions.iter().filter(|t| t.symbol.is_epsilon()) {
            let (from, _) = nodes.insert_full(&transition.source);
            for destination in &transition.destinations {
                let (to, _) = nodes.insert_full(destination);
                edges.resize(nodes.len(), Vec::new());
                edges[from].push(to);
            }
        }
        edges.resize(nodes.len(), Vec::new());
        EpsilonGraph { nodes, edges }
    }

    pub fn closure(&self, state: &State) -> HashSet<State> {
        let mut closure = HashSet::new();
        closure.insert(state.clone());
        if let Some(start) = self.nodes.get_index_of(state) {
            closure.extend(self.reach(start).iter().map(|n| State::clone(self.nodes[n])));
        }
        closure
    }

    // Iterative DFS; the visited set keeps cycles from looping.
    fn reach(&self, start: usize) -> BitSet {
        let mut visited = BitSet::with_capacity(self.nodes.len());
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            stack.extend(
                self.edges[node]
                    .iter()
                    .cloned()
                    .filter(|&next| !visited.contains(next)),
            );
        }
        visited
    }
}
