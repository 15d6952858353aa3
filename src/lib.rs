//! Epsilon elimination, subset construction and state merging for finite
//! automata with string-named states.

pub mod automaton;
pub mod closure;
pub mod dfa;
mod error;
pub mod format;
pub mod nfa;

#[cfg(test)]
mod testing;

pub use automaton::{Automaton, State, Symbol, Transition};
pub use closure::epsilon_closure;
pub use dfa::Merge;
pub use error::{Error, InvalidAutomaton, MalformedTransition, Result};
pub use nfa::Construction;
