use thiserror::Error;

use crate::automaton::{State, Symbol};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The declared sets of an automaton are inconsistent.
    #[error("invalid automaton: {0}")]
    InvalidAutomaton(#[from] InvalidAutomaton),

    /// A single transition record cannot be used.
    #[error("malformed transition: {0}")]
    MalformedTransition(#[from] MalformedTransition),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidAutomaton {
    #[error("state name {0} is reserved")]
    ReservedName(String),

    #[error("`{0}` is not a valid state name")]
    InvalidStateName(String),

    #[error("initial state {0} is not a declared state")]
    UnknownInitialState(State),

    #[error("final state {0} is not a declared state")]
    UnknownFinalState(State),

    #[error("transition refers to undeclared state {0}")]
    UnknownState(State),

    #[error("transition refers to symbol {0} outside the alphabet")]
    UnknownSymbol(String),

    #[error("the epsilon symbol cannot be part of the alphabet")]
    EpsilonInAlphabet,

    #[error("name {0} belongs to more than one state")]
    SharedName(String),

    #[error("{0} has an epsilon move or more than one {1} move")]
    NotDeterministic(State, Symbol),

    #[error("a final state is reachable from the DEAD state")]
    DeadStateAccepts,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedTransition {
    #[error("{from} --{symbol}--> has no destination")]
    EmptyDestinations { from: State, symbol: Symbol },

    #[error("`{0}` is not a state label")]
    InvalidStateToken(String),
}
