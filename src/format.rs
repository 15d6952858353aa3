//! Textual descriptions of automata, as read from and written to files.

use serde::{Deserialize, Serialize};

use crate::automaton::{Automaton, State, Symbol, Transition};
use crate::error::{Error, InvalidAutomaton, MalformedTransition};

/// An automaton with every state written as its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatonDescriptor {
    pub initial: String,
    #[serde(default)]
    pub finals: Vec<String>,
    pub states: Vec<String>,
    pub alphabet: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionDescriptor>,
    /// Read through [`Automaton::new_dfa`], which allows `DEAD` and
    /// overlapping composite states.
    #[serde(default)]
    pub deterministic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    pub from: String,
    /// Left out, `""` or `"λ"` for an epsilon move.
    #[serde(default)]
    pub on: String,
    pub to: Vec<String>,
}

fn declared(label: &str) -> Result<State, Error> {
    State::from_label(label)
        .ok_or_else(|| InvalidAutomaton::InvalidStateName(label.to_owned()).into())
}

fn token(label: &str) -> Result<State, Error> {
    State::from_label(label)
        .ok_or_else(|| MalformedTransition::InvalidStateToken(label.to_owned()).into())
}

impl TryFrom<&TransitionDescriptor> for Transition {
    type Error = Error;

    fn try_from(desc: &TransitionDescriptor) -> Result<Self, Error> {
        let destinations = desc
            .to
            .iter()
            .map(|label| token(label))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Transition::new(
            token(&desc.from)?,
            Symbol::from(desc.on.as_str()),
            destinations,
        ))
    }
}

impl TryFrom<AutomatonDescriptor> for Automaton {
    type Error = Error;

    fn try_from(desc: AutomatonDescriptor) -> Result<Self, Error> {
        let initial = declared(&desc.initial)?;
        let finals = desc
            .finals
            .iter()
            .map(|label| declared(label))
            .collect::<Result<Vec<_>, _>>()?;
        let states = desc
            .states
            .iter()
            .map(|label| declared(label))
            .collect::<Result<Vec<_>, _>>()?;
        let transitions = desc
            .transitions
            .iter()
            .map(Transition::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if desc.deterministic {
            Automaton::new_dfa(initial, finals, states, desc.alphabet, transitions)
        } else {
            Automaton::new(initial, finals, states, desc.alphabet, transitions)
        }
    }
}

fn labels<'a, I: IntoIterator<Item = &'a State>>(states: I) -> Vec<String> {
    states.into_iter().map(State::to_string).collect()
}

impl From<&Automaton> for AutomatonDescriptor {
    fn from(automaton: &Automaton) -> Self {
        AutomatonDescriptor {
            initial: automaton.initial_state().to_string(),
            finals: labels(automaton.final_states()),
            states: labels(automaton.states()),
            alphabet: automaton.alphabet().iter().cloned().collect(),
            transitions: automaton
                .transitions()
                .iter()
                .map(|t| TransitionDescriptor {
                    from: t.source.to_string(),
                    on: t.symbol.to_string(),
                    to: labels(&t.destinations),
                })
                .collect(),
            deterministic: automaton.is_deterministic(),
        }
    }
}

pub fn from_yaml(text: &str) -> Result<AutomatonDescriptor, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

pub fn to_yaml(desc: &AutomatonDescriptor) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(desc)
}
