use std::path::PathBuf;
use std::process::exit;
use std::{fs, io};

use clap::{Parser as ClapParser, ValueEnum};
use thiserror::Error;

use nfa2dfa::format::{self, AutomatonDescriptor};
use nfa2dfa::{Automaton, Merge};

/// Turns an automaton description into an equivalent DFA.
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Merge equivalent states of the resulting DFA
    #[arg(long)]
    minimize: bool,

    /// How equivalent states are searched for, used together with `--minimize`
    #[arg(long, value_enum, default_value_t = MergeArg::SinglePass)]
    merge: MergeArg,

    /// Stop the subset construction after expanding this many states
    #[arg(long)]
    steps: Option<usize>,

    /// Only remove epsilon transitions and print the resulting NFA
    #[arg(long)]
    eliminate_only: bool,

    /// The automaton description, in YAML or JSON
    file: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MergeArg {
    SinglePass,
    Fixpoint,
    Refine,
}

impl From<MergeArg> for Merge {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::SinglePass => Merge::SinglePass,
            MergeArg::Fixpoint => Merge::Fixpoint,
            MergeArg::Refine => Merge::Refine,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot parse the description: {0}")]
    Description(#[from] serde_yaml::Error),

    #[error(transparent)]
    Automaton(#[from] nfa2dfa::Error),
}

fn main() {
    env_logger::init();
    let cli = Args::parse();
    match run(&cli) {
        Ok(output) => print!("{}", output),
        Err(err) => {
            log::error!("{}", err);
            exit(1);
        }
    }
}

fn run(cli: &Args) -> Result<String, CliError> {
    let text = fs::read_to_string(&cli.file).map_err(|source| CliError::Read {
        path: cli.file.clone(),
        source,
    })?;
    let nfa = Automaton::try_from(format::from_yaml(&text)?)?;

    let result = if cli.eliminate_only {
        nfa.eliminate_epsilon()
    } else {
        let construction = nfa.to_dfa(cli.steps);
        if construction.interrupted {
            log::warn!(
                "subset construction stopped after {} steps",
                construction.steps_completed
            );
        } else {
            log::info!(
                "subset construction finished in {} steps",
                construction.steps_completed
            );
        }
        if cli.minimize {
            construction.dfa.minimize_with(cli.merge.into())
        } else {
            construction.dfa
        }
    };

    Ok(format::to_yaml(&AutomatonDescriptor::from(&result))?)
}
