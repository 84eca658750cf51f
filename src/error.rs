use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::Rule;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse source: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to talk to the terminal: {0}")]
    Console(#[source] io::Error),

    /// Substitution finished with arguments left over.
    #[error("{remaining} interpolation argument(s) left unconsumed after substitution")]
    UnconsumedArguments { remaining: usize },

    /// Substitution ran out of arguments before the last placeholder.
    #[error("interpolation arguments exhausted after {consumed} placeholder(s)")]
    ExhaustedArguments { consumed: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
