use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("model directory {} does not exist or is not a directory", .0.display())]
  ModelNotFound(PathBuf),

  #[error("couldn't start parser `{program}`: {source}")]
  OracleSpawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("parser process closed its output")]
  OracleClosed,

  #[error("malformed derivation: {0}")]
  Derivation(String),

  /// A leaf claimed a slot outside the tree's node range
  #[error("head index {index} out of range for a tree with {size} nodes")]
  HeadIndex { index: usize, size: usize },

  #[error("input is not valid UTF-8: {0}")]
  InvalidUtf8(#[from] std::string::FromUtf8Error),

  #[error("parser returned no derivation")]
  NoParse,

  #[error("line {line}: {source}")]
  Sentence {
    line: usize,
    #[source]
    source: Box<Error>,
  },

  #[error(transparent)]
  Io(#[from] io::Error),
}

impl Error {
  pub fn at_line(self, line: usize) -> Self {
    Self::Sentence {
      line,
      source: Box::new(self),
    }
  }
}
