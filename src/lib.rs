//! Flattens CCG derivations produced by an external parser into two
//! line-aligned files: parent-pointer arrays and per-node categories.

#[macro_use]
extern crate lazy_static;

pub mod auto;
pub mod batch;
pub mod config;
pub mod error;
pub mod linearize;
pub mod oracle;
pub mod output;
pub mod syntree;

use std::io::BufRead;

use tracing::info;

pub use crate::batch::{BatchOptions, BatchStats, FailurePolicy};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::linearize::{compute_categories, compute_parents, linearize, Linearization};
pub use crate::oracle::{CommandOracle, Oracle, OracleConfig};
pub use crate::output::{write_line, SentenceWriter};
pub use crate::syntree::ParseNode;

/// Validates `config`, starts the parser, and flattens every line of `input`
/// into the two output files.
pub fn run(config: &Config, input: impl BufRead) -> Result<BatchStats> {
  config.validate()?;

  info!("Loading model...");
  let oracle = CommandOracle::spawn(&config.oracle)?;

  let mut writer = SentenceWriter::create(&config.parent_path, &config.category_path)?;

  info!("Parsing...");
  let stats = batch::run(input, oracle, &mut writer, &config.batch)?;
  writer.finish()?;
  Ok(stats)
}
