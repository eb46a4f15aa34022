use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::linearize::linearize;
use crate::oracle::Oracle;
use crate::output::SentenceWriter;

pub const DEFAULT_PROGRESS_EVERY: usize = 1000;

/// What to do when one sentence can't be parsed or flattened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
  /// Stop the batch at the first failure
  #[default]
  Abort,
  /// Log it, write blank lines in its place, keep going
  Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
  pub on_failure: FailurePolicy,
  /// Log progress every this many lines, 0 for never
  pub progress_every: usize,
}

impl Default for BatchOptions {
  fn default() -> Self {
    Self {
      on_failure: FailurePolicy::Abort,
      progress_every: DEFAULT_PROGRESS_EVERY,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
  /// Input lines read, blank ones included
  pub lines: usize,
  pub parsed: usize,
  pub blank: usize,
  pub skipped: usize,
  pub elapsed: Duration,
}

impl BatchStats {
  pub fn per_line(&self) -> Duration {
    if self.lines == 0 {
      Duration::ZERO
    } else {
      self.elapsed.div_f64(self.lines as f64)
    }
  }
}

/// Parses and flattens one non-blank line, writing both output lines
fn process_line<O, P, C>(line: &str, oracle: &mut O, writer: &mut SentenceWriter<P, C>) -> Result<()>
where
  O: Oracle,
  P: Write,
  C: Write,
{
  let tokens = line.split_whitespace().collect::<Vec<_>>();
  let trees = oracle.parse(&tokens)?;
  let tree = trees.first().ok_or(Error::NoParse)?;
  let lin = linearize(tree)?;
  writer.write_sentence(&lin)?;
  Ok(())
}

fn process_lines<R, O, P, C>(
  input: R,
  oracle: &mut O,
  writer: &mut SentenceWriter<P, C>,
  options: &BatchOptions,
  stats: &mut BatchStats,
  start: Instant,
) -> Result<()>
where
  R: BufRead,
  O: Oracle,
  P: Write,
  C: Write,
{
  for bytes in input.split(b'\n') {
    let mut bytes = bytes?;
    if bytes.last() == Some(&b'\r') {
      bytes.pop();
    }
    stats.lines += 1;

    let outcome = match String::from_utf8(bytes) {
      Ok(line) if line.trim().is_empty() => {
        writer.write_blank()?;
        stats.blank += 1;
        Ok(false)
      }
      Ok(line) => process_line(&line, oracle, writer).map(|()| true),
      Err(e) => Err(e.into()),
    };

    match outcome {
      Ok(parsed) => stats.parsed += usize::from(parsed),
      // a broken sink or a dead parser ends the batch under any policy
      Err(e @ (Error::Io(_) | Error::OracleClosed)) => return Err(e.at_line(stats.lines)),
      Err(e) if options.on_failure == FailurePolicy::Skip => {
        warn!("skipping line {}: {}", stats.lines, e);
        writer.write_blank()?;
        stats.skipped += 1;
      }
      Err(e) => return Err(e.at_line(stats.lines)),
    }

    if options.progress_every > 0 && stats.lines % options.progress_every == 0 {
      info!(
        "Parsed {} lines ({:.2}s)",
        stats.lines,
        start.elapsed().as_secs_f64()
      );
    }
  }
  Ok(())
}

/// Reads sentences one per line from `input` until it runs out, writing one
/// line per input line to each output. Both outputs are flushed on return,
/// whether the batch finished or failed.
pub fn run<R, O, P, C>(
  input: R,
  mut oracle: O,
  writer: &mut SentenceWriter<P, C>,
  options: &BatchOptions,
) -> Result<BatchStats>
where
  R: BufRead,
  O: Oracle,
  P: Write,
  C: Write,
{
  let start = Instant::now();
  let mut stats = BatchStats::default();

  let result = process_lines(input, &mut oracle, writer, options, &mut stats, start);
  let flushed = writer.flush();
  result?;
  flushed?;

  stats.elapsed = start.elapsed();
  info!(
    "Done: {} lines in {:.2}s ({:.1}ms per line)",
    stats.lines,
    stats.elapsed.as_secs_f64(),
    stats.per_line().as_secs_f64() * 1000.0
  );

  Ok(stats)
}

#[cfg(test)]
use crate::oracle::FnOracle;
#[cfg(test)]
use crate::syntree::ParseNode;

/// Right-branching tree over the tokens, each branch labelled `S`
#[cfg(test)]
fn right_branching(tokens: &[&str]) -> Result<Vec<ParseNode>> {
  fn build(tokens: &[&str], start: usize) -> ParseNode {
    let leaf = ParseNode::leaf(tokens[0].to_uppercase(), start, tokens[0]);
    if tokens.len() == 1 {
      leaf
    } else {
      ParseNode::branch("S", vec![leaf, build(&tokens[1..], start + 1)])
    }
  }
  Ok(vec![build(tokens, 0)])
}

#[cfg(test)]
fn run_to_strings(
  input: &str,
  oracle: impl Oracle,
  options: &BatchOptions,
) -> (Result<BatchStats>, String, String) {
  let mut writer = SentenceWriter::new(Vec::new(), Vec::new());
  let stats = run(input.as_bytes(), oracle, &mut writer, options);
  let (parents, categories) = writer.finish().unwrap();
  (
    stats,
    String::from_utf8(parents).unwrap(),
    String::from_utf8(categories).unwrap(),
  )
}

#[test]
fn every_input_line_gets_an_output_line() {
  let input = "a b\n\n   \nc\nd e f\n";
  let (stats, parents, categories) =
    run_to_strings(input, FnOracle(right_branching), &BatchOptions::default());

  assert_eq!(parents, "3 3 0\n\n\n0\n4 5 5 0 4\n");
  assert_eq!(categories, "A B S\n\n\nC\nD E F S S\n");

  let stats = stats.unwrap();
  assert_eq!(stats.lines, 5);
  assert_eq!(stats.parsed, 3);
  assert_eq!(stats.blank, 2);
  assert_eq!(stats.skipped, 0);
}

#[test]
fn tokens_are_split_on_any_whitespace() {
  let mut seen = Vec::new();
  let oracle = FnOracle(|tokens: &[&str]| -> Result<Vec<ParseNode>> {
    seen.push(tokens.join("|"));
    right_branching(tokens)
  });
  let (stats, _, _) = run_to_strings("  the\tdog  barks \n", oracle, &BatchOptions::default());

  stats.unwrap();
  assert_eq!(seen, vec!["the|dog|barks"]);
}

#[test]
fn only_the_best_tree_is_used() {
  let oracle = FnOracle(|_: &[&str]| -> Result<Vec<ParseNode>> {
    Ok(vec![ParseNode::leaf("N", 0, "x"), ParseNode::leaf("NP", 0, "x")])
  });
  let (_, parents, categories) = run_to_strings("x\n", oracle, &BatchOptions::default());
  assert_eq!(parents, "0\n");
  assert_eq!(categories, "N\n");
}

#[test]
fn first_failure_aborts_by_default() {
  let oracle = FnOracle(|tokens: &[&str]| -> Result<Vec<ParseNode>> {
    if tokens[0] == "bad" {
      Err(Error::Derivation("no".to_string()))
    } else {
      right_branching(tokens)
    }
  });
  let (stats, parents, _) = run_to_strings("a b\n\nbad\nc\n", oracle, &BatchOptions::default());

  assert!(matches!(stats, Err(Error::Sentence { line: 3, .. })));
  // lines before the failure were flushed
  assert_eq!(parents, "3 3 0\n\n");
}

#[test]
fn skipping_keeps_outputs_aligned() {
  let oracle = FnOracle(|tokens: &[&str]| -> Result<Vec<ParseNode>> {
    match tokens[0] {
      "bad" => Err(Error::Derivation("no".to_string())),
      "empty" => Ok(Vec::new()),
      _ => right_branching(tokens),
    }
  });
  let options = BatchOptions {
    on_failure: FailurePolicy::Skip,
    ..BatchOptions::default()
  };
  let (stats, parents, categories) = run_to_strings("bad\nempty\nc\n", oracle, &options);

  assert_eq!(parents, "\n\n0\n");
  assert_eq!(categories, "\n\nC\n");
  let stats = stats.unwrap();
  assert_eq!(stats.skipped, 2);
  assert_eq!(stats.parsed, 1);
}

#[test]
fn empty_input_writes_nothing() {
  let (stats, parents, categories) =
    run_to_strings("", FnOracle(right_branching), &BatchOptions::default());
  let stats = stats.unwrap();
  assert_eq!(stats.lines, 0);
  assert_eq!(stats.per_line(), Duration::ZERO);
  assert!(parents.is_empty() && categories.is_empty());
}

#[test]
fn invalid_utf8_is_a_per_line_failure() {
  let options = BatchOptions {
    on_failure: FailurePolicy::Skip,
    ..BatchOptions::default()
  };
  let mut writer = SentenceWriter::new(Vec::new(), Vec::new());
  let input = &b"a\n\xff\xfe\r\nb\r\n"[..];
  let stats = run(input, FnOracle(right_branching), &mut writer, &options).unwrap();
  let (parents, categories) = writer.finish().unwrap();

  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.parsed, 2);
  assert_eq!(String::from_utf8(parents).unwrap(), "0\n\n0\n");
  assert_eq!(String::from_utf8(categories).unwrap(), "A\n\nB\n");
}

#[test]
fn invalid_utf8_reports_its_line_when_aborting() {
  let mut writer = SentenceWriter::new(Vec::new(), Vec::new());
  let input = &b"a\n\xff\n"[..];
  let result = run(input, FnOracle(right_branching), &mut writer, &BatchOptions::default());
  assert!(matches!(result, Err(Error::Sentence { line: 2, .. })));
}

#[test]
fn a_closed_parser_stops_even_when_skipping() {
  let oracle = FnOracle(|tokens: &[&str]| -> Result<Vec<ParseNode>> {
    match tokens[0] {
      "die" => Err(Error::OracleClosed),
      _ => right_branching(tokens),
    }
  });
  let options = BatchOptions {
    on_failure: FailurePolicy::Skip,
    ..BatchOptions::default()
  };
  let (stats, parents, _) = run_to_strings("dogs\ndie\ncats\n", oracle, &options);

  match stats {
    Err(Error::Sentence { line, source }) => {
      assert_eq!(line, 2);
      assert!(matches!(*source, Error::OracleClosed));
    }
    other => panic!("expected a fatal error, got {:?}", other),
  }
  assert_eq!(parents, "0\n");
}

#[cfg(unix)]
#[test]
fn a_parser_that_exits_midway_fails_the_batch() {
  use crate::oracle::{CommandOracle, OracleConfig};

  let oracle = CommandOracle::spawn(&OracleConfig {
    program: "sh".to_string(),
    args: vec![
      "-c".to_string(),
      r#"while IFS= read -r line; do [ "$line" = die ] && exit 0; echo "(<L N NN NN $line N>)"; done"#
        .to_string(),
    ],
  })
  .unwrap();
  let options = BatchOptions {
    on_failure: FailurePolicy::Skip,
    ..BatchOptions::default()
  };
  let (stats, parents, _) = run_to_strings("dogs\ndie\ncats\ncats\ncats\n", oracle, &options);

  assert!(matches!(stats, Err(Error::Sentence { line: 2, .. })));
  assert_eq!(parents, "0\n");
}
