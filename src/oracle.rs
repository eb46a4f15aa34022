//! The parsing oracle: whatever turns a tokenized sentence into a CCG derivation.
//!
//! The crate never parses CCG itself. `CommandOracle` drives an external parser
//! process (EasyCCG by default) over a line protocol: one tokenized sentence in,
//! one CCGbank derivation out.

use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use crate::auto::parse_derivation;
use crate::error::{Error, Result};
use crate::syntree::ParseNode;

/// Categories a complete parse may end in
pub const ROOT_CATEGORIES: [&str; 5] = ["S[dcl]", "S[wq]", "S[q]", "S[qem]", "NP"];
pub const MAX_SENTENCE_LENGTH: usize = 100;
pub const SUPERTAGGER_BEAM: f64 = 0.0001;
pub const MAX_TAGS_PER_WORD: usize = 50;
pub const NBEST: usize = 1;

/// Rule tables a model directory is expected to hold
pub const MODEL_RULE_FILES: [&str; 3] = ["unaryRules", "binaryRules", "seenRules"];

pub trait Oracle {
  /// Candidate derivations for one sentence, best first
  fn parse(&mut self, tokens: &[&str]) -> Result<Vec<ParseNode>>;
}

/// In-process oracles, mostly for tests
pub struct FnOracle<F>(pub F);

impl<F> Oracle for FnOracle<F>
where
  F: FnMut(&[&str]) -> Result<Vec<ParseNode>>,
{
  fn parse(&mut self, tokens: &[&str]) -> Result<Vec<ParseNode>> {
    (self.0)(tokens)
  }
}

/// How to launch the parser process
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
  pub program: String,
  pub args: Vec<String>,
}

impl OracleConfig {
  /// `java -jar <jar>` with the model directory and the fixed parser settings
  pub fn easyccg(jar: impl AsRef<Path>, model: impl AsRef<Path>) -> Self {
    let mut args = vec![
      "-jar".to_string(),
      jar.as_ref().display().to_string(),
      "--model".to_string(),
      model.as_ref().display().to_string(),
      "--inputFormat".to_string(),
      "tokenized".to_string(),
      "--outputFormat".to_string(),
      "ccgbank".to_string(),
      "--nbest".to_string(),
      NBEST.to_string(),
      "--maxLength".to_string(),
      MAX_SENTENCE_LENGTH.to_string(),
      "--supertaggerbeam".to_string(),
      SUPERTAGGER_BEAM.to_string(),
      "--maxTagsPerWord".to_string(),
      MAX_TAGS_PER_WORD.to_string(),
      "--rootCategories".to_string(),
    ];
    args.extend(ROOT_CATEGORIES.iter().map(|c| c.to_string()));

    Self {
      program: "java".to_string(),
      args,
    }
  }

  /// Any other parser speaking the same protocol. `{model}` in an argument is
  /// replaced by the model directory.
  pub fn custom(program: impl Into<String>, args: &[String], model: impl AsRef<Path>) -> Self {
    let model = model.as_ref().display().to_string();
    Self {
      program: program.into(),
      args: args.iter().map(|a| a.replace("{model}", &model)).collect(),
    }
  }
}

/// Rule tables missing from `model`, logged as warnings
pub fn check_model_dir(model: &Path) -> Vec<&'static str> {
  let missing = MODEL_RULE_FILES
    .iter()
    .copied()
    .filter(|name| !model.join(name).is_file())
    .collect::<Vec<_>>();
  for name in missing.iter() {
    warn!("model directory {} has no {} file", model.display(), name);
  }
  missing
}

/// A long-lived parser child process
pub struct CommandOracle {
  program: String,
  child: Child,
  stdin: Option<ChildStdin>,
  stdout: BufReader<ChildStdout>,
  line: String,
}

impl CommandOracle {
  pub fn spawn(config: &OracleConfig) -> Result<Self> {
    info!("starting parser: {} {}", config.program, config.args.join(" "));

    let mut child = Command::new(&config.program)
      .args(&config.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .map_err(|source| Error::OracleSpawn {
        program: config.program.clone(),
        source,
      })?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take().ok_or(Error::OracleClosed)?;

    Ok(Self {
      program: config.program.clone(),
      child,
      stdin,
      stdout: BufReader::new(stdout),
      line: String::new(),
    })
  }

  fn send(&mut self, tokens: &[&str]) -> Result<()> {
    let stdin = self.stdin.as_mut().ok_or(Error::OracleClosed)?;
    writeln!(stdin, "{}", tokens.join(" "))
      .and_then(|_| stdin.flush())
      .map_err(|e| match e.kind() {
        io::ErrorKind::BrokenPipe => Error::OracleClosed,
        _ => e.into(),
      })
  }

  /// Next line that isn't blank or an `ID=` header
  fn receive(&mut self) -> Result<&str> {
    loop {
      self.line.clear();
      if self.stdout.read_line(&mut self.line)? == 0 {
        return Err(Error::OracleClosed);
      }
      let line = self.line.trim();
      if !line.is_empty() && !line.starts_with("ID=") {
        break;
      }
    }
    Ok(self.line.trim())
  }
}

impl Oracle for CommandOracle {
  fn parse(&mut self, tokens: &[&str]) -> Result<Vec<ParseNode>> {
    self.send(tokens)?;
    let derivation = self.receive()?;
    debug!("{} answered: {}", tokens.join(" "), derivation);
    Ok(vec![parse_derivation(derivation)?])
  }
}

impl Drop for CommandOracle {
  /// Closing stdin is the parser's signal to exit
  fn drop(&mut self) {
    drop(self.stdin.take());
    match self.child.wait() {
      Ok(status) if !status.success() => warn!("{} exited with {}", self.program, status),
      Ok(_) => {}
      Err(e) => warn!("couldn't wait for {}: {}", self.program, e),
    }
  }
}

#[test]
fn easyccg_invocation_names_the_model() {
  let config = OracleConfig::easyccg("easyccg.jar", "model");
  assert_eq!(config.program, "java");
  assert_eq!(&config.args[..4], &["-jar", "easyccg.jar", "--model", "model"]);
  assert!(config.args.ends_with(&ROOT_CATEGORIES.map(String::from)));
}

#[test]
fn custom_invocation_substitutes_the_model() {
  let args = vec!["--model={model}".to_string(), "-x".to_string()];
  let config = OracleConfig::custom("parser", &args, "/models/ccg");
  assert_eq!(config.args, vec!["--model=/models/ccg", "-x"]);
}

#[test]
fn fn_oracle_forwards_tokens() {
  let mut oracle = FnOracle(|tokens: &[&str]| -> Result<Vec<ParseNode>> {
    Ok(vec![ParseNode::leaf("N", 0, tokens[0])])
  });
  let trees = oracle.parse(&["dogs"]).unwrap();
  assert_eq!(trees[0].get_leaf().unwrap().token, "dogs");
}

#[cfg(all(test, unix))]
fn shell_oracle(script: &str) -> Result<CommandOracle> {
  CommandOracle::spawn(&OracleConfig {
    program: "sh".to_string(),
    args: vec!["-c".to_string(), script.to_string()],
  })
}

#[cfg(unix)]
#[test]
fn command_oracle_talks_line_by_line() {
  let mut oracle = shell_oracle(
    r#"n=0; while IFS= read -r line; do n=$((n+1)); echo "ID=$n"; echo "(<L N NN NN $line N>)"; done"#,
  )
  .unwrap();

  for word in ["dogs", "cats"] {
    let trees = oracle.parse(&[word]).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].get_leaf().unwrap().token, word);
  }
}

#[cfg(unix)]
#[test]
fn command_oracle_reports_garbage() {
  let mut oracle = shell_oracle(r#"while IFS= read -r line; do echo "no parse"; done"#).unwrap();
  assert!(matches!(oracle.parse(&["dogs"]), Err(Error::Derivation(_))));
  // the protocol stays in step after a bad answer
  assert!(matches!(oracle.parse(&["cats"]), Err(Error::Derivation(_))));
}

#[cfg(unix)]
#[test]
fn command_oracle_notices_exit() {
  let mut oracle = shell_oracle("exit 0").unwrap();
  assert!(matches!(oracle.parse(&["dogs"]), Err(Error::OracleClosed)));
}

#[test]
fn missing_program_fails_to_spawn() {
  let config = OracleConfig {
    program: "ccgflat-no-such-parser".to_string(),
    args: Vec::new(),
  };
  assert!(matches!(
    CommandOracle::spawn(&config),
    Err(Error::OracleSpawn { .. })
  ));
}
