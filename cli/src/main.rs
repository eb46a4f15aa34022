use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ccgflat::batch::DEFAULT_PROGRESS_EVERY;
use ccgflat::{Config, FailurePolicy, OracleConfig};

/// Parses tokenized sentences from stdin with a CCG parser and writes each
/// derivation as a line of parent ids and a line of categories.
#[derive(Parser, Debug)]
#[command(name = "ccgflat", version, about, long_about = None)]
struct Args {
  /// Where to write the parent-pointer lines
  #[arg(short, long, alias = "parentpath", value_name = "PATH", env = "CCGFLAT_PARENT_PATH")]
  parent_path: PathBuf,

  /// Where to write the category lines
  #[arg(short, long, alias = "catpath", value_name = "PATH", env = "CCGFLAT_CAT_PATH")]
  cat_path: PathBuf,

  /// Parser model directory
  #[arg(short, long, alias = "modelpath", value_name = "DIR", env = "CCGFLAT_MODEL_PATH")]
  model_path: PathBuf,

  /// EasyCCG jar to run with `java -jar`
  #[arg(long, value_name = "JAR", default_value = "easyccg.jar")]
  parser_jar: PathBuf,

  /// Run this program as the parser instead of EasyCCG
  #[arg(long, value_name = "PROGRAM")]
  oracle: Option<String>,

  /// Argument for --oracle, repeatable; `{model}` becomes the model directory
  #[arg(long = "oracle-arg", value_name = "ARG", allow_hyphen_values = true, requires = "oracle")]
  oracle_args: Vec<String>,

  /// Write blank lines for sentences that fail instead of stopping
  #[arg(long)]
  skip_failures: bool,

  /// Log progress every N lines, 0 to disable
  #[arg(long, value_name = "N", default_value_t = DEFAULT_PROGRESS_EVERY)]
  progress_every: usize,
}

impl Args {
  fn into_config(self) -> Config {
    let mut config = Config::new(
      self.parent_path,
      self.cat_path,
      self.model_path,
      self.parser_jar,
    );
    if let Some(program) = self.oracle {
      config.oracle = OracleConfig::custom(program, &self.oracle_args, &config.model_path);
    }
    if self.skip_failures {
      config.batch.on_failure = FailurePolicy::Skip;
    }
    config.batch.progress_every = self.progress_every;
    config
  }
}

/// Flags the old Java front end took with a single dash (`-parentpath FILE`)
const SINGLE_DASH_FLAGS: [&str; 3] = ["parentpath", "catpath", "modelpath"];

/// Rewrites `-parentpath` and friends to `--parentpath` so clap doesn't read
/// them as a cluster of short flags. Everything after `--` is left alone.
fn normalize_single_dash(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
  let mut past_separator = false;
  args
    .into_iter()
    .map(|arg| {
      if arg == "--" {
        past_separator = true;
      }
      match arg.to_str().and_then(|a| a.strip_prefix('-')) {
        Some(name) if !past_separator && SINGLE_DASH_FLAGS.contains(&name) => {
          format!("--{}", name).into()
        }
        _ => arg,
      }
    })
    .collect()
}

fn main() -> ExitCode {
  let args = Args::parse_from(normalize_single_dash(std::env::args_os()));

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = args.into_config();
  match ccgflat::run(&config, io::stdin().lock()) {
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("error: {}", e);
      ExitCode::FAILURE
    }
  }
}

#[test]
fn single_dash_flags_become_long_flags() {
  let argv = ["ccgflat", "-parentpath", "p.txt", "-catpath", "c.txt", "-modelpath", "model", "-p", "-x"]
    .map(OsString::from);
  let normalized = normalize_single_dash(argv);
  assert_eq!(
    normalized,
    ["ccgflat", "--parentpath", "p.txt", "--catpath", "c.txt", "--modelpath", "model", "-p", "-x"]
      .map(OsString::from)
  );

  let args = Args::parse_from(normalize_single_dash(
    ["ccgflat", "-parentpath", "p.txt", "-catpath", "c.txt", "-modelpath", "model"].map(OsString::from),
  ));
  assert_eq!(args.parent_path, PathBuf::from("p.txt"));
  assert_eq!(args.cat_path, PathBuf::from("c.txt"));
  assert_eq!(args.model_path, PathBuf::from("model"));
}
