use std::path::PathBuf;

use crate::batch::BatchOptions;
use crate::error::{Error, Result};
use crate::oracle::{check_model_dir, OracleConfig};

/// Everything one run needs, already parsed from the command line
#[derive(Debug, Clone)]
pub struct Config {
  pub parent_path: PathBuf,
  pub category_path: PathBuf,
  pub model_path: PathBuf,
  pub oracle: OracleConfig,
  pub batch: BatchOptions,
}

impl Config {
  /// Runs the default EasyCCG invocation against `model_path`
  pub fn new(
    parent_path: impl Into<PathBuf>,
    category_path: impl Into<PathBuf>,
    model_path: impl Into<PathBuf>,
    parser_jar: impl Into<PathBuf>,
  ) -> Self {
    let model_path = model_path.into();
    let parser_jar: PathBuf = parser_jar.into();
    Self {
      parent_path: parent_path.into(),
      category_path: category_path.into(),
      oracle: OracleConfig::easyccg(&parser_jar, &model_path),
      model_path,
      batch: BatchOptions::default(),
    }
  }

  /// Checked before the parser starts or any output file is created
  pub fn validate(&self) -> Result<()> {
    if !self.model_path.is_dir() {
      return Err(Error::ModelNotFound(self.model_path.clone()));
    }
    check_model_dir(&self.model_path);
    Ok(())
  }
}

#[test]
fn missing_model_directory_is_rejected() {
  let config = Config::new("p.txt", "c.txt", "/ccgflat/no/such/model", "easyccg.jar");
  assert!(matches!(config.validate(), Err(Error::ModelNotFound(_))));
}

#[test]
fn existing_model_directory_is_accepted() {
  let dir = std::env::temp_dir();
  let config = Config::new("p.txt", "c.txt", &dir, "easyccg.jar");
  assert!(config.validate().is_ok());
  assert_eq!(config.oracle.args[3], dir.display().to_string());
}
