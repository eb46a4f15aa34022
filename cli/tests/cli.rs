use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

/// Answers one-word sentences with a leaf and two-word sentences with S -> NP VP
const TOY_PARSER: &str = r#"
n=0
while IFS= read -r line; do
  n=$((n+1))
  echo "ID=$n"
  set -- $line
  case "$1" in
    fail) echo "(garbage" ;;
    *) if [ $# -eq 1 ]; then
         echo "(<L N NN NN $1 N>)"
       else
         echo "(<T S 0 2> (<L NP NN NN $1 NP>) (<L VP VB VB $2 VP>) )"
       fi ;;
  esac
done
"#;

fn ccgflat(dir: &Path) -> Command {
  let mut cmd = Command::cargo_bin("ccgflat").unwrap();
  cmd
    .env_remove("CCGFLAT_PARENT_PATH")
    .env_remove("CCGFLAT_CAT_PATH")
    .env_remove("CCGFLAT_MODEL_PATH")
    .arg("--parent-path")
    .arg(dir.join("parents.txt"))
    .arg("--cat-path")
    .arg(dir.join("cats.txt"))
    .arg("--model-path")
    .arg(dir);
  cmd
}

fn with_toy_parser(cmd: &mut Command) -> &mut Command {
  cmd
    .args(["--oracle", "sh", "--oracle-arg", "-c", "--oracle-arg"])
    .arg(TOY_PARSER)
}

fn read(dir: &TempDir, name: &str) -> String {
  fs::read_to_string(dir.path().join(name)).unwrap()
}

#[test]
fn missing_paths_are_a_usage_error() {
  let mut cmd = Command::cargo_bin("ccgflat").unwrap();
  cmd
    .env_remove("CCGFLAT_PARENT_PATH")
    .env_remove("CCGFLAT_CAT_PATH")
    .env_remove("CCGFLAT_MODEL_PATH")
    .arg("--parent-path")
    .arg("parents.txt");
  cmd.assert().failure().stderr(contains("--cat-path"));
}

#[test]
fn missing_model_directory_fails_before_writing() {
  let dir = TempDir::new().unwrap();
  let mut cmd = Command::cargo_bin("ccgflat").unwrap();
  cmd
    .arg("--parent-path")
    .arg(dir.path().join("parents.txt"))
    .arg("--cat-path")
    .arg(dir.path().join("cats.txt"))
    .arg("--model-path")
    .arg(dir.path().join("no-model"));

  cmd.assert().failure().stderr(contains("model directory"));
  assert!(!dir.path().join("parents.txt").exists());
}

#[cfg(unix)]
#[test]
fn writes_aligned_parent_and_category_files() {
  let dir = TempDir::new().unwrap();
  let mut cmd = ccgflat(dir.path());
  with_toy_parser(&mut cmd)
    .write_stdin("John runs\n\n   \ndogs\n")
    .assert()
    .success();

  assert_eq!(read(&dir, "parents.txt"), "3 3 0\n\n\n0\n");
  assert_eq!(read(&dir, "cats.txt"), "NP VP S\n\n\nN\n");
}

#[cfg(unix)]
#[test]
fn single_dash_flag_names_work() {
  let dir = TempDir::new().unwrap();
  let mut cmd = Command::cargo_bin("ccgflat").unwrap();
  cmd
    .arg("-parentpath")
    .arg(dir.path().join("parents.txt"))
    .arg("-catpath")
    .arg(dir.path().join("cats.txt"))
    .arg("-modelpath")
    .arg(dir.path());
  with_toy_parser(&mut cmd).write_stdin("dogs\n").assert().success();

  assert_eq!(read(&dir, "parents.txt"), "0\n");
  assert_eq!(read(&dir, "cats.txt"), "N\n");
}

#[cfg(unix)]
#[test]
fn unhyphenated_long_flag_names_work() {
  let dir = TempDir::new().unwrap();
  let mut cmd = Command::cargo_bin("ccgflat").unwrap();
  cmd
    .arg("--parentpath")
    .arg(dir.path().join("parents.txt"))
    .arg("--catpath")
    .arg(dir.path().join("cats.txt"))
    .arg("--modelpath")
    .arg(dir.path());
  with_toy_parser(&mut cmd).write_stdin("dogs\n").assert().success();

  assert_eq!(read(&dir, "parents.txt"), "0\n");
}

#[cfg(unix)]
#[test]
fn a_parser_crash_fails_even_when_skipping() {
  let dir = TempDir::new().unwrap();
  let mut cmd = ccgflat(dir.path());
  cmd
    .args(["--skip-failures", "--oracle", "sh", "--oracle-arg", "-c", "--oracle-arg"])
    .arg(r#"while IFS= read -r line; do [ "$line" = die ] && exit 0; echo "(<L N NN NN $line N>)"; done"#)
    .write_stdin("dogs\ndie\ncats\n")
    .assert()
    .failure()
    .stderr(contains("line 2: parser process closed its output"));

  assert_eq!(read(&dir, "parents.txt"), "0\n");
}

#[cfg(unix)]
#[test]
fn a_bad_derivation_stops_the_batch() {
  let dir = TempDir::new().unwrap();
  let mut cmd = ccgflat(dir.path());
  with_toy_parser(&mut cmd)
    .write_stdin("dogs\nfail now\ncats\n")
    .assert()
    .failure()
    .stderr(contains("line 2"));

  assert_eq!(read(&dir, "parents.txt"), "0\n");
}

#[cfg(unix)]
#[test]
fn skip_failures_keeps_going() {
  let dir = TempDir::new().unwrap();
  let mut cmd = ccgflat(dir.path());
  with_toy_parser(&mut cmd)
    .arg("--skip-failures")
    .write_stdin("dogs\nfail now\ncats\n")
    .assert()
    .success();

  assert_eq!(read(&dir, "parents.txt"), "0\n\n0\n");
  assert_eq!(read(&dir, "cats.txt"), "N\n\nN\n");
}

#[test]
fn unknown_parser_program_is_reported() {
  let dir = TempDir::new().unwrap();
  ccgflat(dir.path())
    .args(["--oracle", "ccgflat-no-such-parser"])
    .write_stdin("dogs\n")
    .assert()
    .failure()
    .stderr(contains("couldn't start parser"));
}
