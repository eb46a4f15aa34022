use std::fmt::{self, Display, Write as _};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::linearize::Linearization;

/// Writes `values` space-separated on one line. An empty slice writes a bare newline.
pub fn write_line<T: Display, W: Write>(values: &[T], writer: &mut W) -> io::Result<()> {
  let mut line = String::new();
  join_into(&mut line, values).map_err(|_| io::Error::other("formatting failed"))?;
  line.push('\n');
  writer.write_all(line.as_bytes())
}

fn join_into<T: Display>(buf: &mut String, values: &[T]) -> fmt::Result {
  let mut iter = values.iter();
  if let Some(first) = iter.next() {
    write!(buf, "{}", first)?;
    for v in iter {
      write!(buf, " {}", v)?;
    }
  }
  Ok(())
}

/// The two line-aligned output streams: parent ids and categories
pub struct SentenceWriter<P: Write, C: Write> {
  parents: P,
  categories: C,
}

impl SentenceWriter<BufWriter<File>, BufWriter<File>> {
  pub fn create(parent_path: impl AsRef<Path>, category_path: impl AsRef<Path>) -> io::Result<Self> {
    Ok(Self::new(
      BufWriter::new(File::create(parent_path)?),
      BufWriter::new(File::create(category_path)?),
    ))
  }
}

impl<P: Write, C: Write> SentenceWriter<P, C> {
  pub fn new(parents: P, categories: C) -> Self {
    Self {
      parents,
      categories,
    }
  }

  pub fn write_sentence(&mut self, lin: &Linearization<'_>) -> io::Result<()> {
    write_line(&lin.parents, &mut self.parents)?;
    write_line(&lin.categories, &mut self.categories)
  }

  /// Keeps both outputs aligned with an input line that produced no tree
  pub fn write_blank(&mut self) -> io::Result<()> {
    self.parents.write_all(b"\n")?;
    self.categories.write_all(b"\n")
  }

  pub fn flush(&mut self) -> io::Result<()> {
    self.parents.flush()?;
    self.categories.flush()
  }

  /// Flushes both sinks and hands them back
  pub fn finish(mut self) -> io::Result<(P, C)> {
    self.flush()?;
    Ok((self.parents, self.categories))
  }
}

#[test]
fn writes_space_separated_values() {
  let mut out = Vec::new();
  write_line(&[3, 3, 0], &mut out).unwrap();
  write_line(&["NP", "VP", "S"], &mut out).unwrap();
  assert_eq!(String::from_utf8(out).unwrap(), "3 3 0\nNP VP S\n");
}

#[test]
fn empty_values_write_an_empty_line() {
  let mut out = Vec::new();
  write_line::<usize, _>(&[], &mut out).unwrap();
  assert_eq!(out, b"\n");
}

#[test]
fn blank_sentences_keep_outputs_aligned() {
  let lin = Linearization {
    parents: vec![0],
    categories: vec!["N"],
  };

  let mut writer = SentenceWriter::new(Vec::new(), Vec::new());
  writer.write_sentence(&lin).unwrap();
  writer.write_blank().unwrap();
  writer.write_sentence(&lin).unwrap();
  let (parents, categories) = writer.finish().unwrap();

  assert_eq!(String::from_utf8(parents).unwrap(), "0\n\n0\n");
  assert_eq!(String::from_utf8(categories).unwrap(), "N\n\nN\n");
}
