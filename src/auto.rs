//! Recursive-descent reading of CCGbank derivations, the format the parser emits:
//!
//! ```text
//! (<T S[dcl] 1 2> (<L NP NNP NNP John NP>) (<L S[dcl]\NP VBZ VBZ runs S[dcl]\NP_1>) )
//! ```

use regex::{Captures, Regex};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::syntree::{Constituent, ParseNode, Word};

impl FromStr for ParseNode {
  type Err = Error;

  /// Reads exactly one derivation. Leaves are numbered left to right.
  fn from_str(s: &str) -> Result<Self> {
    parse_derivation(s)
  }
}

pub fn parse_derivation(s: &str) -> Result<ParseNode> {
  let mut next_head = 0;
  let s = skip_whitespace(s);
  let (tree, s) = parse_node(s, &mut next_head)?;
  let s = skip_whitespace(s);
  if s.is_empty() {
    Ok(tree)
  } else {
    Err(malformed(format!("trailing text at {}", near(s))))
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str)>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

fn malformed(msg: String) -> Error {
  Error::Derivation(msg)
}

/// The first few characters of the unparsed input, for error messages
fn near(s: &str) -> &str {
  s.char_indices().nth(40).map_or(s, |(idx, _)| &s[..idx])
}

/// Try to consume a regex anchored at the start of `s`
fn optional_captures<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<Captures<'a>>> {
  match re.captures(s) {
    Some(caps) if caps.get(0).map_or(false, |m| m.start() == 0) => {
      let end = caps.get(0).map_or(0, |m| m.end());
      (Some(caps), &s[end..])
    }
    _ => (None, s),
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(malformed(format!("expected '{}' at {}", c, near(s))))
  }
}

fn skip_whitespace(s: &str) -> &str {
  s.trim_start()
}

fn parse_count(caps: &Captures, group: usize) -> Result<usize> {
  caps[group]
    .parse()
    .map_err(|e| malformed(format!("bad number {}: {}", &caps[group], e)))
}

/// `(<T ...> children...)` or `(<L ...>)`
fn parse_node<'a>(s: &'a str, next_head: &mut usize) -> ParseResult<'a, ParseNode> {
  regex_static!(BRANCH, r"^<T\s+(\S+)\s+(\d+)\s+(\d+)\s*>");
  regex_static!(LEAF, r"^<L\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s*>");

  let (_, s) = needed_char('(', s)?;
  let s = skip_whitespace(s);

  if let (Some(caps), s) = optional_captures(&*BRANCH, s) {
    let constituent = Constituent {
      category: caps[1].to_string(),
      head_child: parse_count(&caps, 2)?,
    };
    let declared = parse_count(&caps, 3)?;

    let mut children = Vec::with_capacity(declared);
    let mut rem = s;
    loop {
      rem = skip_whitespace(rem);
      if let (Some(_), s) = optional_char(')', rem) {
        rem = s;
        break;
      }
      if rem.is_empty() {
        return Err(malformed(format!(
          "unclosed constituent {}",
          constituent.category
        )));
      }
      let (child, s) = parse_node(rem, next_head)?;
      children.push(child);
      rem = s;
    }

    if children.is_empty() || children.len() != declared {
      return Err(malformed(format!(
        "constituent {} declares {} children but has {}",
        constituent.category,
        declared,
        children.len()
      )));
    }

    Ok((ParseNode::Branch(constituent, children), rem))
  } else if let (Some(caps), s) = optional_captures(&*LEAF, s) {
    let word = Word {
      category: caps[1].to_string(),
      head_index: *next_head,
      token: caps[4].to_string(),
      pos: caps[2].to_string(),
    };
    *next_head += 1;

    let s = skip_whitespace(s);
    let (_, s) = needed_char(')', s)?;
    Ok((ParseNode::Leaf(word), s))
  } else {
    Err(malformed(format!("expected <T ...> or <L ...> at {}", near(s))))
  }
}

#[test]
fn reads_a_transitive_sentence() {
  let tree: ParseNode = r"(<T S[dcl] 1 2> (<L NP NNP NNP John NP>) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/NP VBZ VBZ loves (S[dcl]\NP_10)/NP_11>) (<L NP NNP NNP Mary NP>) ) )"
    .parse()
    .unwrap();

  assert_eq!(tree.size(), 5);
  assert_eq!(tree.category(), "S[dcl]");

  let (root, children) = tree.get_branch().unwrap();
  assert_eq!(root.head_child, 1);
  assert_eq!(children.len(), 2);

  let words = tree.words();
  let tokens = words.iter().map(|w| w.token.as_str()).collect::<Vec<_>>();
  assert_eq!(tokens, vec!["John", "loves", "Mary"]);
  assert_eq!(words[1].category, r"(S[dcl]\NP)/NP");
  assert_eq!(words[1].pos, "VBZ");
  assert_eq!(words[2].head_index, 2);
}

#[test]
fn reads_a_single_leaf() {
  let tree = parse_derivation("  (<L N NN NN dogs N>)\n").unwrap();
  assert_eq!(tree, ParseNode::Leaf(Word {
    category: "N".to_string(),
    head_index: 0,
    token: "dogs".to_string(),
    pos: "NN".to_string(),
  }));
}

#[test]
fn reads_unary_rules() {
  let tree = parse_derivation("(<T NP 0 1> (<L N NNS NNS dogs N>) )").unwrap();
  assert_eq!(tree.size(), 2);
  assert!(tree.get_branch().unwrap().1[0].is_leaf());
}

#[test]
fn tokens_may_contain_angle_brackets() {
  let tree = parse_derivation("(<L SYM SYM SYM > SYM>)").unwrap();
  assert_eq!(tree.get_leaf().unwrap().token, ">");
}

#[test]
fn rejects_malformed_derivations() {
  for bad in [
    "",
    "(<L N NN NN dogs N>",
    "(<T S 0 2> (<L N NN NN dogs N>) )",
    "(<T S 0 1> (<L N NN NN dogs N>)",
    "(<X S 0 1>)",
    "(<L N NN NN dogs N>) extra",
    "(failed)",
  ] {
    assert!(
      matches!(parse_derivation(bad), Err(Error::Derivation(_))),
      "accepted {:?}",
      bad
    );
  }
}
