use std::fmt;

/// An internal node of a derivation
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent {
  pub category: String,
  /// Which child the head comes from (0 = left)
  pub head_child: usize,
}

impl fmt::Display for Constituent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.category)
  }
}

/// A lexical node, one per token
#[derive(Debug, PartialEq, Clone)]
pub struct Word {
  pub category: String,
  /// 0-based position of this token in the sentence
  pub head_index: usize,
  pub token: String,
  pub pos: String,
}

impl fmt::Display for Word {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {} {}", self.head_index, self.category, self.token)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum ParseNode {
  Branch(Constituent, Vec<ParseNode>),
  Leaf(Word),
}

impl ParseNode {
  pub fn leaf(category: impl Into<String>, head_index: usize, token: impl Into<String>) -> Self {
    Self::Leaf(Word {
      category: category.into(),
      head_index,
      token: token.into(),
      pos: String::new(),
    })
  }

  /// Builds a branch headed by its first child
  pub fn branch(category: impl Into<String>, children: Vec<ParseNode>) -> Self {
    Self::Branch(
      Constituent {
        category: category.into(),
        head_child: 0,
      },
      children,
    )
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent, &[ParseNode])> {
    match self {
      Self::Branch(c, cs) => Some((c, cs.as_slice())),
      _ => None,
    }
  }

  pub fn category(&self) -> &str {
    match self {
      Self::Branch(c, _) => &c.category,
      Self::Leaf(w) => &w.category,
    }
  }

  /// Total number of nodes, leaves and branches alike
  pub fn size(&self) -> usize {
    match self {
      Self::Leaf(_) => 1,
      Self::Branch(_, children) => 1 + children.iter().map(Self::size).sum::<usize>(),
    }
  }

  pub fn leaf_count(&self) -> usize {
    match self {
      Self::Leaf(_) => 1,
      Self::Branch(_, children) => children.iter().map(Self::leaf_count).sum(),
    }
  }

  /// The leaves, sorted by head index
  pub fn words(&self) -> Vec<&Word> {
    fn collect<'a>(node: &'a ParseNode, out: &mut Vec<&'a Word>) {
      match node {
        ParseNode::Leaf(w) => out.push(w),
        ParseNode::Branch(_, children) => children.iter().for_each(|c| collect(c, out)),
      }
    }

    let mut words = Vec::new();
    collect(self, &mut words);
    words.sort_by_key(|w| w.head_index);
    words
  }
}

impl fmt::Display for ParseNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(w) => write!(f, "{}", w),
      Self::Branch(c, children) => {
        write!(f, "({}", c)?;
        if children.len() == 1 {
          write!(f, " ({}))", children[0])
        } else {
          for child in children.iter() {
            let fmt = child.to_string();
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}

#[test]
fn sizes_count_every_node() {
  let tree = ParseNode::branch(
    "S",
    vec![
      ParseNode::leaf("NP", 0, "John"),
      ParseNode::branch("S\\NP", vec![ParseNode::leaf("S\\NP", 1, "runs")]),
    ],
  );

  assert_eq!(tree.size(), 4);
  assert_eq!(tree.leaf_count(), 2);
  assert_eq!(ParseNode::leaf("N", 0, "dogs").size(), 1);
}

#[test]
fn words_come_back_in_sentence_order() {
  let tree = ParseNode::branch(
    "S",
    vec![ParseNode::leaf("B", 1, "b"), ParseNode::leaf("A", 0, "a")],
  );

  let words = tree.words();
  let tokens = words.iter().map(|w| w.token.as_str()).collect::<Vec<_>>();
  assert_eq!(tokens, vec!["a", "b"]);
}

#[test]
fn display_indents_children() {
  let tree = ParseNode::branch(
    "S",
    vec![ParseNode::leaf("NP", 0, "I"), ParseNode::leaf("S\\NP", 1, "ran")],
  );

  assert_eq!(tree.to_string(), "(S\n  0: NP I\n  1: S\\NP ran)");
}
