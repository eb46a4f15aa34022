//! Flattening a derivation into parallel per-node arrays.
//!
//! Every node gets a 1-based id. Leaves take ids `1..=L` straight from their
//! head index, so leaf slot `i` is the `i`th token. Branches are numbered
//! `L+1, L+2, ...` in the order a pre-order walk enters them; the root, when it
//! is a branch, is always `L+1`.

use crate::error::{Error, Result};
use crate::syntree::ParseNode;

/// Parent ids and categories of one sentence, index-aligned
#[derive(Debug, Clone, PartialEq)]
pub struct Linearization<'a> {
  /// 1-based id of each node's parent, 0 for the root
  pub parents: Vec<usize>,
  pub categories: Vec<&'a str>,
}

impl Linearization<'_> {
  pub fn len(&self) -> usize {
    self.parents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

pub fn node_count(tree: &ParseNode) -> usize {
  tree.size()
}

pub fn linearize(tree: &ParseNode) -> Result<Linearization<'_>> {
  Ok(Linearization {
    parents: compute_parents(tree)?,
    categories: compute_categories(tree)?,
  })
}

/// A leaf root has no parent and nothing to recurse into, so its one slot stays 0.
pub fn compute_parents(tree: &ParseNode) -> Result<Vec<usize>> {
  let mut parents = vec![0; node_count(tree)];
  if tree.is_branch() {
    number_nodes(tree, 0, tree.leaf_count() + 1, &mut |idx, _, parent_id| {
      *slot(&mut parents, idx)? = parent_id;
      Ok(())
    })?;
  }
  Ok(parents)
}

/// Unlike `compute_parents`, a leaf root still gets its category written.
pub fn compute_categories(tree: &ParseNode) -> Result<Vec<&str>> {
  let mut categories = vec![""; node_count(tree)];
  match tree {
    ParseNode::Leaf(w) => categories[0] = w.category.as_str(),
    ParseNode::Branch(_, _) => {
      number_nodes(tree, 0, tree.leaf_count() + 1, &mut |idx, node, _| {
        *slot(&mut categories, idx)? = node.category();
        Ok(())
      })?;
    }
  }
  Ok(categories)
}

fn slot<T>(slots: &mut [T], index: usize) -> Result<&mut T> {
  let size = slots.len();
  slots.get_mut(index).ok_or(Error::HeadIndex { index, size })
}

/// Visits `node` (a branch with id `current_id`) and everything below it,
/// calling `visit(slot, node, parent_id)` once per node. Returns the highest
/// branch id handed out in this subtree so later siblings continue after it.
fn number_nodes<'a, F>(
  node: &'a ParseNode,
  parent_id: usize,
  current_id: usize,
  visit: &mut F,
) -> Result<usize>
where
  F: FnMut(usize, &'a ParseNode, usize) -> Result<()>,
{
  visit(current_id - 1, node, parent_id)?;

  let mut next_id = current_id;
  if let ParseNode::Branch(_, children) = node {
    for child in children.iter() {
      match child {
        ParseNode::Leaf(w) => visit(w.head_index, child, current_id)?,
        ParseNode::Branch(_, _) => {
          next_id = number_nodes(child, current_id, next_id + 1, visit)?;
        }
      }
    }
  }

  Ok(next_id)
}

#[cfg(test)]
fn leaf(category: &str, head_index: usize) -> ParseNode {
  ParseNode::leaf(category, head_index, format!("w{}", head_index))
}

/// Every tree over `leaves` tokens starting at `start` whose branches have
/// two or three children
#[cfg(test)]
fn tree_shapes(start: usize, leaves: usize) -> Vec<ParseNode> {
  if leaves == 1 {
    return vec![leaf(&format!("L{}", start), start)];
  }

  let mut shapes = Vec::new();
  for split in 1..leaves {
    for left in tree_shapes(start, split) {
      for right in tree_shapes(start + split, leaves - split) {
        shapes.push(ParseNode::branch("B", vec![left.clone(), right]));
      }
    }
  }
  for first in 1..leaves {
    for second in first + 1..leaves {
      for x in tree_shapes(start, first) {
        for y in tree_shapes(start + first, second - first) {
          for z in tree_shapes(start + second, leaves - second) {
            shapes.push(ParseNode::branch("B", vec![x.clone(), y.clone(), z]));
          }
        }
      }
    }
  }
  shapes
}

/// Copy of `node` with its `target`th node (pre-order, leaves included)
/// wrapped in a unary branch
#[cfg(test)]
fn wrap_nth(node: &ParseNode, target: usize, seen: &mut usize) -> ParseNode {
  let here = *seen;
  *seen += 1;
  let rebuilt = match node {
    ParseNode::Leaf(_) => node.clone(),
    ParseNode::Branch(c, children) => ParseNode::Branch(
      c.clone(),
      children.iter().map(|child| wrap_nth(child, target, seen)).collect(),
    ),
  };
  if here == target {
    ParseNode::branch("B", vec![rebuilt])
  } else {
    rebuilt
  }
}

/// Renames branches B0, B1, ... in pre-order
#[cfg(test)]
fn label_preorder(node: &mut ParseNode, next: &mut usize) {
  if let ParseNode::Branch(c, children) = node {
    c.category = format!("B{}", next);
    *next += 1;
    for child in children.iter_mut() {
      label_preorder(child, next);
    }
  }
}

#[cfg(test)]
fn depth(node: &ParseNode) -> usize {
  match node {
    ParseNode::Leaf(_) => 0,
    ParseNode::Branch(_, children) => 1 + children.iter().map(depth).max().unwrap_or(0),
  }
}

#[cfg(test)]
fn all_test_trees() -> Vec<ParseNode> {
  let mut trees = Vec::new();
  for leaves in 1..=6 {
    for shape in tree_shapes(0, leaves) {
      // and again with a unary rule above each node in turn
      for target in 0..shape.size() {
        trees.push(wrap_nth(&shape, target, &mut 0));
      }
      trees.push(shape);
    }
  }
  for tree in trees.iter_mut() {
    label_preorder(tree, &mut 0);
  }
  trees
}

#[test]
fn single_leaf_root() {
  let tree = leaf("N", 0);
  assert_eq!(compute_parents(&tree).unwrap(), vec![0]);
  assert_eq!(compute_categories(&tree).unwrap(), vec!["N"]);
}

#[test]
fn two_leaves_under_one_root() {
  let tree = ParseNode::branch("S", vec![leaf("NP", 0), leaf("VP", 1)]);

  assert_eq!(node_count(&tree), 3);
  assert_eq!(
    linearize(&tree).unwrap(),
    Linearization {
      parents: vec![3, 3, 0],
      categories: vec!["NP", "VP", "S"],
    }
  );
}

#[test]
fn right_branching_tree_numbers_branches_in_preorder() {
  let tree = ParseNode::branch(
    "S",
    vec![
      leaf("NP", 0),
      ParseNode::branch("S\\NP", vec![leaf("(S\\NP)/NP", 1), leaf("NP", 2)]),
    ],
  );

  // root is 4, the verb phrase 5
  assert_eq!(compute_parents(&tree).unwrap(), vec![4, 5, 5, 0, 4]);
  assert_eq!(
    compute_categories(&tree).unwrap(),
    vec!["NP", "(S\\NP)/NP", "NP", "S", "S\\NP"]
  );
}

#[test]
fn later_siblings_continue_after_earlier_subtrees() {
  // S -> (A -> (C -> x y) z) (B -> w v)
  let tree = ParseNode::branch(
    "S",
    vec![
      ParseNode::branch(
        "A",
        vec![
          ParseNode::branch("C", vec![leaf("x", 0), leaf("y", 1)]),
          leaf("z", 2),
        ],
      ),
      ParseNode::branch("B", vec![leaf("w", 3), leaf("v", 4)]),
    ],
  );

  let lin = linearize(&tree).unwrap();
  assert_eq!(lin.parents, vec![8, 8, 7, 9, 9, 0, 6, 7, 6]);
  assert_eq!(lin.categories, vec!["x", "y", "z", "w", "v", "S", "A", "C", "B"]);
}

#[test]
fn out_of_range_head_index_is_an_error() {
  let tree = ParseNode::branch("S", vec![leaf("NP", 0), leaf("VP", 7)]);
  assert!(matches!(
    compute_parents(&tree),
    Err(Error::HeadIndex { index: 7, size: 3 })
  ));
  assert!(matches!(
    compute_categories(&tree),
    Err(Error::HeadIndex { index: 7, size: 3 })
  ));
}

#[test]
fn arrays_cover_every_node() {
  for tree in all_test_trees() {
    let lin = linearize(&tree).unwrap();
    assert_eq!(lin.parents.len(), tree.size(), "{}", tree);
    assert_eq!(lin.categories.len(), tree.size(), "{}", tree);
  }
}

#[test]
fn parent_links_reach_the_root() {
  for tree in all_test_trees() {
    let parents = compute_parents(&tree).unwrap();
    let size = parents.len();
    let leaves = tree.leaf_count();

    if tree.is_branch() {
      assert_eq!(parents[leaves], 0, "{}", tree);
    }
    assert_eq!(parents.iter().filter(|&&p| p == 0).count(), 1, "{}", tree);

    for start in 0..size {
      let mut id = start + 1;
      let mut steps = 0;
      while parents[id - 1] != 0 {
        let parent = parents[id - 1];
        assert!(parent > leaves && parent <= size, "{}", tree);
        id = parent;
        steps += 1;
        assert!(steps <= depth(&tree), "{}", tree);
      }
    }
  }
}

#[test]
fn leaf_slots_follow_head_indices() {
  for tree in all_test_trees() {
    let categories = compute_categories(&tree).unwrap();
    for w in tree.words() {
      assert_eq!(categories[w.head_index], w.category, "{}", tree);
    }
  }
}

#[test]
fn branch_slots_follow_preorder() {
  for tree in all_test_trees().into_iter().filter(ParseNode::is_branch) {
    let categories = compute_categories(&tree).unwrap();
    let leaves = tree.leaf_count();
    for (k, category) in categories[leaves..].iter().enumerate() {
      assert_eq!(*category, format!("B{}", k), "{}", tree);
    }
  }
}

#[test]
fn linearizing_twice_gives_the_same_arrays() {
  for tree in all_test_trees() {
    assert_eq!(linearize(&tree).unwrap(), linearize(&tree).unwrap());
  }
}

#[test]
fn sweep_includes_inner_unary_and_ternary_branches() {
  fn has(node: &ParseNode, pred: &dyn Fn(&ParseNode) -> bool) -> bool {
    pred(node)
      || node
        .get_branch()
        .is_some_and(|(_, children)| children.iter().any(|c| has(c, pred)))
  }

  let trees = all_test_trees();
  let unary = |n: &ParseNode| n.get_branch().is_some_and(|(_, cs)| cs.len() == 1);
  let ternary = |n: &ParseNode| n.get_branch().is_some_and(|(_, cs)| cs.len() == 3);

  let inner_unary = |t: &ParseNode| {
    t.get_branch()
      .is_some_and(|(_, cs)| cs.iter().any(|c| has(c, &unary)))
  };
  assert!(trees.iter().any(inner_unary));
  assert!(trees.iter().any(|t| has(t, &ternary)));
}

#[test]
fn inner_unary_rule_gets_the_next_preorder_id() {
  // S -> NP (S\NP -> (S\NP -> runs))
  let tree = ParseNode::branch(
    "S",
    vec![
      leaf("NP", 0),
      ParseNode::branch("S\\NP", vec![ParseNode::branch("S\\NP", vec![leaf("S\\NP", 1)])]),
    ],
  );

  assert_eq!(compute_parents(&tree).unwrap(), vec![3, 5, 0, 3, 4]);
}
