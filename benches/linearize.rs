use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ccgflat::{linearize, ParseNode};

const SHORT: &str = r"(<T S[dcl] 1 2> (<L NP NNP NNP John NP>) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/NP VBZ VBZ loves (S[dcl]\NP_10)/NP_11>) (<L NP NNP NNP Mary NP>) ) )";

/// Left-branching chain over `n` tokens
fn long_tree(n: usize) -> ParseNode {
  let mut tree = ParseNode::leaf("N", 0, "w0");
  for i in 1..n {
    tree = ParseNode::branch("N", vec![tree, ParseNode::leaf("N", i, format!("w{}", i))]);
  }
  tree
}

fn criterion_benchmark(c: &mut Criterion) {
  let short = SHORT.parse::<ParseNode>().unwrap();
  let long = long_tree(100);

  c.bench_function("read derivation", |b| {
    b.iter(|| black_box(SHORT).parse::<ParseNode>().unwrap())
  });

  c.bench_function("linearize short", |b| {
    b.iter(|| linearize(black_box(&short)).unwrap().len())
  });

  c.bench_function("linearize 100 tokens", |b| {
    b.iter(|| linearize(black_box(&long)).unwrap().len())
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
