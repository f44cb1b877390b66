//! Benchmarks for CYK recognition and parse-tree validation.
//!
//! Uses a PP-attachment grammar, where the number of derivations grows with
//! every prepositional phrase:
//!   S -> NP VP, NP -> Det N | NP PP, VP -> V NP | VP PP, PP -> P NP

use cnf_oracle::{CykRecognizer, Grammar, TokenId, TreeValidator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const THE: TokenId = 0;
const MAN: TokenId = 1;
const TELESCOPE: TokenId = 2;
const SAW: TokenId = 3;
const WITH: TokenId = 4;

fn pp_grammar() -> Grammar {
    let mut g = Grammar::new(8);
    g.add_binary(0, 1, 2)
        .add_binary(1, 4, 5)
        .add_binary(1, 1, 3)
        .add_binary(2, 6, 1)
        .add_binary(2, 2, 3)
        .add_binary(3, 7, 1)
        .add_terminal(4, THE)
        .add_terminal(5, MAN)
        .add_terminal(5, TELESCOPE)
        .add_terminal(6, SAW)
        .add_terminal(7, WITH);
    g
}

/// "the man saw the man" followed by `pps` copies of "with the telescope".
fn sentence(pps: usize) -> Vec<TokenId> {
    let mut words = vec![THE, MAN, SAW, THE, MAN];
    for _ in 0..pps {
        words.extend([WITH, THE, TELESCOPE]);
    }
    words
}

fn bench_recognize(c: &mut Criterion) {
    let g = pp_grammar();
    let cyk = CykRecognizer::new(&g);
    let mut group = c.benchmark_group("recognize");
    for pps in [0, 2, 5, 10] {
        let s = sentence(pps);
        group.bench_with_input(BenchmarkId::from_parameter(s.len()), &s, |b, s| {
            b.iter(|| cyk.recognize(black_box(s)))
        });
    }
    group.finish();
}

fn bench_count(c: &mut Criterion) {
    let g = pp_grammar();
    let cyk = CykRecognizer::new(&g);
    let mut group = c.benchmark_group("count_derivations");
    for pps in [0, 2, 5, 10] {
        let s = sentence(pps);
        group.bench_with_input(BenchmarkId::from_parameter(s.len()), &s, |b, s| {
            b.iter(|| cyk.count_derivations(black_box(s)))
        });
    }
    group.finish();
}

fn bench_rejected(c: &mut Criterion) {
    let g = pp_grammar();
    let cyk = CykRecognizer::new(&g);
    // Ungrammatical: the verb is missing.
    let s: Vec<TokenId> = sentence(5).into_iter().filter(|&t| t != SAW).collect();
    c.bench_function("recognize_rejected", |b| b.iter(|| cyk.recognize(black_box(&s))));
}

fn bench_validate_tree(c: &mut Criterion) {
    let g = pp_grammar();
    let s = sentence(3);
    let Some(tree) = CykRecognizer::new(&g).derive(&s) else {
        panic!("sentence is in the language");
    };
    let validator = TreeValidator::new(&g);
    c.bench_function("validate_tree", |b| {
        b.iter(|| validator.validate(black_box(&s), black_box(&tree)))
    });
}

criterion_group!(benches, bench_recognize, bench_count, bench_rejected, bench_validate_tree);
criterion_main!(benches);
