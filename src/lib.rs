//! cnf-oracle: membership checks for grammars in (near) Chomsky Normal Form.
//!
//! This crate provides:
//! - Grammar representation and structural validation
//! - CYK recognition over a flat span-major chart (Boolean and Count semirings)
//! - Validation of heap-encoded parse-choice trees
//! - Uniform sampling of distinct negative examples
//! - A positive/negative check harness, JSON wire formats and experiment config
//! - Python bindings via PyO3 (feature `python`)

pub mod chart;
pub mod config;
pub mod cyk;
pub mod grammar;
pub mod harness;
pub mod sampling;
pub mod semiring;
pub mod tree;
pub mod vocab;
pub mod wire;

#[cfg(feature = "python")]
mod python;

// Re-exports for convenience
pub use chart::CykChart;
pub use config::{ConfigError, ExperimentConfig, NegMode};
pub use cyk::{recognize, CykRecognizer};
pub use grammar::{Grammar, GrammarConfig, GrammarError, NtId, RuleKind, TermRule, TokenId, VarRule, START};
pub use harness::{Algo, CheckReport, Harness, HarnessError};
pub use sampling::{NegativeSampler, NegativeSamples, NegativeSource, SamplingConfig, SamplingError};
pub use semiring::{Boolean, Count, Semiring};
pub use tree::{check_sizes, validate, ParseChoiceTree, TreeStructureError, TreeValidator};
pub use vocab::{VocabError, Vocabulary};
pub use wire::WireError;
