//! Positive/negative acceptance check for one grammar.
//!
//! A candidate grammar passes when it accepts every positive example and
//! rejects every negative one. Positives are checked either by CYK or by a
//! caller-supplied derivation tree per example; negatives are always
//! checked by CYK.

use crate::cyk::CykRecognizer;
use crate::grammar::{Grammar, GrammarConfig, GrammarError, TokenId};
use crate::tree::{ParseChoiceTree, TreeStructureError, TreeValidator};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How positive examples are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algo {
    #[default]
    Cyk,
    ParseTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("parse_tree checking needs one tree per example")]
    MissingTrees,
    #[error("{examples} examples but {trees} trees")]
    TreeCount { examples: usize, trees: usize },
}

/// Outcome of [`Harness::check`]. Indices refer to the input slices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub positives: usize,
    pub negatives: usize,
    pub rejected_positives: Vec<usize>,
    pub accepted_negatives: Vec<usize>,
    /// Trees that failed the size check, with the reason. Their examples are
    /// also listed in `rejected_positives`.
    pub malformed_trees: Vec<(usize, TreeStructureError)>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.rejected_positives.is_empty() && self.accepted_negatives.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "positives: {}/{} accepted",
            self.positives - self.rejected_positives.len(),
            self.positives
        )?;
        writeln!(
            f,
            "negatives: {}/{} rejected",
            self.negatives - self.accepted_negatives.len(),
            self.negatives
        )?;
        for (index, err) in &self.malformed_trees {
            writeln!(f, "  tree #{}: {}", index, err)?;
        }
        write!(f, "{}", if self.passed() { "PASS" } else { "FAIL" })
    }
}

/// A validated grammar ready to be checked against data.
pub struct Harness<'g> {
    recognizer: CykRecognizer<'g>,
    validator: TreeValidator<'g>,
}

impl<'g> Harness<'g> {
    /// Validate `grammar` once; all later checks rely on it.
    pub fn new(grammar: &'g Grammar, vocab_size: usize, config: &GrammarConfig) -> Result<Self, HarnessError> {
        grammar.validate(vocab_size, config)?;
        Ok(Harness {
            recognizer: CykRecognizer::new(grammar),
            validator: TreeValidator::new(grammar),
        })
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.recognizer.grammar()
    }

    /// Check `examples` (by `algo`) and `negatives` (by CYK).
    pub fn check(
        &self,
        algo: Algo,
        examples: &[Vec<TokenId>],
        trees: Option<&[ParseChoiceTree]>,
        negatives: &[Vec<TokenId>],
    ) -> Result<CheckReport, HarnessError> {
        let mut report = CheckReport {
            positives: examples.len(),
            negatives: negatives.len(),
            ..CheckReport::default()
        };

        match algo {
            Algo::Cyk => {
                for (i, example) in examples.iter().enumerate() {
                    if !self.recognizer.recognize(example) {
                        report.rejected_positives.push(i);
                    }
                }
            }
            Algo::ParseTree => {
                let trees = trees.ok_or(HarnessError::MissingTrees)?;
                if trees.len() != examples.len() {
                    return Err(HarnessError::TreeCount {
                        examples: examples.len(),
                        trees: trees.len(),
                    });
                }
                for (i, (example, tree)) in examples.iter().zip(trees).enumerate() {
                    match self.validator.check(example, tree) {
                        Ok(true) => {}
                        Ok(false) => report.rejected_positives.push(i),
                        Err(err) => {
                            debug!("tree #{} is malformed: {}", i, err);
                            report.rejected_positives.push(i);
                            report.malformed_trees.push((i, err));
                        }
                    }
                }
            }
        }

        for (i, negative) in negatives.iter().enumerate() {
            if self.recognizer.recognize(negative) {
                report.accepted_negatives.push(i);
            }
        }

        info!(
            "check ({:?}): {} of {} positives rejected, {} of {} negatives accepted",
            algo,
            report.rejected_positives.len(),
            report.positives,
            report.accepted_negatives.len(),
            report.negatives
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::tests::pair_grammar;
    use crate::sampling::{NegativeSource, SamplingConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn tree(sizes: &[usize]) -> ParseChoiceTree {
        ParseChoiceTree::new(vec![0; sizes.len()], sizes.to_vec()).unwrap()
    }

    #[test]
    fn test_invalid_grammar_rejected_upfront() {
        let mut g = pair_grammar();
        g.add_binary(1, 0, 0);
        let err = Harness::new(&g, 1, &GrammarConfig::strict()).err();
        assert!(matches!(err, Some(HarnessError::Grammar(GrammarError::StartOnRhs { .. }))));
    }

    #[test]
    fn test_cyk_check() {
        let g = pair_grammar();
        let harness = Harness::new(&g, 2, &GrammarConfig::strict()).unwrap();
        let report = harness
            .check(Algo::Cyk, &[vec![0, 0], vec![0]], None, &[vec![1], vec![0, 0]])
            .unwrap();
        assert_eq!(report.rejected_positives, vec![1]);
        assert_eq!(report.accepted_negatives, vec![1]);
        assert!(!report.passed());
    }

    #[test]
    fn test_parse_tree_check() {
        let g = pair_grammar();
        let harness = Harness::new(&g, 1, &GrammarConfig::strict()).unwrap();
        let examples = vec![vec![0, 0], vec![0, 0]];
        let trees = vec![tree(&[2, 1, 1]), tree(&[2, 0, 1])];
        let report = harness.check(Algo::ParseTree, &examples, Some(&trees), &[]).unwrap();
        assert_eq!(report.rejected_positives, vec![1]);
        assert_eq!(report.malformed_trees.len(), 1);
        assert_eq!(report.malformed_trees[0].0, 1);
    }

    #[test]
    fn test_parse_tree_needs_trees() {
        let g = pair_grammar();
        let harness = Harness::new(&g, 1, &GrammarConfig::strict()).unwrap();
        assert_eq!(
            harness.check(Algo::ParseTree, &[vec![0, 0]], None, &[]),
            Err(HarnessError::MissingTrees)
        );
        assert_eq!(
            harness.check(Algo::ParseTree, &[vec![0, 0]], Some(&[]), &[]),
            Err(HarnessError::TreeCount { examples: 1, trees: 0 })
        );
    }

    #[test]
    fn test_sampled_negatives() {
        // N0 -> N1 N1 over a 3-token vocabulary accepts only [0, 0]; sampled
        // negatives start at length 3 and are all rejected.
        let g = pair_grammar();
        let harness = Harness::new(&g, 3, &GrammarConfig::strict()).unwrap();
        let negatives = NegativeSource::Auto(SamplingConfig::default())
            .collect(3, &mut ChaCha8Rng::seed_from_u64(142857))
            .unwrap();
        assert_eq!(negatives.len(), 7);

        let report = harness.check(Algo::Cyk, &[vec![0, 0]], None, &negatives).unwrap();
        assert!(report.passed());
        assert!(report.to_string().ends_with("PASS"));
    }
}
