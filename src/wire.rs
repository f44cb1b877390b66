//! JSON encodings of grammars, parse trees and examples.
//!
//! The encodings carry explicit counts (`n`, `k`, `N`) next to their arrays;
//! decoding checks every count against the array it describes before
//! building the in-memory types.

use crate::grammar::{Grammar, GrammarError, NtId, TermRule, TokenId, VarRule};
use crate::tree::{ParseChoiceTree, TreeStructureError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("tree #{index}: {source}")]
    Tree {
        index: usize,
        #[source]
        source: TreeStructureError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarRuleDescription {
    pub k: usize,
    pub outputs: Vec<[NtId; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRuleDescription {
    pub k: usize,
    pub outputs: Vec<TokenId>,
}

/// `{n, var_rules: [{k, outputs: [[B, C], ..]}], term_rules: [{k, outputs: [t, ..]}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarDescription {
    pub n: usize,
    pub var_rules: Vec<VarRuleDescription>,
    pub term_rules: Vec<TermRuleDescription>,
}

impl TryFrom<GrammarDescription> for Grammar {
    type Error = GrammarError;

    fn try_from(desc: GrammarDescription) -> Result<Self, Self::Error> {
        if desc.var_rules.len() != desc.n || desc.term_rules.len() != desc.n {
            return Err(GrammarError::Shape(format!(
                "n = {} but {} var_rules and {} term_rules",
                desc.n,
                desc.var_rules.len(),
                desc.term_rules.len()
            )));
        }

        let mut var_rules = Vec::with_capacity(desc.n);
        for (nt, rule) in desc.var_rules.into_iter().enumerate() {
            if rule.k != rule.outputs.len() {
                return Err(GrammarError::Shape(format!(
                    "var_rules[{}]: k = {} but {} outputs",
                    nt,
                    rule.k,
                    rule.outputs.len()
                )));
            }
            var_rules.push(VarRule::new(rule.outputs.into_iter().map(|[b, c]| (b, c)).collect()));
        }

        let mut term_rules = Vec::with_capacity(desc.n);
        for (nt, rule) in desc.term_rules.into_iter().enumerate() {
            if rule.k != rule.outputs.len() {
                return Err(GrammarError::Shape(format!(
                    "term_rules[{}]: k = {} but {} outputs",
                    nt,
                    rule.k,
                    rule.outputs.len()
                )));
            }
            term_rules.push(TermRule::new(rule.outputs));
        }

        Grammar::from_rules(var_rules, term_rules)
    }
}

impl From<&Grammar> for GrammarDescription {
    fn from(grammar: &Grammar) -> Self {
        GrammarDescription {
            n: grammar.n(),
            var_rules: grammar
                .var_rules()
                .iter()
                .map(|rule| VarRuleDescription {
                    k: rule.k(),
                    outputs: rule.outputs.iter().map(|&(b, c)| [b, c]).collect(),
                })
                .collect(),
            term_rules: grammar
                .term_rules()
                .iter()
                .map(|rule| TermRuleDescription {
                    k: rule.k(),
                    outputs: rule.outputs.clone(),
                })
                .collect(),
        }
    }
}

/// `{N, choices: [..], sizes: [..]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDescription {
    #[serde(rename = "N")]
    pub n: usize,
    pub choices: Vec<usize>,
    pub sizes: Vec<usize>,
}

impl TryFrom<TreeDescription> for ParseChoiceTree {
    type Error = TreeStructureError;

    fn try_from(desc: TreeDescription) -> Result<Self, Self::Error> {
        if desc.choices.len() != desc.n || desc.sizes.len() != desc.n {
            return Err(TreeStructureError::SlotCount {
                declared: desc.n,
                choices: desc.choices.len(),
                sizes: desc.sizes.len(),
            });
        }
        ParseChoiceTree::new(desc.choices, desc.sizes)
    }
}

impl From<&ParseChoiceTree> for TreeDescription {
    fn from(tree: &ParseChoiceTree) -> Self {
        TreeDescription {
            n: tree.len(),
            choices: tree.choices().to_vec(),
            sizes: tree.sizes().to_vec(),
        }
    }
}

pub fn parse_grammar(json: &str) -> Result<Grammar, WireError> {
    let desc: GrammarDescription = serde_json::from_str(json)?;
    Ok(Grammar::try_from(desc)?)
}

pub fn grammar_to_json(grammar: &Grammar) -> Result<String, WireError> {
    Ok(serde_json::to_string(&GrammarDescription::from(grammar))?)
}

/// Decode a JSON array of token-id arrays.
pub fn parse_examples(json: &str) -> Result<Vec<Vec<TokenId>>, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a JSON array of tree descriptions.
pub fn parse_trees(json: &str) -> Result<Vec<ParseChoiceTree>, WireError> {
    let descs: Vec<TreeDescription> = serde_json::from_str(json)?;
    descs
        .into_iter()
        .enumerate()
        .map(|(index, desc)| ParseChoiceTree::try_from(desc).map_err(|source| WireError::Tree { index, source }))
        .collect()
}
