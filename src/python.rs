//! Python bindings.

use crate::cyk::CykRecognizer;
use crate::grammar::{self, GrammarConfig, NtId, TermRule, TokenId, VarRule};
use crate::sampling;
use crate::tree::{self, ParseChoiceTree, TreeValidator};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn to_tree(choices: Vec<usize>, sizes: Vec<usize>) -> PyResult<ParseChoiceTree> {
    ParseChoiceTree::new(choices, sizes).map_err(value_error)
}

/// Python wrapper for Grammar.
///
/// `var_rules[i]` lists the `(B, C)` pairs of nonterminal `i`, and
/// `term_rules[i]` its terminal ids.
#[pyclass(name = "Grammar")]
#[derive(Clone)]
struct PyGrammar {
    inner: grammar::Grammar,
}

#[pymethods]
impl PyGrammar {
    #[new]
    fn new(var_rules: Vec<Vec<(NtId, NtId)>>, term_rules: Vec<Vec<TokenId>>) -> PyResult<Self> {
        let inner = grammar::Grammar::from_rules(
            var_rules.into_iter().map(VarRule::new).collect(),
            term_rules.into_iter().map(TermRule::new).collect(),
        )
        .map_err(value_error)?;
        Ok(PyGrammar { inner })
    }

    /// Raise ValueError if the grammar is not well formed.
    #[pyo3(signature = (vocab_size, relax_chomsky=false, restrict_term=false))]
    fn validate(&self, vocab_size: usize, relax_chomsky: bool, restrict_term: bool) -> PyResult<()> {
        let config = GrammarConfig {
            relax_chomsky,
            restrict_term,
        };
        self.inner.validate(vocab_size, &config).map_err(value_error)
    }

    #[getter]
    fn n(&self) -> usize {
        self.inner.n()
    }

    fn recognize(&self, sentence: Vec<TokenId>) -> bool {
        CykRecognizer::new(&self.inner).recognize(&sentence)
    }

    fn count_derivations(&self, sentence: Vec<TokenId>) -> u64 {
        CykRecognizer::new(&self.inner).count_derivations(&sentence)
    }

    /// Check a derivation given as parallel `choices`/`sizes` arrays.
    fn validate_tree(&self, sentence: Vec<TokenId>, choices: Vec<usize>, sizes: Vec<usize>) -> PyResult<bool> {
        let tree = to_tree(choices, sizes)?;
        TreeValidator::new(&self.inner).check(&sentence, &tree).map_err(value_error)
    }

    /// One derivation as `(choices, sizes)`, or None.
    fn derive(&self, sentence: Vec<TokenId>) -> Option<(Vec<usize>, Vec<usize>)> {
        CykRecognizer::new(&self.inner)
            .derive(&sentence)
            .map(|tree| (tree.choices().to_vec(), tree.sizes().to_vec()))
    }

    fn __repr__(&self) -> String {
        format!("Grammar(n={}, productions={})", self.inner.n(), self.inner.num_productions())
    }

    fn __str__(&self) -> String {
        format!("{}", self.inner)
    }
}

/// Raise ValueError if the tree's sizes are inconsistent.
#[pyfunction]
fn check_sizes(choices: Vec<usize>, sizes: Vec<usize>) -> PyResult<()> {
    tree::check_sizes(&to_tree(choices, sizes)?).map_err(value_error)
}

/// Sample distinct negatives, keyed by length.
#[pyfunction]
#[pyo3(signature = (vocab_size, max_len=5, neg_ratio=0.1, neg_per_len=5, seed=142857))]
fn sample_negatives(
    vocab_size: usize,
    max_len: usize,
    neg_ratio: f64,
    neg_per_len: usize,
    seed: u64,
) -> PyResult<BTreeMap<usize, Vec<Vec<TokenId>>>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let samples =
        sampling::sample(vocab_size, max_len, neg_ratio, neg_per_len, &mut rng).map_err(value_error)?;
    Ok(samples.into_map())
}

/// Python module definition.
#[pymodule]
fn cnf_oracle(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyGrammar>()?;
    m.add_function(wrap_pyfunction!(check_sizes, m)?)?;
    m.add_function(wrap_pyfunction!(sample_negatives, m)?)?;
    Ok(())
}
