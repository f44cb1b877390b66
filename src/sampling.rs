//! Negative example generation.
//!
//! For every length `L` in `1..max_len` the sampler draws
//! `min(floor(vocab_size^L * neg_ratio), neg_per_len)` distinct token
//! sequences uniformly from the `vocab_size^L` possible ones. Sequences are
//! not checked against any grammar; they are candidates a grammar is
//! expected to reject.
//!
//! Sparse targets use rejection sampling against a per-length set. Once the
//! target exceeds half of the available sequences, the sampler instead picks
//! distinct indices into the enumerated space, so the number of draws is
//! always bounded. A target larger than the space is an error.

use crate::grammar::TokenId;
use log::{debug, trace};
use rand::seq::index;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised before or during sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("neg_ratio must be finite and non-negative, got {0}")]
    InvalidRatio(f64),
    #[error("length {len}: {target} distinct sequences requested but only {available} exist")]
    Exhausted {
        len: usize,
        target: usize,
        available: usize,
    },
}

/// Parameters of automatic negative sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Exclusive upper bound on sampled lengths.
    pub max_len: usize,
    /// Largest fraction of all sequences of a length to draw.
    pub neg_ratio: f64,
    /// Largest number of sequences to draw per length.
    pub neg_per_len: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            max_len: 5,
            neg_ratio: 0.1,
            neg_per_len: 5,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), SamplingError> {
        if !self.neg_ratio.is_finite() || self.neg_ratio < 0.0 {
            return Err(SamplingError::InvalidRatio(self.neg_ratio));
        }
        Ok(())
    }

    /// Number of sequences to draw for length `len`.
    ///
    /// `vocab_size^len * neg_ratio` is evaluated in floating point and
    /// truncated, so small vocabularies get no sequences at short lengths.
    pub fn target(&self, vocab_size: usize, len: usize) -> usize {
        let exponent = i32::try_from(len).unwrap_or(i32::MAX);
        let bound = ((vocab_size as f64).powi(exponent) * self.neg_ratio).floor();
        // Float-to-int casts saturate; NaN maps to 0.
        (bound as usize).min(self.neg_per_len)
    }
}

/// Number of distinct sequences of length `len`, or `None` if it does not
/// fit in a `usize`.
pub fn space_size(vocab_size: usize, len: usize) -> Option<usize> {
    let exponent = u32::try_from(len).ok()?;
    vocab_size.checked_pow(exponent)
}

/// Distinct sequences of one length, in draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeSet {
    items: Vec<Vec<TokenId>>,
    seen: FxHashSet<Vec<TokenId>>,
}

impl NegativeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `seq` unless it is already present; returns whether it was added.
    pub fn insert(&mut self, seq: Vec<TokenId>) -> bool {
        if self.seen.contains(&seq) {
            return false;
        }
        self.seen.insert(seq.clone());
        self.items.push(seq);
        true
    }

    pub fn contains(&self, seq: &[TokenId]) -> bool {
        self.seen.contains(seq)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<TokenId>> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Vec<TokenId>> {
        self.items
    }
}

/// Sampled negatives keyed by length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeSamples {
    by_len: BTreeMap<usize, NegativeSet>,
}

impl NegativeSamples {
    pub fn get(&self, len: usize) -> Option<&NegativeSet> {
        self.by_len.get(&len)
    }

    /// Sampled lengths in increasing order, including those with no sequences.
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_len.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &NegativeSet)> {
        self.by_len.iter().map(|(&len, set)| (len, set))
    }

    /// Total number of sequences over all lengths.
    pub fn len(&self) -> usize {
        self.by_len.values().map(NegativeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sequences, by increasing length and then draw order.
    pub fn flatten(self) -> Vec<Vec<TokenId>> {
        self.by_len.into_values().flat_map(NegativeSet::into_vec).collect()
    }

    /// Lengths mapped to plain sequence lists.
    pub fn into_map(self) -> BTreeMap<usize, Vec<Vec<TokenId>>> {
        self.by_len.into_iter().map(|(len, set)| (len, set.into_vec())).collect()
    }
}

/// Draws negative examples over a fixed vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct NegativeSampler {
    vocab_size: usize,
    config: SamplingConfig,
}

impl NegativeSampler {
    pub fn new(vocab_size: usize, config: SamplingConfig) -> Result<Self, SamplingError> {
        config.validate()?;
        Ok(NegativeSampler { vocab_size, config })
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Sample every length in `1..max_len`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NegativeSamples, SamplingError> {
        let mut samples = NegativeSamples::default();
        for len in 1..self.config.max_len {
            let set = self.sample_len(len, rng)?;
            samples.by_len.insert(len, set);
        }
        debug!(
            "sampled {} negatives over lengths 1..{} (vocab_size={})",
            samples.len(),
            self.config.max_len,
            self.vocab_size
        );
        Ok(samples)
    }

    /// Sample the distinct sequences of one length.
    pub fn sample_len<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> Result<NegativeSet, SamplingError> {
        let target = self.config.target(self.vocab_size, len);
        let mut set = NegativeSet::new();
        if target == 0 {
            return Ok(set);
        }

        let available = space_size(self.vocab_size, len);
        match available {
            Some(available) if target > available => {
                return Err(SamplingError::Exhausted {
                    len,
                    target,
                    available,
                });
            }
            Some(available) if target > available / 2 => {
                trace!("len {}: dense draw of {} out of {}", len, target, available);
                for idx in index::sample(rng, available, target).iter() {
                    set.insert(self.decode(idx, len));
                }
            }
            _ => {
                let mut draws = 0usize;
                while set.len() < target {
                    let seq: Vec<TokenId> = (0..len).map(|_| rng.gen_range(0..self.vocab_size)).collect();
                    set.insert(seq);
                    draws += 1;
                }
                trace!("len {}: {} distinct in {} draws", len, target, draws);
            }
        }
        Ok(set)
    }

    /// The `idx`-th sequence of length `len` in lexicographic order.
    fn decode(&self, mut idx: usize, len: usize) -> Vec<TokenId> {
        let mut seq = vec![0; len];
        for slot in seq.iter_mut().rev() {
            *slot = idx % self.vocab_size;
            idx /= self.vocab_size;
        }
        seq
    }
}

/// Draw negatives for lengths `1..max_len` over `vocab_size` tokens.
pub fn sample<R: Rng + ?Sized>(
    vocab_size: usize,
    max_len: usize,
    neg_ratio: f64,
    neg_per_len: usize,
    rng: &mut R,
) -> Result<NegativeSamples, SamplingError> {
    let config = SamplingConfig {
        max_len,
        neg_ratio,
        neg_per_len,
    };
    NegativeSampler::new(vocab_size, config)?.sample(rng)
}

/// Where negative examples come from.
#[derive(Debug, Clone, PartialEq)]
pub enum NegativeSource {
    /// Randomly sampled.
    Auto(SamplingConfig),
    /// Supplied by the caller and used verbatim.
    Manual(Vec<Vec<TokenId>>),
}

impl NegativeSource {
    /// Produce the negative examples, ordered by length for sampled sources.
    pub fn collect<R: Rng + ?Sized>(&self, vocab_size: usize, rng: &mut R) -> Result<Vec<Vec<TokenId>>, SamplingError> {
        match self {
            NegativeSource::Auto(config) => Ok(NegativeSampler::new(vocab_size, *config)?.sample(rng)?.flatten()),
            NegativeSource::Manual(sequences) => Ok(sequences.clone()),
        }
    }
}
