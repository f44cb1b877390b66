//! CYK recognition over a CNF grammar.
//!
//! The recognizer flattens the grammar once into two lookup structures:
//! - a lexical index from token to the nonterminals that emit it
//! - a flat list of `(parent, left, right)` binary rules
//!
//! and then fills a [`CykChart`] bottom-up by increasing span length, so
//! every sub-constituent is complete before any longer span reads it.
//!
//! The chart is generic over a [`Semiring`]: with [`Boolean`] it decides
//! membership, with [`Count`] it counts distinct derivations.

use crate::chart::{ChartView, CykChart};
use crate::grammar::{Grammar, NtId, TokenId, START};
use crate::semiring::{Boolean, Count, Semiring};
use crate::tree::ParseChoiceTree;
use log::{debug, warn};
use rustc_hash::FxHashMap;

/// Largest heap-encoded tree [`CykRecognizer::derive`] will build.
pub const MAX_TREE_SLOTS: usize = 1 << 20;

/// A binary rule `parent -> left right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BinaryRule {
    parent: NtId,
    left: NtId,
    right: NtId,
}

/// Bottom-up membership oracle for one grammar.
#[derive(Clone, Debug)]
pub struct CykRecognizer<'g> {
    grammar: &'g Grammar,
    /// token -> nonterminals with a matching terminal alternative, one entry
    /// per alternative
    lexical: FxHashMap<TokenId, Vec<NtId>>,
    binary: Vec<BinaryRule>,
}

impl<'g> CykRecognizer<'g> {
    /// Index `grammar` for recognition.
    ///
    /// Rules naming a nonterminal outside the grammar are dropped, so an
    /// unvalidated grammar yields defined (if meaningless) answers instead of
    /// panicking.
    pub fn new(grammar: &'g Grammar) -> Self {
        let n = grammar.n();

        let mut lexical: FxHashMap<TokenId, Vec<NtId>> = FxHashMap::default();
        for (nt, rule) in grammar.term_rules().iter().enumerate() {
            for &token in &rule.outputs {
                lexical.entry(token).or_default().push(nt);
            }
        }

        let mut binary = Vec::with_capacity(grammar.var_rules().iter().map(|r| r.k()).sum());
        for (parent, rule) in grammar.var_rules().iter().enumerate() {
            for &(left, right) in &rule.outputs {
                if left < n && right < n {
                    binary.push(BinaryRule { parent, left, right });
                }
            }
        }

        CykRecognizer {
            grammar,
            lexical,
            binary,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[inline(always)]
    fn lexical(&self, token: TokenId) -> &[NtId] {
        self.lexical.get(&token).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Fill the cell `(span, start)` from the shorter layers in `view`.
    #[inline]
    fn fill_cell<S: Semiring>(&self, view: &ChartView<'_, S>, span: usize, start: usize, cell: &mut [S]) {
        for split in 1..span {
            for rule in &self.binary {
                let left = view.get(split, start, rule.left);
                if left.is_zero() {
                    continue;
                }
                let right = view.get(span - split, start + split, rule.right);
                if right.is_zero() {
                    continue;
                }
                cell[rule.parent] = cell[rule.parent] + left * right;
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn fill_layer<S: Semiring>(&self, chart: &mut CykChart<S>, span: usize) {
        let n = chart.num_nonterminals();
        let (view, layer) = chart.split_layer(span);
        for (start, cell) in layer.chunks_mut(n).enumerate() {
            self.fill_cell(&view, span, start, cell);
        }
    }

    /// Cells within a layer are independent; the layer loop in
    /// [`inside`](Self::inside) is the barrier between layers.
    #[cfg(feature = "parallel")]
    fn fill_layer<S: Semiring>(&self, chart: &mut CykChart<S>, span: usize) {
        use rayon::prelude::*;

        let n = chart.num_nonterminals();
        let (view, layer) = chart.split_layer(span);
        layer
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(start, cell)| self.fill_cell(&view, span, start, cell));
    }

    /// Build the full chart for `sentence` in semiring `S`.
    pub fn inside<S: Semiring>(&self, sentence: &[TokenId]) -> CykChart<S> {
        let len = sentence.len();
        let n = self.grammar.n();
        let mut chart = CykChart::new(len, n);
        if n == 0 {
            return chart;
        }

        // Phase 1: one token per cell
        for (start, &token) in sentence.iter().enumerate() {
            let cell = chart.cell_mut(1, start);
            for &nt in self.lexical(token) {
                cell[nt] = cell[nt] + S::one();
            }
        }

        // Phase 2: bottom-up by increasing span length
        for span in 2..=len {
            self.fill_layer(&mut chart, span);
        }

        chart
    }

    /// Whether the start nonterminal derives `sentence`. The empty sentence
    /// is never derivable: no production of this grammar form is nullable.
    pub fn recognize(&self, sentence: &[TokenId]) -> bool {
        if sentence.is_empty() || self.grammar.n() == 0 {
            return false;
        }
        let chart: CykChart<Boolean> = self.inside(sentence);
        let accepted = chart.goal(START).value();
        debug!(
            "cyk: len={} items={} accepted={}",
            sentence.len(),
            chart.num_items(),
            accepted
        );
        accepted
    }

    /// Number of distinct derivations of `sentence` from the start
    /// nonterminal, saturating at `u64::MAX`.
    pub fn count_derivations(&self, sentence: &[TokenId]) -> u64 {
        if sentence.is_empty() {
            return 0;
        }
        let chart: CykChart<Count> = self.inside(sentence);
        chart.goal(START).value()
    }

    /// Reconstruct one derivation of `sentence` as a heap-encoded tree.
    ///
    /// Alternatives are tried in split order, then rule order, so the result
    /// is deterministic. Returns `None` when the sentence is not derivable or
    /// when the heap encoding would need more than [`MAX_TREE_SLOTS`] slots.
    pub fn derive(&self, sentence: &[TokenId]) -> Option<ParseChoiceTree> {
        if sentence.is_empty() || self.grammar.n() == 0 {
            return None;
        }
        let chart: CykChart<Boolean> = self.inside(sentence);
        if !chart.contains(sentence.len(), 0, START) {
            return None;
        }

        let mut tree = ParseChoiceTree::default();
        if self.build(&chart, sentence, sentence.len(), 0, START, 0, &mut tree) {
            Some(tree)
        } else {
            warn!(
                "derivation of length {} exceeds {} tree slots",
                sentence.len(),
                MAX_TREE_SLOTS
            );
            None
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        chart: &CykChart<Boolean>,
        sentence: &[TokenId],
        span: usize,
        start: usize,
        nt: NtId,
        node: usize,
        tree: &mut ParseChoiceTree,
    ) -> bool {
        if node >= MAX_TREE_SLOTS {
            return false;
        }

        if span == 1 {
            let token = sentence[start];
            let choice = self
                .grammar
                .term_rule(nt)
                .and_then(|rule| rule.outputs.iter().position(|&t| t == token));
            return match choice {
                Some(choice) => {
                    tree.set(node, 1, choice);
                    true
                }
                None => false,
            };
        }

        let Some(rule) = self.grammar.var_rule(nt) else {
            return false;
        };
        let left_node = 2 * node + 1;
        for split in 1..span {
            for (choice, &(left, right)) in rule.outputs.iter().enumerate() {
                if chart.contains(split, start, left) && chart.contains(span - split, start + split, right) {
                    tree.set(node, span, choice);
                    return self.build(chart, sentence, split, start, left, left_node, tree)
                        && self.build(chart, sentence, span - split, start + split, right, left_node + 1, tree);
                }
            }
        }
        false
    }
}

/// Whether the start nonterminal of `grammar` derives `sentence`.
pub fn recognize(grammar: &Grammar, sentence: &[TokenId]) -> bool {
    CykRecognizer::new(grammar).recognize(sentence)
}
