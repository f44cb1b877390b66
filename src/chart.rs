//! Dense CYK chart.
//!
//! Cells are addressed by `(span, start, nonterminal)` with `span` in
//! `1..=len`. Storage is one flat array laid out span-major, so every span
//! layer is a contiguous slice. Filling a layer only reads strictly shorter
//! spans, which [`CykChart::split_layer`] exposes as a read-only
//! [`ChartView`] next to the mutable layer being written.

use crate::grammar::NtId;
use crate::semiring::Semiring;

/// Read-only access to a prefix of span layers.
#[derive(Clone, Copy, Debug)]
pub struct ChartView<'a, S: Semiring> {
    cells: &'a [S],
    len: usize,
    n: usize,
}

impl<'a, S: Semiring> ChartView<'a, S> {
    /// Value of `nt` over `[start, start + span)`, or zero for any cell outside
    /// the view.
    #[inline(always)]
    pub fn get(&self, span: usize, start: usize, nt: NtId) -> S {
        if span == 0 || start + span > self.len || nt >= self.n {
            return S::zero();
        }
        let idx = ((span - 1) * self.len + start) * self.n + nt;
        self.cells.get(idx).copied().unwrap_or_else(S::zero)
    }
}

/// Chart over a sentence of `len` tokens and a grammar of `n` nonterminals.
#[derive(Clone, Debug)]
pub struct CykChart<S: Semiring> {
    cells: Vec<S>,
    len: usize,
    n: usize,
}

impl<S: Semiring> CykChart<S> {
    pub fn new(len: usize, n: usize) -> Self {
        CykChart {
            cells: vec![S::zero(); len * len * n],
            len,
            n,
        }
    }

    /// Sentence length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nonterminals per cell.
    pub fn num_nonterminals(&self) -> usize {
        self.n
    }

    #[inline(always)]
    fn index(&self, span: usize, start: usize) -> usize {
        ((span - 1) * self.len + start) * self.n
    }

    #[inline(always)]
    pub fn get(&self, span: usize, start: usize, nt: NtId) -> S {
        self.view().get(span, start, nt)
    }

    /// Whether `nt` has a nonzero value over `[start, start + span)`.
    #[inline(always)]
    pub fn contains(&self, span: usize, start: usize, nt: NtId) -> bool {
        !self.get(span, start, nt).is_zero()
    }

    /// All nonterminal values over `[start, start + span)`.
    pub fn cell(&self, span: usize, start: usize) -> &[S] {
        if span == 0 || start + span > self.len {
            return &[];
        }
        let idx = self.index(span, start);
        &self.cells[idx..idx + self.n]
    }

    /// Mutable nonterminal values over `[start, start + span)`.
    ///
    /// # Panics
    ///
    /// Panics if the span does not fit in the sentence.
    pub fn cell_mut(&mut self, span: usize, start: usize) -> &mut [S] {
        assert!(span > 0 && start + span <= self.len, "cell out of range");
        let idx = self.index(span, start);
        &mut self.cells[idx..idx + self.n]
    }

    /// Read-only view of the whole chart.
    pub fn view(&self) -> ChartView<'_, S> {
        ChartView {
            cells: &self.cells,
            len: self.len,
            n: self.n,
        }
    }

    /// Split into a view of all layers shorter than `span` and the mutable
    /// cells of layer `span`. The layer slice holds `len - span + 1` cells of
    /// `n` values each, ordered by start position.
    ///
    /// # Panics
    ///
    /// Panics if `span` is zero or longer than the sentence.
    pub fn split_layer(&mut self, span: usize) -> (ChartView<'_, S>, &mut [S]) {
        assert!(span > 0 && span <= self.len, "span out of range");
        let offset = (span - 1) * self.len * self.n;
        let width = (self.len - span + 1) * self.n;
        let (lower, upper) = self.cells.split_at_mut(offset);
        let view = ChartView {
            cells: lower,
            len: self.len,
            n: self.n,
        };
        (view, &mut upper[..width])
    }

    /// Value of `nt` over the whole sentence.
    pub fn goal(&self, nt: NtId) -> S {
        self.get(self.len, 0, nt)
    }

    /// Number of nonzero `(span, start, nonterminal)` items.
    pub fn num_items(&self) -> usize {
        let mut items = 0;
        for span in 1..=self.len {
            for start in 0..=self.len - span {
                items += self.cell(span, start).iter().filter(|v| !v.is_zero()).count();
            }
        }
        items
    }
}
