//! Heap-encoded parse trees and their validation.
//!
//! A [`ParseChoiceTree`] stores a binary derivation tree in two parallel
//! arrays indexed like a binary heap: node `i` has children `2i+1` and
//! `2i+2`. `sizes[i]` is the number of tokens the node covers (0 for an
//! unused slot, 1 for a leaf) and `choices[i]` picks the production
//! alternative used at that node.
//!
//! Validation runs in two phases. [`ParseChoiceTree::check_sizes`] checks the
//! span bookkeeping of every slot without looking at a grammar. Then
//! [`TreeValidator::generates`] walks the tree from the root and checks that
//! each chosen production really derives its part of the sentence.

use crate::grammar::{Grammar, NtId, TokenId, START};
use log::trace;
use thiserror::Error;

/// Violations of the span bookkeeping of a [`ParseChoiceTree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeStructureError {
    #[error("choices has {choices} slots but sizes has {sizes}")]
    Shape { choices: usize, sizes: usize },
    #[error("tree declares {declared} slots but has {choices} choices and {sizes} sizes")]
    SlotCount {
        declared: usize,
        choices: usize,
        sizes: usize,
    },
    #[error("node {node}: leaf has children of sizes {left} and {right}")]
    LeafWithChildren { node: usize, left: usize, right: usize },
    #[error("node {node}: size {size} but children sum to {left} + {right}")]
    SizeMismatch {
        node: usize,
        size: usize,
        left: usize,
        right: usize,
    },
    #[error("node {node}: internal node of size {size} has an empty child ({left}, {right})")]
    EmptyChild {
        node: usize,
        size: usize,
        left: usize,
        right: usize,
    },
    #[error("node {node}: unused slot carries choice {choice}")]
    UnusedWithChoice { node: usize, choice: usize },
}

impl TreeStructureError {
    /// The offending node, if the error is about a single slot.
    pub fn node(&self) -> Option<usize> {
        match self {
            TreeStructureError::Shape { .. } | TreeStructureError::SlotCount { .. } => None,
            TreeStructureError::LeafWithChildren { node, .. }
            | TreeStructureError::SizeMismatch { node, .. }
            | TreeStructureError::EmptyChild { node, .. }
            | TreeStructureError::UnusedWithChoice { node, .. } => Some(*node),
        }
    }
}

/// Heap indices of the children of `node`, if they are representable.
#[inline]
fn children(node: usize) -> Option<(usize, usize)> {
    let left = node.checked_mul(2)?.checked_add(1)?;
    Some((left, left.checked_add(1)?))
}

/// Array-encoded binary derivation tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParseChoiceTree {
    choices: Vec<usize>,
    sizes: Vec<usize>,
}

impl ParseChoiceTree {
    pub fn new(choices: Vec<usize>, sizes: Vec<usize>) -> Result<Self, TreeStructureError> {
        if choices.len() != sizes.len() {
            return Err(TreeStructureError::Shape {
                choices: choices.len(),
                sizes: sizes.len(),
            });
        }
        Ok(ParseChoiceTree { choices, sizes })
    }

    /// A tree of `slots` unused nodes.
    pub fn with_slots(slots: usize) -> Self {
        ParseChoiceTree {
            choices: vec![0; slots],
            sizes: vec![0; slots],
        }
    }

    /// Number of node slots (`N`).
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn choices(&self) -> &[usize] {
        &self.choices
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Size of `node`; slots past the end count as unused.
    #[inline]
    pub fn size(&self, node: usize) -> usize {
        self.sizes.get(node).copied().unwrap_or(0)
    }

    #[inline]
    pub fn choice(&self, node: usize) -> usize {
        self.choices.get(node).copied().unwrap_or(0)
    }

    /// Number of tokens covered by the root.
    pub fn span(&self) -> usize {
        self.size(0)
    }

    /// Set the size and choice of `node`, growing the arrays as needed.
    pub fn set(&mut self, node: usize, size: usize, choice: usize) {
        if node >= self.sizes.len() {
            self.sizes.resize(node + 1, 0);
            self.choices.resize(node + 1, 0);
        }
        self.sizes[node] = size;
        self.choices[node] = choice;
    }

    /// Check the span bookkeeping of every slot.
    ///
    /// For each node, with out-of-range children counted as size 0:
    /// a leaf has two empty children; any other node's size equals the sum
    /// of its children's; an unused slot has choice 0; an internal node has
    /// two non-empty children.
    pub fn check_sizes(&self) -> Result<(), TreeStructureError> {
        for node in 0..self.len() {
            let size = self.sizes[node];
            let (left, right) = match children(node) {
                Some((l, r)) => (self.size(l), self.size(r)),
                None => (0, 0),
            };

            if size == 1 {
                if left != 0 || right != 0 {
                    return Err(TreeStructureError::LeafWithChildren { node, left, right });
                }
                continue;
            }

            if left.checked_add(right) != Some(size) {
                return Err(TreeStructureError::SizeMismatch {
                    node,
                    size,
                    left,
                    right,
                });
            }
            if size == 0 {
                if self.choices[node] != 0 {
                    return Err(TreeStructureError::UnusedWithChoice {
                        node,
                        choice: self.choices[node],
                    });
                }
            } else if left == 0 || right == 0 {
                return Err(TreeStructureError::EmptyChild {
                    node,
                    size,
                    left,
                    right,
                });
            }
        }
        Ok(())
    }
}

/// Checks candidate derivation trees against one grammar.
#[derive(Clone, Copy, Debug)]
pub struct TreeValidator<'g> {
    grammar: &'g Grammar,
}

impl<'g> TreeValidator<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        TreeValidator { grammar }
    }

    /// Whether `tree` is a well-formed derivation of `sentence` from the
    /// start nonterminal.
    pub fn validate(&self, sentence: &[TokenId], tree: &ParseChoiceTree) -> bool {
        tree.check_sizes().is_ok() && self.generates(sentence, tree, 0, START)
    }

    /// Like [`validate`](Self::validate), but reports why a malformed tree
    /// was rejected.
    pub fn check(&self, sentence: &[TokenId], tree: &ParseChoiceTree) -> Result<bool, TreeStructureError> {
        tree.check_sizes()?;
        Ok(self.generates(sentence, tree, 0, START))
    }

    /// Whether the subtree at `node` derives `sentence` from `nt`.
    ///
    /// Any index that falls outside the tree or the grammar (node, child,
    /// choice or nonterminal) makes the derivation fail. Reaching an unused
    /// slot also fails.
    pub fn generates(&self, sentence: &[TokenId], tree: &ParseChoiceTree, node: usize, nt: NtId) -> bool {
        let size = match tree.sizes.get(node) {
            Some(&size) => size,
            None => return false,
        };
        let choice = tree.choices[node];

        match size {
            0 => {
                trace!("node {} is unused but was reached", node);
                false
            }
            1 => {
                let emitted = self.grammar.term_rule(nt).and_then(|rule| rule.get(choice));
                sentence.len() == 1 && emitted == Some(sentence[0])
            }
            _ => {
                if sentence.len() != size {
                    return false;
                }
                let Some((left_nt, right_nt)) = self.grammar.var_rule(nt).and_then(|rule| rule.get(choice)) else {
                    return false;
                };
                let Some((left, right)) = children(node) else {
                    return false;
                };
                let split = tree.size(left);
                if split > sentence.len() {
                    return false;
                }
                let (prefix, suffix) = sentence.split_at(split);
                self.generates(prefix, tree, left, left_nt) && self.generates(suffix, tree, right, right_nt)
            }
        }
    }
}

/// Check the span bookkeeping of `tree`.
pub fn check_sizes(tree: &ParseChoiceTree) -> Result<(), TreeStructureError> {
    tree.check_sizes()
}

/// Whether `tree` is a valid derivation of `sentence` under `grammar`.
pub fn validate(grammar: &Grammar, sentence: &[TokenId], tree: &ParseChoiceTree) -> bool {
    TreeValidator::new(grammar).validate(sentence, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::tests::pair_grammar;

    fn tree(sizes: &[usize], choices: &[usize]) -> ParseChoiceTree {
        ParseChoiceTree::new(choices.to_vec(), sizes.to_vec()).unwrap()
    }

    #[test]
    fn test_pair_tree_validates() {
        let g = pair_grammar();
        let t = tree(&[2, 1, 1], &[0, 0, 0]);
        assert!(t.check_sizes().is_ok());
        assert!(validate(&g, &[0, 0], &t));
    }

    #[test]
    fn test_missing_child_fails_check_sizes() {
        let t = tree(&[2, 0, 1], &[0, 0, 0]);
        assert_eq!(
            t.check_sizes(),
            Err(TreeStructureError::SizeMismatch {
                node: 0,
                size: 2,
                left: 0,
                right: 1,
            })
        );
        assert!(!validate(&pair_grammar(), &[0, 0], &t));
    }

    #[test]
    fn test_shape_mismatch() {
        assert_eq!(
            ParseChoiceTree::new(vec![0], vec![1, 0]),
            Err(TreeStructureError::Shape { choices: 1, sizes: 2 })
        );
    }

    #[test]
    fn test_leaf_with_children() {
        let t = tree(&[1, 1, 0], &[0, 0, 0]);
        assert!(matches!(
            t.check_sizes(),
            Err(TreeStructureError::LeafWithChildren { node: 0, left: 1, right: 0 })
        ));
    }

    #[test]
    fn test_unused_slot_with_choice() {
        let t = tree(&[1, 0, 0], &[0, 0, 3]);
        let err = t.check_sizes().unwrap_err();
        assert_eq!(err, TreeStructureError::UnusedWithChoice { node: 2, choice: 3 });
        assert_eq!(err.node(), Some(2));
    }

    #[test]
    fn test_unused_slot_with_used_children() {
        // Node 1 is unused but its child 3 claims a token.
        let t = tree(&[1, 0, 0, 1], &[0, 0, 0, 0]);
        assert_eq!(
            t.check_sizes(),
            Err(TreeStructureError::SizeMismatch {
                node: 1,
                size: 0,
                left: 1,
                right: 0,
            })
        );
    }

    #[test]
    fn test_internal_node_with_empty_child_cannot_balance() {
        // 2 = 2 + 0 balances the sum but leaves the right child empty.
        let t = tree(&[2, 2, 0, 1, 1], &[0, 0, 0, 0, 0]);
        assert_eq!(
            t.check_sizes(),
            Err(TreeStructureError::EmptyChild {
                node: 0,
                size: 2,
                left: 2,
                right: 0,
            })
        );
    }

    #[test]
    fn test_children_past_end_count_as_empty() {
        // A single leaf needs no child slots.
        let t = tree(&[1], &[0]);
        assert!(t.check_sizes().is_ok());

        let mut g = pair_grammar();
        g.add_terminal(0, 0);
        assert!(validate(&g, &[0], &t));

        // An internal root whose children fall off the end cannot balance.
        let t = tree(&[2], &[0]);
        assert!(matches!(t.check_sizes(), Err(TreeStructureError::SizeMismatch { .. })));
    }

    #[test]
    fn test_wrong_terminal() {
        let g = pair_grammar();
        let t = tree(&[2, 1, 1], &[0, 0, 0]);
        assert!(!validate(&g, &[0, 1], &t));
    }

    #[test]
    fn test_length_mismatch() {
        let g = pair_grammar();
        let t = tree(&[2, 1, 1], &[0, 0, 0]);
        assert!(!validate(&g, &[0], &t));
        assert!(!validate(&g, &[0, 0, 0], &t));
        assert!(!validate(&g, &[], &t));
    }

    #[test]
    fn test_choice_out_of_range_is_false() {
        let g = pair_grammar();
        let t = tree(&[2, 1, 1], &[1, 0, 0]);
        assert!(t.check_sizes().is_ok());
        assert!(!validate(&g, &[0, 0], &t));

        let t = tree(&[2, 1, 1], &[0, 0, 4]);
        assert!(!validate(&g, &[0, 0], &t));
    }

    #[test]
    fn test_empty_tree_is_false() {
        let g = pair_grammar();
        assert!(!validate(&g, &[], &ParseChoiceTree::default()));
        assert!(!validate(&g, &[], &ParseChoiceTree::with_slots(3)));
    }

    #[test]
    fn test_unused_root_reached() {
        let g = pair_grammar();
        let validator = TreeValidator::new(&g);
        assert!(!validator.generates(&[0], &ParseChoiceTree::with_slots(1), 0, START));
    }

    #[test]
    fn test_check_reports_structure_error() {
        let g = pair_grammar();
        let validator = TreeValidator::new(&g);
        let bad = tree(&[2, 0, 1], &[0, 0, 0]);
        assert!(validator.check(&[0, 0], &bad).is_err());

        let good = tree(&[2, 1, 1], &[0, 0, 0]);
        assert_eq!(validator.check(&[0, 0], &good), Ok(true));
        assert_eq!(validator.check(&[0, 1], &good), Ok(false));
    }

    #[test]
    fn test_deeper_tree() {
        // N0 -> N1 N2, N2 -> N1 N1, N1 -> '0' | '1'
        let mut g = Grammar::new(3);
        g.add_binary(0, 1, 2)
            .add_binary(2, 1, 1)
            .add_terminal(1, 0)
            .add_terminal(1, 1);

        // Root covers 3: left leaf, right internal node of 2 leaves.
        let mut t = ParseChoiceTree::default();
        t.set(0, 3, 0);
        t.set(1, 1, 1);
        t.set(2, 2, 0);
        t.set(5, 1, 0);
        t.set(6, 1, 1);
        assert_eq!(t.len(), 7);
        assert_eq!(t.span(), 3);
        assert!(t.check_sizes().is_ok());

        assert!(validate(&g, &[1, 0, 1], &t));
        assert!(!validate(&g, &[0, 0, 1], &t));
    }

    #[test]
    fn test_unvalidated_grammar_does_not_panic() {
        // Binary rule names a nonterminal that does not exist.
        let mut g = Grammar::new(1);
        g.add_binary(0, 4, 4);
        let t = tree(&[2, 1, 1], &[0, 0, 0]);
        assert!(!validate(&g, &[0, 0], &t));
    }
}
