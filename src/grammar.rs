//! Grammar representation in (near) Chomsky Normal Form.
//!
//! A grammar has `n` nonterminals; nonterminal 0 is the start symbol. Every
//! nonterminal owns an ordered list of binary alternatives (`i -> B C`) and
//! an ordered list of terminal alternatives (`i -> t`). The position of an
//! alternative in its list is the value a parse tree's `choices` slot
//! selects, so the order is significant and never normalised.

use log::debug;
use std::fmt;
use thiserror::Error;

/// Nonterminal index.
pub type NtId = usize;

/// Terminal (vocabulary) index.
pub type TokenId = usize;

/// The distinguished start nonterminal.
pub const START: NtId = 0;

/// Which rule list a validation failure was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Binary,
    Terminal,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Binary => write!(f, "binary rule"),
            RuleKind::Terminal => write!(f, "terminal rule"),
        }
    }
}

/// Errors found while validating a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar has no nonterminals")]
    Empty,
    #[error("malformed grammar description: {0}")]
    Shape(String),
    #[error("N{nonterminal} {kind} #{alternative}: nonterminal N{symbol} out of range (n = {n})")]
    NonterminalOutOfRange {
        nonterminal: NtId,
        kind: RuleKind,
        alternative: usize,
        symbol: NtId,
        n: usize,
    },
    #[error(
        "N{nonterminal} {kind} #{alternative}: terminal {terminal} out of range (vocab_size = {vocab_size})"
    )]
    TerminalOutOfRange {
        nonterminal: NtId,
        kind: RuleKind,
        alternative: usize,
        terminal: TokenId,
        vocab_size: usize,
    },
    #[error("N{nonterminal} {kind} #{alternative}: start nonterminal on right-hand side")]
    StartOnRhs {
        nonterminal: NtId,
        kind: RuleKind,
        alternative: usize,
    },
    #[error("N{nonterminal} {kind}: {count} terminal alternatives, at most one allowed")]
    TooManyTerminals {
        nonterminal: NtId,
        kind: RuleKind,
        count: usize,
    },
}

impl GrammarError {
    /// The nonterminal whose rules caused the failure, if any.
    pub fn nonterminal(&self) -> Option<NtId> {
        match self {
            GrammarError::NonterminalOutOfRange { nonterminal, .. }
            | GrammarError::TerminalOutOfRange { nonterminal, .. }
            | GrammarError::StartOnRhs { nonterminal, .. }
            | GrammarError::TooManyTerminals { nonterminal, .. } => Some(*nonterminal),
            GrammarError::Empty | GrammarError::Shape(_) => None,
        }
    }

    /// The rule list the failure was found in, if any.
    pub fn kind(&self) -> Option<RuleKind> {
        match self {
            GrammarError::NonterminalOutOfRange { kind, .. }
            | GrammarError::TerminalOutOfRange { kind, .. }
            | GrammarError::StartOnRhs { kind, .. }
            | GrammarError::TooManyTerminals { kind, .. } => Some(*kind),
            GrammarError::Empty | GrammarError::Shape(_) => None,
        }
    }
}

/// Structural restrictions applied by [`Grammar::validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Allow the start nonterminal on the right-hand side of binary rules.
    pub relax_chomsky: bool,
    /// Allow at most one terminal alternative per nonterminal.
    pub restrict_term: bool,
}

impl GrammarConfig {
    /// Strict CNF with unrestricted terminal alternatives.
    pub fn strict() -> Self {
        Self::default()
    }
}

/// Binary alternatives of one nonterminal: `i -> B C`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VarRule {
    pub outputs: Vec<(NtId, NtId)>,
}

impl VarRule {
    pub fn new(outputs: Vec<(NtId, NtId)>) -> Self {
        VarRule { outputs }
    }

    /// Number of alternatives.
    pub fn k(&self) -> usize {
        self.outputs.len()
    }

    pub fn get(&self, choice: usize) -> Option<(NtId, NtId)> {
        self.outputs.get(choice).copied()
    }
}

/// Terminal alternatives of one nonterminal: `i -> t`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TermRule {
    pub outputs: Vec<TokenId>,
}

impl TermRule {
    pub fn new(outputs: Vec<TokenId>) -> Self {
        TermRule { outputs }
    }

    /// Number of alternatives.
    pub fn k(&self) -> usize {
        self.outputs.len()
    }

    pub fn get(&self, choice: usize) -> Option<TokenId> {
        self.outputs.get(choice).copied()
    }
}

/// A CNF-like grammar over `n` nonterminals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grammar {
    var_rules: Vec<VarRule>,
    term_rules: Vec<TermRule>,
}

impl Grammar {
    /// Create a grammar with `n` nonterminals and no rules.
    pub fn new(n: usize) -> Self {
        Grammar {
            var_rules: vec![VarRule::default(); n],
            term_rules: vec![TermRule::default(); n],
        }
    }

    /// Build from per-nonterminal rule lists. Both lists must have one entry
    /// per nonterminal.
    pub fn from_rules(var_rules: Vec<VarRule>, term_rules: Vec<TermRule>) -> Result<Self, GrammarError> {
        if var_rules.len() != term_rules.len() {
            return Err(GrammarError::Shape(format!(
                "{} binary rule lists but {} terminal rule lists",
                var_rules.len(),
                term_rules.len()
            )));
        }
        Ok(Grammar {
            var_rules,
            term_rules,
        })
    }

    /// Number of nonterminals.
    #[inline]
    pub fn n(&self) -> usize {
        self.var_rules.len()
    }

    /// Append the binary alternative `parent -> left right`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a nonterminal of this grammar.
    pub fn add_binary(&mut self, parent: NtId, left: NtId, right: NtId) -> &mut Self {
        self.var_rules[parent].outputs.push((left, right));
        self
    }

    /// Append the terminal alternative `parent -> token`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a nonterminal of this grammar.
    pub fn add_terminal(&mut self, parent: NtId, token: TokenId) -> &mut Self {
        self.term_rules[parent].outputs.push(token);
        self
    }

    #[inline]
    pub fn var_rule(&self, nt: NtId) -> Option<&VarRule> {
        self.var_rules.get(nt)
    }

    #[inline]
    pub fn term_rule(&self, nt: NtId) -> Option<&TermRule> {
        self.term_rules.get(nt)
    }

    pub fn var_rules(&self) -> &[VarRule] {
        &self.var_rules
    }

    pub fn term_rules(&self) -> &[TermRule] {
        &self.term_rules
    }

    /// Total number of alternatives, binary and terminal.
    pub fn num_productions(&self) -> usize {
        self.var_rules.iter().map(VarRule::k).sum::<usize>()
            + self.term_rules.iter().map(TermRule::k).sum::<usize>()
    }

    /// Largest number of binary alternatives on any nonterminal.
    pub fn max_arity(&self) -> usize {
        self.var_rules.iter().map(VarRule::k).max().unwrap_or(0)
    }

    /// Check every structural invariant in one pass, stopping at the first
    /// violation.
    pub fn validate(&self, vocab_size: usize, config: &GrammarConfig) -> Result<(), GrammarError> {
        let n = self.n();
        if n == 0 {
            return Err(GrammarError::Empty);
        }
        if self.term_rules.len() != n {
            return Err(GrammarError::Shape(format!(
                "{} binary rule lists but {} terminal rule lists",
                n,
                self.term_rules.len()
            )));
        }

        for nt in 0..n {
            for (alternative, &(b, c)) in self.var_rules[nt].outputs.iter().enumerate() {
                for symbol in [b, c] {
                    if symbol >= n {
                        return Err(GrammarError::NonterminalOutOfRange {
                            nonterminal: nt,
                            kind: RuleKind::Binary,
                            alternative,
                            symbol,
                            n,
                        });
                    }
                }
                if !config.relax_chomsky && (b == START || c == START) {
                    return Err(GrammarError::StartOnRhs {
                        nonterminal: nt,
                        kind: RuleKind::Binary,
                        alternative,
                    });
                }
            }

            let term_rule = &self.term_rules[nt];
            if config.restrict_term && term_rule.k() > 1 {
                return Err(GrammarError::TooManyTerminals {
                    nonterminal: nt,
                    kind: RuleKind::Terminal,
                    count: term_rule.k(),
                });
            }
            for (alternative, &terminal) in term_rule.outputs.iter().enumerate() {
                if terminal >= vocab_size {
                    return Err(GrammarError::TerminalOutOfRange {
                        nonterminal: nt,
                        kind: RuleKind::Terminal,
                        alternative,
                        terminal,
                        vocab_size,
                    });
                }
            }
        }

        debug!(
            "validated grammar: n={} productions={} vocab_size={} {:?}",
            n,
            self.num_productions(),
            vocab_size,
            config
        );
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in 0..self.n() {
            write!(f, "N{} ->", nt)?;
            let mut first = true;
            for &(b, c) in &self.var_rules[nt].outputs {
                write!(f, "{} N{} N{}", if first { "" } else { " |" }, b, c)?;
                first = false;
            }
            for &t in &self.term_rules[nt].outputs {
                write!(f, "{} '{}'", if first { "" } else { " |" }, t)?;
                first = false;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
