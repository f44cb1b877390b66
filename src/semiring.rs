//! Semirings for chart values.
//!
//! The CYK chart combines sub-span values with `*` and aggregates
//! alternatives with `+`. Instantiating it with different semirings answers
//! different questions about the same grammar and sentence:
//! - Boolean (or, and): is the span derivable
//! - Count (+, *): how many distinct derivations exist

use std::fmt::Debug;
use std::ops::{Add, Mul};

/// A semiring provides addition (aggregation) and multiplication (combination) operations.
pub trait Semiring:
    Copy + Debug + Default + PartialEq + Send + Sync + Add<Output = Self> + Mul<Output = Self>
{
    /// The additive identity.
    fn zero() -> Self;

    /// The multiplicative identity.
    fn one() -> Self;

    fn is_zero(&self) -> bool;
}

/// Boolean semiring: or and and.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Boolean(pub bool);

impl Boolean {
    pub fn new(x: bool) -> Self {
        Boolean(x)
    }

    pub fn value(&self) -> bool {
        self.0
    }
}

impl Semiring for Boolean {
    fn zero() -> Self {
        Boolean(false)
    }

    fn one() -> Self {
        Boolean(true)
    }

    fn is_zero(&self) -> bool {
        !self.0
    }
}

impl Add for Boolean {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Boolean(self.0 || other.0)
    }
}

impl Mul for Boolean {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Boolean(self.0 && other.0)
    }
}

impl From<bool> for Boolean {
    fn from(x: bool) -> Self {
        Boolean(x)
    }
}

/// Counting semiring: natural numbers with + and *, saturating at `u64::MAX`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Count(pub u64);

impl Count {
    pub fn new(x: u64) -> Self {
        Count(x)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Semiring for Count {
    fn zero() -> Self {
        Count(0)
    }

    fn one() -> Self {
        Count(1)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Count {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Count(self.0.saturating_add(other.0))
    }
}

impl Mul for Count {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Count(self.0.saturating_mul(other.0))
    }
}
