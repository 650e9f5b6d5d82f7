//! # Literals, Variables and Assignments
//!
//! The basic types shared by the formula store, the encodings and the search
//! engines. Internally variables are indexed from 0, callers use the signed
//! 1-based integer convention of DIMACS and IPASIR.

use std::{fmt, ops};

use thiserror::Error;

pub mod constraints;
pub use constraints::Clause;

/// The hash map to use throughout the library
#[cfg(feature = "fxhash")]
pub type RsHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fxhash"))]
pub type RsHashMap<K, V> = std::collections::HashMap<K, V>;

/// The hash set to use throughout the library
#[cfg(feature = "fxhash")]
pub type RsHashSet<V> = rustc_hash::FxHashSet<V>;
#[cfg(not(feature = "fxhash"))]
pub type RsHashSet<V> = std::collections::HashSet<V>;

/// A boolean variable. Indices start from 0 and are limited to
/// [`Var::MAX_IDX`] since a literal packs the index and the polarity into a
/// single `u32`.
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct Var {
    idx: u32,
}

impl Var {
    /// The maximum index that can be represented.
    pub const MAX_IDX: u32 = (u32::MAX - 1) / 2;

    /// Creates a new variable with a given index.
    ///
    /// # Panics
    ///
    /// If `idx > Var::MAX_IDX`.
    #[must_use]
    pub fn new(idx: u32) -> Var {
        assert!(idx <= Var::MAX_IDX, "variable index too high");
        Var { idx }
    }

    /// Creates a new variable with a given index.
    ///
    /// # Errors
    ///
    /// [`TypeError::IdxTooHigh`] if `idx > Var::MAX_IDX`.
    pub fn new_with_error(idx: u32) -> Result<Var, TypeError> {
        if idx > Var::MAX_IDX {
            return Err(TypeError::IdxTooHigh(idx, Var::MAX_IDX));
        }
        Ok(Var { idx })
    }

    /// Creates a new variable without checking the index.
    #[inline]
    #[must_use]
    pub const fn new_unchecked(idx: u32) -> Var {
        Var { idx }
    }

    /// Creates the positive literal of the variable.
    ///
    /// # Examples
    ///
    /// ```
    /// use smax::types::{Lit, Var};
    ///
    /// assert_eq!(Var::new(5).pos_lit(), Lit::positive(5));
    /// ```
    #[inline]
    #[must_use]
    pub fn pos_lit(self) -> Lit {
        Lit::new_unchecked(self.idx, false)
    }

    /// Creates the negated literal of the variable.
    #[inline]
    #[must_use]
    pub fn neg_lit(self) -> Lit {
        Lit::new_unchecked(self.idx, true)
    }

    /// Creates the literal of the variable with a given polarity.
    #[inline]
    #[must_use]
    pub fn lit(self, negated: bool) -> Lit {
        Lit::new_unchecked(self.idx, negated)
    }

    /// Returns the index of the variable as `usize` for indexing data
    /// structures.
    #[inline]
    #[must_use]
    pub fn idx(&self) -> usize {
        self.idx as usize
    }

    /// Returns the 32 bit index of the variable.
    #[inline]
    #[must_use]
    pub fn idx32(&self) -> u32 {
        self.idx
    }

    /// Converts the variable to the 1-based integer convention.
    ///
    /// # Panics
    ///
    /// If the index does not fit into an `i32`.
    #[must_use]
    pub fn to_ipasir(self) -> i32 {
        i32::try_from(self.idx + 1).expect("variable index too high to fit in i32")
    }
}

/// Incrementing variables
impl ops::Add<u32> for Var {
    type Output = Var;

    fn add(self, rhs: u32) -> Self::Output {
        Var {
            idx: self.idx + rhs,
        }
    }
}

impl ops::AddAssign<u32> for Var {
    fn add_assign(&mut self, rhs: u32) {
        self.idx += rhs;
    }
}

/// Decrementing variables
impl ops::Sub<u32> for Var {
    type Output = Var;

    fn sub(self, rhs: u32) -> Self::Output {
        Var {
            idx: self.idx - rhs,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.idx)
    }
}

/// More easily creates variables. Mainly used in tests.
///
/// # Examples
///
/// ```
/// use smax::{var, types::Var};
///
/// assert_eq!(var![42], Var::new(42));
/// ```
#[macro_export]
macro_rules! var {
    ($v:expr) => {
        $crate::types::Var::new($v)
    };
}

/// A possibly negated boolean variable.
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Lit {
    /// `idx << 1` with the lowest bit set if the literal is negated, so that
    /// the two literals of a variable are next to each other when used as an
    /// index.
    lidx: u32,
}

impl Lit {
    #[inline]
    const fn represent(idx: u32, negated: bool) -> u32 {
        (idx << 1) + (negated as u32)
    }

    /// Creates a new literal with a given variable index and polarity.
    ///
    /// # Panics
    ///
    /// If `idx > Var::MAX_IDX`.
    #[must_use]
    pub fn new(idx: u32, negated: bool) -> Lit {
        assert!(idx <= Var::MAX_IDX, "variable index too high");
        Lit {
            lidx: Lit::represent(idx, negated),
        }
    }

    /// Creates a new literal with a given variable index and polarity.
    ///
    /// # Errors
    ///
    /// [`TypeError::IdxTooHigh`] if `idx > Var::MAX_IDX`.
    pub fn new_with_error(idx: u32, negated: bool) -> Result<Lit, TypeError> {
        if idx > Var::MAX_IDX {
            return Err(TypeError::IdxTooHigh(idx, Var::MAX_IDX));
        }
        Ok(Lit {
            lidx: Lit::represent(idx, negated),
        })
    }

    /// Creates a new literal without checking the index.
    #[inline]
    #[must_use]
    pub const fn new_unchecked(idx: u32, negated: bool) -> Lit {
        Lit {
            lidx: Lit::represent(idx, negated),
        }
    }

    /// Creates a new positive literal with a given index.
    ///
    /// # Panics
    ///
    /// If `idx > Var::MAX_IDX`.
    #[inline]
    #[must_use]
    pub fn positive(idx: u32) -> Lit {
        Lit::new(idx, false)
    }

    /// Creates a new negated literal with a given index.
    ///
    /// # Panics
    ///
    /// If `idx > Var::MAX_IDX`.
    #[inline]
    #[must_use]
    pub fn negative(idx: u32) -> Lit {
        Lit::new(idx, true)
    }

    /// Converts a caller literal in the 1-based signed integer convention.
    /// The variable is `|val| - 1`, the literal is negated if `val < 0`.
    ///
    /// # Errors
    ///
    /// - [`TypeError::IpasirZero`] if `val == 0`
    /// - [`TypeError::IdxTooHigh`] if the index is not representable
    ///
    /// # Examples
    ///
    /// ```
    /// use smax::types::Lit;
    ///
    /// assert_eq!(Lit::from_ipasir(-3).unwrap(), Lit::negative(2));
    /// assert!(Lit::from_ipasir(0).is_err());
    /// ```
    pub fn from_ipasir(val: i32) -> Result<Lit, TypeError> {
        if val == 0 {
            return Err(TypeError::IpasirZero);
        }
        Lit::new_with_error(val.unsigned_abs() - 1, val < 0)
    }

    /// Gets the variable index of the literal
    #[inline]
    #[must_use]
    pub fn vidx(&self) -> usize {
        (self.lidx >> 1) as usize
    }

    /// Gets the 32 bit variable index of the literal
    #[inline]
    #[must_use]
    pub fn vidx32(&self) -> u32 {
        self.lidx >> 1
    }

    /// Gets the literal representation for indexing data structures
    #[inline]
    #[must_use]
    pub fn lidx(&self) -> usize {
        self.lidx as usize
    }

    /// Gets the variable of the literal
    #[inline]
    #[must_use]
    pub fn var(&self) -> Var {
        Var::new_unchecked(self.vidx32())
    }

    /// True if the literal is positive
    #[inline]
    #[must_use]
    pub fn is_pos(&self) -> bool {
        (self.lidx & 1u32) == 0
    }

    /// True if the literal is negated
    #[inline]
    #[must_use]
    pub fn is_neg(&self) -> bool {
        (self.lidx & 1u32) == 1
    }

    /// Converts the literal to the 1-based signed integer convention.
    ///
    /// # Panics
    ///
    /// If the variable index does not fit into an `i32`.
    #[must_use]
    pub fn to_ipasir(self) -> i32 {
        let idx = self.var().to_ipasir();
        if self.is_neg() {
            -idx
        } else {
            idx
        }
    }
}

impl ops::Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Lit {
        Lit {
            lidx: self.lidx ^ 1u32,
        }
    }
}

impl ops::Neg for Lit {
    type Output = Lit;

    #[inline]
    fn neg(self) -> Lit {
        !self
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_neg() {
            write!(f, "~x{}", self.vidx())
        } else {
            write!(f, "x{}", self.vidx())
        }
    }
}

/// More easily creates literals. Mainly used in tests.
///
/// # Examples
///
/// ```
/// use smax::{lit, types::Lit};
///
/// assert_eq!(lit![42], Lit::positive(42));
/// assert_eq!(!lit![42], Lit::negative(42));
/// ```
#[macro_export]
macro_rules! lit {
    ($l:expr) => {
        $crate::types::Lit::positive($l)
    };
}

/// Creates literals from the 1-based signed integer convention. Mainly used in
/// tests.
///
/// # Examples
///
/// ```
/// use smax::{lit, ipasir_lit};
///
/// assert_eq!(ipasir_lit![42], lit![41]);
/// assert_eq!(ipasir_lit![-42], !lit![41]);
/// ```
#[macro_export]
macro_rules! ipasir_lit {
    ($l:expr) => {
        $crate::types::Lit::from_ipasir($l).unwrap()
    };
}

/// Value of a variable or literal in an [`Assignment`]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u8)]
pub enum TernaryVal {
    /// Assigned true
    True,
    /// Assigned false
    False,
    /// Not assigned
    #[default]
    DontCare,
}

impl TernaryVal {
    /// Converts to a bool with a default value for "don't care"
    #[must_use]
    pub fn to_bool_with_def(self, def: bool) -> bool {
        match self {
            TernaryVal::True => true,
            TernaryVal::False => false,
            TernaryVal::DontCare => def,
        }
    }
}

impl ops::Not for TernaryVal {
    type Output = TernaryVal;

    fn not(self) -> Self::Output {
        match self {
            TernaryVal::True => TernaryVal::False,
            TernaryVal::False => TernaryVal::True,
            TernaryVal::DontCare => TernaryVal::DontCare,
        }
    }
}

impl fmt::Display for TernaryVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TernaryVal::True => write!(f, "1"),
            TernaryVal::False => write!(f, "0"),
            TernaryVal::DontCare => write!(f, "_"),
        }
    }
}

impl From<bool> for TernaryVal {
    fn from(value: bool) -> Self {
        if value {
            TernaryVal::True
        } else {
            TernaryVal::False
        }
    }
}

/// A (partial) assignment of variables
#[derive(Clone, PartialEq, Eq, Default, Debug)]
#[repr(transparent)]
pub struct Assignment {
    assignment: Vec<TernaryVal>,
}

impl Assignment {
    /// Gets the value of a variable. Variables not in the assignment are
    /// [`TernaryVal::DontCare`].
    #[must_use]
    pub fn var_value(&self, var: Var) -> TernaryVal {
        self.assignment
            .get(var.idx())
            .copied()
            .unwrap_or(TernaryVal::DontCare)
    }

    /// Same as [`Assignment::var_value`], but for literals.
    #[must_use]
    pub fn lit_value(&self, lit: Lit) -> TernaryVal {
        if lit.is_neg() {
            !self.var_value(lit.var())
        } else {
            self.var_value(lit.var())
        }
    }

    /// Assigns a variable
    pub fn assign_var(&mut self, var: Var, val: TernaryVal) {
        if self.assignment.len() <= var.idx() {
            self.assignment.resize(var.idx() + 1, TernaryVal::DontCare);
        }
        self.assignment[var.idx()] = val;
    }

    /// Assigns a literal to true
    pub fn assign_lit(&mut self, lit: Lit) {
        self.assign_var(lit.var(), TernaryVal::from(lit.is_pos()));
    }

    /// The number of variables the assignment covers
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    /// Checks whether the assignment covers no variable
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.assignment.iter().try_for_each(|tv| write!(f, "{tv}"))
    }
}

impl FromIterator<Lit> for Assignment {
    fn from_iter<T: IntoIterator<Item = Lit>>(iter: T) -> Self {
        let mut assignment = Assignment::default();
        iter.into_iter().for_each(|l| assignment.assign_lit(l));
        assignment
    }
}

impl From<Vec<TernaryVal>> for Assignment {
    fn from(assignment: Vec<TernaryVal>) -> Self {
        Self { assignment }
    }
}

/// Errors related to types
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    /// The requested index is too high.
    /// Contains the requested and the maximum index.
    #[error("index {0} is too high (maximum {1})")]
    IdxTooHigh(u32, u32),
    /// Zero is not a literal
    #[error("zero is an invalid IPASIR literal")]
    IpasirZero,
}
