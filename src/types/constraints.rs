//! # Clauses
//!
//! The only constraint type the formula store holds natively. Cardinality
//! constraints are compiled to clauses by [`crate::encodings::card`] as soon
//! as they are added.

use std::{fmt, ops};

use super::{Assignment, Lit, TernaryVal};

/// A disjunction of literals
#[derive(Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Default)]
pub struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    /// Creates a new empty clause
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the clause as a slice of literals
    #[must_use]
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    /// Gets the length of the clause
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// Checks if the clause is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Checks if the clause is a unit clause
    #[inline]
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.lits.len() == 1
    }

    /// Adds a literal to the clause
    pub fn add(&mut self, lit: Lit) {
        self.lits.push(lit);
    }

    /// Gets an iterator over the clause
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Lit> {
        self.lits.iter()
    }

    /// Evaluates the clause under a (partial) assignment
    #[must_use]
    pub fn evaluate(&self, assignment: &Assignment) -> TernaryVal {
        self.iter()
            .fold(TernaryVal::False, |val, l| match assignment.lit_value(*l) {
                TernaryVal::True => TernaryVal::True,
                TernaryVal::DontCare if val == TernaryVal::False => TernaryVal::DontCare,
                _ => val,
            })
    }

    /// Checks whether the clause is satisfied by an assignment
    #[must_use]
    pub fn is_sat(&self, assignment: &Assignment) -> bool {
        self.evaluate(assignment) == TernaryVal::True
    }
}

impl<const N: usize> From<[Lit; N]> for Clause {
    fn from(value: [Lit; N]) -> Self {
        Self {
            lits: Vec::from(value),
        }
    }
}

impl From<&[Lit]> for Clause {
    fn from(value: &[Lit]) -> Self {
        Self {
            lits: value.to_vec(),
        }
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(lits: Vec<Lit>) -> Self {
        Self { lits }
    }
}

impl AsRef<[Lit]> for Clause {
    fn as_ref(&self) -> &[Lit] {
        &self.lits
    }
}

impl Extend<Lit> for Clause {
    fn extend<T: IntoIterator<Item = Lit>>(&mut self, iter: T) {
        self.lits.extend(iter);
    }
}

impl ops::Index<usize> for Clause {
    type Output = Lit;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.lits[index]
    }
}

impl<'a> IntoIterator for &'a Clause {
    type Item = &'a Lit;

    type IntoIter = std::slice::Iter<'a, Lit>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.lits.iter()
    }
}

impl IntoIterator for Clause {
    type Item = Lit;

    type IntoIter = std::vec::IntoIter<Lit>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.lits.into_iter()
    }
}

impl FromIterator<Lit> for Clause {
    fn from_iter<T: IntoIterator<Item = Lit>>(iter: T) -> Self {
        Self {
            lits: Vec::from_iter(iter),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, lit) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, "|")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Creates a clause from a list of literals
///
/// # Examples
///
/// ```
/// use smax::{clause, lit, types::Clause};
///
/// let mut cl = Clause::new();
/// cl.add(lit![0]);
/// cl.add(!lit![1]);
/// assert_eq!(clause![lit![0], !lit![1]], cl);
/// ```
#[macro_export]
macro_rules! clause {
    () => {
        $crate::types::Clause::new()
    };
    ( $($l:expr),* ) => {
        $crate::types::Clause::from([$($l),*])
    };
}

#[cfg(test)]
mod tests {
    use super::Clause;
    use crate::{
        lit,
        types::{Assignment, TernaryVal},
    };

    #[test]
    fn clause_evaluate() {
        let cl = clause![lit![0], !lit![1], lit![2]];
        let assign: Assignment = [!lit![0], lit![1]].into_iter().collect();
        assert_eq!(cl.evaluate(&assign), TernaryVal::DontCare);
        let assign: Assignment = [!lit![0], lit![1], !lit![2]].into_iter().collect();
        assert_eq!(cl.evaluate(&assign), TernaryVal::False);
        let assign: Assignment = [lit![0]].into_iter().collect();
        assert!(cl.is_sat(&assign));
        assert_eq!(Clause::new().evaluate(&assign), TernaryVal::False);
    }

    #[test]
    fn clause_display() {
        assert_eq!(format!("{}", clause![lit![0], !lit![3]]), "(x0|~x3)");
    }
}
