//! # Plain Clause Collections

use std::collections::TryReserveError;

use crate::{
    encodings::CollectClauses,
    types::{Clause, Lit, Var},
};

/// A CNF formula without a variable manager. Used as the staging area for
/// encodings and as the hard part of a [`super::Formula`].
#[derive(Clone, Eq, PartialEq, Default, Debug)]
pub struct Cnf {
    clauses: Vec<Clause>,
}

impl Cnf {
    /// Creates a new [`Cnf`]
    #[must_use]
    pub fn new() -> Cnf {
        Cnf::default()
    }

    /// Tries to reserve memory for at least `additional` new clauses
    ///
    /// # Errors
    ///
    /// If the allocation fails.
    #[inline]
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.clauses.try_reserve(additional)
    }

    /// Checks if the CNF is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the number of clauses
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Adds a clause without reserving memory first
    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Adds a unit clause
    pub fn add_unit(&mut self, unit: Lit) {
        self.add_clause(Clause::from([unit]));
    }

    /// Adds a binary clause
    pub fn add_binary(&mut self, lit1: Lit, lit2: Lit) {
        self.add_clause(Clause::from([lit1, lit2]));
    }

    /// Moves all clauses of `other` into this CNF. The memory has to be
    /// reserved beforehand.
    pub fn append(&mut self, other: &mut Cnf) {
        self.clauses.append(&mut other.clauses);
    }

    /// Gets an iterator over the clauses
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Clause> {
        self.clauses.iter()
    }

    /// Gets the highest variable referenced by the CNF
    #[must_use]
    pub fn max_var(&self) -> Option<Var> {
        self.iter()
            .flat_map(|cl| cl.iter().map(Lit::var))
            .max()
    }
}

impl CollectClauses for Cnf {
    fn n_clauses(&self) -> usize {
        self.clauses.len()
    }

    fn extend_clauses<T>(&mut self, cl_iter: T) -> Result<(), crate::OutOfMemory>
    where
        T: IntoIterator<Item = Clause>,
    {
        let cl_iter = cl_iter.into_iter();
        self.clauses.try_reserve(cl_iter.size_hint().0)?;
        for cl in cl_iter {
            if self.clauses.len() == self.clauses.capacity() {
                self.clauses.try_reserve(1)?;
            }
            self.clauses.push(cl);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Cnf {
    type Item = &'a Clause;

    type IntoIter = std::slice::Iter<'a, Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

impl IntoIterator for Cnf {
    type Item = Clause;

    type IntoIter = std::vec::IntoIter<Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.into_iter()
    }
}

impl FromIterator<Clause> for Cnf {
    fn from_iter<T: IntoIterator<Item = Clause>>(iter: T) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cnf;
    use crate::{clause, encodings::CollectClauses, lit, var};

    #[test]
    fn cnf_collect() {
        let mut cnf = Cnf::new();
        cnf.add_unit(lit![0]);
        cnf.add_binary(!lit![0], lit![3]);
        cnf.extend_clauses([clause![lit![1], lit![2]], clause![!lit![2]]])
            .unwrap();
        assert_eq!(cnf.len(), 4);
        assert_eq!(cnf.n_clauses(), 4);
        assert_eq!(cnf.max_var(), Some(var![3]));
    }

    #[test]
    fn cnf_append() {
        let mut cnf = Cnf::new();
        cnf.add_unit(lit![0]);
        let mut staged: Cnf = [clause![lit![1]], clause![lit![2]]].into_iter().collect();
        cnf.try_reserve(staged.len()).unwrap();
        cnf.append(&mut staged);
        assert!(staged.is_empty());
        assert_eq!(cnf.len(), 3);
    }
}
