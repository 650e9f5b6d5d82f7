//! # Encodings of Cardinality Constraints to CNF
//!
//! The at-most-k compiler used when constraints are added to a session
//! ([`card::encode_at_most_k`]) and the totalizer used by the core-guided
//! search engines ([`card::Totalizer`]).

use thiserror::Error;

use crate::types::Clause;

pub mod am1;
pub mod atomics;
pub mod card;

/// Trait for collecting clauses. Implemented by [`crate::instances::Cnf`]
/// and by the SAT oracle adapters.
pub trait CollectClauses {
    /// Gets the number of clauses in the collection
    fn n_clauses(&self) -> usize;

    /// Extends the collection with clauses from an iterator
    ///
    /// # Errors
    ///
    /// If the collector runs out of memory.
    fn extend_clauses<T>(&mut self, cl_iter: T) -> Result<(), crate::OutOfMemory>
    where
        T: IntoIterator<Item = Clause>;

    /// Adds a single clause to the collection
    ///
    /// # Errors
    ///
    /// If the collector runs out of memory.
    fn add_clause(&mut self, cl: Clause) -> Result<(), crate::OutOfMemory> {
        self.extend_clauses([cl])
    }
}

/// Errors from encodings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The encoding was not built far enough to enforce the requested bound
    #[error("not encoded to enforce bound")]
    NotEncoded,
    /// The collector ran out of memory
    #[error(transparent)]
    OutOfMemory(#[from] crate::OutOfMemory),
}

/// Trait for encodings that track statistics.
pub trait EncodeStats {
    /// Gets the number of clauses in the encoding
    fn n_clauses(&self) -> usize;

    /// Gets the number of variables in the encoding
    fn n_vars(&self) -> u32;
}
