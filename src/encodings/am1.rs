//! # CNF Encodings for At-Most-1 Constraints
//!
//! ## Example Usage
//!
//! ```
//! use smax::{
//!     encodings::am1::{Encode, Pairwise},
//!     instances::{BasicVarManager, Cnf},
//!     lit, var,
//! };
//!
//! let mut var_manager = BasicVarManager::from_next_free(var![3]);
//!
//! let mut encoder: Pairwise = [lit![0], lit![1], lit![2]].into_iter().collect();
//! let mut encoding = Cnf::new();
//! encoder.encode(&mut encoding, &mut var_manager).unwrap();
//! assert_eq!(encoding.len(), 3);
//! ```

use super::CollectClauses;
use crate::{instances::ManageVars, types::Lit};

mod pairwise;
pub use pairwise::Pairwise;

/// Trait for all at-most-1 encodings
pub trait Encode: Extend<Lit> {
    /// Gets the number of literals in the encoding
    fn n_lits(&self) -> usize;

    /// Encodes and enforces the at-most-1 constraint
    ///
    /// # Errors
    ///
    /// If the clause collector runs out of memory.
    fn encode<Col>(
        &mut self,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses;
}
