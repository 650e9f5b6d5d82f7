//! # CNF Encodings for Cardinality Constraints
//!
//! [`encode_at_most_k`] compiles "at most `k` of these literals are true" into
//! hard clauses. The strategy depends only on `k`:
//!
//! | `k` | Encoding | Auxiliary variables |
//! | --- | --- | --- |
//! | `k >= n` | nothing, the constraint is trivially satisfied | 0 |
//! | `k == 0` | [`AllFalse`], one negated unit per literal | 0 |
//! | `k == 1` | [`crate::encodings::am1::Pairwise`] | 0 |
//! | otherwise | [`SequentialCounters`] | at most `(n-2)k` |
//!
//! The [`Totalizer`] is not used for compiling constraints. The search
//! engines use it to bound the number of violated soft clauses.
//!
//! ## Example Usage
//!
//! ```
//! use smax::{
//!     encodings::card,
//!     instances::{BasicVarManager, Cnf, ManageVars},
//!     lit, var,
//! };
//!
//! let mut var_manager = BasicVarManager::from_next_free(var![5]);
//! let lits = [lit![0], lit![1], lit![2], lit![3], lit![4]];
//! let mut encoding = Cnf::new();
//! card::encode_at_most_k(&lits, 2, &mut encoding, &mut var_manager).unwrap();
//! assert!(var_manager.n_used() <= 5 + 3 * 2);
//! ```

use log::debug;

use super::{
    am1::{self, Pairwise},
    CollectClauses, EncodeStats,
};
use crate::{instances::ManageVars, types::Lit};

mod sequentialcounters;
pub use sequentialcounters::SequentialCounters;

mod totalizer;
pub use totalizer::Totalizer;

/// Trait for all cardinality encodings
pub trait Encode: Extend<Lit> {
    /// Gets the number of input literals
    fn n_lits(&self) -> usize;
}

/// Trait for cardinality encodings that enforce an upper bound directly
pub trait BoundUpper: Encode {
    /// Encodes and enforces that at most `ub` input literals are true
    ///
    /// # Errors
    ///
    /// If the clause collector runs out of memory.
    fn encode_ub<Col>(
        &mut self,
        ub: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses;
}

/// Compiles "at most `k` of `lits` are true" into clauses added to
/// `collector`. Auxiliary variables are taken from `var_manager`.
///
/// # Errors
///
/// If the clause collector runs out of memory.
pub fn encode_at_most_k<Col>(
    lits: &[Lit],
    k: usize,
    collector: &mut Col,
    var_manager: &mut dyn ManageVars,
) -> Result<(), crate::OutOfMemory>
where
    Col: CollectClauses,
{
    if k >= lits.len() {
        return Ok(());
    }
    let n_vars_before = var_manager.n_used();
    let (n_clauses, n_vars) = match k {
        0 => {
            let mut enc = AllFalse::from(lits.to_vec());
            enc.encode_ub(0, collector, var_manager)?;
            (enc.n_clauses(), enc.n_vars())
        }
        1 => {
            let mut enc = Pairwise::from(lits.to_vec());
            am1::Encode::encode(&mut enc, collector, var_manager)?;
            (enc.n_clauses(), enc.n_vars())
        }
        _ => {
            let mut enc = SequentialCounters::from(lits.to_vec());
            enc.encode_ub(k, collector, var_manager)?;
            (enc.n_clauses(), enc.n_vars())
        }
    };
    debug!(
        "at-most-{k} over {} lits: {n_clauses} clauses, variables {n_vars_before} -> {} (+{n_vars})",
        lits.len(),
        var_manager.n_used(),
    );
    Ok(())
}

/// The `k == 0` case: every input literal is false
#[derive(Default, Debug)]
pub struct AllFalse {
    in_lits: Vec<Lit>,
    n_clauses: usize,
}

impl Encode for AllFalse {
    fn n_lits(&self) -> usize {
        self.in_lits.len()
    }
}

impl BoundUpper for AllFalse {
    fn encode_ub<Col>(
        &mut self,
        ub: usize,
        collector: &mut Col,
        _var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses,
    {
        debug_assert_eq!(ub, 0);
        collector.extend_clauses(self.in_lits.iter().map(|&l| crate::clause![!l]))?;
        self.n_clauses += self.in_lits.len();
        Ok(())
    }
}

impl EncodeStats for AllFalse {
    fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn n_vars(&self) -> u32 {
        0
    }
}

impl From<Vec<Lit>> for AllFalse {
    fn from(in_lits: Vec<Lit>) -> Self {
        Self {
            in_lits,
            n_clauses: 0,
        }
    }
}

impl Extend<Lit> for AllFalse {
    fn extend<T: IntoIterator<Item = Lit>>(&mut self, iter: T) {
        self.in_lits.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::encode_at_most_k;
    use crate::{
        clause,
        instances::{BasicVarManager, Cnf, ManageVars},
        lit, var,
    };

    #[test]
    fn trivial_bound_adds_nothing() {
        let mut vm = BasicVarManager::from_next_free(var![3]);
        let mut cnf = Cnf::new();
        encode_at_most_k(&[lit![0], lit![1], lit![2]], 3, &mut cnf, &mut vm).unwrap();
        encode_at_most_k(&[lit![0], lit![1], lit![2]], 7, &mut cnf, &mut vm).unwrap();
        assert!(cnf.is_empty());
        assert_eq!(vm.n_used(), 3);
    }

    #[test]
    fn zero_bound_negates() {
        let mut vm = BasicVarManager::from_next_free(var![3]);
        let mut cnf = Cnf::new();
        encode_at_most_k(&[lit![0], !lit![1], lit![2]], 0, &mut cnf, &mut vm).unwrap();
        let expected: Cnf = [clause![!lit![0]], clause![lit![1]], clause![!lit![2]]]
            .into_iter()
            .collect();
        assert_eq!(cnf, expected);
        assert_eq!(vm.n_used(), 3);
    }

    #[test]
    fn one_bound_pairwise() {
        let mut vm = BasicVarManager::from_next_free(var![4]);
        let mut cnf = Cnf::new();
        encode_at_most_k(&[lit![0], lit![1], lit![2], lit![3]], 1, &mut cnf, &mut vm).unwrap();
        assert_eq!(cnf.len(), 6);
        assert_eq!(vm.n_used(), 4);
    }

    #[test]
    fn general_bound_uses_counters() {
        let lits: Vec<_> = (0..6).map(|idx| lit![idx]).collect();
        let mut vm = BasicVarManager::from_next_free(var![6]);
        let mut cnf = Cnf::new();
        encode_at_most_k(&lits, 3, &mut cnf, &mut vm).unwrap();
        assert!(vm.n_used() > 6);
        assert!(vm.n_used() - 6 <= 4 * 3);
    }
}
