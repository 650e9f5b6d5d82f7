//! # Sequential Weighted Counter Encoding
//!
//! Encodes "at most `k` of `L[0..n]`" with counter variables `s[i][j]`
//! meaning "at least `j+1` of `L[0..=i]` are true". Four clause families are
//! emitted:
//!
//! 1. monotonicity `s[i-1][j] -> s[i][j]`
//! 2. activation `L[i] -> s[i][0]`
//! 3. overflow rejection `s[i-1][k-1] -> !L[i]`
//! 4. increment `s[i-1][j] & L[i] -> s[i][j+1]`
//!
//! Counter cells are created on first use. Cells that can never be reached
//! (`j > i`) are not created and the last counter row `n-2` is only built for
//! the threshold `k-1` that the final overflow clause reads. A single encoding
//! therefore introduces at most `(n-2)k` variables.
//!
//! ## References
//!
//! - Carsten Sinz: _Towards an Optimal CNF Encoding of Boolean Cardinality Constraints_, CP 2005.
//! - Steffen Hölldobler, Norbert Manthey, Peter Steinke: _A Compact Encoding of Pseudo-Boolean Constraints into SAT_, KI 2012.

use std::cmp;

use crate::{
    encodings::{atomics, CollectClauses, EncodeStats},
    instances::ManageVars,
    types::{Lit, RsHashMap},
};

use super::{BoundUpper, Encode};

/// Lazily allocated counter cells, keyed by `(position, threshold)`
#[derive(Default, Debug)]
struct Cells {
    lits: RsHashMap<(usize, usize), Lit>,
}

impl Cells {
    fn get(&mut self, i: usize, j: usize, var_manager: &mut dyn ManageVars) -> Lit {
        debug_assert!(j <= i);
        *self
            .lits
            .entry((i, j))
            .or_insert_with(|| var_manager.new_lit())
    }
}

/// Implementation of the sequential (weighted) counter encoding for an upper
/// bound
#[derive(Default, Debug)]
pub struct SequentialCounters {
    /// Input literals
    in_lits: Vec<Lit>,
    /// The number of variables introduced
    n_vars: u32,
    /// The number of clauses emitted
    n_clauses: usize,
}

impl SequentialCounters {
    /// Upper bound on the number of counter cells for `n` literals and bound `k`
    fn max_cells(n: usize, k: usize) -> usize {
        n.saturating_sub(2).saturating_mul(k)
    }
}

impl Encode for SequentialCounters {
    fn n_lits(&self) -> usize {
        self.in_lits.len()
    }
}

impl BoundUpper for SequentialCounters {
    /// Emits the full counter encoding for bound `ub`. Every call produces an
    /// independent encoding with fresh counter variables.
    fn encode_ub<Col>(
        &mut self,
        ub: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses,
    {
        let n = self.in_lits.len();
        let k = ub;
        if k >= n {
            return Ok(());
        }
        if k == 0 {
            collector.extend_clauses(self.in_lits.iter().map(|&l| crate::clause![!l]))?;
            self.n_clauses += n;
            return Ok(());
        }

        let mut cells = Cells::default();
        cells.lits.try_reserve(Self::max_cells(n, k))?;
        let vars_before = var_manager.n_used();
        let clauses_before = collector.n_clauses();
        let lits = &self.in_lits;
        let last = n - 2;

        for i in 0..=last {
            // only the overflow threshold of the last row is ever read
            let needed = |j: usize| i < last || j == k - 1;

            // (2) activation
            if needed(0) {
                let s = cells.get(i, 0, var_manager);
                collector.add_clause(atomics::lit_impl_lit(lits[i], s))?;
            }
            if i == 0 {
                continue;
            }
            for j in 0..cmp::min(i, k) {
                // (1) monotonicity
                if needed(j) {
                    let prev = cells.get(i - 1, j, var_manager);
                    let s = cells.get(i, j, var_manager);
                    collector.add_clause(atomics::lit_impl_lit(prev, s))?;
                }
                // (4) increment
                if j + 1 < k && needed(j + 1) {
                    let prev = cells.get(i - 1, j, var_manager);
                    let s = cells.get(i, j + 1, var_manager);
                    collector.add_clause(atomics::cube_impl_lit(&[prev, lits[i]], s))?;
                }
            }
        }
        // (3) overflow rejection, `s[i-1][k-1]` exists from position `k-1` on
        for i in k..n {
            let prev = cells.get(i - 1, k - 1, var_manager);
            collector.add_clause(atomics::not_cube(&[prev, lits[i]]))?;
        }

        self.n_vars += var_manager.n_used() - vars_before;
        self.n_clauses += collector.n_clauses() - clauses_before;
        debug_assert!(cells.lits.len() <= Self::max_cells(n, k));
        Ok(())
    }
}

impl EncodeStats for SequentialCounters {
    fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn n_vars(&self) -> u32 {
        self.n_vars
    }
}

impl From<Vec<Lit>> for SequentialCounters {
    fn from(lits: Vec<Lit>) -> Self {
        Self {
            in_lits: lits,
            ..Default::default()
        }
    }
}

impl FromIterator<Lit> for SequentialCounters {
    fn from_iter<T: IntoIterator<Item = Lit>>(iter: T) -> Self {
        Self::from(Vec::from_iter(iter))
    }
}

impl Extend<Lit> for SequentialCounters {
    fn extend<T: IntoIterator<Item = Lit>>(&mut self, iter: T) {
        self.in_lits.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::SequentialCounters;
    use crate::{
        encodings::{
            card::{BoundUpper, Encode},
            EncodeStats,
        },
        instances::{BasicVarManager, Cnf, ManageVars},
        lit,
        types::{Assignment, Lit, Var},
        var,
    };

    /// Checks by enumeration whether every assignment of the inputs with at
    /// most `k` true literals can be extended to a model of the encoding
    /// and no other assignment can.
    fn check_equivalent(n: usize, k: usize) {
        let lits: Vec<Lit> = (0..n as u32).map(|idx| lit![idx]).collect();
        let mut enc = SequentialCounters::from(lits.clone());
        let mut vm = BasicVarManager::from_next_free(var![n as u32]);
        let mut cnf = Cnf::new();
        enc.encode_ub(k, &mut cnf, &mut vm).unwrap();
        let n_aux = vm.n_used() as usize - n;
        assert_eq!(n_aux, enc.n_vars() as usize);
        assert!(n_aux <= (n - 2) * k, "n={n} k={k} aux={n_aux}");
        for inputs in 0u32..(1 << n) {
            let expected = inputs.count_ones() as usize <= k;
            let extendable = (0u32..(1 << n_aux)).any(|aux| {
                let mut assign = Assignment::default();
                (0..n).for_each(|i| assign.assign_lit(Var::new(i as u32).lit(inputs & (1 << i) == 0)));
                (0..n_aux).for_each(|i| {
                    assign.assign_lit(Var::new((n + i) as u32).lit(aux & (1 << i) == 0));
                });
                cnf.iter().all(|cl| cl.is_sat(&assign))
            });
            assert_eq!(expected, extendable, "n={n} k={k} inputs={inputs:#b}");
        }
    }

    #[test]
    fn swc_small() {
        check_equivalent(3, 2);
        check_equivalent(4, 2);
        check_equivalent(4, 3);
    }

    #[test]
    fn swc_medium() {
        check_equivalent(5, 2);
        check_equivalent(5, 3);
        check_equivalent(6, 4);
    }

    #[test]
    fn swc_stats() {
        let mut enc: SequentialCounters = (0..10).map(|idx| lit![idx]).collect();
        let mut vm = BasicVarManager::from_next_free(var![10]);
        let mut cnf = Cnf::new();
        enc.encode_ub(4, &mut cnf, &mut vm).unwrap();
        assert_eq!(enc.n_lits(), 10);
        assert_eq!(enc.n_clauses(), cnf.len());
        assert!(enc.n_vars() <= 8 * 4);
    }

    #[test]
    fn swc_trivial_bound() {
        let mut enc: SequentialCounters = (0..3).map(|idx| lit![idx]).collect();
        let mut vm = BasicVarManager::from_next_free(var![3]);
        let mut cnf = Cnf::new();
        enc.encode_ub(3, &mut cnf, &mut vm).unwrap();
        assert!(cnf.is_empty());
        assert_eq!(enc.n_vars(), 0);
    }
}
