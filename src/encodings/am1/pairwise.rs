//! # Pairwise At-Most-1 Encoding
//!
//! ## References
//!
//! - Steven D. Prestwich: _CNF Encodings_, in Handbook of Satisfiability 2021.

use super::Encode;
use crate::{
    encodings::{atomics, CollectClauses, EncodeStats},
    instances::ManageVars,
    types::Lit,
};

/// The pairwise at-most-1 encoding: one binary clause per pair of input
/// literals, no auxiliary variables.
#[derive(Default, Debug)]
pub struct Pairwise {
    in_lits: Vec<Lit>,
    n_clauses: usize,
}

impl Encode for Pairwise {
    fn n_lits(&self) -> usize {
        self.in_lits.len()
    }

    fn encode<Col>(
        &mut self,
        collector: &mut Col,
        _var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses,
    {
        let prev_clauses = collector.n_clauses();
        let lits = &self.in_lits;
        collector.extend_clauses((0..lits.len()).flat_map(|first| {
            (first + 1..lits.len()).map(move |second| atomics::not_cube(&[lits[first], lits[second]]))
        }))?;
        self.n_clauses += collector.n_clauses() - prev_clauses;
        Ok(())
    }
}

impl EncodeStats for Pairwise {
    fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn n_vars(&self) -> u32 {
        0
    }
}

impl From<Vec<Lit>> for Pairwise {
    fn from(lits: Vec<Lit>) -> Self {
        Self {
            in_lits: lits,
            n_clauses: 0,
        }
    }
}

impl FromIterator<Lit> for Pairwise {
    fn from_iter<T: IntoIterator<Item = Lit>>(iter: T) -> Self {
        Self::from(Vec::from_iter(iter))
    }
}

impl Extend<Lit> for Pairwise {
    fn extend<T: IntoIterator<Item = Lit>>(&mut self, iter: T) {
        self.in_lits.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::Pairwise;
    use crate::{
        clause,
        encodings::{am1::Encode, EncodeStats},
        instances::{BasicVarManager, Cnf},
        lit, var,
    };

    #[test]
    fn pairwise_clauses() {
        let mut enc: Pairwise = [lit![0], lit![1], !lit![2], lit![3]].into_iter().collect();
        let mut vm = BasicVarManager::from_next_free(var![4]);
        let mut cnf = Cnf::new();
        enc.encode(&mut cnf, &mut vm).unwrap();
        assert_eq!(cnf.len(), 6);
        assert_eq!(enc.n_clauses(), 6);
        assert_eq!(enc.n_vars(), 0);
        assert!(cnf.iter().any(|cl| cl == &clause![!lit![1], lit![2]]));
        assert_eq!(vm, BasicVarManager::from_next_free(var![4]));
    }

    #[test]
    fn pairwise_single() {
        let mut enc = Pairwise::from(vec![lit![0]]);
        let mut cnf = Cnf::new();
        enc.encode(&mut cnf, &mut BasicVarManager::default()).unwrap();
        assert!(cnf.is_empty());
    }
}
