//! # Totalizer Encoding
//!
//! Implementation of the binary adder tree totalizer encoding \[1\], built
//! lazily for upper bounds as in \[2\]. Only the upper bounding direction is
//! encoded: output `j` of a node is implied when at least `j+1` of the
//! literals below the node are true.
//!
//! The nodes are stored in an arena and the tree is constructed when the
//! encoding is first built.
//!
//! ## References
//!
//! - \[1\] Olivier Bailleux and Yacine Boufkhad: _Efficient CNF Encoding of Boolean Cardinality Constraints_, CP 2003.
//! - \[2\] Ruben Martins and Saurabh Joshi and Vasco Manquinho and Ines Lynce: _Incremental Cardinality Constraints for MaxSAT_, CP 2014.

use std::cmp;

use crate::{
    encodings::{atomics, CollectClauses, EncodeStats, Error},
    instances::ManageVars,
    types::{Clause, Lit},
};

use super::Encode;

#[derive(Debug, Clone)]
struct Node {
    /// Output literals, for leaves the input literal
    out: Vec<Lit>,
    /// The number of leaves below this node
    max_val: usize,
    /// Child node indices, [`None`] for leaves
    children: Option<(usize, usize)>,
}

/// Incremental upper-bounding totalizer
#[derive(Default, Debug, Clone)]
pub struct Totalizer {
    in_lits: Vec<Lit>,
    nodes: Vec<Node>,
    root: Option<usize>,
    n_vars: u32,
    n_clauses: usize,
}

impl Totalizer {
    fn build_tree(&mut self, lo: usize, hi: usize) -> usize {
        debug_assert!(hi > lo);
        let node = if hi - lo == 1 {
            Node {
                out: vec![self.in_lits[lo]],
                max_val: 1,
                children: None,
            }
        } else {
            let split = lo + (hi - lo) / 2;
            let left = self.build_tree(lo, split);
            let right = self.build_tree(split, hi);
            Node {
                out: vec![],
                max_val: hi - lo,
                children: Some((left, right)),
            }
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Ensures that node `id` has its first `n_out` outputs
    fn encode_node<Col>(
        &mut self,
        id: usize,
        n_out: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses,
    {
        let n_out = cmp::min(n_out, self.nodes[id].max_val);
        let Some((left, right)) = self.nodes[id].children else {
            return Ok(());
        };
        let old = self.nodes[id].out.len();
        if old >= n_out {
            return Ok(());
        }
        self.encode_node(left, n_out, collector, var_manager)?;
        self.encode_node(right, n_out, collector, var_manager)?;

        let new_outs: Vec<Lit> = (old..n_out).map(|_| var_manager.new_lit()).collect();
        self.n_vars += u32::try_from(new_outs.len()).expect("more than `u32::MAX` outputs");
        self.nodes[id].out.extend(new_outs);

        let left_out = &self.nodes[left].out;
        let right_out = &self.nodes[right].out;
        let out = &self.nodes[id].out;
        // (left >= a) & (right >= b) -> (out >= a + b) for the new sums only
        let clauses: Vec<Clause> = (old + 1..=n_out)
            .flat_map(|sum| {
                (0..=cmp::min(sum, left_out.len())).filter_map(move |a| {
                    let b = sum - a;
                    if b > right_out.len() {
                        return None;
                    }
                    Some(match (a, b) {
                        (0, b) => atomics::lit_impl_lit(right_out[b - 1], out[sum - 1]),
                        (a, 0) => atomics::lit_impl_lit(left_out[a - 1], out[sum - 1]),
                        (a, b) => {
                            atomics::cube_impl_lit(&[left_out[a - 1], right_out[b - 1]], out[sum - 1])
                        }
                    })
                })
            })
            .collect();
        self.n_clauses += clauses.len();
        collector.extend_clauses(clauses)
    }

    /// Lazily builds the encoding so that every upper bound up to `max_ub`
    /// can be enforced with [`Totalizer::enforce_ub`].
    ///
    /// # Errors
    ///
    /// If the clause collector runs out of memory.
    pub fn encode_ub<Col>(
        &mut self,
        max_ub: usize,
        collector: &mut Col,
        var_manager: &mut dyn ManageVars,
    ) -> Result<(), crate::OutOfMemory>
    where
        Col: CollectClauses,
    {
        if self.in_lits.is_empty() {
            return Ok(());
        }
        let root = match self.root {
            Some(root) => root,
            None => {
                let root = self.build_tree(0, self.in_lits.len());
                self.root = Some(root);
                root
            }
        };
        self.encode_node(root, max_ub + 1, collector, var_manager)
    }

    /// Returns the assumptions enforcing that at most `ub` inputs are true
    ///
    /// # Errors
    ///
    /// [`Error::NotEncoded`] if [`Totalizer::encode_ub`] has not been called
    /// with a bound of at least `ub`.
    pub fn enforce_ub(&self, ub: usize) -> Result<Vec<Lit>, Error> {
        if ub >= self.in_lits.len() {
            return Ok(vec![]);
        }
        let root = self.root.ok_or(Error::NotEncoded)?;
        match self.nodes[root].out.get(ub) {
            Some(&olit) => Ok(vec![!olit]),
            None => Err(Error::NotEncoded),
        }
    }

    /// Gets the output literal that is implied when more than `val` inputs
    /// are true, if it is encoded
    #[must_use]
    pub fn output(&self, val: usize) -> Option<Lit> {
        self.root.and_then(|root| self.nodes[root].out.get(val).copied())
    }

    /// Gets the input literals
    #[must_use]
    pub fn lits(&self) -> &[Lit] {
        &self.in_lits
    }
}

impl Encode for Totalizer {
    fn n_lits(&self) -> usize {
        self.in_lits.len()
    }
}

impl EncodeStats for Totalizer {
    fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn n_vars(&self) -> u32 {
        self.n_vars
    }
}

impl From<Vec<Lit>> for Totalizer {
    fn from(lits: Vec<Lit>) -> Self {
        Self {
            in_lits: lits,
            ..Default::default()
        }
    }
}

impl FromIterator<Lit> for Totalizer {
    fn from_iter<T: IntoIterator<Item = Lit>>(iter: T) -> Self {
        Self::from(Vec::from_iter(iter))
    }
}

/// Literals can only be added before the encoding is first built
impl Extend<Lit> for Totalizer {
    fn extend<T: IntoIterator<Item = Lit>>(&mut self, iter: T) {
        debug_assert!(self.root.is_none(), "totalizer already built");
        self.in_lits.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::Totalizer;
    use crate::{
        encodings::{EncodeStats, Error},
        instances::{BasicVarManager, Cnf, ManageVars},
        lit,
        types::{Assignment, Lit, Var},
        var,
    };

    #[test]
    fn single_input() {
        let mut tot = Totalizer::from(vec![lit![0]]);
        let mut vm = BasicVarManager::from_next_free(var![1]);
        let mut cnf = Cnf::new();
        tot.encode_ub(0, &mut cnf, &mut vm).unwrap();
        assert!(cnf.is_empty());
        assert_eq!(tot.enforce_ub(0), Ok(vec![!lit![0]]));
        assert_eq!(tot.enforce_ub(1), Ok(vec![]));
    }

    #[test]
    fn not_encoded() {
        let mut tot: Totalizer = (0..4).map(|idx| lit![idx]).collect();
        assert_eq!(tot.enforce_ub(1), Err(Error::NotEncoded));
        let mut vm = BasicVarManager::from_next_free(var![4]);
        let mut cnf = Cnf::new();
        tot.encode_ub(1, &mut cnf, &mut vm).unwrap();
        assert!(tot.enforce_ub(1).is_ok());
        assert_eq!(tot.enforce_ub(2), Err(Error::NotEncoded));
        assert_eq!(tot.enforce_ub(4), Ok(vec![]));
    }

    #[test]
    fn incremental_matches_full() {
        let mut inc: Totalizer = (0..5).map(|idx| lit![idx]).collect();
        let mut vm = BasicVarManager::from_next_free(var![5]);
        let mut cnf = Cnf::new();
        inc.encode_ub(0, &mut cnf, &mut vm).unwrap();
        inc.encode_ub(2, &mut cnf, &mut vm).unwrap();
        inc.encode_ub(4, &mut cnf, &mut vm).unwrap();

        let mut full: Totalizer = (0..5).map(|idx| lit![idx]).collect();
        let mut vm_full = BasicVarManager::from_next_free(var![5]);
        let mut cnf_full = Cnf::new();
        full.encode_ub(4, &mut cnf_full, &mut vm_full).unwrap();

        assert_eq!(inc.n_clauses(), full.n_clauses());
        assert_eq!(inc.n_vars(), full.n_vars());
        assert_eq!(cnf.len(), cnf_full.len());
    }

    #[test]
    fn outputs_are_implied() {
        let n = 5usize;
        let mut tot: Totalizer = (0..n as u32).map(|idx| lit![idx]).collect();
        let mut vm = BasicVarManager::from_next_free(var![n as u32]);
        let mut cnf = Cnf::new();
        tot.encode_ub(n - 1, &mut cnf, &mut vm).unwrap();
        let n_aux = vm.n_used() as usize - n;
        for ub in 0..n {
            let assumps = tot.enforce_ub(ub).unwrap();
            for inputs in 0u32..(1 << n) {
                let expected = inputs.count_ones() as usize <= ub;
                let extendable = (0u32..(1 << n_aux)).any(|aux| {
                    let mut assign = Assignment::default();
                    (0..n).for_each(|i| {
                        assign.assign_lit(Var::new(i as u32).lit(inputs & (1 << i) == 0));
                    });
                    (0..n_aux).for_each(|i| {
                        assign.assign_lit(Var::new((n + i) as u32).lit(aux & (1 << i) == 0));
                    });
                    cnf.iter().all(|cl| cl.is_sat(&assign))
                        && assumps.iter().all(|&a: &Lit| assign.lit_value(a).to_bool_with_def(false))
                });
                assert_eq!(expected, extendable, "ub={ub} inputs={inputs:#b}");
            }
        }
    }
}
