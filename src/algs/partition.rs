//! # Partition-Based MSU3
//!
//! Splits the soft clauses of an unweighted formula into the connected
//! components of the variable incidence graph of the whole formula: two
//! variables are connected if they appear together in any clause. Soft
//! clauses in different components do not interact, so [`PartMsu3`] adds them
//! to the [`Msu3`] search one component at a time, smallest first. Every
//! component that is found satisfiable yields a solution for the whole
//! formula.
//!
//! Partitioning only pays off if there are several components of reasonable
//! size, [`Partitions::choose_algorithm`] decides this.
//!
//! ## References
//!
//! - Ruben Martins and Vasco Manquinho and Ines Lynce: _Community-Based
//!   Partitioning for MaxSAT Solving_, SAT 2013.

use log::debug;

use super::{impl_engine, msu3::Msu3, Base, Oracle};
use crate::{
    instances::Formula,
    types::{Clause, Var},
};

/// Union-find over variable indices with path halving and union by size
#[derive(Debug, Clone)]
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn new(n: u32) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n as usize],
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra as usize] >= self.size[rb as usize] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small as usize] = big;
        self.size[big as usize] += self.size[small as usize];
    }

    fn union_clause(&mut self, clause: &Clause) {
        let mut lits = clause.iter();
        if let Some(first) = lits.next() {
            lits.for_each(|l| self.union(first.vidx32(), l.vidx32()));
        }
    }
}

/// The search strategy to use for an unweighted formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Plain [`Msu3`]
    Msu3,
    /// [`PartMsu3`]
    PartMsu3,
}

/// Partitioning of the soft clauses of a formula
#[derive(Debug, Clone, Default)]
pub struct Partitions {
    /// The partition of each soft clause, [`None`] for empty soft clauses
    soft_part: Vec<Option<usize>>,
    sizes: Vec<usize>,
}

impl Partitions {
    /// Partitions the soft clauses over variables `0..n_vars`
    pub fn new<'a, H, S>(n_vars: u32, hards: H, softs: S) -> Self
    where
        H: IntoIterator<Item = &'a Clause>,
        S: IntoIterator<Item = &'a Clause>,
    {
        let mut uf = UnionFind::new(n_vars);
        hards.into_iter().for_each(|cl| uf.union_clause(cl));
        let softs: Vec<&Clause> = softs.into_iter().collect();
        softs.iter().for_each(|cl| uf.union_clause(cl));

        let mut root_part = crate::types::RsHashMap::default();
        let mut sizes: Vec<usize> = vec![];
        let soft_part = softs
            .iter()
            .map(|cl| {
                let first: Var = cl.iter().next()?.var();
                let root = uf.find(first.idx32());
                let part = *root_part.entry(root).or_insert_with(|| {
                    sizes.push(0);
                    sizes.len() - 1
                });
                sizes[part] += 1;
                Some(part)
            })
            .collect();
        Self { soft_part, sizes }
    }

    /// Partitions the soft clauses of a formula
    #[must_use]
    pub fn of_formula(formula: &Formula) -> Self {
        Self::new(
            formula.n_vars(),
            formula.hards(),
            formula.softs().iter().map(|(cl, _)| cl),
        )
    }

    /// Gets the number of partitions
    #[must_use]
    pub fn n_partitions(&self) -> usize {
        self.sizes.len()
    }

    /// Gets the number of soft clauses in the largest partition
    #[must_use]
    pub fn largest(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// Gets the number of partitioned (non-empty) soft clauses
    #[must_use]
    pub fn n_softs(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Decides whether partitioning is beneficial. It is not if there are
    /// fewer than two partitions or the largest partition holds more than
    /// `max_share` of the soft clauses.
    #[must_use]
    pub fn choose_algorithm(&self, max_share: f64) -> Algorithm {
        #[allow(clippy::cast_precision_loss)]
        let too_large = self.largest() as f64 > max_share * self.n_softs() as f64;
        let algorithm = if self.n_partitions() < 2 || too_large {
            Algorithm::Msu3
        } else {
            Algorithm::PartMsu3
        };
        debug!(
            "{} partitions, largest {} of {} softs: {algorithm:?}",
            self.n_partitions(),
            self.largest(),
            self.n_softs()
        );
        algorithm
    }

    /// Gets the soft clause indices of each partition, smallest partition
    /// first
    #[must_use]
    pub fn stages(&self) -> Vec<Vec<usize>> {
        let mut stages = vec![vec![]; self.n_partitions()];
        for (idx, part) in self.soft_part.iter().enumerate() {
            if let Some(part) = part {
                stages[*part].push(idx);
            }
        }
        stages.sort_by_key(Vec::len);
        stages
    }
}

/// Decides whether the soft clauses of a formula should be partitioned
#[must_use]
pub fn choose_algorithm(formula: &Formula, max_share: f64) -> Algorithm {
    Partitions::of_formula(formula).choose_algorithm(max_share)
}

/// MSU3 over one partition of soft clauses at a time
pub struct PartMsu3<O> {
    inner: Msu3<O>,
}

impl<O: Oracle> Default for PartMsu3<O> {
    fn default() -> Self {
        Self {
            inner: Msu3::default(),
        }
    }
}

impl_engine!(PartMsu3, "PartMSU3");

impl<O: Oracle> PartMsu3<O> {
    /// Creates a new engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn base(&self) -> &Base<O> {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut Base<O> {
        self.inner.base_mut()
    }

    fn core_bound(&self) -> u64 {
        self.inner.core_bound()
    }

    fn load_formula(&mut self, formula: &Formula) -> anyhow::Result<()> {
        self.inner.load_staged(formula, |softs| {
            let parts = Partitions::new(
                formula.n_vars(),
                formula.hards(),
                softs.iter().map(|soft| &soft.clause),
            );
            debug!("searching {} partitions", parts.n_partitions());
            parts.stages()
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.inner.run()
    }
}
