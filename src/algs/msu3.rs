//! # MSU3
//!
//! Core-guided lower-bounding search for unweighted formulas. Soft clauses
//! start out _active_, meaning their violation literal is assumed false. When
//! the oracle finds a core, the active soft clauses in it are relaxed: they
//! are merged with all cardinality groups the core touches into a single
//! group, whose totalizer bounds the number of violated soft clauses in the
//! group by the sum of the merged bounds plus one. Every core raises the lower
//! bound by one and the first satisfiable call with all soft clauses in the
//! search yields an optimal solution.
//!
//! Soft clauses can be added to the search in stages, see
//! [`super::partition::PartMsu3`].
//!
//! ## References
//!
//! - Joao Marques-Silva and Jordi Planes: _On Using Unsatisfiability for
//!   Solving Maximum Satisfiability_, CoRR 2007.
//! - Ruben Martins and Saurabh Joshi and Vasco Manquinho and Ines Lynce:
//!   _Incremental Cardinality Constraints for MaxSAT_, CP 2014.

use std::collections::VecDeque;

use anyhow::anyhow;
use itertools::Itertools;
use log::trace;

use super::{impl_engine, Base, Oracle, Soft};
use crate::{
    encodings::card::Totalizer,
    instances::Formula,
    solvers::SolverResult,
    types::{Lit, RsHashMap, RsHashSet},
};

/// A group of relaxed soft clauses with a bound on the number of violated ones
#[derive(Debug)]
struct Group {
    tot: Totalizer,
    bound: usize,
}

/// The MSU3 search engine
pub struct Msu3<O> {
    base: Base<O>,
    /// Indices of the soft clauses whose violation literals are assumed false
    active: Vec<usize>,
    /// Soft clauses not yet in the search
    stages: VecDeque<Vec<usize>>,
    groups: Vec<Group>,
    lower_bound: u64,
}

impl<O: Oracle> Default for Msu3<O> {
    fn default() -> Self {
        Self {
            base: Base::default(),
            active: vec![],
            stages: VecDeque::new(),
            groups: vec![],
            lower_bound: 0,
        }
    }
}

impl_engine!(Msu3, "MSU3");

impl<O: Oracle> Msu3<O> {
    /// Creates a new engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn base(&self) -> &Base<O> {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut Base<O> {
        &mut self.base
    }

    pub(crate) fn core_bound(&self) -> u64 {
        self.lower_bound
    }

    fn load_formula(&mut self, formula: &Formula) -> anyhow::Result<()> {
        self.load_staged(formula, |softs| vec![(0..softs.len()).collect()])
    }

    /// Loads the formula and splits the soft clauses into stages. Soft
    /// clauses that are in no stage are never part of the search.
    pub(crate) fn load_staged<F>(&mut self, formula: &Formula, stages: F) -> anyhow::Result<()>
    where
        F: FnOnce(&[Soft]) -> Vec<Vec<usize>>,
    {
        self.base.load(formula)?;
        self.stages = stages(&self.base.softs).into();
        Ok(())
    }

    fn activate_next_stage(&mut self) -> bool {
        let Some(stage) = self.stages.pop_front() else {
            return false;
        };
        trace!(
            "activating {} soft clauses, {} stages left",
            stage.len(),
            self.stages.len()
        );
        self.active.extend(stage);
        true
    }

    fn assumptions(&self) -> anyhow::Result<Vec<Lit>> {
        let mut assumps: Vec<Lit> = self
            .active
            .iter()
            .map(|&idx| !self.base.softs[idx].viol)
            .collect();
        for group in &self.groups {
            assumps.extend(group.tot.enforce_ub(group.bound)?);
        }
        Ok(assumps)
    }

    pub(crate) fn run(&mut self) -> anyhow::Result<()> {
        if self.active.is_empty() {
            self.activate_next_stage();
        }
        loop {
            let assumps = self.assumptions()?;
            match self.base.solve_assumps(&assumps)? {
                SolverResult::Interrupted => {
                    self.base.finish_interrupted();
                    return Ok(());
                }
                SolverResult::Sat => {
                    self.base.record_solution()?;
                    if !self.activate_next_stage() {
                        self.base.finish_optimum();
                        return Ok(());
                    }
                }
                SolverResult::Unsat => {
                    let core = self.base.oracle.core()?;
                    if core.is_empty() {
                        self.base.finish_unsat();
                        return Ok(());
                    }
                    self.relax(&core)?;
                    if self.base.bound_exceeded(self.lower_bound) {
                        trace!("lower bound {} reaches the maximum cost", self.lower_bound);
                        self.base.finish_unsat();
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Relaxes the soft clauses in a core and merges the groups it touches
    fn relax(&mut self, core: &[Lit]) -> anyhow::Result<()> {
        let soft_map: RsHashMap<Lit, usize> = self
            .active
            .iter()
            .map(|&idx| (self.base.softs[idx].viol, idx))
            .collect();
        let group_map: RsHashMap<Lit, usize> = self
            .groups
            .iter()
            .enumerate()
            .filter_map(|(gidx, group)| group.tot.output(group.bound).map(|olit| (olit, gidx)))
            .collect();

        let mut relaxed: RsHashSet<usize> = RsHashSet::default();
        let mut merged = vec![];
        let mut inputs = vec![];
        for &lit in core {
            if let Some(&idx) = soft_map.get(&lit) {
                relaxed.insert(idx);
                inputs.push(lit);
            } else if let Some(&gidx) = group_map.get(&lit) {
                merged.push(gidx);
            } else {
                return Err(anyhow!("core literal {lit} is not an assumption"));
            }
        }
        self.active.retain(|idx| !relaxed.contains(idx));

        let mut bound = 1;
        for gidx in merged.into_iter().sorted_unstable().rev() {
            let group = self.groups.swap_remove(gidx);
            bound += group.bound;
            inputs.extend_from_slice(group.tot.lits());
        }
        self.lower_bound += 1;
        trace!(
            "core of size {}: {} relaxed, new group over {} literals with bound {bound}, lower bound {}",
            core.len(),
            relaxed.len(),
            inputs.len(),
            self.lower_bound
        );

        if bound < inputs.len() {
            let mut tot = Totalizer::from(inputs);
            tot.encode_ub(bound, &mut self.base.oracle, &mut self.base.var_manager)?;
            self.groups.push(Group { tot, bound });
        }
        Ok(())
    }
}
