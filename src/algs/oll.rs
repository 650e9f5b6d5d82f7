//! # OLL
//!
//! Core-guided search for weighted formulas with totalizer reformulation and
//! diversity-free stratification.
//!
//! The objective is kept as a set of _inactive_ literals with remaining
//! weights, initially the violation literals of the soft clauses. A core with
//! minimum remaining weight `w` raises the lower bound by `w` and lowers the
//! weights of its literals by `w`. The core is then reformulated by a
//! totalizer over its literals whose output "at least two are true" enters
//! the objective with weight `w`. Once a totalizer output is used up, the next
//! output of the same totalizer enters the objective with the weight of the
//! totalizer.
//!
//! Only literals with a remaining weight of at least the current stratum are
//! assumed. Strata are the distinct remaining weights in descending order and
//! the stratum is lowered whenever the oracle finds a solution. A solution
//! found at the lowest stratum is optimal.
//!
//! ## References
//!
//! - Antonio Morgado and Carmine Dodaro and Joao Marques-Silva: _Core-Guided
//!   MaxSAT with Soft Cardinality Constraints_, CP 2014.
//! - Carlos Ansótegui and Maria Luisa Bonet and Joel Gabàs and Jordi Levy:
//!   _Improving SAT-Based Weighted MaxSAT Solvers_, CP 2012.

use anyhow::anyhow;
use itertools::Itertools;
use log::trace;

use super::{impl_engine, Base, Oracle};
use crate::{
    encodings::{card::Totalizer, Error as EncodeError},
    instances::Formula,
    solvers::SolverResult,
    types::{Lit, RsHashMap},
};

/// Totalizer data for an output literal in the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reform {
    tot: usize,
    oidx: usize,
    weight: u64,
}

/// The OLL search engine
pub struct Oll<O> {
    base: Base<O>,
    /// Objective literals with their remaining weights
    inactives: RsHashMap<Lit, u64>,
    /// Totalizer outputs in the objective
    reforms: RsHashMap<Lit, Reform>,
    tots: Vec<Totalizer>,
    offset: u64,
    stratum: u64,
}

impl<O: Oracle> Default for Oll<O> {
    fn default() -> Self {
        Self {
            base: Base::default(),
            inactives: RsHashMap::default(),
            reforms: RsHashMap::default(),
            tots: vec![],
            offset: 0,
            stratum: 0,
        }
    }
}

impl_engine!(Oll, "OLL");

impl<O: Oracle> Oll<O> {
    /// Creates a new engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn base(&self) -> &Base<O> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base<O> {
        &mut self.base
    }

    fn core_bound(&self) -> u64 {
        self.offset
    }

    fn load_formula(&mut self, formula: &Formula) -> anyhow::Result<()> {
        self.base.load(formula)?;
        self.inactives.try_reserve(self.base.softs.len())?;
        self.inactives
            .extend(self.base.softs.iter().map(|soft| (soft.viol, soft.weight)));
        Ok(())
    }

    /// The assumptions for the current stratum, heaviest first
    fn assumptions(&self) -> Vec<Lit> {
        self.inactives
            .iter()
            .filter(|(_, &w)| w >= self.stratum)
            .sorted_unstable_by(|(l1, w1), (l2, w2)| w2.cmp(w1).then(l1.cmp(l2)))
            .map(|(&l, _)| !l)
            .collect()
    }

    /// The next lower stratum, if any
    fn next_stratum(&self) -> Option<u64> {
        self.inactives
            .values()
            .copied()
            .filter(|&w| w < self.stratum)
            .max()
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.stratum = self.inactives.values().copied().max().unwrap_or(0);
        loop {
            let assumps = self.assumptions();
            match self.base.solve_assumps(&assumps)? {
                SolverResult::Interrupted => {
                    self.base.finish_interrupted();
                    return Ok(());
                }
                SolverResult::Sat => {
                    self.base.record_solution()?;
                    match self.next_stratum() {
                        Some(stratum) => {
                            trace!("lowering stratum from {} to {stratum}", self.stratum);
                            self.stratum = stratum;
                        }
                        None => {
                            self.base.finish_optimum();
                            return Ok(());
                        }
                    }
                }
                SolverResult::Unsat => {
                    let core = self.base.oracle.core()?;
                    if core.is_empty() {
                        self.base.finish_unsat();
                        return Ok(());
                    }
                    self.reformulate(&core)?;
                    if self.base.bound_exceeded(self.offset) {
                        trace!("lower bound {} reaches the maximum cost", self.offset);
                        self.base.finish_unsat();
                        return Ok(());
                    }
                }
            }
        }
    }

    fn reformulate(&mut self, core: &[Lit]) -> anyhow::Result<()> {
        let mut core_weight = u64::MAX;
        for lit in core {
            let weight = self
                .inactives
                .get(lit)
                .ok_or_else(|| anyhow!("core literal {lit} is not an assumption"))?;
            core_weight = core_weight.min(*weight);
        }
        self.offset = self.offset.saturating_add(core_weight);
        trace!(
            "core of size {} with weight {core_weight}, lower bound {}",
            core.len(),
            self.offset
        );

        for lit in core {
            let remaining = match self.inactives.get_mut(lit) {
                Some(weight) => {
                    *weight -= core_weight;
                    *weight
                }
                None => continue,
            };
            if remaining > 0 {
                continue;
            }
            self.inactives.remove(lit);
            let Some(reform) = self.reforms.remove(lit) else {
                continue;
            };
            // the output is used up, the next output of its totalizer takes over
            let next = reform.oidx + 1;
            let tot = &mut self.tots[reform.tot];
            if next >= tot.lits().len() {
                continue;
            }
            tot.encode_ub(next, &mut self.base.oracle, &mut self.base.var_manager)?;
            let olit = tot.output(next).ok_or(EncodeError::NotEncoded)?;
            self.inactives.insert(olit, reform.weight);
            self.reforms.insert(
                olit,
                Reform {
                    oidx: next,
                    ..reform
                },
            );
        }

        if core.len() > 1 {
            let mut tot = Totalizer::from(core.to_vec());
            tot.encode_ub(1, &mut self.base.oracle, &mut self.base.var_manager)?;
            let olit = tot.output(1).ok_or(EncodeError::NotEncoded)?;
            self.inactives.insert(olit, core_weight);
            self.reforms.insert(
                olit,
                Reform {
                    tot: self.tots.len(),
                    oidx: 1,
                    weight: core_weight,
                },
            );
            self.tots.push(tot);
        }
        Ok(())
    }
}

impl<O> Oll<O> {
    /// Gets the current stratum
    #[must_use]
    pub fn stratum(&self) -> u64 {
        self.stratum
    }
}

#[cfg(test)]
mod tests {
    use super::Oll;
    use crate::{
        algs::{Engine, EngineStatus},
        clause,
        instances::Formula,
        lit,
        solvers::batsat::Solver,
        var,
    };

    #[test]
    fn weighted_exclusive() {
        let mut formula = Formula::new(3);
        formula.add_hard_clause(clause![!lit![0], !lit![1]]).unwrap();
        formula.add_hard_clause(clause![!lit![0], !lit![2]]).unwrap();
        formula.add_soft_clause(clause![lit![0]], 5).unwrap();
        formula.add_soft_clause(clause![lit![1]], 3).unwrap();
        formula.add_soft_clause(clause![lit![2]], 3).unwrap();
        let mut engine = Oll::<Solver>::new();
        engine.load(&formula).unwrap();
        engine.search();
        assert_eq!(engine.status(), EngineStatus::Optimum);
        assert_eq!(engine.best_bound(), 5);
        assert_eq!(engine.lower_bound(), 5);
        assert!(!engine.value_of(var![0]));
        assert!(engine.value_of(var![1]));
        assert!(engine.value_of(var![2]));
    }

    #[test]
    fn decreasing_weights_at_most_two() {
        // at most two of x0..x3 by pairwise-free hards over triples
        let mut formula = Formula::new(4);
        for a in 0..4 {
            for b in a + 1..4 {
                for c in b + 1..4 {
                    formula
                        .add_hard_clause(clause![!lit![a], !lit![b], !lit![c]])
                        .unwrap();
                }
            }
        }
        for idx in 0..4u32 {
            formula
                .add_soft_clause(clause![lit![idx]], u64::from(10 - idx))
                .unwrap();
        }
        let mut engine = Oll::<Solver>::new();
        engine.load(&formula).unwrap();
        engine.search();
        assert_eq!(engine.status(), EngineStatus::Optimum);
        // x2 and x3 are violated
        assert_eq!(engine.best_bound(), 8 + 7);
        assert!(engine.value_of(var![0]) && engine.value_of(var![1]));
    }

    #[test]
    fn constant_cost_only() {
        let mut formula = Formula::new(1);
        formula.add_soft_clause(clause![], 4).unwrap();
        formula.add_hard_clause(clause![lit![0]]).unwrap();
        let mut engine = Oll::<Solver>::new();
        engine.load(&formula).unwrap();
        engine.search();
        assert_eq!(engine.status(), EngineStatus::Optimum);
        assert_eq!(engine.best_bound(), 4);
        assert!(engine.value_of(var![0]));
    }

    #[test]
    fn max_cost_below_optimum() {
        let mut formula = Formula::new(2);
        formula.add_hard_clause(clause![!lit![0], !lit![1]]).unwrap();
        formula.add_soft_clause(clause![lit![0]], 2).unwrap();
        formula.add_soft_clause(clause![lit![1]], 3).unwrap();
        let mut engine = Oll::<Solver>::new();
        engine.load(&formula).unwrap();
        engine.set_max_cost(2);
        engine.search();
        assert_eq!(engine.status(), EngineStatus::Unsat);
        assert!(engine.lower_bound() >= 2);
    }
}
