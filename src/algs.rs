//! # MaxSAT Search Engines
//!
//! Core-guided MaxSAT algorithms on top of an incremental SAT oracle. Every
//! engine implements the [`Engine`] capability trait, which is all the solve
//! orchestrator in [`crate::session`] relies on:
//!
//! - [`msu3::Msu3`]: core-guided lower-bounding search for unweighted formulas
//! - [`partition::PartMsu3`]: MSU3 activating independent parts of the
//!   formula one at a time
//! - [`oll::Oll`]: stratified OLL for weighted formulas
//!
//! The engines are not meant as competitive MaxSAT solvers.
//!
//! ## Loading
//!
//! Hard clauses are added to the oracle as they are. A soft clause `C` is
//! represented by a _violation literal_ that is true if the soft clause is
//! counted as violated. For unit clauses this is the negation of the unit,
//! otherwise a fresh variable `b` with the hard clause `C | b`. Empty soft
//! clauses are always violated and only add a constant to the cost. The
//! engines assume the negation of violation literals.

use log::{debug, trace, warn};

use crate::{
    encodings::CollectClauses,
    instances::{BasicVarManager, Formula, ManageVars},
    solvers::{LimitSteps, PhaseLit, SolveIncremental, SolveStats, SolverResult},
    types::{Assignment, Clause, Lit, RsHashSet, TernaryVal, Var},
};

pub mod msu3;
pub mod oll;
pub mod partition;

/// Status of a search engine, as reported after [`Engine::search`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    /// No search has been run, or the search ran out of steps before finding a
    /// solution
    #[default]
    Unknown,
    /// The hard clauses are unsatisfiable, or no solution has a cost below the
    /// maximum cost
    Unsat,
    /// A solution was found but the search ran out of steps before proving it
    /// optimal
    Sat,
    /// An optimal solution was found
    Optimum,
    /// The oracle or an encoding failed
    Error,
}

/// The capability interface of a MaxSAT search engine
pub trait Engine {
    /// Gets the name of the engine, for logging
    fn name(&self) -> &'static str;
    /// Sets literals whose phases the oracle should prefer. Must be called
    /// before [`Engine::load`] to have an effect.
    fn phase(&mut self, lits: &[Lit]);
    /// Loads a formula into the oracle of the engine
    ///
    /// # Errors
    ///
    /// If the oracle fails to accept the formula.
    fn load(&mut self, formula: &Formula) -> anyhow::Result<()>;
    /// Only solutions with a cost strictly below `max_cost` are accepted
    fn set_max_cost(&mut self, max_cost: u64);
    /// Limits the total number of oracle search steps of the following
    /// [`Engine::search`] calls
    fn set_step_budget(&mut self, steps: u64);
    /// Removes the step limit
    fn clear_step_budget(&mut self);
    /// Runs the search until it finishes or the step budget is used up
    fn search(&mut self);
    /// Gets the status reached by the last search
    fn status(&self) -> EngineStatus;
    /// Gets the cost of the best solution found. Only meaningful for
    /// [`EngineStatus::Sat`] and [`EngineStatus::Optimum`].
    fn best_bound(&self) -> u64;
    /// Gets the proven lower bound on the cost
    fn lower_bound(&self) -> u64;
    /// Gets the value of a formula variable in the best solution found.
    /// Unassigned variables are false.
    fn value_of(&self, var: Var) -> bool;
}

/// Requirements on the SAT oracle of the engines
pub trait Oracle: SolveIncremental + SolveStats + PhaseLit + LimitSteps + Default {}

impl<O> Oracle for O where O: SolveIncremental + SolveStats + PhaseLit + LimitSteps + Default {}

/// A soft clause as loaded into the oracle
#[derive(Debug, Clone)]
pub struct Soft {
    /// The soft clause
    pub clause: Clause,
    /// The weight of the soft clause
    pub weight: u64,
    /// The literal that is true if the soft clause is counted as violated
    pub viol: Lit,
}

/// The oracle and the solution bookkeeping shared by all engines
pub struct Base<O> {
    /// The SAT oracle
    pub oracle: O,
    /// Variable manager for variables introduced by the engine
    pub var_manager: BasicVarManager,
    /// The soft clauses
    pub softs: Vec<Soft>,
    /// Cost of the empty soft clauses
    pub const_cost: u64,
    max_cost: u64,
    n_formula_vars: u32,
    phases: Vec<Lit>,
    best: Option<(u64, Assignment)>,
    status: EngineStatus,
}

impl<O: Oracle> Default for Base<O> {
    fn default() -> Self {
        Self {
            oracle: O::default(),
            var_manager: BasicVarManager::default(),
            softs: vec![],
            const_cost: 0,
            max_cost: u64::MAX,
            n_formula_vars: 0,
            phases: vec![],
            best: None,
            status: EngineStatus::Unknown,
        }
    }
}

impl<O: Oracle> Base<O> {
    /// Loads the formula into the oracle
    ///
    /// # Errors
    ///
    /// If the oracle rejects clauses.
    pub fn load(&mut self, formula: &Formula) -> anyhow::Result<()> {
        self.n_formula_vars = formula.n_vars();
        self.var_manager = BasicVarManager::from_next_free(Var::new(formula.n_vars()));

        let mut phases = std::mem::take(&mut self.phases);
        phases.sort_unstable_by_key(|l| l.var());
        for lit in phases {
            if let Err(err) = self.oracle.phase_lit(lit) {
                warn!("ignoring phase for {lit}: {err}");
            }
        }

        self.oracle.extend_clauses(formula.hards().iter().cloned())?;

        let mut used_vars: RsHashSet<Var> = RsHashSet::default();
        self.softs.try_reserve(formula.n_softs())?;
        for (clause, weight) in formula.softs() {
            let viol = if clause.is_empty() {
                self.const_cost = self.const_cost.saturating_add(*weight);
                continue;
            } else if clause.is_unit() && used_vars.insert(clause[0].var()) {
                !clause[0]
            } else {
                let blit = self.var_manager.new_lit();
                let mut relaxed = clause.clone();
                relaxed.add(blit);
                self.oracle.add_clause(relaxed)?;
                blit
            };
            self.softs.push(Soft {
                clause: clause.clone(),
                weight: *weight,
                viol,
            });
        }
        debug!(
            "loaded {} hards and {} softs into {}, constant cost {}",
            formula.n_hards(),
            self.softs.len(),
            self.oracle.signature(),
            self.const_cost
        );
        Ok(())
    }

    /// Queues phases to be set on load
    pub fn phase(&mut self, lits: &[Lit]) {
        self.phases.extend_from_slice(lits);
    }

    /// Sets the maximum cost
    pub fn set_max_cost(&mut self, max_cost: u64) {
        self.max_cost = max_cost;
    }

    /// Calls the oracle under assumptions
    ///
    /// # Errors
    ///
    /// If the oracle fails.
    pub fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult> {
        let res = self.oracle.solve_assumps(assumps)?;
        trace!(
            "oracle call with {} assumptions: {res} ({} steps used)",
            assumps.len(),
            self.oracle.steps_used()
        );
        Ok(res)
    }

    /// Checks whether a lower bound rules out every solution below the
    /// maximum cost
    #[must_use]
    pub fn bound_exceeded(&self, lower_bound: u64) -> bool {
        self.const_cost.saturating_add(lower_bound) >= self.max_cost
    }

    /// Extracts the solution after a satisfiable oracle call and keeps it if
    /// it improves on the best solution. Returns the cost of the solution.
    ///
    /// # Errors
    ///
    /// If the oracle fails.
    pub fn record_solution(&mut self) -> anyhow::Result<u64> {
        let mut assign = Vec::new();
        assign.try_reserve(self.n_formula_vars as usize)?;
        for idx in 0..self.n_formula_vars {
            let val = self.oracle.var_val(Var::new(idx))?;
            assign.push(TernaryVal::from(val.to_bool_with_def(false)));
        }
        let assign = Assignment::from(assign);
        let cost = self
            .softs
            .iter()
            .filter(|soft| !soft.clause.is_sat(&assign))
            .fold(self.const_cost, |cost, soft| cost.saturating_add(soft.weight));
        let improves = cost < self.max_cost && self.best.as_ref().map_or(true, |(best, _)| cost < *best);
        if improves {
            debug!("new best solution with cost {cost}");
            self.best = Some((cost, assign));
        }
        Ok(cost)
    }

    /// Finishes a search that found an optimal solution. If that solution is
    /// not below the maximum cost, no acceptable solution exists.
    pub fn finish_optimum(&mut self) {
        self.status = if self.best.is_some() {
            EngineStatus::Optimum
        } else {
            EngineStatus::Unsat
        };
    }

    /// Finishes a search that ran out of steps
    pub fn finish_interrupted(&mut self) {
        self.status = if self.best.is_some() {
            EngineStatus::Sat
        } else {
            EngineStatus::Unknown
        };
    }

    /// Finishes a search that proved that no acceptable solution exists
    pub fn finish_unsat(&mut self) {
        self.status = EngineStatus::Unsat;
    }

    /// Finishes a search that failed
    pub fn finish_error(&mut self, err: &anyhow::Error) {
        warn!("search failed: {err}");
        self.status = EngineStatus::Error;
    }

    /// Gets the status
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Gets the cost of the best solution, [`u64::MAX`] if there is none
    #[must_use]
    pub fn best_cost(&self) -> u64 {
        self.best.as_ref().map_or(u64::MAX, |(cost, _)| *cost)
    }

    /// Gets the value of a variable in the best solution
    #[must_use]
    pub fn value_of(&self, var: Var) -> bool {
        self.best
            .as_ref()
            .is_some_and(|(_, assign)| assign.var_value(var) == TernaryVal::True)
    }

    /// Logs the oracle statistics at the end of a search
    pub fn log_stats(&self) {
        let stats = self.oracle.stats();
        debug!(
            "oracle: {} sat, {} unsat, {} interrupted calls, {} clauses, {:?} solve time",
            stats.n_sat, stats.n_unsat, stats.n_terminated, stats.n_clauses, stats.cpu_solve_time
        );
    }
}

/// Implements [`Engine`] for a search engine with a `base: Base<O>` field and
/// a `run(&mut self) -> anyhow::Result<()>` search routine
macro_rules! impl_engine {
    ($engine:ident, $name:literal) => {
        impl<O: $crate::algs::Oracle> $crate::algs::Engine for $engine<O> {
            fn name(&self) -> &'static str {
                $name
            }

            fn phase(&mut self, lits: &[$crate::types::Lit]) {
                self.base_mut().phase(lits);
            }

            fn load(&mut self, formula: &$crate::instances::Formula) -> anyhow::Result<()> {
                self.load_formula(formula)
            }

            fn set_max_cost(&mut self, max_cost: u64) {
                self.base_mut().set_max_cost(max_cost);
            }

            fn set_step_budget(&mut self, steps: u64) {
                $crate::solvers::LimitSteps::limit_steps(&mut self.base_mut().oracle, Some(steps));
            }

            fn clear_step_budget(&mut self) {
                $crate::solvers::LimitSteps::limit_steps(&mut self.base_mut().oracle, None);
            }

            fn search(&mut self) {
                if let Err(err) = self.run() {
                    self.base_mut().finish_error(&err);
                }
                self.base().log_stats();
            }

            fn status(&self) -> $crate::algs::EngineStatus {
                self.base().status()
            }

            fn best_bound(&self) -> u64 {
                self.base().best_cost()
            }

            fn lower_bound(&self) -> u64 {
                self.base().const_cost.saturating_add(self.core_bound())
            }

            fn value_of(&self, var: $crate::types::Var) -> bool {
                self.base().value_of(var)
            }
        }
    };
}
pub(crate) use impl_engine;
