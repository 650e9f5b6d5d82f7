//! # BatSat Oracle
//!
//! Interface to the [BatSat](https://github.com/c-cube/batsat) incremental SAT
//! solver. BatSat is fully implemented in Rust, which keeps the whole
//! workspace free of C/C++ build dependencies.
//!
//! Variable `x` of this library is BatSat variable `x + 1`; BatSat variable
//! `0` is never used.
//!
//! # BatSat Version
//!
//! The version of BatSat used is 0.6.0.

use std::{cell::Cell, time::Duration};

use batsat::{intmap::AsIndex, lbool, Callbacks, SolverInterface, SolverOpts};
use cpu_time::ProcessTime;

use super::{
    LimitSteps, PhaseLit, Solve, SolveIncremental, SolveStats, SolverError, SolverResult,
    SolverState, SolverStats,
};
use crate::types::{Clause, Lit, TernaryVal, Var};

/// BatSat callbacks stopping the search once a step limit is used up. A step
/// is one budget check of BatSat, which happens before every decision.
#[derive(Debug, Default)]
pub struct StepLimit {
    limit: Option<u64>,
    used: Cell<u64>,
}

impl Callbacks for StepLimit {
    fn stop(&self) -> bool {
        let used = self.used.get() + 1;
        self.used.set(used);
        self.limit.is_some_and(|limit| used > limit)
    }
}

/// Wrapper for a [`batsat::Solver`] with a step limit
pub struct Solver {
    internal: batsat::Solver<StepLimit>,
    state: SolverState,
    n_sat: usize,
    n_unsat: usize,
    n_terminated: usize,
    n_clauses: usize,
    avg_clause_len: f32,
    cpu_time: Duration,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            internal: batsat::Solver::new(SolverOpts::default(), StepLimit::default()),
            state: SolverState::Input,
            n_sat: 0,
            n_unsat: 0,
            n_terminated: 0,
            n_clauses: 0,
            avg_clause_len: 0.,
            cpu_time: Duration::ZERO,
        }
    }
}

impl Solver {
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    fn update_avg_clause_len(&mut self, clause: &Clause) {
        self.avg_clause_len = (self.avg_clause_len * (self.n_clauses as f32) + clause.len() as f32)
            / (self.n_clauses + 1) as f32;
    }

    fn to_batsat(&mut self, lit: Lit) -> batsat::Lit {
        batsat::Lit::new(self.internal.var_of_int(lit.vidx32() + 1), lit.is_pos())
    }

    fn solve_track_stats(&mut self, assumps: &[Lit]) -> SolverResult {
        let a = assumps
            .iter()
            .map(|&l| self.to_batsat(l))
            .collect::<Vec<_>>();

        let start = ProcessTime::now();
        let ret = match self.internal.solve_limited(&a) {
            x if x == lbool::TRUE => {
                self.n_sat += 1;
                self.state = SolverState::Sat;
                SolverResult::Sat
            }
            x if x == lbool::FALSE => {
                self.n_unsat += 1;
                self.state = SolverState::Unsat;
                SolverResult::Unsat
            }
            _ => {
                self.n_terminated += 1;
                self.state = SolverState::Input;
                SolverResult::Interrupted
            }
        };
        self.cpu_time += start.elapsed();
        ret
    }
}

impl Solve for Solver {
    fn signature(&self) -> &'static str {
        "BatSat 0.6.0"
    }

    fn solve(&mut self) -> anyhow::Result<SolverResult> {
        Ok(self.solve_track_stats(&[]))
    }

    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal> {
        if self.state != SolverState::Sat {
            return Err(SolverError::State(self.state, SolverState::Sat).into());
        }
        let idx = lit.vidx() + 1;
        if idx >= self.internal.num_vars() as usize {
            return Ok(TernaryVal::DontCare);
        }
        let l = batsat::Lit::new(batsat::Var::from_index(idx), lit.is_pos());
        match self.internal.value_lit(l) {
            x if x == lbool::TRUE => Ok(TernaryVal::True),
            x if x == lbool::FALSE => Ok(TernaryVal::False),
            _ => Ok(TernaryVal::DontCare),
        }
    }

    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()> {
        self.update_avg_clause_len(&clause);
        self.n_clauses += 1;
        self.state = SolverState::Input;

        let mut c = Vec::new();
        c.try_reserve(clause.len())?;
        c.extend(clause.iter().map(|&l| self.to_batsat(l)));
        // returns false if the formula is unsatisfiable at level 0, the next
        // solve call reports this
        self.internal.add_clause_reuse(&mut c);
        Ok(())
    }
}

impl SolveIncremental for Solver {
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult> {
        Ok(self.solve_track_stats(assumps))
    }

    fn core(&mut self) -> anyhow::Result<Vec<Lit>> {
        if self.state != SolverState::Unsat {
            return Err(SolverError::State(self.state, SolverState::Unsat).into());
        }
        Ok(self
            .internal
            .unsat_core()
            .iter()
            .map(|l| Lit::new(l.var().idx() - 1, !l.sign()))
            .collect::<Vec<_>>())
    }
}

impl PhaseLit for Solver {
    /// BatSat fixes the preferred phase when a variable is created, phases can
    /// therefore only be set for variables not yet seen by the oracle.
    fn phase_lit(&mut self, lit: Lit) -> anyhow::Result<()> {
        let idx = lit.vidx32() + 1;
        if idx < self.internal.num_vars() {
            return Err(SolverError::Api("phase must be set before the variable is used").into());
        }
        while self.internal.num_vars() < idx {
            self.internal.new_var_default();
        }
        self.internal.new_var(lbool::new(lit.is_pos()), true);
        Ok(())
    }
}

impl LimitSteps for Solver {
    fn limit_steps(&mut self, limit: Option<u64>) {
        let cb = self.internal.cb_mut();
        cb.limit = limit;
        cb.used.set(0);
    }

    fn steps_used(&self) -> u64 {
        self.internal.cb().used.get()
    }
}

impl SolveStats for Solver {
    fn stats(&self) -> SolverStats {
        SolverStats {
            n_sat: self.n_sat,
            n_unsat: self.n_unsat,
            n_terminated: self.n_terminated,
            n_clauses: self.n_clauses,
            max_var: self.max_var(),
            avg_clause_len: self.avg_clause_len,
            cpu_solve_time: self.cpu_time,
        }
    }

    fn n_sat_solves(&self) -> usize {
        self.n_sat
    }

    fn n_unsat_solves(&self) -> usize {
        self.n_unsat
    }

    fn n_terminated(&self) -> usize {
        self.n_terminated
    }

    fn n_clauses(&self) -> usize {
        self.n_clauses
    }

    fn max_var(&self) -> Option<Var> {
        let num = self.internal.num_vars();
        if num > 1 {
            Some(Var::new(num - 2))
        } else {
            None
        }
    }

    fn cpu_solve_time(&self) -> Duration {
        self.cpu_time
    }
}

#[cfg(test)]
mod tests {
    use super::Solver;
    use crate::{
        clause, lit,
        solvers::{LimitSteps, PhaseLit, Solve, SolveIncremental, SolveStats, SolverResult},
        types::TernaryVal,
        var,
    };

    #[test]
    fn sat_and_values() {
        let mut solver = Solver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        solver.add_unit(!lit![0]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![0]).unwrap(), TernaryVal::False);
        assert_eq!(solver.lit_val(lit![1]).unwrap(), TernaryVal::True);
        assert_eq!(solver.var_val(var![5]).unwrap(), TernaryVal::DontCare);
        assert_eq!(solver.max_var(), Some(var![1]));
        assert_eq!(solver.n_sat_solves(), 1);
    }

    #[test]
    fn value_requires_sat() {
        let mut solver = Solver::default();
        solver.add_unit(lit![0]).unwrap();
        assert!(solver.lit_val(lit![0]).is_err());
        solver.add_unit(!lit![0]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
        assert!(solver.lit_val(lit![0]).is_err());
    }

    #[test]
    fn core_of_assumptions() {
        let mut solver = Solver::default();
        solver.add_binary(!lit![0], !lit![1]).unwrap();
        solver.add_unit(lit![2]).unwrap();
        assert_eq!(
            solver.solve_assumps(&[lit![0], lit![1], lit![2]]).unwrap(),
            SolverResult::Unsat
        );
        let mut core = solver.core().unwrap();
        core.sort_unstable();
        assert_eq!(core, vec![!lit![0], !lit![1]]);
        assert_eq!(solver.solve_assumps(&[lit![0]]).unwrap(), SolverResult::Sat);
        assert!(solver.core().is_err());
    }

    #[test]
    fn phases() {
        let mut solver = Solver::default();
        solver.phase_lit(lit![0]).unwrap();
        solver.phase_lit(!lit![1]).unwrap();
        solver.add_clause(clause![lit![0], lit![1], lit![2]]).unwrap();
        assert!(solver.phase_lit(lit![1]).is_err());
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![0]).unwrap(), TernaryVal::True);
    }

    #[test]
    fn zero_steps_interrupts() {
        let mut solver = Solver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        solver.limit_steps(Some(0));
        assert_eq!(solver.solve().unwrap(), SolverResult::Interrupted);
        assert_eq!(solver.n_terminated(), 1);
        solver.limit_steps(None);
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
        assert!(solver.steps_used() > 0);
    }
}
