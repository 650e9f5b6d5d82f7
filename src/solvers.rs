//! # Interfaces to SAT Oracles
//!
//! The search engines in [`crate::algs`] only talk to their SAT oracle through
//! the traits in this module. The main element is the [`Solve`] trait that
//! every oracle implements, incremental oracles additionally implement
//! [`SolveIncremental`].
//!
//! ## Available Oracles
//!
//! ### BatSat
//!
//! [BatSat](https://github.com/c-cube/batsat) is an incremental SAT solver
//! implemented in pure Rust, based on Minisat. It is available as
//! [`batsat::Solver`].
//!
//! #### References
//!
//! - Niklas Een and Niklas Sörensson (2003): _An Extensible SAT-solver_, SAT
//!   2003.
//! - Repository: [https://github.com/c-cube/batsat](https://github.com/c-cube/batsat)

use core::time::Duration;
use std::fmt;

use thiserror::Error;

use crate::{
    clause,
    encodings::CollectClauses,
    types::{Assignment, Clause, Lit, TernaryVal, Var},
};

pub mod batsat;

/// Trait for all SAT oracles usable by the search engines
pub trait Solve {
    /// Gets a signature of the solver implementation
    fn signature(&self) -> &'static str;
    /// Solves the internal CNF formula without any assumptions.
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors.
    fn solve(&mut self) -> anyhow::Result<SolverResult>;
    /// Gets an assignment of a literal in the solver.
    ///
    /// # Errors
    ///
    /// - If the solver is not in the satisfied state
    /// - A specific implementation might return other errors
    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal>;
    /// Same as [`Solve::lit_val`], but for variables.
    ///
    /// # Errors
    ///
    /// See [`Solve::lit_val`].
    fn var_val(&self, var: Var) -> anyhow::Result<TernaryVal> {
        self.lit_val(var.pos_lit())
    }
    /// Gets the assignment of all variables up to `high_var` found by the
    /// solver.
    ///
    /// # Errors
    ///
    /// See [`Solve::lit_val`].
    fn solution(&self, high_var: Var) -> anyhow::Result<Assignment> {
        let len = high_var.idx32() + 1;
        let mut assignment = Vec::new();
        assignment.try_reserve(len as usize)?;
        for idx in 0..len {
            assignment.push(self.lit_val(Lit::positive(idx))?);
        }
        Ok(Assignment::from(assignment))
    }
    /// Adds a clause to the solver.
    ///
    /// # Errors
    ///
    /// A specific implementation might fail to add the clause, for example
    /// when running out of memory.
    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()>;
    /// Like [`Solve::add_clause`] but for unit clauses (clauses with one literal).
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`].
    fn add_unit(&mut self, lit: Lit) -> anyhow::Result<()> {
        self.add_clause(clause![lit])
    }
    /// Like [`Solve::add_clause`] but for clauses with two literals.
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`].
    fn add_binary(&mut self, lit1: Lit, lit2: Lit) -> anyhow::Result<()> {
        self.add_clause(clause![lit1, lit2])
    }
}

/// Trait for all SAT oracles that can solve under assumptions
pub trait SolveIncremental: Solve {
    /// Solves the internal CNF formula under assumptions.
    ///
    /// # Errors
    ///
    /// A specific implementation might return errors.
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult>;
    /// Gets a core found by an unsatisfiable query.
    /// A core is a clause entailed by the formula that contains only inverted
    /// literals of the assumptions.
    ///
    /// # Errors
    ///
    /// If the last query was not unsatisfiable.
    fn core(&mut self) -> anyhow::Result<Vec<Lit>>;
}

/// Trait for all oracles that can force a phase for a literal
pub trait PhaseLit {
    /// Forces the default decision phase of a variable to a certain value
    ///
    /// # Errors
    ///
    /// A specific implementation might only support this for some variables.
    fn phase_lit(&mut self, lit: Lit) -> anyhow::Result<()>;
}

/// Trait for all oracles that can limit the number of search steps.
///
/// The limit is shared by all following queries until it is changed, every
/// query uses up part of it. A query that runs out of steps returns
/// [`SolverResult::Interrupted`].
pub trait LimitSteps {
    /// Sets or removes a limit on the number of search steps
    fn limit_steps(&mut self, limit: Option<u64>);
    /// Gets the number of search steps taken since the limit was last set
    fn steps_used(&self) -> u64;
}

/// Solver statistics
#[derive(Clone, PartialEq, Default, Debug)]
pub struct SolverStats {
    /// The number of satisfiable queries executed
    pub n_sat: usize,
    /// The number of unsatisfiable queries executed
    pub n_unsat: usize,
    /// The number of terminated queries executed
    pub n_terminated: usize,
    /// The number of clauses in the solver
    pub n_clauses: usize,
    /// The highest variable in the solver
    pub max_var: Option<Var>,
    /// The average length of the clauses added to the solver
    pub avg_clause_len: f32,
    /// The total CPU time spent solving
    pub cpu_solve_time: Duration,
}

/// Trait for solvers that track certain statistics.
pub trait SolveStats {
    /// Gets the available statistics from the solver
    fn stats(&self) -> SolverStats;
    /// Gets the number of satisfiable queries executed.
    fn n_sat_solves(&self) -> usize {
        self.stats().n_sat
    }
    /// Gets the number of unsatisfiable queries executed.
    fn n_unsat_solves(&self) -> usize {
        self.stats().n_unsat
    }
    /// Gets the number of queries that were prematurely terminated.
    fn n_terminated(&self) -> usize {
        self.stats().n_terminated
    }
    /// Gets the total number of queries executed.
    fn n_solves(&self) -> usize {
        self.n_sat_solves() + self.n_unsat_solves() + self.n_terminated()
    }
    /// Gets the number of clauses in the solver.
    fn n_clauses(&self) -> usize {
        self.stats().n_clauses
    }
    /// Gets the variable with the highest index in the solver, if any.
    fn max_var(&self) -> Option<Var> {
        self.stats().max_var
    }
    /// Gets the total CPU time spent solving.
    fn cpu_solve_time(&self) -> Duration {
        self.stats().cpu_solve_time
    }
}

/// States that the solver can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Input state, while adding clauses.
    Input,
    /// The query was found satisfiable.
    Sat,
    /// The query was found unsatisfiable.
    Unsat,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverState::Input => write!(f, "INPUT"),
            SolverState::Sat => write!(f, "SAT"),
            SolverState::Unsat => write!(f, "UNSAT"),
        }
    }
}

/// Return value for solving queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverResult {
    /// The query was found satisfiable.
    Sat,
    /// The query was found unsatisfiable.
    Unsat,
    /// The query was prematurely interrupted.
    Interrupted,
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverResult::Sat => write!(f, "SAT"),
            SolverResult::Unsat => write!(f, "UNSAT"),
            SolverResult::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Type representing solver errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// An API with a description
    #[error("API error: {0}")]
    Api(&'static str),
    /// The solver was expected to be in the second [`SolverState`], but it is in the first.
    #[error("solver needs to be in state {1} but was in state {0}")]
    State(SolverState, SolverState),
}

impl<S: Solve + SolveStats> CollectClauses for S {
    fn n_clauses(&self) -> usize {
        SolveStats::n_clauses(self)
    }

    fn extend_clauses<T>(&mut self, cl_iter: T) -> Result<(), crate::OutOfMemory>
    where
        T: IntoIterator<Item = Clause>,
    {
        cl_iter.into_iter().try_for_each(|cl| {
            self.add_clause(cl).map_err(|err| {
                err.downcast::<crate::OutOfMemory>()
                    .unwrap_or(crate::OutOfMemory::Limit("SAT oracle rejected a clause"))
            })
        })
    }
}
