//! # Solver Sessions
//!
//! [`MaxSatSolver`] is the object an embedding application talks to. It
//! takes clauses and at-most-k constraints in the signed integer literal
//! convention (`3` is variable 3, `-3` its negation), validates them against
//! the variable bound given at construction and accumulates them in a
//! [`Formula`]. [`MaxSatSolver::compute`] hands the formula to a search
//! engine, see [`compute`].
//!
//! ## Error State
//!
//! Like a C library, the session reports failures through a boolean return
//! value and a last error code, [`MaxSatSolver::errno`]. The codes follow the
//! negated values of `errno.h`:
//!
//! - [`Errno::InvalidInput`] (`-EINVAL`): a literal was 0 or beyond the
//!   variable bound, or a weight was too high. Only the offending call is
//!   rejected.
//! - [`Errno::NotPermitted`] (`-EPERM`): a clause or constraint was added
//!   after [`MaxSatSolver::compute`]. Only the offending call is rejected.
//! - [`Errno::OutOfMemory`] (`-ENOMEM`): memory or a configured [`Limits`]
//!   was exhausted. This error is sticky, the session rejects every following
//!   call.
//!
//! Every add clears a non-sticky error before it starts.

use std::fmt;

use log::{debug, warn};

use crate::{
    encodings::card,
    instances::{BasicVarManager, Cnf, Formula, ManageVars},
    types::{Clause, Lit, Var},
    OutOfMemory,
};

pub mod compute;

/// Version of the session interface
pub const INTERFACE_VERSION: u32 = 1;

/// Status of a [`MaxSatSolver::compute`] call. The numeric values are part
/// of the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnCode {
    /// The search stopped before finding any solution
    Unknown = 0,
    /// A solution was found but not proven optimal
    Satisfiable = 1,
    /// The hard clauses are unsatisfiable, or no solution is below the
    /// maximum cost
    Unsatisfiable = 2,
    /// An optimal solution was found
    Optimal = 3,
    /// The call failed, see [`MaxSatSolver::errno`]
    Error = 4,
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnCode::Unknown => write!(f, "UNKNOWN"),
            ReturnCode::Satisfiable => write!(f, "SATISFIABLE"),
            ReturnCode::Unsatisfiable => write!(f, "UNSATISFIABLE"),
            ReturnCode::Optimal => write!(f, "OPTIMAL"),
            ReturnCode::Error => write!(f, "ERROR"),
        }
    }
}

impl From<ReturnCode> for i32 {
    fn from(value: ReturnCode) -> Self {
        value as i32
    }
}

/// Error codes of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Errno {
    /// No error
    #[default]
    None = 0,
    /// `-EPERM`: the call is not permitted after computing
    NotPermitted = -1,
    /// `-ENOMEM`: memory or a resource limit is exhausted, sticky
    OutOfMemory = -12,
    /// `-EINVAL`: invalid literal or weight, or nothing to compute
    InvalidInput = -22,
}

impl Errno {
    /// Checks whether the error blocks every further call
    #[must_use]
    pub fn is_sticky(self) -> bool {
        self == Errno::OutOfMemory
    }
}

impl From<Errno> for i32 {
    fn from(value: Errno) -> Self {
        value as i32
    }
}

/// Resource limits of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// The highest number of variables, including auxiliary variables
    pub max_var: u32,
    /// The highest number of clauses, including clauses of compiled
    /// constraints
    pub max_clauses: usize,
    /// The highest soft clause weight
    pub max_weight: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_var: 1 << 24,
            max_clauses: 1 << 26,
            max_weight: 1 << 61,
        }
    }
}

/// Options of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Resource limits
    pub limits: Limits,
    /// The largest share of the soft clauses a single partition may hold for
    /// partitioning an unweighted formula to be worthwhile
    pub partition_max_share: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            partition_max_share: 0.8,
        }
    }
}

/// Result of a [`MaxSatSolver::compute`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The status of the call
    pub code: ReturnCode,
    /// The cost of the model, [`u64::MAX`] if there is no model
    pub cost: u64,
    /// The model. Entry `i` is positive if variable `i` is true and negative
    /// otherwise, entry 0 is 0. Empty if there is no model.
    pub model: Vec<i32>,
}

impl Outcome {
    /// An outcome without a model
    #[must_use]
    pub fn without_model(code: ReturnCode) -> Self {
        Self {
            code,
            cost: u64::MAX,
            model: vec![],
        }
    }
}

/// A MaxSAT solver session
///
/// # Example
///
/// ```
/// use smax::session::{Errno, MaxSatSolver, ReturnCode};
///
/// let mut solver = MaxSatSolver::new(2, 0);
/// assert!(!solver.add_clause(&[1, 3], 0));
/// assert_eq!(solver.errno(), i32::from(Errno::InvalidInput));
/// assert!(solver.add_clause(&[1, 2], 0));
/// assert!(solver.add_clause(&[-1], 1));
/// assert!(solver.add_clause(&[-2], 1));
/// let outcome = solver.compute(u64::MAX, None, -1);
/// assert_eq!(outcome.code, ReturnCode::Optimal);
/// assert_eq!(outcome.cost, 1);
/// ```
#[derive(Debug)]
pub struct MaxSatSolver {
    n_vars: u32,
    clause_hint: usize,
    options: Options,
    formula: Option<Formula>,
    errno: Errno,
    computed: bool,
    model: Vec<i32>,
}

impl MaxSatSolver {
    /// Creates a session over variables `1..=n_vars` with default options.
    /// `clause_hint` is an estimate of the number of clauses that is used to
    /// reserve memory.
    ///
    /// If `n_vars` or `clause_hint` exceed the [`Limits`], the session starts
    /// out in the sticky [`Errno::OutOfMemory`] state.
    #[must_use]
    pub fn new(n_vars: u32, clause_hint: usize) -> Self {
        Self::with_options(n_vars, clause_hint, Options::default())
    }

    /// Creates a session with the given options
    #[must_use]
    pub fn with_options(n_vars: u32, clause_hint: usize, options: Options) -> Self {
        let mut errno = Errno::None;
        if n_vars > options.limits.max_var {
            warn!(
                "{n_vars} variables exceed the limit of {}",
                options.limits.max_var
            );
            errno = Errno::OutOfMemory;
        }
        if clause_hint > options.limits.max_clauses {
            warn!(
                "{clause_hint} clauses exceed the limit of {}",
                options.limits.max_clauses
            );
            errno = Errno::OutOfMemory;
        }
        Self {
            n_vars,
            clause_hint,
            options,
            formula: None,
            errno,
            computed: false,
            model: vec![],
        }
    }

    /// Gets the name of the solver backend
    #[must_use]
    pub fn solver_name(&self) -> &'static str {
        concat!("smax ", env!("CARGO_PKG_VERSION"), " (BatSat)")
    }

    /// Gets the version of the session interface
    #[must_use]
    pub fn version(&self) -> u32 {
        INTERFACE_VERSION
    }

    /// Gets the last error as a negative `errno.h` value, or 0
    #[must_use]
    pub fn errno(&self) -> i32 {
        self.errno.into()
    }

    /// Gets the last error
    #[must_use]
    pub fn last_error(&self) -> Errno {
        self.errno
    }

    /// Gets the number of declared variables
    #[must_use]
    pub fn n_vars(&self) -> u32 {
        self.n_vars
    }

    /// Gets the options of the session
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Gets the formula built so far, [`None`] before the first clause
    #[must_use]
    pub fn formula(&self) -> Option<&Formula> {
        self.formula.as_ref()
    }

    /// Adds a clause. Weight 0 makes the clause hard, otherwise the weight is
    /// the cost of violating it. Returns false if the clause is rejected, the
    /// reason is available from [`MaxSatSolver::errno`].
    pub fn add_clause(&mut self, lits: &[i32], weight: u64) -> bool {
        let res = self.try_add_clause(lits, weight);
        self.settle(res)
    }

    /// Adds the hard constraint that at most `k` of `lits` are true. Returns
    /// false if the constraint is rejected, the reason is available from
    /// [`MaxSatSolver::errno`]. Nothing of a rejected constraint is added.
    pub fn add_at_most_k(&mut self, lits: &[i32], k: usize) -> bool {
        let res = self.try_add_at_most_k(lits, k);
        self.settle(res)
    }

    fn settle(&mut self, res: Result<(), Errno>) -> bool {
        match res {
            Ok(()) => true,
            Err(errno) => {
                self.errno = errno;
                false
            }
        }
    }

    /// Checks the error state before an add
    fn begin_add(&mut self) -> Result<(), Errno> {
        if self.errno.is_sticky() {
            return Err(self.errno);
        }
        self.errno = Errno::None;
        if self.computed {
            return Err(Errno::NotPermitted);
        }
        Ok(())
    }

    fn convert(&self, lits: &[i32]) -> Result<Vec<Lit>, Errno> {
        let mut conv = Vec::new();
        conv.try_reserve(lits.len()).map_err(|_| Errno::OutOfMemory)?;
        for &lit in lits {
            if lit == 0 || lit.unsigned_abs() > self.n_vars {
                return Err(Errno::InvalidInput);
            }
            conv.push(Lit::from_ipasir(lit).map_err(|_| Errno::InvalidInput)?);
        }
        Ok(conv)
    }

    fn formula_mut(&mut self) -> Result<&mut Formula, Errno> {
        if self.formula.is_none() {
            let mut formula = Formula::new(self.n_vars);
            formula
                .reserve(self.clause_hint)
                .map_err(|_| Errno::OutOfMemory)?;
            self.formula = Some(formula);
        }
        self.formula.as_mut().ok_or(Errno::OutOfMemory)
    }

    fn check_clause_limit(&self, additional: usize) -> Result<(), Errno> {
        let present = self.formula.as_ref().map_or(0, Formula::n_clauses);
        if present.saturating_add(additional) > self.options.limits.max_clauses {
            debug!(
                "adding {additional} clauses exceeds the limit of {}",
                self.options.limits.max_clauses
            );
            return Err(Errno::OutOfMemory);
        }
        Ok(())
    }

    fn try_add_clause(&mut self, lits: &[i32], weight: u64) -> Result<(), Errno> {
        self.begin_add()?;
        if weight > self.options.limits.max_weight {
            return Err(Errno::InvalidInput);
        }
        let clause = Clause::from(self.convert(lits)?);
        self.check_clause_limit(1)?;
        let formula = self.formula_mut()?;
        let res = if weight == 0 {
            formula.add_hard_clause(clause)
        } else {
            formula.add_soft_clause(clause, weight)
        };
        res.map_err(out_of_memory)
    }

    fn try_add_at_most_k(&mut self, lits: &[i32], k: usize) -> Result<(), Errno> {
        self.begin_add()?;
        if k >= lits.len() {
            return Ok(());
        }
        let lits = self.convert(lits)?;
        let max_var = self.options.limits.max_var;

        let mut var_manager = match &self.formula {
            Some(formula) => formula.var_manager().clone(),
            None => BasicVarManager::from_next_free(Var::new(self.n_vars)),
        };
        let mut staged = Cnf::new();
        card::encode_at_most_k(&lits, k, &mut staged, &mut var_manager).map_err(out_of_memory)?;
        if var_manager.n_used() > max_var {
            debug!(
                "at-most-{k} needs {} variables, the limit is {max_var}",
                var_manager.n_used()
            );
            return Err(Errno::OutOfMemory);
        }
        self.check_clause_limit(staged.len())?;

        let formula = self.formula_mut()?;
        formula.commit_hards(&mut staged).map_err(out_of_memory)?;
        *formula.var_manager_mut() = var_manager;
        formula.note_card();
        Ok(())
    }

    /// Computes a solution of minimum cost
    ///
    /// - `max_cost`: only solutions with a cost strictly below are accepted
    /// - `start`: literals whose polarity the search should prefer, invalid
    ///   literals are ignored
    /// - `steps`: budget of search steps, negative for no limit
    ///
    /// Returns [`ReturnCode::Error`] if no clause was added or the session
    /// is in the sticky error state. After this call, no more clauses can be
    /// added, but the formula can be solved again.
    pub fn compute(&mut self, max_cost: u64, start: Option<&[i32]>, steps: i64) -> Outcome {
        self.model.clear();
        if self.errno.is_sticky() {
            return Outcome::without_model(ReturnCode::Error);
        }
        self.errno = Errno::None;
        let Some(formula) = &self.formula else {
            self.errno = Errno::InvalidInput;
            return Outcome::without_model(ReturnCode::Error);
        };
        self.computed = true;

        let start: Vec<Lit> = start
            .unwrap_or_default()
            .iter()
            .filter(|&&lit| lit != 0 && lit.unsigned_abs() <= self.n_vars)
            .filter_map(|&lit| Lit::from_ipasir(lit).ok())
            .collect();
        let request = compute::Request {
            max_cost,
            start: &start,
            steps: u64::try_from(steps).ok(),
        };
        match compute::solve(formula, self.n_vars, &self.options, &request) {
            Ok(outcome) => {
                self.model.clone_from(&outcome.model);
                outcome
            }
            Err(err) => {
                warn!("compute failed: {err}");
                self.errno = Errno::OutOfMemory;
                Outcome::without_model(ReturnCode::Error)
            }
        }
    }

    /// Gets the value of a variable in the model of the last
    /// [`MaxSatSolver::compute`] call: positive if true, negative if false, 0
    /// if there is no model or `var` is not a declared variable
    #[must_use]
    pub fn value(&self, var: i32) -> i32 {
        usize::try_from(var)
            .ok()
            .filter(|&idx| idx > 0)
            .and_then(|idx| self.model.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

fn out_of_memory(err: OutOfMemory) -> Errno {
    debug!("{err}");
    Errno::OutOfMemory
}
