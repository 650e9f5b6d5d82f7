//! # smax - A MaxSAT Front-End
//!
//! `smax` accepts a propositional formula given as weighted clauses and
//! at-most-k cardinality constraints, compiles the cardinality constraints to
//! clauses and hands the resulting formula to a core-guided MaxSAT search over
//! an incremental SAT oracle.
//!
//! The entry point for embedding applications is
//! [`session::MaxSatSolver`].
//!
//! ```
//! use smax::session::{MaxSatSolver, ReturnCode};
//!
//! let mut solver = MaxSatSolver::new(3, 0);
//! solver.add_at_most_k(&[1, 2, 3], 1);
//! solver.add_clause(&[1], 2);
//! solver.add_clause(&[2], 1);
//! let outcome = solver.compute(u64::MAX, None, -1);
//! assert_eq!(outcome.code, ReturnCode::Optimal);
//! assert_eq!(outcome.cost, 1);
//! assert!(outcome.model[1] > 0);
//! ```
//!
//! ## Features
//!
//! | Feature name | Description |
//! | --- | --- |
//! | `fxhash` | Use the faster firefox hash function from `rustc-hash`. |
//! | `compression` | Enable reading compressed (W)DIMACS input. |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! Currently, the MSRV is 1.76.0.

use thiserror::Error;

pub mod algs;
pub mod encodings;
pub mod instances;
pub mod session;
pub mod solvers;
pub mod types;

/// Error returned when an operation runs out of memory
///
/// The library only reports this error where memory is reserved fallibly, for
/// example when collecting clauses or when a configured limit is exceeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutOfMemory {
    /// A `try_reserve` call failed
    #[error("try reserve error: {0}")]
    TryReserve(#[from] std::collections::TryReserveError),
    /// A configured resource limit would be exceeded
    #[error("resource limit exceeded: {0}")]
    Limit(&'static str),
}
