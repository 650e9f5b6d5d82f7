//! # The Solve Orchestrator
//!
//! Selects a search engine for a formula, runs it and translates its status
//! into a [`ReturnCode`]. Weighted formulas are solved with
//! [`Oll`](crate::algs::oll::Oll). Unweighted formulas are solved with
//! [`PartMsu3`](crate::algs::partition::PartMsu3) if partitioning the soft
//! clauses is worthwhile and with [`Msu3`](crate::algs::msu3::Msu3)
//! otherwise.

use std::fmt;

use anyhow::anyhow;
use log::{debug, info};

use super::{Options, Outcome, ReturnCode};
use crate::{
    algs::{
        msu3::Msu3,
        oll::Oll,
        partition::{self, Algorithm, PartMsu3},
        Engine, EngineStatus,
    },
    instances::Formula,
    solvers::batsat::Solver,
    types::{Lit, Var},
};

/// The search strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Stratified OLL, for weighted formulas
    Oll,
    /// Partition-based MSU3, for unweighted formulas with independent parts
    PartMsu3,
    /// Plain MSU3, for all other unweighted formulas
    Msu3,
}

impl Strategy {
    /// Selects the strategy for a formula
    #[must_use]
    pub fn select(formula: &Formula, partition_max_share: f64) -> Self {
        if formula.is_weighted() {
            return Strategy::Oll;
        }
        match partition::choose_algorithm(formula, partition_max_share) {
            Algorithm::PartMsu3 => Strategy::PartMsu3,
            Algorithm::Msu3 => Strategy::Msu3,
        }
    }

    /// Creates a fresh engine for the strategy
    #[must_use]
    pub fn engine(self) -> Box<dyn Engine> {
        match self {
            Strategy::Oll => Box::new(Oll::<Solver>::new()),
            Strategy::PartMsu3 => Box::new(PartMsu3::<Solver>::new()),
            Strategy::Msu3 => Box::new(Msu3::<Solver>::new()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Oll => write!(f, "OLL"),
            Strategy::PartMsu3 => write!(f, "PartMSU3"),
            Strategy::Msu3 => write!(f, "MSU3"),
        }
    }
}

/// Parameters of a single compute call
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Only solutions with a cost strictly below are accepted
    pub max_cost: u64,
    /// Preferred polarities
    pub start: &'a [Lit],
    /// Budget of oracle search steps, [`None`] for no limit
    pub steps: Option<u64>,
}

/// Solves a formula over `n_inputs` declared variables. The model of the
/// outcome covers exactly the declared variables.
///
/// # Errors
///
/// If the engine fails to load the formula or the search fails.
pub fn solve(
    formula: &Formula,
    n_inputs: u32,
    options: &Options,
    request: &Request<'_>,
) -> anyhow::Result<Outcome> {
    debug!(
        "solving formula with {} vars ({n_inputs} declared), {} hards, {} softs, {} card constraints",
        formula.n_vars(),
        formula.n_hards(),
        formula.n_softs(),
        formula.n_card()
    );
    debug!(
        "max soft weight {}, weight sum {}, max cost {}",
        formula.max_weight(),
        formula.weight_sum(),
        request.max_cost
    );

    let strategy = Strategy::select(formula, options.partition_max_share);
    let mut engine = strategy.engine();
    info!("using {strategy}");

    engine.phase(request.start);
    engine.set_max_cost(request.max_cost);
    match request.steps {
        Some(steps) => {
            debug!("step budget: {steps}");
            engine.set_step_budget(steps);
        }
        None => engine.clear_step_budget(),
    }
    engine.load(formula)?;
    engine.search();
    debug!(
        "{} finished with {:?}, best bound {}, lower bound {}",
        engine.name(),
        engine.status(),
        engine.best_bound(),
        engine.lower_bound()
    );

    let code = match engine.status() {
        EngineStatus::Unsat => return Ok(Outcome::without_model(ReturnCode::Unsatisfiable)),
        EngineStatus::Unknown => return Ok(Outcome::without_model(ReturnCode::Unknown)),
        EngineStatus::Error => return Err(anyhow!("{} search failed", engine.name())),
        EngineStatus::Sat => ReturnCode::Satisfiable,
        EngineStatus::Optimum => ReturnCode::Optimal,
    };
    Ok(Outcome {
        code,
        cost: engine.best_bound(),
        model: extract_model(engine.as_ref(), n_inputs)?,
    })
}

/// Builds the signed model of the declared variables
fn extract_model(engine: &dyn Engine, n_inputs: u32) -> anyhow::Result<Vec<i32>> {
    let mut model = Vec::new();
    model.try_reserve(n_inputs as usize + 1)?;
    model.push(0);
    for idx in 0..n_inputs {
        let var = Var::new(idx);
        let val = var.to_ipasir();
        model.push(if engine.value_of(var) { val } else { -val });
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::{solve, Request, Strategy};
    use crate::{
        clause,
        instances::Formula,
        lit,
        session::{Options, ReturnCode},
    };

    fn request() -> Request<'static> {
        Request {
            max_cost: u64::MAX,
            start: &[],
            steps: None,
        }
    }

    #[test]
    fn strategy_selection() {
        let mut formula = Formula::new(4);
        formula.add_hard_clause(clause![lit![0], lit![1]]).unwrap();
        formula.add_hard_clause(clause![lit![2], lit![3]]).unwrap();
        formula.add_soft_clause(clause![!lit![0]], 1).unwrap();
        formula.add_soft_clause(clause![!lit![1]], 1).unwrap();
        formula.add_soft_clause(clause![!lit![2]], 1).unwrap();
        assert_eq!(Strategy::select(&formula, 0.8), Strategy::PartMsu3);
        assert_eq!(Strategy::select(&formula, 0.5), Strategy::Msu3);
        formula.add_soft_clause(clause![!lit![3]], 2).unwrap();
        assert_eq!(Strategy::select(&formula, 0.8), Strategy::Oll);
    }

    #[test]
    fn model_covers_declared_vars() {
        let mut formula = Formula::new(2);
        formula.add_hard_clause(clause![lit![0], lit![5]]).unwrap();
        formula.add_soft_clause(clause![!lit![5]], 1).unwrap();
        formula.add_soft_clause(clause![!lit![1]], 1).unwrap();
        let outcome = solve(&formula, 2, &Options::default(), &request()).unwrap();
        assert_eq!(outcome.code, ReturnCode::Optimal);
        assert_eq!(outcome.cost, 0);
        assert_eq!(outcome.model, vec![0, 1, -2]);
    }

    #[test]
    fn start_phases_are_used() {
        let mut formula = Formula::new(2);
        formula.add_hard_clause(clause![lit![0], lit![1]]).unwrap();
        let start = [!lit![0], lit![1]];
        let outcome = solve(
            &formula,
            2,
            &Options::default(),
            &Request {
                start: &start,
                ..request()
            },
        )
        .unwrap();
        assert_eq!(outcome.code, ReturnCode::Optimal);
        assert_eq!(outcome.model, vec![0, -1, 2]);
    }

    #[test]
    fn zero_steps() {
        let mut formula = Formula::new(2);
        formula.add_soft_clause(clause![lit![0], lit![1]], 1).unwrap();
        let outcome = solve(
            &formula,
            2,
            &Options::default(),
            &Request {
                steps: Some(0),
                ..request()
            },
        )
        .unwrap();
        assert_eq!(outcome.code, ReturnCode::Unknown);
        assert_eq!(outcome.cost, u64::MAX);
        assert!(outcome.model.is_empty());
    }
}
