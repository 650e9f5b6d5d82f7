use smax::{
    encodings::card::{self, Totalizer},
    instances::{BasicVarManager, Cnf, ManageVars},
    lit,
    solvers::{batsat::Solver, Solve, SolveIncremental, SolverResult},
    types::Lit,
    var,
};

/// Input literals with every third literal negated
fn inputs(n: u32) -> Vec<Lit> {
    (0..n)
        .map(|idx| if idx % 3 == 2 { !lit![idx] } else { lit![idx] })
        .collect()
}

/// Checks for every assignment of the inputs whether the encoding admits it
fn test_all_assignments(solver: &mut Solver, lits: &[Lit], k: usize) {
    for mask in 0u32..(1 << lits.len()) {
        let assumps: Vec<Lit> = lits
            .iter()
            .enumerate()
            .map(|(idx, &l)| if mask & (1 << idx) != 0 { l } else { !l })
            .collect();
        let expected = if mask.count_ones() as usize <= k {
            SolverResult::Sat
        } else {
            SolverResult::Unsat
        };
        assert_eq!(
            solver.solve_assumps(&assumps).unwrap(),
            expected,
            "n={}, k={k}, mask={mask:#b}",
            lits.len()
        );
    }
}

#[test]
fn at_most_k_brute_force() {
    for n in 1..=8 {
        let lits = inputs(n);
        for k in 0..=n as usize {
            let mut var_manager = BasicVarManager::from_next_free(var![n]);
            let mut solver = Solver::default();
            card::encode_at_most_k(&lits, k, &mut solver, &mut var_manager).unwrap();
            test_all_assignments(&mut solver, &lits, k);
        }
    }
}

#[test]
fn aux_var_growth() {
    for n in 2..=16u32 {
        let lits = inputs(n);
        for k in 2..n as usize {
            let mut var_manager = BasicVarManager::from_next_free(var![n]);
            let mut cnf = Cnf::new();
            card::encode_at_most_k(&lits, k, &mut cnf, &mut var_manager).unwrap();
            let n_aux = (var_manager.n_used() - n) as usize;
            assert!(n_aux <= (n as usize - 2) * k, "n={n}, k={k}: {n_aux} aux vars");
        }
        for k in [0, 1, n as usize] {
            let mut var_manager = BasicVarManager::from_next_free(var![n]);
            let mut cnf = Cnf::new();
            card::encode_at_most_k(&lits, k, &mut cnf, &mut var_manager).unwrap();
            assert_eq!(var_manager.n_used(), n);
        }
    }
}

#[test]
fn encodings_compose() {
    // at most 2 of the positive and at most 2 of the negative literals forces
    // exactly 2 of 4 true
    let lits = inputs(4);
    let neg: Vec<Lit> = lits.iter().map(|&l| !l).collect();
    let mut var_manager = BasicVarManager::from_next_free(var![4]);
    let mut solver = Solver::default();
    card::encode_at_most_k(&lits, 2, &mut solver, &mut var_manager).unwrap();
    card::encode_at_most_k(&neg, 2, &mut solver, &mut var_manager).unwrap();
    for mask in 0u32..16 {
        let assumps: Vec<Lit> = lits
            .iter()
            .enumerate()
            .map(|(idx, &l)| if mask & (1 << idx) != 0 { l } else { !l })
            .collect();
        let expected = if mask.count_ones() == 2 {
            SolverResult::Sat
        } else {
            SolverResult::Unsat
        };
        assert_eq!(solver.solve_assumps(&assumps).unwrap(), expected);
    }
}

#[test]
fn totalizer_bounds() {
    let lits = inputs(6);
    let mut var_manager = BasicVarManager::from_next_free(var![6]);
    let mut solver = Solver::default();
    let mut tot = Totalizer::from(lits.clone());
    tot.encode_ub(3, &mut solver, &mut var_manager).unwrap();
    for ub in 0..=3 {
        let enforce = tot.enforce_ub(ub).unwrap();
        let mut assumps = enforce.clone();
        assumps.extend_from_slice(&lits[..ub]);
        assert_eq!(solver.solve_assumps(&assumps).unwrap(), SolverResult::Sat);
        let mut assumps = enforce;
        assumps.extend_from_slice(&lits[..=ub]);
        assert_eq!(solver.solve_assumps(&assumps).unwrap(), SolverResult::Unsat);
    }
    assert!(tot.enforce_ub(6).unwrap().is_empty());
    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
}
