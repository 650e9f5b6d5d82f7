use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smax::{
    algs::{msu3::Msu3, oll::Oll, partition::PartMsu3, Engine, EngineStatus},
    instances::Formula,
    lit,
    solvers::batsat::Solver,
    types::{Assignment, Clause, Lit},
    var,
};

const N_VARS: u32 = 7;

fn random_clause(rng: &mut ChaCha8Rng, max_len: usize) -> Clause {
    let len = rng.random_range(1..=max_len);
    (0..len)
        .map(|_| {
            let lit = lit![rng.random_range(0..N_VARS)];
            if rng.random_bool(0.5) {
                !lit
            } else {
                lit
            }
        })
        .collect()
}

fn random_formula(seed: u64, weighted: bool) -> Formula {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut formula = Formula::new(N_VARS);
    for _ in 0..6 {
        formula.add_hard_clause(random_clause(&mut rng, 3)).unwrap();
    }
    for _ in 0..10 {
        let weight = if weighted { rng.random_range(1..=9) } else { 1 };
        formula
            .add_soft_clause(random_clause(&mut rng, 2), weight)
            .unwrap();
    }
    formula
}

fn assignment(mask: u32) -> Assignment {
    (0..N_VARS)
        .map(|idx| {
            if mask & (1 << idx) != 0 {
                lit![idx]
            } else {
                !lit![idx]
            }
        })
        .collect()
}

/// The optimum by enumeration, [`None`] if the hard clauses are unsatisfiable
fn brute_force(formula: &Formula) -> Option<u64> {
    (0u32..(1 << N_VARS))
        .map(assignment)
        .filter(|assign| formula.hards_sat(assign))
        .map(|assign| formula.cost(&assign))
        .min()
}

fn check_engine(mut engine: Box<dyn Engine>, formula: &Formula, seed: u64) {
    let expected = brute_force(formula);
    engine.load(formula).unwrap();
    engine.search();
    match expected {
        None => assert_eq!(engine.status(), EngineStatus::Unsat, "{} seed {seed}", engine.name()),
        Some(cost) => {
            assert_eq!(engine.status(), EngineStatus::Optimum, "{} seed {seed}", engine.name());
            assert_eq!(engine.best_bound(), cost, "{} seed {seed}", engine.name());
            assert!(engine.lower_bound() <= cost);
            let model: Assignment = (0..N_VARS)
                .map(|idx| {
                    if engine.value_of(var![idx]) {
                        lit![idx]
                    } else {
                        !lit![idx]
                    }
                })
                .collect();
            assert!(formula.hards_sat(&model));
            assert_eq!(formula.cost(&model), cost);
        }
    }
}

#[test]
fn unweighted_engines_agree() {
    for seed in 0..40 {
        let formula = random_formula(seed, false);
        assert!(!formula.is_weighted());
        check_engine(Box::new(Msu3::<Solver>::new()), &formula, seed);
        check_engine(Box::new(PartMsu3::<Solver>::new()), &formula, seed);
        check_engine(Box::new(Oll::<Solver>::new()), &formula, seed);
    }
}

#[test]
fn weighted_oll() {
    for seed in 0..40 {
        let formula = random_formula(seed, true);
        check_engine(Box::new(Oll::<Solver>::new()), &formula, seed);
    }
}

#[test]
fn independent_parts() {
    // three groups over disjoint variables, each forcing one violated soft
    let mut formula = Formula::new(6);
    for base in [0, 2, 4] {
        let (a, b) = (lit![base], lit![base + 1]);
        formula.add_hard_clause([a, b].into_iter().collect()).unwrap();
        formula.add_soft_clause([!a].into_iter().collect(), 1).unwrap();
        formula.add_soft_clause([!b].into_iter().collect(), 1).unwrap();
    }
    check_engine(Box::new(PartMsu3::<Solver>::new()), &formula, 0);
    check_engine(Box::new(Msu3::<Solver>::new()), &formula, 0);
}

#[test]
fn phases_are_respected() {
    let mut formula = Formula::new(3);
    let clause: Clause = [lit![0], lit![1], lit![2]].into_iter().collect();
    formula.add_hard_clause(clause).unwrap();
    let phases: Vec<Lit> = vec![!lit![0], !lit![1], lit![2]];
    for mut engine in [
        Box::new(Msu3::<Solver>::new()) as Box<dyn Engine>,
        Box::new(PartMsu3::<Solver>::new()),
        Box::new(Oll::<Solver>::new()),
    ] {
        engine.phase(&phases);
        engine.load(&formula).unwrap();
        engine.search();
        assert_eq!(engine.status(), EngineStatus::Optimum);
        assert!(!engine.value_of(var![0]));
        assert!(!engine.value_of(var![1]));
        assert!(engine.value_of(var![2]));
    }
}
