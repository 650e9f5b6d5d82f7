//! # The Formula Store
//!
//! Accumulates hard and soft clauses over the lifetime of a solver session.
//! The formula only ever grows: clauses are appended and never changed or
//! removed.

use crate::{
    encodings::CollectClauses,
    types::{Assignment, Clause, Var},
};

use super::{BasicVarManager, Cnf, ManageVars};

/// Classification of a formula
///
/// A formula starts out [`FormulaKind::Unweighted`] and becomes
/// [`FormulaKind::Weighted`] the first time a soft clause with a weight other
/// than 1 is added. It never changes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormulaKind {
    /// All soft clauses have weight 1
    #[default]
    Unweighted,
    /// At least one soft clause has a weight other than 1
    Weighted,
}

/// Hard and soft clauses of a MaxSAT formula
#[derive(Debug, Clone, Default)]
pub struct Formula {
    hards: Cnf,
    softs: Vec<(Clause, u64)>,
    var_manager: BasicVarManager,
    kind: FormulaKind,
    max_weight: u64,
    weight_sum: u64,
    n_card: usize,
}

impl Formula {
    /// Creates an empty formula over `n_vars` declared variables. Auxiliary
    /// variables are allocated after the declared ones.
    #[must_use]
    pub fn new(n_vars: u32) -> Self {
        Formula {
            var_manager: BasicVarManager::from_next_free(Var::new(n_vars)),
            ..Formula::default()
        }
    }

    /// Reserves memory for at least `additional` more hard clauses
    ///
    /// # Errors
    ///
    /// If the memory cannot be reserved.
    pub fn reserve(&mut self, additional: usize) -> Result<(), crate::OutOfMemory> {
        self.hards.try_reserve(additional)?;
        Ok(())
    }

    /// Adds a hard clause
    ///
    /// # Errors
    ///
    /// If memory for the clause cannot be reserved. The formula is unchanged in
    /// that case.
    pub fn add_hard_clause(&mut self, clause: Clause) -> Result<(), crate::OutOfMemory> {
        self.hards.try_reserve(1)?;
        self.mark_vars(&clause);
        self.hards.add_clause(clause);
        Ok(())
    }

    /// Adds a soft clause with a positive weight. A weight other than 1 makes
    /// the formula [`FormulaKind::Weighted`].
    ///
    /// # Errors
    ///
    /// If memory for the clause cannot be reserved. The formula is unchanged in
    /// that case.
    pub fn add_soft_clause(&mut self, clause: Clause, weight: u64) -> Result<(), crate::OutOfMemory> {
        debug_assert!(weight > 0, "weight 0 marks a hard clause");
        self.softs.try_reserve(1)?;
        self.mark_vars(&clause);
        self.softs.push((clause, weight));
        self.max_weight = std::cmp::max(self.max_weight, weight);
        self.weight_sum = self.weight_sum.saturating_add(weight);
        if weight != 1 {
            self.kind = FormulaKind::Weighted;
        }
        Ok(())
    }

    /// Moves a staged encoding into the hard clauses. Either all clauses are
    /// committed or, if memory cannot be reserved, none.
    ///
    /// # Errors
    ///
    /// If memory for the clauses cannot be reserved.
    pub fn commit_hards(&mut self, staged: &mut Cnf) -> Result<(), crate::OutOfMemory> {
        self.hards.try_reserve(staged.len())?;
        if let Some(max_var) = staged.max_var() {
            self.var_manager.mark_used(max_var);
        }
        self.hards.append(staged);
        Ok(())
    }

    /// Records that a cardinality constraint has been compiled into the hard
    /// clauses
    pub fn note_card(&mut self) {
        self.n_card += 1;
    }

    fn mark_vars(&mut self, clause: &Clause) {
        if let Some(max_var) = clause.iter().map(|l| l.var()).max() {
            self.var_manager.mark_used(max_var);
        }
    }

    /// Gets the variable manager of the formula
    #[must_use]
    pub fn var_manager(&self) -> &BasicVarManager {
        &self.var_manager
    }

    /// Gets the variable manager of the formula, for allocating auxiliary
    /// variables
    pub fn var_manager_mut(&mut self) -> &mut BasicVarManager {
        &mut self.var_manager
    }

    /// Gets the number of variables in the formula, including auxiliary
    /// variables
    #[must_use]
    pub fn n_vars(&self) -> u32 {
        self.var_manager.n_used()
    }

    /// Gets the classification of the formula
    #[must_use]
    pub fn kind(&self) -> FormulaKind {
        self.kind
    }

    /// Checks whether the formula is weighted
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        self.kind == FormulaKind::Weighted
    }

    /// Gets the hard clauses
    #[must_use]
    pub fn hards(&self) -> &Cnf {
        &self.hards
    }

    /// Gets the soft clauses with their weights
    #[must_use]
    pub fn softs(&self) -> &[(Clause, u64)] {
        &self.softs
    }

    /// Gets the number of hard clauses
    #[must_use]
    pub fn n_hards(&self) -> usize {
        self.hards.len()
    }

    /// Gets the number of soft clauses
    #[must_use]
    pub fn n_softs(&self) -> usize {
        self.softs.len()
    }

    /// Gets the total number of clauses
    #[must_use]
    pub fn n_clauses(&self) -> usize {
        self.hards.n_clauses() + self.softs.len()
    }

    /// Gets the number of compiled cardinality constraints
    #[must_use]
    pub fn n_card(&self) -> usize {
        self.n_card
    }

    /// Gets the highest soft clause weight seen so far
    #[must_use]
    pub fn max_weight(&self) -> u64 {
        self.max_weight
    }

    /// Gets the sum of all soft clause weights, saturating at `u64::MAX`
    #[must_use]
    pub fn weight_sum(&self) -> u64 {
        self.weight_sum
    }

    /// Computes the total weight of the soft clauses an assignment does not
    /// satisfy
    #[must_use]
    pub fn cost(&self, assignment: &Assignment) -> u64 {
        self.softs
            .iter()
            .filter(|(cl, _)| !cl.is_sat(assignment))
            .fold(0u64, |sum, (_, w)| sum.saturating_add(*w))
    }

    /// Checks whether an assignment satisfies all hard clauses
    #[must_use]
    pub fn hards_sat(&self, assignment: &Assignment) -> bool {
        self.hards.iter().all(|cl| cl.is_sat(assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::{Formula, FormulaKind};
    use crate::{
        clause,
        instances::{Cnf, ManageVars},
        lit,
        types::Assignment,
    };

    #[test]
    fn classification_is_sticky() {
        let mut formula = Formula::new(3);
        formula.add_hard_clause(clause![lit![0], lit![1]]).unwrap();
        formula.add_soft_clause(clause![lit![2]], 1).unwrap();
        assert_eq!(formula.kind(), FormulaKind::Unweighted);
        formula.add_soft_clause(clause![!lit![2]], 5).unwrap();
        assert_eq!(formula.kind(), FormulaKind::Weighted);
        formula.add_soft_clause(clause![lit![1]], 1).unwrap();
        assert!(formula.is_weighted());
        assert_eq!(formula.max_weight(), 5);
        assert_eq!(formula.weight_sum(), 7);
        assert_eq!(formula.n_clauses(), 4);
    }

    #[test]
    fn aux_vars_follow_declared() {
        let mut formula = Formula::new(4);
        assert_eq!(formula.n_vars(), 4);
        let aux = formula.var_manager_mut().new_var();
        assert_eq!(aux.idx32(), 4);
        assert_eq!(formula.n_vars(), 5);
    }

    #[test]
    fn commit_staged() {
        let mut formula = Formula::new(2);
        let mut staged: Cnf = [clause![lit![0], lit![6]], clause![!lit![1]]]
            .into_iter()
            .collect();
        formula.commit_hards(&mut staged).unwrap();
        assert!(staged.is_empty());
        assert_eq!(formula.n_hards(), 2);
        assert_eq!(formula.n_vars(), 7);
    }

    #[test]
    fn cost_of_assignment() {
        let mut formula = Formula::new(2);
        formula.add_soft_clause(clause![lit![0]], 3).unwrap();
        formula.add_soft_clause(clause![lit![1]], 4).unwrap();
        formula.add_soft_clause(clause![!lit![0], lit![1]], 2).unwrap();
        formula.add_hard_clause(clause![lit![0], lit![1]]).unwrap();
        let assign: Assignment = [lit![0], !lit![1]].into_iter().collect();
        assert_eq!(formula.cost(&assign), 6);
        assert!(formula.hards_sat(&assign));
    }
}
