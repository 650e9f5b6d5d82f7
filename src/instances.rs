//! # Formula Representations
//!
//! Variable management, a plain clause collection ([`Cnf`]) and the formula
//! store ([`Formula`]) that accumulates hard and soft clauses for a solver
//! session.

use crate::types::{Lit, Var};

mod formula;
pub use formula::{Formula, FormulaKind};

mod sat;
pub use sat::Cnf;

pub mod fio;

/// Trait for variable managers keeping track of used variables
pub trait ManageVars {
    /// Uses up the next free variable
    fn new_var(&mut self) -> Var;

    /// Uses up the next free variable and returns its positive literal
    fn new_lit(&mut self) -> Lit {
        self.new_var().pos_lit()
    }

    /// Gets the used variable with the highest index
    fn max_var(&self) -> Option<Var>;

    /// Increases the next free variable index if the provided variable has a
    /// higher index than the next variable in the manager.
    /// Returns true if the next free index has been increased and false otherwise.
    fn increase_next_free(&mut self, v: Var) -> bool;

    /// Marks variables up to the given one as used. Returns true if the next
    /// free index has been increased and false otherwise.
    fn mark_used(&mut self, v: Var) -> bool {
        self.increase_next_free(v + 1)
    }

    /// Gets the number of used variables. Typically this is just the index of
    /// the next free variable.
    fn n_used(&self) -> u32;

    /// Forget variables `>= min_var`
    fn forget_from(&mut self, min_var: Var);
}

/// Simple counting variable manager
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BasicVarManager {
    next_var: Var,
}

impl BasicVarManager {
    /// Creates a new variable manager from a next free variable
    #[must_use]
    pub fn from_next_free(next_var: Var) -> BasicVarManager {
        BasicVarManager { next_var }
    }
}

impl ManageVars for BasicVarManager {
    fn new_var(&mut self) -> Var {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    fn max_var(&self) -> Option<Var> {
        if self.next_var.idx32() == 0 {
            None
        } else {
            Some(self.next_var - 1)
        }
    }

    fn increase_next_free(&mut self, v: Var) -> bool {
        if v > self.next_var {
            self.next_var = v;
            return true;
        };
        false
    }

    fn n_used(&self) -> u32 {
        self.next_var.idx32()
    }

    fn forget_from(&mut self, min_var: Var) {
        self.next_var = std::cmp::min(self.next_var, min_var);
    }
}
