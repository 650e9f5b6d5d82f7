//! # "Atomic" Encodings
//!
//! Single clauses expressing simple implications.

use crate::{
    clause,
    types::{Clause, Lit},
};

/// Implication of form `a -> b`
#[must_use]
pub fn lit_impl_lit(a: Lit, b: Lit) -> Clause {
    clause![!a, b]
}

/// Implication of form `(a1 & a2 & ... & an) -> b`
#[must_use]
pub fn cube_impl_lit(a: &[Lit], b: Lit) -> Clause {
    let mut cl: Clause = a.iter().map(|ai| !*ai).collect();
    cl.add(b);
    cl
}

/// Negation of a cube: `!(a1 & a2 & ... & an)`
#[must_use]
pub fn not_cube(a: &[Lit]) -> Clause {
    a.iter().map(|ai| !*ai).collect()
}

#[cfg(test)]
mod tests {
    use crate::{clause, lit};

    #[test]
    fn implications() {
        assert_eq!(super::lit_impl_lit(lit![0], lit![1]), clause![!lit![0], lit![1]]);
        assert_eq!(
            super::cube_impl_lit(&[lit![0], !lit![2]], lit![1]),
            clause![!lit![0], lit![2], lit![1]]
        );
        assert_eq!(super::not_cube(&[lit![3], lit![4]]), clause![!lit![3], !lit![4]]);
    }
}
