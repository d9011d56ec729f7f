//! Factor tables over discrete variable scopes.
//!
//! A [`Factor`] maps joint configurations of its scope to real values using a
//! flat mixed-radix table: the lowest-indexed scope variable is the
//! fastest-moving digit. The algebra covers combination (product, sum,
//! quotient), marginalization (sum, max, min over an eliminator set), and
//! slicing (fixing one variable to a state).
//!
//! Factors carry a [`FactorType`] tag separating probability mass from
//! utility. The tag is data, not behavior: binary operations propagate the
//! left operand's tag and the elimination engine re-tags every message it
//! stores.

use thiserror::Error;

use crate::model::variable::{Var, VarSet};

/// Errors raised by factor operations.
///
/// All of these are fatal to the enclosing solver run; nothing is recovered
/// internally.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgebraError {
    /// Two operands disagree on the cardinality of a shared variable.
    #[error("cardinality mismatch on shared variable {var}")]
    CardinalityMismatch {
        /// Index of the offending variable.
        var: u32,
    },

    /// Division of a nonzero numerator by a zero denominator. The `0/0`
    /// case is defined as 0 and does not raise.
    #[error("division by zero with nonzero numerator at {}", fmt_assignment(.assignment))]
    DivideByZero {
        /// The offending entry as (variable index, state) pairs over the
        /// merged scope; empty for a scalar division.
        assignment: Vec<(u32, usize)>,
    },

    /// A state index outside the variable's domain.
    #[error("state {state} out of range for variable {var} with {card} states")]
    StateOutOfRange {
        /// Index of the variable being addressed.
        var: u32,
        /// The rejected state.
        state: usize,
        /// The variable's cardinality.
        card: u32,
    },

    /// A table whose length does not match the scope's configuration count.
    #[error("table of length {len} does not match scope with {expected} configurations")]
    TableShape {
        /// Length of the supplied table.
        len: usize,
        /// Number of configurations the scope requires.
        expected: u128,
    },

    /// An assignment slice whose length does not match the scope.
    #[error("assignment of length {got} does not match scope of {expected} variables")]
    AssignmentLength {
        /// Length of the supplied assignment.
        got: usize,
        /// Number of scope variables.
        expected: usize,
    },

    /// A factor table too large to allocate.
    #[error("factor table of {cells} cells exceeds available memory")]
    TableAllocation {
        /// Requested number of table cells.
        cells: u128,
    },
}

/// Semantic tag distinguishing probability factors from utility factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FactorType {
    /// Probability mass; combined by product, eliminated by summation.
    Probability,
    /// Utility; combined by sum, eliminated by summation or maximization.
    Utility,
}

/// How two aligned table entries are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombineOp {
    Product,
    Sum,
    Quotient,
}

/// Which accumulator a marginalization uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarginalOp {
    Sum,
    Max,
    Min,
}

/// A real-valued table over the joint configurations of a variable scope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Factor {
    scope: VarSet,
    table: Vec<f64>,
    ty: FactorType,
}

impl Factor {
    /// Creates a scalar factor: empty scope, single entry.
    pub fn scalar(value: f64, ty: FactorType) -> Self {
        Self {
            scope: VarSet::new(),
            table: vec![value],
            ty,
        }
    }

    /// Creates a factor from a scope and a flat table.
    ///
    /// The table is laid out mixed-radix over the canonical (index-sorted)
    /// scope order, lowest-indexed variable fastest. Its length must equal
    /// the product of the scope cardinalities.
    pub fn new(scope: VarSet, table: Vec<f64>, ty: FactorType) -> Result<Self, AlgebraError> {
        let expected = scope.cells();
        if table.len() as u128 != expected {
            return Err(AlgebraError::TableShape {
                len: table.len(),
                expected,
            });
        }
        Ok(Self { scope, table, ty })
    }

    /// Creates a factor with every entry set to `value`.
    pub fn constant(scope: VarSet, value: f64, ty: FactorType) -> Result<Self, AlgebraError> {
        let len = checked_len(scope.cells())?;
        let mut table = alloc_table(scope.cells())?;
        table.resize(len, value);
        Ok(Self { scope, table, ty })
    }

    /// The factor's scope.
    pub fn scope(&self) -> &VarSet {
        &self.scope
    }

    /// Number of scope variables.
    pub fn nvar(&self) -> usize {
        self.scope.len()
    }

    /// `true` if the scope is empty.
    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    /// The semantic tag.
    pub fn factor_type(&self) -> FactorType {
        self.ty
    }

    /// Replaces the semantic tag.
    pub fn set_type(&mut self, ty: FactorType) {
        self.ty = ty;
    }

    /// The flat table, mixed-radix over the canonical scope order.
    pub fn table(&self) -> &[f64] {
        &self.table
    }

    /// Looks up the entry for a full assignment, given in canonical scope
    /// order.
    pub fn get(&self, assignment: &[usize]) -> Result<f64, AlgebraError> {
        if assignment.len() != self.scope.len() {
            return Err(AlgebraError::AssignmentLength {
                got: assignment.len(),
                expected: self.scope.len(),
            });
        }
        let mut offset = 0usize;
        let mut stride = 1usize;
        for (var, &state) in self.scope.iter().zip(assignment) {
            if state >= var.card() as usize {
                return Err(AlgebraError::StateOutOfRange {
                    var: var.index(),
                    state,
                    card: var.card(),
                });
            }
            offset += state * stride;
            stride *= var.card() as usize;
        }
        Ok(self.table[offset])
    }

    /// Entrywise product over aligned tuples; outer product on disjoint
    /// scopes. The result carries `self`'s tag.
    pub fn product(&self, other: &Factor) -> Result<Factor, AlgebraError> {
        self.combine(other, CombineOp::Product)
    }

    /// Entrywise sum over aligned tuples; outer sum on disjoint scopes.
    pub fn sum(&self, other: &Factor) -> Result<Factor, AlgebraError> {
        self.combine(other, CombineOp::Sum)
    }

    /// Entrywise quotient over aligned tuples, with `0/0` defined as 0.
    /// Division of a nonzero numerator by zero is fatal.
    pub fn quotient(&self, other: &Factor) -> Result<Factor, AlgebraError> {
        self.combine(other, CombineOp::Quotient)
    }

    /// Sums out every scope variable in `eliminator`. Variables outside the
    /// scope are ignored; an empty intersection is a no-op clone.
    pub fn sum_out(&self, eliminator: &VarSet) -> Result<Factor, AlgebraError> {
        self.marginalize(eliminator, MarginalOp::Sum)
    }

    /// Maximizes out every scope variable in `eliminator`.
    pub fn max_out(&self, eliminator: &VarSet) -> Result<Factor, AlgebraError> {
        self.marginalize(eliminator, MarginalOp::Max)
    }

    /// Minimizes out every scope variable in `eliminator`.
    pub fn min_out(&self, eliminator: &VarSet) -> Result<Factor, AlgebraError> {
        self.marginalize(eliminator, MarginalOp::Min)
    }

    /// Fixes `var` to `state`, dropping it from the scope. A variable
    /// outside the scope is a no-op clone.
    pub fn slice(&self, var: Var, state: usize) -> Result<Factor, AlgebraError> {
        let Some(pos) = self.scope.position(var.index()) else {
            return Ok(self.clone());
        };
        let kept = self.scope.as_slice()[pos];
        if state >= kept.card() as usize {
            return Err(AlgebraError::StateOutOfRange {
                var: kept.index(),
                state,
                card: kept.card(),
            });
        }
        let out_scope = self.scope.difference(&VarSet::singleton(kept));
        let mut out = alloc_table(out_scope.cells())?;

        // Dropping one digit preserves the relative order of the remaining
        // configurations, so a filtered linear sweep emits the sliced table
        // already in canonical layout.
        let cards: Vec<usize> = self.scope.iter().map(|v| v.card() as usize).collect();
        let mut digits = vec![0usize; cards.len()];
        for &value in &self.table {
            if digits[pos] == state {
                out.push(value);
            }
            advance(&mut digits, &cards);
        }
        Factor::new(out_scope, out, self.ty)
    }

    /// Maximum over all table entries. For a scalar factor this is the
    /// single entry.
    pub fn max_value(&self) -> f64 {
        self.table.iter().fold(f64::NEG_INFINITY, |acc, &v| acc.max(v))
    }

    fn combine(&self, other: &Factor, op: CombineOp) -> Result<Factor, AlgebraError> {
        let scope = merged_scope(&self.scope, &other.scope)?;
        let len = checked_len(scope.cells())?;
        let mut table = alloc_table(scope.cells())?;

        let cards: Vec<usize> = scope.iter().map(|v| v.card() as usize).collect();
        let a_strides = operand_strides(&scope, &self.scope);
        let b_strides = operand_strides(&scope, &other.scope);

        let mut digits = vec![0usize; cards.len()];
        let mut ia = 0usize;
        let mut ib = 0usize;
        for _ in 0..len {
            let a = self.table[ia];
            let b = other.table[ib];
            let value = match op {
                CombineOp::Product => a * b,
                CombineOp::Sum => a + b,
                CombineOp::Quotient => {
                    if b == 0.0 {
                        if a == 0.0 {
                            0.0
                        } else {
                            let assignment = scope
                                .iter()
                                .zip(digits.iter())
                                .map(|(var, &state)| (var.index(), state))
                                .collect();
                            return Err(AlgebraError::DivideByZero { assignment });
                        }
                    } else {
                        a / b
                    }
                }
            };
            table.push(value);

            for pos in 0..digits.len() {
                digits[pos] += 1;
                ia += a_strides[pos];
                ib += b_strides[pos];
                if digits[pos] < cards[pos] {
                    break;
                }
                digits[pos] = 0;
                ia -= a_strides[pos] * cards[pos];
                ib -= b_strides[pos] * cards[pos];
            }
        }
        Factor::new(scope, table, self.ty)
    }

    fn marginalize(&self, eliminator: &VarSet, op: MarginalOp) -> Result<Factor, AlgebraError> {
        let eliminated = self.scope.intersection(eliminator);
        if eliminated.is_empty() {
            return Ok(self.clone());
        }
        let out_scope = self.scope.difference(&eliminated);
        let out_len = checked_len(out_scope.cells())?;
        let init = match op {
            MarginalOp::Sum => 0.0,
            MarginalOp::Max => f64::NEG_INFINITY,
            MarginalOp::Min => f64::INFINITY,
        };
        let mut out = alloc_table(out_scope.cells())?;
        out.resize(out_len, init);

        // Stride of each source position in the output table; eliminated
        // positions contribute nothing.
        let cards: Vec<usize> = self.scope.iter().map(|v| v.card() as usize).collect();
        let mut out_strides = vec![0usize; cards.len()];
        let mut stride = 1usize;
        for (pos, var) in self.scope.iter().enumerate() {
            if !eliminated.contains_index(var.index()) {
                out_strides[pos] = stride;
                stride *= var.card() as usize;
            }
        }

        let mut digits = vec![0usize; cards.len()];
        let mut out_idx = 0usize;
        for &value in &self.table {
            let cell = &mut out[out_idx];
            *cell = match op {
                MarginalOp::Sum => *cell + value,
                MarginalOp::Max => cell.max(value),
                MarginalOp::Min => cell.min(value),
            };

            for pos in 0..digits.len() {
                digits[pos] += 1;
                out_idx += out_strides[pos];
                if digits[pos] < cards[pos] {
                    break;
                }
                digits[pos] = 0;
                out_idx -= out_strides[pos] * cards[pos];
            }
        }
        Factor::new(out_scope, out, self.ty)
    }
}

/// Renders a (variable index, state) assignment for error messages.
fn fmt_assignment(assignment: &[(u32, usize)]) -> String {
    if assignment.is_empty() {
        return "the scalar entry".to_string();
    }
    assignment
        .iter()
        .map(|(var, state)| format!("variable {var}={state}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Merges two scopes, rejecting shared indices with disagreeing
/// cardinalities.
fn merged_scope(a: &VarSet, b: &VarSet) -> Result<VarSet, AlgebraError> {
    for var in a.iter() {
        if let Some(pos) = b.position(var.index()) {
            let other = b.as_slice()[pos];
            if other.card() != var.card() {
                return Err(AlgebraError::CardinalityMismatch { var: var.index() });
            }
        }
    }
    Ok(a.union(b))
}

/// For each position of `union`, the stride of that variable in `sub`'s
/// table, or 0 when `sub` does not range over it.
fn operand_strides(union: &VarSet, sub: &VarSet) -> Vec<usize> {
    let mut sub_strides = Vec::with_capacity(sub.len());
    let mut stride = 1usize;
    for var in sub.iter() {
        sub_strides.push(stride);
        stride *= var.card() as usize;
    }
    union
        .iter()
        .map(|v| sub.position(v.index()).map_or(0, |pos| sub_strides[pos]))
        .collect()
}

/// Advances a mixed-radix odometer by one step.
fn advance(digits: &mut [usize], cards: &[usize]) {
    for pos in 0..digits.len() {
        digits[pos] += 1;
        if digits[pos] < cards[pos] {
            return;
        }
        digits[pos] = 0;
    }
}

fn checked_len(cells: u128) -> Result<usize, AlgebraError> {
    usize::try_from(cells).map_err(|_| AlgebraError::TableAllocation { cells })
}

fn alloc_table(cells: u128) -> Result<Vec<f64>, AlgebraError> {
    let len = checked_len(cells)?;
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| AlgebraError::TableAllocation { cells })?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(index: u32, card: u32) -> Var {
        Var::new(index, card)
    }

    fn factor(vars: &[Var], table: &[f64], ty: FactorType) -> Factor {
        Factor::new(VarSet::from_vars(vars), table.to_vec(), ty).unwrap()
    }

    #[test]
    fn new_rejects_bad_table_length() {
        let err = Factor::new(
            VarSet::from_vars(&[v(0, 2), v(1, 3)]),
            vec![1.0; 5],
            FactorType::Probability,
        )
        .unwrap_err();
        assert!(matches!(err, AlgebraError::TableShape { len: 5, expected: 6 }));
    }

    #[test]
    fn product_aligns_shared_variable() {
        // f(A) = [2, 3], g(A, B) with A fastest: g(a, b) = a + 10 b.
        let f = factor(&[v(0, 2)], &[2.0, 3.0], FactorType::Probability);
        let g = factor(
            &[v(0, 2), v(1, 2)],
            &[0.0, 1.0, 10.0, 11.0],
            FactorType::Probability,
        );
        let p = f.product(&g).unwrap();
        assert_eq!(p.scope().len(), 2);
        assert_eq!(p.table(), &[0.0, 3.0, 20.0, 33.0]);
    }

    #[test]
    fn product_of_disjoint_scopes_is_outer() {
        let f = factor(&[v(0, 2)], &[2.0, 3.0], FactorType::Probability);
        let g = factor(&[v(1, 2)], &[5.0, 7.0], FactorType::Probability);
        let p = f.product(&g).unwrap();
        // Scope {A, B}, A fastest: [2*5, 3*5, 2*7, 3*7].
        assert_eq!(p.table(), &[10.0, 15.0, 14.0, 21.0]);
    }

    #[test]
    fn sum_broadcasts_scalar() {
        let f = factor(&[v(0, 3)], &[1.0, 2.0, 3.0], FactorType::Utility);
        let s = Factor::scalar(10.0, FactorType::Utility);
        assert_eq!(f.sum(&s).unwrap().table(), &[11.0, 12.0, 13.0]);
        assert_eq!(s.sum(&f).unwrap().table(), &[11.0, 12.0, 13.0]);
    }

    #[test]
    fn quotient_zero_over_zero_is_zero() {
        let f = factor(&[v(0, 2)], &[0.0, 4.0], FactorType::Utility);
        let g = factor(&[v(0, 2)], &[0.0, 2.0], FactorType::Probability);
        assert_eq!(f.quotient(&g).unwrap().table(), &[0.0, 2.0]);
    }

    #[test]
    fn quotient_nonzero_over_zero_is_fatal() {
        let f = factor(&[v(0, 2)], &[1.0, 4.0], FactorType::Utility);
        let g = factor(&[v(0, 2)], &[0.0, 2.0], FactorType::Probability);
        match f.quotient(&g).unwrap_err() {
            AlgebraError::DivideByZero { assignment } => {
                assert_eq!(assignment, vec![(0, 0)]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn quotient_error_names_the_failing_states() {
        // f(A, B) is nonzero only at (A=1, B=2), where g is zero.
        let f = factor(
            &[v(0, 2), v(1, 3)],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 5.0],
            FactorType::Utility,
        );
        let g = factor(
            &[v(0, 2), v(1, 3)],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            FactorType::Probability,
        );
        match f.quotient(&g).unwrap_err() {
            AlgebraError::DivideByZero { assignment } => {
                assert_eq!(assignment, vec![(0, 1), (1, 2)]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn scalar_quotient_error_has_empty_assignment() {
        let f = Factor::scalar(1.0, FactorType::Utility);
        let g = Factor::scalar(0.0, FactorType::Probability);
        match f.quotient(&g).unwrap_err() {
            AlgebraError::DivideByZero { assignment } => assert!(assignment.is_empty()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn cardinality_mismatch_is_fatal() {
        let f = factor(&[v(0, 2)], &[1.0, 2.0], FactorType::Probability);
        let g = factor(&[v(0, 3)], &[1.0, 2.0, 3.0], FactorType::Probability);
        let err = f.product(&g).unwrap_err();
        assert!(matches!(err, AlgebraError::CardinalityMismatch { var: 0 }));
    }

    #[test]
    fn sum_out_collapses_variable() {
        // f(A, B), A fastest: rows over B.
        let f = factor(
            &[v(0, 2), v(1, 3)],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            FactorType::Probability,
        );
        let m = f.sum_out(&VarSet::singleton(v(0, 2))).unwrap();
        assert_eq!(m.scope().as_slice(), &[v(1, 3)]);
        assert_eq!(m.table(), &[3.0, 7.0, 11.0]);

        let to_scalar = f
            .sum_out(&VarSet::from_vars(&[v(0, 2), v(1, 3)]))
            .unwrap();
        assert!(to_scalar.is_scalar());
        assert_eq!(to_scalar.table(), &[21.0]);
    }

    #[test]
    fn max_out_and_min_out() {
        let f = factor(
            &[v(0, 2), v(1, 2)],
            &[1.0, 5.0, 4.0, 2.0],
            FactorType::Utility,
        );
        let mx = f.max_out(&VarSet::singleton(v(0, 2))).unwrap();
        assert_eq!(mx.table(), &[5.0, 4.0]);
        let mn = f.min_out(&VarSet::singleton(v(1, 2))).unwrap();
        assert_eq!(mn.table(), &[1.0, 2.0]);
    }

    #[test]
    fn marginalizing_foreign_variable_is_noop() {
        let f = factor(&[v(0, 2)], &[1.0, 2.0], FactorType::Utility);
        let m = f.max_out(&VarSet::singleton(v(7, 4))).unwrap();
        assert_eq!(m, f);
    }

    #[test]
    fn slice_fixes_state() {
        let f = factor(
            &[v(0, 2), v(1, 3)],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            FactorType::Probability,
        );
        let s0 = f.slice(v(0, 2), 0).unwrap();
        assert_eq!(s0.scope().as_slice(), &[v(1, 3)]);
        assert_eq!(s0.table(), &[1.0, 3.0, 5.0]);
        let s1 = f.slice(v(1, 3), 2).unwrap();
        assert_eq!(s1.table(), &[5.0, 6.0]);
    }

    #[test]
    fn slice_out_of_range_is_fatal() {
        let f = factor(&[v(0, 2)], &[1.0, 2.0], FactorType::Probability);
        let err = f.slice(v(0, 2), 2).unwrap_err();
        assert!(matches!(
            err,
            AlgebraError::StateOutOfRange { var: 0, state: 2, card: 2 }
        ));
    }

    #[test]
    fn slice_foreign_variable_is_noop() {
        let f = factor(&[v(0, 2)], &[1.0, 2.0], FactorType::Probability);
        assert_eq!(f.slice(v(3, 2), 1).unwrap(), f);
    }

    #[test]
    fn get_addresses_mixed_radix() {
        let f = factor(
            &[v(0, 2), v(1, 3)],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            FactorType::Probability,
        );
        assert_eq!(f.get(&[1, 2]).unwrap(), 6.0);
        assert_eq!(f.get(&[0, 1]).unwrap(), 3.0);
        assert!(matches!(
            f.get(&[0]).unwrap_err(),
            AlgebraError::AssignmentLength { got: 1, expected: 2 }
        ));
        assert!(matches!(
            f.get(&[0, 3]).unwrap_err(),
            AlgebraError::StateOutOfRange { var: 1, .. }
        ));
    }

    #[test]
    fn scalar_round_trip() {
        let s = Factor::scalar(2.5, FactorType::Utility);
        assert!(s.is_scalar());
        assert_eq!(s.max_value(), 2.5);
        let p = s.product(&Factor::scalar(4.0, FactorType::Probability)).unwrap();
        assert_eq!(p.table(), &[10.0]);
    }

    #[test]
    fn tag_follows_left_operand() {
        let f = Factor::scalar(1.0, FactorType::Utility);
        let g = Factor::scalar(2.0, FactorType::Probability);
        assert_eq!(f.product(&g).unwrap().factor_type(), FactorType::Utility);
        assert_eq!(g.product(&f).unwrap().factor_type(), FactorType::Probability);
    }

    #[test]
    fn constant_fills_table() {
        let f = Factor::constant(
            VarSet::from_vars(&[v(0, 2), v(1, 2)]),
            0.25,
            FactorType::Probability,
        )
        .unwrap();
        assert_eq!(f.table(), &[0.25; 4]);
    }
}
