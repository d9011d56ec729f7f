//! The influence diagram input container.
//!
//! An [`InfluenceDiagram`] registers variables with kinds and cardinalities,
//! collects tagged probability and utility factors, and optionally carries a
//! temporal partial order over its chance and decision variables. The solver
//! borrows the diagram read-only; several solver instances may share one
//! diagram concurrently.

use crate::engine::errors::SolveError;
use crate::engine::order::{self, OrderMethod};
use crate::factor::{Factor, FactorType};
use crate::model::variable::{Var, VarKind, VarSet};

/// An influence diagram: variables, tagged factors, and the temporal order
/// of its decisions.
#[derive(Debug, Clone, Default)]
pub struct InfluenceDiagram {
    vars: Vec<Var>,
    kinds: Vec<VarKind>,
    factors: Vec<Factor>,
    partial_order: Vec<u32>,
    limid: bool,
}

impl InfluenceDiagram {
    /// Creates an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable of the given kind, returning its handle.
    pub fn add_variable(&mut self, kind: VarKind, card: u32) -> Result<Var, SolveError> {
        if card == 0 {
            return Err(SolveError::InvalidModel(format!(
                "variable {} must have at least one state",
                self.vars.len()
            )));
        }
        let var = Var::new(self.vars.len() as u32, card);
        self.vars.push(var);
        self.kinds.push(kind);
        Ok(var)
    }

    /// Registers a chance variable.
    pub fn add_chance(&mut self, card: u32) -> Result<Var, SolveError> {
        self.add_variable(VarKind::Chance, card)
    }

    /// Registers a decision variable.
    pub fn add_decision(&mut self, card: u32) -> Result<Var, SolveError> {
        self.add_variable(VarKind::Decision, card)
    }

    /// Registers a value variable.
    pub fn add_value(&mut self, card: u32) -> Result<Var, SolveError> {
        self.add_variable(VarKind::Value, card)
    }

    /// Adds a tagged factor, validating its scope against the registry.
    pub fn add_factor(&mut self, factor: Factor) -> Result<(), SolveError> {
        for var in factor.scope().iter() {
            let registered = self.var(var.index()).ok_or_else(|| {
                SolveError::InvalidModel(format!(
                    "factor scope references unregistered variable {}",
                    var.index()
                ))
            })?;
            if registered.card() != var.card() {
                return Err(SolveError::InvalidModel(format!(
                    "factor scope disagrees on cardinality of variable {}: {} vs {}",
                    var.index(),
                    var.card(),
                    registered.card()
                )));
            }
        }
        self.factors.push(factor);
        Ok(())
    }

    /// Adds a probability factor over `scope` with the given table.
    ///
    /// The table is mixed-radix over the canonical (index-sorted) scope,
    /// lowest-indexed variable fastest.
    pub fn add_probability(&mut self, scope: &[Var], table: Vec<f64>) -> Result<(), SolveError> {
        let factor = Factor::new(VarSet::from_vars(scope), table, FactorType::Probability)?;
        self.add_factor(factor)
    }

    /// Adds a utility factor over `scope` with the given table.
    pub fn add_utility(&mut self, scope: &[Var], table: Vec<f64>) -> Result<(), SolveError> {
        let factor = Factor::new(VarSet::from_vars(scope), table, FactorType::Utility)?;
        self.add_factor(factor)
    }

    /// Sets the temporal partial order: the observation sequence of chance
    /// and decision variables, earliest first. Consistency is checked when
    /// an elimination order is requested.
    pub fn set_partial_order(&mut self, order: Vec<u32>) {
        self.partial_order = order;
    }

    /// Marks the diagram as a LIMID. The bucket elimination solver rejects
    /// LIMIDs.
    pub fn set_limid(&mut self, limid: bool) {
        self.limid = limid;
    }

    /// Number of registered variables.
    pub fn nvar(&self) -> usize {
        self.vars.len()
    }

    /// The variable with this index, if registered.
    pub fn var(&self, index: u32) -> Option<Var> {
        self.vars.get(index as usize).copied()
    }

    /// The kind of the variable with this index, if registered.
    pub fn kind(&self, index: u32) -> Option<VarKind> {
        self.kinds.get(index as usize).copied()
    }

    /// All registered variables, in index order.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// All variable kinds, in index order.
    pub fn kinds(&self) -> &[VarKind] {
        &self.kinds
    }

    /// The input factors in insertion order.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// The temporal partial order; empty if none was supplied.
    pub fn partial_order(&self) -> &[u32] {
        &self.partial_order
    }

    /// `true` if the diagram is a LIMID.
    pub fn is_limid(&self) -> bool {
        self.limid
    }

    /// Indices of the decision variables, ascending.
    pub fn decisions(&self) -> impl Iterator<Item = u32> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == VarKind::Decision)
            .map(|(i, _)| i as u32)
    }

    /// Computes an elimination order with the given heuristic, constrained
    /// by the temporal partial order.
    pub fn order(&self, method: OrderMethod) -> Result<Vec<u32>, SolveError> {
        order::elimination_order(self, method)
    }

    /// Induced width of the interaction graph along `order`.
    pub fn induced_width(&self, order: &[u32]) -> usize {
        order::induced_width(self, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_variables_in_index_order() {
        let mut id = InfluenceDiagram::new();
        let c = id.add_chance(2).unwrap();
        let d = id.add_decision(3).unwrap();
        assert_eq!(c.index(), 0);
        assert_eq!(d.index(), 1);
        assert_eq!(id.kind(0), Some(VarKind::Chance));
        assert_eq!(id.kind(1), Some(VarKind::Decision));
        assert_eq!(id.decisions().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn rejects_zero_cardinality() {
        let mut id = InfluenceDiagram::new();
        assert!(matches!(
            id.add_chance(0),
            Err(SolveError::InvalidModel(_))
        ));
    }

    #[test]
    fn rejects_unregistered_scope_variable() {
        let mut id = InfluenceDiagram::new();
        let _ = id.add_chance(2).unwrap();
        let foreign = Var::new(5, 2);
        let err = id.add_probability(&[foreign], vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidModel(_)));
    }

    #[test]
    fn rejects_cardinality_conflict_with_registry() {
        let mut id = InfluenceDiagram::new();
        let _ = id.add_chance(2).unwrap();
        let wrong = Var::new(0, 3);
        let err = id
            .add_probability(&[wrong], vec![0.2, 0.3, 0.5])
            .unwrap_err();
        assert!(matches!(err, SolveError::InvalidModel(_)));
    }

    #[test]
    fn stores_factors_with_tags() {
        let mut id = InfluenceDiagram::new();
        let c = id.add_chance(2).unwrap();
        id.add_probability(&[c], vec![0.3, 0.7]).unwrap();
        id.add_utility(&[c], vec![10.0, -5.0]).unwrap();
        assert_eq!(id.factors().len(), 2);
        assert_eq!(id.factors()[0].factor_type(), FactorType::Probability);
        assert_eq!(id.factors()[1].factor_type(), FactorType::Utility);
    }
}
