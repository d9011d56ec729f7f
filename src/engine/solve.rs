//! Bucket elimination for influence diagrams.
//!
//! The forward pass walks the constrained elimination order. Each chance
//! bucket multiplies its probability factors, sums out the bucket variable
//! to produce a probability message, and divides each derived utility
//! message by that probability message, realizing the expected-utility
//! semantics of the ID valuation algebra. Each decision bucket slices its
//! probability factors (constants as functions of the decision) and
//! maximizes the summed utilities. Messages re-enter downstream buckets
//! incrementally; scalars accumulate at the roots, whose combination yields
//! the maximum expected utility. A backward pass over the final bucket
//! state recovers each decision's policy factor over its induced parents.

use tracing::debug;

use crate::engine::buckets::{BucketState, FactorId};
use crate::engine::config::SolverConfig;
use crate::engine::errors::SolveError;
use crate::engine::order::induced_width;
use crate::engine::solution::{EliminationDiagnostics, Solution};
use crate::factor::{Factor, FactorType};
use crate::model::{InfluenceDiagram, VarKind, VarSet};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Bucket elimination solver over a borrowed influence diagram.
///
/// The solver owns its bucket state exclusively for the duration of
/// [`run`](Self::run); the model is only read. Several solvers may share
/// one model concurrently.
#[derive(Debug, Clone)]
pub struct BucketElimination<'m> {
    model: &'m InfluenceDiagram,
    config: SolverConfig,
}

impl<'m> BucketElimination<'m> {
    /// Creates a solver with the default configuration.
    pub fn new(model: &'m InfluenceDiagram) -> Self {
        Self::with_config(model, SolverConfig::default())
    }

    /// Creates a solver with an explicit configuration.
    pub fn with_config(model: &'m InfluenceDiagram, config: SolverConfig) -> Self {
        Self { model, config }
    }

    /// The solver's configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs the forward elimination pass, combines the roots into the
    /// maximum expected utility, and recovers the decision policies.
    pub fn run(&self) -> Result<Solution, SolveError> {
        if self.model.is_limid() {
            return Err(SolveError::UnsupportedModel(
                "bucket elimination supports standard influence diagrams, not LIMIDs".into(),
            ));
        }

        let order = self.model.order(self.config.order_method)?;
        let width = induced_width(self.model, &order);
        if self.config.debug {
            debug!(?order, induced_width = width, "starting bucket elimination");
        }

        let mut state = BucketState::partition(self.model, &order);
        if self.config.debug {
            for &x in &order {
                debug!(bucket = x, factors = ?state.bucket(x), "initial bucket");
            }
        }

        self.forward(&mut state, &order)?;
        let meu = self.combine_roots(&state)?;
        let policies = self.backward(&state, &order)?;

        let diagnostics = EliminationDiagnostics {
            induced_width: width,
            input_factors: self.model.factors().len(),
            messages: state.message_count(),
            roots: state.roots().len(),
            table_cells: state.table_cells(),
            order,
        };
        Ok(Solution::new(meu, policies, diagnostics))
    }

    fn forward(&self, state: &mut BucketState, order: &[u32]) -> Result<(), SolveError> {
        for (pos, &x) in order.iter().enumerate() {
            if state.bucket(x).is_empty() {
                continue;
            }
            let vx = self.model.vars()[x as usize];
            let eliminator = VarSet::singleton(vx);
            let (phi, psi) = split_by_type(state, state.bucket(x));

            match self.model.kinds()[x as usize] {
                VarKind::Chance => {
                    // Probability message first; the utility messages divide
                    // by it.
                    let mut comb = Factor::scalar(1.0, FactorType::Probability);
                    for &i in &phi {
                        comb = comb.product(state.factor(i))?;
                    }
                    let mut message = comb.sum_out(&eliminator)?;
                    message.set_type(FactorType::Probability);
                    if self.config.debug {
                        debug!(variable = x, scope = ?message.scope(), "chance probability message");
                    }
                    let fid = state.push_message(message, pos, order);

                    for &j in &psi {
                        let mut expected = comb
                            .product(state.factor(j))?
                            .sum_out(&eliminator)?
                            .quotient(state.factor(fid))?;
                        expected.set_type(FactorType::Utility);
                        if self.config.debug {
                            debug!(variable = x, scope = ?expected.scope(), "chance utility message");
                        }
                        state.push_message(expected, pos, order);
                    }
                }
                VarKind::Decision => {
                    // Probability factors are constants as functions of the
                    // decision; slicing at any state drops the dimension.
                    for &i in &phi {
                        let mut sliced = state.factor(i).slice(vx, 0)?;
                        sliced.set_type(FactorType::Probability);
                        if self.config.debug {
                            debug!(variable = x, scope = ?sliced.scope(), "decision probability message");
                        }
                        state.push_message(sliced, pos, order);
                    }

                    let mut comb = Factor::scalar(0.0, FactorType::Utility);
                    for &j in &psi {
                        comb = comb.sum(state.factor(j))?;
                    }
                    let mut message = comb.max_out(&eliminator)?;
                    message.set_type(FactorType::Utility);
                    if self.config.debug {
                        debug!(variable = x, scope = ?message.scope(), "decision utility message");
                    }
                    state.push_message(message, pos, order);
                }
                VarKind::Value => {
                    // Utility only: summed, then summed out, no division.
                    let mut comb = Factor::scalar(0.0, FactorType::Utility);
                    for &j in &psi {
                        comb = comb.sum(state.factor(j))?;
                    }
                    let mut message = comb.sum_out(&eliminator)?;
                    message.set_type(FactorType::Utility);
                    if self.config.debug {
                        debug!(variable = x, scope = ?message.scope(), "value utility message");
                    }
                    state.push_message(message, pos, order);
                }
            }
        }
        Ok(())
    }

    /// Combines the scalar roots: product of probability roots, sum of
    /// utility roots, maximum of their product.
    fn combine_roots(&self, state: &BucketState) -> Result<f64, SolveError> {
        let mut prob = Factor::scalar(1.0, FactorType::Probability);
        let mut util = Factor::scalar(0.0, FactorType::Utility);
        for &id in state.roots() {
            let root = state.factor(id);
            match root.factor_type() {
                FactorType::Probability => prob = prob.product(root)?,
                FactorType::Utility => util = util.sum(root)?,
            }
        }
        let meu = prob.product(&util)?.max_value();
        if self.config.debug {
            debug!(roots = state.roots().len(), meu, "combined root factors");
        }
        Ok(meu)
    }

    /// Recovers each decision's policy: the buckets now hold the original
    /// assignments plus every message routed in during the forward pass,
    /// so re-combining them without eliminating the decision materializes
    /// its expected-utility surface.
    fn backward(
        &self,
        state: &BucketState,
        order: &[u32],
    ) -> Result<FxHashMap<u32, Factor>, SolveError> {
        let mut policies = FxHashMap::default();
        for &x in order.iter().rev() {
            if self.model.kinds()[x as usize] != VarKind::Decision {
                continue;
            }
            let mut prob = Factor::scalar(1.0, FactorType::Probability);
            let mut util = Factor::scalar(0.0, FactorType::Utility);
            for &id in state.bucket(x) {
                let factor = state.factor(id);
                match factor.factor_type() {
                    FactorType::Probability => prob = prob.product(factor)?,
                    FactorType::Utility => util = util.sum(factor)?,
                }
            }
            let mut policy = prob.product(&util)?;
            policy.set_type(FactorType::Utility);
            if self.config.debug {
                debug!(decision = x, scope = ?policy.scope(), "recovered policy");
            }
            policies.insert(x, policy);
        }
        Ok(policies)
    }
}

/// Splits bucket ids into probability (`phi`) and utility (`psi`) factors
/// by their type tags.
fn split_by_type(
    state: &BucketState,
    ids: &[FactorId],
) -> (SmallVec<[FactorId; 8]>, SmallVec<[FactorId; 8]>) {
    let mut phi = SmallVec::new();
    let mut psi = SmallVec::new();
    for &id in ids {
        match state.factor(id).factor_type() {
            FactorType::Probability => phi.push(id),
            FactorType::Utility => psi.push(id),
        }
    }
    (phi, psi)
}
