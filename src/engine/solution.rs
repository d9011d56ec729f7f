//! Results of a bucket elimination run.

use rustc_hash::FxHashMap;

use crate::engine::errors::SolveError;
use crate::factor::Factor;

/// Runtime diagnostics for a completed run. Informational only; the exact
/// values carry no stability guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct EliminationDiagnostics {
    /// The elimination order the run used.
    pub order: Vec<u32>,
    /// Induced width of the interaction graph along that order.
    pub induced_width: usize,
    /// Number of input factors copied into the pool.
    pub input_factors: usize,
    /// Number of messages the forward pass appended.
    pub messages: usize,
    /// Number of scalar factors collected at the roots.
    pub roots: usize,
    /// Total table cells held by the pool when the run finished.
    pub table_cells: usize,
}

/// The outcome of a run: the maximum expected utility and the optimal
/// policy factor for every decision variable.
#[derive(Debug, Clone)]
pub struct Solution {
    meu: f64,
    policies: FxHashMap<u32, Factor>,
    diagnostics: EliminationDiagnostics,
}

impl Solution {
    pub(crate) fn new(
        meu: f64,
        policies: FxHashMap<u32, Factor>,
        diagnostics: EliminationDiagnostics,
    ) -> Self {
        Self {
            meu,
            policies,
            diagnostics,
        }
    }

    /// The maximum expected utility.
    pub fn meu(&self) -> f64 {
        self.meu
    }

    /// The policy factor for a decision variable: expected utility over the
    /// decision and its induced parents. The optimal action for a parent
    /// configuration is the argmax over the decision's states.
    pub fn policy(&self, var: u32) -> Result<&Factor, SolveError> {
        self.policies
            .get(&var)
            .ok_or(SolveError::NotADecision { var })
    }

    /// All policy factors, keyed by decision variable index. Empty for a
    /// model without decisions.
    pub fn policies(&self) -> &FxHashMap<u32, Factor> {
        &self.policies
    }

    /// Diagnostics recorded during the run.
    pub fn diagnostics(&self) -> &EliminationDiagnostics {
        &self.diagnostics
    }
}
