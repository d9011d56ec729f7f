//! # Diadem
//!
//! Diadem computes the Maximum Expected Utility (MEU) of an influence
//! diagram by bucket elimination and recovers an optimal decision policy.
//!
//! ## Architecture
//!
//! The crate is organized into three modules:
//!
//! - **model**: variables, variable sets, and the influence diagram container
//! - **factor**: multidimensional factor tables and their algebra
//! - **engine**: the bucket elimination solver, ordering heuristics,
//!   configuration, and results
//!
//! ## Usage
//!
//! ```rust
//! use diadem::InfluenceDiagram;
//!
//! let mut id = InfluenceDiagram::new();
//! let weather = id.add_chance(2)?;
//! id.add_probability(&[weather], vec![0.3, 0.7])?;
//! id.add_utility(&[weather], vec![10.0, -5.0])?;
//!
//! let solution = diadem::solve(&id)?;
//! assert!((solution.meu() - (-0.5)).abs() < 1e-9);
//! # Ok::<(), diadem::SolveError>(())
//! ```

#![forbid(unsafe_code)]

pub mod engine;
pub mod factor;
pub mod model;

// Re-export commonly used types
pub use engine::config::SolverConfig;
pub use engine::errors::SolveError;
pub use engine::order::OrderMethod;
pub use engine::solution::{EliminationDiagnostics, Solution};
pub use engine::solve::BucketElimination;
pub use factor::{AlgebraError, Factor, FactorType};
pub use model::{InfluenceDiagram, Var, VarKind, VarSet};

/// Solves an influence diagram with the default configuration.
pub fn solve(model: &InfluenceDiagram) -> Result<Solution, SolveError> {
    BucketElimination::new(model).run()
}

/// Solves an influence diagram with an explicit configuration.
pub fn solve_with_config(
    model: &InfluenceDiagram,
    config: SolverConfig,
) -> Result<Solution, SolveError> {
    BucketElimination::with_config(model, config).run()
}
