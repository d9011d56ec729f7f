//! Solver configuration parsed from `Key=Value` option strings.
//!
//! The recognized keys are `Order` (elimination order heuristic, default
//! `MinFill`) and `Debug` (diagnostic logging toggle, default on). Unknown
//! keys are ignored so option strings can be shared between solvers with
//! different vocabularies; malformed values are rejected.

use std::fmt;
use std::str::FromStr;

use crate::engine::errors::SolveError;
use crate::engine::order::OrderMethod;

/// Configuration for a bucket elimination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Heuristic used to build the constrained elimination order.
    pub order_method: OrderMethod,
    /// Emit per-bucket and per-message diagnostics through `tracing`.
    pub debug: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            order_method: OrderMethod::MinFill,
            debug: true,
        }
    }
}

impl SolverConfig {
    /// Parses a comma-separated `Key=Value` option string on top of the
    /// defaults. Empty segments and unknown keys are ignored.
    pub fn parse(options: &str) -> Result<Self, SolveError> {
        let mut config = Self::default();
        for pair in options.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SolveError::BadConfig(format!("expected Key=Value, got '{pair}'"))
            })?;
            match key.trim() {
                "Order" => {
                    config.order_method = value.trim().parse()?;
                }
                "Debug" => {
                    let flag: i64 = value.trim().parse().map_err(|_| {
                        SolveError::BadConfig(format!("Debug expects an integer, got '{value}'"))
                    })?;
                    config.debug = flag != 0;
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Renders the canonical option string; `parse(serialize(c)) == c`.
    pub fn serialize(&self) -> String {
        format!(
            "Order={},Debug={}",
            self.order_method,
            if self.debug { 1 } else { 0 }
        )
    }
}

impl FromStr for OrderMethod {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MinFill" => Ok(OrderMethod::MinFill),
            "MinInduced" => Ok(OrderMethod::MinInduced),
            "WeightedMinFill" => Ok(OrderMethod::WeightedMinFill),
            other => Err(SolveError::BadConfig(format!(
                "unrecognized order method '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OrderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderMethod::MinFill => "MinFill",
            OrderMethod::MinInduced => "MinInduced",
            OrderMethod::WeightedMinFill => "WeightedMinFill",
        };
        f.write_str(name)
    }
}
