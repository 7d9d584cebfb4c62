//! Indicators and objectives.
//!
//! An indicator is an integer variable defined by a linear expression over
//! the problem's variables (makespan-like sums, costs, flowtimes). An
//! objective asks the solver to minimize or maximize one variable.

use serde::{Deserialize, Serialize};

use crate::engine::Direction;
use crate::formula::{LinExpr, VarId};

/// Named measure of a schedule, `var == expr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Unique indicator name.
    pub name: String,
    /// Indicator variable.
    pub var: VarId,
    /// Defining expression.
    pub expr: LinExpr,
}

/// Optimization target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Display name.
    pub name: String,
    /// Minimize or maximize.
    pub direction: Direction,
    /// Optimized variable.
    pub target: VarId,
}

impl Objective {
    /// Creates an objective.
    pub fn new(name: impl Into<String>, direction: Direction, target: VarId) -> Self {
        Self {
            name: name.into(),
            direction,
            target,
        }
    }
}
