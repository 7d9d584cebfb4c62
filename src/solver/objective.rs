//! Objective strategy.
//!
//! Classifies a problem by its number of objectives and picks the solving
//! regime:
//!
//! | Objectives | Regime | Engine mode |
//! |------------|--------|-------------|
//! | 0 | [`Regime::Satisfy`] | incremental, restricted to the logic hint |
//! | 1 | [`Regime::Incremental`] | incremental, driven by the optimizer loop |
//! | ≥ 2 | [`Regime::Native`] | native optimization with a priority discipline |

use serde::{Deserialize, Serialize};

use crate::engine::{EngineMode, Logic, Priority};
use crate::models::{Objective, SchedulingProblem};

/// Solving regime of a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Plain satisfiability.
    Satisfy,
    /// Monotone tightening of a single objective.
    Incremental { objective: Objective },
    /// Engine-side optimization of several objectives, in declaration order.
    Native {
        objectives: Vec<Objective>,
        priority: Priority,
    },
}

impl Regime {
    /// Selects the regime for `problem`.
    pub fn select(problem: &SchedulingProblem, priority: Priority) -> Self {
        match problem.objectives() {
            [] => Regime::Satisfy,
            [objective] => Regime::Incremental {
                objective: objective.clone(),
            },
            objectives => Regime::Native {
                objectives: objectives.to_vec(),
                priority,
            },
        }
    }

    /// Engine mode implementing the regime.
    pub fn engine_mode(&self, logic: Logic) -> EngineMode {
        match self {
            Regime::Satisfy | Regime::Incremental { .. } => EngineMode::Incremental {
                logic: Some(logic),
            },
            Regime::Native { priority, .. } => EngineMode::Optimize {
                priority: *priority,
            },
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Regime::Satisfy => "satisfy",
            Regime::Incremental { .. } => "incremental",
            Regime::Native { .. } => "native",
        }
    }
}
