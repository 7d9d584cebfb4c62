//! Solver configuration.
//!
//! [`SolverConfig`] controls the time budget, engine parallelism and
//! seeding, the priority discipline of multi-objective problems, tracing and
//! the theory-fragment hint. It can be built in code or loaded from TOML:
//!
//! ```
//! use u_schedule_smt::config::SolverConfig;
//! use u_schedule_smt::engine::Priority;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     max_time_secs = 2.5
//!     optimize_priority = "box"
//!     max_iterations = 20
//! "#).unwrap();
//!
//! assert_eq!(config.optimize_priority, Priority::Box);
//! assert_eq!(config.max_iterations, Some(20));
//! assert!(!config.parallel);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{Logic, Priority};
use crate::error::{Result, SchedError};

/// Default time budget in seconds.
pub const DEFAULT_MAX_TIME_SECS: f64 = 10.0;

/// Configuration of a [`crate::solver::SchedulingSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Time budget in seconds: per check, and in total for the incremental
    /// optimizer.
    pub max_time_secs: f64,
    /// Let the engine use every available hardware thread.
    pub parallel: bool,
    /// Seed the engine randomly instead of deterministically.
    pub random_values: bool,
    /// Explicit engine seed; overrides `random_values`.
    pub random_seed: Option<u64>,
    /// Priority discipline between several objectives.
    pub optimize_priority: Priority,
    /// Track every assertion for unsatisfiable cores and log diagnostics.
    pub debug: bool,
    /// Theory fragment hint; promoted to QF_LIRA when a cost function exists.
    pub logic: Logic,
    /// Iteration ceiling of the incremental optimizer.
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_time_secs: DEFAULT_MAX_TIME_SECS,
            parallel: false,
            random_values: false,
            random_seed: None,
            optimize_priority: Priority::Lex,
            debug: false,
            logic: Logic::QfIdl,
            max_iterations: None,
        }
    }
}

impl SolverConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a configuration from a TOML string and validates it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the time budget.
    pub fn with_max_time_secs(mut self, secs: f64) -> Self {
        self.max_time_secs = secs;
        self
    }

    /// Enables or disables engine parallelism.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables random seeding.
    pub fn with_random_values(mut self, random: bool) -> Self {
        self.random_values = random;
        self
    }

    /// Sets an explicit engine seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the multi-objective priority discipline.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.optimize_priority = priority;
        self
    }

    /// Enables assertion tracking and diagnostic logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the theory-fragment hint.
    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    /// Sets the incremental optimizer's iteration ceiling.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Time budget as a [`Duration`]; call [`validate`](Self::validate) first.
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_time_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_MAX_TIME_SECS))
    }

    /// Engine seed: explicit seed, else random when requested, else 0.
    pub fn engine_seed(&self) -> u64 {
        match (self.random_seed, self.random_values) {
            (Some(seed), _) => seed,
            (None, true) => rand::random::<u64>().max(1),
            (None, false) => 0,
        }
    }

    /// Worker threads granted to the engine.
    pub fn engine_threads(&self) -> usize {
        if self.parallel {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            1
        }
    }

    /// Rejects unusable budgets.
    pub fn validate(&self) -> Result<()> {
        if !self.max_time_secs.is_finite() || self.max_time_secs <= 0.0 {
            return Err(SchedError::InvalidConfiguration(format!(
                "max_time_secs must be a positive number of seconds, got {}",
                self.max_time_secs
            )));
        }
        if Duration::try_from_secs_f64(self.max_time_secs).is_err() {
            return Err(SchedError::InvalidConfiguration(format!(
                "max_time_secs {} is out of range",
                self.max_time_secs
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(SchedError::InvalidConfiguration(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
