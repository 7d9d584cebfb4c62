//! Error types.
//!
//! Only conditions that prevent the pipeline from running are errors.
//! Unsatisfiable and unknown checks, and budget truncation, are ordinary
//! outcomes reported through [`crate::solver::SolveReport`].

use thiserror::Error;

/// Main error type of the crate.
#[derive(Debug, Error)]
pub enum SchedError {
    /// Unknown direction, priority discipline or logic name, or an unusable
    /// budget value.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation requested in a solver state that does not support it,
    /// e.g. exporting before the first successful solve.
    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    /// The problem failed validation before compilation.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The engine lacks an optional capability.
    #[error("Unsupported by engine: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, SchedError>;
