//! Scheduling-to-SMT compiler for the U-Engine ecosystem.
//!
//! Compiles a scheduling problem (tasks, resources, temporal constraints,
//! indicators and objectives) into quantifier-free integer formulas, solves
//! them with a pluggable decision procedure and decodes the model into a
//! typed schedule.
//!
//! # Modules
//!
//! - **`models`**: Problem context and solution types: `SchedulingProblem`,
//!   `TaskSpec`, `Worker`, `Constraint`, `ScheduleSolution`
//! - **`formula`**: Linear expressions and boolean formulas over declared
//!   variables
//! - **`engine`**: The `Engine` capability trait, the built-in
//!   `Z3Engine` on the Z3 SMT solver
//! - **`solver`**: Compile / solve / decode pipeline: overlap encodings,
//!   objective regimes, the incremental optimizer and `SchedulingSolver`
//! - **`config`**: `SolverConfig`, loadable from TOML
//! - **`validation`**: Input integrity checks (duplicate names, dangling
//!   references, precedence cycles)
//! - **`error`**: `SchedError` and the `Result` alias
//!
//! # Architecture
//!
//! This crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem. The
//! solver is generic over [`engine::Engine`]; the default engine runs on the
//! Z3 SMT solver through the `z3` crate and borrows a caller-owned context.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling"
//! - Barrett, Fontaine & Tinelli (2017), "The SMT-LIB Standard: Version 2.6"

pub mod config;
pub mod engine;
pub mod error;
pub mod formula;
pub mod models;
pub mod solver;
pub mod validation;

pub use error::{Result, SchedError};
