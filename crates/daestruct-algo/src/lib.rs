//! # daestruct-algo: Structural Analysis Algorithms for DAEs
//!
//! This crate turns a Σ-matrix ([`daestruct_core::IncidenceMatrix`]) into
//! Pryce's canonical offsets, re-analyses edited problems incrementally and
//! solves models built from many copies of the same component.
//!
//! ## Pipeline
//!
//! | Stage | Module | Entry point |
//! |-------|--------|-------------|
//! | Maximum-value transversal | [`lap`] | [`LapSolver::solve`] |
//! | Canonical offsets | [`pryce`] | [`fixed_point`] |
//! | Incremental edits | [`change`] | [`ChangedProblem::new`], [`LapSolver::solve_delta`] |
//! | Repeated components | [`compression`] | [`ComponentBuilder::build`], [`CompressionList::inflate`] |
//!
//! [`StructuralAnalyzer`] drives all of them:
//!
//! ```rust
//! use daestruct_algo::{InputProblem, StructuralAnalyzer};
//!
//! // Simple pendulum: variables x, y, λ
//! let mut problem = InputProblem::new(3);
//! problem.set(0, 0, 0).unwrap(); // x² + y² = L²
//! problem.set(1, 0, 0).unwrap();
//! problem.set(0, 1, 2).unwrap(); // x'' = λx
//! problem.set(2, 1, 0).unwrap();
//! problem.set(1, 2, 2).unwrap(); // y'' = λy - g
//! problem.set(2, 2, 0).unwrap();
//!
//! let result = StructuralAnalyzer::new().analyse(&problem).unwrap();
//! assert_eq!(result.c, vec![2, 0, 0]);
//! assert_eq!(result.d, vec![2, 2, 0]);
//! ```
//!
//! ## Logging
//!
//! Solver phases log at `debug`, one summary line per analysis at `info`,
//! structural singularity at `warn` (all through `tracing`).

pub mod change;
pub mod compression;
pub mod config;
pub mod lap;
pub mod pryce;

pub use change::{ChangedProblem, NewEquation, NewUnknown, OffsetMap, StructChange};
pub use compression::{Component, ComponentBuilder, CompressionList, Inflated, InstanceId};
pub use config::AnalysisConfig;
pub use lap::diagnostics::structural_rank;
pub use lap::LapSolver;
pub use pryce::{fixed_point, InputProblem, StructuralAnalyzer, StructuralProblem};

pub use daestruct_core::{
    AnalysisResult, Assignment, DaeError, DaeResult, Incidence, IncidenceMatrix, InflationMap,
    PartialSolution, Solution,
};
