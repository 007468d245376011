//! # daestruct-core: Structural Analysis Data Model
//!
//! Provides the data structures shared by the structural analysis of
//! differential-algebraic equation systems (DAEs).
//!
//! ## Design Philosophy
//!
//! A DAE of `n` equations in `n` unknowns is reduced to its **Σ-matrix**:
//! - **Rows**: equations
//! - **Columns**: unknowns
//! - **Entries**: highest derivative order of the unknown in the equation,
//!   stored negated as an assignment cost
//!
//! The algorithm crate (`daestruct-algo`) turns such a matrix into Pryce's
//! canonical offsets `c` and `d`, which tell an index-reduction driver how
//! often each equation must be differentiated.
//!
//! ## Quick Start
//!
//! ```rust
//! use daestruct_core::IncidenceMatrix;
//!
//! // Simple pendulum: x, y, λ
//! let mut sigma = IncidenceMatrix::new(3);
//! sigma.set_derivative(0, 0, 0).unwrap(); // x² + y² = L²
//! sigma.set_derivative(0, 1, 0).unwrap();
//! sigma.set_derivative(1, 0, 2).unwrap(); // x'' = λx
//! sigma.set_derivative(1, 2, 0).unwrap();
//! sigma.set_derivative(2, 1, 2).unwrap(); // y'' = λy - g
//! sigma.set_derivative(2, 2, 0).unwrap();
//!
//! assert_eq!(sigma.nnz(), 6);
//! assert_eq!(sigma.get(1, 0), Some(-2));
//! ```
//!
//! ## Modules
//!
//! - [`error`]: unified [`DaeError`] type
//! - [`matrix`]: [`IncidenceMatrix`] and [`Incidence`] triples
//! - [`solution`]: matchings, partial solutions, [`AnalysisResult`]

pub mod error;
pub mod matrix;
pub mod solution;

pub use error::{check_index, derivative_cost, DaeError, DaeResult, IndexKind};
pub use matrix::{Incidence, IncidenceMatrix};
pub use solution::{AnalysisResult, Assignment, InflationMap, PartialSolution, Solution};
