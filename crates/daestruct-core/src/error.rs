//! Unified error types for structural analysis
//!
//! This module provides a common error type [`DaeError`] that every operation
//! of the matrix, solver, change and compression layers reports. All of these
//! failures are deterministic properties of the input model: there is nothing
//! to retry, the caller has to fix the model (or treat singularity as a
//! legitimate modeling diagnostic).
//!
//! # Example
//!
//! ```ignore
//! use daestruct_core::{DaeError, DaeResult};
//!
//! fn offsets(problem: &InputProblem) -> DaeResult<Vec<i32>> {
//!     let result = StructuralAnalyzer::new().analyse(problem)?;
//!     Ok(result.c)
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which index space an out-of-range index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Equation (matrix row)
    Equation,
    /// Variable / unknown (matrix column)
    Variable,
    /// Equation added by a structural change
    NewEquation,
    /// Unknown added by a structural change
    NewVariable,
    /// Private equation of a compressible component
    ComponentEquation,
    /// Private variable of a compressible component
    PrivateVariable,
    /// Public variable of a compressible component
    PublicVariable,
    /// Component instance in a compression list
    Instance,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Equation => "equation",
            IndexKind::Variable => "variable",
            IndexKind::NewEquation => "new equation",
            IndexKind::NewVariable => "new variable",
            IndexKind::ComponentEquation => "component equation",
            IndexKind::PrivateVariable => "private variable",
            IndexKind::PublicVariable => "public variable",
            IndexKind::Instance => "instance",
        };
        f.write_str(name)
    }
}

/// Unified error type for all structural analysis operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaeError {
    /// An index lies outside its declared bounds.
    #[error("Invalid {kind} index {index} (bound {bound})")]
    InvalidIndex {
        kind: IndexKind,
        index: usize,
        bound: usize,
    },

    /// No perfect matching exists: the system is structurally over- or
    /// under-determined.
    #[error(
        "Structurally singular system: structural rank {structural_rank} < dimension {dimension} \
         (unmatched equations: {unmatched_equations:?})"
    )]
    StructuralSingularity {
        dimension: usize,
        structural_rank: usize,
        unmatched_equations: Vec<usize>,
    },

    /// A structural change is inconsistent with the problem it is applied to.
    #[error("Invalid structural change: {0}")]
    InvalidDiff(String),

    /// Derivative orders are non-negative.
    #[error("Invalid derivative order {derivative} at equation {equation}, variable {variable}")]
    InvalidDerivative {
        equation: usize,
        variable: usize,
        derivative: i32,
    },

    /// Two collections that must share a dimension do not.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A (partial) assignment handed to the incremental solver is not a
    /// matching on the given matrix.
    #[error("Inconsistent assignment: {0}")]
    InconsistentAssignment(String),

    /// A compression list does not fit the outer problem it is used with.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Computed offsets violate `c[i] - d[j] <= σ(i,j)` or complementary slackness.
    #[error("Offsets violate dual feasibility at equation {equation}, variable {variable}")]
    DualInfeasible { equation: usize, variable: usize },
}

impl DaeError {
    /// Shorthand for an [`DaeError::InvalidIndex`] error.
    pub fn invalid_index(kind: IndexKind, index: usize, bound: usize) -> Self {
        DaeError::InvalidIndex { kind, index, bound }
    }

    /// True for errors that describe the model (as opposed to API misuse).
    pub fn is_structural(&self) -> bool {
        matches!(self, DaeError::StructuralSingularity { .. })
    }
}

/// Convenience type alias for Results using DaeError.
pub type DaeResult<T> = Result<T, DaeError>;

/// Cost `σ = -derivative` of an incidence, rejecting negative orders.
#[inline]
pub fn derivative_cost(equation: usize, variable: usize, derivative: i32) -> DaeResult<i32> {
    if derivative < 0 {
        return Err(DaeError::InvalidDerivative {
            equation,
            variable,
            derivative,
        });
    }
    Ok(-derivative)
}

/// Checks `index < bound`, reporting an [`DaeError::InvalidIndex`] otherwise.
#[inline]
pub fn check_index(kind: IndexKind, index: usize, bound: usize) -> DaeResult<()> {
    if index < bound {
        Ok(())
    } else {
        Err(DaeError::invalid_index(kind, index, bound))
    }
}
