//! Pryce's Σ-method: canonical offsets from an optimal matching
//!
//! Given a maximum-value transversal of the Σ-matrix, the equation offsets
//! `c` and variable offsets `d` are the pointwise-smallest solution of
//!
//! ```text
//! d[j] - c[i] >= der(i,j)          for every incidence
//! d[j] - c[i] == der(i,rowsol[i])  on the transversal
//! c >= 0
//! ```
//!
//! They are obtained by a monotone fixed-point iteration starting from zero:
//!
//! 1. `d[j] = max(d[j], c[i] + der(i,j))` over all incidences
//! 2. `c[i] = d[rowsol[i]] - der(i,rowsol[i])` for every equation
//!
//! repeated until `c` no longer changes. Each sweep extends the longest
//! path in the equation graph by one edge, so an optimal transversal
//! converges in at most `n + 1` sweeps. [`fixed_point`] allows `2n + 2`
//! sweeps as a safety margin; a matching still moving after that is not
//! optimal and is reported as [`DaeError::InconsistentAssignment`].
//!
//! ## Drivers
//!
//! [`StructuralAnalyzer`] wires the pieces together:
//!
//! | Method | Matching | Notes |
//! |--------|----------|-------|
//! | [`StructuralAnalyzer::analyse`] | full [`LapSolver::solve`] | any [`StructuralProblem`] |
//! | [`StructuralAnalyzer::analyse_changed`] | [`LapSolver::solve_delta`] | warm start from a [`ChangedProblem`] |
//! | [`StructuralAnalyzer::analyse_compressed`] | full solve of the outer problem | components inflated afterwards |

use daestruct_core::{AnalysisResult, DaeError, DaeResult, IncidenceMatrix, Solution};
use tracing::{debug, info};
use web_time::Instant;

use crate::change::ChangedProblem;
use crate::compression::CompressionList;
use crate::config::AnalysisConfig;
use crate::lap::LapSolver;

/// Anything that can hand a Σ-matrix to the analyzer.
pub trait StructuralProblem {
    fn matrix(&self) -> &IncidenceMatrix;

    fn dimension(&self) -> usize {
        self.matrix().dimension()
    }
}

impl StructuralProblem for IncidenceMatrix {
    fn matrix(&self) -> &IncidenceMatrix {
        self
    }
}

/// A DAE described equation by equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputProblem {
    matrix: IncidenceMatrix,
}

impl InputProblem {
    pub fn new(dimension: usize) -> Self {
        Self {
            matrix: IncidenceMatrix::new(dimension),
        }
    }

    /// Declare that `variable` occurs in `equation` differentiated `derivative` times.
    pub fn set(&mut self, variable: usize, equation: usize, derivative: i32) -> DaeResult<()> {
        self.matrix.set_derivative(equation, variable, derivative)
    }

    /// Direct access for bulk construction (component surrogate rows, appends).
    pub fn matrix_mut(&mut self) -> &mut IncidenceMatrix {
        &mut self.matrix
    }

    pub fn into_matrix(self) -> IncidenceMatrix {
        self.matrix
    }
}

impl From<IncidenceMatrix> for InputProblem {
    fn from(matrix: IncidenceMatrix) -> Self {
        Self { matrix }
    }
}

impl StructuralProblem for InputProblem {
    fn matrix(&self) -> &IncidenceMatrix {
        &self.matrix
    }
}

/// Canonical offsets `(c, d)` for the transversal `rowsol`, plus the number
/// of sweeps it took.
///
/// Fails with [`DaeError::InconsistentAssignment`] if `rowsol` is not a
/// transversal of `matrix` or the iteration does not settle (which happens
/// exactly when the transversal is not of maximum value).
pub fn fixed_point(
    matrix: &IncidenceMatrix,
    rowsol: &[usize],
) -> DaeResult<(Vec<i32>, Vec<i32>, usize)> {
    let n = matrix.dimension();
    if rowsol.len() != n {
        return Err(DaeError::DimensionMismatch {
            expected: n,
            got: rowsol.len(),
        });
    }
    let matched = rowsol
        .iter()
        .enumerate()
        .map(|(i, &j)| {
            matrix.get(i, j).ok_or_else(|| {
                DaeError::InconsistentAssignment(format!(
                    "row {i} is matched to column {j} without an incidence"
                ))
            })
        })
        .collect::<DaeResult<Vec<i32>>>()?;

    let csr = matrix.to_csr();
    let mut c = vec![0i32; n];
    let mut d = vec![0i32; n];
    let max_sweeps = 2 * n + 2;

    for sweep in 1..=max_sweeps {
        for (i, row) in csr.outer_iterator().enumerate() {
            for (j, &sigma) in row.iter() {
                d[j] = d[j].max(c[i] - sigma);
            }
        }

        let mut changed = false;
        for (i, (&j, &sigma)) in rowsol.iter().zip(&matched).enumerate() {
            let next = d[j] + sigma;
            if next != c[i] {
                c[i] = next;
                changed = true;
            }
        }
        if !changed {
            return Ok((c, d, sweep));
        }
    }

    Err(DaeError::InconsistentAssignment(format!(
        "offsets did not settle after {max_sweeps} sweeps; the matching is not optimal"
    )))
}

/// Runs the full structural analysis pipeline.
#[derive(Debug, Clone, Default)]
pub struct StructuralAnalyzer {
    config: AnalysisConfig,
}

impl StructuralAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn solver(&self) -> LapSolver {
        LapSolver::with_config(self.config)
    }

    /// Full analysis: optimal matching followed by the fixed point.
    pub fn analyse<P>(&self, problem: &P) -> DaeResult<AnalysisResult>
    where
        P: StructuralProblem + ?Sized,
    {
        let start = Instant::now();
        let matrix = problem.matrix();
        let solution = self.solver().solve(matrix)?;
        self.finish(matrix, solution, start, "analysis")
    }

    /// Re-analysis of an edited problem, warm-started from the prior result.
    pub fn analyse_changed(&self, changed: &ChangedProblem) -> DaeResult<AnalysisResult> {
        let start = Instant::now();
        let matrix = changed.matrix();
        let solution = self.solver().solve_delta(matrix, changed.partial_solution())?;
        self.finish(matrix, solution, start, "incremental analysis")
    }

    /// Analysis of a problem whose component instances are represented by
    /// surrogate rows. The result lives in the inflated index space
    /// described by [`AnalysisResult::inflation`].
    pub fn analyse_compressed<P>(
        &self,
        problem: &P,
        list: &CompressionList,
    ) -> DaeResult<AnalysisResult>
    where
        P: StructuralProblem + ?Sized,
    {
        let start = Instant::now();
        let outer = problem.matrix();
        let outer_solution = self.solver().solve(outer)?;
        debug!(
            outer_dimension = outer.dimension(),
            instances = list.len(),
            outer_cost = outer_solution.cost,
            "outer problem solved"
        );

        let inflated = list.inflate(outer, &outer_solution)?;
        let solution = Solution {
            cost: inflated.cost,
            rowsol: inflated.rowsol,
            colsol: inflated.colsol,
            u: Vec::new(),
            v: Vec::new(),
        };
        let mut result = self.finish(&inflated.matrix, solution, start, "compressed analysis")?;
        result.inflation = Some(inflated.map);
        Ok(result)
    }

    fn finish(
        &self,
        matrix: &IncidenceMatrix,
        solution: Solution,
        start: Instant,
        what: &str,
    ) -> DaeResult<AnalysisResult> {
        let (c, d, sweeps) = fixed_point(matrix, &solution.rowsol)?;
        debug!(sweeps, "fixed point settled");

        let result = AnalysisResult {
            c,
            d,
            row_assignment: solution.rowsol,
            col_assignment: solution.colsol,
            cost: solution.cost,
            inflation: None,
        };
        if self.config.verify_duals {
            result.verify(matrix)?;
        }

        let elapsed_us = self
            .config
            .log_timing
            .then(|| start.elapsed().as_micros() as u64);
        info!(
            dimension = matrix.dimension(),
            cost = result.cost,
            index = result.structural_index(),
            elapsed_us,
            "{what} complete"
        );
        Ok(result)
    }
}
