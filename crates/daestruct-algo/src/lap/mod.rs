//! Sparse linear assignment (Jonker–Volgenant)
//!
//! Computes a minimum-cost perfect matching of a square [`IncidenceMatrix`]
//! together with dual potentials `u`, `v`:
//!
//! ```text
//! u[i] + v[j] <= σ(i,j)          for every entry
//! u[i] + v[j] == σ(i,rowsol[i])  on the matching
//! ```
//!
//! Because entries are negated derivative orders, the minimum-cost matching
//! is the maximum-value transversal of Pryce's method.
//!
//! ## Phases
//!
//! | Phase | Work | Notes |
//! |-------|------|-------|
//! | Column reduction | O(n) | cheapest row per column comes from the matrix cache |
//! | Reduction transfer | O(nnz) | rows matched once shift slack to their column |
//! | Augmenting row reduction | O(nnz) per sweep | [`AnalysisConfig::row_reduction_sweeps`] sweeps |
//! | Augmentation | O(nnz log n) per free row | Dijkstra on a 4-ary heap |
//!
//! ## Incremental solving
//!
//! [`LapSolver::solve_delta`] starts from a [`PartialSolution`] whose assigned
//! part is already optimal. Only unassigned rows are augmented, so a small
//! structural change costs a handful of shortest-path searches instead of a
//! full solve.
//!
//! ## Example
//!
//! ```ignore
//! use daestruct_algo::LapSolver;
//!
//! let solution = LapSolver::new().solve(&sigma)?;
//! let mut partial = PartialSolution::from(&solution);
//! partial.unassign_row(0)?;
//! let again = LapSolver::new().solve_delta(&sigma, &partial)?;
//! assert_eq!(again.cost, solution.cost);
//! ```

mod augment;
pub mod diagnostics;
mod heap;

use daestruct_core::{DaeError, DaeResult, IncidenceMatrix, PartialSolution, Solution};
use tracing::debug;
use web_time::Instant;

use crate::config::AnalysisConfig;
use augment::{Augment, Augmenter};

/// Jonker–Volgenant solver for sparse square assignment problems.
#[derive(Debug, Clone, Default)]
pub struct LapSolver {
    config: AnalysisConfig,
}

/// Mutable matching state threaded through the phases.
struct LapState {
    v: Vec<i32>,
    rowsol: Vec<Option<usize>>,
    colsol: Vec<Option<usize>>,
}

fn entry(matrix: &IncidenceMatrix, i: usize, j: usize) -> DaeResult<i32> {
    matrix.get(i, j).ok_or_else(|| {
        DaeError::InconsistentAssignment(format!(
            "row {i} is matched to column {j} without an incidence"
        ))
    })
}

impl LapSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Solve the assignment problem from scratch.
    ///
    /// Fails with [`DaeError::StructuralSingularity`] when no perfect matching
    /// exists.
    pub fn solve(&self, matrix: &IncidenceMatrix) -> DaeResult<Solution> {
        let start = Instant::now();
        let n = matrix.dimension();
        if matrix.has_empty_line() {
            return Err(diagnostics::singularity(matrix));
        }

        let mut state = LapState {
            v: vec![0; n],
            rowsol: vec![None; n],
            colsol: vec![None; n],
        };

        let matches = column_reduction(matrix, &mut state)?;
        let mut free = reduction_transfer(matrix, &mut state, &matches);
        for _ in 0..self.config.row_reduction_sweeps {
            free = augmenting_row_reduction(matrix, &mut state, &free);
        }
        let after_reduction = free.len();

        let mut augmenter = Augmenter::new(n);
        for &row in &free {
            if augmenter.augment(matrix, &mut state.v, row, &mut state.rowsol, &mut state.colsol)?
                == Augment::Exhausted
            {
                return Err(diagnostics::singularity(matrix));
            }
        }

        let solution = self.finish(matrix, state)?;
        if self.config.log_timing {
            debug!(
                dimension = n,
                nnz = matrix.nnz(),
                augmented = after_reduction,
                cost = solution.cost,
                elapsed_us = start.elapsed().as_micros() as u64,
                "assignment solved"
            );
        }
        Ok(solution)
    }

    /// Complete a partial matching whose assigned part is optimal.
    ///
    /// Columns without a valid prior row get the potential
    /// `v[j] = min_i (σ(i,j) - u[i])`; afterwards every unassigned row is
    /// augmented. The result is optimal whenever `partial.u`, `partial.v`
    /// satisfy the dual constraints on the assigned part.
    pub fn solve_delta(
        &self,
        matrix: &IncidenceMatrix,
        partial: &PartialSolution,
    ) -> DaeResult<Solution> {
        let start = Instant::now();
        let n = matrix.dimension();
        partial.validate(matrix)?;

        let mut state = LapState {
            v: partial.v.clone(),
            rowsol: partial.row_assignment.iter().map(|a| a.index()).collect(),
            colsol: partial.col_assignment.iter().map(|a| a.index()).collect(),
        };

        let mut seeded: Vec<Option<i32>> = vec![None; n];
        for i in 0..n {
            for (j, cost) in matrix.row(i) {
                if state.colsol[j].is_none() {
                    let candidate = cost - partial.u[i];
                    if seeded[j].map_or(true, |best| candidate < best) {
                        seeded[j] = Some(candidate);
                    }
                }
            }
        }
        for j in 0..n {
            if state.colsol[j].is_none() {
                match seeded[j] {
                    Some(value) => state.v[j] = value,
                    None => return Err(diagnostics::singularity(matrix)),
                }
            }
        }

        let free = partial.free_rows();
        let mut augmenter = Augmenter::new(n);
        for &row in &free {
            if augmenter.augment(matrix, &mut state.v, row, &mut state.rowsol, &mut state.colsol)?
                == Augment::Exhausted
            {
                return Err(diagnostics::singularity(matrix));
            }
        }

        let solution = self.finish(matrix, state)?;
        if self.config.log_timing {
            debug!(
                dimension = n,
                augmented = free.len(),
                cost = solution.cost,
                elapsed_us = start.elapsed().as_micros() as u64,
                "incremental assignment solved"
            );
        }
        Ok(solution)
    }

    fn finish(&self, matrix: &IncidenceMatrix, state: LapState) -> DaeResult<Solution> {
        let n = matrix.dimension();
        let mut rowsol = Vec::with_capacity(n);
        let mut colsol = Vec::with_capacity(n);
        for i in 0..n {
            rowsol.push(state.rowsol[i].ok_or_else(|| diagnostics::singularity(matrix))?);
            colsol.push(state.colsol[i].ok_or_else(|| diagnostics::singularity(matrix))?);
        }

        let v = state.v;
        let mut u = vec![0; n];
        let mut cost = 0;
        for (i, &j) in rowsol.iter().enumerate() {
            let sigma = entry(matrix, i, j)?;
            u[i] = sigma - v[j];
            cost += sigma;
        }

        if self.config.verify_duals {
            for (i, j, sigma) in matrix.iter() {
                if u[i] + v[j] > sigma {
                    return Err(DaeError::DualInfeasible {
                        equation: i,
                        variable: j,
                    });
                }
            }
        }

        Ok(Solution {
            cost,
            rowsol,
            colsol,
            u,
            v,
        })
    }
}

/// Assign every column to its cheapest row, scanning columns from the last.
///
/// A row that is cheapest for several columns keeps the first one it got;
/// the other columns stay free. Returns how many columns chose each row.
fn column_reduction(matrix: &IncidenceMatrix, state: &mut LapState) -> DaeResult<Vec<usize>> {
    let n = matrix.dimension();
    let mut matches = vec![0usize; n];
    for j in (0..n).rev() {
        let Some(imin) = matrix.cheapest_row(j) else {
            return Err(diagnostics::singularity(matrix));
        };
        state.v[j] = entry(matrix, imin, j)?;
        matches[imin] += 1;
        if matches[imin] == 1 {
            state.rowsol[imin] = Some(j);
            state.colsol[j] = Some(imin);
        } else {
            state.colsol[j] = None;
        }
    }
    Ok(matches)
}

/// Lower `v` of columns held by rows matched exactly once, and collect the
/// rows no column chose.
fn reduction_transfer(
    matrix: &IncidenceMatrix,
    state: &mut LapState,
    matches: &[usize],
) -> Vec<usize> {
    let mut free = Vec::new();
    for (i, &count) in matches.iter().enumerate() {
        match count {
            0 => free.push(i),
            1 => {
                let Some(j1) = state.rowsol[i] else { continue };
                let slack = matrix
                    .row(i)
                    .filter(|&(j, _)| j != j1)
                    .map(|(j, cost)| cost - state.v[j])
                    .min();
                if let Some(slack) = slack {
                    state.v[j1] -= slack;
                }
            }
            _ => {}
        }
    }
    free
}

/// One sweep of augmenting row reduction.
///
/// Each free row grabs the column of smallest reduced cost. If that beats
/// the second smallest, the column's potential is lowered by the gap and the
/// displaced row is processed next (at most `n` such continuations per
/// sweep). Rows that end up displaced otherwise are returned as still free.
fn augmenting_row_reduction(
    matrix: &IncidenceMatrix,
    state: &mut LapState,
    free: &[usize],
) -> Vec<usize> {
    let mut work = free.to_vec();
    let mut still_free = Vec::new();
    let mut budget = matrix.dimension();
    let mut k = 0;

    while k < work.len() {
        let i = work[k];
        k += 1;

        let mut entries = matrix.row(i);
        let Some((first, first_cost)) = entries.next() else {
            still_free.push(i);
            continue;
        };
        let mut j1 = first;
        let mut umin = first_cost - state.v[first];
        let mut subminimum: Option<(usize, i32)> = None;
        for (j, cost) in entries {
            let h = cost - state.v[j];
            if subminimum.map_or(true, |(_, usub)| h < usub) {
                if h >= umin {
                    subminimum = Some((j, h));
                } else {
                    subminimum = Some((j1, umin));
                    umin = h;
                    j1 = j;
                }
            }
        }

        let mut i0 = state.colsol[j1];
        let strict = match subminimum {
            Some((_, usub)) if umin < usub => {
                state.v[j1] -= usub - umin;
                true
            }
            Some((j2, _)) if i0.is_some() => {
                j1 = j2;
                i0 = state.colsol[j2];
                false
            }
            _ => false,
        };

        state.rowsol[i] = Some(j1);
        state.colsol[j1] = Some(i);

        if let Some(displaced) = i0 {
            state.rowsol[displaced] = None;
            if strict && budget > 0 {
                budget -= 1;
                k -= 1;
                work[k] = displaced;
            } else {
                still_free.push(displaced);
            }
        }
    }
    still_free
}
