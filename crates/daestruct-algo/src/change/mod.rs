//! Incremental re-analysis after localized structural edits
//!
//! A [`StructChange`] describes one edit of a DAE: equations and unknowns to
//! delete, plus new equations that reference surviving unknowns or unknowns
//! introduced by the same edit. Applying it to a previous problem and its
//! [`AnalysisResult`] yields a [`ChangedProblem`]:
//!
//! - surviving rows and columns are renumbered densely (see [`OffsetMap`]),
//! - new equations follow the surviving rows, new unknowns the surviving columns,
//! - matched pairs that survive keep their match and their offsets, seeded as
//!   LAP duals `u[i] = c[i]`, `v[j] = -d[j]`,
//! - everything the edit touched starts unassigned.
//!
//! [`StructuralAnalyzer::analyse_changed`](crate::StructuralAnalyzer::analyse_changed)
//! then only has to augment the unassigned rows.
//!
//! ## Example
//!
//! ```ignore
//! let mut diff = StructChange::new();
//! diff.remove_equation(3)?;
//! diff.remove_unknown(7)?;
//! let eq = diff.add_equation();
//! let x = diff.add_unknown();
//! diff.set_existing(eq, 2, 1)?;
//! diff.set_new(eq, x, 0)?;
//!
//! let changed = ChangedProblem::new(&problem, &result, &diff)?;
//! let next = analyzer.analyse_changed(&changed)?;
//! let x_col = changed.new_col_index(x)?;
//! ```
//!
//! Changes chain: a [`ChangedProblem`] is itself a [`StructuralProblem`] and
//! can be the prior problem of the next edit.

mod offsets;

pub use offsets::OffsetMap;

use std::collections::BTreeSet;

use daestruct_core::{
    check_index, derivative_cost, AnalysisResult, Assignment, DaeError, DaeResult,
    IncidenceMatrix, IndexKind, PartialSolution,
};
use hashbrown::HashMap;
use tracing::debug;

use crate::pryce::StructuralProblem;

/// Handle of an equation added by a [`StructChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewEquation(usize);

/// Handle of an unknown added by a [`StructChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewUnknown(usize);

impl NewEquation {
    /// Position among the equations added by the same change.
    pub fn index(self) -> usize {
        self.0
    }
}

impl NewUnknown {
    /// Position among the unknowns added by the same change.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NewRow {
    /// Surviving unknown (old index) => derivative order
    existing: HashMap<usize, i32>,
    /// New unknown => derivative order
    added: HashMap<usize, i32>,
}

/// One structural edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructChange {
    deleted_equations: BTreeSet<usize>,
    deleted_unknowns: BTreeSet<usize>,
    new_equations: Vec<NewRow>,
    new_unknowns: usize,
}

impl StructChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the change neither deletes nor adds anything.
    pub fn is_empty(&self) -> bool {
        self.deleted_equations.is_empty()
            && self.deleted_unknowns.is_empty()
            && self.new_equations.is_empty()
            && self.new_unknowns == 0
    }

    pub fn remove_equation(&mut self, equation: usize) -> DaeResult<()> {
        if !self.deleted_equations.insert(equation) {
            return Err(DaeError::InvalidDiff(format!(
                "equation {equation} is deleted twice"
            )));
        }
        Ok(())
    }

    pub fn remove_unknown(&mut self, variable: usize) -> DaeResult<()> {
        if self.new_equations.iter().any(|row| row.existing.contains_key(&variable)) {
            return Err(DaeError::InvalidDiff(format!(
                "variable {variable} is referenced by a new equation"
            )));
        }
        if !self.deleted_unknowns.insert(variable) {
            return Err(DaeError::InvalidDiff(format!(
                "variable {variable} is deleted twice"
            )));
        }
        Ok(())
    }

    pub fn add_equation(&mut self) -> NewEquation {
        self.new_equations.push(NewRow::default());
        NewEquation(self.new_equations.len() - 1)
    }

    pub fn add_unknown(&mut self) -> NewUnknown {
        self.new_unknowns += 1;
        NewUnknown(self.new_unknowns - 1)
    }

    /// Let surviving unknown `variable` (old index) occur in a new equation.
    pub fn set_existing(
        &mut self,
        equation: NewEquation,
        variable: usize,
        derivative: i32,
    ) -> DaeResult<()> {
        if self.deleted_unknowns.contains(&variable) {
            return Err(DaeError::InvalidDiff(format!(
                "variable {variable} is deleted by the same change"
            )));
        }
        derivative_cost(equation.0, variable, derivative)?;
        self.row_mut(equation)?.existing.insert(variable, derivative);
        Ok(())
    }

    /// Let a new unknown occur in a new equation.
    pub fn set_new(
        &mut self,
        equation: NewEquation,
        variable: NewUnknown,
        derivative: i32,
    ) -> DaeResult<()> {
        check_index(IndexKind::NewVariable, variable.0, self.new_unknowns)?;
        derivative_cost(equation.0, variable.0, derivative)?;
        self.row_mut(equation)?.added.insert(variable.0, derivative);
        Ok(())
    }

    fn row_mut(&mut self, equation: NewEquation) -> DaeResult<&mut NewRow> {
        let bound = self.new_equations.len();
        self.new_equations
            .get_mut(equation.0)
            .ok_or_else(|| DaeError::invalid_index(IndexKind::NewEquation, equation.0, bound))
    }

    pub fn deleted_equations(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted_equations.iter().copied()
    }

    pub fn deleted_unknowns(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted_unknowns.iter().copied()
    }

    pub fn new_equation_count(&self) -> usize {
        self.new_equations.len()
    }

    pub fn new_unknown_count(&self) -> usize {
        self.new_unknowns
    }

    fn validate(&self, dimension: usize) -> DaeResult<()> {
        for &i in &self.deleted_equations {
            check_index(IndexKind::Equation, i, dimension)?;
        }
        for &j in &self.deleted_unknowns {
            check_index(IndexKind::Variable, j, dimension)?;
        }
        for row in &self.new_equations {
            for &j in row.existing.keys() {
                check_index(IndexKind::Variable, j, dimension)?;
                if self.deleted_unknowns.contains(&j) {
                    return Err(DaeError::InvalidDiff(format!(
                        "new equation references deleted variable {j}"
                    )));
                }
            }
        }

        let rows = dimension - self.deleted_equations.len() + self.new_equations.len();
        let cols = dimension - self.deleted_unknowns.len() + self.new_unknowns;
        if rows != cols {
            return Err(DaeError::InvalidDiff(format!(
                "change leaves {rows} equations for {cols} unknowns"
            )));
        }
        Ok(())
    }
}

/// A previous problem with one [`StructChange`] applied.
///
/// Owns its matrix, the warm-start matching and the index translation
/// tables; it keeps no reference to the problem it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedProblem {
    matrix: IncidenceMatrix,
    partial: PartialSolution,
    rows: OffsetMap,
    cols: OffsetMap,
    new_equations: usize,
    new_unknowns: usize,
}

impl ChangedProblem {
    /// Apply `diff` to `prior`, whose analysis produced `result`.
    pub fn new<P>(prior: &P, result: &AnalysisResult, diff: &StructChange) -> DaeResult<Self>
    where
        P: StructuralProblem + ?Sized,
    {
        let old = prior.matrix();
        let n = old.dimension();
        if result.dimension() != n {
            return Err(DaeError::DimensionMismatch {
                expected: n,
                got: result.dimension(),
            });
        }
        diff.validate(n)?;

        let rows = OffsetMap::new(n, &diff.deleted_equations);
        let cols = OffsetMap::new(n, &diff.deleted_unknowns);
        let first_new_row = rows.surviving();
        let first_new_col = cols.surviving();
        let dimension = first_new_row + diff.new_equations.len();

        let mut matrix = IncidenceMatrix::new(dimension);
        let mut partial = PartialSolution::empty(dimension);

        for j in 0..n {
            if let Some(nj) = cols.map(j) {
                partial.v[nj] = -result.d[j];
            }
        }

        let mut kept_pairs = 0usize;
        for i in 0..n {
            let Some(ni) = rows.map(i) else { continue };
            partial.u[ni] = result.c[i];
            for (j, cost) in old.row(i) {
                if let Some(nj) = cols.map(j) {
                    matrix.insert(ni, nj, cost)?;
                }
            }
            if let Some(nj) = cols.map(result.row_assignment[i]) {
                partial.row_assignment[ni] = Assignment::Assigned(nj);
                partial.col_assignment[nj] = Assignment::Assigned(ni);
                kept_pairs += 1;
            }
        }

        for (k, row) in diff.new_equations.iter().enumerate() {
            let r = first_new_row + k;
            for (&j, &der) in &row.existing {
                let nj = cols
                    .map(j)
                    .ok_or_else(|| DaeError::InvalidDiff(format!("variable {j} does not survive")))?;
                matrix.set_derivative(r, nj, der)?;
            }
            for (&j, &der) in &row.added {
                matrix.set_derivative(r, first_new_col + j, der)?;
            }
        }

        debug!(
            old_dimension = n,
            dimension,
            kept_pairs,
            free_rows = dimension - kept_pairs,
            "structural change applied"
        );

        Ok(Self {
            matrix,
            partial,
            rows,
            cols,
            new_equations: diff.new_equations.len(),
            new_unknowns: diff.new_unknowns,
        })
    }

    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    /// Warm-start matching and duals for the incremental solver.
    pub fn partial_solution(&self) -> &PartialSolution {
        &self.partial
    }

    /// New index of old equation `i`; `None` if the change deleted it.
    pub fn old_to_new_row(&self, i: usize) -> DaeResult<Option<usize>> {
        check_index(IndexKind::Equation, i, self.rows.bound())?;
        Ok(self.rows.map(i))
    }

    /// New index of old unknown `j`; `None` if the change deleted it.
    pub fn old_to_new_col(&self, j: usize) -> DaeResult<Option<usize>> {
        check_index(IndexKind::Variable, j, self.cols.bound())?;
        Ok(self.cols.map(j))
    }

    /// Row of an equation added by the change.
    pub fn new_row_index(&self, equation: NewEquation) -> DaeResult<usize> {
        check_index(IndexKind::NewEquation, equation.0, self.new_equations)?;
        Ok(self.rows.surviving() + equation.0)
    }

    /// Column of an unknown added by the change.
    pub fn new_col_index(&self, variable: NewUnknown) -> DaeResult<usize> {
        check_index(IndexKind::NewVariable, variable.0, self.new_unknowns)?;
        Ok(self.cols.surviving() + variable.0)
    }
}

impl StructuralProblem for ChangedProblem {
    fn matrix(&self) -> &IncidenceMatrix {
        &self.matrix
    }
}
