//! Matchings, dual potentials and analysis results.
//!
//! Three layers of result types flow through the analysis:
//!
//! - [`Solution`]: a perfect minimum-cost matching with LAP duals `u`, `v`
//!   (`u[i] + v[j] <= σ(i,j)`, equality on matched pairs).
//! - [`PartialSolution`]: a matching that may leave rows and columns
//!   [`Assignment::Unassigned`], plus potentials that are valid on the
//!   assigned part. This is the input of the incremental solver.
//! - [`AnalysisResult`]: Pryce's canonical offsets `c`, `d` together with the
//!   matching they were derived from.

use serde::{Deserialize, Serialize};

use crate::error::{check_index, DaeError, DaeResult, IndexKind};
use crate::matrix::IncidenceMatrix;

/// Row or column partner in a (partial) matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Assignment {
    Assigned(usize),
    #[default]
    Unassigned,
}

impl Assignment {
    /// Partner index, if any.
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Assignment::Assigned(k) => Some(k),
            Assignment::Unassigned => None,
        }
    }

    #[inline]
    pub fn is_assigned(self) -> bool {
        matches!(self, Assignment::Assigned(_))
    }
}

impl From<Option<usize>> for Assignment {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Assignment::Unassigned, Assignment::Assigned)
    }
}

/// Optimal perfect matching of a linear assignment problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// Sum of `σ(i, rowsol[i])`
    pub cost: i32,
    /// Column matched to each row
    pub rowsol: Vec<usize>,
    /// Row matched to each column
    pub colsol: Vec<usize>,
    /// Row potentials
    pub u: Vec<i32>,
    /// Column potentials
    pub v: Vec<i32>,
}

impl Solution {
    pub fn dimension(&self) -> usize {
        self.rowsol.len()
    }
}

/// A matching with holes, used to warm-start the incremental solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSolution {
    pub u: Vec<i32>,
    pub v: Vec<i32>,
    pub row_assignment: Vec<Assignment>,
    pub col_assignment: Vec<Assignment>,
}

impl PartialSolution {
    /// Everything unassigned, zero potentials.
    pub fn empty(dimension: usize) -> Self {
        Self {
            u: vec![0; dimension],
            v: vec![0; dimension],
            row_assignment: vec![Assignment::Unassigned; dimension],
            col_assignment: vec![Assignment::Unassigned; dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.row_assignment.len()
    }

    /// Drop the pair containing row `i` (if any) from the matching.
    pub fn unassign_row(&mut self, i: usize) -> DaeResult<()> {
        check_index(IndexKind::Equation, i, self.dimension())?;
        if let Some(j) = self.row_assignment[i].index() {
            self.col_assignment[j] = Assignment::Unassigned;
        }
        self.row_assignment[i] = Assignment::Unassigned;
        Ok(())
    }

    /// Drop the pair containing column `j` (if any) from the matching.
    pub fn unassign_col(&mut self, j: usize) -> DaeResult<()> {
        check_index(IndexKind::Variable, j, self.dimension())?;
        if let Some(i) = self.col_assignment[j].index() {
            self.row_assignment[i] = Assignment::Unassigned;
        }
        self.col_assignment[j] = Assignment::Unassigned;
        Ok(())
    }

    /// Rows that still need an augmenting path.
    pub fn free_rows(&self) -> Vec<usize> {
        self.row_assignment
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_assigned())
            .map(|(i, _)| i)
            .collect()
    }

    /// Check that the vectors fit `matrix` and that the assigned pairs form
    /// a matching on existing entries.
    pub fn validate(&self, matrix: &IncidenceMatrix) -> DaeResult<()> {
        let n = matrix.dimension();
        for len in [
            self.u.len(),
            self.v.len(),
            self.row_assignment.len(),
            self.col_assignment.len(),
        ] {
            if len != n {
                return Err(DaeError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }

        for (i, a) in self.row_assignment.iter().enumerate() {
            let Some(j) = a.index() else { continue };
            check_index(IndexKind::Variable, j, n)?;
            if self.col_assignment[j] != Assignment::Assigned(i) {
                return Err(DaeError::InconsistentAssignment(format!(
                    "row {i} is matched to column {j}, but column {j} is not matched to row {i}"
                )));
            }
            if matrix.get(i, j).is_none() {
                return Err(DaeError::InconsistentAssignment(format!(
                    "row {i} is matched to column {j} without an incidence"
                )));
            }
        }
        for (j, a) in self.col_assignment.iter().enumerate() {
            let Some(i) = a.index() else { continue };
            check_index(IndexKind::Equation, i, n)?;
            if self.row_assignment[i] != Assignment::Assigned(j) {
                return Err(DaeError::InconsistentAssignment(format!(
                    "column {j} is matched to row {i}, but row {i} is not matched to column {j}"
                )));
            }
        }
        Ok(())
    }
}

impl From<&Solution> for PartialSolution {
    fn from(solution: &Solution) -> Self {
        Self {
            u: solution.u.clone(),
            v: solution.v.clone(),
            row_assignment: solution.rowsol.iter().map(|&j| Assignment::Assigned(j)).collect(),
            col_assignment: solution.colsol.iter().map(|&i| Assignment::Assigned(i)).collect(),
        }
    }
}

/// Placement of inflated component instances inside a full problem.
///
/// Produced by compressed analysis: the rows of instance `n` start at
/// `component_rows[n]`, its private variables at `component_cols[n]`.
/// Public variables keep their outer column index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflationMap {
    pub component_rows: Vec<usize>,
    pub component_cols: Vec<usize>,
    /// Number of private variables per instance
    pub privates: Vec<usize>,
    /// Full-problem row of every outer equation; `None` for surrogate rows
    pub outer_rows: Vec<Option<usize>>,
}

impl InflationMap {
    pub fn instances(&self) -> usize {
        self.component_rows.len()
    }

    /// Full-problem row of equation `eq` of instance `instance`.
    pub fn extracted_equation(&self, eq: usize, instance: usize) -> DaeResult<usize> {
        check_index(IndexKind::Instance, instance, self.instances())?;
        check_index(
            IndexKind::ComponentEquation,
            eq,
            self.privates[instance] + 1,
        )?;
        Ok(self.component_rows[instance] + eq)
    }

    /// Full-problem column of private variable `var` of instance `instance`.
    pub fn extracted_variable(&self, var: usize, instance: usize) -> DaeResult<usize> {
        check_index(IndexKind::Instance, instance, self.instances())?;
        check_index(IndexKind::PrivateVariable, var, self.privates[instance])?;
        Ok(self.component_cols[instance] + var)
    }

    /// Full-problem row of outer equation `i`; `None` if `i` is a surrogate row.
    pub fn outer_equation(&self, i: usize) -> DaeResult<Option<usize>> {
        check_index(IndexKind::Equation, i, self.outer_rows.len())?;
        Ok(self.outer_rows[i])
    }
}

/// Canonical offsets of Pryce's structural analysis.
///
/// For every entry, `d[j] - c[i] >= der(i,j)` (equivalently
/// `c[i] - d[j] <= σ(i,j)`), with equality on the matched pairs, and `c`, `d`
/// are the pointwise smallest such vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Equation offsets: how often equation `i` must be differentiated
    pub c: Vec<i32>,
    /// Variable offsets: highest derivative of variable `j` needed
    pub d: Vec<i32>,
    pub row_assignment: Vec<usize>,
    pub col_assignment: Vec<usize>,
    /// Cost of the matching (negated sum of matched derivative orders)
    pub cost: i32,
    /// Instance placement, for results of compressed analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflation: Option<InflationMap>,
}

impl AnalysisResult {
    pub fn dimension(&self) -> usize {
        self.c.len()
    }

    /// Number of times equation `i` must be differentiated.
    pub fn equation_offset(&self, i: usize) -> DaeResult<i32> {
        check_index(IndexKind::Equation, i, self.c.len())?;
        Ok(self.c[i])
    }

    /// Highest derivative of variable `j` required.
    pub fn variable_offset(&self, j: usize) -> DaeResult<i32> {
        check_index(IndexKind::Variable, j, self.d.len())?;
        Ok(self.d[j])
    }

    /// Structural index: `max c` plus one if some variable enters algebraically.
    pub fn structural_index(&self) -> i32 {
        let max_c = self.c.iter().copied().max().unwrap_or(0);
        if self.d.iter().any(|&d| d == 0) {
            max_c + 1
        } else {
            max_c
        }
    }

    /// See [`InflationMap::extracted_equation`].
    pub fn extracted_equation(&self, eq: usize, instance: usize) -> DaeResult<usize> {
        self.inflation_map()?.extracted_equation(eq, instance)
    }

    /// See [`InflationMap::extracted_variable`].
    pub fn extracted_variable(&self, var: usize, instance: usize) -> DaeResult<usize> {
        self.inflation_map()?.extracted_variable(var, instance)
    }

    fn inflation_map(&self) -> DaeResult<&InflationMap> {
        self.inflation.as_ref().ok_or_else(|| {
            DaeError::Compression("result was not produced by compressed analysis".into())
        })
    }

    /// Check feasibility and complementary slackness of `(c, d)` on `matrix`.
    pub fn verify(&self, matrix: &IncidenceMatrix) -> DaeResult<()> {
        let n = matrix.dimension();
        for len in [
            self.c.len(),
            self.d.len(),
            self.row_assignment.len(),
            self.col_assignment.len(),
        ] {
            if len != n {
                return Err(DaeError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }

        for (i, j, cost) in matrix.iter() {
            if self.c[i] - self.d[j] > cost {
                return Err(DaeError::DualInfeasible {
                    equation: i,
                    variable: j,
                });
            }
        }
        for (i, &j) in self.row_assignment.iter().enumerate() {
            match matrix.get(i, j) {
                Some(cost) if self.c[i] - self.d[j] == cost => {}
                _ => {
                    return Err(DaeError::DualInfeasible {
                        equation: i,
                        variable: j,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pendulum() -> IncidenceMatrix {
        let mut m = IncidenceMatrix::new(3);
        m.set_derivative(0, 0, 0).unwrap();
        m.set_derivative(0, 1, 0).unwrap();
        m.set_derivative(1, 0, 2).unwrap();
        m.set_derivative(1, 2, 0).unwrap();
        m.set_derivative(2, 1, 2).unwrap();
        m.set_derivative(2, 2, 0).unwrap();
        m
    }

    #[test]
    fn test_assignment_conversions() {
        assert_eq!(Assignment::from(Some(3)), Assignment::Assigned(3));
        assert_eq!(Assignment::from(None), Assignment::Unassigned);
        assert_eq!(Assignment::Assigned(2).index(), Some(2));
        assert!(!Assignment::default().is_assigned());
    }

    #[test]
    fn test_partial_solution_unassign() {
        let solution = Solution {
            cost: -2,
            rowsol: vec![0, 2, 1],
            colsol: vec![0, 2, 1],
            u: vec![0; 3],
            v: vec![0; 3],
        };
        let mut partial = PartialSolution::from(&solution);
        partial.unassign_row(1).unwrap();
        assert_eq!(partial.free_rows(), vec![1]);
        assert_eq!(partial.col_assignment[2], Assignment::Unassigned);

        partial.unassign_col(0).unwrap();
        assert_eq!(partial.free_rows(), vec![0, 1]);
        assert!(partial.validate(&pendulum()).is_ok());
        assert!(partial.unassign_row(3).is_err());
    }

    #[test]
    fn test_validate_rejects_broken_matching() {
        let mut partial = PartialSolution::empty(3);
        partial.row_assignment[0] = Assignment::Assigned(2);
        assert!(matches!(
            partial.validate(&pendulum()),
            Err(DaeError::InconsistentAssignment(_))
        ));

        // (0, 2) is not an incidence of the pendulum
        partial.col_assignment[2] = Assignment::Assigned(0);
        assert!(matches!(
            partial.validate(&pendulum()),
            Err(DaeError::InconsistentAssignment(_))
        ));

        let short = PartialSolution::empty(2);
        assert!(matches!(
            short.validate(&pendulum()),
            Err(DaeError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_verify_and_offsets() {
        let result = AnalysisResult {
            c: vec![2, 0, 0],
            d: vec![2, 2, 0],
            row_assignment: vec![0, 2, 1],
            col_assignment: vec![0, 2, 1],
            cost: -2,
            inflation: None,
        };
        let m = pendulum();
        assert!(result.verify(&m).is_ok());
        assert_eq!(result.equation_offset(0).unwrap(), 2);
        assert_eq!(result.variable_offset(2).unwrap(), 0);
        assert!(result.variable_offset(3).is_err());
        assert_eq!(result.structural_index(), 3);
        assert!(result.extracted_equation(0, 0).is_err());

        let mut broken = result.clone();
        broken.c[1] = 1;
        assert!(matches!(
            broken.verify(&m),
            Err(DaeError::DualInfeasible { equation: 1, .. })
        ));
    }

    #[test]
    fn test_inflation_map_bounds() {
        let map = InflationMap {
            component_rows: vec![1, 10],
            component_cols: vec![2, 10],
            privates: vec![8, 8],
            outer_rows: vec![Some(0), None],
        };
        assert_eq!(map.extracted_equation(8, 1).unwrap(), 18);
        assert_eq!(map.extracted_variable(7, 0).unwrap(), 9);
        assert!(map.extracted_equation(9, 0).is_err());
        assert!(map.extracted_variable(8, 0).is_err());
        assert!(map.extracted_variable(0, 2).is_err());
        assert_eq!(map.outer_equation(1).unwrap(), None);
    }
}
