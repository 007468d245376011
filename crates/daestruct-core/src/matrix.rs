//! Sparse structural incidence matrix (Σ-matrix).
//!
//! Entry `σ(i,j)` records the highest derivative order at which variable `j`
//! occurs in equation `i`. Entries are stored as *costs*, the negated
//! derivative order, so that "more derivatives" means "cheaper" and the
//! maximum-value transversal of Pryce's method becomes a minimum-cost
//! assignment:
//!
//! ```text
//! set_derivative(i, j, 2)   =>   σ(i,j) = -2
//! absent                    =>   σ(i,j) = ∞   (get() returns None)
//! ```
//!
//! Rows are kept sorted by column so that row scans visit columns in
//! increasing order. For every column the matrix caches the row holding the
//! cheapest entry; the assignment solver seeds its column reduction from this
//! cache, so it is kept exact on every insert, including overwrites.

use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::error::{check_index, derivative_cost, DaeError, DaeResult, IndexKind};

/// One `(equation, variable, derivative order)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence {
    pub equation: usize,
    pub variable: usize,
    pub derivative: i32,
}

impl Incidence {
    pub fn new(equation: usize, variable: usize, derivative: i32) -> Self {
        Self {
            equation,
            variable,
            derivative,
        }
    }
}

/// Square sparse Σ-matrix, rows = equations, columns = variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidenceMatrix {
    dimension: usize,
    /// Per row: `(column, cost)` sorted by column
    rows: Vec<Vec<(usize, i32)>>,
    /// Per column: row holding the cheapest entry
    cheapest: Vec<Option<usize>>,
    nnz: usize,
}

impl IncidenceMatrix {
    /// Create an empty `dimension × dimension` matrix.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: vec![Vec::new(); dimension],
            cheapest: vec![None; dimension],
            nnz: 0,
        }
    }

    /// Build a matrix from `(equation, variable, derivative)` triples.
    ///
    /// Later triples for the same position overwrite earlier ones.
    pub fn from_incidences<I>(dimension: usize, incidences: I) -> DaeResult<Self>
    where
        I: IntoIterator<Item = Incidence>,
    {
        let mut matrix = Self::new(dimension);
        matrix.extend(incidences)?;
        Ok(matrix)
    }

    /// Insert every triple yielded by `incidences`.
    pub fn extend<I>(&mut self, incidences: I) -> DaeResult<()>
    where
        I: IntoIterator<Item = Incidence>,
    {
        for inc in incidences {
            self.set_derivative(inc.equation, inc.variable, inc.derivative)?;
        }
        Ok(())
    }

    /// Matrix dimension (number of equations = number of variables).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Record that `variable` occurs differentiated `derivative` times in `equation`.
    ///
    /// Negative orders are rejected with [`DaeError::InvalidDerivative`].
    pub fn set_derivative(
        &mut self,
        equation: usize,
        variable: usize,
        derivative: i32,
    ) -> DaeResult<()> {
        let cost = derivative_cost(equation, variable, derivative)?;
        self.insert(equation, variable, cost)
    }

    /// Store the raw cost `σ(i,j)`; last write wins.
    pub fn insert(&mut self, i: usize, j: usize, cost: i32) -> DaeResult<()> {
        check_index(IndexKind::Equation, i, self.dimension)?;
        check_index(IndexKind::Variable, j, self.dimension)?;

        let row = &mut self.rows[i];
        let previous = match row.binary_search_by_key(&j, |&(col, _)| col) {
            Ok(pos) => Some(std::mem::replace(&mut row[pos].1, cost)),
            Err(pos) => {
                row.insert(pos, (j, cost));
                self.nnz += 1;
                None
            }
        };

        match self.cheapest[j] {
            None => self.cheapest[j] = Some(i),
            Some(r) if r == i => {
                // overwrite of the cached minimum with a larger value
                if previous.is_some_and(|old| cost > old) {
                    self.rescan_column(j);
                }
            }
            Some(r) => {
                if self.get(r, j).map_or(true, |best| cost < best) {
                    self.cheapest[j] = Some(i);
                }
            }
        }
        Ok(())
    }

    /// Append an entry after every existing one in row-major order.
    ///
    /// Pairs must arrive strictly increasing in `(equation, variable)`;
    /// anything else is rejected.
    pub fn append(&mut self, equation: usize, variable: usize, derivative: i32) -> DaeResult<()> {
        check_index(IndexKind::Equation, equation, self.dimension)?;
        check_index(IndexKind::Variable, variable, self.dimension)?;

        if self.rows[equation + 1..].iter().any(|row| !row.is_empty()) {
            return Err(DaeError::invalid_index(
                IndexKind::Equation,
                equation,
                self.last_nonempty_row().map_or(0, |r| r + 1),
            ));
        }
        if let Some(&(last, _)) = self.rows[equation].last() {
            if variable <= last {
                return Err(DaeError::invalid_index(IndexKind::Variable, variable, last + 1));
            }
        }
        let cost = derivative_cost(equation, variable, derivative)?;
        self.insert(equation, variable, cost)
    }

    fn last_nonempty_row(&self) -> Option<usize> {
        self.rows.iter().rposition(|row| !row.is_empty())
    }

    fn rescan_column(&mut self, j: usize) {
        let mut best: Option<(usize, i32)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            if let Ok(pos) = row.binary_search_by_key(&j, |&(col, _)| col) {
                let cost = row[pos].1;
                if best.map_or(true, |(_, b)| cost < b) {
                    best = Some((i, cost));
                }
            }
        }
        self.cheapest[j] = best.map(|(i, _)| i);
    }

    /// Cost `σ(i,j)`, or `None` when the variable is absent (∞).
    pub fn get(&self, i: usize, j: usize) -> Option<i32> {
        let row = self.rows.get(i)?;
        row.binary_search_by_key(&j, |&(col, _)| col)
            .ok()
            .map(|pos| row[pos].1)
    }

    /// Highest derivative order of variable `j` in equation `i`.
    pub fn derivative(&self, i: usize, j: usize) -> Option<i32> {
        self.get(i, j).map(|cost| -cost)
    }

    /// Row holding the cheapest entry of column `j`; `None` for an empty column.
    pub fn cheapest_row(&self, j: usize) -> Option<usize> {
        self.cheapest.get(j).copied().flatten()
    }

    /// Entries of row `i` as `(column, cost)` in increasing column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.rows
            .get(i)
            .map(|row| row.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// Number of entries in row `i`.
    pub fn row_len(&self, i: usize) -> usize {
        self.rows.get(i).map_or(0, Vec::len)
    }

    /// All entries as `(row, column, cost)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, i32)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |&(j, cost)| (i, j, cost)))
    }

    /// All entries as [`Incidence`] triples (derivative orders, not costs).
    pub fn incidences(&self) -> impl Iterator<Item = Incidence> + '_ {
        self.iter()
            .map(|(i, j, cost)| Incidence::new(i, j, -cost))
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Matrix density (nnz / n²).
    pub fn density(&self) -> f64 {
        let n = self.dimension;
        if n == 0 {
            return 0.0;
        }
        self.nnz as f64 / (n * n) as f64
    }

    /// True if some row or column has no entry at all.
    pub fn has_empty_line(&self) -> bool {
        self.rows.iter().any(Vec::is_empty) || self.cheapest.iter().any(Option::is_none)
    }

    /// CSR snapshot of the costs for read-only row scans.
    pub fn to_csr(&self) -> CsMat<i32> {
        let mut indptr = Vec::with_capacity(self.dimension + 1);
        let mut indices = Vec::with_capacity(self.nnz);
        let mut data = Vec::with_capacity(self.nnz);
        indptr.push(0);
        for row in &self.rows {
            for &(j, cost) in row {
                indices.push(j);
                data.push(cost);
            }
            indptr.push(indices.len());
        }
        CsMat::new((self.dimension, self.dimension), indptr, indices, data)
    }
}
