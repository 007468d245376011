//! Compressible components: builder and sealed form.

use std::collections::BTreeMap;

use daestruct_core::{
    check_index, derivative_cost, DaeError, DaeResult, IncidenceMatrix, IndexKind,
};
use tracing::debug;

use crate::lap::LapSolver;

/// Collects the incidence of a component before it is sealed.
///
/// Columns are numbered privates first (`0..p`), publics after (`p..p+q`);
/// rows `0..=p` are the component's equations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBuilder {
    publics: usize,
    privates: usize,
    /// `(row, column) => cost`
    incidence: BTreeMap<(usize, usize), i32>,
}

impl ComponentBuilder {
    pub fn new(publics: usize, privates: usize) -> Self {
        Self {
            publics,
            privates,
            incidence: BTreeMap::new(),
        }
    }

    pub fn publics(&self) -> usize {
        self.publics
    }

    pub fn privates(&self) -> usize {
        self.privates
    }

    /// Let public variable `variable` occur in `equation`.
    pub fn public_set(&mut self, equation: usize, variable: usize, derivative: i32) -> DaeResult<()> {
        check_index(IndexKind::ComponentEquation, equation, self.privates + 1)?;
        check_index(IndexKind::PublicVariable, variable, self.publics)?;
        let column = self.privates + variable;
        let cost = derivative_cost(equation, column, derivative)?;
        self.incidence.insert((equation, column), cost);
        Ok(())
    }

    /// Let private variable `variable` occur in `equation`.
    pub fn private_set(&mut self, equation: usize, variable: usize, derivative: i32) -> DaeResult<()> {
        check_index(IndexKind::ComponentEquation, equation, self.privates + 1)?;
        check_index(IndexKind::PrivateVariable, variable, self.privates)?;
        let cost = derivative_cost(equation, variable, derivative)?;
        self.incidence.insert((equation, variable), cost);
        Ok(())
    }

    /// Seal the component: solve the internal problem once per public
    /// variable the component equations may solve for.
    ///
    /// For public `k`, the other `q - 1` publics are pinned to filler rows
    /// `p+1..p+q` at cost 0, and the resulting square problem is solved. A
    /// singular choice of `k` is recorded as unavailable; a component with no
    /// available choice is rejected.
    pub fn build(self) -> DaeResult<Component> {
        let p = self.privates;
        let q = self.publics;
        if q == 0 {
            return Err(DaeError::Compression(
                "component has no public variables".into(),
            ));
        }

        let solver = LapSolver::new();
        let mut matchings = Vec::with_capacity(q);
        let mut costs = Vec::with_capacity(q);
        for k in 0..q {
            let mut sealed = IncidenceMatrix::new(p + q);
            for (&(i, j), &cost) in &self.incidence {
                sealed.insert(i, j, cost)?;
            }
            for pin in p + 1..p + q {
                for other in (0..q).filter(|&other| other != k) {
                    sealed.insert(pin, p + other, 0)?;
                }
            }

            match solver.solve(&sealed) {
                Ok(solution) => {
                    debug!(public = k, cost = solution.cost, "component public sealed");
                    matchings.push(Some(solution.rowsol[..=p].to_vec()));
                    costs.push(Some(solution.cost));
                }
                Err(err) if err.is_structural() => {
                    debug!(public = k, "component singular for public");
                    matchings.push(None);
                    costs.push(None);
                }
                Err(err) => return Err(err),
            }
        }

        if costs.iter().all(Option::is_none) {
            return Err(DaeError::Compression(
                "component is singular for every public variable".into(),
            ));
        }

        Ok(Component {
            publics: q,
            privates: p,
            incidence: self
                .incidence
                .into_iter()
                .map(|((i, j), cost)| (i, j, cost))
                .collect(),
            matchings,
            costs,
        })
    }
}

/// A sealed component: immutable, shareable between instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    publics: usize,
    privates: usize,
    incidence: Vec<(usize, usize, i32)>,
    /// Per public: column of each component equation
    matchings: Vec<Option<Vec<usize>>>,
    costs: Vec<Option<i32>>,
}

impl Component {
    pub fn publics(&self) -> usize {
        self.publics
    }

    pub fn privates(&self) -> usize {
        self.privates
    }

    /// Number of component equations (`privates + 1`).
    pub fn equations(&self) -> usize {
        self.privates + 1
    }

    /// Cost of the internal matching in which the component equations solve
    /// for public `k`; `None` if the component is singular for that choice.
    pub fn cost(&self, k: usize) -> DaeResult<Option<i32>> {
        check_index(IndexKind::PublicVariable, k, self.publics)?;
        Ok(self.costs[k])
    }

    /// Internal matching for public `k`, as component column per equation.
    pub fn matching(&self, k: usize) -> DaeResult<Option<&[usize]>> {
        check_index(IndexKind::PublicVariable, k, self.publics)?;
        Ok(self.matchings[k].as_deref())
    }

    /// Component entries as `(equation, column, cost)`, columns privates first.
    pub fn incidence(&self) -> &[(usize, usize, i32)] {
        &self.incidence
    }
}
