//! Compression of repeated sub-structures
//!
//! A component is a block of `p + 1` equations over `p` private and `q`
//! public variables that occurs many times in a model (one per resistor,
//! capacitor, pipe segment...). Instead of putting every copy into the
//! Σ-matrix, the outer problem gets a single **surrogate row** per instance:
//!
//! ```text
//!            public columns of the instance
//!            q_offset .. q_offset + q
//! row s   [  cost[0]  cost[1]  ...  cost[q-1]  ]
//! ```
//!
//! `cost[k]` is the value of the best internal matching in which the
//! component equations solve for public `k` (see [`ComponentBuilder::build`]).
//! After the outer problem is solved, the column matched to `s` names the
//! public each instance solves for, and [`CompressionList::inflate`] splices
//! the stored internal matching back in:
//!
//! - non-surrogate outer rows keep their order, outer columns keep their index,
//! - each instance appends `p + 1` rows and `p` private columns,
//! - the resulting matching is optimal for the inflated matrix, so Pryce's
//!   fixed point runs on it directly.
//!
//! ## Example
//!
//! ```ignore
//! let rlc = Arc::new(builder.build()?);
//! let mut list = CompressionList::new();
//! let id = list.instantiate(rlc.clone(), 0, 1);
//! list.set_public_parts(problem.matrix_mut(), id)?;
//! let result = analyzer.analyse_compressed(&problem, &list)?;
//! let row = result.extracted_equation(3, 0)?;
//! ```

mod component;

pub use component::{Component, ComponentBuilder};

use std::sync::Arc;

use daestruct_core::{
    check_index, DaeError, DaeResult, IncidenceMatrix, IndexKind, InflationMap, Solution,
};
use hashbrown::HashSet;
use tracing::debug;

/// Handle of an instance inside its [`CompressionList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Instance {
    component: Arc<Component>,
    q_offset: usize,
    surrogate: usize,
}

/// Full problem recovered from a compressed solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inflated {
    pub matrix: IncidenceMatrix,
    pub rowsol: Vec<usize>,
    pub colsol: Vec<usize>,
    pub cost: i32,
    pub map: InflationMap,
}

/// Instances placed into one outer problem.
#[derive(Debug, Clone, Default)]
pub struct CompressionList {
    instances: Vec<Instance>,
}

impl CompressionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Place `component` with its publics at columns `q_offset..q_offset+q`
    /// and its surrogate at row `surrogate` of the outer problem.
    pub fn instantiate(
        &mut self,
        component: Arc<Component>,
        q_offset: usize,
        surrogate: usize,
    ) -> InstanceId {
        self.instances.push(Instance {
            component,
            q_offset,
            surrogate,
        });
        InstanceId(self.instances.len() - 1)
    }

    fn instance(&self, id: InstanceId) -> DaeResult<&Instance> {
        check_index(IndexKind::Instance, id.0, self.instances.len())?;
        Ok(&self.instances[id.0])
    }

    /// Write the surrogate row of instance `id` into the outer matrix.
    pub fn set_public_parts(&self, matrix: &mut IncidenceMatrix, id: InstanceId) -> DaeResult<()> {
        let instance = self.instance(id)?;
        let q = instance.component.publics();
        check_index(IndexKind::Equation, instance.surrogate, matrix.dimension())?;
        if instance.q_offset + q > matrix.dimension() {
            return Err(DaeError::invalid_index(
                IndexKind::Variable,
                instance.q_offset + q - 1,
                matrix.dimension(),
            ));
        }
        for k in 0..q {
            if let Some(cost) = instance.component.cost(k)? {
                matrix.insert(instance.surrogate, instance.q_offset + k, cost)?;
            }
        }
        Ok(())
    }

    /// Expand every instance of an optimally solved outer problem.
    pub fn inflate(&self, outer: &IncidenceMatrix, solution: &Solution) -> DaeResult<Inflated> {
        let outer_dim = outer.dimension();
        if solution.dimension() != outer_dim {
            return Err(DaeError::DimensionMismatch {
                expected: outer_dim,
                got: solution.dimension(),
            });
        }

        let mut surrogates = HashSet::with_capacity(self.instances.len());
        for instance in &self.instances {
            check_index(IndexKind::Equation, instance.surrogate, outer_dim)?;
            if !surrogates.insert(instance.surrogate) {
                return Err(DaeError::Compression(format!(
                    "row {} is the surrogate of more than one instance",
                    instance.surrogate
                )));
            }
        }

        let extra: usize = self.instances.iter().map(|inst| inst.component.privates()).sum();
        let dimension = outer_dim + extra;
        let mut matrix = IncidenceMatrix::new(dimension);
        let mut rowsol = vec![None; dimension];
        let mut colsol = vec![None; dimension];
        let mut outer_rows = vec![None; outer_dim];

        let mut row = 0;
        for i in 0..outer_dim {
            if surrogates.contains(&i) {
                continue;
            }
            for (j, cost) in outer.row(i) {
                matrix.insert(row, j, cost)?;
            }
            let j = solution.rowsol[i];
            rowsol[row] = Some(j);
            colsol[j] = Some(row);
            outer_rows[i] = Some(row);
            row += 1;
        }

        let mut component_rows = Vec::with_capacity(self.instances.len());
        let mut component_cols = Vec::with_capacity(self.instances.len());
        let mut privates = Vec::with_capacity(self.instances.len());
        let mut col_offset = outer_dim;

        for (n, instance) in self.instances.iter().enumerate() {
            let component = &instance.component;
            let p = component.privates();
            let q = component.publics();

            let matched = solution.rowsol[instance.surrogate];
            let k = matched
                .checked_sub(instance.q_offset)
                .filter(|&k| k < q)
                .ok_or_else(|| {
                    DaeError::Compression(format!(
                        "surrogate row {} of instance {n} is matched to column {matched}, \
                         outside its publics {}..{}",
                        instance.surrogate,
                        instance.q_offset,
                        instance.q_offset + q
                    ))
                })?;
            let internal = component.matching(k)?.ok_or_else(|| {
                DaeError::Compression(format!(
                    "instance {n} cannot solve for public {k}"
                ))
            })?;

            let place = |j: usize| {
                if j < p {
                    col_offset + j
                } else {
                    instance.q_offset + (j - p)
                }
            };
            for &(i, j, cost) in component.incidence() {
                matrix.insert(row + i, place(j), cost)?;
            }
            for (i, &j) in internal.iter().enumerate() {
                let col = place(j);
                rowsol[row + i] = Some(col);
                colsol[col] = Some(row + i);
            }

            component_rows.push(row);
            component_cols.push(col_offset);
            privates.push(p);
            row += p + 1;
            col_offset += p;
        }

        let rowsol = rowsol
            .into_iter()
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| DaeError::Compression("inflated matching leaves rows free".into()))?;
        let colsol = colsol
            .into_iter()
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| DaeError::Compression("inflated matching leaves columns free".into()))?;

        let mut cost = 0;
        for (i, &j) in rowsol.iter().enumerate() {
            cost += matrix.get(i, j).ok_or_else(|| {
                DaeError::Compression(format!("inflated matching uses absent entry ({i}, {j})"))
            })?;
        }

        debug!(
            outer_dimension = outer_dim,
            dimension,
            instances = self.instances.len(),
            cost,
            "compressed problem inflated"
        );

        Ok(Inflated {
            matrix,
            rowsol,
            colsol,
            cost,
            map: InflationMap {
                component_rows,
                component_cols,
                privates,
                outer_rows,
            },
        })
    }
}
