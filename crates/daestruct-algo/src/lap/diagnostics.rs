//! Singularity diagnostics.
//!
//! When the assignment solver cannot complete a perfect matching, the error
//! reports the structural rank of the Σ-matrix and a set of equations left
//! unmatched by one maximum matching. The bipartite equation/variable graph
//! is handed to petgraph's maximum matching.

use daestruct_core::{DaeError, IncidenceMatrix};
use petgraph::algo::maximum_matching;
use petgraph::graph::{NodeIndex, UnGraph};

/// Structural rank and unmatched equations of `matrix`.
pub fn structural_rank(matrix: &IncidenceMatrix) -> (usize, Vec<usize>) {
    let n = matrix.dimension();
    let mut graph = UnGraph::<(), ()>::with_capacity(2 * n, matrix.nnz());
    for _ in 0..2 * n {
        graph.add_node(());
    }
    for (i, j, _) in matrix.iter() {
        graph.add_edge(NodeIndex::new(i), NodeIndex::new(n + j), ());
    }

    let matching = maximum_matching(&graph);
    let unmatched = (0..n)
        .filter(|&i| matching.mate(NodeIndex::new(i)).is_none())
        .collect();
    (matching.len(), unmatched)
}

/// Build the [`DaeError::StructuralSingularity`] for `matrix`.
pub fn singularity(matrix: &IncidenceMatrix) -> DaeError {
    let (structural_rank, unmatched_equations) = structural_rank(matrix);
    tracing::warn!(
        dimension = matrix.dimension(),
        structural_rank,
        unmatched = unmatched_equations.len(),
        "structurally singular system"
    );
    DaeError::StructuralSingularity {
        dimension: matrix.dimension(),
        structural_rank,
        unmatched_equations,
    }
}
