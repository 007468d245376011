//! Shortest augmenting path phase.
//!
//! Dijkstra over reduced costs `σ(i,j) - u[i] - v[j]`, started from a single
//! free row. Columns are labelled with their distance; the search stops at
//! the first unassigned column it pops. Potentials of every column scanned
//! before that are raised so that reduced costs stay non-negative, and the
//! matching is flipped along the predecessor path.

use daestruct_core::{DaeError, DaeResult, IncidenceMatrix};

use super::heap::{HeapKey, IndexedHeap};

/// Result of one augmentation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Augment {
    /// The start row is now matched
    Augmented,
    /// No path to a free column exists
    Exhausted,
}

/// Scratch buffers reused across augmentations of the same dimension.
#[derive(Debug, Clone)]
pub(crate) struct Augmenter {
    heap: IndexedHeap,
    dist: Vec<Option<i32>>,
    /// Discovery order of each labelled column; kept across decrease-key
    discovered: Vec<u64>,
    pred: Vec<usize>,
    scanned: Vec<bool>,
    ready: Vec<usize>,
    touched: Vec<usize>,
}

impl Augmenter {
    pub fn new(dimension: usize) -> Self {
        Self {
            heap: IndexedHeap::new(dimension),
            dist: vec![None; dimension],
            discovered: vec![0; dimension],
            pred: vec![0; dimension],
            scanned: vec![false; dimension],
            ready: Vec::with_capacity(dimension),
            touched: Vec::with_capacity(dimension),
        }
    }

    fn reset(&mut self) {
        for &j in &self.touched {
            self.dist[j] = None;
            self.scanned[j] = false;
        }
        self.touched.clear();
        self.ready.clear();
        self.heap.clear();
    }

    fn label(&mut self, j: usize, dist: i32, pred: usize, seq: &mut u64) {
        if self.dist[j].map_or(true, |d| dist < d) {
            if self.dist[j].is_none() {
                self.touched.push(j);
                self.discovered[j] = *seq;
                *seq += 1;
            }
            self.dist[j] = Some(dist);
            self.pred[j] = pred;
            let seq = self.discovered[j];
            self.heap.push_or_decrease(j, HeapKey { dist, seq });
        }
    }

    /// Find a shortest augmenting path from the free row `start` and flip it.
    ///
    /// `v` must satisfy `σ(i,j) - v[j] >= σ(i,rowsol[i]) - v[rowsol[i]]` for
    /// every assigned row `i`. On [`Augment::Exhausted`] neither the
    /// potentials nor the matching are touched.
    pub fn augment(
        &mut self,
        matrix: &IncidenceMatrix,
        v: &mut [i32],
        start: usize,
        rowsol: &mut [Option<usize>],
        colsol: &mut [Option<usize>],
    ) -> DaeResult<Augment> {
        self.reset();
        let mut seq = 0u64;

        for (j, cost) in matrix.row(start) {
            self.label(j, cost - v[j], start, &mut seq);
        }

        let mut end = None;
        let mut min = 0;
        while let Some((j, key)) = self.heap.pop() {
            self.scanned[j] = true;
            min = key.dist;

            let Some(i) = colsol[j] else {
                end = Some(j);
                break;
            };
            self.ready.push(j);

            let h = matrix.get(i, j).ok_or_else(|| {
                DaeError::InconsistentAssignment(format!(
                    "row {i} is matched to column {j} without an incidence"
                ))
            })? - v[j];
            for (k, cost) in matrix.row(i) {
                if self.scanned[k] {
                    continue;
                }
                self.label(k, min + cost - v[k] - h, i, &mut seq);
            }
        }

        let Some(mut j) = end else {
            return Ok(Augment::Exhausted);
        };

        for &k in &self.ready {
            if let Some(d) = self.dist[k] {
                v[k] += d - min;
            }
        }

        loop {
            let i = self.pred[j];
            colsol[j] = Some(i);
            let previous = rowsol[i].replace(j);
            match previous {
                Some(next) if i != start => j = next,
                _ => break,
            }
        }
        Ok(Augment::Augmented)
    }
}
