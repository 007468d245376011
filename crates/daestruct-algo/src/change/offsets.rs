//! Step-function index remapping across deletions.
//!
//! Deleting index `k` shifts every later index down by one. The resulting
//! map is piecewise constant, so it is stored as interval starts and the
//! shift valid from there on:
//!
//! ```text
//! deleted = {1, 4}
//!
//! old:   0  1  2  3  4  5  6
//! new:   0  -  1  2  -  3  4
//!
//! intervals: 0 => 0, 2 => 1, 5 => 2
//! ```

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetMap {
    /// First old index of an interval => number of deletions before it
    shifts: BTreeMap<usize, usize>,
    deleted: BTreeSet<usize>,
    /// Old index space size
    bound: usize,
}

impl OffsetMap {
    /// Build the map for `bound` old indices with `deleted` removed.
    ///
    /// Indices in `deleted` must be `< bound`; callers validate beforehand.
    pub fn new(bound: usize, deleted: &BTreeSet<usize>) -> Self {
        let mut shifts = BTreeMap::new();
        shifts.insert(0, 0);
        for (count, &k) in deleted.iter().enumerate() {
            shifts.insert(k + 1, count + 1);
        }
        Self {
            shifts,
            deleted: deleted.clone(),
            bound,
        }
    }

    /// New index of old index `old`; `None` if it was deleted or out of range.
    pub fn map(&self, old: usize) -> Option<usize> {
        if old >= self.bound || self.deleted.contains(&old) {
            return None;
        }
        let (_, &shift) = self.shifts.range(..=old).next_back()?;
        Some(old - shift)
    }

    /// Number of indices that survive.
    pub fn surviving(&self) -> usize {
        self.bound - self.deleted.len()
    }

    pub fn is_deleted(&self, old: usize) -> bool {
        self.deleted.contains(&old)
    }

    pub fn bound(&self) -> usize {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_without_deletions() {
        let map = OffsetMap::new(4, &BTreeSet::new());
        let mapped: Vec<_> = (0..4).map(|i| map.map(i)).collect();
        assert_eq!(mapped, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(map.map(4), None);
        assert_eq!(map.surviving(), 4);
    }

    #[test]
    fn test_offsets_step_function() {
        let deleted: BTreeSet<usize> = [1, 4].into_iter().collect();
        let map = OffsetMap::new(7, &deleted);
        let mapped: Vec<_> = (0..7).map(|i| map.map(i)).collect();
        assert_eq!(mapped, vec![Some(0), None, Some(1), Some(2), None, Some(3), Some(4)]);
        assert_eq!(map.surviving(), 5);
        assert!(map.is_deleted(4));
    }

    #[test]
    fn test_adjacent_deletions() {
        let deleted: BTreeSet<usize> = [0, 1, 2].into_iter().collect();
        let map = OffsetMap::new(5, &deleted);
        assert_eq!(map.map(3), Some(0));
        assert_eq!(map.map(4), Some(1));
        assert_eq!(map.map(2), None);
    }
}
