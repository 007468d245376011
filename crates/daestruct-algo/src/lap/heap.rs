//! Indexed 4-ary min-heap with decrease-key.
//!
//! Items are column indices `0..n`; every column appears at most once. Keys
//! compare by distance first and by discovery sequence second. Callers keep a
//! column's sequence number on decrease-key, so columns at equal distance
//! leave the heap in the order they were first discovered.

use std::cmp::Ordering;

const ARITY: usize = 4;
const ABSENT: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeapKey {
    pub dist: i32,
    pub seq: u64,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .cmp(&other.dist)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct IndexedHeap {
    items: Vec<(HeapKey, usize)>,
    position: Vec<usize>,
}

impl IndexedHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            position: vec![ABSENT; capacity],
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, item: usize) -> bool {
        self.position.get(item).is_some_and(|&p| p != ABSENT)
    }

    /// Insert `item`, or lower its key if `key` is smaller. Returns whether
    /// the heap changed.
    pub fn push_or_decrease(&mut self, item: usize, key: HeapKey) -> bool {
        let pos = self.position[item];
        if pos == ABSENT {
            self.items.push((key, item));
            let pos = self.items.len() - 1;
            self.position[item] = pos;
            self.sift_up(pos);
            true
        } else if key < self.items[pos].0 {
            self.items[pos].0 = key;
            self.sift_up(pos);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<(usize, HeapKey)> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.swap(0, last);
        let (key, item) = self.items.pop()?;
        self.position[item] = ABSENT;
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        Some((item, key))
    }

    pub fn clear(&mut self) {
        for &(_, item) in &self.items {
            self.position[item] = ABSENT;
        }
        self.items.clear();
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / ARITY;
            if self.items[pos].0 < self.items[parent].0 {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let first = pos * ARITY + 1;
            let end = (first + ARITY).min(self.items.len());
            let Some(best) = (first..end).min_by_key(|&c| self.items[c].0) else {
                break;
            };
            if self.items[best].0 < self.items[pos].0 {
                self.swap(pos, best);
                pos = best;
            } else {
                break;
            }
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.position[self.items[a].1] = a;
        self.position[self.items[b].1] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn key(dist: i32, seq: u64) -> HeapKey {
        HeapKey { dist, seq }
    }

    #[test]
    fn test_pop_order_breaks_ties_by_sequence() {
        let mut heap = IndexedHeap::new(4);
        heap.push_or_decrease(3, key(1, 0));
        heap.push_or_decrease(0, key(1, 1));
        heap.push_or_decrease(2, key(0, 2));

        assert_eq!(heap.pop().map(|(j, _)| j), Some(2));
        assert_eq!(heap.pop().map(|(j, _)| j), Some(3));
        assert_eq!(heap.pop().map(|(j, _)| j), Some(0));
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_decrease_key() {
        let mut heap = IndexedHeap::new(3);
        heap.push_or_decrease(0, key(5, 0));
        heap.push_or_decrease(1, key(3, 1));
        assert!(heap.push_or_decrease(0, key(1, 2)));
        assert!(!heap.push_or_decrease(1, key(4, 3)));
        assert!(heap.contains(0));
        assert!(!heap.contains(2));

        assert_eq!(heap.pop(), Some((0, key(1, 2))));
        assert_eq!(heap.len(), 1);
        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(1));
    }

    #[test]
    fn test_random_heap_sorts() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 200;
        let mut heap = IndexedHeap::new(n);
        let mut best = vec![i32::MAX; n];
        for seq in 0..1000u64 {
            let item = rng.gen_range(0..n);
            let dist = rng.gen_range(-50..50);
            if heap.push_or_decrease(item, key(dist, seq)) {
                best[item] = dist;
            }
        }

        let mut last = i32::MIN;
        while let Some((item, k)) = heap.pop() {
            assert!(k.dist >= last);
            assert_eq!(k.dist, best[item]);
            last = k.dist;
        }
    }
}
