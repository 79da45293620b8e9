//! Array-backed binary min-heap keyed by a caller-supplied score function.
//!
//! Unlike [`std::collections::BinaryHeap`], elements can be removed or
//! repositioned in place after their score changed externally. Membership is
//! found by a linear identity scan (`PartialEq`), which keeps the structure
//! small; it is meant for open lists of grid searches, not for graphs with
//! millions of live entries.

/// Min-heap ordered by `score(element)`.
///
/// Comparisons are strict (`<`), so among equal scores an element never
/// overtakes one that was already above it.
pub struct ScoredHeap<T, F> {
    nodes: Vec<T>,
    score: F,
}

impl<T, F> ScoredHeap<T, F>
where
    F: Fn(&T) -> f64,
{
    /// Create an empty heap ordered by `score`.
    pub fn new(score: F) -> Self {
        Self {
            nodes: Vec::new(),
            score,
        }
    }

    /// Create an empty heap with room for `capacity` elements.
    pub fn with_capacity(capacity: usize, score: F) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            score,
        }
    }

    /// Number of elements in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the heap is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The element with the lowest score, if any.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.nodes.first()
    }

    /// Iterate over the elements in heap (not sorted) order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.nodes.iter()
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Push an element and restore the heap property.
    pub fn push(&mut self, item: T) {
        self.nodes.push(item);
        let last = self.nodes.len() - 1;
        self.bubble(last);
    }

    /// Remove and return the element with the lowest score.
    pub fn pop(&mut self) -> Option<T> {
        if self.nodes.is_empty() {
            return None;
        }
        let root = self.nodes.swap_remove(0);
        if !self.nodes.is_empty() {
            self.sink(0);
        }
        Some(root)
    }

    /// Remove the element at heap index `i`.
    ///
    /// The last element takes its slot and may have to move either way.
    fn remove_at(&mut self, i: usize) -> T {
        let item = self.nodes.swap_remove(i);
        if i < self.nodes.len() {
            let i = self.bubble(i);
            self.sink(i);
        }
        item
    }

    /// Move the element at `n` up while it scores lower than its parent.
    /// Returns its final index.
    fn bubble(&mut self, mut n: usize) -> usize {
        while n > 0 {
            let m = (n + 1) / 2 - 1;
            if (self.score)(&self.nodes[n]) >= (self.score)(&self.nodes[m]) {
                break;
            }
            self.nodes.swap(n, m);
            n = m;
        }
        n
    }

    /// Move the element at `n` down while a child scores lower.
    fn sink(&mut self, mut n: usize) {
        let len = self.nodes.len();
        loop {
            let r = (n + 1) * 2;
            let l = r - 1;
            let mut best = n;
            let mut best_score = (self.score)(&self.nodes[n]);
            if l < len {
                let s = (self.score)(&self.nodes[l]);
                if s < best_score {
                    best = l;
                    best_score = s;
                }
            }
            if r < len && (self.score)(&self.nodes[r]) < best_score {
                best = r;
            }
            if best == n {
                break;
            }
            self.nodes.swap(n, best);
            n = best;
        }
    }
}

impl<T, F> ScoredHeap<T, F>
where
    T: PartialEq,
    F: Fn(&T) -> f64,
{
    /// Heap index of the element equal to `item`.
    fn position(&self, item: &T) -> Option<usize> {
        self.nodes.iter().position(|n| n == item)
    }

    /// Whether an element equal to `item` is in the heap.
    pub fn contains(&self, item: &T) -> bool {
        self.position(item).is_some()
    }

    /// Remove the element equal to `item`. Absent elements are ignored.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let i = self.position(item)?;
        Some(self.remove_at(i))
    }

    /// Replace the element equal to `item` and move it to its new position,
    /// or push `item` if no such element exists.
    pub fn update(&mut self, item: T) {
        match self.position(&item) {
            Some(i) => {
                self.nodes[i] = item;
                let i = self.bubble(i);
                self.sink(i);
            }
            None => self.push(item),
        }
    }
}

impl<T, F> std::fmt::Debug for ScoredHeap<T, F>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoredHeap")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}
