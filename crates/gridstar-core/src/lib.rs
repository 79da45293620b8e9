//! **gridstar-core** — foundational types shared by the gridstar crates.
//!
//! This crate provides grid geometry (points, bounds and torus wrapping) and
//! [`ScoredHeap`], the priority queue driving the searches in
//! `gridstar-paths`.

pub mod geom;
pub mod heap;

pub use geom::{Point, Range, RangeIter};
pub use heap::ScoredHeap;
