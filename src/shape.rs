//! # Array Shapes
//!
//! `Shape` describes the extents of an n-dimensional array cell. Scientific
//! columns are almost always rank 1 to 4 (spectra, visibility matrices,
//! image cubes), so extents live inline in a `SmallVec` and only spill to
//! the heap for unusually deep shapes.
//!
//! A shape is an ordered list of non-negative extents. Two cells *conform*
//! when their shapes are equal element for element; conformance is what a
//! fixed-shape column enforces on every put.
//!
//! A [`Slicer`] selects a regular sub-array of a shaped cell: one
//! [`Slice`] per axis, each giving a start, a length, and a stride along
//! that axis. Stride 1 selects a contiguous run; larger strides pick every
//! n-th element.

use eyre::{ensure, Result};
use smallvec::SmallVec;
use std::fmt;

/// Extents of an n-dimensional array cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(SmallVec<[u64; 4]>);

impl Shape {
    pub fn new(dims: &[u64]) -> Self {
        Shape(SmallVec::from_slice(dims))
    }

    /// Shape of a scalar-like cell (rank 0, one element).
    pub fn empty() -> Self {
        Shape(SmallVec::new())
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[u64] {
        &self.0
    }

    /// Total number of elements a cell of this shape holds.
    ///
    /// The product saturates instead of wrapping so that a corrupt shape
    /// read from disk cannot alias a small allocation.
    pub fn cell_count(&self) -> u64 {
        self.0
            .iter()
            .fold(1u64, |acc, &d| acc.saturating_mul(d))
    }

    pub fn conforms(&self, other: &Shape) -> bool {
        self == other
    }
}

/// Selection along one axis: `length` elements starting at `start`,
/// `stride` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    start: u64,
    length: u64,
    stride: u64,
}

impl Slice {
    /// Contiguous run of `length` elements starting at `start`.
    pub fn new(start: u64, length: u64) -> Self {
        Slice {
            start,
            length,
            stride: 1,
        }
    }

    /// Strided selection: every `stride`-th element. The stride must be at
    /// least 1.
    pub fn strided(start: u64, length: u64, stride: u64) -> Result<Self> {
        ensure!(stride >= 1, "slice stride must be at least 1");
        Ok(Slice {
            start,
            length,
            stride,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Index of the last selected element, if any element is selected.
    fn last(&self) -> Option<u64> {
        if self.length == 0 {
            None
        } else {
            // saturate so absurd selections fail the bounds check instead
            // of wrapping past it
            Some(
                self.start
                    .saturating_add((self.length - 1).saturating_mul(self.stride)),
            )
        }
    }
}

/// An n-dimensional selection, one [`Slice`] per axis of the source array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slicer(SmallVec<[Slice; 4]>);

impl Slicer {
    pub fn new(axes: &[Slice]) -> Self {
        Slicer(SmallVec::from_slice(axes))
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn axes(&self) -> &[Slice] {
        &self.0
    }

    /// Shape of the selected sub-array (the per-axis lengths).
    pub fn shape(&self) -> Shape {
        Shape(self.0.iter().map(|s| s.length).collect())
    }

    /// Validates this selection against a source shape: the ranks must
    /// match and every axis must stay within its extent.
    pub fn check(&self, source: &Shape) -> Result<()> {
        ensure!(
            self.ndim() == source.ndim(),
            "slicer of rank {} does not match array of rank {}",
            self.ndim(),
            source.ndim()
        );
        for (axis, (slice, &dim)) in self.0.iter().zip(source.dims()).enumerate() {
            if let Some(last) = slice.last() {
                ensure!(
                    last < dim,
                    "slice on axis {} reaches index {}, extent is {}",
                    axis,
                    last,
                    dim
                );
            }
        }
        Ok(())
    }
}

impl From<&[u64]> for Shape {
    fn from(dims: &[u64]) -> Self {
        Shape::new(dims)
    }
}

impl<const N: usize> From<[u64; N]> for Shape {
    fn from(dims: [u64; N]) -> Self {
        Shape::new(&dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_is_product_of_extents() {
        assert_eq!(Shape::from([3, 4]).cell_count(), 12);
        assert_eq!(Shape::from([2, 3, 4]).cell_count(), 24);
        assert_eq!(Shape::empty().cell_count(), 1);
        assert_eq!(Shape::from([5, 0]).cell_count(), 0);
    }

    #[test]
    fn cell_count_saturates_on_huge_extents() {
        let s = Shape::from([u64::MAX, 2]);
        assert_eq!(s.cell_count(), u64::MAX);
    }

    #[test]
    fn conformance_is_exact_equality() {
        assert!(Shape::from([3, 4]).conforms(&Shape::from([3, 4])));
        assert!(!Shape::from([3, 4]).conforms(&Shape::from([4, 3])));
        assert!(!Shape::from([3, 4]).conforms(&Shape::from([3, 4, 1])));
    }

    #[test]
    fn slicer_shape_is_the_per_axis_lengths() {
        let s = Slicer::new(&[Slice::new(1, 2), Slice::strided(0, 3, 2).unwrap()]);
        assert_eq!(s.shape(), Shape::from([2, 3]));
        assert!(s.check(&Shape::from([3, 6])).is_ok());
    }

    #[test]
    fn slicer_bounds_are_checked_per_axis() {
        // axis 1 reaches index 0 + 2*2 = 4, extent is 4
        let s = Slicer::new(&[Slice::new(0, 3), Slice::strided(0, 3, 2).unwrap()]);
        let err = s.check(&Shape::from([3, 4])).unwrap_err();
        assert!(err.to_string().contains("axis 1"));
        // rank mismatch
        assert!(s.check(&Shape::from([3])).is_err());
        // zero-length axes select nothing and are always in bounds
        let empty = Slicer::new(&[Slice::new(5, 0)]);
        assert!(empty.check(&Shape::from([2])).is_ok());
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert!(Slice::strided(0, 2, 0).is_err());
    }

    #[test]
    fn display_formats_extents() {
        assert_eq!(Shape::from([3, 4]).to_string(), "[3,4]");
        assert_eq!(Shape::empty().to_string(), "[]");
    }
}
