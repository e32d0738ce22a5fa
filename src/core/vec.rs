//! Distributed vector storage used by all evaluation operations.

use nalgebra::{DVector, RealField};

use super::descriptor::ProcGroup;

/// Length and partition identity of a distributed vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecLayout {
    len: usize,
    group: ProcGroup,
}

impl VecLayout {
    /// Creates a layout of given local length over the given group.
    pub fn new(group: &ProcGroup, len: usize) -> Self {
        Self {
            len,
            group: group.clone(),
        }
    }

    /// Local length of vectors with this layout.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the layout has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The process group the layout belongs to.
    pub fn group(&self) -> &ProcGroup {
        &self.group
    }
}

/// A process-partitioned vector of scalars.
///
/// This is the serial realization of the distributed vector capability:
/// it stores the local part of the vector, and since the only
/// constructible [`ProcGroup`] is the single-process one, the reductions
/// ([`dot`](DistVec::dot), [`norm`](DistVec::norm),
/// [`max_abs`](DistVec::max_abs)) over the local values are the global
/// ones. A multi-process realization is an external collaborator that
/// performs its global reductions outside this crate.
///
/// Arithmetic between two vectors is well defined only when their layouts
/// are [`compatible`](DistVec::compatible): same length and same group.
/// The operations here debug-assert compatibility; full error reporting at
/// the evaluation boundary is the job of [`Checked`](crate::Checked).
#[derive(Debug, Clone, PartialEq)]
pub struct DistVec<T: RealField + Copy> {
    layout: VecLayout,
    values: DVector<T>,
}

impl<T: RealField + Copy> DistVec<T> {
    /// Creates a zero-initialized vector of given local length over the
    /// given group.
    pub fn zeros(group: &ProcGroup, len: usize) -> Self {
        Self {
            layout: VecLayout::new(group, len),
            values: DVector::zeros(len),
        }
    }

    /// Local length of the vector.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    /// Whether the local part is empty.
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// The layout of the vector.
    pub fn layout(&self) -> &VecLayout {
        &self.layout
    }

    /// Whether arithmetic between `self` and `other` is well defined.
    pub fn compatible(&self, other: &Self) -> bool {
        self.layout == other.layout
    }

    /// The local values.
    pub fn values(&self) -> &[T] {
        self.values.as_slice()
    }

    /// The local values, mutably.
    pub fn values_mut(&mut self) -> &mut [T] {
        self.values.as_mut_slice()
    }

    /// Sets all local values to `value`.
    pub fn fill(&mut self, value: T) {
        self.values.fill(value);
    }

    /// Sets all local values to zero.
    pub fn set_zero(&mut self) {
        self.fill(T::zero());
    }

    /// Copies the values of `other` into `self`.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert!(self.compatible(other), "incompatible vector layouts");
        self.values.copy_from(&other.values);
    }

    /// Computes `self += alpha * x`.
    pub fn axpy(&mut self, alpha: T, x: &Self) {
        debug_assert!(self.compatible(x), "incompatible vector layouts");
        self.values.axpy(alpha, &x.values, T::one());
    }

    /// Scales the vector by `alpha`.
    pub fn scale(&mut self, alpha: T) {
        self.values *= alpha;
    }

    /// Computes the inner product with `other` over the local values; for
    /// the serial group this is the global inner product.
    pub fn dot(&self, other: &Self) -> T {
        debug_assert!(self.compatible(other), "incompatible vector layouts");
        self.values.dot(&other.values)
    }

    /// Computes the Euclidean norm of the local values; for the serial
    /// group this is the global norm.
    pub fn norm(&self) -> T {
        self.values.norm()
    }

    /// Computes the maximum absolute value of the local values; for the
    /// serial group this is the global maximum.
    pub fn max_abs(&self) -> T {
        self.values
            .iter()
            .fold(T::zero(), |acc, v| acc.max(v.abs()))
    }
}
