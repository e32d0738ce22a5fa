//! Block-structured sparse constraint algebra.

use std::ops::Range;

use nalgebra::{DMatrix, RealField};

use super::descriptor::ProblemSizes;
use super::problem::Problem;
use super::vec::DistVec;

/// Block-diagonal accumulator for `J(x) diag(c) J(x)^T` terms.
///
/// The sparse constraint rows are partitioned into contiguous blocks of
/// `nwblock` rows (last block possibly partial), and only the
/// corresponding diagonal blocks of the matrix are stored. Cross terms
/// between blocks have no storage, so they can never be written; this is
/// what makes the normal-equations term of the sparse constraints cheap to
/// invert block by block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDiag<T: RealField + Copy> {
    nwcon: usize,
    nwblock: usize,
    blocks: Vec<DMatrix<T>>,
}

impl<T: RealField + Copy> BlockDiag<T> {
    /// Creates a zero-initialized accumulator with the block structure of
    /// the given dimension quadruple.
    pub fn zeros(sizes: ProblemSizes) -> Self {
        let blocks = (0..sizes.num_blocks())
            .map(|k| {
                let n = sizes.block_range(k).len();
                DMatrix::zeros(n, n)
            })
            .collect();

        Self {
            nwcon: sizes.nwcon(),
            nwblock: sizes.nwblock(),
            blocks,
        }
    }

    /// The sparse constraint count the accumulator was sized for.
    pub fn nwcon(&self) -> usize {
        self.nwcon
    }

    /// The block size the accumulator was sized for.
    pub fn nwblock(&self) -> usize {
        self.nwblock
    }

    /// Number of diagonal blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// All diagonal blocks in order.
    pub fn blocks(&self) -> &[DMatrix<T>] {
        &self.blocks
    }

    /// Diagonal block `k`.
    pub fn block(&self, k: usize) -> &DMatrix<T> {
        &self.blocks[k]
    }

    /// Diagonal block `k`, mutably.
    pub fn block_mut(&mut self, k: usize) -> &mut DMatrix<T> {
        &mut self.blocks[k]
    }

    /// Global row range owned by block `k`.
    pub fn block_range(&self, k: usize) -> Range<usize> {
        let start = k * self.nwblock;
        start..self.nwcon.min(start + self.nwblock)
    }
}

/// The block-structured sparse constraint contract.
///
/// The sparse constraints `sw(x)` form a vector of length `nwcon` whose
/// Jacobian `J(x)` (`nwcon` rows by `nvars` columns) is row sparse. The
/// Jacobian is never materialized; the contract exposes it through its
/// action on vectors.
///
/// The operations are infallible, mirroring the residual/Jacobian calls of
/// the evaluation model they come from; argument validation at the
/// boundary is performed by [`Checked`](crate::Checked).
pub trait SparseConstraints: Problem {
    /// Writes the sparse constraint residuals at `x` into `out`.
    ///
    /// Overwrite semantics: any previous content of `out` is discarded.
    fn eval_sparse_con(&self, x: &DistVec<Self::Field>, out: &mut DistVec<Self::Field>);

    /// Computes `out += alpha * J(x) * px`.
    ///
    /// Accumulate semantics: callers may invoke this repeatedly to sum
    /// contributions into `out`.
    fn add_sparse_jacobian(
        &self,
        alpha: Self::Field,
        x: &DistVec<Self::Field>,
        px: &DistVec<Self::Field>,
        out: &mut DistVec<Self::Field>,
    );

    /// Computes `out += alpha * J(x)^T * pzw`, mapping a sparse constraint
    /// space vector back to design space.
    ///
    /// Accumulate semantics. Must be the exact adjoint of
    /// [`add_sparse_jacobian`](SparseConstraints::add_sparse_jacobian):
    /// for any `px` and `pzw`, `pzw . (J px) == (J^T pzw) . px` up to
    /// floating point roundoff.
    fn add_sparse_jacobian_transpose(
        &self,
        alpha: Self::Field,
        x: &DistVec<Self::Field>,
        pzw: &DistVec<Self::Field>,
        out: &mut DistVec<Self::Field>,
    );

    /// Accumulates `alpha * J(x) diag(cvec) J(x)^T` into `a`.
    ///
    /// Only the declared diagonal blocks of `a` are touched; the block
    /// structure guarantees that cross terms between different blocks are
    /// never written.
    fn add_sparse_inner_product(
        &self,
        alpha: Self::Field,
        x: &DistVec<Self::Field>,
        cvec: &DistVec<Self::Field>,
        a: &mut BlockDiag<Self::Field>,
    );
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::core::Evaluation;
    use crate::testing::{check_sparse_adjoint, BlockQuadratic};

    #[test]
    fn block_structure() {
        let sizes = ProblemSizes::new(10, 0, 7, 3).unwrap();
        let a = BlockDiag::<f64>::zeros(sizes);

        assert_eq!(a.num_blocks(), 3);
        assert_eq!(a.block(0).nrows(), 3);
        assert_eq!(a.block(2).nrows(), 1);
        assert_eq!(a.block_range(1), 3..6);
        assert_eq!(a.block_range(2), 6..7);
    }

    #[test]
    fn jacobian_adjointness() {
        let problem = BlockQuadratic::new(10, 2, 4, 2);
        let mut rng = fastrand::Rng::with_seed(17);

        let mut x = problem.create_design_vec();
        let mut lb = problem.create_design_vec();
        let mut ub = problem.create_design_vec();
        problem.vars_and_bounds(&mut x, &mut lb, &mut ub);

        for _ in 0..5 {
            assert!(check_sparse_adjoint(&problem, &x, &mut rng, 1e-10));
        }
    }

    #[test]
    fn inner_product_touches_only_declared_blocks() {
        let problem = BlockQuadratic::new(10, 2, 4, 2);

        let mut x = problem.create_design_vec();
        let mut lb = problem.create_design_vec();
        let mut ub = problem.create_design_vec();
        problem.vars_and_bounds(&mut x, &mut lb, &mut ub);

        let mut cvec = problem.create_design_vec();
        cvec.fill(1.0);

        let sizes = problem.descriptor().sizes();
        let mut a = BlockDiag::zeros(sizes);
        problem.add_sparse_inner_product(1.0, &x, &cvec, &mut a);

        // Build the dense Jacobian column by column through the forward
        // product and compare each diagonal block against J_b * J_b^T.
        let nvars = sizes.nvars();
        let nwcon = sizes.nwcon();
        let mut jac = DMatrix::zeros(nwcon, nvars);

        for j in 0..nvars {
            let mut e = problem.create_design_vec();
            e.values_mut()[j] = 1.0;

            let mut col = problem.create_constraint_vec();
            problem.add_sparse_jacobian(1.0, &x, &e, &mut col);

            for i in 0..nwcon {
                jac[(i, j)] = col.values()[i];
            }
        }

        let jjt = &jac * jac.transpose();

        for k in 0..a.num_blocks() {
            let range = a.block_range(k);
            let expected = jjt.view((range.start, range.start), (range.len(), range.len()));
            assert_relative_eq!(a.block(k), &expected.into_owned(), max_relative = 1e-12);
        }

        // Accumulation only touches declared blocks: off-block entries of
        // the normal equations term must be zero for this block partition.
        for i in 0..nwcon {
            for j in 0..nwcon {
                if i / sizes.nwblock() != j / sizes.nwblock() {
                    assert_eq!(jjt[(i, j)], 0.0);
                }
            }
        }

        // Accumulate semantics: a second call doubles every block.
        let snapshot = a.clone();
        problem.add_sparse_inner_product(1.0, &x, &cvec, &mut a);
        for k in 0..a.num_blocks() {
            assert_relative_eq!(
                a.block(k),
                &(snapshot.block(k) * 2.0),
                max_relative = 1e-12
            );
        }
    }
}
