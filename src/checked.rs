//! Validating adapter enforcing the call contract at operation boundaries.
//!
//! The raw [`Evaluation`] and [`SparseConstraints`] traits carry the
//! numerical semantics and trust their arguments, exactly like the
//! evaluation model they come from. [`Checked`] is the surface an
//! optimizer drives instead: it validates every vector and slice argument
//! against the problem descriptor, tracks the initialization handshake,
//! and turns contract violations into distinct [`EvalError`] kinds rather
//! than letting them corrupt distributed state.

use log::{debug, trace};

use crate::core::{
    BlockDiag, DistVec, EvalError, Evaluation, HessianDiag, Problem, ProblemSizes,
    SparseConstraints,
};

/// A problem wrapper that validates the call contract.
///
/// All calls are synchronous and non-reentrant by contract; the adapter
/// holds no locks. See the [module docs](self) for the overall picture and
/// the crate docs for a usage example.
#[derive(Debug)]
pub struct Checked<P> {
    problem: P,
    initialized: bool,
}

impl<P> Checked<P> {
    /// Wraps a problem. The wrapper starts uninitialized; every evaluation
    /// before [`vars_and_bounds`](Checked::vars_and_bounds) fails with
    /// [`EvalError::Uninitialized`].
    pub fn new(problem: P) -> Self {
        Self {
            problem,
            initialized: false,
        }
    }

    /// Gets a reference to the wrapped problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Unwraps the problem.
    pub fn into_inner(self) -> P {
        self.problem
    }

    /// Whether [`vars_and_bounds`](Checked::vars_and_bounds) has completed
    /// since construction or the last [`resize`](Checked::resize).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl<P: Problem> Checked<P> {
    /// Atomically replaces the problem's dimension quadruple.
    ///
    /// The resize is treated as a reinitialization:
    /// [`vars_and_bounds`](Checked::vars_and_bounds) must complete again
    /// before any evaluation, and vectors sized by the old dimensions fail
    /// the boundary checks as soon as their length no longer matches.
    /// Every process of the group must perform the same resize.
    pub fn resize(&mut self, sizes: ProblemSizes) {
        debug!("replacing problem sizes with {:?}", sizes);
        self.problem.descriptor_mut().resize(sizes);
        self.initialized = false;
    }

    fn check_init(&self) -> Result<(), EvalError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EvalError::Uninitialized)
        }
    }

    fn check_vec(
        &self,
        arg: &'static str,
        vec: &DistVec<P::Field>,
        expected: usize,
    ) -> Result<(), EvalError> {
        if vec.len() != expected {
            return Err(EvalError::Dimension {
                arg,
                expected,
                found: vec.len(),
            });
        }

        if vec.layout().group() != self.problem.descriptor().group() {
            return Err(EvalError::GroupMismatch { arg });
        }

        Ok(())
    }

    fn check_design(&self, arg: &'static str, vec: &DistVec<P::Field>) -> Result<(), EvalError> {
        self.check_vec(arg, vec, self.problem.descriptor().sizes().nvars())
    }

    fn check_sparse(&self, arg: &'static str, vec: &DistVec<P::Field>) -> Result<(), EvalError> {
        self.check_vec(arg, vec, self.problem.descriptor().sizes().nwcon())
    }

    fn check_dense(&self, arg: &'static str, slice: &[P::Field]) -> Result<(), EvalError> {
        let expected = self.problem.descriptor().sizes().ncon();

        if slice.len() != expected {
            Err(EvalError::Dimension {
                arg,
                expected,
                found: slice.len(),
            })
        } else {
            Ok(())
        }
    }
}

impl<P: Evaluation> Checked<P> {
    /// Fills the initial design point and bounds and completes the
    /// initialization handshake. See [`Evaluation::vars_and_bounds`].
    pub fn vars_and_bounds(
        &mut self,
        x: &mut DistVec<P::Field>,
        lb: &mut DistVec<P::Field>,
        ub: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_design("x", x)?;
        self.check_design("lb", lb)?;
        self.check_design("ub", ub)?;

        self.problem.vars_and_bounds(x, lb, ub);
        self.initialized = true;
        Ok(())
    }

    /// Checked [`Evaluation::eval_obj_con`].
    pub fn eval_obj_con(
        &self,
        x: &DistVec<P::Field>,
        cons: &mut [P::Field],
    ) -> Result<P::Field, EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_dense("cons", cons)?;

        self.problem.eval_obj_con(x, cons).map_err(|error| {
            trace!("objective/constraint evaluation failed: {}", error);
            error
        })
    }

    /// Checked [`Evaluation::eval_obj_con_gradient`].
    pub fn eval_obj_con_gradient(
        &self,
        x: &DistVec<P::Field>,
        g: &mut DistVec<P::Field>,
        ac: &mut [DistVec<P::Field>],
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_design("g", g)?;

        let ncon = self.problem.descriptor().sizes().ncon();
        if ac.len() != ncon {
            return Err(EvalError::Dimension {
                arg: "ac",
                expected: ncon,
                found: ac.len(),
            });
        }
        for vec in ac.iter() {
            self.check_design("ac", vec)?;
        }

        self.problem.eval_obj_con_gradient(x, g, ac).map_err(|error| {
            trace!("gradient evaluation failed: {}", error);
            error
        })
    }

    /// Checked [`Evaluation::eval_hvec_product`].
    pub fn eval_hvec_product(
        &self,
        x: &DistVec<P::Field>,
        z: &[P::Field],
        zw: &DistVec<P::Field>,
        px: &DistVec<P::Field>,
        hvec: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_dense("z", z)?;
        self.check_sparse("zw", zw)?;
        self.check_design("px", px)?;
        self.check_design("hvec", hvec)?;

        self.problem
            .eval_hvec_product(x, z, zw, px, hvec)
            .map_err(|error| {
                trace!("Hessian-vector product failed: {}", error);
                error
            })
    }

    /// Checked [`Evaluation::eval_hessian_diag`].
    pub fn eval_hessian_diag(
        &self,
        x: &DistVec<P::Field>,
        z: &[P::Field],
        zw: &DistVec<P::Field>,
        hdiag: &mut DistVec<P::Field>,
    ) -> Result<HessianDiag, EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_dense("z", z)?;
        self.check_sparse("zw", zw)?;
        self.check_design("hdiag", hdiag)?;

        self.problem.eval_hessian_diag(x, z, zw, hdiag)
    }

    /// Checked [`Evaluation::setup_hessian_precon`].
    pub fn setup_hessian_precon(
        &mut self,
        x: &DistVec<P::Field>,
        z: &[P::Field],
        zw: &DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_dense("z", z)?;
        self.check_sparse("zw", zw)?;

        self.problem.setup_hessian_precon(x, z, zw)
    }

    /// Checked [`Evaluation::apply_hessian_precon`].
    pub fn apply_hessian_precon(
        &self,
        x: &DistVec<P::Field>,
        z: &[P::Field],
        zw: &DistVec<P::Field>,
        input: &DistVec<P::Field>,
        out: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_dense("z", z)?;
        self.check_sparse("zw", zw)?;
        self.check_design("input", input)?;
        self.check_design("out", out)?;

        self.problem.apply_hessian_precon(x, z, zw, input, out)
    }

    /// Checked [`Evaluation::write_output`].
    pub fn write_output(&self, iter: usize, x: &DistVec<P::Field>) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;

        self.problem.write_output(iter, x);
        Ok(())
    }
}

impl<P: SparseConstraints> Checked<P> {
    /// Checked [`SparseConstraints::eval_sparse_con`].
    pub fn eval_sparse_con(
        &self,
        x: &DistVec<P::Field>,
        out: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_sparse("out", out)?;

        self.problem.eval_sparse_con(x, out);
        Ok(())
    }

    /// Checked [`SparseConstraints::add_sparse_jacobian`].
    pub fn add_sparse_jacobian(
        &self,
        alpha: P::Field,
        x: &DistVec<P::Field>,
        px: &DistVec<P::Field>,
        out: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_design("px", px)?;
        self.check_sparse("out", out)?;

        self.problem.add_sparse_jacobian(alpha, x, px, out);
        Ok(())
    }

    /// Checked [`SparseConstraints::add_sparse_jacobian_transpose`].
    pub fn add_sparse_jacobian_transpose(
        &self,
        alpha: P::Field,
        x: &DistVec<P::Field>,
        pzw: &DistVec<P::Field>,
        out: &mut DistVec<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_sparse("pzw", pzw)?;
        self.check_design("out", out)?;

        self.problem.add_sparse_jacobian_transpose(alpha, x, pzw, out);
        Ok(())
    }

    /// Checked [`SparseConstraints::add_sparse_inner_product`].
    pub fn add_sparse_inner_product(
        &self,
        alpha: P::Field,
        x: &DistVec<P::Field>,
        cvec: &DistVec<P::Field>,
        a: &mut BlockDiag<P::Field>,
    ) -> Result<(), EvalError> {
        self.check_init()?;
        self.check_design("x", x)?;
        self.check_design("cvec", cvec)?;

        let sizes = self.problem.descriptor().sizes();
        if a.nwcon() != sizes.nwcon() {
            return Err(EvalError::Dimension {
                arg: "a",
                expected: sizes.nwcon(),
                found: a.nwcon(),
            });
        }
        if a.nwblock() != sizes.nwblock() {
            return Err(EvalError::Dimension {
                arg: "a",
                expected: sizes.nwblock(),
                found: a.nwblock(),
            });
        }

        self.problem.add_sparse_inner_product(alpha, x, cvec, a);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProcGroup;
    use crate::testing::{BlockQuadratic, NormLimited};

    fn init(checked: &mut Checked<impl Evaluation<Field = f64>>) -> DistVec<f64> {
        let mut x = checked.problem().create_design_vec();
        let mut lb = checked.problem().create_design_vec();
        let mut ub = checked.problem().create_design_vec();
        checked.vars_and_bounds(&mut x, &mut lb, &mut ub).unwrap();
        x
    }

    #[test]
    fn uninitialized_is_rejected() {
        let problem = BlockQuadratic::new(6, 2, 2, 1);
        let checked = Checked::new(problem);

        let x = checked.problem().create_design_vec();
        let mut cons = vec![0.0; 2];

        assert_eq!(
            checked.eval_obj_con(&x, &mut cons),
            Err(EvalError::Uninitialized)
        );

        let mut sw = checked.problem().create_constraint_vec();
        assert_eq!(
            checked.eval_sparse_con(&x, &mut sw),
            Err(EvalError::Uninitialized)
        );
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let problem = BlockQuadratic::new(6, 2, 2, 1);
        let mut checked = Checked::new(problem);
        let x = init(&mut checked);

        let mut short = vec![0.0; 1];
        assert_eq!(
            checked.eval_obj_con(&x, &mut short),
            Err(EvalError::Dimension {
                arg: "cons",
                expected: 2,
                found: 1
            })
        );

        let group = checked.problem().descriptor().group().clone();
        let wrong_len = DistVec::<f64>::zeros(&group, 5);
        let mut cons = vec![0.0; 2];
        assert_eq!(
            checked.eval_obj_con(&wrong_len, &mut cons),
            Err(EvalError::Dimension {
                arg: "x",
                expected: 6,
                found: 5
            })
        );

        // Gradient slice of the wrong arity.
        let mut g = checked.problem().create_design_vec();
        let mut ac = vec![checked.problem().create_design_vec()];
        assert_eq!(
            checked.eval_obj_con_gradient(&x, &mut g, &mut ac),
            Err(EvalError::Dimension {
                arg: "ac",
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn foreign_group_is_rejected() {
        let problem = BlockQuadratic::new(6, 2, 2, 1);
        let mut checked = Checked::new(problem);
        init(&mut checked);

        let foreign = DistVec::<f64>::zeros(&ProcGroup::local(), 6);
        let mut cons = vec![0.0; 2];

        assert_eq!(
            checked.eval_obj_con(&foreign, &mut cons),
            Err(EvalError::GroupMismatch { arg: "x" })
        );
    }

    #[test]
    fn fail_flag_propagation() {
        let problem = NormLimited::new(BlockQuadratic::new(4, 1, 2, 1), 10.0);
        let mut checked = Checked::new(problem);
        init(&mut checked);

        let mut cons = vec![0.0; 1];
        let mut results = Vec::new();

        // Three iterates: norms 20, 1, and 2.
        for scale in [10.0, 0.5, 1.0] {
            let mut x = checked.problem().create_design_vec();
            x.fill(scale);
            results.push(checked.eval_obj_con(&x, &mut cons).map(|fobj| {
                // Only consume outputs of successful evaluations.
                (fobj, cons.clone())
            }));
        }

        assert_eq!(results[0], Err(EvalError::NotEvaluable));
        assert!(results[1].is_ok());
        assert!(results[2].is_ok());
    }

    #[test]
    fn resize_is_reinitialization() {
        let problem = BlockQuadratic::new(6, 2, 2, 1);
        let mut checked = Checked::new(problem);
        let x = init(&mut checked);

        let sizes = checked.problem().descriptor().sizes();
        checked.resize(sizes);

        // Same quadruple: descriptor state unchanged, old vectors still
        // pass the dimension checks, but the handshake must be redone.
        assert_eq!(checked.problem().descriptor().sizes(), sizes);
        assert!(!checked.is_initialized());

        let mut cons = vec![0.0; 2];
        assert_eq!(
            checked.eval_obj_con(&x, &mut cons),
            Err(EvalError::Uninitialized)
        );

        let x = init(&mut checked);
        assert!(checked.eval_obj_con(&x, &mut cons).is_ok());
    }

    #[test]
    fn resize_invalidates_stale_vectors() {
        let problem = BlockQuadratic::new(6, 2, 2, 1);
        let mut checked = Checked::new(problem);
        let stale = init(&mut checked);

        checked.resize(ProblemSizes::new(8, 2, 2, 1).unwrap());
        let mut x = checked.problem().create_design_vec();
        let mut lb = checked.problem().create_design_vec();
        let mut ub = checked.problem().create_design_vec();
        checked.vars_and_bounds(&mut x, &mut lb, &mut ub).unwrap();

        let mut cons = vec![0.0; 2];
        assert_eq!(
            checked.eval_obj_con(&stale, &mut cons),
            Err(EvalError::Dimension {
                arg: "x",
                expected: 8,
                found: 6
            })
        );
    }

    #[test]
    fn sparse_ops_are_checked() {
        let problem = BlockQuadratic::new(8, 1, 4, 2);
        let mut checked = Checked::new(problem);
        let x = init(&mut checked);

        let mut out = checked.problem().create_constraint_vec();
        checked.eval_sparse_con(&x, &mut out).unwrap();

        let mut cvec = checked.problem().create_design_vec();
        cvec.fill(1.0);

        // Wrong row count.
        let mut short = BlockDiag::zeros(ProblemSizes::new(8, 1, 2, 2).unwrap());
        assert_eq!(
            checked.add_sparse_inner_product(1.0, &x, &cvec, &mut short),
            Err(EvalError::Dimension {
                arg: "a",
                expected: 4,
                found: 2
            })
        );

        // Same row count, wrong block size: the payload reports the
        // mismatched block size.
        let mut coarse = BlockDiag::zeros(ProblemSizes::new(8, 1, 4, 4).unwrap());
        assert_eq!(
            checked.add_sparse_inner_product(1.0, &x, &cvec, &mut coarse),
            Err(EvalError::Dimension {
                arg: "a",
                expected: 2,
                found: 4
            })
        );
    }
}
