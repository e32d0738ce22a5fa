use super::error::EvalError;
use super::problem::Problem;
use super::vec::DistVec;

/// Outcome of [`Evaluation::eval_hessian_diag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HessianDiag {
    /// The Hessian diagonal was written into the output vector.
    Filled,
    /// The problem has no diagonal information. The output vector was left
    /// untouched; in particular this does not mean the diagonal is zero.
    Unavailable,
}

/// The objective, constraint, and Hessian evaluation contract.
///
/// All vector and slice arguments are owned by the caller for the duration
/// of the call; implementations must not retain references to them past
/// return. The caller allocates the outputs once (via the factory methods
/// on [`Problem`]) and the problem fills them in place on every call, so
/// no allocation happens on the evaluation hot path.
///
/// Every process of the problem's group must drive these operations with a
/// structurally identical call sequence, since an implementation may
/// perform blocking collective communication inside any of them.
///
/// The required methods report a recoverable failure through
/// [`EvalError::NotEvaluable`] when the result is undefined at the given
/// point. The optional hooks come with the documented defaults, so a
/// concrete problem overrides only what it supports.
pub trait Evaluation: Problem {
    /// Fills the initial design point and the bound vectors.
    ///
    /// Called exactly once, before any other evaluation. The operation
    /// always succeeds; an implementation that cannot produce a valid
    /// bound must write the infinite sentinel values instead of failing
    /// partially. Bounds are immutable afterwards; a bound gated off by
    /// [`Problem::use_lower_bounds`]/[`Problem::use_upper_bounds`] is
    /// treated as infinite regardless of what is written here.
    fn vars_and_bounds(
        &self,
        x: &mut DistVec<Self::Field>,
        lb: &mut DistVec<Self::Field>,
        ub: &mut DistVec<Self::Field>,
    );

    /// Evaluates the objective and the dense constraint residuals at `x`.
    ///
    /// Writes the `ncon` residuals into `cons` and returns the objective
    /// value.
    fn eval_obj_con(
        &self,
        x: &DistVec<Self::Field>,
        cons: &mut [Self::Field],
    ) -> Result<Self::Field, EvalError>;

    /// Evaluates the objective gradient and the dense constraint
    /// gradients at `x`.
    ///
    /// Writes the objective gradient into `g` and the gradient of the
    /// `i`-th dense constraint into `ac[i]`. The slice `ac` has exactly
    /// `ncon` design vectors, allocated by the caller and reused across
    /// iterations.
    ///
    /// Must be correct for whatever `x` is passed; the caller usually
    /// evaluates it at the most recent point accepted by
    /// [`eval_obj_con`](Evaluation::eval_obj_con), but the two calls are
    /// not guaranteed to share the same `x`.
    fn eval_obj_con_gradient(
        &self,
        x: &DistVec<Self::Field>,
        g: &mut DistVec<Self::Field>,
        ac: &mut [DistVec<Self::Field>],
    ) -> Result<(), EvalError>;

    /// Evaluates the product of the Lagrangian Hessian with `px`.
    ///
    /// The Lagrangian is `L(x, z, zw) = f(x) - z . cons(x) - zw . sw(x)`,
    /// with the sign convention fixed by the inequality predicates. The
    /// multipliers `z` (length `ncon`) and `zw` (length `nwcon`) are read
    /// only; the product is written into `hvec`.
    fn eval_hvec_product(
        &self,
        x: &DistVec<Self::Field>,
        z: &[Self::Field],
        zw: &DistVec<Self::Field>,
        px: &DistVec<Self::Field>,
        hvec: &mut DistVec<Self::Field>,
    ) -> Result<(), EvalError>;

    /// Evaluates the diagonal of the Lagrangian Hessian for diagonal
    /// preconditioning.
    ///
    /// The default leaves `hdiag` untouched and reports
    /// [`HessianDiag::Unavailable`]; callers must not read `hdiag` unless
    /// [`HessianDiag::Filled`] was returned.
    fn eval_hessian_diag(
        &self,
        _x: &DistVec<Self::Field>,
        _z: &[Self::Field],
        _zw: &DistVec<Self::Field>,
        _hdiag: &mut DistVec<Self::Field>,
    ) -> Result<HessianDiag, EvalError> {
        Ok(HessianDiag::Unavailable)
    }

    /// Prepares internal preconditioner state at the current iterate.
    ///
    /// The state is problem-owned and persists until the next call to this
    /// method or until the problem is dropped. The default is a no-op.
    fn setup_hessian_precon(
        &mut self,
        _x: &DistVec<Self::Field>,
        _z: &[Self::Field],
        _zw: &DistVec<Self::Field>,
    ) -> Result<(), EvalError> {
        Ok(())
    }

    /// Approximately solves `(H + I) out = input`, where `H` is the
    /// Lagrangian Hessian.
    ///
    /// The default is the identity operator, `out := input`, so every
    /// problem has a valid, if weak, preconditioner without an override.
    fn apply_hessian_precon(
        &self,
        _x: &DistVec<Self::Field>,
        _z: &[Self::Field],
        _zw: &DistVec<Self::Field>,
        input: &DistVec<Self::Field>,
        out: &mut DistVec<Self::Field>,
    ) -> Result<(), EvalError> {
        out.copy_from(input);
        Ok(())
    }

    /// Diagnostic hook invoked by the driver at its reporting cadence.
    ///
    /// Side-effect only; must not mutate `x` or any optimizer state. The
    /// default does nothing.
    fn write_output(&self, _iter: usize, _x: &DistVec<Self::Field>) {}
}
