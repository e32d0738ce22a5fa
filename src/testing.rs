//! Synthetic problems and consistency checkers useful for smoke testing
//! problem implementations and optimizer plumbing.
//!
//! [`BlockQuadratic`] is the recommended first test problem: it implements
//! every operation of the contract with analytic derivatives, so the
//! derivative and adjointness checkers have an exact reference.
//! [`NormLimited`] wraps any problem with a recoverable evaluation failure
//! region for exercising fail-flag handling.

#![allow(unused)]

use nalgebra::DVector;

use crate::core::{
    BlockDiag, Descriptor, DistVec, EvalError, Evaluation, HessianDiag, Problem, ProblemSizes,
    ProcGroup, SparseConstraints,
};

/// A twice-differentiable constrained problem with analytic derivatives.
///
/// * Objective: `f(x) = 1/2 sum_i w_i x_i^2` with weights
///   `w_i = 1 + i / 2`.
/// * Dense constraints: `cons_j(x) = a_j . x - b_j` with
///   `a_j[i] = 1 / (i + j + 1)` and `b_j = 1 + j`.
/// * Sparse constraints: `sw_k(x) = x_{2k} * x_{2k+1}`, so each Jacobian
///   row touches exactly two design variables and rows from different
///   blocks never share a variable.
///
/// Requires `nvars >= 2 * nwcon`.
#[derive(Debug, Clone)]
pub struct BlockQuadratic {
    descriptor: Descriptor,
    weights: DVector<f64>,
    a: Vec<DVector<f64>>,
    b: Vec<f64>,
}

impl BlockQuadratic {
    /// Creates the problem over a serial process group.
    pub fn new(nvars: usize, ncon: usize, nwcon: usize, nwblock: usize) -> Self {
        assert!(nvars >= 2 * nwcon, "nvars must be at least 2 * nwcon");

        let sizes = ProblemSizes::new(nvars, ncon, nwcon, nwblock).unwrap();
        let weights = DVector::from_fn(nvars, |i, _| 1.0 + i as f64 / 2.0);
        let a = (0..ncon)
            .map(|j| DVector::from_fn(nvars, |i, _| 1.0 / (i + j + 1) as f64))
            .collect();
        let b = (0..ncon).map(|j| 1.0 + j as f64).collect();

        Self {
            descriptor: Descriptor::new(ProcGroup::local(), sizes),
            weights,
            a,
            b,
        }
    }
}

impl Problem for BlockQuadratic {
    type Field = f64;

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    fn dense_inequality(&self) -> bool {
        true
    }

    fn sparse_inequality(&self) -> bool {
        true
    }

    fn use_lower_bounds(&self) -> bool {
        true
    }

    fn use_upper_bounds(&self) -> bool {
        true
    }
}

impl Evaluation for BlockQuadratic {
    fn vars_and_bounds(&self, x: &mut DistVec<f64>, lb: &mut DistVec<f64>, ub: &mut DistVec<f64>) {
        for (i, v) in x.values_mut().iter_mut().enumerate() {
            *v = 1.0 + 0.1 * i as f64;
        }
        lb.fill(-10.0);
        ub.fill(10.0);
    }

    fn eval_obj_con(&self, x: &DistVec<f64>, cons: &mut [f64]) -> Result<f64, EvalError> {
        let xs = x.values();

        let fobj = 0.5
            * xs.iter()
                .zip(self.weights.iter())
                .map(|(&xi, &wi)| wi * xi * xi)
                .sum::<f64>();

        for (j, c) in cons.iter_mut().enumerate() {
            *c = self.a[j].iter().zip(xs).map(|(&ai, &xi)| ai * xi).sum::<f64>() - self.b[j];
        }

        Ok(fobj)
    }

    fn eval_obj_con_gradient(
        &self,
        x: &DistVec<f64>,
        g: &mut DistVec<f64>,
        ac: &mut [DistVec<f64>],
    ) -> Result<(), EvalError> {
        for (gi, (&xi, &wi)) in g
            .values_mut()
            .iter_mut()
            .zip(x.values().iter().zip(self.weights.iter()))
        {
            *gi = wi * xi;
        }

        for (j, grad) in ac.iter_mut().enumerate() {
            grad.values_mut().copy_from_slice(self.a[j].as_slice());
        }

        Ok(())
    }

    fn eval_hvec_product(
        &self,
        _x: &DistVec<f64>,
        _z: &[f64],
        zw: &DistVec<f64>,
        px: &DistVec<f64>,
        hvec: &mut DistVec<f64>,
    ) -> Result<(), EvalError> {
        // The dense constraints are linear, so the Lagrangian Hessian is
        // the objective part minus the sparse bilinear couplings.
        for (hi, (&pi, &wi)) in hvec
            .values_mut()
            .iter_mut()
            .zip(px.values().iter().zip(self.weights.iter()))
        {
            *hi = wi * pi;
        }

        for (k, &zwk) in zw.values().iter().enumerate() {
            let (i1, i2) = (2 * k, 2 * k + 1);
            hvec.values_mut()[i1] -= zwk * px.values()[i2];
            hvec.values_mut()[i2] -= zwk * px.values()[i1];
        }

        Ok(())
    }

    fn eval_hessian_diag(
        &self,
        _x: &DistVec<f64>,
        _z: &[f64],
        _zw: &DistVec<f64>,
        hdiag: &mut DistVec<f64>,
    ) -> Result<HessianDiag, EvalError> {
        hdiag.values_mut().copy_from_slice(self.weights.as_slice());
        Ok(HessianDiag::Filled)
    }
}

impl SparseConstraints for BlockQuadratic {
    fn eval_sparse_con(&self, x: &DistVec<f64>, out: &mut DistVec<f64>) {
        let xs = x.values();
        for (k, o) in out.values_mut().iter_mut().enumerate() {
            *o = xs[2 * k] * xs[2 * k + 1];
        }
    }

    fn add_sparse_jacobian(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        px: &DistVec<f64>,
        out: &mut DistVec<f64>,
    ) {
        let xs = x.values();
        let ps = px.values();
        for (k, o) in out.values_mut().iter_mut().enumerate() {
            let (i1, i2) = (2 * k, 2 * k + 1);
            *o += alpha * (xs[i2] * ps[i1] + xs[i1] * ps[i2]);
        }
    }

    fn add_sparse_jacobian_transpose(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        pzw: &DistVec<f64>,
        out: &mut DistVec<f64>,
    ) {
        let xs = x.values();
        for (k, &pk) in pzw.values().iter().enumerate() {
            let (i1, i2) = (2 * k, 2 * k + 1);
            out.values_mut()[i1] += alpha * xs[i2] * pk;
            out.values_mut()[i2] += alpha * xs[i1] * pk;
        }
    }

    fn add_sparse_inner_product(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        cvec: &DistVec<f64>,
        a: &mut BlockDiag<f64>,
    ) {
        let xs = x.values();
        let cs = cvec.values();
        let nwblock = a.nwblock();

        // Rows never share variables here, so the normal equations term
        // only has diagonal entries.
        for k in 0..a.nwcon() {
            let (i1, i2) = (2 * k, 2 * k + 1);
            let value = cs[i1] * xs[i2] * xs[i2] + cs[i2] * xs[i1] * xs[i1];

            let block = k / nwblock;
            let local = k - block * nwblock;
            a.block_mut(block)[(local, local)] += alpha * value;
        }
    }
}

/// A wrapper whose evaluations fail recoverably outside a norm ball.
///
/// Every objective, gradient, and Hessian evaluation returns
/// [`EvalError::NotEvaluable`] whenever `||x|| > radius`, mimicking a
/// problem with a restricted evaluable domain.
#[derive(Debug, Clone)]
pub struct NormLimited<P> {
    inner: P,
    radius: f64,
}

impl<P> NormLimited<P> {
    /// Wraps `inner` with the given evaluable radius.
    pub fn new(inner: P, radius: f64) -> Self {
        Self { inner, radius }
    }
}

impl<P: Problem<Field = f64>> NormLimited<P> {
    fn guard(&self, x: &DistVec<f64>) -> Result<(), EvalError> {
        if x.norm() > self.radius {
            Err(EvalError::NotEvaluable)
        } else {
            Ok(())
        }
    }
}

impl<P: Problem<Field = f64>> Problem for NormLimited<P> {
    type Field = f64;

    fn descriptor(&self) -> &Descriptor {
        self.inner.descriptor()
    }

    fn descriptor_mut(&mut self) -> &mut Descriptor {
        self.inner.descriptor_mut()
    }

    fn dense_inequality(&self) -> bool {
        self.inner.dense_inequality()
    }

    fn sparse_inequality(&self) -> bool {
        self.inner.sparse_inequality()
    }

    fn use_lower_bounds(&self) -> bool {
        self.inner.use_lower_bounds()
    }

    fn use_upper_bounds(&self) -> bool {
        self.inner.use_upper_bounds()
    }
}

impl<P: Evaluation<Field = f64>> Evaluation for NormLimited<P> {
    fn vars_and_bounds(&self, x: &mut DistVec<f64>, lb: &mut DistVec<f64>, ub: &mut DistVec<f64>) {
        self.inner.vars_and_bounds(x, lb, ub);
    }

    fn eval_obj_con(&self, x: &DistVec<f64>, cons: &mut [f64]) -> Result<f64, EvalError> {
        self.guard(x)?;
        self.inner.eval_obj_con(x, cons)
    }

    fn eval_obj_con_gradient(
        &self,
        x: &DistVec<f64>,
        g: &mut DistVec<f64>,
        ac: &mut [DistVec<f64>],
    ) -> Result<(), EvalError> {
        self.guard(x)?;
        self.inner.eval_obj_con_gradient(x, g, ac)
    }

    fn eval_hvec_product(
        &self,
        x: &DistVec<f64>,
        z: &[f64],
        zw: &DistVec<f64>,
        px: &DistVec<f64>,
        hvec: &mut DistVec<f64>,
    ) -> Result<(), EvalError> {
        self.guard(x)?;
        self.inner.eval_hvec_product(x, z, zw, px, hvec)
    }

    fn eval_hessian_diag(
        &self,
        x: &DistVec<f64>,
        z: &[f64],
        zw: &DistVec<f64>,
        hdiag: &mut DistVec<f64>,
    ) -> Result<HessianDiag, EvalError> {
        self.guard(x)?;
        self.inner.eval_hessian_diag(x, z, zw, hdiag)
    }

    fn setup_hessian_precon(
        &mut self,
        x: &DistVec<f64>,
        z: &[f64],
        zw: &DistVec<f64>,
    ) -> Result<(), EvalError> {
        self.guard(x)?;
        self.inner.setup_hessian_precon(x, z, zw)
    }

    fn apply_hessian_precon(
        &self,
        x: &DistVec<f64>,
        z: &[f64],
        zw: &DistVec<f64>,
        input: &DistVec<f64>,
        out: &mut DistVec<f64>,
    ) -> Result<(), EvalError> {
        self.guard(x)?;
        self.inner.apply_hessian_precon(x, z, zw, input, out)
    }

    fn write_output(&self, iter: usize, x: &DistVec<f64>) {
        self.inner.write_output(iter, x);
    }
}

impl<P: SparseConstraints<Field = f64>> SparseConstraints for NormLimited<P> {
    fn eval_sparse_con(&self, x: &DistVec<f64>, out: &mut DistVec<f64>) {
        self.inner.eval_sparse_con(x, out);
    }

    fn add_sparse_jacobian(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        px: &DistVec<f64>,
        out: &mut DistVec<f64>,
    ) {
        self.inner.add_sparse_jacobian(alpha, x, px, out);
    }

    fn add_sparse_jacobian_transpose(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        pzw: &DistVec<f64>,
        out: &mut DistVec<f64>,
    ) {
        self.inner.add_sparse_jacobian_transpose(alpha, x, pzw, out);
    }

    fn add_sparse_inner_product(
        &self,
        alpha: f64,
        x: &DistVec<f64>,
        cvec: &DistVec<f64>,
        a: &mut BlockDiag<f64>,
    ) {
        self.inner.add_sparse_inner_product(alpha, x, cvec, a);
    }
}

fn close(approximated: f64, exact: f64, tol: f64) -> bool {
    (approximated - exact).abs() <= tol * exact.abs().max(1.0)
}

/// Checks the objective and dense constraint gradients against central
/// finite differences along every coordinate direction.
///
/// The finite difference error is `O(step^2)`, so `tol` should leave some
/// headroom above that (for `step = 1e-6`, a tolerance around `1e-8` is
/// appropriate for well-scaled problems).
pub fn check_gradients<P>(problem: &P, x: &DistVec<f64>, step: f64, tol: f64) -> bool
where
    P: Evaluation<Field = f64>,
{
    let sizes = problem.descriptor().sizes();
    let ncon = sizes.ncon();

    let mut g = problem.create_design_vec();
    let mut ac: Vec<_> = (0..ncon).map(|_| problem.create_design_vec()).collect();

    if problem.eval_obj_con_gradient(x, &mut g, &mut ac).is_err() {
        return false;
    }

    let mut cons_plus = vec![0.0; ncon];
    let mut cons_minus = vec![0.0; ncon];
    let mut point = x.clone();

    for i in 0..sizes.nvars() {
        let xi = x.values()[i];

        point.values_mut()[i] = xi + step;
        let f_plus = match problem.eval_obj_con(&point, &mut cons_plus) {
            Ok(value) => value,
            Err(_) => return false,
        };

        point.values_mut()[i] = xi - step;
        let f_minus = match problem.eval_obj_con(&point, &mut cons_minus) {
            Ok(value) => value,
            Err(_) => return false,
        };

        point.values_mut()[i] = xi;

        if !close((f_plus - f_minus) / (2.0 * step), g.values()[i], tol) {
            return false;
        }

        for j in 0..ncon {
            let fd = (cons_plus[j] - cons_minus[j]) / (2.0 * step);
            if !close(fd, ac[j].values()[i], tol) {
                return false;
            }
        }
    }

    true
}

/// Checks that the transpose Jacobian product is the exact adjoint of the
/// forward product, using random directions in both spaces.
pub fn check_sparse_adjoint<P>(
    problem: &P,
    x: &DistVec<f64>,
    rng: &mut fastrand::Rng,
    tol: f64,
) -> bool
where
    P: SparseConstraints<Field = f64>,
{
    let mut px = problem.create_design_vec();
    let mut pzw = problem.create_constraint_vec();

    for v in px.values_mut() {
        *v = rng.f64() * 2.0 - 1.0;
    }
    for v in pzw.values_mut() {
        *v = rng.f64() * 2.0 - 1.0;
    }

    let mut jpx = problem.create_constraint_vec();
    problem.add_sparse_jacobian(1.0, x, &px, &mut jpx);

    let mut jtpzw = problem.create_design_vec();
    problem.add_sparse_jacobian_transpose(1.0, x, &pzw, &mut jtpzw);

    let forward = pzw.dot(&jpx);
    let adjoint = jtpzw.dot(&px);

    close(forward, adjoint, tol)
}

/// Checks the Hessian-vector product of the Lagrangian against a central
/// finite difference of the Lagrangian gradient along a direction `p`.
pub fn check_hvec_product<P>(
    problem: &P,
    x: &DistVec<f64>,
    z: &[f64],
    zw: &DistVec<f64>,
    p: &DistVec<f64>,
    step: f64,
    tol: f64,
) -> bool
where
    P: Evaluation<Field = f64> + SparseConstraints<Field = f64>,
{
    let ncon = problem.descriptor().sizes().ncon();

    // Gradient of L(x, z, zw) = f(x) - z . cons(x) - zw . sw(x).
    let lagrangian_grad = |point: &DistVec<f64>| -> Option<DistVec<f64>> {
        let mut g = problem.create_design_vec();
        let mut ac: Vec<_> = (0..ncon).map(|_| problem.create_design_vec()).collect();
        problem.eval_obj_con_gradient(point, &mut g, &mut ac).ok()?;

        for (grad, &zj) in ac.iter().zip(z) {
            g.axpy(-zj, grad);
        }
        problem.add_sparse_jacobian_transpose(-1.0, point, zw, &mut g);

        Some(g)
    };

    let mut hvec = problem.create_design_vec();
    if problem.eval_hvec_product(x, z, zw, p, &mut hvec).is_err() {
        return false;
    }

    let mut plus = x.clone();
    plus.axpy(step, p);
    let mut minus = x.clone();
    minus.axpy(-step, p);

    let (g_plus, g_minus) = match (lagrangian_grad(&plus), lagrangian_grad(&minus)) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    (0..x.len()).all(|i| {
        let fd = (g_plus.values()[i] - g_minus.values()[i]) / (2.0 * step);
        close(fd, hvec.values()[i], tol)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized(problem: &BlockQuadratic) -> (DistVec<f64>, DistVec<f64>, DistVec<f64>) {
        let mut x = problem.create_design_vec();
        let mut lb = problem.create_design_vec();
        let mut ub = problem.create_design_vec();
        problem.vars_and_bounds(&mut x, &mut lb, &mut ub);
        (x, lb, ub)
    }

    #[test]
    fn initial_point_within_bounds() {
        let problem = BlockQuadratic::new(10, 2, 4, 2);
        let (x, lb, ub) = initialized(&problem);

        assert!(problem.use_lower_bounds() && problem.use_upper_bounds());
        for i in 0..x.len() {
            assert!(lb.values()[i] <= x.values()[i]);
            assert!(x.values()[i] <= ub.values()[i]);
        }
    }

    #[test]
    fn gradients_match_finite_differences() {
        let problem = BlockQuadratic::new(10, 2, 4, 2);
        let (x, _, _) = initialized(&problem);

        assert!(check_gradients(&problem, &x, 1e-6, 1e-8));
    }

    #[test]
    fn hvec_product_matches_finite_differences() {
        let problem = BlockQuadratic::new(10, 2, 4, 2);
        let (x, _, _) = initialized(&problem);

        let z = vec![0.3, -0.7];
        let mut zw = problem.create_constraint_vec();
        zw.values_mut().copy_from_slice(&[0.5, -1.0, 0.25, 2.0]);

        let mut p = problem.create_design_vec();
        for (i, v) in p.values_mut().iter_mut().enumerate() {
            *v = if i % 2 == 0 { 1.0 } else { -0.5 };
        }

        assert!(check_hvec_product(&problem, &x, &z, &zw, &p, 1e-6, 1e-7));
    }

    #[test]
    fn sparse_residuals() {
        let problem = BlockQuadratic::new(6, 1, 3, 2);
        let (x, _, _) = initialized(&problem);

        let mut out = problem.create_constraint_vec();
        out.fill(123.0);
        problem.eval_sparse_con(&x, &mut out);

        // Overwrite semantics, residuals are the pairwise products.
        let xs = x.values();
        for k in 0..3 {
            assert_eq!(out.values()[k], xs[2 * k] * xs[2 * k + 1]);
        }
    }

    #[test]
    fn norm_limited_guards_evaluations() {
        let problem = NormLimited::new(BlockQuadratic::new(4, 1, 0, 0), 10.0);

        let mut far = problem.create_design_vec();
        far.fill(10.0);
        let mut near = problem.create_design_vec();
        near.fill(0.5);

        let mut cons = vec![0.0; 1];
        assert_eq!(
            problem.eval_obj_con(&far, &mut cons),
            Err(EvalError::NotEvaluable)
        );
        assert!(problem.eval_obj_con(&near, &mut cons).is_ok());

        // The preconditioner application is an evaluation at x too, so it
        // is guarded the same way.
        let z = [0.0];
        let zw = problem.create_constraint_vec();
        let input = near.clone();
        let mut out = problem.create_design_vec();
        assert_eq!(
            problem.apply_hessian_precon(&far, &z, &zw, &input, &mut out),
            Err(EvalError::NotEvaluable)
        );
        assert!(problem
            .apply_hessian_precon(&near, &z, &zw, &input, &mut out)
            .is_ok());
        assert_eq!(out.values(), input.values());
    }
}
