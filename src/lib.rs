#![allow(clippy::many_single_char_names)]
#![warn(missing_docs)]

//! _parnlp_ defines the **problem interface contracts** consumed by a
//! distributed-memory nonlinear constrained optimizer.
//!
//! The crate contains no optimization algorithm. It is the linkage-level
//! contract between an optimizer driver and a user-supplied problem:
//! dimensions and capability flags, distributed vector creation,
//! objective/constraint evaluation, gradients, Hessian-vector products,
//! optional preconditioning hooks, and block-structured sparse constraint
//! Jacobian operations.
//!
//! ## Anatomy of a problem
//!
//! A problem implements up to three traits:
//!
//! * [`Problem`] — the [`Descriptor`] (process group plus the dimension
//!   quadruple `nvars`/`ncon`/`nwcon`/`nwblock`), the four capability
//!   predicates fixing constraint and bound semantics, and the vector
//!   factory.
//! * [`Evaluation`] — initial point and bounds, objective and dense
//!   constraint evaluation, gradients, Hessian-vector products, and the
//!   optional preconditioner hooks with their documented defaults.
//! * [`SparseConstraints`] — residuals and (transpose) Jacobian products
//!   of the block-structured sparse constraints, plus the block-diagonal
//!   `J diag(c) J^T` accumulation used in the optimizer's linear solve.
//!
//! An optimizer drives the problem through [`Checked`], which validates
//! every argument against the descriptor at the operation boundary and
//! reports violations as distinct [`EvalError`] kinds instead of letting
//! them corrupt distributed state.
//!
//! Recoverable evaluation failure keeps its classic fail-flag meaning:
//! [`EvalError::NotEvaluable`] says "the result is undefined at this
//! point", and whether to reject the step or abort the run is the
//! caller's decision.
//!
//! ## Example
//!
//! ```rust
//! use parnlp::{
//!     Checked, Descriptor, DistVec, EvalError, Evaluation, Problem, ProblemSizes, ProcGroup,
//! };
//!
//! // min 1/2 ||x||^2  subject to  x_0 + x_1 >= 1
//! struct Toy {
//!     descriptor: Descriptor,
//! }
//!
//! impl Toy {
//!     fn new() -> Self {
//!         let sizes = ProblemSizes::new(2, 1, 0, 0).unwrap();
//!         Self {
//!             descriptor: Descriptor::new(ProcGroup::local(), sizes),
//!         }
//!     }
//! }
//!
//! impl Problem for Toy {
//!     type Field = f64;
//!
//!     fn descriptor(&self) -> &Descriptor {
//!         &self.descriptor
//!     }
//!
//!     fn descriptor_mut(&mut self) -> &mut Descriptor {
//!         &mut self.descriptor
//!     }
//!
//!     fn dense_inequality(&self) -> bool {
//!         true
//!     }
//!
//!     fn sparse_inequality(&self) -> bool {
//!         true
//!     }
//!
//!     fn use_lower_bounds(&self) -> bool {
//!         false
//!     }
//!
//!     fn use_upper_bounds(&self) -> bool {
//!         false
//!     }
//! }
//!
//! impl Evaluation for Toy {
//!     fn vars_and_bounds(
//!         &self,
//!         x: &mut DistVec<f64>,
//!         lb: &mut DistVec<f64>,
//!         ub: &mut DistVec<f64>,
//!     ) {
//!         x.fill(0.5);
//!         lb.fill(f64::NEG_INFINITY);
//!         ub.fill(f64::INFINITY);
//!     }
//!
//!     fn eval_obj_con(&self, x: &DistVec<f64>, cons: &mut [f64]) -> Result<f64, EvalError> {
//!         cons[0] = x.values()[0] + x.values()[1] - 1.0;
//!         Ok(0.5 * x.dot(x))
//!     }
//!
//!     fn eval_obj_con_gradient(
//!         &self,
//!         x: &DistVec<f64>,
//!         g: &mut DistVec<f64>,
//!         ac: &mut [DistVec<f64>],
//!     ) -> Result<(), EvalError> {
//!         g.copy_from(x);
//!         ac[0].fill(1.0);
//!         Ok(())
//!     }
//!
//!     fn eval_hvec_product(
//!         &self,
//!         _x: &DistVec<f64>,
//!         _z: &[f64],
//!         _zw: &DistVec<f64>,
//!         px: &DistVec<f64>,
//!         hvec: &mut DistVec<f64>,
//!     ) -> Result<(), EvalError> {
//!         hvec.copy_from(px);
//!         Ok(())
//!     }
//! }
//!
//! let mut problem = Checked::new(Toy::new());
//!
//! let mut x = problem.problem().create_design_vec();
//! let mut lb = problem.problem().create_design_vec();
//! let mut ub = problem.problem().create_design_vec();
//! problem.vars_and_bounds(&mut x, &mut lb, &mut ub).unwrap();
//!
//! let mut cons = vec![0.0; 1];
//! let fobj = problem.eval_obj_con(&x, &mut cons).unwrap();
//!
//! assert_eq!(fobj, 0.25);
//! assert_eq!(cons[0], 0.0);
//! ```
//!
//! ## Distribution model
//!
//! Every vector is conceptually partitioned over the problem's
//! [`ProcGroup`]; the crate ships a serial single-process realization and
//! treats multi-process storage and reductions as external collaborators.
//! What the contract does fix is the collective discipline: every process
//! of the group must invoke each operation with a structurally identical
//! call sequence, because implementations may perform blocking collective
//! communication inside any call. There is no cancellation or timeout at
//! this layer; the only abort signal is the recoverable evaluation
//! failure.
//!
//! ## License
//!
//! Licensed under MIT.

mod core;

pub mod checked;

pub use crate::core::*;
pub use checked::Checked;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
