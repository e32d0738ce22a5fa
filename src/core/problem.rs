use nalgebra::RealField;

use super::descriptor::Descriptor;
use super::vec::DistVec;

/// The base trait for optimization problems.
///
/// A problem owns its [`Descriptor`] (process group plus dimension
/// quadruple) and answers four capability predicates that fix the
/// semantics of its constraints and bounds. The predicates are queried
/// once at setup and must stay constant for the problem's lifetime.
///
/// ## Defining a problem
///
/// ```rust
/// use parnlp::{Descriptor, Problem, ProblemSizes, ProcGroup};
///
/// struct Mass {
///     descriptor: Descriptor,
/// }
///
/// impl Mass {
///     fn new(nvars: usize) -> Self {
///         let sizes = ProblemSizes::new(nvars, 1, 0, 0).unwrap();
///         Self {
///             descriptor: Descriptor::new(ProcGroup::local(), sizes),
///         }
///     }
/// }
///
/// impl Problem for Mass {
///     type Field = f64;
///
///     fn descriptor(&self) -> &Descriptor {
///         &self.descriptor
///     }
///
///     fn descriptor_mut(&mut self) -> &mut Descriptor {
///         &mut self.descriptor
///     }
///
///     // Dense constraints are inequalities, bounds are both active.
///     fn dense_inequality(&self) -> bool {
///         true
///     }
///
///     fn sparse_inequality(&self) -> bool {
///         true
///     }
///
///     fn use_lower_bounds(&self) -> bool {
///         true
///     }
///
///     fn use_upper_bounds(&self) -> bool {
///         true
///     }
/// }
/// ```
pub trait Problem {
    /// Type of the scalar, usually f32 or f64.
    type Field: RealField + Copy;

    /// The descriptor of the problem.
    fn descriptor(&self) -> &Descriptor;

    /// Mutable access to the descriptor, used for reconfiguration (see
    /// [`Checked::resize`](crate::Checked::resize)).
    fn descriptor_mut(&mut self) -> &mut Descriptor;

    /// Whether the dense constraints are inequalities `cons(x) >= 0`
    /// (`true`) or equalities `cons(x) = 0` (`false`).
    fn dense_inequality(&self) -> bool;

    /// Whether the sparse block constraints are inequalities
    /// `sw(x) >= 0` (`true`) or equalities `sw(x) = 0` (`false`).
    fn sparse_inequality(&self) -> bool;

    /// Whether the lower bound vector is meaningful. When `false`, the
    /// lower bound is `-inf` regardless of the vector contents.
    fn use_lower_bounds(&self) -> bool;

    /// Whether the upper bound vector is meaningful. When `false`, the
    /// upper bound is `+inf` regardless of the vector contents.
    fn use_upper_bounds(&self) -> bool;

    /// Creates a zero-initialized design vector of length `nvars` over the
    /// problem's group.
    ///
    /// An override may control the partitioning of the vector, but the
    /// returned vector must have the descriptor's design length and group
    /// so that arithmetic with every other vector created by this problem
    /// remains well defined.
    fn create_design_vec(&self) -> DistVec<Self::Field> {
        let descriptor = self.descriptor();
        DistVec::zeros(descriptor.group(), descriptor.sizes().nvars())
    }

    /// Creates a zero-initialized sparse constraint vector of length
    /// `nwcon` over the problem's group.
    ///
    /// The same length and group guarantees as for
    /// [`create_design_vec`](Problem::create_design_vec) apply.
    fn create_constraint_vec(&self) -> DistVec<Self::Field> {
        let descriptor = self.descriptor();
        DistVec::zeros(descriptor.group(), descriptor.sizes().nwcon())
    }
}
