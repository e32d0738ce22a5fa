//! Core abstractions and types of the problem contract.
//!
//! *Problem authors* are mainly interested in implementing the [`Problem`],
//! [`Evaluation`], and [`SparseConstraints`] traits.
//!
//! Optimizer *developers* are interested in driving those traits through
//! [`Checked`](crate::Checked), which enforces the call contract at every
//! operation boundary.

mod descriptor;
mod error;
mod eval;
mod problem;
mod sparse;
mod vec;

pub use descriptor::*;
pub use error::*;
pub use eval::*;
pub use problem::*;
pub use sparse::*;
pub use vec::*;
