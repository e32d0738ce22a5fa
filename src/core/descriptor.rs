//! Problem descriptor: process-group identity and the dimension quadruple.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use getset::CopyGetters;
use thiserror::Error;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque distributed-computation context shared by all vectors and
/// evaluation calls of a problem.
///
/// The group is a capability, not a communication implementation: it fixes
/// the partition identity that every vector created for a problem must
/// share. This crate ships only the serial single-process realization,
/// created by [`ProcGroup::local`]; multi-process groups, their storage,
/// and their global reductions are external collaborators with their own
/// vector backend.
///
/// Cloned handles refer to the same group and compare equal; two
/// independently created groups never do. The group is fixed for the
/// lifetime of a problem instance.
#[derive(Debug, Clone, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ProcGroup {
    #[getset(skip)]
    id: u64,
    /// Rank of the calling process within the group.
    rank: usize,
    /// Total number of processes in the group.
    size: usize,
}

impl ProcGroup {
    /// Creates a serial single-process group.
    ///
    /// Every call creates a distinct group identity; vectors that should
    /// be compatible must be created over a clone of one handle.
    pub fn local() -> Self {
        Self {
            id: NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed),
            rank: 0,
            size: 1,
        }
    }
}

impl PartialEq for ProcGroup {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProcGroup {}

/// Error from validating a dimension quadruple.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SizeError {
    /// The sparse block size is zero while sparse constraints are present.
    #[error("sparse block size must be positive when sparse constraints are present")]
    ZeroBlock,
    /// The sparse block size exceeds the sparse constraint count.
    #[error("sparse block size {nwblock} exceeds sparse constraint count {nwcon}")]
    BlockTooLarge {
        /// The offending block size.
        nwblock: usize,
        /// The sparse constraint count it was checked against.
        nwcon: usize,
    },
}

/// The dimension quadruple of a problem.
///
/// The quadruple partitions the sparse constraint set into contiguous
/// blocks of `nwblock` rows (the last block may be partial). It can only be
/// obtained through the validated constructor, so an inconsistent quadruple
/// is not representable. The same structure must be used by every process
/// of the problem's group; this is a global property that a single process
/// cannot verify on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ProblemSizes {
    /// Number of local design variables.
    nvars: usize,
    /// Number of dense constraints.
    ncon: usize,
    /// Number of sparse block constraints.
    nwcon: usize,
    /// Number of rows in one sparse constraint block.
    nwblock: usize,
}

impl ProblemSizes {
    /// Validates and creates a dimension quadruple.
    ///
    /// When `nwcon > 0`, the block size must satisfy
    /// `0 < nwblock <= nwcon`. With `nwcon == 0` the block size is ignored
    /// and stored as given.
    pub fn new(
        nvars: usize,
        ncon: usize,
        nwcon: usize,
        nwblock: usize,
    ) -> Result<Self, SizeError> {
        if nwcon > 0 {
            if nwblock == 0 {
                return Err(SizeError::ZeroBlock);
            }

            if nwblock > nwcon {
                return Err(SizeError::BlockTooLarge { nwblock, nwcon });
            }
        }

        Ok(Self {
            nvars,
            ncon,
            nwcon,
            nwblock,
        })
    }

    /// Number of contiguous sparse constraint blocks.
    pub fn num_blocks(&self) -> usize {
        if self.nwcon == 0 {
            0
        } else {
            self.nwcon.div_ceil(self.nwblock)
        }
    }

    /// Global row range of sparse constraint block `k`.
    ///
    /// The last block is partial when `nwblock` does not divide `nwcon`.
    pub fn block_range(&self, k: usize) -> Range<usize> {
        assert!(k < self.num_blocks(), "block index out of range");

        let start = k * self.nwblock;
        start..self.nwcon.min(start + self.nwblock)
    }
}

/// Problem descriptor: the process group plus the dimension quadruple.
///
/// Problems embed a descriptor and hand out access through
/// [`Problem::descriptor`](super::Problem::descriptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    group: ProcGroup,
    sizes: ProblemSizes,
}

impl Descriptor {
    /// Creates a descriptor over the given group and sizes.
    pub fn new(group: ProcGroup, sizes: ProblemSizes) -> Self {
        Self { group, sizes }
    }

    /// Gets the process group of the problem.
    pub fn group(&self) -> &ProcGroup {
        &self.group
    }

    /// Gets the dimension quadruple.
    pub fn sizes(&self) -> ProblemSizes {
        self.sizes
    }

    /// Atomically replaces the whole dimension quadruple.
    ///
    /// The new quadruple has already passed validation in
    /// [`ProblemSizes::new`], so a partial update is not representable.
    /// Every process of the group must perform the same replacement, and
    /// the call must be treated as a reinitialization of the problem (see
    /// [`Checked::resize`](crate::Checked::resize)).
    pub fn resize(&mut self, sizes: ProblemSizes) {
        self.sizes = sizes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_validation() {
        assert!(ProblemSizes::new(10, 2, 4, 2).is_ok());
        assert!(ProblemSizes::new(10, 2, 0, 0).is_ok());

        assert_eq!(ProblemSizes::new(10, 2, 4, 0), Err(SizeError::ZeroBlock));
        assert_eq!(
            ProblemSizes::new(10, 2, 4, 5),
            Err(SizeError::BlockTooLarge {
                nwblock: 5,
                nwcon: 4
            })
        );
    }

    #[test]
    fn block_partition() {
        let sizes = ProblemSizes::new(10, 0, 7, 3).unwrap();

        assert_eq!(sizes.num_blocks(), 3);
        assert_eq!(sizes.block_range(0), 0..3);
        assert_eq!(sizes.block_range(1), 3..6);
        assert_eq!(sizes.block_range(2), 6..7);

        let empty = ProblemSizes::new(10, 2, 0, 0).unwrap();
        assert_eq!(empty.num_blocks(), 0);
    }

    #[test]
    fn group_identity() {
        let group = ProcGroup::local();
        let shared = group.clone();
        let other = ProcGroup::local();

        assert_eq!(group, shared);
        assert_ne!(group, other);
        assert_eq!(group.rank(), 0);
        assert_eq!(group.size(), 1);
    }

    #[test]
    fn resize_replaces_whole_quadruple() {
        let sizes = ProblemSizes::new(10, 2, 4, 2).unwrap();
        let mut descriptor = Descriptor::new(ProcGroup::local(), sizes);

        let resized = ProblemSizes::new(20, 1, 6, 3).unwrap();
        descriptor.resize(resized);
        assert_eq!(descriptor.sizes(), resized);

        // Resizing with an identical quadruple is a no-op on the state.
        let snapshot = descriptor.clone();
        descriptor.resize(resized);
        assert_eq!(descriptor, snapshot);
    }
}
