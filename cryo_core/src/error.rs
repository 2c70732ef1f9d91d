//! Error types for graph relocation.
//!
//! Two failure axes exist: structural errors (unsupported kinds) are
//! rejected at compile time by the trait system and never reach this
//! enum; value errors (exhausted allocators, pointers outside the
//! region, malformed graphs) surface here at run time.
//!
//! A failed `seal` or `unseal` leaves the region partially rewritten.
//! There is no rollback: the region must be treated as corrupt and
//! discarded or rebuilt.

use std::error::Error as StdError;
use std::fmt;

/// Errors that can occur while compacting, sealing or unsealing a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator refused a request.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A single-target pointer lies outside the supplied region during
    /// seal, or a sealed offset is out of range during unseal.
    PointerNotInRange {
        /// The offending pointer or offset value.
        addr: usize,
    },
    /// Same as `PointerNotInRange`, for a slice base pointer.
    SlicePointerInvalid {
        /// The offending base pointer or offset value.
        addr: usize,
    },
    /// The graph is deeper than [`MAX_DEPTH`](crate::region::MAX_DEPTH)
    /// pointer hops; walking it further would risk exhausting the stack.
    DepthLimitExceeded,
    /// The same allocation is reachable through more than one pointer.
    /// The graph is a DAG or a cycle, not a tree; compacting it would
    /// duplicate (or never terminate). Reported by
    /// [`validate`](crate::trace::validate) only.
    PointerShared {
        /// Address of the allocation that was reached twice.
        addr: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "allocator refused a request for {requested} bytes")
            }
            Self::PointerNotInRange { addr } => {
                write!(f, "pointer {addr:#x} outside the region")
            }
            Self::SlicePointerInvalid { addr } => {
                write!(f, "slice base pointer {addr:#x} outside the region")
            }
            Self::DepthLimitExceeded => {
                write!(f, "graph exceeds the pointer-depth limit")
            }
            Self::PointerShared { addr } => {
                write!(f, "allocation {addr:#x} is reachable twice; graph is not a tree")
            }
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_out_of_memory() {
        let err = Error::OutOfMemory { requested: 64 };
        assert_eq!(err.to_string(), "allocator refused a request for 64 bytes");
    }

    #[test]
    fn test_display_pointer_not_in_range() {
        let err = Error::PointerNotInRange { addr: 0x1000 };
        assert_eq!(err.to_string(), "pointer 0x1000 outside the region");
    }

    #[test]
    fn test_display_slice_pointer_invalid() {
        let err = Error::SlicePointerInvalid { addr: 0xbeef };
        assert_eq!(
            err.to_string(),
            "slice base pointer 0xbeef outside the region"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_std_error<E: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
