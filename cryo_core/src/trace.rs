//! Read-only graph traversal for diagnostics.
//!
//! The [`Tracer`] visitor receives every owned allocation reachable
//! from a root, in the exact order compact would allocate copies of
//! them. Two built-in tracers use that:
//!
//! - [`measure`] sums allocation sizes plus alignment padding, giving
//!   the exact number of bytes a bump-region compact of the graph
//!   consumes — the right way to size a buffer before
//!   [`seal_into_buffer`](crate::seal_into_buffer).
//! - [`validate`] checks the tree-shape invariant ahead of time: a
//!   graph where the same allocation is reachable twice would be
//!   silently duplicated by compact (a DAG) or never finish (a cycle).

use std::alloc::Layout;

use rustc_hash::FxHashSet;

use crate::arena::align_up;
use crate::error::Error;
use crate::relocate::{Own, Relocate};

/// Visitor for owned allocations discovered during a trace walk.
///
/// Implementations may accumulate statistics, record addresses, or
/// abort the walk by returning an error.
pub trait Tracer {
    /// Visit a single-target allocation of `layout` at `addr`.
    fn visit_one(&mut self, addr: usize, layout: Layout) -> Result<(), Error>;

    /// Visit a slice backing store of `len` elements of `element`
    /// layout starting at `addr`.
    fn visit_slice(&mut self, addr: usize, len: usize, element: Layout) -> Result<(), Error>;
}

/// Counts of what a trace walk found.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    /// Owned allocations reachable from the root (the root's own
    /// allocation included; zero-length slices excluded).
    pub allocations: usize,
    /// Total payload bytes across those allocations, without padding.
    pub bytes: usize,
}

// =============================================================================
// Measure
// =============================================================================

/// Simulates a bump-region cursor over the allocation sequence.
struct MeasureTracer {
    cursor: usize,
}

impl MeasureTracer {
    fn claim(&mut self, size: usize, align: usize) -> Result<(), Error> {
        let start = align_up(self.cursor, align);
        self.cursor = start
            .checked_add(size)
            .ok_or(Error::OutOfMemory { requested: size })?;
        Ok(())
    }
}

impl Tracer for MeasureTracer {
    fn visit_one(&mut self, _addr: usize, layout: Layout) -> Result<(), Error> {
        self.claim(layout.size(), layout.align())
    }

    fn visit_slice(&mut self, _addr: usize, len: usize, element: Layout) -> Result<(), Error> {
        let total = element
            .size()
            .checked_mul(len)
            .ok_or(Error::OutOfMemory { requested: usize::MAX })?;
        self.claim(total, element.align())
    }
}

/// Exact number of bytes a bump-region compact of this graph consumes,
/// alignment padding included.
///
/// Visits allocations in compact's allocation order against a
/// simulated cursor starting at byte 0, so the result equals the
/// `used` count [`seal_into_buffer`](crate::seal_into_buffer) returns
/// for a buffer aligned to the payload type.
///
/// # Safety
///
/// `root` must head a live or compacted graph (absolute pointers, tree
/// shape) that is not concurrently mutated.
pub unsafe fn measure<T: Relocate>(root: &Own<T>) -> Result<usize, Error> {
    let mut tracer = MeasureTracer { cursor: 0 };
    root.trace(&mut tracer, 0)?;
    Ok(tracer.cursor)
}

// =============================================================================
// Validate
// =============================================================================

/// Rejects revisited addresses; address-keyed like the forwarding
/// tables of a copying collector.
struct ValidateTracer {
    seen: FxHashSet<usize>,
    stats: GraphStats,
}

impl ValidateTracer {
    fn record(&mut self, addr: usize, bytes: usize) -> Result<(), Error> {
        if bytes == 0 {
            // Zero-length slices own nothing; their base may alias a
            // real allocation without breaking the tree invariant.
            return Ok(());
        }
        if !self.seen.insert(addr) {
            return Err(Error::PointerShared { addr });
        }
        self.stats.allocations += 1;
        self.stats.bytes += bytes;
        Ok(())
    }
}

impl Tracer for ValidateTracer {
    fn visit_one(&mut self, addr: usize, layout: Layout) -> Result<(), Error> {
        self.record(addr, layout.size())
    }

    fn visit_slice(&mut self, addr: usize, len: usize, element: Layout) -> Result<(), Error> {
        let total = element
            .size()
            .checked_mul(len)
            .ok_or(Error::OutOfMemory { requested: usize::MAX })?;
        self.record(addr, total)
    }
}

/// Verify that the graph rooted at `root` is a finite tree shallow
/// enough to walk.
///
/// Fails with [`Error::PointerShared`] if any allocation is reachable
/// through two different pointers (sharing or a cycle) and
/// [`Error::DepthLimitExceeded`] past
/// [`MAX_DEPTH`](crate::region::MAX_DEPTH) pointer hops. On success,
/// returns what the walk found.
///
/// # Safety
///
/// `root` must head a live or compacted graph that is not concurrently
/// mutated. A cyclic graph is detected, not walked forever: the cycle
/// closes on an already-seen address.
pub unsafe fn validate<T: Relocate>(root: &Own<T>) -> Result<GraphStats, Error> {
    let mut tracer = ValidateTracer {
        seen: FxHashSet::default(),
        stats: GraphStats::default(),
    };
    root.trace(&mut tracer, 0)?;
    Ok(tracer.stats)
}
