//! Seal and unseal: in-place pointer/offset rewriting.
//!
//! The two operations are exact mirrors. Seal walks a compacted graph
//! and rewrites every stored pointer into `(pointer - base) + BIAS`,
//! descending into each target *before* rewriting the pointer to it —
//! the reverse order would lose addressability mid-walk. Unseal
//! rewrites each offset back into an absolute pointer *before*
//! descending, because the recursion needs the restored address.
//!
//! The root handle itself is caller-held rather than stored in the
//! region, so both entry points validate it against the region but do
//! not rewrite it. After a successful seal the region is
//! position-independent: the bytes can be moved anywhere (disk, a
//! socket, another mapping) and unsealed at whatever base they land
//! on.
//!
//! Both operations mutate in place and stop at the first out-of-range
//! pointer, leaving the region partially rewritten. There is no
//! rollback; a failed walk poisons the region.

use crate::error::Error;
use crate::region::{Region, MAX_ALIGN};
use crate::relocate::{Own, Relocate};

/// Rewrite every pointer in the compacted graph rooted at `root` into
/// a biased region-relative offset, in place.
///
/// Precondition: the whole graph, the root's own allocation included,
/// lies within `region`. A pointer found outside it fails with
/// [`Error::PointerNotInRange`] (or [`Error::SlicePointerInvalid`] for
/// a slice base) and leaves the region poisoned.
///
/// The root handle keeps its absolute pointer; only stored pointers
/// inside the region are rewritten.
///
/// # Safety
///
/// `root` must head a compacted, tree-shaped graph with exclusive
/// access for the duration of the call. After success the graph is no
/// longer dereferenceable until unsealed.
pub unsafe fn seal<T: Relocate>(root: &Own<T>, region: Region) -> Result<(), Error> {
    const {
        assert!(
            std::mem::align_of::<T>() <= MAX_ALIGN,
            "payload alignment exceeds what the biased offsets preserve"
        );
    }
    let addr = root.as_ptr() as usize;
    if !region.contains(addr) {
        return Err(Error::PointerNotInRange { addr });
    }
    (*root.as_ptr()).seal(region, 0)
}

/// Rewrite every sealed offset in the graph stored at `root` back into
/// an absolute pointer at `region`'s base, in place.
///
/// `root` is already absolute: callers obtain it by casting the
/// region's first bytes (see
/// [`unseal_from_buffer`](crate::unseal_from_buffer)). An offset
/// outside `[BIAS, size + BIAS)` fails with the same errors and
/// poisoning semantics as [`seal`].
///
/// # Safety
///
/// `root` must point at the root payload of a sealed graph stored
/// within `region`, with exclusive access for the duration of the
/// call.
pub unsafe fn unseal<T: Relocate>(root: &Own<T>, region: Region) -> Result<(), Error> {
    const {
        assert!(
            std::mem::align_of::<T>() <= MAX_ALIGN,
            "payload alignment exceeds what the biased offsets preserve"
        );
    }
    let addr = root.as_ptr() as usize;
    if !region.contains(addr) {
        return Err(Error::PointerNotInRange { addr });
    }
    (*root.as_ptr()).unseal(region, 0)
}
