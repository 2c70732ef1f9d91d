//! Buffer façade: one-call serialize and deserialize.
//!
//! [`seal_into_buffer`] bundles compact + seal over a caller-supplied
//! byte buffer: the buffer becomes a bump region, the graph is
//! compacted into it with the root at byte 0, and the result is sealed
//! in place. The returned byte count is the prefix of the buffer worth
//! persisting.
//!
//! [`unseal_from_buffer`] is the inverse: unseal the buffer in place,
//! compact the now-usable graph into a caller-supplied arena so the
//! returned root outlives the buffer, then re-seal the buffer so it is
//! once again position-independent and free to be reused, copied or
//! discarded.
//!
//! The caller is responsible for buffer alignment: at least
//! `align_of::<T>()`, which [`Aligned`] provides generously. A sealed
//! region carries no header, magic or type hash — the reader must know
//! `T` statically, and both sides must share pointer width, endianness,
//! struct layout and [`BIAS`](crate::region::BIAS).

use crate::arena::{Arena, BumpRegion};
use crate::error::Error;
use crate::region::{Region, MAX_ALIGN};
use crate::relocate::{Own, Relocate};
use crate::seal::{seal, unseal};
use crate::compact::compact;

/// A byte buffer aligned for any relocatable payload.
///
/// 16-byte alignment comfortably covers [`MAX_ALIGN`]; stack arrays
/// and `Vec<u8>` give no such guarantee.
#[repr(C, align(16))]
pub struct Aligned<const N: usize>(pub [u8; N]);

impl<const N: usize> Aligned<N> {
    /// A zeroed buffer.
    pub const fn new() -> Self {
        Self([0; N])
    }

    /// Borrow the bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Mutably borrow the bytes.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const N: usize> Default for Aligned<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact the graph rooted at `root` into `bytes` and seal it there.
///
/// On success the first `used` returned bytes hold a sealed,
/// position-independent image of the graph whose root payload sits at
/// `bytes[0]`. Fails with [`Error::OutOfMemory`] when the buffer is
/// too small; the buffer contents are then unspecified and the buffer
/// should be reset before retrying.
///
/// # Panics
///
/// Panics if `bytes` is not aligned to `align_of::<T>()`; misaligned
/// buffers would put the root off `bytes[0]` and break the
/// deserialize contract.
///
/// # Safety
///
/// As for [`compact`]: `root` must head a live, tree-shaped graph with
/// no concurrent access, and `bytes` must not be touched by anything
/// else during the call.
pub unsafe fn seal_into_buffer<T: Relocate>(
    root: &Own<T>,
    bytes: &mut [u8],
) -> Result<usize, Error> {
    const {
        assert!(
            std::mem::align_of::<T>() <= MAX_ALIGN,
            "payload alignment exceeds what the biased offsets preserve"
        );
    }
    assert!(
        bytes.as_ptr() as usize % std::mem::align_of::<T>() == 0,
        "buffer is not aligned for the payload type"
    );
    let bump = BumpRegion::new(bytes);
    let region = bump.region();
    let compacted = compact(root, &bump)?;
    debug_assert_eq!(compacted.as_ptr() as usize, region.base());
    seal(&compacted, region)?;
    Ok(bump.used())
}

/// Reconstruct a graph from a sealed buffer, allocating the result
/// from `arena`.
///
/// The buffer is unsealed in place, the graph compacted out into
/// `arena`, and the buffer re-sealed. Afterwards the buffer is in
/// sealed form again — reusable, copyable, discardable — and the
/// returned root is entirely independent of it.
///
/// # Panics
///
/// Panics if `bytes` is not aligned to `align_of::<T>()`.
///
/// # Safety
///
/// `bytes` must start with the root payload of a graph previously
/// sealed with the same `T` (same layout, same
/// [`BIAS`](crate::region::BIAS)) and be at least as long as the
/// sealed image; nothing else may touch `bytes` or `arena` during the
/// call.
pub unsafe fn unseal_from_buffer<T: Relocate>(
    bytes: &mut [u8],
    arena: &dyn Arena,
) -> Result<Own<T>, Error> {
    const {
        assert!(
            std::mem::align_of::<T>() <= MAX_ALIGN,
            "payload alignment exceeds what the biased offsets preserve"
        );
    }
    assert!(
        bytes.as_ptr() as usize % std::mem::align_of::<T>() == 0,
        "buffer is not aligned for the payload type"
    );
    debug_assert!(bytes.len() >= std::mem::size_of::<T>());
    let region = Region::from_bytes(bytes);
    // SAFETY: the root payload of the sealed image sits at byte 0, per
    // the seal_into_buffer contract.
    let root = Own::from_raw(std::ptr::NonNull::new_unchecked(
        bytes.as_mut_ptr().cast::<T>(),
    ));
    unseal(&root, region)?;
    let fresh = compact(&root, arena)?;
    // Restore the buffer to sealed form. The graph just unsealed from
    // this region cannot fail to seal back into it.
    seal(&root, region)?;
    Ok(fresh)
}
