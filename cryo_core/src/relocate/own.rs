//! Owned single-target pointer.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::arena::Arena;
use crate::error::Error;
use crate::region::Region;
use crate::relocate::{descend, Relocate};
use crate::trace::Tracer;

/// Exclusive ownership of a single heap-allocated `T`.
///
/// The relocatable counterpart of `Box<T>`: a bare non-null pointer
/// with a guaranteed `#[repr(transparent)]` layout, so the seal walk
/// can overwrite the pointer bytes with a biased offset in place.
/// `Box` cannot be used for this — a `Box` holding a dangling value is
/// immediate undefined behaviour, while a sealed `Own` is merely a
/// number wearing a pointer type.
///
/// `Option<Own<T>>` is pointer-sized: the null-pointer optimization
/// applies to transparent wrappers around `NonNull`, and `None` is the
/// null pointer. Sealed offsets start at [`BIAS`](crate::region::BIAS)
/// `>= 1`, so a sealed `Some` can never be mistaken for `None`.
///
/// # Ownership
///
/// `Own` does not implement `Drop`. Graph memory belongs to whichever
/// allocator produced it — an arena discarded wholesale, or a region
/// buffer — never to individual handles. Dropping an `Own` built from
/// [`Own::from_box`] without reclaiming the allocation leaks it.
#[repr(transparent)]
pub struct Own<T: Relocate> {
    /// Pointer to the owned allocation. Absolute while live, compacted
    /// or unsealed; a biased offset while sealed.
    ptr: NonNull<T>,
    /// Marker for ownership of the pointee.
    _marker: PhantomData<T>,
}

impl<T: Relocate> Own<T> {
    /// Move `value` into a fresh allocation from `arena`.
    pub fn new_in(value: T, arena: &dyn Arena) -> Result<Self, Error> {
        let dst = arena.allocate(Layout::new::<T>())?.cast::<T>();
        // SAFETY: `dst` is freshly allocated, aligned and exclusive.
        unsafe {
            dst.as_ptr().write(value);
        }
        Ok(Self {
            ptr: dst,
            _marker: PhantomData,
        })
    }

    /// Take ownership of a boxed value.
    ///
    /// The allocation is leaked out of the global allocator; see the
    /// ownership note on [`Own`].
    pub fn from_box(value: Box<T>) -> Self {
        // SAFETY: `Box::into_raw` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Wrap a raw pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a valid, exclusively owned `T` (or, for a
    /// sealed graph, hold the biased offset the unseal walk expects).
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Get the raw pointer.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Get the pointer as `NonNull`.
    #[inline]
    pub fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    /// Borrow the pointee.
    ///
    /// # Safety
    ///
    /// The graph must be in a dereferenceable state (live, compacted or
    /// unsealed — never sealed) and not concurrently mutated.
    #[inline]
    pub unsafe fn as_ref(&self) -> &T {
        self.ptr.as_ref()
    }

    /// Mutably borrow the pointee.
    ///
    /// # Safety
    ///
    /// As for [`Own::as_ref`], plus exclusive access.
    #[inline]
    pub unsafe fn as_mut(&mut self) -> &mut T {
        self.ptr.as_mut()
    }
}

impl<T: Relocate> fmt::Debug for Own<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Own({:#x})", self.ptr.as_ptr() as usize)
    }
}

// SAFETY: the pointee is duplicated (allocate, bit-copy, recurse into
// the copy) on repair; seal rewrites children first so the target is
// still addressable mid-walk, and unseal rewrites the pointer first so
// recursion has a valid absolute address. Each walk touches the
// pointer field exactly once.
unsafe impl<T: Relocate> Relocate for Own<T> {
    const CONTAINS_POINTER: bool = true;

    unsafe fn repair(&mut self, arena: &dyn Arena, depth: usize) -> Result<(), Error> {
        let depth = descend(depth)?;
        let dst = arena.allocate(Layout::new::<T>())?.cast::<T>();
        // SAFETY: source is a live allocation of one `T`; `dst` is a
        // fresh, disjoint allocation of the same layout.
        std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), dst.as_ptr(), 1);
        self.ptr = dst;
        if T::CONTAINS_POINTER {
            (*dst.as_ptr()).repair(arena, depth)?;
        }
        Ok(())
    }

    unsafe fn seal(&mut self, region: Region, depth: usize) -> Result<(), Error> {
        let depth = descend(depth)?;
        // Children first: the target must stay addressable while its
        // own pointer fields are rewritten.
        if T::CONTAINS_POINTER {
            (*self.ptr.as_ptr()).seal(region, depth)?;
        }
        let addr = self.ptr.as_ptr() as usize;
        let sealed = region
            .seal_addr(addr)
            .ok_or(Error::PointerNotInRange { addr })?;
        // SAFETY: sealed >= BIAS >= 1, so never null.
        self.ptr = NonNull::new_unchecked(sealed as *mut T);
        Ok(())
    }

    unsafe fn unseal(&mut self, region: Region, depth: usize) -> Result<(), Error> {
        let depth = descend(depth)?;
        // Pointer first: recursion below needs the absolute address.
        let sealed = self.ptr.as_ptr() as usize;
        let addr = region
            .unseal_addr(sealed)
            .ok_or(Error::PointerNotInRange { addr: sealed })?;
        // SAFETY: `addr` lies inside the region, so never null.
        self.ptr = NonNull::new_unchecked(addr as *mut T);
        if T::CONTAINS_POINTER {
            (*self.ptr.as_ptr()).unseal(region, depth)?;
        }
        Ok(())
    }

    unsafe fn trace(&self, tracer: &mut dyn Tracer, depth: usize) -> Result<(), Error> {
        let depth = descend(depth)?;
        tracer.visit_one(self.ptr.as_ptr() as usize, Layout::new::<T>())?;
        if T::CONTAINS_POINTER {
            (*self.ptr.as_ptr()).trace(tracer, depth)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpRegion;
    use crate::region::BIAS;

    #[test]
    fn test_option_own_is_pointer_sized() {
        assert_eq!(
            std::mem::size_of::<Option<Own<u64>>>(),
            std::mem::size_of::<*mut u64>()
        );
    }

    #[test]
    fn test_new_in_round_trip() {
        let heap = bumpalo::Bump::new();
        let own = Own::new_in(0x0123_4567u32, &heap).unwrap();
        // SAFETY: freshly allocated live value.
        assert_eq!(unsafe { *own.as_ref() }, 0x0123_4567);
    }

    #[test]
    fn test_repair_duplicates_target() {
        let heap = bumpalo::Bump::new();
        let mut own = Own::from_box(Box::new(99u64));
        let old_ptr = own.as_ptr();

        // SAFETY: live graph, exclusive access.
        unsafe { own.repair(&heap, 0).unwrap() };

        assert_ne!(own.as_ptr(), old_ptr);
        assert_eq!(unsafe { *own.as_ref() }, 99);
    }

    #[test]
    fn test_seal_unseal_single_pointer() {
        #[repr(align(8))]
        struct Buf([u8; 64]);
        let mut buf = Buf([0; 64]);
        let bump = BumpRegion::new(&mut buf.0);
        let region = bump.region();

        let mut own = Own::new_in(7u32, &bump).unwrap();
        let absolute = own.as_ptr();

        // SAFETY: compacted into `region`, exclusive access.
        unsafe {
            own.seal(region, 0).unwrap();
            assert_eq!(own.as_ptr() as usize, BIAS);
            own.unseal(region, 0).unwrap();
        }
        assert_eq!(own.as_ptr(), absolute);
        assert_eq!(unsafe { *own.as_ref() }, 7);
    }

    #[test]
    fn test_seal_rejects_foreign_pointer() {
        let region = Region::new(0x4000, 0x100);
        let mut own = Own::from_box(Box::new(1u8));
        let addr = own.as_ptr() as usize;

        // SAFETY: walk fails before dereferencing anything sealed.
        let err = unsafe { own.seal(region, 0) };
        assert_eq!(err, Err(Error::PointerNotInRange { addr }));
    }

    #[test]
    fn test_unseal_rejects_out_of_range_offset() {
        let region = Region::new(0x4000, 0x10);
        // Offset far past the region size.
        let mut own: Own<u8> =
            unsafe { Own::from_raw(NonNull::new(0x9999 as *mut u8).unwrap()) };

        let err = unsafe { own.unseal(region, 0) };
        assert_eq!(err, Err(Error::PointerNotInRange { addr: 0x9999 }));
    }
}
