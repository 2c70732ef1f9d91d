//! Compact: deep-copy a graph into a target allocator.
//!
//! Compacting works like one pass of a copying collector: every owned
//! allocation reachable from the root is copied into the target arena,
//! and every interior pointer in the copies is fixed up to point at
//! the copied targets. Two mutually recursive roles share the work:
//!
//! 1. duplicate — allocate space for one target, bit-copy it
//!    ([`Own`]'s and [`RawSlice`](crate::RawSlice)'s `repair` impls);
//! 2. repair — descend structurally through the fresh copy and
//!    duplicate whatever pointers it still shares with the source
//!    (every other `repair` impl).
//!
//! The source graph is only read; the returned root owns a fully
//! disjoint copy living entirely inside `arena`. Allocations happen
//! parent-before-child, slice elements in ascending order, so a bump
//! arena receives the root first — which is what
//! [`seal_into_buffer`](crate::seal_into_buffer) relies on.

use crate::arena::Arena;
use crate::error::Error;
use crate::relocate::{Own, Relocate};

/// Deep-copy the graph rooted at `root` into `arena`, returning the
/// new root.
///
/// The input graph is untouched. On [`Error::OutOfMemory`] the partial
/// copy is left inside `arena`; the expectation is an arena the caller
/// discards wholesale, so nothing is individually freed.
///
/// # Safety
///
/// `root` must head a live or unsealed graph: a finite tree of valid,
/// exclusively owned allocations with absolute pointers. Compacting a
/// DAG duplicates the shared parts; compacting a cycle does not
/// terminate within [`MAX_DEPTH`](crate::region::MAX_DEPTH) and fails.
/// The graph must not be mutated for the duration of the call, and
/// `arena` must not be shared with concurrent allocators.
pub unsafe fn compact<T: Relocate>(root: &Own<T>, arena: &dyn Arena) -> Result<Own<T>, Error> {
    let mut fresh = Own::from_raw(root.as_non_null());
    fresh.repair(arena, 0)?;
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::BumpRegion;
    use crate::region::Region;
    use crate::relocate::RawSlice;
    use crate::trace::Tracer;

    struct Node {
        label: RawSlice<u8>,
        next: Option<Own<Node>>,
    }

    // SAFETY: both pointer fields walked exactly once, in declaration
    // order.
    unsafe impl Relocate for Node {
        const CONTAINS_POINTER: bool = true;

        unsafe fn repair(&mut self, arena: &dyn Arena, depth: usize) -> Result<(), Error> {
            self.label.repair(arena, depth)?;
            self.next.repair(arena, depth)
        }

        unsafe fn seal(&mut self, region: Region, depth: usize) -> Result<(), Error> {
            self.label.seal(region, depth)?;
            self.next.seal(region, depth)
        }

        unsafe fn unseal(&mut self, region: Region, depth: usize) -> Result<(), Error> {
            self.label.unseal(region, depth)?;
            self.next.unseal(region, depth)
        }

        unsafe fn trace(&self, tracer: &mut dyn Tracer, depth: usize) -> Result<(), Error> {
            self.label.trace(tracer, depth)?;
            self.next.trace(tracer, depth)
        }
    }

    fn chain(heap: &bumpalo::Bump, labels: &[&str]) -> Own<Node> {
        let mut next = None;
        for label in labels.iter().rev() {
            let node = Node {
                label: RawSlice::from_str_in(label, heap).unwrap(),
                next,
            };
            next = Some(Own::new_in(node, heap).unwrap());
        }
        next.expect("at least one label")
    }

    unsafe fn labels_of(root: &Own<Node>) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = Some(root.as_ptr());
        while let Some(node) = cursor {
            out.push(String::from_utf8((*node).label.as_slice().to_vec()).unwrap());
            cursor = (*node).next.as_ref().map(|own| own.as_ptr());
        }
        out
    }

    #[test]
    fn test_compact_primitive_pointer() {
        let live = bumpalo::Bump::new();
        let target = bumpalo::Bump::new();
        let root = Own::new_in(0x0123_4567u32, &live).unwrap();

        let copy = unsafe { compact(&root, &target).unwrap() };

        assert_ne!(copy.as_ptr(), root.as_ptr());
        assert_eq!(unsafe { *copy.as_ref() }, 0x0123_4567);
        // The source is untouched.
        assert_eq!(unsafe { *root.as_ref() }, 0x0123_4567);
    }

    #[test]
    fn test_compact_fixed_array() {
        let live = bumpalo::Bump::new();
        let target = bumpalo::Bump::new();
        let root = Own::new_in([1u32, 2, 3], &live).unwrap();

        let copy = unsafe { compact(&root, &target).unwrap() };

        assert_ne!(copy.as_ptr(), root.as_ptr());
        assert_eq!(unsafe { *copy.as_ref() }, [1, 2, 3]);
    }

    #[test]
    fn test_compact_chain_is_disjoint() {
        let live = bumpalo::Bump::new();
        let target = bumpalo::Bump::new();
        let root = chain(&live, &["alpha", "beta", "gamma"]);

        let copy = unsafe { compact(&root, &target).unwrap() };

        unsafe {
            assert_eq!(labels_of(&copy), ["alpha", "beta", "gamma"]);
            // Every allocation moved.
            assert_ne!(copy.as_ptr(), root.as_ptr());
            assert_ne!(
                (*copy.as_ptr()).label.as_ptr(),
                (*root.as_ptr()).label.as_ptr()
            );
        }
    }

    #[test]
    fn test_compact_into_exhausted_region_fails() {
        let live = bumpalo::Bump::new();
        let root = chain(&live, &["alpha", "beta"]);

        #[repr(align(8))]
        struct Buf([u8; 48]);
        let mut buf = Buf([0; 48]);
        let bump = BumpRegion::new(&mut buf.0);

        let err = unsafe { compact(&root, &bump) };
        assert!(matches!(err, Err(Error::OutOfMemory { .. })));
    }

    #[test]
    fn test_compact_root_lands_at_region_base() {
        let live = bumpalo::Bump::new();
        let root = chain(&live, &["alpha"]);

        #[repr(align(8))]
        struct Buf([u8; 128]);
        let mut buf = Buf([0; 128]);
        let base = buf.0.as_ptr() as usize;
        let bump = BumpRegion::new(&mut buf.0);

        let copy = unsafe { compact(&root, &bump).unwrap() };
        assert_eq!(copy.as_ptr() as usize, base);
    }

    #[test]
    fn test_compact_idempotent_on_value() {
        let live = bumpalo::Bump::new();
        let target = bumpalo::Bump::new();
        let root = chain(&live, &["one", "two"]);

        let once = unsafe { compact(&root, &target).unwrap() };
        let twice = unsafe { compact(&once, &target).unwrap() };

        unsafe {
            assert_eq!(labels_of(&once), labels_of(&twice));
        }
    }
}
