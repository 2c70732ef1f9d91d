//! Cryo: relocatable object-graph checkpointing.
//!
//! A type-directed facility for deep-copying a rooted, pointer-linked
//! data structure into a caller-supplied contiguous byte region and
//! rewriting every internal pointer into a region-relative offset, so
//! the whole region becomes byte-for-byte position-independent. The
//! inverse restores absolute pointers at a possibly different address.
//! The intended use is cheap checkpointing of large in-process state —
//! dump a world snapshot to disk or a socket, load it later, patch
//! pointers, resume.
//!
//! # Architecture
//!
//! Three operations compose over one primitive, the structural walker
//! [`Relocate`]:
//!
//! - **[`compact()`]** deep-copies a graph into an [`Arena`], fixing
//!   up interior pointers as it goes — one pass of a copying
//!   collector.
//! - **[`seal()`]** rewrites every pointer in a compacted region into
//!   `(pointer - base) + BIAS`, in place, children first.
//! - **[`unseal()`]** is the mirror: offsets back to absolute
//!   pointers, pointers first.
//!
//! [`seal_into_buffer`] and [`unseal_from_buffer`] bundle them into
//! one-call serialize/deserialize over a byte buffer.
//!
//! ```text
//!   live ── compact ──▶ compacted ── seal ──▶ sealed ◀── (bit-copy, disk, …)
//!                        ▲                      │
//!                        │                   unseal
//!                        │                      ▼
//!                        └──────── compact ── compacted-at-new-base
//! ```
//!
//! The walker is regenerated per type at compile time — derive it with
//! `#[derive(Relocate)]` from the `cryo_derive` crate, or implement it
//! by hand for full control. There is no runtime type registry, and
//! kinds the walker cannot handle structurally (raw pointers, function
//! pointers, zero-sized types, unions with pointer fields) are
//! rejected at compile time.
//!
//! # Usage
//!
//! ```ignore
//! use cryo_core::{seal_into_buffer, unseal_from_buffer, Aligned, Own, RawSlice};
//! use cryo_derive::Relocate;
//!
//! #[derive(Relocate)]
//! struct World {
//!     tick: u64,
//!     name: RawSlice<u8>,
//! }
//!
//! let live = bumpalo::Bump::new();
//! let root = Own::new_in(
//!     World { tick: 42, name: RawSlice::from_str_in("overworld", &live)? },
//!     &live,
//! )?;
//!
//! // Serialize: the first `used` bytes are position-independent.
//! let mut buf = Aligned::<256>::new();
//! let used = unsafe { seal_into_buffer(&root, buf.bytes_mut())? };
//!
//! // … write buf[..used] to disk, read it back anywhere …
//!
//! // Deserialize into any arena.
//! let heap = bumpalo::Bump::new();
//! let world: Own<World> = unsafe { unseal_from_buffer(buf.bytes_mut(), &heap)? };
//! ```
//!
//! # Safety
//!
//! The machinery requires that:
//! - the graph is a finite tree — no sharing, no cycles (check with
//!   [`validate`] when in doubt);
//! - every pointer is exclusively owned by the field holding it;
//! - nothing outside the graph points in, and after compacting,
//!   nothing inside points out.
//!
//! A sealed region is a raw byte image of the host layout: no header,
//! no versioning, no endianness conversion. It is only readable where
//! pointer width, endianness, struct layout and [`BIAS`] match.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod buffer;
pub mod compact;
pub mod error;
pub mod region;
pub mod relocate;
pub mod seal;
pub mod trace;

pub use arena::{Arena, BumpRegion};
pub use buffer::{seal_into_buffer, unseal_from_buffer, Aligned};
pub use compact::compact;
pub use error::Error;
pub use region::{Region, BIAS, MAX_ALIGN, MAX_DEPTH};
pub use relocate::{contains_pointer, Own, RawSlice, Relocate};
pub use seal::{seal, unseal};
pub use trace::{measure, validate, GraphStats, Tracer};
