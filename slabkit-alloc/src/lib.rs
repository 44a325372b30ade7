//! Slabkit allocator
//!
//! This crate provides fixed-class slab allocation over an external page
//! mapper. Requests are partitioned into power-of-two size classes from 32
//! bytes up; each class serves entries from dedicated slabs carved out of
//! page-aligned regions obtained through the embedder's
//! [`PageMapper`](slabkit_api::PageMapper). Slabs are mapped only when a
//! class runs out of free entries and are never returned to the mapper.
//!
//! The core is single-threaded; [`LockedSlabAllocator`] supplies the
//! external locking layer for shared use.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export API types
pub use slabkit_api::*;

// Allocator modules
pub mod allocator;
pub mod locked;

mod bits;
mod class;
mod slab;

// Re-export commonly used types
pub use allocator::{AllocatorStats, DEFAULT_SLAB_BYTES, SlabAllocator};
pub use class::{MAX_SLAB_BYTES, MIN_ENTRY_SIZE};
pub use locked::LockedSlabAllocator;

/// Bytes of in-band metadata at the front of every slab; the rest of a slab
/// region is the entry array.
pub const SLAB_HEADER_BYTES: usize = slab::HEADER_BYTES;
