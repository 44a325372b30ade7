//! Page mapper interface
//!
//! The allocator engine never maps memory itself; it asks an embedder-supplied
//! [`PageMapper`] for page-aligned regions and hands the opaque [`MapHandle`]
//! through verbatim. The handle lets one mapper serve several allocator
//! instances (for example a paged-pool and a non-paged-pool allocator sharing
//! a back-end).

use bitflags::bitflags;

/// Opaque handle passed through to the mapper with every request.
///
/// The engine never interprets it.
pub type MapHandle = usize;

bitflags! {
    /// Protection flags for mapped regions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapProt: u8 {
        /// Region is readable.
        const READ = 1 << 0;
        /// Region is writable.
        const WRITE = 1 << 1;
        /// Region is executable. The engine never requests this.
        const EXEC = 1 << 2;
    }
}

impl MapProt {
    /// The protections the engine requests for every slab: read-write,
    /// no-execute.
    pub const RW: MapProt = MapProt::READ.union(MapProt::WRITE);
}

/// Trait for page mapping back-ends.
///
/// Regions returned by [`map`](PageMapper::map) must be aligned to at least
/// [`page_size`](PageMapper::page_size); when the requested size equals the
/// page size the region is therefore aligned to its own size, which the
/// engine's pointer resolver relies on.
pub trait PageMapper {
    /// Maps a region of at least `size` bytes with the given protections.
    ///
    /// Returns a null pointer when no region can be provided; the engine
    /// treats that as allocation failure, not as an error to escalate.
    fn map(&self, handle: MapHandle, size: usize, prot: MapProt) -> *mut u8;

    /// Releases a previously mapped region.
    ///
    /// The engine never calls this in the current design (slabs live for the
    /// allocator's lifetime) but the capability is part of the contract.
    ///
    /// # Safety
    ///
    /// `region` must be a pointer previously returned by
    /// [`map`](PageMapper::map) on this mapper with the same `size`, and no
    /// live references into the region may remain.
    unsafe fn unmap(&self, handle: MapHandle, region: *mut u8, size: usize);

    /// Returns the system page granularity, a positive power of two.
    fn page_size(&self) -> usize;
}

impl<M: PageMapper + ?Sized> PageMapper for &M {
    fn map(&self, handle: MapHandle, size: usize, prot: MapProt) -> *mut u8 {
        (**self).map(handle, size, prot)
    }

    unsafe fn unmap(&self, handle: MapHandle, region: *mut u8, size: usize) {
        unsafe { (**self).unmap(handle, region, size) }
    }

    fn page_size(&self) -> usize {
        (**self).page_size()
    }
}
