//! Fixed-class slab allocation engine
//!
//! The allocator owns a table of size classes, each serving power-of-two
//! entries from dedicated slabs. Slabs are mapped on demand through the
//! embedder's [`PageMapper`] and are never returned; a slab leaves its class
//! list while fully used and rejoins at the tail on its first free.

use core::mem;
use core::ptr::{self, null_mut};

use slabkit_api::{MapHandle, MapProt, PageMapper, Result, error};

use crate::bits;
use crate::class::{
    MAX_CLASS_COUNT, MAX_SLAB_BYTES, MIN_ENTRY_SHIFT, MIN_ENTRY_SIZE, SizeClass,
    class_for_request, entry_size_for_class,
};
use crate::slab::{FREE_LIST_END, SlabHeader};

/// Per-slab region size substituted when the embedder passes zero.
pub const DEFAULT_SLAB_BYTES: usize = 4096;

/// Allocator statistics.
///
/// Pure observability; nothing in the engine reads these back.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorStats {
    /// Bytes currently handed out, measured in class entry sizes.
    pub used: usize,
    /// Total bytes mapped across all slabs.
    pub allocated: usize,
    /// Total number of slabs mapped.
    pub slab_count: usize,
}

/// Fixed-class slab allocator over an external page mapper.
///
/// The state is a fixed-size value owned by the caller. Slab headers record
/// the state's address for ownership validation, so once any entry has been
/// handed out the state must remain at a stable address; a moved state makes
/// previously returned pointers unresolvable (frees become no-ops), it never
/// corrupts memory.
///
/// All operations are single-threaded; callers sharing an allocator across
/// threads must serialize every call, e.g. via
/// [`LockedSlabAllocator`](crate::LockedSlabAllocator).
pub struct SlabAllocator<M: PageMapper> {
    classes: [SizeClass; MAX_CLASS_COUNT],
    class_count: usize,
    slab_bytes: usize,
    map_handle: MapHandle,
    mapper: M,
    stats: AllocatorStats,
}

impl<M: PageMapper> SlabAllocator<M> {
    /// Bytes a caller needs to store the allocator state.
    pub const fn state_size() -> usize {
        mem::size_of::<Self>()
    }

    /// Creates an allocator serving entries up to one class below
    /// `max_entry_size` from slabs of `slab_bytes` bytes.
    ///
    /// `max_entry_size` must be a power of two of at least 64 (a value of 32
    /// would leave zero usable classes). `slab_bytes` must be a power of two
    /// no larger than [`MAX_SLAB_BYTES`] and strictly greater than
    /// `max_entry_size`; zero substitutes [`DEFAULT_SLAB_BYTES`].
    /// `map_handle` is stored and passed through to the mapper verbatim.
    pub fn new(
        mapper: M,
        max_entry_size: usize,
        slab_bytes: usize,
        map_handle: MapHandle,
    ) -> Result<Self> {
        if !bits::is_power_of_two(max_entry_size as u64) {
            return Err(error::config_error("max entry size must be a power of two"));
        }
        if max_entry_size < MIN_ENTRY_SIZE {
            return Err(error::config_error("max entry size below the minimum entry size"));
        }
        let slab_bytes = if slab_bytes == 0 { DEFAULT_SLAB_BYTES } else { slab_bytes };
        if !bits::is_power_of_two(slab_bytes as u64) || slab_bytes > MAX_SLAB_BYTES {
            return Err(error::config_error("slab size must be a power of two up to 256 KiB"));
        }
        if slab_bytes <= max_entry_size {
            return Err(error::config_error("slab size must exceed the max entry size"));
        }

        let class_count = bits::first_set(max_entry_size as u64) as usize - MIN_ENTRY_SHIFT;
        if class_count == 0 {
            return Err(error::config_error("max entry size leaves no usable class"));
        }
        debug_assert!(class_count <= MAX_CLASS_COUNT);

        Ok(Self {
            classes: [const { SizeClass::new() }; MAX_CLASS_COUNT],
            class_count,
            slab_bytes,
            map_handle,
            mapper,
            stats: AllocatorStats::default(),
        })
    }

    /// Replaces the opaque handle passed through to the mapper.
    pub fn set_map_handle(&mut self, map_handle: MapHandle) {
        self.map_handle = map_handle;
    }

    /// Allocates an entry of at least `size` bytes.
    ///
    /// Returns null for zero or oversize requests, and when the mapper cannot
    /// provide a fresh slab. The entry's contents are undefined; its first
    /// four bytes still hold the stale free-list link.
    pub fn alloc(&mut self, size: usize) -> *mut u8 {
        let Some((class_index, entry_size)) = class_for_request(size, self.class_count) else {
            return null_mut();
        };

        if self.classes[class_index].head().is_null()
            && unsafe { self.map_new_slab(class_index, entry_size) }.is_null()
        {
            return null_mut();
        }

        let slab = self.classes[class_index].head();
        let entry = unsafe {
            let entry = SlabHeader::entry_ptr(slab, (*slab).free_head as usize, entry_size);
            let next = (entry as *const u32).read();
            (*slab).free_head = next;
            if next == FREE_LIST_END {
                // Last free entry taken: the slab leaves the class list.
                self.classes[class_index].detach(slab);
            }
            entry
        };
        self.stats.used += entry_size;
        entry
    }

    /// Allocates a zeroed region for `count` objects of `object_size` bytes.
    ///
    /// Returns null when the multiplication overflows or the underlying
    /// allocation fails; nothing is zeroed in that case.
    pub fn calloc(&mut self, count: usize, object_size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(object_size) else {
            return null_mut();
        };
        let entry = self.alloc(total);
        if !entry.is_null() {
            unsafe { ptr::write_bytes(entry, 0, total) };
        }
        entry
    }

    /// Returns `ptr` to its slab's free list.
    ///
    /// Null and unrecognized pointers are ignored silently. Interior pointers
    /// are aligned down to their entry. A fully used slab rejoins its class
    /// list at the tail.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by this
    /// allocator that has not been freed since. The resolver scans backwards
    /// from arbitrary addresses by design and may touch unmapped memory when
    /// handed a foreign pointer.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let Some(slab) = (unsafe { self.slab_for_ptr(ptr) }) else {
            #[cfg(feature = "log")]
            log::debug!("free: unrecognized pointer {:p} ignored", ptr);
            return;
        };

        let entry_size = unsafe {
            let class_index = (*slab).class_index();
            let entry_size = entry_size_for_class(class_index);
            let data = SlabHeader::data_base(slab) as usize;
            if (ptr as usize) < data {
                // Points into the header.
                return;
            }
            let index = (ptr as usize - data) / entry_size;
            if index >= SlabHeader::entry_count(self.slab_bytes, entry_size) {
                return;
            }

            if (*slab).free_head == FREE_LIST_END {
                // First free into a fully used slab: rejoin the class list.
                self.classes[class_index].attach_tail(slab);
            }
            let link = SlabHeader::entry_ptr(slab, index, entry_size) as *mut u32;
            link.write((*slab).free_head);
            (*slab).free_head = index as u32;
            entry_size
        };
        self.stats.used = self.stats.used.saturating_sub(entry_size);
    }

    /// Resizes the allocation at `ptr` to `new_size` bytes.
    ///
    /// A zero `new_size` frees and returns null; a null `ptr` allocates. The
    /// data is always moved to a fresh entry, copying up to the old class
    /// entry size, which may include bytes past the caller's original
    /// request. On failure the old entry is retained and null is returned.
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free).
    pub unsafe fn realloc(&mut self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        if new_size == 0 {
            unsafe { self.free(ptr) };
            return null_mut();
        }
        if ptr.is_null() {
            return self.alloc(new_size);
        }
        let old_size = unsafe { self.getsize(ptr) };
        if old_size == usize::MAX {
            return null_mut();
        }
        let entry = self.alloc(new_size);
        if entry.is_null() {
            return null_mut();
        }
        unsafe {
            ptr::copy_nonoverlapping(ptr, entry, old_size.min(new_size));
            self.free(ptr);
        }
        entry
    }

    /// Reports the class entry size backing `ptr`, or `usize::MAX` when the
    /// pointer does not resolve to a slab of this allocator.
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free).
    pub unsafe fn getsize(&self, ptr: *const u8) -> usize {
        if ptr.is_null() {
            return usize::MAX;
        }
        match unsafe { self.slab_for_ptr(ptr) } {
            Some(slab) => entry_size_for_class(unsafe { (*slab).class_index() }),
            None => usize::MAX,
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }

    /// Maps, initializes, and links a fresh slab for `class_index`.
    /// Returns null when the mapper cannot provide a region.
    unsafe fn map_new_slab(&mut self, class_index: usize, entry_size: usize) -> *mut SlabHeader {
        let region = self.mapper.map(self.map_handle, self.slab_bytes, MapProt::RW);
        if region.is_null() {
            return null_mut();
        }
        let owner = self as *const Self as *const u8;
        let slab = unsafe {
            let slab = SlabHeader::initialize(region, owner, class_index, entry_size, self.slab_bytes);
            self.classes[class_index].attach_tail(slab);
            slab
        };
        self.stats.allocated += self.slab_bytes;
        self.stats.slab_count += 1;
        #[cfg(feature = "log")]
        log::trace!(
            "mapped new slab for class {} ({} byte entries)",
            class_index,
            entry_size
        );
        slab
    }

    /// Recovers the slab header owning `ptr` by page-aligned back-scan and
    /// magic validation.
    ///
    /// # Safety
    ///
    /// Reads candidate header words at page-aligned addresses below `ptr`;
    /// callers must only pass pointers previously returned by this allocator,
    /// anything else may touch unmapped memory.
    unsafe fn slab_for_ptr(&self, ptr: *const u8) -> Option<*mut SlabHeader> {
        let page_size = self.mapper.page_size();
        if self.slab_bytes == page_size {
            // Every slab is aligned to its own size.
            let candidate = bits::align_down(ptr as usize, self.slab_bytes);
            return unsafe { self.validate_candidate(candidate as *mut SlabHeader) }.0;
        }

        let mut candidate = bits::align_down(ptr as usize, page_size);
        let mut searched = 0;
        while searched < self.slab_bytes {
            let (slab, magic_valid) =
                unsafe { self.validate_candidate(candidate as *mut SlabHeader) };
            if slab.is_some() {
                return slab;
            }
            if magic_valid {
                // Valid magic under a foreign owner: stepping further back
                // would cross into another allocator's region.
                break;
            }
            candidate = match candidate.checked_sub(page_size) {
                Some(lower) => lower,
                None => break,
            };
            searched += page_size;
        }
        None
    }

    /// Checks one candidate header address. The boolean reports whether the
    /// fixed magic bits and class index looked valid, regardless of owner.
    unsafe fn validate_candidate(
        &self,
        candidate: *mut SlabHeader,
    ) -> (Option<*mut SlabHeader>, bool) {
        let header = unsafe { &*candidate };
        if !header.magic_matches() {
            return (None, false);
        }
        if header.class_index() >= self.class_count {
            return (None, false);
        }
        if header.owner != self as *const Self as *const u8 {
            return (None, true);
        }
        (Some(candidate), true)
    }
}

// The state is safe to hand across threads when every call is serialized by
// an external lock; its raw pointers only reference slabs the state owns.
unsafe impl<M: PageMapper + Send> Send for SlabAllocator<M> {}
unsafe impl<M: PageMapper + Sync> Sync for SlabAllocator<M> {}

#[cfg(test)]
mod tests {
    use core::ptr::null_mut;

    use super::*;

    /// Mapper that always reports exhaustion.
    struct FailingMapper;

    impl PageMapper for FailingMapper {
        fn map(&self, _handle: MapHandle, _size: usize, _prot: MapProt) -> *mut u8 {
            null_mut()
        }

        unsafe fn unmap(&self, _handle: MapHandle, _region: *mut u8, _size: usize) {}

        fn page_size(&self) -> usize {
            4096
        }
    }

    #[test]
    fn test_init_validation() {
        assert!(SlabAllocator::new(FailingMapper, 0x1000, 0x4000, 0).is_ok());
        // Default slab size kicks in for zero.
        assert!(SlabAllocator::new(FailingMapper, 0x100, 0, 0).is_ok());

        // Non-power-of-two sizes.
        assert!(SlabAllocator::new(FailingMapper, 0x1001, 0x4000, 0).is_err());
        assert!(SlabAllocator::new(FailingMapper, 0x1000, 0x3000, 0).is_err());
        // Size ordering and ceilings.
        assert!(SlabAllocator::new(FailingMapper, 0x1000, 0x1000, 0).is_err());
        assert!(SlabAllocator::new(FailingMapper, 0x1000, 0x80000, 0).is_err());
        assert!(SlabAllocator::new(FailingMapper, 16, 0x1000, 0).is_err());
        // 32 yields zero classes.
        assert!(SlabAllocator::new(FailingMapper, 32, 0x1000, 0).is_err());
    }

    #[test]
    fn test_mapper_failure_fails_alloc() {
        let mut alloc = SlabAllocator::new(FailingMapper, 0x1000, 0x4000, 0).unwrap();
        assert!(alloc.alloc(64).is_null());
        assert_eq!(alloc.stats().slab_count, 0);
        assert_eq!(alloc.stats().used, 0);
    }

    #[test]
    fn test_rejected_requests() {
        let mut alloc = SlabAllocator::new(FailingMapper, 0x1000, 0x4000, 0).unwrap();
        assert!(alloc.alloc(0).is_null());
        // Largest class serves half the configured maximum.
        assert!(alloc.alloc(0x1000).is_null());
        assert!(alloc.alloc(MAX_SLAB_BYTES + 1).is_null());
        // calloc overflow.
        assert!(alloc.calloc(usize::MAX, 2).is_null());
    }

    #[test]
    fn test_state_size() {
        assert!(SlabAllocator::<FailingMapper>::state_size() > 0);
    }
}
