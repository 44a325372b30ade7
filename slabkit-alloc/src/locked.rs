//! External locking wrapper
//!
//! The engine itself is single-threaded by contract; callers sharing an
//! allocator across threads wrap every call in a mutual-exclusion primitive.
//! [`LockedSlabAllocator`] packages that wrapper: a `spin::Mutex` around the
//! state, locked per forwarded call.

use slabkit_api::{MapHandle, PageMapper, Result};
use spin::{Mutex, MutexGuard};

use crate::allocator::{AllocatorStats, SlabAllocator};

/// A [`SlabAllocator`] behind a spin mutex.
///
/// Suitable as a shared or global allocator instance. The stable-address
/// requirement of [`SlabAllocator`] carries over: keep the wrapper in place
/// (e.g. in a `static`) once entries have been handed out.
pub struct LockedSlabAllocator<M: PageMapper> {
    inner: Mutex<SlabAllocator<M>>,
}

impl<M: PageMapper> LockedSlabAllocator<M> {
    /// Creates a locked allocator; parameters as [`SlabAllocator::new`].
    pub fn new(
        mapper: M,
        max_entry_size: usize,
        slab_bytes: usize,
        map_handle: MapHandle,
    ) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(SlabAllocator::new(mapper, max_entry_size, slab_bytes, map_handle)?),
        })
    }

    /// Locked [`SlabAllocator::alloc`].
    pub fn alloc(&self, size: usize) -> *mut u8 {
        self.inner.lock().alloc(size)
    }

    /// Locked [`SlabAllocator::calloc`].
    pub fn calloc(&self, count: usize, object_size: usize) -> *mut u8 {
        self.inner.lock().calloc(count, object_size)
    }

    /// Locked [`SlabAllocator::free`].
    ///
    /// # Safety
    ///
    /// Same contract as [`SlabAllocator::free`].
    pub unsafe fn free(&self, ptr: *mut u8) {
        unsafe { self.inner.lock().free(ptr) }
    }

    /// Locked [`SlabAllocator::realloc`].
    ///
    /// # Safety
    ///
    /// Same contract as [`SlabAllocator::realloc`].
    pub unsafe fn realloc(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe { self.inner.lock().realloc(ptr, new_size) }
    }

    /// Locked [`SlabAllocator::getsize`].
    ///
    /// # Safety
    ///
    /// Same contract as [`SlabAllocator::getsize`].
    pub unsafe fn getsize(&self, ptr: *const u8) -> usize {
        unsafe { self.inner.lock().getsize(ptr) }
    }

    /// Locked [`SlabAllocator::set_map_handle`].
    pub fn set_map_handle(&self, map_handle: MapHandle) {
        self.inner.lock().set_map_handle(map_handle)
    }

    /// Locked [`SlabAllocator::stats`].
    pub fn stats(&self) -> AllocatorStats {
        self.inner.lock().stats()
    }

    /// Locks the inner allocator for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, SlabAllocator<M>> {
        self.inner.lock()
    }
}
