//! Shared test mapper
//!
//! Serves page-aligned regions from the process heap, counts mapper calls,
//! records the last handle seen, and can be told to fail the next request.

#![allow(dead_code)]

use std::alloc::{Layout, alloc, dealloc};
use std::cell::{Cell, RefCell};
use std::ptr::null_mut;

use slabkit_alloc::{MapHandle, MapProt, PageMapper};

/// Page granularity reported by the test mapper.
pub const PAGE_SIZE: usize = 4096;

pub struct TestMapper {
    regions: RefCell<Vec<(*mut u8, Layout)>>,
    map_calls: Cell<usize>,
    last_handle: Cell<MapHandle>,
    fail_next: Cell<bool>,
}

impl TestMapper {
    pub fn new() -> Self {
        Self {
            regions: RefCell::new(Vec::new()),
            map_calls: Cell::new(0),
            last_handle: Cell::new(0),
            fail_next: Cell::new(false),
        }
    }

    /// Number of `map` calls seen, including failed ones.
    pub fn map_calls(&self) -> usize {
        self.map_calls.get()
    }

    /// Handle passed with the most recent `map` call.
    pub fn last_handle(&self) -> MapHandle {
        self.last_handle.get()
    }

    /// Makes the next `map` call report exhaustion.
    pub fn fail_next_map(&self) {
        self.fail_next.set(true);
    }
}

impl PageMapper for TestMapper {
    fn map(&self, handle: MapHandle, size: usize, prot: MapProt) -> *mut u8 {
        assert_eq!(prot, MapProt::RW, "engine must request RW, no-exec regions");
        self.map_calls.set(self.map_calls.get() + 1);
        self.last_handle.set(handle);
        if self.fail_next.replace(false) {
            return null_mut();
        }
        let layout = Layout::from_size_align(size, PAGE_SIZE).unwrap();
        let region = unsafe { alloc(layout) };
        if !region.is_null() {
            self.regions.borrow_mut().push((region, layout));
        }
        region
    }

    unsafe fn unmap(&self, _handle: MapHandle, _region: *mut u8, _size: usize) {
        // The engine never unmaps; regions are reclaimed when the mapper drops.
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}

impl Drop for TestMapper {
    fn drop(&mut self) {
        for (region, layout) in self.regions.borrow_mut().drain(..) {
            unsafe { dealloc(region, layout) };
        }
    }
}
