//! Size-class table
//!
//! Requests are bucketed into a power-of-two geometric progression starting
//! at 32 bytes. Each class keeps an intrusive doubly linked list of its slabs
//! with at least one free entry; fully used slabs are detached and rejoin at
//! the tail on their first free.

use core::ptr::null_mut;

use crate::bits;
use crate::slab::SlabHeader;

/// log2 of the smallest entry size.
pub(crate) const MIN_ENTRY_SHIFT: usize = 5;

/// Smallest entry size served by any class.
pub const MIN_ENTRY_SIZE: usize = 1 << MIN_ENTRY_SHIFT;

/// Hard ceiling on request size and on the per-slab region size (256 KiB).
pub const MAX_SLAB_BYTES: usize = 0x40000;

/// Slots in the class table: classes for 32 B up to 128 KiB entries.
pub(crate) const MAX_CLASS_COUNT: usize = 13;

/// Entry size served by class `class_index`.
#[inline]
pub(crate) const fn entry_size_for_class(class_index: usize) -> usize {
    1 << (class_index + MIN_ENTRY_SHIFT)
}

/// Resolves a request size to `(class_index, entry_size)`.
///
/// The size is rounded up to the next power of two and clamped to
/// [`MIN_ENTRY_SIZE`]. Zero, anything above [`MAX_SLAB_BYTES`], and sizes
/// whose class falls outside the configured count are rejected.
pub(crate) fn class_for_request(size: usize, class_count: usize) -> Option<(usize, usize)> {
    if size == 0 || size > MAX_SLAB_BYTES {
        return None;
    }
    let rounded = bits::next_power_of_two(size as u64).max(MIN_ENTRY_SIZE as u64);
    let class_index = bits::first_set(rounded) as usize - MIN_ENTRY_SHIFT;
    if class_index >= class_count {
        return None;
    }
    Some((class_index, entry_size_for_class(class_index)))
}

/// Per-class list of slabs with at least one free entry.
pub(crate) struct SizeClass {
    head: *mut SlabHeader,
    tail: *mut SlabHeader,
}

impl SizeClass {
    pub(crate) const fn new() -> Self {
        Self {
            head: null_mut(),
            tail: null_mut(),
        }
    }

    /// First slab in the list, null when the class has no free entry.
    #[inline]
    pub(crate) fn head(&self) -> *mut SlabHeader {
        self.head
    }

    /// Links `slab` at the tail. Used both for fresh slabs (empty list) and
    /// for previously full slabs rejoining on their first free.
    ///
    /// # Safety
    ///
    /// `slab` must point to a live slab of this class that is not currently
    /// linked into any list.
    pub(crate) unsafe fn attach_tail(&mut self, slab: *mut SlabHeader) {
        unsafe {
            (*slab).prev = self.tail;
            (*slab).next = null_mut();
            if !self.tail.is_null() {
                (*self.tail).next = slab;
            }
            if self.head.is_null() {
                self.head = slab;
            }
            self.tail = slab;
        }
    }

    /// Unlinks `slab`, reseating `head`/`tail` as needed.
    ///
    /// # Safety
    ///
    /// `slab` must point to a live slab currently linked into this list.
    pub(crate) unsafe fn detach(&mut self, slab: *mut SlabHeader) {
        unsafe {
            if !(*slab).next.is_null() {
                (*(*slab).next).prev = (*slab).prev;
            }
            if !(*slab).prev.is_null() {
                (*(*slab).prev).next = (*slab).next;
            }
            if self.tail == slab {
                self.tail = (*slab).prev;
            }
            if self.head == slab {
                self.head = (*slab).next;
            }
            (*slab).next = null_mut();
            (*slab).prev = null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::boxed::Box;
    use std::vec::Vec;

    use super::*;
    use crate::slab::{FREE_LIST_END, SLAB_MAGIC};

    #[test]
    fn test_class_dispatch() {
        let count = 7; // 32 .. 2048
        assert_eq!(class_for_request(1, count), Some((0, 32)));
        assert_eq!(class_for_request(32, count), Some((0, 32)));
        assert_eq!(class_for_request(33, count), Some((1, 64)));
        assert_eq!(class_for_request(64, count), Some((1, 64)));
        assert_eq!(class_for_request(65, count), Some((2, 128)));
        assert_eq!(class_for_request(2048, count), Some((6, 2048)));
    }

    #[test]
    fn test_class_rejections() {
        let count = 7;
        assert_eq!(class_for_request(0, count), None);
        // 2049 rounds to 4096, class 7, out of range.
        assert_eq!(class_for_request(2049, count), None);
        assert_eq!(class_for_request(MAX_SLAB_BYTES + 1, count), None);
        // Largest request a full table can serve is one class below the cap.
        assert_eq!(
            class_for_request(0x20000, MAX_CLASS_COUNT),
            Some((12, 0x20000))
        );
        assert_eq!(class_for_request(0x40000, MAX_CLASS_COUNT), None);
    }

    fn header() -> Box<SlabHeader> {
        Box::new(SlabHeader {
            owner: core::ptr::null(),
            free_head: FREE_LIST_END,
            magic: SLAB_MAGIC,
            next: null_mut(),
            prev: null_mut(),
        })
    }

    fn collect(class: &SizeClass) -> Vec<*mut SlabHeader> {
        let mut out = Vec::new();
        let mut cur = class.head();
        while !cur.is_null() {
            out.push(cur);
            cur = unsafe { (*cur).next };
        }
        out
    }

    #[test]
    fn test_attach_and_detach() {
        let mut class = SizeClass::new();
        let mut a = header();
        let mut b = header();
        let mut c = header();
        let (pa, pb, pc) = (&mut *a as *mut _, &mut *b as *mut _, &mut *c as *mut _);

        unsafe {
            class.attach_tail(pa);
            class.attach_tail(pb);
            class.attach_tail(pc);
        }
        assert_eq!(collect(&class), [pa, pb, pc]);
        assert_eq!(class.tail, pc);

        // Detach the middle, then the head, then the last one.
        unsafe { class.detach(pb) };
        assert_eq!(collect(&class), [pa, pc]);
        unsafe { class.detach(pa) };
        assert_eq!(collect(&class), [pc]);
        assert_eq!(class.tail, pc);
        unsafe { class.detach(pc) };
        assert!(class.head().is_null());
        assert!(class.tail.is_null());

        // A detached-then-reattached slab lands at the tail with a null next.
        unsafe {
            class.attach_tail(pa);
            class.attach_tail(pb);
        }
        assert_eq!(unsafe { (*pb).prev }, pa);
        assert!(unsafe { (*pb).next }.is_null());
    }
}
