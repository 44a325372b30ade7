//! Slab header and entry layout
//!
//! Every mapped region starts with an in-band [`SlabHeader`] followed by the
//! entry array. Free entries are threaded into a singly linked list through
//! their first four bytes; [`FREE_LIST_END`] terminates the chain.

use core::mem;
use core::ptr::{self, null_mut};

use static_assertions::const_assert;

use crate::class::MIN_ENTRY_SIZE;

/// High 24 bits of every valid slab's magic word.
pub(crate) const SLAB_MAGIC: u32 = 0x51AB_C000;

/// Free-list terminator and the `free_head` value of a fully used slab.
pub(crate) const FREE_LIST_END: u32 = u32::MAX;

/// In-band metadata at the front of each slab.
///
/// `owner` records the address of the allocator state that mapped the slab;
/// the pointer resolver compares it against the calling allocator to reject
/// foreign pointers.
#[repr(C)]
pub(crate) struct SlabHeader {
    pub(crate) owner: *const u8,
    pub(crate) free_head: u32,
    pub(crate) magic: u32,
    pub(crate) next: *mut SlabHeader,
    pub(crate) prev: *mut SlabHeader,
}

/// Bytes occupied by the header before the entry array.
pub(crate) const HEADER_BYTES: usize = mem::size_of::<SlabHeader>();

// The header must fit in front of the smallest entry class.
const_assert!(HEADER_BYTES <= MIN_ENTRY_SIZE);
// Entry link words are read and written as aligned u32.
const_assert!(mem::align_of::<SlabHeader>() % mem::align_of::<u32>() == 0);

impl SlabHeader {
    /// Class index carried in the low byte of the magic word.
    #[inline]
    pub(crate) fn class_index(&self) -> usize {
        (self.magic & 0xff) as usize
    }

    /// Checks the fixed high bits of the magic word.
    #[inline]
    pub(crate) fn magic_matches(&self) -> bool {
        self.magic & 0xffff_ff00 == SLAB_MAGIC
    }

    /// Number of entries a slab of `slab_bytes` holds at `entry_size`.
    #[inline]
    pub(crate) const fn entry_count(slab_bytes: usize, entry_size: usize) -> usize {
        (slab_bytes - HEADER_BYTES) / entry_size
    }

    /// First byte of the entry array.
    ///
    /// # Safety
    ///
    /// `slab` must point to a live slab region.
    #[inline]
    pub(crate) unsafe fn data_base(slab: *mut SlabHeader) -> *mut u8 {
        unsafe { (slab as *mut u8).add(HEADER_BYTES) }
    }

    /// Address of entry `index`.
    ///
    /// # Safety
    ///
    /// `slab` must point to a live slab region and `index` must be within its
    /// entry count.
    #[inline]
    pub(crate) unsafe fn entry_ptr(slab: *mut SlabHeader, index: usize, entry_size: usize) -> *mut u8 {
        unsafe { Self::data_base(slab).add(index * entry_size) }
    }

    /// Builds a slab in `region`: zeroes it, writes the header, and threads
    /// every entry into the free list. Entry `i` links to `i + 1`; the last
    /// entry is terminated explicitly with [`FREE_LIST_END`].
    ///
    /// The slab is returned unlinked (`next`/`prev` null); the caller attaches
    /// it to its class list.
    ///
    /// # Safety
    ///
    /// `region` must point to `slab_bytes` of writable memory aligned for
    /// `SlabHeader`, and `entry_size` must leave room for at least one entry.
    pub(crate) unsafe fn initialize(
        region: *mut u8,
        owner: *const u8,
        class_index: usize,
        entry_size: usize,
        slab_bytes: usize,
    ) -> *mut SlabHeader {
        let slab = region as *mut SlabHeader;
        unsafe {
            ptr::write_bytes(region, 0, slab_bytes);
            ptr::write(
                slab,
                SlabHeader {
                    owner,
                    free_head: 0,
                    magic: SLAB_MAGIC | class_index as u32,
                    next: null_mut(),
                    prev: null_mut(),
                },
            );

            let count = Self::entry_count(slab_bytes, entry_size);
            for i in 0..count {
                let link = Self::entry_ptr(slab, i, entry_size) as *mut u32;
                link.write(i as u32 + 1);
            }
            let last = Self::entry_ptr(slab, count - 1, entry_size) as *mut u32;
            last.write(FREE_LIST_END);
        }
        slab
    }
}
