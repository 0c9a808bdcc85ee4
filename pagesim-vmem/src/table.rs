use pagesim_addresses::PhysicalAddress;

use crate::entry::PageTableEntry;
use crate::{INNER_ENTRIES, TOP_ENTRIES};

/// Converts simulated physical addresses to usable references.
///
/// The walker and the driver never own table memory; they view frames of the
/// backing region through this trait. The backing-memory crate provides the
/// identity implementation, tests provide their own.
///
/// # Safety
/// - `pa` must point at a live, writable allocation of at least
///   `size_of::<T>()` bytes inside the simulated physical memory.
/// - `T` must match the bytes at `pa` (no aliasing UB).
/// - The returned lifetime is purely borrow-checked; the mapping must remain
///   valid for as long as the reference is used.
pub trait PhysMapper {
    /// Convert a physical address to a mutable reference.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// The level-0 table: two entries, installed per process by the driver.
#[repr(transparent)]
pub struct TopTable([PageTableEntry; TOP_ENTRIES]);

/// A level-1/2/3 table: 2048 entries, exactly one 16 KiB page.
#[repr(transparent)]
pub struct InnerTable([PageTableEntry; INNER_ENTRIES]);

macro_rules! table_common {
    ($T:ty, $entries:expr) => {
        impl $T {
            pub const ENTRIES: usize = $entries;

            /// Reset every entry to the invalid state.
            #[inline]
            pub fn zero(&mut self) {
                self.0 = [PageTableEntry::new(); $entries];
            }

            #[inline]
            #[must_use]
            pub fn entry(&self, index: usize) -> PageTableEntry {
                self.0[index]
            }

            #[inline]
            #[must_use]
            pub fn entry_mut(&mut self, index: usize) -> &mut PageTableEntry {
                &mut self.0[index]
            }
        }
    };
}

table_common!(TopTable, TOP_ENTRIES);
table_common!(InnerTable, INNER_ENTRIES);

/// View the frame at `pa` as a [`TopTable`].
///
/// The frame must contain a level-0 node previously installed by the driver
/// (or be zeroed before first use); the [`PhysMapper`] contract covers the
/// actual dereference.
#[inline]
pub fn as_top<'t, M: PhysMapper>(m: &M, pa: PhysicalAddress) -> &'t mut TopTable {
    unsafe { m.phys_to_mut::<TopTable>(pa) }
}

/// View the frame at `pa` as an [`InnerTable`] (levels 1‒3).
#[inline]
pub fn as_inner<'t, M: PhysMapper>(m: &M, pa: PhysicalAddress) -> &'t mut InnerTable {
    unsafe { m.phys_to_mut::<InnerTable>(pa) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sizes() {
        assert_eq!(size_of::<TopTable>(), 16);
        assert_eq!(size_of::<InnerTable>(), 16384);
    }

    #[test]
    fn zero_clears_entries() {
        let mut table = InnerTable([PageTableEntry::from_bits(u64::MAX); INNER_ENTRIES]);
        table.zero();
        assert_eq!(table.entry(0).into_bits(), 0);
        assert_eq!(table.entry(INNER_ENTRIES - 1).into_bits(), 0);
    }

    #[test]
    fn entry_mut_writes_through() {
        let mut table = TopTable([PageTableEntry::new(); TOP_ENTRIES]);
        table.entry_mut(1).set_valid(true);
        assert!(table.entry(1).valid());
        assert!(!table.entry(0).valid());
    }
}
