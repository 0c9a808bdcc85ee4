//! # AArch64 Paging (16 KiB granule)
//!
//! Page-table structures and the software walker for the simulated
//! architecture: 48-bit virtual addresses, 48-bit physical addresses,
//! 16 KiB pages, four table levels.
//!
//! ## Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! |  47   | 46‒36 | 35‒25 | 24‒14 | 13‒0   |
//! |  L0   |  L1   |  L2   |  L3   | Offset |
//! ```
//!
//! The fields index four levels of tables. The 16 KiB granule leaves a
//! single bit for the first level, so the L0 table holds only two entries;
//! L1 through L3 hold 2048 (2¹¹) entries of 8 bytes each.
//!
//! ```text
//!  L0  →  L1  →  L2  →  L3  →  Physical Page
//!  2      2048    2048    2048   entries per table
//! ```
//!
//! ### Levels and their roles
//!
//! | Level | Entries | Entry kind | Description |
//! |:------|:--------|:-----------|:------------|
//! | 0 | 2    | table | Root; installed per process by the driver. |
//! | 1 | 2048 | table | Points to an L2 table. |
//! | 2 | 2048 | table | Points to an L3 table. |
//! | 3 | 2048 | leaf  | Maps one 16 KiB physical page; carries the referenced and dirty bits. |
//!
//! Every entry is a software-defined 64-bit word ([`PageTableEntry`]);
//! interior entries are always tables, leaves appear only at L3.
//!
//! ## Seams
//!
//! - [`PhysMapper`] turns a simulated physical address into a usable
//!   reference; the backing-memory crate provides the identity
//!   implementation over its owned region.
//! - [`KernelMemory`] is the host-kernel allocation service the
//!   [`Aarch64Driver`] draws page-table nodes from.
//! - [`Aarch64Mmu`] implements the façade's `Architecture` trait with the
//!   bare four-level walk.

mod driver;
mod entry;
mod table;
mod walk;

pub use crate::driver::{Aarch64Driver, EntrySlot, KernelMemory, PageFrame};
pub use crate::entry::PageTableEntry;
pub use crate::table::{InnerTable, PhysMapper, TopTable, as_inner, as_top};
pub use crate::walk::Aarch64Mmu;

use pagesim_addresses::VirtualAddress;

/// Width of a virtual (and physical) address; higher bits are sign extension.
pub const ADDRESS_SPACE_BITS: u32 = 48;

/// Number of intra-page offset bits; 16 KiB pages.
pub const PAGE_BITS: u32 = 14;

/// Page size in bytes.
pub const PAGE_SIZE: u64 = 1 << PAGE_BITS;

/// Required alignment of every page-table node.
pub const TABLE_ALIGN: u64 = PAGE_SIZE;

/// Index bits consumed at level 0.
pub const TOP_BITS: u32 = 1;

/// Index bits consumed at each of levels 1‒3.
pub const INNER_BITS: u32 = 11;

/// Entries in the level-0 table.
pub const TOP_ENTRIES: usize = 1 << TOP_BITS;

/// Entries in each of the level-1 through level-3 tables.
pub const INNER_ENTRIES: usize = 1 << INNER_BITS;

/// Bytes of a level-0 node as requested from the host kernel.
pub const TOP_TABLE_BYTES: u64 = (TOP_ENTRIES * size_of::<PageTableEntry>()) as u64;

/// Bytes of a level-1/2/3 node; exactly one page.
pub const INNER_TABLE_BYTES: u64 = (INNER_ENTRIES * size_of::<PageTableEntry>()) as u64;

/// Extract the level-0 index (bit 47 of the virtual address).
#[inline]
#[must_use]
pub const fn l0_index(va: VirtualAddress) -> usize {
    ((va.as_u64() >> (3 * INNER_BITS + PAGE_BITS)) & ((1 << TOP_BITS) - 1)) as usize
}

/// Extract the level-1 index (bits 46‒36 of the virtual address).
#[inline]
#[must_use]
pub const fn l1_index(va: VirtualAddress) -> usize {
    ((va.as_u64() >> (2 * INNER_BITS + PAGE_BITS)) & ((1 << INNER_BITS) - 1)) as usize
}

/// Extract the level-2 index (bits 35‒25 of the virtual address).
#[inline]
#[must_use]
pub const fn l2_index(va: VirtualAddress) -> usize {
    ((va.as_u64() >> (INNER_BITS + PAGE_BITS)) & ((1 << INNER_BITS) - 1)) as usize
}

/// Extract the level-3 index (bits 24‒14 of the virtual address).
#[inline]
#[must_use]
pub const fn l3_index(va: VirtualAddress) -> usize {
    ((va.as_u64() >> PAGE_BITS) & ((1 << INNER_BITS) - 1)) as usize
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_consistent() {
        assert_eq!(PAGE_SIZE, 16384);
        assert_eq!(TOP_ENTRIES, 2);
        assert_eq!(INNER_ENTRIES, 2048);
        assert_eq!(INNER_TABLE_BYTES, PAGE_SIZE);
        assert_eq!(TOP_BITS + 3 * INNER_BITS + PAGE_BITS, ADDRESS_SPACE_BITS);
    }

    #[test]
    fn index_extraction() {
        // All-ones in every index field.
        let va = VirtualAddress::new(((1u64 << ADDRESS_SPACE_BITS) - 1) & !(PAGE_SIZE - 1));
        assert_eq!(l0_index(va), 1);
        assert_eq!(l1_index(va), 2047);
        assert_eq!(l2_index(va), 2047);
        assert_eq!(l3_index(va), 2047);

        // A single page number touches only the L3 index until it overflows
        // into the next field.
        let va = VirtualAddress::new(0x12345 << PAGE_BITS);
        assert_eq!(l0_index(va), 0);
        assert_eq!(l1_index(va), 0);
        assert_eq!(l2_index(va), 0x12345 >> 11);
        assert_eq!(l3_index(va), 0x12345 & 0x7ff);
    }
}
