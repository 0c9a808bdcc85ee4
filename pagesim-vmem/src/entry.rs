use bitfield_struct::bitfield;
use pagesim_addresses::{PhysicalAddress, PhysicalPageNumber};

use crate::{PAGE_BITS, TABLE_ALIGN};

/// A single 64-bit page-table entry, uniform across all four levels.
///
/// The layout is software-defined: the simulation never hands these words to
/// hardware, so the format keeps only the fields the walker and the driver
/// act on and leaves the rest reserved.
///
/// ### Bit layout
///
/// | Bits    | Name         | Meaning |
/// |---------|--------------|---------|
/// | 0       | `valid`      | Entry is populated. |
/// | 1       | `table`      | Set: points to the next-level table. Clear: terminal mapping (L3 only). |
/// | 2‒11    | reserved     | - |
/// | 12‒45   | `page_number`| Physical page number of the child table or the mapped page (34 bits). |
/// | 46      | `referenced` | Stamped by the walker on any successful translation through this leaf. |
/// | 47      | `dirty`      | Stamped by the walker on any successful write translation. |
/// | 48‒63   | ignored      | - |
///
/// Interior entries never carry `referenced`/`dirty`; the walker only stamps
/// the L3 leaf it resolves through.
#[bitfield(u64)]
pub struct PageTableEntry {
    /// Entry is populated.
    pub valid: bool,

    /// Set for an interior pointer to the next level; clear for an L3 leaf.
    pub table: bool,

    #[bits(10)]
    _reserved: u16,

    /// Physical page number (bits 47:14 of the target address).
    #[bits(34)]
    page_number: u64,

    /// Access flag; set on any successful translation.
    pub referenced: bool,

    /// Modified flag; set on any successful write translation.
    pub dirty: bool,

    #[bits(16)]
    _ignored: u32,
}

impl PageTableEntry {
    /// A valid interior entry pointing at the child table at `child`.
    ///
    /// `child` must be table-aligned; debug builds assert it.
    #[inline]
    #[must_use]
    pub fn new_table(child: PhysicalAddress) -> Self {
        debug_assert!(child.is_aligned_to(TABLE_ALIGN), "unaligned table node");
        Self::new()
            .with_valid(true)
            .with_table(true)
            .with_page_number(child.as_u64() >> PAGE_BITS)
    }

    /// A valid leaf entry mapping the physical page at `frame`, with the
    /// referenced and dirty bits clear.
    #[inline]
    #[must_use]
    pub fn new_leaf(frame: PhysicalAddress) -> Self {
        debug_assert!(frame.is_aligned_to(1u64 << PAGE_BITS), "unaligned page frame");
        Self::new()
            .with_valid(true)
            .with_table(false)
            .with_page_number(frame.as_u64() >> PAGE_BITS)
    }

    /// The byte address this entry points at (child table base or page base).
    #[inline]
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.page_number() << PAGE_BITS)
    }

    /// The physical page number this entry points at.
    #[inline]
    #[must_use]
    pub const fn physical_page(&self) -> PhysicalPageNumber {
        PhysicalPageNumber::new(self.page_number())
    }
}
