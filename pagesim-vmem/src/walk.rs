use pagesim_addresses::{PhysicalAddress, PhysicalPageNumber, VirtualPageNumber};
use pagesim_mmu::Architecture;

use crate::table::{PhysMapper, as_inner, as_top};
use crate::{
    ADDRESS_SPACE_BITS, PAGE_BITS, PAGE_SIZE, TABLE_ALIGN, l0_index, l1_index, l2_index, l3_index,
};

/// The AArch64 walker: translates page numbers through a four-level tree.
///
/// The walker owns no tables; it resolves the tree rooted at whatever root
/// the façade passes in, viewing frames through its [`PhysMapper`]. On a
/// successful translation it stamps the referenced bit on the L3 leaf and,
/// for writes, the dirty bit. Any invalid or malformed slot along the path is
/// a miss reported to the caller as `None`.
pub struct Aarch64Mmu<M: PhysMapper> {
    mapper: M,
}

impl<M: PhysMapper> Aarch64Mmu<M> {
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self { mapper }
    }
}

impl<M: PhysMapper> Architecture for Aarch64Mmu<M> {
    #[inline]
    fn page_bits(&self) -> u32 {
        PAGE_BITS
    }

    #[inline]
    fn page_size(&self) -> u64 {
        PAGE_SIZE
    }

    #[inline]
    fn address_space_bits(&self) -> u32 {
        ADDRESS_SPACE_BITS
    }

    /// Walk L0 → L1 → L2 → L3 under `root`.
    ///
    /// # Panics
    /// Panics if `root` is null or not table-aligned; a damaged translation
    /// context is an invariant violation, not a page fault.
    fn perform_translation(
        &mut self,
        root: PhysicalAddress,
        page: VirtualPageNumber,
        is_write: bool,
    ) -> Option<PhysicalPageNumber> {
        assert!(!root.is_null(), "walker: null page-table root");
        assert!(
            root.is_aligned_to(TABLE_ALIGN),
            "walker: unaligned page-table root {root:?}"
        );

        let va = page.base_address(PAGE_BITS);

        let e0 = as_top(&self.mapper, root).entry(l0_index(va));
        if !e0.valid() || !e0.table() {
            return None;
        }

        let e1 = as_inner(&self.mapper, e0.address()).entry(l1_index(va));
        if !e1.valid() || !e1.table() {
            return None;
        }

        let e2 = as_inner(&self.mapper, e1.address()).entry(l2_index(va));
        if !e2.valid() || !e2.table() {
            return None;
        }

        let l3 = as_inner(&self.mapper, e2.address());
        let leaf = l3.entry_mut(l3_index(va));
        if !leaf.valid() {
            return None;
        }

        leaf.set_referenced(true);
        if is_write {
            leaf.set_dirty(true);
        }
        Some(leaf.physical_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TOP_ENTRIES;
    use crate::entry::PageTableEntry;
    use crate::testing::{Frame, IdentityMapper};

    /// A hand-built four-level tree over boxed frames, one node per level.
    struct TreeFixture {
        l0: Box<Frame>,
        l1: Box<Frame>,
        l2: Box<Frame>,
        l3: Box<Frame>,
        mmu: Aarch64Mmu<IdentityMapper>,
    }

    impl TreeFixture {
        fn new() -> Self {
            Self {
                l0: Frame::new_zeroed(),
                l1: Frame::new_zeroed(),
                l2: Frame::new_zeroed(),
                l3: Frame::new_zeroed(),
                mmu: Aarch64Mmu::new(IdentityMapper),
            }
        }

        fn root(&self) -> PhysicalAddress {
            self.l0.address()
        }

        /// Link the four nodes along the path of `vpage` and install a leaf
        /// for `ppage`, without going through the driver.
        fn map(&mut self, vpage: u64, ppage: u64) {
            let va = VirtualPageNumber::new(vpage).base_address(PAGE_BITS);
            let m = IdentityMapper;

            *as_top(&m, self.l0.address()).entry_mut(l0_index(va)) =
                PageTableEntry::new_table(self.l1.address());
            *as_inner(&m, self.l1.address()).entry_mut(l1_index(va)) =
                PageTableEntry::new_table(self.l2.address());
            *as_inner(&m, self.l2.address()).entry_mut(l2_index(va)) =
                PageTableEntry::new_table(self.l3.address());
            *as_inner(&m, self.l3.address()).entry_mut(l3_index(va)) =
                PageTableEntry::new_leaf(PhysicalAddress::new(ppage << PAGE_BITS));
        }

        fn leaf(&self, vpage: u64) -> PageTableEntry {
            let va = VirtualPageNumber::new(vpage).base_address(PAGE_BITS);
            as_inner(&IdentityMapper, self.l3.address()).entry(l3_index(va))
        }

        fn translate(&mut self, vpage: u64, is_write: bool) -> Option<PhysicalPageNumber> {
            let root = self.root();
            self.mmu
                .perform_translation(root, VirtualPageNumber::new(vpage), is_write)
        }
    }

    #[test]
    fn empty_page_table_misses() {
        let mut t = TreeFixture::new();
        assert_eq!(t.translate(0, false), None);
        assert_eq!(t.translate(1, false), None);
        assert_eq!(t.translate(0xFFFF, false), None);

        // A miss must not mutate anything.
        for i in 0..TOP_ENTRIES {
            assert_eq!(
                as_top(&IdentityMapper, t.root()).entry(i).into_bits(),
                0
            );
        }
    }

    #[test]
    fn valid_translation() {
        let mut t = TreeFixture::new();
        t.map(0x12345, 0xABCDE);
        assert_eq!(
            t.translate(0x12345, false),
            Some(PhysicalPageNumber::new(0xABCDE))
        );
    }

    #[test]
    fn referenced_bit_is_stamped() {
        let mut t = TreeFixture::new();
        t.map(0x1000, 0x2000);

        assert!(!t.leaf(0x1000).referenced());
        assert!(t.translate(0x1000, false).is_some());
        assert!(t.leaf(0x1000).referenced());
    }

    #[test]
    fn dirty_bit_is_stamped_on_writes_only() {
        let mut t = TreeFixture::new();
        t.map(0x1000, 0x2000);

        assert!(!t.leaf(0x1000).dirty());
        assert!(t.translate(0x1000, false).is_some());
        assert!(!t.leaf(0x1000).dirty());

        assert!(t.translate(0x1000, true).is_some());
        assert!(t.leaf(0x1000).dirty());
    }

    #[test]
    fn invalid_leaf_is_a_miss() {
        let mut t = TreeFixture::new();
        t.map(0x1000, 0x2000);

        // A neighbouring page shares the interior path but has no leaf.
        assert_eq!(t.translate(0x1001, false), None);
    }

    #[test]
    fn interior_leaf_is_a_miss() {
        let mut t = TreeFixture::new();
        t.map(0x1000, 0x2000);

        // Corrupt the L1 slot into a leaf; the walk must refuse to descend.
        let va = VirtualPageNumber::new(0x1000).base_address(PAGE_BITS);
        as_inner(&IdentityMapper, t.l1.address())
            .entry_mut(l1_index(va))
            .set_table(false);
        assert_eq!(t.translate(0x1000, false), None);
    }

    #[test]
    fn architecture_parameters() {
        let mmu = Aarch64Mmu::new(IdentityMapper);
        assert_eq!(mmu.page_bits(), 14);
        assert_eq!(mmu.page_size(), 16384);
        assert_eq!(mmu.address_space_bits(), 48);
    }

    #[test]
    #[should_panic(expected = "unaligned page-table root")]
    fn misaligned_root_is_fatal() {
        let mut t = TreeFixture::new();
        let root = t.root().byte_add(8);
        let _ = t
            .mmu
            .perform_translation(root, VirtualPageNumber::new(0), false);
    }

    #[test]
    fn high_l0_half_translates() {
        let mut t = TreeFixture::new();
        // Highest virtual page of the 48-bit space: L0 index 1.
        let vpage = (1u64 << (ADDRESS_SPACE_BITS - PAGE_BITS)) - 1;
        t.map(vpage, 0x1F);
        assert_eq!(t.translate(vpage, false), Some(PhysicalPageNumber::new(0x1F)));
    }
}
