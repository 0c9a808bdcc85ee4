//! # MMU Façade
//!
//! Binds one concrete [`Architecture`] and one [`Tlb`] into the unit the
//! trace driver talks to. A memory access is first tried against the TLB; on
//! a miss the architecture's table walk runs; if the walk also misses, the
//! external page-fault handler is invoked and the translation is retried
//! until it succeeds. Termination is the handler's contract: after it
//! returns, a retry of the faulting address must succeed, or the handler must
//! abort the simulation itself.

use pagesim_addresses::{PhysicalAddress, PhysicalPageNumber, VirtualAddress, VirtualPageNumber};

use crate::access::MemAccess;
use crate::tlb::{Tlb, TlbStatistics};

/// Invoked with the faulting byte address whenever a translation misses in
/// both the TLB and the page tables.
pub type PageFaultHandler = Box<dyn FnMut(VirtualAddress)>;

/// The translation surface one simulated architecture exposes.
///
/// Only AArch64 with a 16 KiB granule exists today; the seam is a closed
/// trait so the façade, the TLB, and the statistics stay independent of the
/// table layout.
pub trait Architecture {
    /// Number of intra-page offset bits.
    fn page_bits(&self) -> u32;

    /// Page size in bytes, `1 << page_bits()`.
    fn page_size(&self) -> u64;

    /// Width of a virtual address; higher bits are sign extension.
    fn address_space_bits(&self) -> u32;

    /// The bare table walk: translate `page` under the tree rooted at
    /// `root`, stamping the referenced bit and, for writes, the dirty bit.
    ///
    /// Returns `None` on a translation miss (a page fault); that is the only
    /// recoverable failure of a memory access.
    fn perform_translation(
        &mut self,
        root: PhysicalAddress,
        page: VirtualPageNumber,
        is_write: bool,
    ) -> Option<PhysicalPageNumber>;
}

/// The memory-management unit presented to the trace driver.
pub struct Mmu<A: Architecture> {
    arch: A,
    tlb: Tlb,
    /// Root of the current translation context; null means "no context".
    root: PhysicalAddress,
    asid: u64,
    fault_handler: Option<PageFaultHandler>,
}

impl<A: Architecture> Mmu<A> {
    /// Compose `arch` with a fresh TLB of `tlb_capacity` entries.
    #[must_use]
    pub fn new(arch: A, tlb_capacity: usize) -> Self {
        Self {
            arch,
            tlb: Tlb::new(tlb_capacity),
            root: PhysicalAddress::NULL,
            asid: 0,
            fault_handler: None,
        }
    }

    /// Install the external page-fault handler.
    pub fn initialize(&mut self, handler: PageFaultHandler) {
        self.fault_handler = Some(handler);
    }

    /// Point translation at a new page-table tree.
    /// [`PhysicalAddress::NULL`] detaches the context.
    pub fn set_page_table_pointer(&mut self, root: PhysicalAddress) {
        self.root = root;
    }

    /// Switch the address-space id used to tag and match TLB entries.
    ///
    /// Entries of other contexts stay cached; the tag check keeps them from
    /// satisfying lookups until their context returns.
    pub fn set_current_asid(&mut self, asid: u64) {
        self.asid = asid;
    }

    #[inline]
    #[must_use]
    pub fn architecture(&self) -> &A {
        &self.arch
    }

    /// Run one memory access to completion, faulting as often as needed.
    ///
    /// Returns the translated physical address.
    ///
    /// # Panics
    /// Panics if no page-table pointer is installed, or if a fault occurs
    /// with no handler installed.
    pub fn process_mem_access(&mut self, access: &MemAccess) -> PhysicalAddress {
        assert!(
            !self.root.is_null(),
            "MMU: page table pointer is null, cannot continue"
        );
        log::debug!("MMU: memory access: {access}");

        loop {
            if let Some(addr) = self.translation(access) {
                log::debug!("MMU: translated virtual {} to physical {addr}", access.address);
                return addr;
            }
            match self.fault_handler.as_mut() {
                Some(handler) => handler(access.address),
                None => panic!("MMU: translation fault without an installed page-fault handler"),
            }
        }
    }

    /// One translation attempt: TLB first, then the table walk.
    ///
    /// A walk hit refills the TLB. `None` signals a page fault upward.
    pub fn translation(&mut self, access: &MemAccess) -> Option<PhysicalAddress> {
        let vaddr = access.address.truncate_to(self.arch.address_space_bits());
        let page = vaddr.page_number(self.arch.page_bits());

        if let Some(frame) = self.tlb.lookup(self.asid, page) {
            return Some(self.physical_address(access.address, frame));
        }

        let frame = self
            .arch
            .perform_translation(self.root, page, access.kind.is_write())?;
        self.tlb.add(self.asid, page, frame);
        Some(self.physical_address(access.address, frame))
    }

    /// Drop all cached translations, as on a whole-context switch.
    pub fn flush_tlb(&mut self) {
        self.tlb.flush();
    }

    /// Drop cached translations of one address space only.
    pub fn flush_tlb_asid(&mut self, asid: u64) {
        self.tlb.flush_asid(asid);
    }

    #[must_use]
    pub fn tlb_statistics(&self) -> TlbStatistics {
        self.tlb.statistics()
    }

    /// Concatenate a translated frame with the access's intra-page offset.
    fn physical_address(&self, address: VirtualAddress, frame: PhysicalPageNumber) -> PhysicalAddress {
        frame
            .base_address(self.arch.page_bits())
            .byte_add(address.page_offset(self.arch.page_size()))
    }
}

impl<A: Architecture> Drop for Mmu<A> {
    fn drop(&mut self) {
        let stats = self.tlb.statistics();
        eprintln!();
        eprintln!("TLB Statistics (since last reset):");
        eprintln!("# lookups: {}", stats.lookups);
        eprintln!("# hits: {} ({:.2}%)", stats.hits, stats.hit_rate());
        eprintln!("# line evictions: {}", stats.evictions);
        eprintln!("# flushes: {}", stats.flushes);
        eprintln!("# line evictions due to flush: {}", stats.flush_evictions);
    }
}
