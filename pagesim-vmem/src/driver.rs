//! # Page-Table Driver
//!
//! The OS-side half of the architecture: owns one page-table tree per
//! process, materializes interior levels lazily while installing mappings,
//! and reclaims whole trees on process teardown. Node memory comes from the
//! host kernel through the [`KernelMemory`] seam; the driver only ever sees
//! physical addresses and views them through its [`PhysMapper`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use pagesim_addresses::{PhysicalAddress, VirtualAddress};

use crate::entry::PageTableEntry;
use crate::table::{PhysMapper, as_inner, as_top};
use crate::{
    ADDRESS_SPACE_BITS, INNER_TABLE_BYTES, PAGE_SIZE, TABLE_ALIGN, TOP_TABLE_BYTES, l0_index,
    l1_index, l2_index, l3_index,
};

/// Memory-allocation service of the hosting OS kernel.
///
/// Implementations must hand out regions of at least `size` bytes aligned to
/// `align`; the driver zeroes nodes itself before use.
pub trait KernelMemory {
    /// Allocate `size` bytes aligned to `align`; `None` on exhaustion.
    fn allocate_memory(&mut self, size: u64, align: u64) -> Option<PhysicalAddress>;

    /// Return a region obtained from [`allocate_memory`](Self::allocate_memory).
    fn release_memory(&mut self, addr: PhysicalAddress, size: u64);
}

/// Location of an installed L3 leaf entry: the owning table plus the entry
/// index. Stable for the lifetime of the owning tree; never a raw pointer.
#[derive(Copy, Clone, Debug)]
pub struct EntrySlot {
    table: PhysicalAddress,
    index: usize,
}

/// Handle to one mapped physical page.
///
/// Created by the page-fault path around a freshly allocated frame; after
/// [`Aarch64Driver::set_mapping`] the handle also records the slot of its L3
/// leaf, which [`Aarch64Driver::set_page_valid`] uses to find the entry
/// without a walk.
///
/// The slot borrows from the owning tree: once `release_page_table` tears
/// the tree down, the handle must not be passed to the driver again.
#[derive(Debug)]
pub struct PageFrame {
    address: PhysicalAddress,
    slot: Option<EntrySlot>,
}

impl PageFrame {
    /// Wrap the physical page at `address` (page-aligned).
    #[must_use]
    pub fn new(address: PhysicalAddress) -> Self {
        debug_assert!(address.is_aligned_to(PAGE_SIZE));
        Self {
            address,
            slot: None,
        }
    }

    /// Physical byte address of the mapped page.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        self.address
    }

    /// Whether this frame has been installed into a page table.
    #[inline]
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        self.slot.is_some()
    }
}

/// Per-process page-table management for the AArch64 16 KiB layout.
pub struct Aarch64Driver<M: PhysMapper> {
    mapper: M,
    /// Host kernel; bound once, shared with the rest of the OS side.
    kernel: Option<Rc<RefCell<dyn KernelMemory>>>,
    /// Process id → level-0 root.
    roots: HashMap<u64, PhysicalAddress>,
    /// Total bytes requested from the kernel for page-table nodes.
    bytes_allocated: u64,
}

impl<M: PhysMapper> Aarch64Driver<M> {
    #[must_use]
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            kernel: None,
            roots: HashMap::new(),
            bytes_allocated: 0,
        }
    }

    /// Bind the host kernel providing node memory. Shared, not owned.
    pub fn set_host_kernel(&mut self, kernel: Rc<RefCell<dyn KernelMemory>>) {
        self.kernel = Some(kernel);
    }

    /// Page size of the managed layout, in bytes.
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> u64 {
        PAGE_SIZE
    }

    /// Create the level-0 root for a new process.
    ///
    /// # Panics
    /// Panics if `pid` already has a page table, or if no kernel is bound.
    pub fn allocate_page_table(&mut self, pid: u64) {
        assert!(
            !self.roots.contains_key(&pid),
            "driver: pid {pid} already has a page table"
        );
        let root = self.allocate_node(TOP_TABLE_BYTES);
        as_top(&self.mapper, root).zero();
        self.roots.insert(pid, root);
    }

    /// Tear down the whole tree of `pid` and return its nodes to the kernel.
    ///
    /// Releasing a pid that has no page table is a no-op, so the call is
    /// idempotent.
    pub fn release_page_table(&mut self, pid: u64) {
        if let Some(root) = self.roots.remove(&pid) {
            self.release_level(root, 0);
        }
    }

    /// Root of the tree for `pid`, or [`PhysicalAddress::NULL`] if absent.
    #[must_use]
    pub fn page_table(&self, pid: u64) -> PhysicalAddress {
        self.roots.get(&pid).copied().unwrap_or(PhysicalAddress::NULL)
    }

    /// Install the mapping `vaddr → frame` into the tree of `pid`, creating
    /// missing interior tables on the way down.
    ///
    /// The L3 leaf is written with the referenced and dirty bits clear, and
    /// the leaf's slot is recorded in `frame` for later
    /// [`set_page_valid`](Self::set_page_valid) calls.
    ///
    /// # Panics
    /// Panics if `pid` has no page table, if the kernel cannot provide a
    /// node, or if a leaf turns up where an interior table is expected.
    pub fn set_mapping(&mut self, pid: u64, vaddr: VirtualAddress, frame: &mut PageFrame) {
        let va = vaddr.truncate_to(ADDRESS_SPACE_BITS);
        let root = match self.roots.get(&pid) {
            Some(root) => *root,
            None => panic!("driver: no page table for pid {pid}"),
        };

        let top = as_top(&self.mapper, root);
        let l1 = self.get_or_create_table(top.entry_mut(l0_index(va)));
        let l2 = self.get_or_create_table(as_inner(&self.mapper, l1).entry_mut(l1_index(va)));
        let l3 = self.get_or_create_table(as_inner(&self.mapper, l2).entry_mut(l2_index(va)));

        let index = l3_index(va);
        *as_inner(&self.mapper, l3).entry_mut(index) = PageTableEntry::new_leaf(frame.address());
        frame.slot = Some(EntrySlot { table: l3, index });

        log::trace!("driver: pid {pid} mapped {va} -> {}", frame.address());
    }

    /// Toggle the valid bit of the leaf behind `frame`.
    ///
    /// Clearing is always allowed. Setting requires the entry to still be
    /// valid: once a leaf has been invalidated (or never installed), only a
    /// fresh [`set_mapping`](Self::set_mapping) may bring it back.
    ///
    /// # Panics
    /// Panics if `frame` was never mapped, or on an invalid-to-valid flip.
    pub fn set_page_valid(&mut self, frame: &PageFrame, valid: bool) {
        let slot = match frame.slot {
            Some(slot) => slot,
            None => panic!("driver: page frame was never installed into a page table"),
        };
        let leaf = as_inner(&self.mapper, slot.table).entry_mut(slot.index);
        assert!(
            leaf.valid() || !valid,
            "driver: cannot re-validate an entry the driver has not re-installed"
        );
        leaf.set_valid(valid);
    }

    /// Running total of bytes requested from the kernel for table nodes.
    #[inline]
    #[must_use]
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated
    }

    /// Resolve an interior slot to its child table, materializing the child
    /// if the slot is still invalid.
    fn get_or_create_table(&mut self, slot: &mut PageTableEntry) -> PhysicalAddress {
        if !slot.valid() {
            let child = self.allocate_node(INNER_TABLE_BYTES);
            as_inner(&self.mapper, child).zero();
            *slot = PageTableEntry::new_table(child);
            child
        } else if slot.table() {
            slot.address()
        } else {
            panic!("driver: found a leaf entry where an interior table was expected");
        }
    }

    fn allocate_node(&mut self, bytes: u64) -> PhysicalAddress {
        let addr = match self.kernel().borrow_mut().allocate_memory(bytes, TABLE_ALIGN) {
            Some(addr) => addr,
            None => panic!("driver: host kernel failed to allocate {bytes} bytes for a table node"),
        };
        self.bytes_allocated += bytes;
        addr
    }

    /// Depth-first teardown; interior levels release their children first.
    fn release_level(&self, table: PhysicalAddress, level: u32) {
        let (entries, bytes) = if level == 0 {
            (crate::TOP_ENTRIES, TOP_TABLE_BYTES)
        } else {
            (crate::INNER_ENTRIES, INNER_TABLE_BYTES)
        };

        if level < 3 {
            for index in 0..entries {
                let entry = if level == 0 {
                    as_top(&self.mapper, table).entry(index)
                } else {
                    as_inner(&self.mapper, table).entry(index)
                };
                if entry.valid() && entry.table() {
                    self.release_level(entry.address(), level + 1);
                }
            }
        }

        self.kernel().borrow_mut().release_memory(table, bytes);
    }

    fn kernel(&self) -> &Rc<RefCell<dyn KernelMemory>> {
        match &self.kernel {
            Some(kernel) => kernel,
            None => panic!("driver: no host kernel bound"),
        }
    }
}

impl<M: PhysMapper> Drop for Aarch64Driver<M> {
    fn drop(&mut self) {
        if !self.roots.is_empty() {
            log::warn!(
                "driver: kernel did not release all page tables ({} remaining)",
                self.roots.len()
            );
        }
    }
}
