//! # pagesim
//!
//! An in-process model of a paged memory-management subsystem for coursework
//! and experimentation: synthetic memory accesses are translated through a
//! software page-table walker with a TLB in front and a "physical" memory
//! allocator behind, and the framework reports behavioural statistics.
//!
//! ## Components
//!
//! | Crate | Role |
//! |---|---|
//! | [`pagesim_addresses`] | Typed addresses and page numbers |
//! | [`pagesim_mmu`] | [`Tlb`], [`MemAccess`], the [`Architecture`] seam, and the [`Mmu`] façade |
//! | [`pagesim_vmem`] | AArch64 16 KiB-granule tables, the [`Aarch64Mmu`] walker, and the [`Aarch64Driver`] |
//! | [`pagesim_physmem`] | [`PhysicalMemory`], its region providers, and the identity [`RegionMapper`] |
//!
//! ## Data flow
//!
//! The external trace driver hands a [`MemAccess`] to the [`Mmu`]. The façade
//! consults the [`Tlb`]; on a miss the [`Aarch64Mmu`] walks the tree the
//! current page-table pointer names; if the walk misses too, the external
//! page-fault handler runs (typically allocating a frame from
//! [`PhysicalMemory`] and installing it with [`Aarch64Driver::set_mapping`])
//! and the translation is retried.
//!
//! The collaborators the core leaves external, namely the trace source, the
//! fault policy, and the hosting OS kernel, are modelled in this crate's
//! integration tests.

pub use pagesim_addresses::{
    MemoryAddress, PhysicalAddress, PhysicalPageNumber, VirtualAddress, VirtualPageNumber,
};
pub use pagesim_mmu::{
    Architecture, MemAccess, MemAccessKind, Mmu, PageFaultHandler, Tlb, TlbStatistics,
};
pub use pagesim_physmem::{HeapRegion, PhysicalMemory, RegionMapper, RegionProvider};
pub use pagesim_vmem::{
    ADDRESS_SPACE_BITS, Aarch64Driver, Aarch64Mmu, EntrySlot, INNER_TABLE_BYTES, InnerTable,
    KernelMemory, PAGE_BITS, PAGE_SIZE, PageFrame, PageTableEntry, PhysMapper, TABLE_ALIGN,
    TOP_TABLE_BYTES, TopTable,
};
