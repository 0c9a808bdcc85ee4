//! # MMU and TLB
//!
//! The hardware-facing half of the simulation framework: memory-access
//! records, the [`Tlb`] translation cache, the [`Architecture`] seam a
//! concrete page-table walker implements, and the [`Mmu`] façade that the
//! external trace driver feeds.
//!
//! The façade's translation path:
//!
//! ```text
//! MemAccess ──► Tlb::lookup ──hit──► physical address
//!                   │miss
//!                   ▼
//!       Architecture::perform_translation ──hit──► Tlb::add ──► physical address
//!                   │miss
//!                   ▼
//!          page-fault handler ──► retry
//! ```
//!
//! Statistics accumulate in the TLB and are written to standard error when
//! the façade is dropped.

mod access;
mod mmu;
mod tlb;

pub use crate::access::{MemAccess, MemAccessKind};
pub use crate::mmu::{Architecture, Mmu, PageFaultHandler};
pub use crate::tlb::{Tlb, TlbStatistics};
