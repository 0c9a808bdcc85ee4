use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;

use pagesim_addresses::{MemoryAddress, PhysicalAddress};
use pagesim_vmem::PhysMapper;

/// Obtains the contiguous byte region standing in for physical memory.
///
/// Acquisition is outside the simulation core: on a host, memory comes from
/// the process allocator; an embedding might hand in a fixed arena instead.
/// The `hint` is a preferred base address; providers may ignore it.
pub trait RegionProvider {
    /// Acquire a zeroed region of `size` bytes aligned to `align`.
    /// `None` on failure.
    fn acquire_region(&mut self, size: usize, align: usize, hint: MemoryAddress)
    -> Option<NonNull<u8>>;

    /// Return a region obtained from [`acquire_region`](Self::acquire_region).
    ///
    /// # Safety
    /// `base` and `size` must describe exactly one prior acquisition, and no
    /// reference into the region may outlive this call.
    unsafe fn release_region(&mut self, base: NonNull<u8>, size: usize);
}

/// [`RegionProvider`] over the host heap.
///
/// Ignores the hint; the region lands wherever the process allocator puts
/// it. One live region per provider instance.
#[derive(Default)]
pub struct HeapRegion {
    layout: Option<Layout>,
}

impl RegionProvider for HeapRegion {
    fn acquire_region(
        &mut self,
        size: usize,
        align: usize,
        _hint: MemoryAddress,
    ) -> Option<NonNull<u8>> {
        debug_assert!(self.layout.is_none(), "HeapRegion already holds a region");
        let layout = Layout::from_size_align(size, align).ok()?;
        self.layout = Some(layout);
        NonNull::new(unsafe { alloc_zeroed(layout) })
    }

    unsafe fn release_region(&mut self, base: NonNull<u8>, size: usize) {
        if let Some(layout) = self.layout.take() {
            debug_assert_eq!(layout.size(), size);
            unsafe { dealloc(base.as_ptr(), layout) };
        }
    }
}

/// Identity mapper over the acquired region.
///
/// Simulated physical addresses are host addresses into the region, so the
/// conversion is a cast; debug builds bounds-check it.
#[derive(Copy, Clone)]
pub struct RegionMapper {
    base: u64,
    len: u64,
}

impl RegionMapper {
    pub(crate) const fn new(base: u64, len: u64) -> Self {
        Self { base, len }
    }
}

impl PhysMapper for RegionMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        debug_assert!(
            pa.as_u64() >= self.base
                && pa.as_u64() + size_of::<T>() as u64 <= self.base + self.len,
            "physical address {pa} outside the backing region"
        );
        unsafe { &mut *(pa.as_u64() as *mut T) }
    }
}
