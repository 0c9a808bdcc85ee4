//! Fixtures shared by the walker and driver tests: a boxed 16 KiB frame
//! standing in for a physical page, and the identity mapper that treats
//! simulated physical addresses as host addresses.

use pagesim_addresses::PhysicalAddress;

use crate::PAGE_SIZE;
use crate::table::PhysMapper;

/// One page-sized, page-aligned frame of simulated physical memory.
#[repr(align(16384))]
pub(crate) struct Frame(#[allow(dead_code)] [u8; PAGE_SIZE as usize]);

impl Frame {
    pub(crate) fn new_zeroed() -> Box<Self> {
        Box::new(Self([0; PAGE_SIZE as usize]))
    }

    pub(crate) fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new(core::ptr::from_ref(self) as u64)
    }
}

/// Fixture physical addresses are host addresses, so mapping is the identity.
#[derive(Copy, Clone)]
pub(crate) struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        debug_assert!(!pa.is_null());
        unsafe { &mut *(pa.as_u64() as *mut T) }
    }
}
