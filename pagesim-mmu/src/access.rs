use core::fmt;

use pagesim_addresses::VirtualAddress;

/// Classification of a trace record.
///
/// `Modify` is a combined read-modify-write; like `Store` it marks the
/// touched page dirty.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MemAccessKind {
    Load,
    Store,
    Modify,
    Execute,
}

impl MemAccessKind {
    /// Whether a translation for this access must set the dirty bit.
    #[inline]
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Store | Self::Modify)
    }
}

/// One synthetic memory access, as handed in by the external trace driver.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MemAccess {
    pub address: VirtualAddress,
    pub kind: MemAccessKind,
}

impl MemAccess {
    #[inline]
    #[must_use]
    pub const fn new(address: VirtualAddress, kind: MemAccessKind) -> Self {
        Self { address, kind }
    }
}

impl fmt::Display for MemAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MemAccessKind::Load => "load",
            MemAccessKind::Store => "store",
            MemAccessKind::Modify => "modify",
            MemAccessKind::Execute => "execute",
        };
        write!(f, "{kind} @ {}", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_kinds() {
        assert!(!MemAccessKind::Load.is_write());
        assert!(MemAccessKind::Store.is_write());
        assert!(MemAccessKind::Modify.is_write());
        assert!(!MemAccessKind::Execute.is_write());
    }
}
