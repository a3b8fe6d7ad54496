use core::fmt;
use core::mem::size_of;

pub mod registers;
pub mod segments;

/// Operand of `lgdt`: table size minus one, then the linear address of the
/// first entry. Six bytes on 32-bit x86.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DescriptorTablePointer {
    limit: u16,
    base: usize,
}

impl DescriptorTablePointer {
    pub const fn null() -> Self {
        Self { limit: 0, base: 0 }
    }

    /// The result is only meaningful while `table` does not move.
    ///
    /// Panics if `T` is empty or larger than the 64 KiB a descriptor table
    /// register can describe.
    pub fn new<T>(table: &T) -> Self {
        let limit = match size_of::<T>().checked_sub(1).map(u16::try_from) {
            Some(Ok(limit)) => limit,
            _ => panic!(
                "descriptor table of {} bytes does not fit a 16-bit limit",
                size_of::<T>()
            ),
        };
        Self {
            limit,
            base: table as *const T as usize,
        }
    }

    #[inline]
    pub fn limit(&self) -> u16 {
        self.limit
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn address(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for DescriptorTablePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = self.limit;
        let base = self.base;
        f.debug_struct("DescriptorTablePointer")
            .field("limit", &format_args!("{:#06x}", limit))
            .field("base", &format_args!("{:#x}", base))
            .finish()
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivilegeLevel {
    Ring0 = 0x00,
    Ring1 = 0x01,
    Ring2 = 0x02,
    Ring3 = 0x03,
}

impl TryFrom<u8> for PrivilegeLevel {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ring0),
            1 => Ok(Self::Ring1),
            2 => Ok(Self::Ring2),
            3 => Ok(Self::Ring3),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_packed() {
        assert_eq!(size_of::<DescriptorTablePointer>(), 2 + size_of::<usize>());
    }

    #[test]
    fn pointer_covers_whole_object() {
        let table = [0u64; 3];
        let pointer = DescriptorTablePointer::new(&table);
        assert_eq!(pointer.limit(), 23);
        assert_eq!(pointer.base(), table.as_ptr() as usize);
    }

    #[test]
    fn pointer_accepts_full_64k() {
        let bytes = std::vec![0u8; 0x1_0000];
        let table = <&[u8; 0x1_0000]>::try_from(&bytes[..]).unwrap();
        assert_eq!(DescriptorTablePointer::new(table).limit(), 0xFFFF);
    }

    #[test]
    #[should_panic(expected = "does not fit a 16-bit limit")]
    fn pointer_rejects_oversized_table() {
        let bytes = std::vec![0u8; 0x1_0001];
        let table = <&[u8; 0x1_0001]>::try_from(&bytes[..]).unwrap();
        DescriptorTablePointer::new(table);
    }

    #[test]
    #[should_panic(expected = "does not fit a 16-bit limit")]
    fn pointer_rejects_empty_table() {
        DescriptorTablePointer::new(&());
    }

    #[test]
    fn privilege_levels_decode() {
        assert_eq!(PrivilegeLevel::try_from(0), Ok(PrivilegeLevel::Ring0));
        assert_eq!(PrivilegeLevel::try_from(3), Ok(PrivilegeLevel::Ring3));
        assert_eq!(PrivilegeLevel::try_from(4), Err(()));
    }
}
