use core::fmt::{self, Debug};
use core::mem::{size_of, transmute};
use core::slice;

use crate::config::GDT_ENTRY_COUNT;
use crate::cpu::{DescriptorTablePointer, PrivilegeLevel};

/// Largest value a descriptor limit can hold.
pub const MAX_LIMIT: u32 = 0xF_FFFF;

/// Most descriptors a 16-bit GDTR limit can cover.
pub const MAX_ENTRIES: usize = 8192;

bitflags::bitflags! {
    /// Access byte of a segment descriptor (byte 5).
    #[derive(PartialEq, Eq, Clone, Copy, Debug)]
    #[repr(transparent)]
    pub struct Access: u8 {
        /// (A) Set by the CPU on first use.
        const ACCESSED = 1 << 0;
        /// (RW) Readable for code segments, writable for data segments.
        const READ_WRITE = 1 << 1;
        /// (DC) Grows down for data segments, conforming for code segments.
        const DIRECTION_CONFORMING = 1 << 2;
        /// (E) Code segment when set, data segment otherwise.
        const EXECUTABLE = 1 << 3;
        /// (S) Code or data segment when set, system segment otherwise.
        const CODE_DATA = 1 << 4;
        /// (DPL) Descriptor privilege level, both bits set.
        const RING_3 = 0b11 << 5;
        /// (P) Segment is valid.
        const PRESENT = 1 << 7;
    }
}

impl Access {
    pub const fn with_privilege(self, privilege_level: PrivilegeLevel) -> Self {
        Self::from_bits_retain((self.bits() & !(0b11 << 5)) | ((privilege_level as u8) << 5))
    }
}

bitflags::bitflags! {
    /// High nibble of the granularity byte (byte 6).
    #[derive(PartialEq, Eq, Clone, Copy, Debug)]
    #[repr(transparent)]
    pub struct Flags: u8 {
        /// (AVL) Left for the operating system.
        const AVAILABLE = 1 << 4;
        /// (L) 64-bit code segment.
        const LONG_MODE = 1 << 5;
        /// (DB) 32-bit default operand size.
        const SIZE_32 = 1 << 6;
        /// (G) Limit counts 4 KiB pages rather than bytes.
        const GRANULARITY_4K = 1 << 7;
    }
}

/// Low nibble of the access byte of a code or data segment.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentType {
    DataRead = 0x00,
    DataReadAccessed = 0x01,
    DataReadWrite = 0x02,
    DataReadWriteAccessed = 0x03,
    DataReadExpandDown = 0x04,
    DataReadExpandDownAccessed = 0x05,
    DataReadWriteExpandDown = 0x06,
    DataReadWriteExpandDownAccessed = 0x07,
    CodeExecute = 0x08,
    CodeExecuteAccessed = 0x09,
    CodeExecuteRead = 0x0A,
    CodeExecuteReadAccessed = 0x0B,
    CodeExecuteConforming = 0x0C,
    CodeExecuteConformingAccessed = 0x0D,
    CodeExecuteReadConforming = 0x0E,
    CodeExecuteReadConformingAccessed = 0x0F,
}

impl TryFrom<u8> for SegmentType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::DataRead,
            0x01 => Self::DataReadAccessed,
            0x02 => Self::DataReadWrite,
            0x03 => Self::DataReadWriteAccessed,
            0x04 => Self::DataReadExpandDown,
            0x05 => Self::DataReadExpandDownAccessed,
            0x06 => Self::DataReadWriteExpandDown,
            0x07 => Self::DataReadWriteExpandDownAccessed,
            0x08 => Self::CodeExecute,
            0x09 => Self::CodeExecuteAccessed,
            0x0A => Self::CodeExecuteRead,
            0x0B => Self::CodeExecuteReadAccessed,
            0x0C => Self::CodeExecuteConforming,
            0x0D => Self::CodeExecuteConformingAccessed,
            0x0E => Self::CodeExecuteReadConforming,
            0x0F => Self::CodeExecuteReadConformingAccessed,
            _ => return Err(()),
        })
    }
}

impl SegmentType {
    pub const fn is_code(self) -> bool {
        self as u8 & Access::EXECUTABLE.bits() != 0
    }
}

/// Semantic description of one descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentConfig {
    pub base: u32,
    pub limit: u32,
    pub access: Access,
    pub flags: Flags,
}

const FLAT_FLAGS: Flags = Flags::GRANULARITY_4K.union(Flags::SIZE_32);
const CODE: Access = Access::PRESENT
    .union(Access::CODE_DATA)
    .union(Access::EXECUTABLE)
    .union(Access::READ_WRITE);
const DATA: Access = Access::PRESENT
    .union(Access::CODE_DATA)
    .union(Access::READ_WRITE);

impl SegmentConfig {
    pub const NULL: Self = Self {
        base: 0,
        limit: 0,
        access: Access::empty(),
        flags: Flags::empty(),
    };

    pub const KERNEL_CODE: Self = Self::flat(CODE.with_privilege(PrivilegeLevel::Ring0));
    pub const KERNEL_DATA: Self = Self::flat(DATA.with_privilege(PrivilegeLevel::Ring0));
    pub const USER_CODE: Self = Self::flat(CODE.with_privilege(PrivilegeLevel::Ring3));
    pub const USER_DATA: Self = Self::flat(DATA.with_privilege(PrivilegeLevel::Ring3));

    /// Segment spanning the whole 4 GiB linear address space.
    pub const fn flat(access: Access) -> Self {
        Self {
            base: 0,
            limit: MAX_LIMIT,
            access,
            flags: FLAT_FLAGS,
        }
    }
}

/// Canonical table contents. Position is the descriptor index, so the order
/// fixes the selectors in [`super::selectors`].
// TODO: append the TSS descriptor here once hardware task switching exists.
pub const FLAT_LAYOUT: [SegmentConfig; GDT_ENTRY_COUNT] = [
    SegmentConfig::NULL,
    SegmentConfig::KERNEL_CODE,
    SegmentConfig::KERNEL_DATA,
    SegmentConfig::USER_CODE,
    SegmentConfig::USER_DATA,
];

/// Limit bits 0..16, stored in bytes 0-1.
#[inline(always)]
const fn limit_low(limit: u32) -> u16 {
    (limit & 0xFFFF) as u16
}

/// Limit bits 16..20, stored in the low nibble of byte 6.
#[inline(always)]
const fn limit_high(limit: u32) -> u8 {
    ((limit >> 16) & 0x0F) as u8
}

/// Base bits 0..16, stored in bytes 2-3.
#[inline(always)]
const fn base_low(base: u32) -> u16 {
    (base & 0xFFFF) as u16
}

/// Base bits 16..24, stored in byte 4.
#[inline(always)]
const fn base_mid(base: u32) -> u8 {
    ((base >> 16) & 0xFF) as u8
}

/// Base bits 24..32, stored in byte 7.
#[inline(always)]
const fn base_high(base: u32) -> u8 {
    ((base >> 24) & 0xFF) as u8
}

/// Byte 6: limit bits 16..20 in bits 0..4, flags in bits 4..8. Anything in
/// the low nibble of `flags` is dropped.
#[inline(always)]
const fn granularity(limit: u32, flags: u8) -> u8 {
    limit_high(limit) | (flags & 0xF0)
}

/// One 8-byte GDT entry, laid out exactly as the processor reads it.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl SegmentDescriptor {
    pub const fn null() -> Self {
        Self {
            limit_low: 0,
            base_low: 0,
            base_mid: 0,
            access: 0,
            granularity: 0,
            base_high: 0,
        }
    }

    /// Packs the fields into a descriptor. Limit bits above 19 and the low
    /// nibble of `flags` are masked off rather than rejected.
    pub const fn new(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        Self {
            limit_low: limit_low(limit),
            base_low: base_low(base),
            base_mid: base_mid(base),
            access,
            granularity: granularity(limit, flags),
            base_high: base_high(base),
        }
    }

    pub const fn from_config(config: &SegmentConfig) -> Self {
        Self::new(
            config.base,
            config.limit,
            config.access.bits(),
            config.flags.bits(),
        )
    }

    pub fn base(&self) -> u32 {
        self.base_low as u32 | (self.base_mid as u32) << 16 | (self.base_high as u32) << 24
    }

    pub fn limit(&self) -> u32 {
        self.limit_low as u32 | ((self.granularity & 0x0F) as u32) << 16
    }

    pub fn access(&self) -> Access {
        Access::from_bits_retain(self.access)
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits_retain(self.granularity & 0xF0)
    }

    pub fn is_present(&self) -> bool {
        self.access().contains(Access::PRESENT)
    }

    pub fn privilege_level(&self) -> PrivilegeLevel {
        ((self.access >> 5) & 0b11).try_into().unwrap()
    }

    /// `None` for system segments, whose type nibble means something else.
    pub fn segment_type(&self) -> Option<SegmentType> {
        if !self.access().contains(Access::CODE_DATA) {
            return None;
        }
        (self.access & 0x0F).try_into().ok()
    }

    /// The descriptor exactly as it sits in memory.
    pub fn to_bytes(self) -> [u8; 8] {
        // SAFETY: packed, no padding, every bit pattern is a valid byte array
        unsafe { transmute::<Self, [u8; 8]>(self) }
    }
}

impl Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("{:#010x}", self.base()))
            .field("limit", &format_args!("{:#07x}", self.limit()))
            .field("access", &format_args!("{:#04x}", self.access().bits()))
            .field("flags", &self.flags())
            .field("privilege level", &self.privilege_level())
            .field("type", &self.segment_type())
            .finish()
    }
}

#[repr(C, align(8))]
#[derive(Clone, PartialEq, Eq)]
pub struct GlobalDescriptorTable<const N: usize> {
    entries: [SegmentDescriptor; N],
}

impl<const N: usize> GlobalDescriptorTable<N> {
    /// A table of null descriptors. `N` must be in `1..=MAX_ENTRIES`, which
    /// is checked at compile time.
    pub const fn new() -> Self {
        const {
            assert!(
                N >= 1 && N <= MAX_ENTRIES,
                "GDT must hold between 1 and 8192 descriptors"
            )
        };
        Self {
            entries: [SegmentDescriptor::null(); N],
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Encodes a descriptor into slot `index`.
    ///
    /// Panics if `index` is out of bounds. Out-of-range field bits are masked
    /// as in [`SegmentDescriptor::new`].
    pub fn set_entry(&mut self, index: usize, base: u32, limit: u32, access: u8, flags: u8) {
        assert!(index < N, "GDT index {} out of bounds ({} entries)", index, N);
        self.entries[index] = SegmentDescriptor::new(base, limit, access, flags);
    }

    pub fn entry(&self, index: usize) -> &SegmentDescriptor {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[SegmentDescriptor] {
        &self.entries
    }

    /// Selector referencing slot `index` from the GDT at ring 0.
    pub const fn selector(index: usize) -> u16 {
        (index * size_of::<SegmentDescriptor>()) as u16
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) array of packed descriptors, no padding
        unsafe { slice::from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
    }

    /// Only valid while `self` stays at its current address.
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer::new(self)
    }
}

impl<const N: usize> Default for GlobalDescriptorTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Debug for GlobalDescriptorTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            writeln!(f, "{:#04x} {:?}", Self::selector(index), entry)?;
        }
        Ok(())
    }
}
