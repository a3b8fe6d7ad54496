pub mod global_descriptor_table;

use core::fmt::Debug;

use spin::Mutex;

use crate::config::GDT_ENTRY_COUNT;
use crate::cpu::registers::LoadFn;
use crate::cpu::{DescriptorTablePointer, PrivilegeLevel};
use crate::logger;
use global_descriptor_table::{FLAT_LAYOUT, GlobalDescriptorTable, SegmentDescriptor};

/// Selectors of the segments in [`FLAT_LAYOUT`], at ring 0. User mode loads
/// them through [`SegmentSelector::with_rpl`].
pub mod selectors {
    use super::*;

    pub const NULL: SegmentSelector =
        SegmentSelector::new(0, DescriptorTable::GDT, PrivilegeLevel::Ring0);
    pub const KERNEL_CODE: SegmentSelector =
        SegmentSelector::new(1, DescriptorTable::GDT, PrivilegeLevel::Ring0);
    pub const KERNEL_DATA: SegmentSelector =
        SegmentSelector::new(2, DescriptorTable::GDT, PrivilegeLevel::Ring0);
    pub const USER_CODE: SegmentSelector =
        SegmentSelector::new(3, DescriptorTable::GDT, PrivilegeLevel::Ring0);
    pub const USER_DATA: SegmentSelector =
        SegmentSelector::new(4, DescriptorTable::GDT, PrivilegeLevel::Ring0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum DescriptorTable {
    GDT = 0,
    LDT = 1,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    pub const fn new(
        index: u16,
        descriptor_table: DescriptorTable,
        privilege_level: PrivilegeLevel,
    ) -> Self {
        Self(index << 3 | ((descriptor_table as u16) << 2) | privilege_level as u16)
    }

    pub const fn with_rpl(self, privilege_level: PrivilegeLevel) -> Self {
        Self((self.0 & !0b11) | privilege_level as u16)
    }

    pub const fn value(&self) -> u16 {
        self.0
    }

    pub const fn index(&self) -> u16 {
        self.0 >> 3
    }

    pub fn descriptor_table(&self) -> DescriptorTable {
        match (self.0 >> 2) & 1 {
            0 => DescriptorTable::GDT,
            _ => DescriptorTable::LDT,
        }
    }

    pub fn requested_privilege_level(&self) -> PrivilegeLevel {
        ((self.0 & 0b11) as u8).try_into().unwrap()
    }
}

impl Debug for SegmentSelector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SegmentSelector")
            .field("index", &self.index())
            .field("table", &self.descriptor_table())
            .field("rpl", &self.requested_privilege_level())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GdtState {
    Uninitialized,
    Populated,
    Installed,
}

/// The boot-time GDT together with the pointer handed to `lgdt`.
///
/// Moves only forward through [`GdtState`]. Once installed the table is
/// frozen: the processor reads it directly, so neither it nor `self` may move
/// or change afterwards.
pub struct BootGdt {
    table: GlobalDescriptorTable<GDT_ENTRY_COUNT>,
    pointer: DescriptorTablePointer,
    state: GdtState,
}

impl BootGdt {
    pub const fn new() -> Self {
        Self {
            table: GlobalDescriptorTable::new(),
            pointer: DescriptorTablePointer::null(),
            state: GdtState::Uninitialized,
        }
    }

    pub fn state(&self) -> GdtState {
        self.state
    }

    pub fn table(&self) -> &GlobalDescriptorTable<GDT_ENTRY_COUNT> {
        &self.table
    }

    /// Writes [`FLAT_LAYOUT`] into the table. Repeating it rewrites the same
    /// bytes; after installation it does nothing.
    pub fn populate(&mut self) {
        if self.state == GdtState::Installed {
            logger::warning!("GDT already installed, not repopulating");
            return;
        }

        for (index, config) in FLAT_LAYOUT.iter().enumerate() {
            self.table.set_entry(
                index,
                config.base,
                config.limit,
                config.access.bits(),
                config.flags.bits(),
            );
            logger::debug!(
                "GDT {:#04x}: {:?}",
                GlobalDescriptorTable::<GDT_ENTRY_COUNT>::selector(index),
                self.table.entry(index)
            );
        }

        debug_assert_eq!(*self.table.entry(0), SegmentDescriptor::null());
        self.state = GdtState::Populated;
    }

    /// Panics if the table has not been populated yet.
    pub fn pointer(&self) -> DescriptorTablePointer {
        if self.state == GdtState::Uninitialized {
            logger::critical!("GDT pointer requested before the table was populated");
            panic!("GDT pointer requested before the table was populated");
        }
        self.table.pointer()
    }

    /// Hands the table to `load`. A second call is ignored.
    ///
    /// Panics if the table has not been populated yet.
    ///
    /// # Safety
    ///
    /// `self` must not move or be dropped while the table is loaded, and
    /// `load` must accept the address of a [`DescriptorTablePointer`].
    pub unsafe fn install(&mut self, load: LoadFn) {
        match self.state {
            GdtState::Uninitialized => {
                logger::critical!("GDT installed before the table was populated");
                panic!("GDT installed before the table was populated");
            }
            GdtState::Installed => {
                logger::warning!("GDT already installed");
                return;
            }
            GdtState::Populated => {}
        }

        self.pointer = self.pointer();
        logger::info!("Loading GDT: {:?}", self.pointer);

        unsafe { load(self.pointer.address()) };
        self.state = GdtState::Installed;
    }
}

impl Default for BootGdt {
    fn default() -> Self {
        Self::new()
    }
}

static BOOT_GDT: Mutex<BootGdt> = Mutex::new(BootGdt::new());

/// Builds the kernel's GDT and installs it with `load`.
pub fn init_with(load: LoadFn) {
    let mut gdt = BOOT_GDT.lock();
    gdt.populate();

    // SAFETY: BOOT_GDT is a static and never moves
    unsafe { gdt.install(load) };
}

/// Brings up the serial log sink, then builds and loads the kernel's GDT.
#[cfg(target_arch = "x86")]
pub fn init() {
    crate::drivers::serial::init();
    init_with(crate::cpu::registers::load_gdt);
}
