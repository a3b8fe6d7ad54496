#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod cpu;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod drivers;
pub mod logger;

use crate::logger::Logger;

pub static LOGGER: Logger = Logger::new(config::LOG_LEVEL);

pub use cpu::segments::global_descriptor_table::{
    Access, FLAT_LAYOUT, Flags, GlobalDescriptorTable, SegmentConfig, SegmentDescriptor,
    SegmentType,
};
pub use cpu::segments::{BootGdt, GdtState, SegmentSelector, init_with, selectors};
#[cfg(target_arch = "x86")]
pub use cpu::segments::init;
pub use cpu::{DescriptorTablePointer, PrivilegeLevel};
pub use cpu::registers::LoadFn;
