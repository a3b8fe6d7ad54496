#[cfg(target_arch = "x86")]
use core::arch::asm;

#[cfg(target_arch = "x86")]
use crate::cpu::segments::selectors;

/// Installs the descriptor table described by the [`DescriptorTablePointer`](crate::cpu::DescriptorTablePointer)
/// found at the given address.
///
/// # Safety
///
/// The address must point to a valid pointer whose table outlives its use by
/// the processor.
pub type LoadFn = unsafe fn(pointer: usize);

/// Loads GDTR and reloads every segment register so the new table takes
/// effect immediately: data segments get `KERNEL_DATA`, CS gets
/// `KERNEL_CODE` through a far return.
///
/// # Safety
///
/// The table must contain a present ring 0 code segment at
/// `KERNEL_CODE` and data segment at `KERNEL_DATA`, and must live for as long
/// as it stays loaded.
#[cfg(target_arch = "x86")]
pub unsafe fn load_gdt(pointer: usize) {
    unsafe {
        asm!(
            "lgdt [{pointer}]",
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "mov ss, {data:x}",
            "push {code}",
            "lea {tmp}, [55f]",
            "push {tmp}",
            "retf",
            "55:",
            pointer = in(reg) pointer,
            data = in(reg) selectors::KERNEL_DATA.value() as u32,
            code = in(reg) selectors::KERNEL_CODE.value() as u32,
            tmp = lateout(reg) _,
        );
    }
}
