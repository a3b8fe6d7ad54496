use boot_gdt::{
    Access, BootGdt, FLAT_LAYOUT, Flags, GdtState, GlobalDescriptorTable, PrivilegeLevel,
    SegmentConfig, SegmentDescriptor, selectors,
};

#[test]
fn kernel_segments_are_flat_ring0() {
    let mut gdt = BootGdt::new();
    gdt.populate();
    let table = gdt.table();

    for selector in [selectors::KERNEL_CODE, selectors::KERNEL_DATA] {
        let entry = table.entry(selector.index() as usize);
        assert!(entry.is_present());
        assert_eq!(entry.privilege_level(), PrivilegeLevel::Ring0);
        assert_eq!(entry.base(), 0);
        assert_eq!(entry.limit(), 0xFFFFF);
        assert_eq!(entry.flags(), Flags::GRANULARITY_4K | Flags::SIZE_32);
    }

    for selector in [selectors::USER_CODE, selectors::USER_DATA] {
        let entry = table.entry(selector.index() as usize);
        assert_eq!(entry.privilege_level(), PrivilegeLevel::Ring3);
    }

    assert_eq!(*table.entry(0), SegmentDescriptor::null());
}

#[test]
fn code_and_data_differ_only_in_access() {
    for (code, data) in [(1, 2), (3, 4)] {
        let code = SegmentDescriptor::from_config(&FLAT_LAYOUT[code]).to_bytes();
        let data = SegmentDescriptor::from_config(&FLAT_LAYOUT[data]).to_bytes();
        for byte in [0, 1, 2, 3, 4, 6, 7] {
            assert_eq!(code[byte], data[byte]);
        }
        assert_eq!(code[5] ^ data[5], Access::EXECUTABLE.bits());
    }
}

#[test]
fn custom_entries_through_encoder() {
    let mut table = GlobalDescriptorTable::<6>::new();
    for (index, config) in FLAT_LAYOUT.iter().enumerate() {
        table.set_entry(index, config.base, config.limit, config.access.bits(), config.flags.bits());
    }
    // A byte-granular 16-bit data segment at 64 KiB.
    let extra = SegmentConfig {
        base: 0x0001_0000,
        limit: 0xFFFF,
        access: Access::PRESENT | Access::CODE_DATA | Access::READ_WRITE,
        flags: Flags::empty(),
    };
    table.set_entry(5, extra.base, extra.limit, extra.access.bits(), extra.flags.bits());

    assert_eq!(
        table.entry(5).to_bytes(),
        [0xFF, 0xFF, 0x00, 0x00, 0x01, 0x92, 0x00, 0x00]
    );
    assert_eq!(table.pointer().limit(), 47);
    assert_eq!(GlobalDescriptorTable::<6>::selector(5), 0x28);
}

#[test]
fn fresh_context_starts_uninitialized() {
    let gdt = BootGdt::default();
    assert_eq!(gdt.state(), GdtState::Uninitialized);
    assert!(gdt.table().as_bytes().iter().all(|&b| b == 0));
}
