use crate::addr::Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// 0x0000..=0x3fff, fixed home bank
    Rom0(u16),
    /// 0x4000..=0x7fff, switchable bank window
    Rom1(u16),
    /// 0x8000..=0x9fff
    Vram(u16),
    /// 0xa000..=0xbfff, cartridge ram
    Sram(u16),
    /// 0xc000..=0xdfff
    Wram(u16),
    /// 0xe000..=0xfdff, mirrors wram
    Echo(u16),
    /// 0xfe00..=0xfe9f
    Oam(u8),
    /// 0xfea0..=0xff7f
    Io(u16),
    /// 0xff80..=0xfffe
    Hram(u8),
    /// 0xffff
    InterruptEnable,
}

pub const fn locate(addr: Addr) -> MemoryLocation {
    let ptr = addr.get();
    match ptr {
        0x0000..=0x3fff => MemoryLocation::Rom0(ptr),
        0x4000..=0x7fff => MemoryLocation::Rom1(ptr - 0x4000),
        0x8000..=0x9fff => MemoryLocation::Vram(ptr - 0x8000),
        0xa000..=0xbfff => MemoryLocation::Sram(ptr - 0xa000),
        0xc000..=0xdfff => MemoryLocation::Wram(ptr - 0xc000),
        0xe000..=0xfdff => MemoryLocation::Echo(ptr - 0xe000),
        0xfe00..=0xfe9f => MemoryLocation::Oam((ptr - 0xfe00) as u8),
        0xfea0..=0xff7f => MemoryLocation::Io(ptr),
        0xff80..=0xfffe => MemoryLocation::Hram((ptr - 0xff80) as u8),
        0xffff => MemoryLocation::InterruptEnable,
    }
}

/// Linear ROM image offset for addresses inside the two ROM banks.
pub const fn rom_offset(addr: Addr) -> Option<u16> {
    match locate(addr) {
        MemoryLocation::Rom0(off) => Some(off),
        MemoryLocation::Rom1(off) => Some(0x4000 + off),
        _ => None,
    }
}

/// Only the lower half of the address space holds executable code.
pub const fn is_executable(addr: Addr) -> bool {
    addr.get() < 0x8000
}
