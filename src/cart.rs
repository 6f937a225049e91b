use bytemuck::*;
use thiserror::Error;

use crate::{addr::Addr, addr_space};

/// Boot logo bitmap every valid ROM carries; checked before analysis.
pub const ROM_SIG: [u8; 48] = [
    0xce, 0xed, 0x66, 0x66, 0xcc, 0x0d, 0x00, 0x0b, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0c, 0x00,
    0x0d, 0x00, 0x08, 0x11, 0x1f, 0x88, 0x89, 0x00, 0x0e, 0xdc, 0xcc, 0x6e, 0xe6, 0xdd, 0xdd,
    0xd9, 0x99, 0xbb, 0xbb, 0x67, 0x63, 0x6e, 0x0e, 0xec, 0xcc, 0xdd, 0xdc, 0x99, 0x9f, 0xbb,
    0xb9, 0x33, 0x3e,
];
pub const ROM_SIG_OFFSET: u16 = 0x104;
pub const HDR_OFFSET: u16 = 0x134;
/// Execution begins here after the boot rom hands over.
pub const START_ADDR: Addr = Addr::new(0x100);

#[derive(Debug, Clone)]
pub struct Rom {
    pub data: Vec<u8>,
}

impl Rom {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn read(&self, offset: u16) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    pub fn read_header(&self) -> Header {
        let mut hdr = Header::zeroed();
        for i in 0..core::mem::size_of_val(&hdr) {
            bytes_of_mut(&mut hdr)[i] = self.read(HDR_OFFSET + i as u16).unwrap_or(0);
        }
        hdr
    }

    pub fn has_signature(&self) -> bool {
        let start = ROM_SIG_OFFSET as usize;
        self.data.get(start..start + ROM_SIG.len()) == Some(&ROM_SIG[..])
    }

    /// Header checksum over 0x134..=0x14c, as the boot rom computes it.
    pub fn header_checksum(&self) -> u8 {
        (0x134..=0x14c).fold(0u8, |acc, off| {
            acc.wrapping_sub(self.read(off).unwrap_or(0)).wrapping_sub(1)
        })
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, TransparentWrapper, Pod)]
#[repr(transparent)]
pub struct Title(pub [u8; 15]);

impl Title {
    pub fn unpadded_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&c| c == 0).unwrap_or(15);
        self.0[..end].trim_ascii_end()
    }
}

impl core::fmt::Display for Title {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use core::fmt::Write;
        for c in self.unpadded_bytes().iter().map(|&c| match c {
            0x20..=0x7e => c as char,
            _ => char::REPLACEMENT_CHARACTER,
        }) {
            f.write_char(c)?;
        }
        Ok(())
    }
}

/// ROM size code: `32KiB << code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, TransparentWrapper, Pod)]
#[repr(transparent)]
pub struct RomSize(pub u8);

impl RomSize {
    pub const fn banks(&self) -> u32 {
        2u32 << if self.0 > 8 { 8 } else { self.0 }
    }

    pub const fn bytes(&self) -> u32 {
        self.banks() * 0x4000
    }
}

impl core::fmt::Display for RomSize {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let bytes = self.bytes();
        if bytes < 0x10_0000 {
            write!(f, "{}KiB", bytes >> 10)
        } else {
            write!(f, "{}MiB", bytes >> 20)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable, TransparentWrapper, Pod)]
#[repr(transparent)]
pub struct RamSize(pub u8);

impl RamSize {
    pub const fn bytes(&self) -> u32 {
        match self.0 {
            1 => 0x800,
            2 => 0x2000,
            3 => 0x8000,
            4 => 0x2_0000,
            5 => 0x1_0000,
            _ => 0,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes() == 0
    }
}

/// The 28-byte cartridge header at 0x134.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct Header {
    pub title: Title,
    pub cgb_flag: u8,
    pub licensee_code: [u8; 2],
    pub sgb_flag: u8,
    pub cart_type: u8,
    pub rom_size: RomSize,
    pub ram_size: RamSize,
    pub destination: u8,
    pub old_licensee: u8,
    pub version: u8,
    pub complement: u8,
    pub checksum: [u8; 2],
}

impl Header {
    /// Global checksum, stored little-endian.
    pub const fn checksum(&self) -> u16 {
        u16::from_le_bytes(self.checksum)
    }

    pub const fn supports_color(&self) -> bool {
        self.cgb_flag & 0x80 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("rom image is too small to hold a header")]
    TooShort,
    #[error("boot logo signature mismatch")]
    BadSignature,
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub rom: Rom,
    pub header: Header,
}

impl Cart {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CartError> {
        let rom = Rom::from_bytes(bytes);
        if rom.len() < 0x150 {
            return Err(CartError::TooShort);
        }
        if !rom.has_signature() {
            return Err(CartError::BadSignature);
        }
        let header = rom.read_header();
        if rom.header_checksum() != header.complement {
            log::warn!(
                "header checksum mismatch: computed {:#04x}, header says {:#04x}",
                rom.header_checksum(),
                header.complement
            );
        }
        Ok(Self { rom, header })
    }

    /// Read one byte through the bus mapping; only the ROM banks are backed.
    pub fn read(&self, addr: Addr) -> Option<u8> {
        self.rom.read(addr_space::rom_offset(addr)?)
    }
}

/// Minimal valid 32KiB image for tests.
#[cfg(test)]
pub(crate) fn rom_image() -> Vec<u8> {
    let mut data = vec![0u8; 0x8000];
    data[ROM_SIG_OFFSET as usize..ROM_SIG_OFFSET as usize + 48].copy_from_slice(&ROM_SIG);
    data[0x134..0x134 + 9].copy_from_slice(b"DOTMATRIX");
    data[0x147] = 0x03; // MBC1+RAM+BATTERY
    data[0x148] = 0x01; // 64KiB
    data[0x149] = 0x02; // 8KiB
    data[0x14c] = 0x01; // mask rom version
    let complement = Rom::from_bytes(data.clone()).header_checksum();
    data[0x14d] = complement;
    data[0x14e..0x150].copy_from_slice(&0xbeefu16.to_le_bytes());
    data
}
