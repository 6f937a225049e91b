use bytemuck::*;

/// A location on the 16-bit bus. All arithmetic wraps modulo 65536.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(transparent)]
pub struct Addr(pub u16);

impl Addr {
    pub const NULL: Self = Self(0);
    pub const MAX: Self = Self(0xffff);

    pub const fn new(addr: u16) -> Self {
        Self(addr)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    pub const fn add(self, val: u16) -> Self {
        Self(self.0.wrapping_add(val))
    }

    pub const fn sub(self, val: u16) -> Self {
        Self(self.0.wrapping_sub(val))
    }

    /// Offset by a signed 8-bit displacement.
    pub const fn offset(self, disp: i8) -> Self {
        self.add(disp as u16)
    }
}

impl From<u16> for Addr {
    fn from(addr: u16) -> Self {
        Self(addr)
    }
}

impl core::fmt::Display for Addr {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl core::fmt::Debug for Addr {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}
