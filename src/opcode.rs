use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;
use thiserror::Error;

/// Descriptor table for the unprefixed opcode space, embedded at build time.
/// The `cbprefixed` section of the document exists but is never consulted;
/// 0xcb therefore has no entry and decodes as an unknown opcode.
const OPCODES_JSON: &str = include_str!("../data/opcodes.json");

static TABLE: LazyLock<OpcodeTable> =
    LazyLock::new(|| OpcodeTable::from_json(OPCODES_JSON).expect("embedded opcode table is valid"));

/// Width and addressing form of one operand, fixed when the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// `d8`, `r8` or `a8`: one raw byte follows the opcode.
    Imm8,
    /// Dereferenced 8-bit form such as `(a8)` or `SP+r8`.
    Addr8,
    /// `d16` or `a16`: a little-endian word follows the opcode.
    Imm16,
    /// Dereferenced 16-bit form such as `(a16)`.
    Addr16,
    /// Register, condition flag or other literal text; no encoded data.
    Reg,
}

impl OperandKind {
    /// Bytes of encoded data, counted from the opcode byte.
    pub const fn encoded_end(self) -> u8 {
        match self {
            Self::Imm8 | Self::Addr8 => 2,
            Self::Imm16 | Self::Addr16 => 3,
            Self::Reg => 1,
        }
    }

    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Reg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    /// Descriptor text as it appears in the table, e.g. `d8`, `(HL+)`, `NZ`.
    pub text: String,
}

impl Operand {
    fn classify(text: String) -> Self {
        let eight = ["d8", "r8", "a8"];
        let sixteen = ["d16", "a16"];
        let kind = if eight.contains(&&*text) {
            OperandKind::Imm8
        } else if eight.iter().any(|tag| text.contains(tag)) {
            OperandKind::Addr8
        } else if sixteen.contains(&&*text) {
            OperandKind::Imm16
        } else if sixteen.iter().any(|tag| text.contains(tag)) {
            OperandKind::Addr16
        } else {
            OperandKind::Reg
        };
        Self { kind, text }
    }
}

/// Mnemonic family driving control-flow classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Jr,
    Jp,
    Call,
    Ret,
    Other,
}

impl Family {
    fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic {
            "JR" => Self::Jr,
            "JP" => Self::Jp,
            "CALL" => Self::Call,
            // RETI is left in Other: it restores the interrupt flag and was
            // never classified as a return by the table source.
            "RET" => Self::Ret,
            _ => Self::Other,
        }
    }
}

/// Which processor flags an instruction writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagEffect {
    None,
    All,
    CarryZeroNeg,
    ZeroNeg,
}

impl FlagEffect {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "-" => Self::None,
            "*" => Self::All,
            "czn" => Self::CarryZeroNeg,
            "zn" => Self::ZeroNeg,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub mnemonic: String,
    pub family: Family,
    /// Total encoded length in bytes, always 1..=3.
    pub length: u8,
    pub operand1: Option<Operand>,
    pub operand2: Option<Operand>,
    pub flags: FlagEffect,
}

impl OpcodeEntry {
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.operand1.iter().chain(self.operand2.iter())
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("opcode table is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad opcode key {0:?}")]
    BadKey(String),
    #[error("opcode 0x{opcode:02x} has length {length}, expected 1..=3")]
    BadLength { opcode: u8, length: u8 },
    #[error("opcode 0x{opcode:02x} declares operand data wider than its length")]
    OperandOverflow { opcode: u8 },
    #[error("opcode 0x{opcode:02x} has unknown flag tag {tag:?}")]
    BadFlagTag { opcode: u8, tag: String },
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    mnemonic: String,
    length: u8,
    operand1: Option<String>,
    operand2: Option<String>,
    flags: String,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    unprefixed: BTreeMap<String, RawEntry>,
}

pub struct OpcodeTable {
    entries: [Option<OpcodeEntry>; 256],
}

impl OpcodeTable {
    /// The process-wide table, built on first use and immutable afterwards.
    pub fn global() -> &'static Self {
        &TABLE
    }

    pub fn lookup(&self, opcode: u8) -> Option<&OpcodeEntry> {
        self.entries[opcode as usize].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &OpcodeEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(op, entry)| Some((op as u8, entry.as_ref()?)))
    }

    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let raw: RawTable = serde_json::from_str(json)?;
        let mut entries: [Option<OpcodeEntry>; 256] = core::array::from_fn(|_| None);
        for (key, raw) in raw.unprefixed {
            let opcode = key
                .strip_prefix("0x")
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| TableError::BadKey(key.clone()))?;
            if !(1..=3).contains(&raw.length) {
                return Err(TableError::BadLength {
                    opcode,
                    length: raw.length,
                });
            }
            let flags = FlagEffect::from_tag(&raw.flags).ok_or_else(|| TableError::BadFlagTag {
                opcode,
                tag: raw.flags.clone(),
            })?;
            let entry = OpcodeEntry {
                family: Family::from_mnemonic(&raw.mnemonic),
                mnemonic: raw.mnemonic,
                length: raw.length,
                operand1: raw.operand1.map(Operand::classify),
                operand2: raw.operand2.map(Operand::classify),
                flags,
            };
            // The decoder indexes operand bytes without rechecking, so the
            // declared length must cover every data operand.
            if entry.operands().any(|op| op.kind.encoded_end() > entry.length) {
                return Err(TableError::OperandOverflow { opcode });
            }
            entries[opcode as usize] = Some(entry);
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_table_loads() {
        let table = OpcodeTable::global();
        assert_eq!(table.iter().count(), 244);
    }

    #[test]
    fn prefix_introducer_has_no_entry() {
        assert!(OpcodeTable::global().lookup(0xcb).is_none());
    }

    #[test]
    fn holes_match_undefined_opcodes() {
        let undefined = [
            0xcbu8, 0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd,
        ];
        let table = OpcodeTable::global();
        for op in 0..=0xff {
            assert_eq!(table.lookup(op).is_none(), undefined.contains(&op), "{op:#04x}");
        }
    }

    #[test]
    fn lengths_are_in_range() {
        for (op, entry) in OpcodeTable::global().iter() {
            assert!((1..=3).contains(&entry.length), "{op:#04x}");
        }
    }

    #[test]
    fn nop_entry() {
        let entry = OpcodeTable::global().lookup(0x00).unwrap();
        assert_eq!(entry.mnemonic, "NOP");
        assert_eq!(entry.length, 1);
        assert!(entry.operand1.is_none());
        assert_eq!(entry.family, Family::Other);
    }

    #[test]
    fn families() {
        let table = OpcodeTable::global();
        assert_eq!(table.lookup(0x18).unwrap().family, Family::Jr);
        assert_eq!(table.lookup(0xc3).unwrap().family, Family::Jp);
        assert_eq!(table.lookup(0xcd).unwrap().family, Family::Call);
        assert_eq!(table.lookup(0xc9).unwrap().family, Family::Ret);
        assert_eq!(table.lookup(0xd9).unwrap().family, Family::Other);
        assert_eq!(table.lookup(0x76).unwrap().family, Family::Other);
    }

    #[test]
    fn classification() {
        let kind = |text: &str| Operand::classify(text.into()).kind;
        assert_eq!(kind("d8"), OperandKind::Imm8);
        assert_eq!(kind("r8"), OperandKind::Imm8);
        assert_eq!(kind("a8"), OperandKind::Imm8);
        assert_eq!(kind("(a8)"), OperandKind::Addr8);
        assert_eq!(kind("SP+r8"), OperandKind::Addr8);
        assert_eq!(kind("d16"), OperandKind::Imm16);
        assert_eq!(kind("a16"), OperandKind::Imm16);
        assert_eq!(kind("(a16)"), OperandKind::Addr16);
        assert_eq!(kind("A"), OperandKind::Reg);
        assert_eq!(kind("(HL+)"), OperandKind::Reg);
        assert_eq!(kind("NZ"), OperandKind::Reg);
        assert_eq!(kind("38H"), OperandKind::Reg);
    }

    #[test]
    fn data_operands_fit_declared_length() {
        for (op, entry) in OpcodeTable::global().iter() {
            for operand in entry.operands() {
                assert!(operand.kind.encoded_end() <= entry.length, "{op:#04x}");
            }
        }
    }
}
