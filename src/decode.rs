use thiserror::Error;

use crate::{
    addr::Addr,
    opcode::{Family, OpcodeEntry, OpcodeTable, Operand},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The opcode has no unprefixed table entry. Expected while probing data
    /// regions, and deliberately covers 0xcb.
    #[error("no unprefixed instruction with opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    /// Fewer bytes available than the table entry's declared length.
    #[error("instruction is longer than the available bytes")]
    TruncatedInstruction,
}

/// One operand value read out of the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandValue {
    Byte(u8),
    Word(u16),
}

impl OperandValue {
    pub const fn widen(self) -> u16 {
        match self {
            Self::Byte(val) => val as u16,
            Self::Word(val) => val,
        }
    }
}

/// A single decoded instruction. Transient; owned by the caller.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub addr: Addr,
    pub opcode: u8,
    pub entry: &'static OpcodeEntry,
    /// Resolved values for the entry's data operands, `None` for register
    /// operands and absent slots.
    pub operand1: Option<OperandValue>,
    pub operand2: Option<OperandValue>,
}

impl Instruction {
    pub fn mnemonic(&self) -> &str {
        &self.entry.mnemonic
    }

    pub const fn length(&self) -> u8 {
        self.entry.length
    }

    pub const fn family(&self) -> Family {
        self.entry.family
    }

    /// Address of the next sequential instruction.
    pub const fn end(&self) -> Addr {
        self.addr.add(self.entry.length as u16)
    }

    pub const fn data_byte(&self) -> Option<u8> {
        match (self.operand1, self.operand2) {
            (Some(OperandValue::Byte(val)), _) | (_, Some(OperandValue::Byte(val))) => Some(val),
            _ => None,
        }
    }

    pub const fn data_word(&self) -> Option<u16> {
        match (self.operand1, self.operand2) {
            (Some(OperandValue::Word(val)), _) | (_, Some(OperandValue::Word(val))) => Some(val),
            _ => None,
        }
    }
}

/// Decode one instruction from `bytes`, which must hold at least the
/// instruction's encoded length. Pure; the only shared state is the
/// immutable opcode table.
pub fn decode(bytes: &[u8], addr: Addr) -> Result<Instruction, DecodeError> {
    let Some(&opcode) = bytes.first() else {
        return Err(DecodeError::TruncatedInstruction);
    };
    let entry = OpcodeTable::global()
        .lookup(opcode)
        .ok_or(DecodeError::UnknownOpcode(opcode))?;
    if bytes.len() < entry.length as usize {
        return Err(DecodeError::TruncatedInstruction);
    }
    Ok(Instruction {
        addr,
        opcode,
        entry,
        operand1: resolve(entry.operand1.as_ref(), bytes),
        operand2: resolve(entry.operand2.as_ref(), bytes),
    })
}

// Table load guarantees the entry length covers every data operand, so the
// indexing below cannot go out of bounds after the length check in `decode`.
fn resolve(operand: Option<&Operand>, bytes: &[u8]) -> Option<OperandValue> {
    use crate::opcode::OperandKind::*;
    match operand?.kind {
        Imm8 | Addr8 => Some(OperandValue::Byte(bytes[1])),
        Imm16 | Addr16 => Some(OperandValue::Word(u16::from_le_bytes([bytes[1], bytes[2]]))),
        Reg => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_matches_table_for_every_opcode() {
        let table = OpcodeTable::global();
        for (op, entry) in table.iter() {
            let bytes = [op, 0x34, 0x12];
            let instr = decode(&bytes, Addr::new(0x0150)).unwrap();
            assert_eq!(instr.length(), entry.length, "{op:#04x}");
            assert_eq!(instr.opcode, op);
        }
    }

    #[test]
    fn unknown_opcode() {
        for op in [0xcbu8, 0xd3, 0xeb, 0xfd] {
            assert_eq!(
                decode(&[op, 0, 0], Addr::NULL).unwrap_err(),
                DecodeError::UnknownOpcode(op)
            );
        }
    }

    #[test]
    fn truncated() {
        // JP a16 needs three bytes.
        assert_eq!(
            decode(&[0xc3, 0x00], Addr::NULL).unwrap_err(),
            DecodeError::TruncatedInstruction
        );
        // LD B,d8 needs two.
        assert_eq!(
            decode(&[0x06], Addr::NULL).unwrap_err(),
            DecodeError::TruncatedInstruction
        );
        assert_eq!(
            decode(&[], Addr::NULL).unwrap_err(),
            DecodeError::TruncatedInstruction
        );
    }

    #[test]
    fn little_endian_word_operand() {
        let instr = decode(&[0xcd, 0x34, 0x12], Addr::new(0x0200)).unwrap();
        assert_eq!(instr.data_word(), Some(0x1234));
        assert_eq!(instr.data_byte(), None);
        assert_eq!(instr.end(), Addr::new(0x0203));
    }

    #[test]
    fn byte_operand() {
        let instr = decode(&[0x06, 0x42, 0xff], Addr::NULL).unwrap();
        assert_eq!(instr.operand1, None); // B is a register
        assert_eq!(instr.operand2, Some(OperandValue::Byte(0x42)));
        assert_eq!(instr.data_byte(), Some(0x42));
    }

    #[test]
    fn register_only_instruction_has_no_values() {
        let instr = decode(&[0x78, 0, 0], Addr::NULL).unwrap(); // LD A,B
        assert_eq!(instr.operand1, None);
        assert_eq!(instr.operand2, None);
        assert_eq!(instr.mnemonic(), "LD");
    }

    #[test]
    fn eq_checks_on_decode_error() {
        let err = decode(&[0xcb], Addr::NULL).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode(0xcb));
    }
}
