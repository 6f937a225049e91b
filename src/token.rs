use crate::{
    decode::{Instruction, OperandValue},
    opcode::{Operand, OperandKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Instruction,
    OperandSeparator,
    Integer,
    PossibleAddress,
    Register,
}

/// One display unit. Consumed immediately by the caller's renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: Option<u16>,
}

impl Token {
    fn text(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            value: None,
        }
    }

    fn num(kind: TokenKind, text: String, value: u16) -> Self {
        Self {
            kind,
            text,
            value: Some(value),
        }
    }
}

/// Render `instr` as an ordered token sequence: lower-cased mnemonic, then
/// for each operand a separator (four spaces before the first, comma-space
/// before the second) followed by the operand token.
pub fn render(instr: &Instruction) -> Vec<Token> {
    let entry = instr.entry;
    let mut tokens = vec![Token::text(
        TokenKind::Instruction,
        entry.mnemonic.to_lowercase(),
    )];
    if let Some(operand) = &entry.operand1 {
        tokens.push(Token::text(TokenKind::OperandSeparator, "    "));
        tokens.push(operand_token(operand, instr.operand1));
        if let Some(operand) = &entry.operand2 {
            tokens.push(Token::text(TokenKind::OperandSeparator, ", "));
            tokens.push(operand_token(operand, instr.operand2));
        }
    }
    tokens
}

fn operand_token(operand: &Operand, value: Option<OperandValue>) -> Token {
    // Data kinds always have a resolved value; `decode` fills them from the
    // byte stream for every non-register operand.
    let value = value.map(OperandValue::widen).unwrap_or_default();
    match operand.kind {
        OperandKind::Imm8 => Token::num(TokenKind::Integer, format!("0x{value:02x}"), value),
        OperandKind::Imm16 => Token::num(TokenKind::Integer, format!("0x{value:04x}"), value),
        // Dereferenced forms are rendered wide even for one-byte data, as
        // the value names a bus location.
        OperandKind::Addr8 | OperandKind::Addr16 => {
            Token::num(TokenKind::PossibleAddress, format!("0x{value:04x}"), value)
        }
        OperandKind::Reg => Token::text(TokenKind::Register, operand.text.to_lowercase()),
    }
}
