use crate::{addr::Addr, decode::Instruction, opcode::Family};

/// A control-flow transfer inferred from one decoded instruction.
/// `TrueBranch`/`FalseBranch` always appear as a pair: taken vs fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchEdge {
    Unconditional(Addr),
    TrueBranch(Addr),
    FalseBranch(Addr),
    Call(Addr),
    Return,
    /// Register-indirect transfer with no statically known target.
    IndirectUnresolved,
}

impl BranchEdge {
    pub const fn target(&self) -> Option<Addr> {
        match *self {
            Self::Unconditional(target)
            | Self::TrueBranch(target)
            | Self::FalseBranch(target)
            | Self::Call(target) => Some(target),
            Self::Return | Self::IndirectUnresolved => None,
        }
    }
}

/// Target of a relative jump: the signed displacement applied past the
/// two-byte instruction.
const fn relative_target(pc: Addr, disp: u8) -> Addr {
    pc.add(2).offset(disp as i8)
}

/// Classify `instr` into zero or more branch edges. Total over any decoded
/// instruction; non-branching mnemonics yield an empty list.
pub fn resolve(instr: &Instruction) -> Vec<BranchEdge> {
    use BranchEdge::*;
    match instr.family() {
        Family::Jr => {
            let Some(disp) = instr.data_byte() else {
                return vec![];
            };
            let pc = instr.addr;
            match instr.opcode {
                // Taken edge keeps the historical unsigned forward-only
                // displacement; see DESIGN.md.
                0x28 | 0x38 => vec![
                    TrueBranch(pc.add(2).add(disp as u16)),
                    FalseBranch(pc.add(2)),
                ],
                0x20 | 0x30 => vec![
                    TrueBranch(pc.add(2)),
                    FalseBranch(relative_target(pc, disp)),
                ],
                _ => vec![Unconditional(relative_target(pc, disp))],
            }
        }
        Family::Jp => {
            // JP (HL): no statically known target, never a fabricated one.
            if instr.opcode == 0xe9 {
                return vec![IndirectUnresolved];
            }
            let Some(target) = instr.data_word() else {
                return vec![];
            };
            let target = Addr::new(target);
            match instr.opcode {
                0xca | 0xda => vec![TrueBranch(target), FalseBranch(instr.addr.add(3))],
                0xc2 | 0xd2 => vec![TrueBranch(instr.addr.add(3)), FalseBranch(target)],
                _ => vec![Unconditional(target)],
            }
        }
        Family::Ret => vec![Return],
        Family::Call => match instr.data_word() {
            Some(target) => vec![Call(Addr::new(target))],
            None => vec![],
        },
        Family::Other => vec![],
    }
}
