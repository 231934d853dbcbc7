//! Bytecode instruction definitions and their 32-bit encoding

use crate::registers::Register;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of opcodes the compiler emits
///
/// The numbers are part of the binary format contract with the companion VM.
/// `lw` and `sw` sit in the unused gap between `ori` and `jal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    RType = 0,
    Lui = 1,
    Ori = 5,
    Lw = 8,
    Sw = 9,
    Jal = 20,
    Jr = 21,
    Syscall = 63,
}

impl Opcode {
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Instruction payload, one variant per encoding shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionData {
    R { rd: Register, rs1: Register, rs2: Register, shamt: u8, func: u8 },
    I { rd: Register, rs: Register, imm: u16 },
    /// Jumps. For `jal` the immediate holds an IR function number until the
    /// emitter substitutes the final vm address.
    J { rd: Register, imm: u32 },
    S { rd: Register, rs1: Register, rs2: Register, rs3: Register, func: u8 },
}

/// One fixed-width machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Opcode,
    pub data: InstructionData,
}

impl Instruction {
    pub fn new(op: Opcode, data: InstructionData) -> Self {
        Self { op, data }
    }

    pub fn ori(rd: Register, rs: Register, imm: u16) -> Self {
        Self::new(Opcode::Ori, InstructionData::I { rd, rs, imm })
    }

    pub fn lw(rd: Register, rs: Register, imm: u16) -> Self {
        Self::new(Opcode::Lw, InstructionData::I { rd, rs, imm })
    }

    pub fn sw(rd: Register, rs: Register, imm: u16) -> Self {
        Self::new(Opcode::Sw, InstructionData::I { rd, rs, imm })
    }

    pub fn jal(rd: Register, imm: u32) -> Self {
        Self::new(Opcode::Jal, InstructionData::J { rd, imm })
    }

    pub fn jr(rd: Register) -> Self {
        Self::new(Opcode::Jr, InstructionData::J { rd, imm: 0 })
    }

    pub fn syscall(
        rd: Register,
        rs1: Register,
        rs2: Register,
        rs3: Register,
        func: u8,
    ) -> Self {
        Self::new(Opcode::Syscall, InstructionData::S { rd, rs1, rs2, rs3, func })
    }

    /// Encode into one 32-bit word: the opcode takes the top 6 bits, the
    /// payload fills the rest according to its shape
    pub fn encode(&self) -> u32 {
        let mut word = (self.op.number() as u32) << 26;
        match self.data {
            InstructionData::R { rd, rs1, rs2, shamt, func } => {
                word |= (rd.number() as u32) << 21
                    | (rs1.number() as u32) << 16
                    | (rs2.number() as u32) << 11
                    | (shamt as u32) << 6
                    | func as u32;
            }
            InstructionData::I { rd, rs, imm } => {
                word |= (rd.number() as u32) << 21 | (rs.number() as u32) << 16 | imm as u32;
            }
            InstructionData::J { rd, imm } => {
                // addresses are word aligned, the low two bits are dropped
                word |= (rd.number() as u32) << 21 | ((imm >> 2) & 0x001F_FFFF);
            }
            InstructionData::S { rd, rs1, rs2, rs3, func } => {
                word |= (rd.number() as u32) << 21
                    | (rs1.number() as u32) << 16
                    | (rs2.number() as u32) << 11
                    | (rs3.number() as u32) << 6
                    | func as u32;
            }
        }
        word
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            Opcode::RType => "r",
            Opcode::Lui => "lui",
            Opcode::Ori => "ori",
            Opcode::Lw => "lw",
            Opcode::Sw => "sw",
            Opcode::Jal => "jal",
            Opcode::Jr => "jr",
            Opcode::Syscall => "syscall",
        };
        match self.data {
            InstructionData::R { rd, rs1, rs2, shamt, func } => {
                write!(f, "{} {}, {}, {}, {}, {}", name, rd, rs1, rs2, shamt, func)
            }
            InstructionData::I { rd, rs, imm } => write!(f, "{} {}, {}, {:#x}", name, rd, rs, imm),
            InstructionData::J { rd, imm } => write!(f, "{} {}, {:#x}", name, rd, imm),
            InstructionData::S { rd, rs1, rs2, rs3, func } => {
                write!(f, "{} {}, {}, {}, {}, {}", name, rd, rs1, rs2, rs3, func)
            }
        }
    }
}
