//! Bytecode generation and binary emission for the Rill compiler
//!
//! Lowers the IR onto a 32-register virtual machine: fixed-width 32-bit
//! instructions, a small data segment for string literals, and a segmented
//! self-describing container the companion VM executes.

pub mod emit;
pub mod instruction;
pub mod module;
pub mod registers;

pub use emit::{emit_bytes, write_binary, MAGIC, SP_START, VM_DATA_START, VM_TEXT_START};
pub use instruction::{Instruction, InstructionData, Opcode};
pub use module::{Function, Module};
pub use registers::Register;
