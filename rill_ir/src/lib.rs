//! Type system and intermediate representation for the Rill compiler
//!
//! The IR is a symbol table of functions, each holding an ordered list of
//! three-address instructions over named operands. It is built by walking
//! the AST once and is consumed by the bytecode stage.

pub mod ir;
pub mod lower;
pub mod module;
pub mod types;

pub use ir::{Function, Instruction, Operand, Operation};
pub use lower::lower;
pub use module::Module;
pub use types::{ast_to_ir_type, Type};
