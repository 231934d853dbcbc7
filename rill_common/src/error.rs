//! Error handling utilities for the Rill compiler

use thiserror::Error;

/// The main error type for the Rill compiler
///
/// None of these are recoverable inside the pipeline: each one propagates to
/// the driver, which prints a single diagnostic line and exits with the code
/// from [`CompileError::exit_code`].
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Syntax error: {message}")]
    Syntax { message: String },

    #[error("Unknown symbol: {name}")]
    UnknownSymbol { name: String },

    #[error("Duplicate symbol: {name}")]
    DuplicateSymbol { name: String },

    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    #[error("Unsupported literal kind: {kind}")]
    UnsupportedLiteralKind { kind: String },

    #[error("Type mismatch: {lhs} vs {rhs}")]
    TypeMismatch { lhs: String, rhs: String },

    #[error("Too many parameters on {function}: {count} (at most 6 fit in a0..a5)")]
    TooManyParameters { function: String, count: usize },

    #[error("Too many arguments to {callee}: {count} (at most 6 fit in a0..a5)")]
    TooManyArguments { callee: String, count: usize },

    #[error("Cannot make bytecode for operand {operand} of type {ty}")]
    UnsupportedOperandType { operand: String, ty: String },

    #[error("Cannot compile IR op {op} to bytecode")]
    UnsupportedIrOp { op: String },

    #[error("Immediate {value:#x} does not fit in 16 bits")]
    ImmediateOverflow { value: u32 },

    #[error("No free saved register (all of s0..s19 are live)")]
    RegisterPressureExceeded,

    #[error("No main function to start execution from")]
    MissingMain,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Rill compiler operations
pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax { message: message.into() }
    }

    pub fn unknown_symbol(name: impl Into<String>) -> Self {
        Self::UnknownSymbol { name: name.into() }
    }

    pub fn duplicate_symbol(name: impl Into<String>) -> Self {
        Self::DuplicateSymbol { name: name.into() }
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// The process exit code the driver reports for this error
    ///
    /// 2/3/4/5 are the semantic failure codes, 10 is reserved for I/O
    /// failures while writing the binary. Input-open failures exit 1 and are
    /// handled by the driver before the pipeline starts.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Syntax { .. }
            | CompileError::TypeMismatch { .. }
            | CompileError::TooManyParameters { .. }
            | CompileError::TooManyArguments { .. } => 2,
            CompileError::UnknownSymbol { .. }
            | CompileError::DuplicateSymbol { .. }
            | CompileError::UnknownType { .. }
            | CompileError::UnsupportedLiteralKind { .. } => 3,
            CompileError::MissingMain => 4,
            CompileError::UnsupportedOperandType { .. }
            | CompileError::UnsupportedIrOp { .. }
            | CompileError::ImmediateOverflow { .. }
            | CompileError::RegisterPressureExceeded => 5,
            CompileError::Io(_) => 10,
        }
    }
}
