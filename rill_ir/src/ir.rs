//! IR instruction and function definitions

use crate::types::Type;
use rill_ast::{BinaryOp, UnaryOp};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// A named, typed IR value
///
/// Names that are decimal digits or literal text denote constants, names of
/// the form `temp_<N>` denote IR temporaries, and anything else names a
/// parameter or local. Operands order and compare by `name` alone so they
/// can key maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operand {
    pub name: String,
    pub ty: Type,
}

impl Operand {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Operand {}

impl PartialOrd for Operand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Operand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The closed set of IR operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Call,
    Ret,
    Syscall,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BooleanAnd,
    BooleanOr,
    LessEq,
    Less,
    GreaterEq,
    Greater,
    Equal,
    NotEqual,
    BitAnd,
    BitOr,
    BitXor,
    BitLeft,
    BitRight,
    Assign,
    BooleanNot,
    Negation,
    BitNot,
}

impl From<BinaryOp> for Operation {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Operation::Add,
            BinaryOp::Sub => Operation::Sub,
            BinaryOp::Mul => Operation::Mul,
            BinaryOp::Div => Operation::Div,
            BinaryOp::Rem => Operation::Rem,
            BinaryOp::BooleanAnd => Operation::BooleanAnd,
            BinaryOp::BooleanOr => Operation::BooleanOr,
            BinaryOp::LessEq => Operation::LessEq,
            BinaryOp::Less => Operation::Less,
            BinaryOp::GreaterEq => Operation::GreaterEq,
            BinaryOp::Greater => Operation::Greater,
            BinaryOp::Equal => Operation::Equal,
            BinaryOp::NotEqual => Operation::NotEqual,
            BinaryOp::BitAnd => Operation::BitAnd,
            BinaryOp::BitOr => Operation::BitOr,
            BinaryOp::BitXor => Operation::BitXor,
            BinaryOp::BitLeft => Operation::BitLeft,
            BinaryOp::BitRight => Operation::BitRight,
        }
    }
}

impl From<UnaryOp> for Operation {
    fn from(op: UnaryOp) -> Self {
        match op {
            UnaryOp::BooleanNot => Operation::BooleanNot,
            UnaryOp::Negation => Operation::Negation,
            UnaryOp::BitNot => Operation::BitNot,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Call => "call",
            Operation::Ret => "ret",
            Operation::Syscall => "syscall",
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
            Operation::Rem => "rem",
            Operation::BooleanAnd => "boolean_and",
            Operation::BooleanOr => "boolean_or",
            Operation::LessEq => "less_eq",
            Operation::Less => "less",
            Operation::GreaterEq => "greater_eq",
            Operation::Greater => "greater",
            Operation::Equal => "equal",
            Operation::NotEqual => "not_equal",
            Operation::BitAnd => "bit_and",
            Operation::BitOr => "bit_or",
            Operation::BitXor => "bit_xor",
            Operation::BitLeft => "bit_left",
            Operation::BitRight => "bit_right",
            Operation::Assign => "assign",
            Operation::BooleanNot => "boolean_not",
            Operation::Negation => "negation",
            Operation::BitNot => "bit_not",
        };
        write!(f, "{}", name)
    }
}

/// Argument list of an instruction; two operands cover everything but calls
/// and syscalls
pub type Args = SmallVec<[Operand; 2]>;

/// A single three-address instruction
///
/// `result` is absent for side-effect-only operations (call without a used
/// result, ret, syscall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Operation,
    pub args: Args,
    pub result: Option<Operand>,
}

impl Instruction {
    pub fn new(op: Operation, args: Args, result: Option<Operand>) -> Self {
        Self { op, args, result }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "{} = ", result)?;
        }
        write!(f, "{}", self.op)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// An IR function: parameters, return type, stable number, instruction list
#[derive(Debug)]
pub struct Function {
    pub parameters: Vec<Operand>,
    pub return_type: Type,
    /// Dense identifier assigned at registration; stands in for the
    /// function's vm address until binary layout
    pub number: u32,
    pub instructions: Vec<Instruction>,
    builtin: bool,
    func_type: OnceLock<Type>,
}

impl Function {
    pub fn new(parameters: Vec<Operand>, return_type: Type, number: u32) -> Self {
        Self {
            parameters,
            return_type,
            number,
            instructions: Vec::new(),
            builtin: false,
            func_type: OnceLock::new(),
        }
    }

    pub(crate) fn new_builtin(parameters: Vec<Operand>, return_type: Type, number: u32) -> Self {
        Self { builtin: true, ..Self::new(parameters, return_type, number) }
    }

    /// Whether this function was seeded by the compiler rather than
    /// registered from source
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The composite function type, computed on first request
    pub fn func_type(&self) -> &Type {
        self.func_type.get_or_init(|| Type::Function {
            params: self.parameters.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.return_type.clone()),
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        writeln!(f, ") -> {}", self.return_type)?;
        for instruction in &self.instructions {
            writeln!(f, "    {}", instruction)?;
        }
        Ok(())
    }
}
