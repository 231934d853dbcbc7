//! AST node definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete Rill source module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level items in a Rill program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Function(Function),
    Global(Global),
    Struct(StructDef),
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<TypedId>,
    /// Textual return type; absent means unit
    pub return_type: Option<String>,
    pub body: Block,
}

/// An identifier together with its textual type annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedId {
    pub id: String,
    pub ty: String,
}

/// Module-level constant or variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub ty: Option<String>,
    pub value: Expr,
    pub constant: bool,
}

/// Struct definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<TypedId>,
}

/// Block of statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Block(Block),
    Let(Let),
    Return(Option<Expr>),
    Call(Call),
}

/// Variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Let {
    pub name: String,
    pub ty: Option<String>,
    pub value: Expr,
}

/// Function call; a statement when the result is discarded, an expression
/// when it feeds another computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub callee: String,
    pub args: Vec<Expr>,
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Call(Call),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
}

/// Literal value, kept as source text plus its primitive kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Literal {
    pub text: String,
    pub kind: AstType,
}

/// The primitive kinds a literal can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AstType {
    String,
    Integer,
    Floating,
    Character,
    Boolean,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add, Sub, Mul, Div, Rem,
    // Logical
    BooleanAnd, BooleanOr,
    // Comparison
    LessEq, Less, GreaterEq, Greater, Equal, NotEqual,
    // Bitwise
    BitAnd, BitOr, BitXor, BitLeft, BitRight,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    BooleanNot,
    Negation,
    BitNot,
}

impl fmt::Display for AstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AstType::String => "string",
            AstType::Integer => "integer",
            AstType::Floating => "floating",
            AstType::Character => "character",
            AstType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BooleanAnd => "and",
            BinaryOp::BooleanOr => "or",
            BinaryOp::LessEq => "<=",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Greater => ">",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitLeft => "<<",
            BinaryOp::BitRight => ">>",
        };
        write!(f, "{}", op)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            UnaryOp::BooleanNot => "not",
            UnaryOp::Negation => "-",
            UnaryOp::BitNot => "~",
        };
        write!(f, "{}", op)
    }
}
