//! Token definitions for the Rill language

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token types in the Rill language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    // Literals
    IntegerLiteral(String),
    FloatLiteral(String),
    StringLiteral(String),
    CharLiteral(String),

    // Identifiers
    Identifier(String),

    // Keywords
    KeywordFunction,
    KeywordLet,
    KeywordReturn,
    KeywordConst,
    KeywordStruct,
    KeywordTrue,
    KeywordFalse,
    KeywordAnd,
    KeywordOr,
    KeywordNot,

    // Operators
    Plus,         // +
    Minus,        // -
    Multiply,     // *
    Divide,       // /
    Modulo,       // %
    Assign,       // =
    Equal,        // ==
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    LogicalAnd,   // &&
    LogicalOr,    // ||
    LogicalNot,   // !
    BitwiseAnd,   // &
    BitwiseOr,    // |
    BitwiseXor,   // ^
    BitwiseNot,   // ~
    LeftShift,    // <<
    RightShift,   // >>

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Colon,        // :
    Semicolon,    // ;
    Arrow,        // ->

    EndOfFile,
}

/// A token together with the line it starts on (for diagnostics)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub ty: TokenType,
    pub line: u32,
}

impl Token {
    pub fn new(ty: TokenType, line: u32) -> Self {
        Self { ty, line }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::IntegerLiteral(text) => write!(f, "{}", text),
            TokenType::FloatLiteral(text) => write!(f, "{}", text),
            TokenType::StringLiteral(text) => write!(f, "\"{}\"", text),
            TokenType::CharLiteral(text) => write!(f, "'{}'", text),
            TokenType::Identifier(name) => write!(f, "{}", name),
            TokenType::KeywordFunction => write!(f, "function"),
            TokenType::KeywordLet => write!(f, "let"),
            TokenType::KeywordReturn => write!(f, "return"),
            TokenType::KeywordConst => write!(f, "const"),
            TokenType::KeywordStruct => write!(f, "struct"),
            TokenType::KeywordTrue => write!(f, "true"),
            TokenType::KeywordFalse => write!(f, "false"),
            TokenType::KeywordAnd => write!(f, "and"),
            TokenType::KeywordOr => write!(f, "or"),
            TokenType::KeywordNot => write!(f, "not"),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Multiply => write!(f, "*"),
            TokenType::Divide => write!(f, "/"),
            TokenType::Modulo => write!(f, "%"),
            TokenType::Assign => write!(f, "="),
            TokenType::Equal => write!(f, "=="),
            TokenType::NotEqual => write!(f, "!="),
            TokenType::Less => write!(f, "<"),
            TokenType::LessEqual => write!(f, "<="),
            TokenType::Greater => write!(f, ">"),
            TokenType::GreaterEqual => write!(f, ">="),
            TokenType::LogicalAnd => write!(f, "&&"),
            TokenType::LogicalOr => write!(f, "||"),
            TokenType::LogicalNot => write!(f, "!"),
            TokenType::BitwiseAnd => write!(f, "&"),
            TokenType::BitwiseOr => write!(f, "|"),
            TokenType::BitwiseXor => write!(f, "^"),
            TokenType::BitwiseNot => write!(f, "~"),
            TokenType::LeftShift => write!(f, "<<"),
            TokenType::RightShift => write!(f, ">>"),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Comma => write!(f, ","),
            TokenType::Colon => write!(f, ":"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Arrow => write!(f, "->"),
            TokenType::EndOfFile => write!(f, "<eof>"),
        }
    }
}
