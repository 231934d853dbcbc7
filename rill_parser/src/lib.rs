//! Lexical and syntax analysis for the Rill language
//!
//! The front end of the compiler: turns source text into the tagged-variant
//! AST defined in `rill_ast`. Everything downstream (IR building, bytecode
//! generation, binary emission) consumes that tree through plain matches.

pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::{parse, Parser};
pub use token::{Token, TokenType};
