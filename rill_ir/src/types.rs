//! Type definitions for the Rill type system

use rill_common::{CompileError, CompileResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The semantic types of the Rill language
///
/// The six primitives are unit variants, so the canonical instance of a
/// primitive is the variant itself and comparison is plain tag equality.
/// Function types compare structurally over their components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    String,
    Integer,
    Floating,
    Character,
    Boolean,
    Unit,
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    /// Whether this is a composite (non-primitive) type
    pub fn composite(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// The IR type of a literal of the given AST kind
    ///
    /// Floating literals are rejected: the back end generates no
    /// floating-point code.
    pub fn for_literal(kind: rill_ast::AstType) -> CompileResult<Type> {
        match kind {
            rill_ast::AstType::String => Ok(Type::String),
            rill_ast::AstType::Integer => Ok(Type::Integer),
            rill_ast::AstType::Character => Ok(Type::Character),
            rill_ast::AstType::Boolean => Ok(Type::Boolean),
            rill_ast::AstType::Floating => {
                Err(CompileError::UnsupportedLiteralKind { kind: kind.to_string() })
            }
        }
    }
}

/// Convert a textual AST type annotation to its IR type
pub fn ast_to_ir_type(name: &str) -> CompileResult<Type> {
    match name {
        "string" => Ok(Type::String),
        "integer" => Ok(Type::Integer),
        "floating" => Ok(Type::Floating),
        "character" => Ok(Type::Character),
        "boolean" => Ok(Type::Boolean),
        "unit" => Ok(Type::Unit),
        other => Err(CompileError::unknown_type(other)),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => write!(f, "string"),
            Type::Integer => write!(f, "integer"),
            Type::Floating => write!(f, "floating"),
            Type::Character => write!(f, "character"),
            Type::Boolean => write!(f, "boolean"),
            Type::Unit => write!(f, "unit"),
            Type::Function { params, ret } => {
                write!(f, "function(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_primitives_are_identical() {
        assert_eq!(ast_to_ir_type("integer").unwrap(), Type::Integer);
        assert_eq!(ast_to_ir_type("integer").unwrap(), ast_to_ir_type("integer").unwrap());
        assert_ne!(Type::Integer, Type::Boolean);
    }

    #[test]
    fn test_function_types_compare_structurally() {
        let a = Type::Function { params: vec![Type::String], ret: Box::new(Type::Unit) };
        let b = Type::Function { params: vec![Type::String], ret: Box::new(Type::Unit) };
        let c = Type::Function { params: vec![Type::Integer], ret: Box::new(Type::Unit) };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unknown_type_name_is_fatal() {
        assert!(ast_to_ir_type("quaternion").is_err());
    }

    #[test]
    fn test_floating_literals_are_rejected() {
        assert!(Type::for_literal(rill_ast::AstType::Floating).is_err());
        assert_eq!(Type::for_literal(rill_ast::AstType::Boolean).unwrap(), Type::Boolean);
    }

    #[test]
    fn test_display() {
        let ty = Type::Function {
            params: vec![Type::Integer, Type::String],
            ret: Box::new(Type::Boolean),
        };
        assert_eq!(ty.to_string(), "function(integer, string) -> boolean");
    }
}
