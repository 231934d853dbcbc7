//! Recursive-descent parser for the Rill language

use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use rill_ast::{
    AstType, BinaryOp, Block, Call, Expr, Function, Global, Item, Let, Literal, Program, Stmt,
    StructDef, TypedId, UnaryOp,
};
use rill_common::{CompileError, CompileResult};

/// Lex and parse a whole source module
pub fn parse(source: &str) -> CompileResult<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Recursive-descent parser over the token stream
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    /// Parse the whole token stream into a program
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let mut items = Vec::new();
        while !self.check(&TokenType::EndOfFile) {
            items.push(self.parse_item()?);
        }
        Ok(Program { items })
    }

    fn parse_item(&mut self) -> CompileResult<Item> {
        match &self.current().ty {
            TokenType::KeywordFunction => self.parse_function().map(Item::Function),
            TokenType::KeywordConst => self.parse_global().map(Item::Global),
            TokenType::KeywordStruct => self.parse_struct().map(Item::Struct),
            other => Err(self.unexpected("a top-level item", other.clone())),
        }
    }

    fn parse_function(&mut self) -> CompileResult<Function> {
        self.expect(TokenType::KeywordFunction)?;
        let name = self.expect_identifier("a function name")?;
        self.expect(TokenType::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                params.push(self.parse_typed_id()?);
                if !self.matches(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RightParen)?;
        let return_type = if self.matches(&TokenType::Arrow) {
            Some(self.expect_identifier("a return type")?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Function { name, params, return_type, body })
    }

    fn parse_global(&mut self) -> CompileResult<Global> {
        self.expect(TokenType::KeywordConst)?;
        let name = self.expect_identifier("a constant name")?;
        let ty = if self.matches(&TokenType::Colon) {
            Some(self.expect_identifier("a type name")?)
        } else {
            None
        };
        self.expect(TokenType::Assign)?;
        let value = self.parse_expr()?;
        self.expect(TokenType::Semicolon)?;
        Ok(Global { name, ty, value, constant: true })
    }

    fn parse_struct(&mut self) -> CompileResult<StructDef> {
        self.expect(TokenType::KeywordStruct)?;
        let name = self.expect_identifier("a struct name")?;
        self.expect(TokenType::LeftBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokenType::RightBrace) {
            fields.push(self.parse_typed_id()?);
            if !self.matches(&TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RightBrace)?;
        Ok(StructDef { name, fields })
    }

    fn parse_typed_id(&mut self) -> CompileResult<TypedId> {
        let id = self.expect_identifier("a name")?;
        self.expect(TokenType::Colon)?;
        let ty = self.expect_identifier("a type name")?;
        Ok(TypedId { id, ty })
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        self.expect(TokenType::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenType::RightBrace) {
            statements.push(self.parse_stmt()?);
        }
        self.expect(TokenType::RightBrace)?;
        Ok(Block { statements })
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        match &self.current().ty {
            TokenType::LeftBrace => self.parse_block().map(Stmt::Block),
            TokenType::KeywordLet => {
                self.advance();
                let name = self.expect_identifier("a variable name")?;
                let ty = if self.matches(&TokenType::Colon) {
                    Some(self.expect_identifier("a type name")?)
                } else {
                    None
                };
                self.expect(TokenType::Assign)?;
                let value = self.parse_expr()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Let(Let { name, ty, value }))
            }
            TokenType::KeywordReturn => {
                self.advance();
                let value = if self.check(&TokenType::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Return(value))
            }
            TokenType::Identifier(_) => {
                let callee = self.expect_identifier("a function name")?;
                let call = self.parse_call_args(callee)?;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Call(call))
            }
            other => Err(self.unexpected("a statement", other.clone())),
        }
    }

    fn parse_call_args(&mut self, callee: String) -> CompileResult<Call> {
        self.expect(TokenType::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(&TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RightParen)?;
        Ok(Call { callee, args })
    }

    // Expression parsing, lowest precedence first

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_level: u8) -> CompileResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, level)) = binary_op(&self.current().ty) {
            if level < min_level {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(level + 1)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let op = match &self.current().ty {
            TokenType::KeywordNot | TokenType::LogicalNot => Some(UnaryOp::BooleanNot),
            TokenType::Minus => Some(UnaryOp::Negation),
            TokenType::BitwiseNot => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let token = self.current().clone();
        match token.ty {
            TokenType::IntegerLiteral(text) => {
                self.advance();
                Ok(Expr::Literal(Literal { text, kind: AstType::Integer }))
            }
            TokenType::FloatLiteral(text) => {
                self.advance();
                Ok(Expr::Literal(Literal { text, kind: AstType::Floating }))
            }
            TokenType::StringLiteral(text) => {
                self.advance();
                Ok(Expr::Literal(Literal { text, kind: AstType::String }))
            }
            TokenType::CharLiteral(text) => {
                self.advance();
                Ok(Expr::Literal(Literal { text, kind: AstType::Character }))
            }
            TokenType::KeywordTrue => {
                self.advance();
                Ok(Expr::Literal(Literal { text: "true".to_string(), kind: AstType::Boolean }))
            }
            TokenType::KeywordFalse => {
                self.advance();
                Ok(Expr::Literal(Literal { text: "false".to_string(), kind: AstType::Boolean }))
            }
            TokenType::Identifier(name) => {
                self.advance();
                if self.check(&TokenType::LeftParen) {
                    let call = self.parse_call_args(name)?;
                    Ok(Expr::Call(call))
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenType::RightParen)?;
                Ok(expr)
            }
            other => Err(self.unexpected("an expression", other)),
        }
    }

    // Token stream helpers

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn check(&self, ty: &TokenType) -> bool {
        &self.current().ty == ty
    }

    fn matches(&mut self, ty: &TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ty: TokenType) -> CompileResult<()> {
        if self.check(&ty) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", ty), self.current().ty.clone()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> CompileResult<String> {
        match self.current().ty.clone() {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.unexpected(what, other)),
        }
    }

    fn unexpected(&self, expected: &str, found: TokenType) -> CompileError {
        CompileError::syntax(format!(
            "expected {} but found '{}' on line {}",
            expected,
            found,
            self.current().line
        ))
    }
}

/// Binary operator for a token, with its precedence level
///
/// Higher levels bind tighter; the levels follow C: or < and < bit-or <
/// bit-xor < bit-and < equality < relational < shifts < additive <
/// multiplicative.
fn binary_op(ty: &TokenType) -> Option<(BinaryOp, u8)> {
    let entry = match ty {
        TokenType::KeywordOr | TokenType::LogicalOr => (BinaryOp::BooleanOr, 0),
        TokenType::KeywordAnd | TokenType::LogicalAnd => (BinaryOp::BooleanAnd, 1),
        TokenType::BitwiseOr => (BinaryOp::BitOr, 2),
        TokenType::BitwiseXor => (BinaryOp::BitXor, 3),
        TokenType::BitwiseAnd => (BinaryOp::BitAnd, 4),
        TokenType::Equal => (BinaryOp::Equal, 5),
        TokenType::NotEqual => (BinaryOp::NotEqual, 5),
        TokenType::Less => (BinaryOp::Less, 6),
        TokenType::LessEqual => (BinaryOp::LessEq, 6),
        TokenType::Greater => (BinaryOp::Greater, 6),
        TokenType::GreaterEqual => (BinaryOp::GreaterEq, 6),
        TokenType::LeftShift => (BinaryOp::BitLeft, 7),
        TokenType::RightShift => (BinaryOp::BitRight, 7),
        TokenType::Plus => (BinaryOp::Add, 8),
        TokenType::Minus => (BinaryOp::Sub, 8),
        TokenType::Multiply => (BinaryOp::Mul, 9),
        TokenType::Divide => (BinaryOp::Div, 9),
        TokenType::Modulo => (BinaryOp::Rem, 9),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello_world() {
        let program = parse(r#"function main() { print("hi"); }"#).unwrap();
        assert_eq!(program.items.len(), 1);
        let Item::Function(func) = &program.items[0] else {
            panic!("expected a function");
        };
        assert_eq!(func.name, "main");
        assert!(func.params.is_empty());
        assert!(func.return_type.is_none());
        assert_eq!(func.body.statements.len(), 1);
        let Stmt::Call(call) = &func.body.statements[0] else {
            panic!("expected a call statement");
        };
        assert_eq!(call.callee, "print");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn test_parse_params_and_return_type() {
        let program =
            parse("function add(a: integer, b: integer) -> integer { return a + b; }").unwrap();
        let Item::Function(func) = &program.items[0] else {
            panic!("expected a function");
        };
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].id, "a");
        assert_eq!(func.params[0].ty, "integer");
        assert_eq!(func.return_type.as_deref(), Some("integer"));
    }

    #[test]
    fn test_precedence_mul_binds_tighter_than_add() {
        let program = parse("function f() { let x = 1 + 2 * 3; }").unwrap();
        let Item::Function(func) = &program.items[0] else {
            panic!("expected a function");
        };
        let Stmt::Let(let_stmt) = &func.body.statements[0] else {
            panic!("expected a let");
        };
        let Expr::Binary { op: BinaryOp::Add, rhs, .. } = &let_stmt.value else {
            panic!("expected + at the top");
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_word_and_symbol_logic_operators_agree() {
        let by_word = parse("function f() { let x = a and b or not c; }").unwrap();
        let by_symbol = parse("function f() { let x = a && b || !c; }").unwrap();
        assert_eq!(format!("{:?}", by_word), format!("{:?}", by_symbol));
    }

    #[test]
    fn test_parse_const_and_struct() {
        let program = parse(
            "const greeting: string = \"hello\";\nstruct pair { first: integer, second: integer }",
        )
        .unwrap();
        assert!(matches!(program.items[0], Item::Global(_)));
        let Item::Struct(def) = &program.items[1] else {
            panic!("expected a struct");
        };
        assert_eq!(def.fields.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_is_a_syntax_error() {
        assert!(parse("function f() { print(\"hi\") }").is_err());
    }

    #[test]
    fn test_nested_call_expression() {
        let program = parse("function f() { let x = g(h(1), 2); }").unwrap();
        let Item::Function(func) = &program.items[0] else {
            panic!("expected a function");
        };
        let Stmt::Let(let_stmt) = &func.body.statements[0] else {
            panic!("expected a let");
        };
        let Expr::Call(call) = &let_stmt.value else {
            panic!("expected a call expression");
        };
        assert_eq!(call.callee, "g");
        assert!(matches!(call.args[0], Expr::Call(_)));
    }
}
