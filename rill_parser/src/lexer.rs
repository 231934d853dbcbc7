//! Lexer implementation for the Rill language

use crate::token::{Token, TokenType};
use rill_common::{CompileError, CompileResult};

/// Hand-written scanner over the raw source text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
}

impl Lexer {
    /// Create a new lexer instance
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), position: 0, line: 1 }
    }

    /// Tokenize the entire input into a vector of tokens
    pub fn tokenize(&mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            let line = self.line;
            let ty = self.next_token_type()?;
            tokens.push(Token::new(ty, line));
        }

        tokens.push(Token::new(TokenType::EndOfFile, self.line));
        Ok(tokens)
    }

    fn next_token_type(&mut self) -> CompileResult<TokenType> {
        let c = self.current_char();
        let ty = match c {
            '(' => { self.advance(); TokenType::LeftParen }
            ')' => { self.advance(); TokenType::RightParen }
            '{' => { self.advance(); TokenType::LeftBrace }
            '}' => { self.advance(); TokenType::RightBrace }
            ',' => { self.advance(); TokenType::Comma }
            ':' => { self.advance(); TokenType::Colon }
            ';' => { self.advance(); TokenType::Semicolon }
            '+' => { self.advance(); TokenType::Plus }
            '*' => { self.advance(); TokenType::Multiply }
            '/' => { self.advance(); TokenType::Divide }
            '%' => { self.advance(); TokenType::Modulo }
            '^' => { self.advance(); TokenType::BitwiseXor }
            '~' => { self.advance(); TokenType::BitwiseNot }
            '-' => {
                self.advance();
                if self.matches('>') { TokenType::Arrow } else { TokenType::Minus }
            }
            '=' => {
                self.advance();
                if self.matches('=') { TokenType::Equal } else { TokenType::Assign }
            }
            '!' => {
                self.advance();
                if self.matches('=') { TokenType::NotEqual } else { TokenType::LogicalNot }
            }
            '<' => {
                self.advance();
                if self.matches('=') {
                    TokenType::LessEqual
                } else if self.matches('<') {
                    TokenType::LeftShift
                } else {
                    TokenType::Less
                }
            }
            '>' => {
                self.advance();
                if self.matches('=') {
                    TokenType::GreaterEqual
                } else if self.matches('>') {
                    TokenType::RightShift
                } else {
                    TokenType::Greater
                }
            }
            '&' => {
                self.advance();
                if self.matches('&') { TokenType::LogicalAnd } else { TokenType::BitwiseAnd }
            }
            '|' => {
                self.advance();
                if self.matches('|') { TokenType::LogicalOr } else { TokenType::BitwiseOr }
            }
            '"' => self.scan_string_literal()?,
            '\'' => self.scan_char_literal()?,
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),
            c => {
                return Err(CompileError::syntax(format!(
                    "unexpected character '{}' on line {}",
                    c, self.line
                )));
            }
        };
        Ok(ty)
    }

    fn scan_string_literal(&mut self) -> CompileResult<TokenType> {
        let open_line = self.line;
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            if self.is_at_end() {
                return Err(CompileError::syntax(format!(
                    "unterminated string literal on line {}",
                    open_line
                )));
            }
            match self.current_char() {
                '"' => {
                    self.advance();
                    break;
                }
                '\\' => {
                    self.advance();
                    text.push(self.scan_escape(open_line)?);
                }
                '\n' => {
                    return Err(CompileError::syntax(format!(
                        "unterminated string literal on line {}",
                        open_line
                    )));
                }
                c => {
                    self.advance();
                    text.push(c);
                }
            }
        }
        Ok(TokenType::StringLiteral(text))
    }

    fn scan_char_literal(&mut self) -> CompileResult<TokenType> {
        let open_line = self.line;
        self.advance(); // opening quote
        if self.is_at_end() {
            return Err(CompileError::syntax(format!(
                "unterminated character literal on line {}",
                open_line
            )));
        }
        let c = match self.current_char() {
            '\\' => {
                self.advance();
                self.scan_escape(open_line)?
            }
            c => {
                self.advance();
                c
            }
        };
        if !self.matches('\'') {
            return Err(CompileError::syntax(format!(
                "unterminated character literal on line {}",
                open_line
            )));
        }
        Ok(TokenType::CharLiteral(c.to_string()))
    }

    fn scan_escape(&mut self, line: u32) -> CompileResult<char> {
        if self.is_at_end() {
            return Err(CompileError::syntax(format!("dangling escape on line {}", line)));
        }
        let c = self.current_char();
        self.advance();
        match c {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            '0' => Ok('\0'),
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            '\'' => Ok('\''),
            c => Err(CompileError::syntax(format!("unknown escape '\\{}' on line {}", c, line))),
        }
    }

    fn scan_number(&mut self) -> TokenType {
        let start = self.position;
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            self.advance();
        }
        // A dot followed by a digit continues into a floating literal
        if !self.is_at_end()
            && self.current_char() == '.'
            && self.peek_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while !self.is_at_end() && self.current_char().is_ascii_digit() {
                self.advance();
            }
            let text = self.slice_from(start);
            return TokenType::FloatLiteral(text);
        }
        TokenType::IntegerLiteral(self.slice_from(start))
    }

    fn scan_identifier_or_keyword(&mut self) -> TokenType {
        let start = self.position;
        while !self.is_at_end()
            && (self.current_char().is_ascii_alphanumeric() || self.current_char() == '_')
        {
            self.advance();
        }
        let text = self.slice_from(start);
        match text.as_str() {
            "function" => TokenType::KeywordFunction,
            "let" => TokenType::KeywordLet,
            "return" => TokenType::KeywordReturn,
            "const" => TokenType::KeywordConst,
            "struct" => TokenType::KeywordStruct,
            "true" => TokenType::KeywordTrue,
            "false" => TokenType::KeywordFalse,
            "and" => TokenType::KeywordAnd,
            "or" => TokenType::KeywordOr,
            "not" => TokenType::KeywordNot,
            _ => TokenType::Identifier(text),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.current_char() {
                ' ' | '\t' | '\r' => self.advance(),
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                '#' => {
                    while !self.is_at_end() && self.current_char() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn slice_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn matches(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.current_char() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Vec<TokenType> {
        let mut tokens = Lexer::new(source).tokenize().expect("lexing failed");
        tokens.pop(); // drop EOF
        tokens.into_iter().map(|t| t.ty).collect()
    }

    #[test]
    fn test_hello_world_tokens() {
        let tokens = lex(r#"function main() { print("hi"); }"#);
        assert_eq!(
            tokens,
            vec![
                TokenType::KeywordFunction,
                TokenType::Identifier("main".to_string()),
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::Identifier("print".to_string()),
                TokenType::LeftParen,
                TokenType::StringLiteral("hi".to_string()),
                TokenType::RightParen,
                TokenType::Semicolon,
                TokenType::RightBrace,
            ]
        );
    }

    #[test]
    fn test_operators_and_shifts() {
        let tokens = lex("a << 2 >= b >> 1 != c");
        assert_eq!(
            tokens,
            vec![
                TokenType::Identifier("a".to_string()),
                TokenType::LeftShift,
                TokenType::IntegerLiteral("2".to_string()),
                TokenType::GreaterEqual,
                TokenType::Identifier("b".to_string()),
                TokenType::RightShift,
                TokenType::IntegerLiteral("1".to_string()),
                TokenType::NotEqual,
                TokenType::Identifier("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_word_operators_are_keywords() {
        let tokens = lex("a and not b or c");
        assert_eq!(
            tokens,
            vec![
                TokenType::Identifier("a".to_string()),
                TokenType::KeywordAnd,
                TokenType::KeywordNot,
                TokenType::Identifier("b".to_string()),
                TokenType::KeywordOr,
                TokenType::Identifier("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_float_literal_keeps_text() {
        let tokens = lex("let x = 3.25;");
        assert!(tokens.contains(&TokenType::FloatLiteral("3.25".to_string())));
    }

    #[test]
    fn test_comments_and_lines() {
        let mut tokens = Lexer::new("# comment\nlet x = 1;").tokenize().unwrap();
        tokens.pop();
        assert_eq!(tokens[0].ty, TokenType::KeywordLet);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex(r#""a\n\"b\"""#);
        assert_eq!(tokens, vec![TokenType::StringLiteral("a\n\"b\"".to_string())]);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(Lexer::new("\"oops").tokenize().is_err());
    }
}
