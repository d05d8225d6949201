//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure, including the error type, helper methods, and the main
//! parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following
//! organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: class and interface members
//! - `statements`: statements (if, while, for, try, etc.)
//! - `expressions`: expressions with precedence climbing
//!
//! Parser methods are split across multiple files using `impl Parser`
//! blocks, allowing each module to extend the Parser with related
//! functionality while maintaining access to the shared parser state.
//!
//! # Top-level handling
//!
//! `package` and `import` declarations are consumed and discarded;
//! annotations (`@Name(...)`) are consumed and discarded at every position;
//! `enum` declarations are brace-matched and discarded.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the Java subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire compilation unit (top-level declarations)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            // package/import lines carry no semantics here
            if self.match_token(&Token::Package(self.current_location()))
                || self.match_token(&Token::Import(self.current_location()))
            {
                self.skip_to_semicolon();
                continue;
            }

            self.skip_annotations()?;
            if self.is_at_end() {
                break;
            }

            // Stray semicolons between declarations
            if self.match_token(&Token::Semicolon(self.current_location())) {
                continue;
            }

            // Enum declarations are brace-matched and discarded, so this
            // may produce nothing
            if let Some(decl) = self.parse_type_declaration()? {
                program.declarations.push(decl);
            }
        }

        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if std::mem::discriminant(&self.peek_token()) == std::mem::discriminant(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.peek_token()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_token(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.tokens[self.position].clone()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position - 1]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek()),
                location: self.current_location(),
            })
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            &format!("Expected '(' {ctx}"),
        )
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        )
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LBrace(self.current_location()),
            &format!("Expected '{{' {ctx}"),
        )
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBrace(self.current_location()),
            &format!("Expected '}}' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        )
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(ParseError {
                message: format!("Expected identifier, found {}", self.peek()),
                location: self.current_location(),
            })
        }
    }

    /// Consume tokens up to and including the next semicolon
    pub(crate) fn skip_to_semicolon(&mut self) {
        while !self.is_at_end() {
            if matches!(self.advance(), Token::Semicolon(_)) {
                break;
            }
        }
    }

    /// Consume annotations (`@Name`, `@Name(...)`) at the current position
    pub(crate) fn skip_annotations(&mut self) -> Result<(), ParseError> {
        while self.match_token(&Token::At(self.current_location())) {
            self.expect_identifier()?;
            // Qualified annotation names
            while self.match_token(&Token::Dot(self.current_location())) {
                self.expect_identifier()?;
            }
            if self.check(&Token::LParen(self.current_location())) {
                self.skip_balanced(
                    &Token::LParen(self.current_location()),
                    &Token::RParen(self.current_location()),
                )?;
            }
        }
        Ok(())
    }

    /// Consume a balanced open/close token pair, including nesting
    pub(crate) fn skip_balanced(&mut self, open: &Token, close: &Token) -> Result<(), ParseError> {
        self.expect_token(open, "Expected opening delimiter")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_at_end() {
                return Err(ParseError {
                    message: "Unbalanced delimiters".to_string(),
                    location: self.current_location(),
                });
            }
            if self.check(open) {
                depth += 1;
            } else if self.check(close) {
                depth -= 1;
            }
            self.advance();
        }
        Ok(())
    }

    /// Whether the token at `offset` can start a type name
    pub(crate) fn is_type_token_at(&self, offset: usize) -> bool {
        match self.peek_ahead(offset) {
            Some(t) => t.is_primitive_type() || matches!(t, Token::Ident(_, _)),
            None => false,
        }
    }

    /// Parse a type: primitive or class name, optional generic arguments
    /// (kept only for the display name), optional array dimensions
    pub(crate) fn parse_type(&mut self) -> Result<TypeNode, ParseError> {
        let mut node = if let Some(name) = self.peek_token().primitive_name() {
            self.advance();
            TypeNode::new(name)
        } else if self.match_token(&Token::Question(self.current_location())) {
            // Wildcard; bounds are consumed and folded into nothing
            if self.match_token(&Token::Extends(self.current_location()))
                || self.match_token(&Token::Super(self.current_location()))
            {
                self.parse_type()?;
            }
            TypeNode::new("?")
        } else {
            let mut name = self.expect_identifier()?;
            // Qualified names collapse to their last segment
            while self.check(&Token::Dot(self.current_location()))
                && matches!(self.peek_ahead(1), Some(Token::Ident(_, _)))
            {
                self.advance();
                name = self.expect_identifier()?;
            }
            TypeNode::new(&name)
        };

        if self.check(&Token::Lt(self.current_location())) && self.generic_args_ahead() {
            self.advance(); // consume '<'
            if !self.check(&Token::Gt(self.current_location())) {
                loop {
                    node.type_args.push(self.parse_type()?);
                    if !self.match_token(&Token::Comma(self.current_location())) {
                        break;
                    }
                }
            }
            self.expect_token(
                &Token::Gt(self.current_location()),
                "Expected '>' after generic arguments",
            )?;
        }

        while self.check(&Token::LBracket(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::RBracket(_)))
        {
            self.advance();
            self.advance();
            node.array_dims += 1;
        }

        Ok(node)
    }

    /// Lookahead check that a `<` at the current position opens a generic
    /// argument list rather than a comparison: scan for a matching `>`
    /// crossing only type-ish tokens
    pub(crate) fn generic_args_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0usize;
        while let Some(token) = self.peek_ahead(offset) {
            match token {
                Token::Lt(_) => depth += 1,
                Token::Gt(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                Token::Ident(_, _)
                | Token::Comma(_)
                | Token::Question(_)
                | Token::Extends(_)
                | Token::Super(_)
                | Token::Dot(_)
                | Token::LBracket(_)
                | Token::RBracket(_) => {}
                t if t.is_primitive_type() => {}
                _ => return false,
            }
            offset += 1;
            if offset > 64 {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_class() {
        let source = "public class Main { public static void main(String[] args) { } }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();

        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Declaration::Class(c) => {
                assert_eq!(c.name, "Main");
                assert_eq!(c.methods.len(), 1);
                assert_eq!(c.methods[0].name, "main");
                assert!(c.methods[0].is_static);
            }
            _ => panic!("Expected class declaration"),
        }
    }

    #[test]
    fn test_package_import_discarded() {
        let source = "package com.example; import java.util.List; class A { }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.declarations[0].name(), "A");
    }

    #[test]
    fn test_annotations_discarded() {
        let source = "@SuppressWarnings(\"unchecked\") class A { @Override public void m() { } }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        match &program.declarations[0] {
            Declaration::Class(c) => assert_eq!(c.methods.len(), 1),
            _ => panic!("Expected class"),
        }
    }

    #[test]
    fn test_enum_discarded() {
        let source = "enum Color { RED, GREEN } class A { }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.declarations[0].name(), "A");
    }

    #[test]
    fn test_generic_type_display() {
        let source = "class A { Map<String, List<Integer>> table; }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        match &program.declarations[0] {
            Declaration::Class(c) => {
                assert_eq!(c.fields[0].field_type.display_name(), "Map<String, List<Integer>>");
            }
            _ => panic!("Expected class"),
        }
    }

    #[test]
    fn test_parse_error_reports_location() {
        let source = "class A {\n  int x = ;\n}";
        let mut parser = Parser::new(source).unwrap();
        let err = parser.parse_program().unwrap_err();
        assert_eq!(err.location.line, 2);
    }
}
