//! Statement parsing implementation
//!
//! This module handles parsing of all statement forms:
//!
//! - Variable declarations, including `int a = 1, b = 2;` which lowers to a
//!   block of single declarations
//! - Control flow: `if`, `while`, `for` (C-style and enhanced), `switch`
//! - `do/while`, lowered to `{ body; while (cond) body }` at parse time
//! - Jump statements: `return`, `break`, `continue`, `throw`
//! - `try`/`catch`/`finally` (catch bodies are stored, not executed)
//! - `synchronized (expr) { ... }` with the lock expression discarded
//!
//! All parsing methods are implemented as `pub(crate)` methods on the
//! [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a single statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.skip_annotations()?;
        let loc = self.current_location();

        if self.match_token(&Token::LBrace(loc)) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            return Ok(Stmt::Block {
                statements,
                location: loc,
            });
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement(loc);
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement(loc);
        }

        if self.match_token(&Token::Do(loc)) {
            return self.parse_do_while_statement(loc);
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement(loc);
        }

        if self.match_token(&Token::Switch(loc)) {
            return self.parse_switch_statement(loc);
        }

        if self.match_token(&Token::Return(loc)) {
            let expr = if self.check(&Token::Semicolon(loc)) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect_semicolon("after return statement")?;
            return Ok(Stmt::Return {
                expr,
                location: loc,
            });
        }

        if self.match_token(&Token::Break(loc)) {
            self.expect_semicolon("after 'break'")?;
            return Ok(Stmt::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(Stmt::Continue { location: loc });
        }

        if self.match_token(&Token::Throw(loc)) {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after throw statement")?;
            return Ok(Stmt::Throw {
                expr,
                location: loc,
            });
        }

        if self.match_token(&Token::Try(loc)) {
            return self.parse_try_statement(loc);
        }

        if self.match_token(&Token::Synchronized(loc)) {
            // The lock expression is evaluated away at parse time; the body
            // compiles as a plain block
            self.expect_lparen("after 'synchronized'")?;
            self.parse_expression()?;
            self.expect_rparen("after synchronized lock expression")?;
            self.expect_lbrace("after synchronized header")?;
            let body = self.parse_block_statements()?;
            self.expect_rbrace("after synchronized block")?;
            return Ok(Stmt::Synchronized {
                body,
                location: loc,
            });
        }

        // Empty statement
        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(Stmt::Block {
                statements: Vec::new(),
                location: loc,
            });
        }

        // Variable declaration or expression statement
        if let Some(stmt) = self.try_parse_var_decl(loc)? {
            return Ok(stmt);
        }

        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression statement")?;
        Ok(Stmt::Expression {
            expr,
            location: loc,
        })
    }

    /// Attempt to parse a local variable declaration via trial parse;
    /// restores the position and returns None when the lookahead does not
    /// commit to `Type Identifier (= | ; | ,)`
    fn try_parse_var_decl(&mut self, loc: SourceLocation) -> Result<Option<Stmt>, ParseError> {
        if !self.is_type_token_at(0) && !self.check(&Token::Final(loc)) {
            return Ok(None);
        }

        let saved = self.position;
        self.match_token(&Token::Final(loc));
        if !self.is_type_token_at(0) {
            self.position = saved;
            return Ok(None);
        }
        let var_type = match self.parse_type() {
            Ok(t) => t,
            Err(_) => {
                self.position = saved;
                return Ok(None);
            }
        };
        let name = match self.peek_token() {
            Token::Ident(name, _) => {
                self.advance();
                name
            }
            _ => {
                self.position = saved;
                return Ok(None);
            }
        };
        if !self.check(&Token::Eq(loc))
            && !self.check(&Token::Semicolon(loc))
            && !self.check(&Token::Comma(loc))
        {
            self.position = saved;
            return Ok(None);
        }

        let mut decls = Vec::new();
        let mut current_name = name;
        loop {
            let init = if self.match_token(&Token::Eq(loc)) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            decls.push(Stmt::VarDecl {
                name: current_name,
                var_type: var_type.clone(),
                init,
                location: loc,
            });
            if !self.match_token(&Token::Comma(loc)) {
                break;
            }
            current_name = self.expect_identifier()?;
        }
        self.expect_semicolon("after variable declaration")?;

        // Multi-variable declarations lower to a block of single ones
        if decls.len() == 1 {
            Ok(Some(decls.pop().expect("one declaration")))
        } else {
            Ok(Some(Stmt::Block {
                statements: decls,
                location: loc,
            }))
        }
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after if condition")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after while condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    /// `do body while (cond);` lowers to `{ body; while (cond) body }`
    fn parse_do_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let body = self.parse_statement()?;
        self.expect_token(
            &Token::While(self.current_location()),
            "Expected 'while' after do body",
        )?;
        self.expect_lparen("after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_rparen("after do-while condition")?;
        self.expect_semicolon("after do-while statement")?;

        Ok(Stmt::Block {
            statements: vec![
                body.clone(),
                Stmt::While {
                    condition,
                    body: Box::new(body),
                    location: loc,
                },
            ],
            location: loc,
        })
    }

    /// C-style and enhanced for; the enhanced form is recognised by
    /// lookahead for `:` after `Type Identifier`
    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'for'")?;

        let saved = self.position;
        self.match_token(&Token::Final(loc));
        if self.is_type_token_at(0) {
            if let Ok(var_type) = self.parse_type() {
                if let Token::Ident(var_name, _) = self.peek_token() {
                    self.advance();
                    if self.match_token(&Token::Colon(loc)) {
                        let iterable = self.parse_expression()?;
                        self.expect_rparen("after for-each header")?;
                        let body = Box::new(self.parse_statement()?);
                        return Ok(Stmt::ForEach {
                            var_type,
                            var_name,
                            iterable,
                            body,
                            location: loc,
                        });
                    }
                }
            }
        }
        self.position = saved;

        let init = if self.match_token(&Token::Semicolon(loc)) {
            None
        } else if let Some(decl) = self.try_parse_var_decl(loc)? {
            Some(Box::new(decl))
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for initialiser")?;
            Some(Box::new(Stmt::Expression {
                expr,
                location: loc,
            }))
        };

        let condition = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon("after for condition")?;

        let update = if self.check(&Token::RParen(loc)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after for clauses")?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            location: loc,
        })
    }

    fn parse_try_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lbrace("after 'try'")?;
        let body = self.parse_block_statements()?;
        self.expect_rbrace("after try body")?;

        let mut catches = Vec::new();
        while self.match_token(&Token::Catch(self.current_location())) {
            let catch_loc = self.previous_location();
            self.expect_lparen("after 'catch'")?;
            let mut exception_type = self.parse_type()?;
            // Multi-catch `A | B e` keeps only the first type name
            while self.match_token(&Token::Pipe(self.current_location())) {
                self.parse_type()?;
            }
            let name = self.expect_identifier()?;
            self.expect_rparen("after catch parameter")?;
            self.expect_lbrace("after catch header")?;
            let catch_body = self.parse_block_statements()?;
            self.expect_rbrace("after catch body")?;
            exception_type.array_dims = 0;
            catches.push(CatchClause {
                exception_type,
                name,
                body: catch_body,
                location: catch_loc,
            });
        }

        let finally_block = if self.match_token(&Token::Finally(self.current_location())) {
            self.expect_lbrace("after 'finally'")?;
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after finally body")?;
            Some(statements)
        } else {
            None
        };

        if catches.is_empty() && finally_block.is_none() {
            return Err(ParseError {
                message: "try statement needs a catch or finally clause".to_string(),
                location: loc,
            });
        }

        Ok(Stmt::Try {
            body,
            catches,
            finally_block,
            location: loc,
        })
    }

    fn parse_switch_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'switch'")?;
        let expr = self.parse_expression()?;
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("after switch header")?;

        let mut cases = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            let case_loc = self.current_location();
            let value = if self.match_token(&Token::Case(case_loc)) {
                let value = self.parse_expression()?;
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after case value",
                )?;
                Some(value)
            } else if self.match_token(&Token::Default(case_loc)) {
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after 'default'",
                )?;
                None
            } else {
                return Err(ParseError {
                    message: format!("Expected 'case' or 'default', found {}", self.peek()),
                    location: case_loc,
                });
            };

            let mut statements = Vec::new();
            while !self.check(&Token::Case(self.current_location()))
                && !self.check(&Token::Default(self.current_location()))
                && !self.check(&Token::RBrace(self.current_location()))
                && !self.is_at_end()
            {
                statements.push(self.parse_statement()?);
            }

            cases.push(SwitchCase {
                value,
                statements,
                location: case_loc,
            });
        }

        self.expect_rbrace("after switch body")?;
        Ok(Stmt::Switch {
            expr,
            cases,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn parse_main_body(body: &str) -> Vec<Stmt> {
        let source = format!("class T {{ void m() {{ {} }} }}", body);
        let mut parser = Parser::new(&source).expect("lexing failed");
        let program = parser.parse_program().expect("parsing failed");
        match program.declarations.into_iter().next().unwrap() {
            Declaration::Class(c) => c.methods.into_iter().next().unwrap().body.unwrap(),
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn test_multi_var_decl_lowers_to_block() {
        let stmts = parse_main_body("int a = 1, b = 2;");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Block { statements, .. } => {
                assert_eq!(statements.len(), 2);
                assert!(matches!(&statements[0], Stmt::VarDecl { name, .. } if name == "a"));
                assert!(matches!(&statements[1], Stmt::VarDecl { name, .. } if name == "b"));
            }
            other => panic!("expected block, got {:?}", other.location()),
        }
    }

    #[test]
    fn test_do_while_lowers_to_while() {
        let stmts = parse_main_body("do { x(); } while (flag);");
        match &stmts[0] {
            Stmt::Block { statements, .. } => {
                assert_eq!(statements.len(), 2);
                assert!(matches!(&statements[1], Stmt::While { .. }));
            }
            other => panic!("expected lowered block, got {:?}", other.location()),
        }
    }

    #[test]
    fn test_for_each_disambiguation() {
        let stmts = parse_main_body("for (String s : names) { use(s); }");
        assert!(matches!(&stmts[0], Stmt::ForEach { var_name, .. } if var_name == "s"));

        let stmts = parse_main_body("for (int i = 0; i < 5; i++) { }");
        assert!(matches!(&stmts[0], Stmt::For { .. }));
    }

    #[test]
    fn test_try_catch_finally() {
        let stmts = parse_main_body(
            "try { risky(); } catch (Exception e) { log(e); } finally { close(); }",
        );
        match &stmts[0] {
            Stmt::Try {
                body,
                catches,
                finally_block,
                ..
            } => {
                assert_eq!(body.len(), 1);
                assert_eq!(catches.len(), 1);
                assert_eq!(catches[0].name, "e");
                assert!(finally_block.is_some());
            }
            other => panic!("expected try, got {:?}", other.location()),
        }
    }

    #[test]
    fn test_synchronized_discards_lock() {
        let stmts = parse_main_body("synchronized (lock) { count++; }");
        match &stmts[0] {
            Stmt::Synchronized { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("expected synchronized, got {:?}", other.location()),
        }
    }

    #[test]
    fn test_switch_cases() {
        let stmts = parse_main_body("switch (x) { case 1: a(); break; default: b(); }");
        match &stmts[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(cases[0].value.is_some());
                assert!(cases[1].value.is_none());
            }
            other => panic!("expected switch, got {:?}", other.location()),
        }
    }
}
